use std::sync::{Arc, Mutex, MutexGuard};

use dytomate_core::api::{Document, ElementId, MemoryDocument};

/// A [`MemoryDocument`] the harness can inspect while a controller owns a handle to it.
#[derive(Debug, Clone)]
pub struct SharedDocument(Arc<Mutex<MemoryDocument>>);

impl SharedDocument {
    pub fn new(doc: MemoryDocument) -> Self {
        Self(Arc::new(Mutex::new(doc)))
    }

    pub fn lock(&self) -> MutexGuard<'_, MemoryDocument> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Document for SharedDocument {
    fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.lock().parent(id)
    }

    fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.lock().children(id)
    }

    fn tag_name(&self, id: ElementId) -> Option<String> {
        self.lock().tag_name(id)
    }

    fn attribute(&self, id: ElementId, name: &str) -> Option<String> {
        self.lock().attribute(id, name)
    }

    fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        self.lock().set_attribute(id, name, value)
    }

    fn remove_attribute(&mut self, id: ElementId, name: &str) {
        self.lock().remove_attribute(id, name)
    }

    fn elements_with_attribute(&self, name: &str) -> Vec<ElementId> {
        self.lock().elements_with_attribute(name)
    }

    fn text(&self, id: ElementId) -> String {
        self.lock().text(id)
    }

    fn set_text(&mut self, id: ElementId, text: &str) {
        self.lock().set_text(id, text)
    }

    fn append_child(&mut self, parent: ElementId, tag: &str) -> ElementId {
        self.lock().append_child(parent, tag)
    }

    fn remove(&mut self, id: ElementId) {
        self.lock().remove(id)
    }

    fn dispatch_click(&mut self, target: ElementId, detail: &str) {
        self.lock().dispatch_click(target, detail)
    }

    fn contains(&self, ancestor: ElementId, id: ElementId) -> bool {
        self.lock().contains(ancestor, id)
    }

    fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        self.lock().subtree(id)
    }
}
