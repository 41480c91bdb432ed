use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to an element owned by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The host page as seen by the controller.
///
/// The controller never owns the document model; it only reads author-declared attributes,
/// walks ancestry for marker lookup, mirrors the in-edit flag and asks the host to
/// re-dispatch withheld clicks. Editor adapters use the structural methods to mount their
/// own UI.
pub trait Document: Send {
    fn parent(&self, id: ElementId) -> Option<ElementId>;
    fn children(&self, id: ElementId) -> Vec<ElementId>;
    fn tag_name(&self, id: ElementId) -> Option<String>;

    fn attribute(&self, id: ElementId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, id: ElementId, name: &str, value: &str);
    fn remove_attribute(&mut self, id: ElementId, name: &str);

    /// All elements carrying `name`, in document order.
    fn elements_with_attribute(&self, name: &str) -> Vec<ElementId>;

    fn text(&self, id: ElementId) -> String;
    fn set_text(&mut self, id: ElementId, text: &str);

    fn append_child(&mut self, parent: ElementId, tag: &str) -> ElementId;
    fn remove(&mut self, id: ElementId);

    /// Re-dispatch a click on `target`, tagged with `detail` so listeners can recognise it.
    fn dispatch_click(&mut self, target: ElementId, detail: &str);

    /// True when `id` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(el) = current {
            if el == ancestor {
                return true;
            }
            current = self.parent(el);
        }
        false
    }

    /// `id` and all of its descendants, depth first.
    fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(el) = stack.pop() {
            out.push(el);
            let mut children = self.children(el);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}

/// Names of the declarative attributes under a configurable prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    marker: String,
    read_only: String,
    in_edit: String,
}

impl AttributeNames {
    pub fn new(prefix: &str) -> Self {
        let marker = format!("data-{prefix}");
        Self {
            read_only: format!("{marker}-ro"),
            in_edit: format!("{marker}-in-edit"),
            marker,
        }
    }

    /// `data-P`: marks an element as editable and carries its key.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// `data-P-ro`
    pub fn read_only(&self) -> &str {
        &self.read_only
    }

    /// `data-P-in-edit`
    pub fn in_edit(&self) -> &str {
        &self.in_edit
    }

    pub fn key_of(&self, doc: &dyn Document, id: ElementId) -> Option<String> {
        doc.attribute(id, &self.marker)
    }

    pub fn is_read_only(&self, doc: &dyn Document, id: ElementId) -> bool {
        doc.attribute(id, &self.read_only).is_some()
    }
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self::new("dytomate")
    }
}
