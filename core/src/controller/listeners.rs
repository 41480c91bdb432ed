use std::collections::HashSet;

use crate::dom::{AttributeNames, Document, ElementId};

/// Listener registrations owned by one controller instance.
///
/// Marked elements present at attach time get their own click listener; the container
/// gets a delegated one so elements added later are still heard.
#[derive(Debug, Default)]
pub struct ListenerSet {
    attached: bool,
    watched: HashSet<ElementId>,
    container: Option<ElementId>,
    unload_guard: bool,
}

impl ListenerSet {
    /// Returns false when already attached.
    pub fn attach(
        &mut self,
        doc: &dyn Document,
        names: &AttributeNames,
        container: ElementId,
    ) -> bool {
        if self.attached {
            return false;
        }
        self.watched = doc
            .elements_with_attribute(names.marker())
            .into_iter()
            .collect();
        self.container = Some(container);
        self.unload_guard = true;
        self.attached = true;
        tracing::debug!(
            target: "dytomate.controller",
            stage = "listeners.attached",
            watched = self.watched.len(),
            container = %container
        );
        true
    }

    /// Returns false when nothing was attached.
    pub fn detach(&mut self) -> bool {
        if !self.attached {
            return false;
        }
        self.watched.clear();
        self.container = None;
        self.unload_guard = false;
        self.attached = false;
        tracing::debug!(target: "dytomate.controller", stage = "listeners.detached");
        true
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn watched_len(&self) -> usize {
        self.watched.len()
    }

    pub fn guards_unload(&self) -> bool {
        self.unload_guard
    }

    /// Whether a click on `target` reaches one of our listeners.
    pub fn hears(&self, doc: &dyn Document, target: ElementId) -> bool {
        if !self.attached {
            return false;
        }
        if let Some(container) = self.container {
            if doc.contains(container, target) {
                return true;
            }
        }
        self.watched.iter().any(|el| doc.contains(*el, target))
    }
}
