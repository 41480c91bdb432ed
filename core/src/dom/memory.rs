use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::document::{Document, ElementId};
use crate::error::DocumentError;

/// Declarative page description used by fixtures and the replay harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PageNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchedClick {
    pub target: ElementId,
    pub detail: String,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// Tree-backed [`Document`] with no rendering.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Option<Node>>,
    root: ElementId,
    dispatched: Vec<DispatchedClick>,
}

impl MemoryDocument {
    pub fn new(root_tag: &str) -> Self {
        let root = Node {
            tag: root_tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![Some(root)],
            root: ElementId(0),
            dispatched: Vec::new(),
        }
    }

    pub fn from_page(page: &PageNode) -> Result<Self, DocumentError> {
        let mut doc = Self::new(&page.tag);
        let mut seen = HashSet::new();
        let root = doc.root;
        doc.fill(root, page, &mut seen)?;
        Ok(doc)
    }

    fn fill(
        &mut self,
        id: ElementId,
        page: &PageNode,
        seen: &mut HashSet<String>,
    ) -> Result<(), DocumentError> {
        if let Some(dom_id) = &page.id {
            if !seen.insert(dom_id.clone()) {
                return Err(DocumentError::DuplicateId(dom_id.clone()));
            }
            self.set_attribute(id, "id", dom_id);
        }
        for (name, value) in &page.attributes {
            self.set_attribute(id, name, value);
        }
        if !page.text.is_empty() {
            self.set_text(id, &page.text);
        }
        for child in &page.children {
            let child_id = self.append_child(id, &child.tag);
            self.fill(child_id, child, seen)?;
        }
        Ok(())
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Looks an element up by its `id` attribute.
    pub fn by_id(&self, dom_id: &str) -> Option<ElementId> {
        self.nodes.iter().enumerate().find_map(|(idx, node)| {
            node.as_ref()
                .filter(|n| n.attributes.get("id").map(String::as_str) == Some(dom_id))
                .map(|_| ElementId(idx as u64))
        })
    }

    pub fn require_id(&self, dom_id: &str) -> Result<ElementId, DocumentError> {
        self.by_id(dom_id)
            .ok_or_else(|| DocumentError::UnknownId(dom_id.to_string()))
    }

    pub fn exists(&self, id: ElementId) -> bool {
        self.node(id).is_some()
    }

    /// Clicks re-dispatched through [`Document::dispatch_click`], oldest first.
    pub fn dispatched(&self) -> &[DispatchedClick] {
        &self.dispatched
    }

    pub fn take_dispatched(&mut self) -> Vec<DispatchedClick> {
        std::mem::take(&mut self.dispatched)
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new("body")
    }
}

impl Document for MemoryDocument {
    fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).and_then(|n| n.parent)
    }

    fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.node(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn tag_name(&self, id: ElementId) -> Option<String> {
        self.node(id).map(|n| n.tag.clone())
    }

    fn attribute(&self, id: ElementId, name: &str) -> Option<String> {
        self.node(id).and_then(|n| n.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, id: ElementId, name: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.remove(name);
        }
    }

    fn elements_with_attribute(&self, name: &str) -> Vec<ElementId> {
        self.subtree(self.root)
            .into_iter()
            .filter(|id| self.attribute(*id, name).is_some())
            .collect()
    }

    fn text(&self, id: ElementId) -> String {
        self.node(id).map(|n| n.text.clone()).unwrap_or_default()
    }

    fn set_text(&mut self, id: ElementId, text: &str) {
        if let Some(node) = self.node_mut(id) {
            node.text = text.to_string();
        }
    }

    fn append_child(&mut self, parent: ElementId, tag: &str) -> ElementId {
        let id = ElementId(self.nodes.len() as u64);
        let attached = self.exists(parent);
        self.nodes.push(Some(Node {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            parent: attached.then_some(parent),
            children: Vec::new(),
        }));
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    fn remove(&mut self, id: ElementId) {
        if id == self.root || !self.exists(id) {
            return;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        for el in self.subtree(id) {
            if let Some(slot) = self.nodes.get_mut(el.0 as usize) {
                *slot = None;
            }
        }
    }

    fn dispatch_click(&mut self, target: ElementId, detail: &str) {
        self.dispatched.push(DispatchedClick {
            target,
            detail: detail.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageNode {
        serde_json::from_value(serde_json::json!({
            "tag": "BODY",
            "id": "body",
            "children": [
                {"tag": "main", "id": "main", "children": [
                    {"tag": "h1", "id": "title", "attributes": {"data-dytomate": "home.title"}, "text": "Hello"},
                    {"tag": "a", "id": "link", "attributes": {"href": "/about"}}
                ]},
                {"tag": "img", "id": "logo", "attributes": {"data-dytomate": "home.logo"}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn builds_tree_from_page_fixture() {
        let doc = MemoryDocument::from_page(&page()).unwrap();
        let main = doc.by_id("main").unwrap();
        let title = doc.by_id("title").unwrap();

        assert_eq!(doc.tag_name(doc.root()).as_deref(), Some("body"));
        assert_eq!(doc.parent(title), Some(main));
        assert_eq!(doc.text(title), "Hello");
        assert!(doc.contains(doc.root(), title));
        assert!(!doc.contains(title, main));
        assert_eq!(
            doc.elements_with_attribute("data-dytomate"),
            vec![title, doc.by_id("logo").unwrap()]
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut p = page();
        p.children.push(PageNode {
            tag: "p".to_string(),
            id: Some("main".to_string()),
            ..PageNode::default()
        });
        assert!(matches!(
            MemoryDocument::from_page(&p),
            Err(DocumentError::DuplicateId(id)) if id == "main"
        ));
    }

    #[test]
    fn require_id_names_the_missing_id() {
        let doc = MemoryDocument::from_page(&page()).unwrap();
        assert_eq!(doc.require_id("main").ok(), doc.by_id("main"));
        assert!(matches!(
            doc.require_id("sidebar"),
            Err(DocumentError::UnknownId(id)) if id == "sidebar"
        ));
    }

    #[test]
    fn remove_detaches_whole_subtree() {
        let mut doc = MemoryDocument::from_page(&page()).unwrap();
        let main = doc.by_id("main").unwrap();
        let title = doc.by_id("title").unwrap();

        doc.remove(main);

        assert!(!doc.exists(main));
        assert!(!doc.exists(title));
        assert!(doc.by_id("title").is_none());
        assert_eq!(doc.children(doc.root()).len(), 1);
    }

    #[test]
    fn dispatched_clicks_are_recorded_in_order() {
        let mut doc = MemoryDocument::from_page(&page()).unwrap();
        let link = doc.by_id("link").unwrap();
        doc.dispatch_click(link, "dytomate");
        doc.dispatch_click(link, "dytomate");

        assert_eq!(doc.dispatched().len(), 2);
        assert_eq!(doc.take_dispatched()[0].target, link);
        assert!(doc.dispatched().is_empty());
    }
}
