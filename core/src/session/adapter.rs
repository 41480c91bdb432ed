use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dom::{Document, ElementId};
use crate::queue::SaveValue;

/// The closed set of editor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Text,
    Media,
}

impl AdapterKind {
    /// Images get the media replacer, everything else the rich-text editor.
    pub fn for_element(doc: &dyn Document, id: ElementId) -> Self {
        match doc.tag_name(id) {
            Some(tag) if tag.eq_ignore_ascii_case("img") => Self::Media,
            _ => Self::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Media => "media",
        }
    }
}

/// Roots of the UI an open editor treats as "inside". Membership is checked against the
/// live tree, so nodes an editor adds later still count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Regions {
    pub editor: HashSet<ElementId>,
    pub toolbar: HashSet<ElementId>,
}

impl Regions {
    pub fn is_editor(&self, doc: &dyn Document, id: ElementId) -> bool {
        self.editor.iter().any(|root| doc.contains(*root, id))
    }

    pub fn is_toolbar(&self, doc: &dyn Document, id: ElementId) -> bool {
        self.toolbar.iter().any(|root| doc.contains(*root, id))
    }

    pub fn is_inside(&self, doc: &dyn Document, id: ElementId) -> bool {
        self.is_editor(doc, id) || self.is_toolbar(doc, id)
    }
}

/// Input a host forwards to the active editor widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterInput {
    Text(String),
    File { name: String, bytes: Vec<u8> },
}

/// A change an editor wants persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub value: SaveValue,
    pub attributes: BTreeMap<String, String>,
}

impl Commit {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: SaveValue::Text(value.into()),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Capability surface of an editing widget.
pub trait EditAdapter: Send {
    fn kind(&self) -> AdapterKind;

    /// Mounts the editing UI and reports the regions it occupies.
    fn enable(&mut self, doc: &mut dyn Document) -> Regions;

    fn input(&mut self, doc: &mut dyn Document, input: AdapterInput);

    /// Takes the pending change, if any.
    fn commit(&mut self, doc: &mut dyn Document) -> Option<Commit>;

    /// Unmounts the editing UI.
    fn disable(&mut self, doc: &mut dyn Document);
}

pub trait AdapterFactory: Send {
    fn open(
        &mut self,
        kind: AdapterKind,
        element: ElementId,
        doc: &dyn Document,
    ) -> Box<dyn EditAdapter>;
}
