use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::response::SaveResponse;
use crate::dom::{AttributeNames, Document, ElementId};
use crate::error::SaveError;
use crate::transport::Endpoint;

/// Completion callback. Receives `None` when the save failed.
pub type OnDone = Box<dyn FnOnce(Option<SaveResponse>) + Send>;

/// What a save is filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveKey {
    Literal(String),
    /// Resolved to the element's editable key when the request is sent.
    Element(ElementId),
}

impl SaveKey {
    /// Human-readable form used in notices when resolution is not possible.
    pub fn describe(&self) -> String {
        match self {
            Self::Literal(key) => key.clone(),
            Self::Element(id) => id.to_string(),
        }
    }
}

impl From<&str> for SaveKey {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for SaveKey {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<ElementId> for SaveKey {
    fn from(value: ElementId) -> Self {
        Self::Element(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    pub name: String,
    /// Standard base64 of the file bytes.
    pub content: String,
}

impl FileUpload {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SaveValue {
    Text(String),
    File(FileUpload),
}

impl SaveValue {
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn endpoint(&self) -> Endpoint {
        if self.is_file() {
            Endpoint::Upload
        } else {
            Endpoint::Save
        }
    }
}

/// Body sent to the save or upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePayload {
    pub key: String,
    pub value: SaveValue,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

pub struct SaveRequest {
    pub key: SaveKey,
    pub value: SaveValue,
    pub attributes: BTreeMap<String, String>,
    pub on_done: Option<OnDone>,
}

impl SaveRequest {
    pub fn new(key: impl Into<SaveKey>, value: SaveValue) -> Self {
        Self {
            key: key.into(),
            value,
            attributes: BTreeMap::new(),
            on_done: None,
        }
    }

    pub fn text(key: impl Into<SaveKey>, value: impl Into<String>) -> Self {
        Self::new(key, SaveValue::Text(value.into()))
    }

    pub fn file(key: impl Into<SaveKey>, name: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(key, SaveValue::File(FileUpload::from_bytes(name, bytes)))
    }

    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn on_done<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Option<SaveResponse>) + Send + 'static,
    {
        self.on_done = Some(Box::new(f));
        self
    }

    pub fn is_file(&self) -> bool {
        self.value.is_file()
    }
}

impl fmt::Debug for SaveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveRequest")
            .field("key", &self.key)
            .field("is_file", &self.is_file())
            .field("attributes", &self.attributes)
            .field("on_done", &self.on_done.is_some())
            .finish()
    }
}

/// Resolves element keys against the live document at send time.
#[derive(Clone, Copy)]
pub struct KeyLookup<'a> {
    doc: &'a dyn Document,
    names: &'a AttributeNames,
}

impl<'a> KeyLookup<'a> {
    pub fn new(doc: &'a dyn Document, names: &'a AttributeNames) -> Self {
        Self { doc, names }
    }

    pub fn resolve(&self, key: &SaveKey) -> Result<String, SaveError> {
        match key {
            SaveKey::Literal(key) => Ok(key.clone()),
            SaveKey::Element(id) => self
                .names
                .key_of(self.doc, *id)
                .ok_or(SaveError::MissingKey(*id)),
        }
    }
}
