//! Host document abstraction: declarative attributes, ancestry and click re-dispatch.

mod document;
mod memory;

pub use document::{AttributeNames, Document, ElementId};
pub use memory::{DispatchedClick, MemoryDocument, PageNode};
