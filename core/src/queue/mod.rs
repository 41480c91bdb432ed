//! Ordered persistence: one request in flight, everything else buffered FIFO.

#[allow(clippy::module_inception)]
mod queue;
mod request;
mod response;

pub use queue::{SaveCompletion, SaveQueue, SaveStatus};
pub use request::{FileUpload, KeyLookup, OnDone, SaveKey, SavePayload, SaveRequest, SaveValue};
pub use response::SaveResponse;
