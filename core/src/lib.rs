//! In-place content editing for annotated documents.
//!
//! Elements carrying `data-<prefix>` become editable on double click; single clicks are
//! withheld briefly and replayed so links and buttons keep working. Commits flow through
//! an ordered save queue with a single request in flight.

pub mod api;
pub mod arbiter;
pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod event;
pub mod notify;
pub mod queue;
pub mod session;
pub mod transport;
