//! Edit sessions: at most one open editor, closed on outside interaction.

mod adapter;
mod manager;

pub use adapter::{AdapterFactory, AdapterInput, AdapterKind, Commit, EditAdapter, Regions};
pub use manager::{ClosedSession, EditOutcome, SessionInfo, SessionManager};
