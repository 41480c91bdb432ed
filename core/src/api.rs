//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `dytomate_core::api` instead of reaching into internal modules.

pub use crate::arbiter::{ClickArbiter, ClickDecision, ReplayClick};
pub use crate::config::{
    apply_env_overrides, load_default, load_from, AppConfig, HttpConfig, LoggingConfig,
};
pub use crate::controller::{Controller, UiEvent, NAVIGATION_WARNING};
pub use crate::dom::{AttributeNames, Document, ElementId, MemoryDocument, PageNode};
pub use crate::error::{CliError, ConfigError, DocumentError, SaveError};
pub use crate::event::{
    ClickEvent, ControllerEvent, Disposition, EditObserver, PreEditEvent, EVENT_DETAIL,
};
pub use crate::notify::{failure_notice, CollectingNotifier, Notifier, TracingNotifier};
pub use crate::queue::{
    FileUpload, SaveKey, SavePayload, SaveRequest, SaveResponse, SaveStatus, SaveValue,
};
pub use crate::session::{
    AdapterFactory, AdapterInput, AdapterKind, Commit, EditAdapter, Regions, SessionInfo,
};
pub use crate::transport::{Endpoint, Transport};
