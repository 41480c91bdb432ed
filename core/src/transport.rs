use async_trait::async_trait;
use serde::Serialize;

use crate::queue::SavePayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Save,
    Upload,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Upload => "upload",
        }
    }
}

/// Outbound side of the save queue.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Issues exactly one request and returns the raw response body. Any error here is a
    /// transport failure; interpreting the body is the queue's job.
    async fn send(&self, endpoint: Endpoint, payload: &SavePayload) -> anyhow::Result<String>;
}
