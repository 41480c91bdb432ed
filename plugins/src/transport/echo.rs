use std::time::Duration;

use async_trait::async_trait;
use dytomate_core::api::{Endpoint, SavePayload, Transport};

/// Offline transport: accepts every payload after a fixed latency.
///
/// Keys listed in `failing` get a `{"success": false}` body instead.
#[derive(Debug, Clone, Default)]
pub struct EchoTransport {
    latency: Duration,
    failing: Vec<String>,
}

impl EchoTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing: Vec::new(),
        }
    }

    pub fn failing(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.failing.extend(keys);
        self
    }
}

#[async_trait]
impl Transport for EchoTransport {
    fn name(&self) -> &str {
        "echo"
    }

    async fn send(&self, endpoint: Endpoint, payload: &SavePayload) -> anyhow::Result<String> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let success = !self.failing.iter().any(|k| k == &payload.key);
        tracing::debug!(
            target: "dytomate.echo",
            stage = "echo.reply",
            key = %payload.key,
            endpoint = endpoint.as_str(),
            success = success
        );
        Ok(serde_json::json!({
            "success": success,
            "key": payload.key,
            "endpoint": endpoint.as_str(),
        })
        .to_string())
    }
}
