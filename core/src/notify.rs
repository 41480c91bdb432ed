use std::sync::Mutex;

use crate::error::SaveError;

/// Text shown to the user when `key` could not be saved.
pub fn failure_notice(key: &str) -> String {
    format!("Couldn't save `{key}`.")
}

/// Surfaces failed saves to the user.
pub trait Notifier: Send + Sync {
    fn save_failed(&self, key: &str, error: &SaveError);
}

/// Reports failures through `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn save_failed(&self, key: &str, error: &SaveError) {
        tracing::warn!(
            target: "dytomate.notice",
            stage = "save.failed",
            key = %key,
            error = %error,
            "{}",
            failure_notice(key)
        );
    }
}

/// Keeps every notice, for hosts that render them later.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn notices(&self) -> Vec<String> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn save_failed(&self, key: &str, error: &SaveError) {
        TracingNotifier.save_failed(key, error);
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(failure_notice(key));
        }
    }
}
