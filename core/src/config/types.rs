use serde::{Deserialize, Serialize};

use crate::dom::AttributeNames;
use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Attribute prefix `P`: elements are marked with `data-P`, `data-P-ro`, ...
    #[serde(default = "default_data_attribute")]
    pub data_attribute: String,

    /// Window in which a second click turns into an edit.
    #[serde(default = "default_double_click_delay_ms")]
    pub double_click_delay_ms: u64,

    /// When set, an observer that cancels the pre-edit notification stops the edit.
    /// Otherwise cancelling is advisory and the editor opens anyway.
    #[serde(default)]
    pub honor_edit_veto: bool,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_data_attribute() -> String {
    "dytomate".to_string()
}

fn default_double_click_delay_ms() -> u64 {
    250
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_attribute: default_data_attribute(),
            double_click_delay_ms: default_double_click_delay_ms(),
            honor_edit_veto: false,
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.data_attribute.trim();
        if prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "data_attribute",
                reason: "must not be empty".to_string(),
            });
        }
        if prefix.chars().any(|c| c.is_whitespace() || c == '"' || c == '=') {
            return Err(ConfigError::Invalid {
                field: "data_attribute",
                reason: format!("`{prefix}` is not a valid attribute name fragment"),
            });
        }
        if self.double_click_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "double_click_delay_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.http.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "http.timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn attribute_names(&self) -> AttributeNames {
        AttributeNames::new(self.data_attribute.trim())
    }

    pub fn double_click_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.double_click_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Prepended to relative endpoint paths. Empty means endpoints are used as-is.
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_save_url")]
    pub save_url: String,

    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sent as a bearer token when non-empty.
    #[serde(default)]
    pub api_key: String,
}

fn default_save_url() -> String {
    "/api/dytomate/save".to_string()
}

fn default_upload_url() -> String {
    "/api/dytomate/upload".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            save_url: default_save_url(),
            upload_url: default_upload_url(),
            timeout_ms: default_timeout_ms(),
            api_key: String::new(),
        }
    }
}

impl HttpConfig {
    /// Joins `endpoint` onto `base_url` unless the endpoint is already absolute.
    pub fn resolve(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if base.is_empty() {
            return endpoint.to_string();
        }
        format!("{}/{}", base, endpoint.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "dytomate_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}
