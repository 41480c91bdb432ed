use thiserror::Error;

use crate::dom::ElementId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    NoHomeDir,
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Every way a single save can fail. Callers of the queue never see the variant: all of
/// them collapse into "the completion callback received no value".
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("element {0} has no editable key")]
    MissingKey(ElementId),
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("no element with id `{0}`")]
    UnknownId(String),
    #[error("duplicate element id `{0}`")]
    DuplicateId(String),
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("replay failed: {0}")]
    Replay(String),
    #[error("save failed: {0}")]
    Save(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
