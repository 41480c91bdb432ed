use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::error::ConfigError;

/// Get the default dytomate data directory: ~/.dytomate
pub fn get_dytomate_data_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| ConfigError::NoHomeDir)?;
    Ok(PathBuf::from(home).join(".dytomate"))
}

pub fn load_default() -> Result<AppConfig, ConfigError> {
    let data_dir = get_dytomate_data_dir()?;
    let mut cfg = load_from(&data_dir, Path::new("."))?;
    apply_env_overrides(&mut cfg, |name| std::env::var(name).ok());
    cfg.validate()?;
    Ok(cfg)
}

/// Loads `config.toml` from `data_dir` (priority 1) or `cwd` (priority 2), falling back to
/// defaults when neither exists.
pub fn load_from(data_dir: &Path, cwd: &Path) -> Result<AppConfig, ConfigError> {
    let user_config = data_dir.join("config.toml");
    let local_config = cwd.join("config.toml");

    if user_config.exists() {
        read_config(&user_config)
    } else if local_config.exists() {
        read_config(&local_config)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let cfg = toml::from_str::<AppConfig>(&s).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!(
        target: "dytomate.config",
        stage = "config.loaded",
        path = %path.display()
    );
    Ok(cfg)
}

/// Environment variable overrides (highest priority). Blank values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("DYTOMATE_BASE_URL") {
        cfg.http.base_url = v;
    }
    if let Some(v) = get("DYTOMATE_SAVE_URL") {
        cfg.http.save_url = v;
    }
    if let Some(v) = get("DYTOMATE_UPLOAD_URL") {
        cfg.http.upload_url = v;
    }
    if let Some(v) = get("DYTOMATE_API_KEY") {
        cfg.http.api_key = v;
    }
    if let Some(v) = get("DYTOMATE_DOUBLE_CLICK_DELAY_MS") {
        match v.trim().parse::<u64>() {
            Ok(ms) => cfg.double_click_delay_ms = ms,
            Err(_) => tracing::warn!(
                target: "dytomate.config",
                stage = "config.env.ignored",
                name = "DYTOMATE_DOUBLE_CLICK_DELAY_MS",
                value = %v
            ),
        }
    }
}
