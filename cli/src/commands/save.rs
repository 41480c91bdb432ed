use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dytomate_core::api::{
    failure_notice, AppConfig, CliError, Controller, MemoryDocument, SaveResponse, Transport,
};
use dytomate_plugins::adapters::ScriptedAdapters;
use dytomate_plugins::transport::{EchoTransport, HttpTransport};

use super::cli::{SaveArgs, TransportArgs, UploadArgs};

/// Parses repeated `NAME=VALUE` flags. Later duplicates win.
pub fn parse_attrs(raw: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    let mut out = BTreeMap::new();
    for item in raw {
        let (name, value) = item
            .split_once('=')
            .ok_or_else(|| CliError::Command(format!("invalid --attr `{item}`, expected NAME=VALUE")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::Command(format!("invalid --attr `{item}`, empty name")));
        }
        out.insert(name.to_string(), value.to_string());
    }
    Ok(out)
}

pub fn build_transport(
    cfg: &AppConfig,
    args: &TransportArgs,
) -> Result<Arc<dyn Transport>, CliError> {
    if args.offline {
        let echo = EchoTransport::new(Duration::from_millis(args.latency_ms))
            .failing(args.fail_keys.iter().cloned());
        return Ok(Arc::new(echo));
    }
    Ok(Arc::new(HttpTransport::new(&cfg.http)?))
}

/// A controller with nothing to click on, used for one-off saves.
fn headless(cfg: &AppConfig, transport: Arc<dyn Transport>) -> Result<Controller, CliError> {
    let doc = MemoryDocument::default();
    let root = doc.root();
    Ok(Controller::new(
        cfg,
        Box::new(doc),
        root,
        transport,
        Box::new(ScriptedAdapters),
    )?)
}

type Slot = Arc<Mutex<Option<Option<SaveResponse>>>>;

fn capture(slot: &Slot) -> impl FnOnce(Option<SaveResponse>) + Send + 'static {
    let slot = slot.clone();
    move |response| {
        if let Ok(mut s) = slot.lock() {
            *s = Some(response);
        }
    }
}

fn outcome(key: &str, slot: &Slot) -> Result<serde_json::Value, CliError> {
    let response = slot.lock().ok().and_then(|mut s| s.take()).flatten();
    response
        .map(SaveResponse::into_value)
        .ok_or_else(|| CliError::Save(failure_notice(key)))
}

pub async fn save_cmd(cfg: &AppConfig, args: SaveArgs) -> Result<serde_json::Value, CliError> {
    let attributes = parse_attrs(&args.attrs)?;
    let transport = build_transport(cfg, &args.transport)?;
    let mut controller = headless(cfg, transport)?;

    let slot = Slot::default();
    let status = controller.save_text(args.key.as_str(), args.value, attributes, capture(&slot));
    tracing::debug!(target: "dytomate.cli", stage = "save.submitted", status = ?status);
    controller.settle().await;

    outcome(&args.key, &slot)
}

pub async fn upload_cmd(cfg: &AppConfig, args: UploadArgs) -> Result<serde_json::Value, CliError> {
    let attributes = parse_attrs(&args.attrs)?;
    let path = Path::new(&args.file);
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.clone());

    let transport = build_transport(cfg, &args.transport)?;
    let mut controller = headless(cfg, transport)?;

    let slot = Slot::default();
    let status = controller.save_file(
        args.key.as_str(),
        name,
        &bytes,
        attributes,
        capture(&slot),
    );
    tracing::debug!(
        target: "dytomate.cli",
        stage = "upload.submitted",
        status = ?status,
        bytes = bytes.len()
    );
    controller.settle().await;

    outcome(&args.key, &slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn offline() -> TransportArgs {
        TransportArgs {
            offline: true,
            ..TransportArgs::default()
        }
    }

    #[test]
    fn parse_attrs_splits_on_first_equals() {
        let attrs = parse_attrs(&["href=/a?b=c".to_string(), "class=x".to_string()]).unwrap();
        assert_eq!(attrs.get("href").map(String::as_str), Some("/a?b=c"));
        assert_eq!(attrs.len(), 2);
        assert!(parse_attrs(&["novalue".to_string()]).is_err());
        assert!(parse_attrs(&["=v".to_string()]).is_err());
    }

    #[tokio::test]
    async fn offline_save_returns_response() {
        let args = SaveArgs {
            key: "home.title".to_string(),
            value: "Hello".to_string(),
            attrs: vec![],
            transport: offline(),
        };
        let value = save_cmd(&AppConfig::default(), args).await.unwrap();
        assert_eq!(value["success"], serde_json::json!(true));
        assert_eq!(value["key"], serde_json::json!("home.title"));
    }

    #[tokio::test]
    async fn rejected_save_reports_failure_notice() {
        let args = SaveArgs {
            key: "home.title".to_string(),
            value: "Hello".to_string(),
            attrs: vec![],
            transport: TransportArgs {
                fail_keys: vec!["home.title".to_string()],
                ..offline()
            },
        };
        let err = save_cmd(&AppConfig::default(), args).await.unwrap_err();
        assert!(matches!(err, CliError::Save(ref msg) if msg == "Couldn't save `home.title`."));
    }

    #[tokio::test]
    async fn offline_upload_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"png").unwrap();
        let args = UploadArgs {
            key: "home.logo".to_string(),
            file: file.path().display().to_string(),
            attrs: vec!["alt=Logo".to_string()],
            transport: offline(),
        };
        let value = upload_cmd(&AppConfig::default(), args).await.unwrap();
        assert_eq!(value["endpoint"], serde_json::json!("upload"));
    }

    #[test]
    fn http_transport_needs_absolute_endpoints() {
        let err = build_transport(&AppConfig::default(), &TransportArgs::default())
            .err()
            .unwrap();
        assert!(matches!(err, CliError::Anyhow(_)));
    }
}
