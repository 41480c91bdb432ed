use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dytomate_core::api::{
    AdapterInput, AdapterKind, AppConfig, AttributeNames, ClickEvent, CliError, Controller,
    ControllerEvent, Disposition, Document, ElementId, MemoryDocument, PageNode, SaveRequest,
    Transport, UiEvent,
};
use dytomate_plugins::adapters::ScriptedAdapters;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use super::script::{parse_script, ScriptAction, ScriptStep};
use super::shared::SharedDocument;
use crate::commands::cli::ReplayArgs;
use crate::commands::save::build_transport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickRecord {
    pub at_ms: u64,
    pub target: String,
    pub disposition: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub element: String,
    pub kind: AdapterKind,
    pub session_id: String,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveRecord {
    pub key: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardRecord {
    pub at_ms: u64,
    pub warning: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ReplayReport {
    pub clicks: Vec<ClickRecord>,
    pub replayed_clicks: Vec<String>,
    pub sessions: Vec<SessionRecord>,
    pub saves: Vec<SaveRecord>,
    pub navigation: Vec<GuardRecord>,
    pub open_session: Option<String>,
    /// Final content of every editable element, by key.
    pub contents: BTreeMap<String, String>,
    pub events: Vec<ControllerEvent>,
}

fn label(doc: &MemoryDocument, id: ElementId) -> String {
    doc.attribute(id, "id").unwrap_or_else(|| id.to_string())
}

fn disposition_name(d: Disposition) -> &'static str {
    match d {
        Disposition::Default => "default",
        Disposition::Suppress => "suppress",
    }
}

fn stopped() -> CliError {
    CliError::Replay("controller stopped before the script finished".to_string())
}

pub async fn replay_cmd(cfg: &AppConfig, args: ReplayArgs) -> Result<ReplayReport, CliError> {
    let page_src = tokio::fs::read_to_string(&args.page).await?;
    let page: PageNode = serde_json::from_str(&page_src)
        .map_err(|e| CliError::Replay(format!("page {}: {e}", args.page)))?;
    let steps = parse_script(&tokio::fs::read_to_string(&args.script).await?)?;
    let base_dir = Path::new(&args.script)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let transport = build_transport(cfg, &args.transport)?;

    run_replay(
        cfg,
        &page,
        steps,
        args.container.as_deref(),
        &base_dir,
        transport,
    )
    .await
}

/// Replays `steps` against a fresh controller and waits until it has drained.
pub async fn run_replay(
    cfg: &AppConfig,
    page: &PageNode,
    steps: Vec<ScriptStep>,
    container: Option<&str>,
    base_dir: &Path,
    transport: Arc<dyn Transport>,
) -> Result<ReplayReport, CliError> {
    let doc = MemoryDocument::from_page(page).map_err(|e| CliError::Replay(e.to_string()))?;
    let container = match container {
        Some(id) => doc
            .require_id(id)
            .map_err(|e| CliError::Replay(e.to_string()))?,
        None => doc.root(),
    };
    let shared = SharedDocument::new(doc);

    let mut controller = Controller::new(
        cfg,
        Box::new(shared.clone()),
        container,
        transport,
        Box::new(ScriptedAdapters),
    )?;
    let names = controller.attribute_names().clone();
    let collector = tokio::spawn(collect(controller.subscribe()));

    let (tx, rx) = mpsc::channel(64);
    let runner = tokio::spawn(async move {
        controller.run(rx).await;
        controller
    });

    tracing::info!(
        target: "dytomate.replay",
        stage = "replay.start",
        steps = steps.len(),
        container = %container
    );

    let mut report = ReplayReport::default();
    let start = Instant::now();
    for step in steps {
        tokio::time::sleep_until(start + Duration::from_millis(step.at_ms)).await;
        drive(&tx, &shared, base_dir, step, &mut report).await?;
    }
    drop(tx);

    let controller = runner
        .await
        .map_err(|e| CliError::Replay(format!("controller task failed: {e}")))?;
    report.open_session = controller
        .active_session()
        .map(|s| label(&shared.lock(), s.element));
    drop(controller);

    let events = collector
        .await
        .map_err(|e| CliError::Replay(format!("event collector failed: {e}")))?;
    finish(&mut report, &shared.lock(), &names, events);

    tracing::info!(
        target: "dytomate.replay",
        stage = "replay.done",
        sessions = report.sessions.len(),
        saves = report.saves.len()
    );
    Ok(report)
}

async fn collect(mut rx: broadcast::Receiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut out = Vec::new();
    loop {
        match rx.recv().await {
            Ok(event) => out.push(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(
                    target: "dytomate.replay",
                    stage = "replay.events.lagged",
                    skipped = skipped
                );
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    out
}

async fn drive(
    tx: &mpsc::Sender<UiEvent>,
    shared: &SharedDocument,
    base_dir: &Path,
    step: ScriptStep,
    report: &mut ReplayReport,
) -> Result<(), CliError> {
    let resolve = |target: &str| {
        shared
            .lock()
            .require_id(target)
            .map_err(|e| CliError::Replay(format!("at {}ms: {e}", step.at_ms)))
    };

    let event = match step.action {
        ScriptAction::Click { ref target } => {
            let id = resolve(target)?;
            let (reply, answer) = oneshot::channel();
            tx.send(UiEvent::Click {
                event: ClickEvent::new(id),
                reply: Some(reply),
            })
            .await
            .map_err(|_| stopped())?;
            let disposition = answer.await.map_err(|_| stopped())?;
            report.clicks.push(ClickRecord {
                at_ms: step.at_ms,
                target: target.clone(),
                disposition: disposition_name(disposition),
            });
            return Ok(());
        }
        ScriptAction::Navigate => {
            let (reply, answer) = oneshot::channel();
            tx.send(UiEvent::BeforeUnload(reply))
                .await
                .map_err(|_| stopped())?;
            let warning = answer.await.map_err(|_| stopped())?;
            report.navigation.push(GuardRecord {
                at_ms: step.at_ms,
                warning,
            });
            return Ok(());
        }
        ScriptAction::MouseDown { ref target } => UiEvent::MouseDown(resolve(target)?),
        ScriptAction::MouseUp { ref target } => UiEvent::MouseUp(resolve(target)?),
        ScriptAction::Input { text: Some(text), .. } => UiEvent::Input(AdapterInput::Text(text)),
        ScriptAction::Input {
            file: Some(file), ..
        } => {
            let path: PathBuf = base_dir.join(&file);
            let bytes = tokio::fs::read(&path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(file);
            UiEvent::Input(AdapterInput::File { name, bytes })
        }
        ScriptAction::Input { .. } => {
            return Err(CliError::Replay(format!(
                "at {}ms: input without text or file",
                step.at_ms
            )))
        }
        ScriptAction::Commit => UiEvent::Commit,
        ScriptAction::Close => UiEvent::Close,
        ScriptAction::Save {
            key,
            value,
            attributes,
        } => UiEvent::Save(SaveRequest::text(key, value).with_attributes(attributes)),
        ScriptAction::Enable => UiEvent::Enable,
        ScriptAction::Disable => UiEvent::Disable,
    };
    tx.send(event).await.map_err(|_| stopped())
}

fn finish(
    report: &mut ReplayReport,
    doc: &MemoryDocument,
    names: &AttributeNames,
    events: Vec<ControllerEvent>,
) {
    for event in &events {
        match event {
            ControllerEvent::SessionOpened {
                element,
                kind,
                session_id,
            } => report.sessions.push(SessionRecord {
                element: label(doc, *element),
                kind: *kind,
                session_id: session_id.clone(),
                closed: false,
            }),
            ControllerEvent::SessionClosed { session_id, .. } => {
                if let Some(s) = report
                    .sessions
                    .iter_mut()
                    .find(|s| &s.session_id == session_id)
                {
                    s.closed = true;
                }
            }
            ControllerEvent::SaveCompleted { key, success } => report.saves.push(SaveRecord {
                key: key.clone(),
                success: *success,
            }),
            _ => {}
        }
    }
    report.events = events;

    report.replayed_clicks = doc
        .dispatched()
        .iter()
        .map(|click| label(doc, click.target))
        .collect();

    for el in doc.elements_with_attribute(names.marker()) {
        let Some(key) = names.key_of(doc, el) else {
            continue;
        };
        let content = match AdapterKind::for_element(doc, el) {
            AdapterKind::Media => doc.attribute(el, "src").unwrap_or_default(),
            AdapterKind::Text => doc.text(el),
        };
        report.contents.insert(key, content);
    }
}
