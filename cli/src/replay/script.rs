use std::collections::BTreeMap;

use dytomate_core::api::CliError;
use serde::Deserialize;

/// One line of a replay script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptStep {
    /// Offset from the start of the replay.
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptAction {
    Click {
        target: String,
    },
    MouseDown {
        target: String,
    },
    MouseUp {
        target: String,
    },
    /// Exactly one of `text` or `file` (a path relative to the script).
    Input {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        file: Option<String>,
    },
    Commit,
    Close,
    Save {
        key: String,
        value: String,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
    },
    Navigate,
    Enable,
    Disable,
}

/// Parses JSONL. Blank lines and lines starting with `#` are skipped; offsets must not
/// decrease.
pub fn parse_script(src: &str) -> Result<Vec<ScriptStep>, CliError> {
    let mut steps: Vec<ScriptStep> = Vec::new();
    for (idx, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let lineno = idx + 1;
        let step: ScriptStep = serde_json::from_str(line)
            .map_err(|e| CliError::Replay(format!("script line {lineno}: {e}")))?;

        if let ScriptAction::Input { text, file } = &step.action {
            if text.is_some() == file.is_some() {
                return Err(CliError::Replay(format!(
                    "script line {lineno}: input needs exactly one of `text` or `file`"
                )));
            }
        }
        if let Some(prev) = steps.last() {
            if step.at_ms < prev.at_ms {
                return Err(CliError::Replay(format!(
                    "script line {lineno}: at_ms {} is earlier than {}",
                    step.at_ms, prev.at_ms
                )));
            }
        }
        steps.push(step);
    }
    Ok(steps)
}
