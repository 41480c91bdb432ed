//! Scripted host for the controller: a page fixture, timed UI events and a JSON report.

mod harness;
mod script;
mod shared;

pub use harness::{
    replay_cmd, run_replay, ClickRecord, GuardRecord, ReplayReport, SaveRecord, SessionRecord,
};
pub use script::{parse_script, ScriptAction, ScriptStep};
pub use shared::SharedDocument;
