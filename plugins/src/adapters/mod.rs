mod scripted;

pub use scripted::{ImageChanger, ScriptedAdapters, TextEditor, TEXTAREA_ID, TOOLBAR_ID};
