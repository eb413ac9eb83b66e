//! Core editor types and state management.
//!
//! This module contains the central `EditorState` and the supporting
//! types it is built from.

pub mod editor_state;
mod preferences;
mod save_hook;
mod selection;

pub use editor_state::{EditorState, ProjectReport, UNTITLED_SCENE};
pub use preferences::Preferences;
pub use save_hook::save_hook_markers;
pub use selection::{SelectionManager, SelectionMode};
