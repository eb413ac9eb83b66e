//! Stagehand Editor
//!
//! Editor-facing surface of the Stagehand template assembly tool.
//!
//! ## Features
//!
//! - **Scene Hierarchy**: Tree view of all nodes with marker badges
//! - **Inspector Panel**: Name, transform and marker editing
//! - **Activity Feed**: What the editor did, with level filtering
//! - **Assembly Commands**: Selection, dependency, scene-wide and
//!   project-wide assembly with cancelable progress
//! - **Assemble on Save**: Behaviors can request reassembly when their
//!   scene is saved
//! - **Multi-Select**: Shift/Ctrl click selection across panels
//!
//! ## Architecture
//!
//! Panels never own scene data; everything flows through `EditorState`:
//!
//! ```text
//! Panel Input → EditorState command → stage_assembler pipeline → templates
//! ```
//!
//! Operations that need a file picker or a progress dialog are emitted as
//! actions for the host shell instead of being run inside a panel.

pub mod core;
pub mod error;
pub mod panels;

// Re-export commonly used types
pub use core::{
    EditorState,
    Preferences,
    ProjectReport,
    SelectionManager,
    SelectionMode,
    UNTITLED_SCENE,
};

pub use error::{EditorError, Result};

pub use panels::{
    ActivityLog,
    ActivityPanel,
    HierarchyPanel,
    InspectorPanel,
    MarkerAction,
    Panel,
    PanelRegistry,
    ProgressDialog,
};

/// Editor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Editor name
pub const NAME: &str = "Stagehand Editor";
