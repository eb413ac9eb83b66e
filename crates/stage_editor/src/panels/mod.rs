//! Editor panels (dockable windows).
//!
//! Panels are the main UI building blocks of the editor. Each panel
//! provides a specific function (hierarchy, inspector, activity feed),
//! reading and mutating the shared `EditorState`.

mod panel;
mod activity;
mod hierarchy;
mod inspector;
mod progress;

pub use panel::{Panel, PanelId, PanelRegistry};
pub use activity::{ActivityEntry, ActivityLevel, ActivityLog, ActivityPanel, BatchSummary};
pub use hierarchy::{HierarchyPanel, MarkerAction, HIERARCHY_PANEL_ID};
pub use inspector::{InspectorPanel, INSPECTOR_PANEL_ID};
pub use progress::ProgressDialog;
