//! Panel trait and registry.

use std::collections::HashMap;

use egui::Context as EguiContext;

use crate::core::EditorState;

/// Unique identifier for a panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PanelId(pub &'static str);

impl std::fmt::Display for PanelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dockable editor panel.
pub trait Panel: Send + Sync {
    /// Unique identifier for this panel.
    fn id(&self) -> PanelId;

    /// Display name shown in the UI.
    fn name(&self) -> &str;

    /// Render the panel's UI.
    fn ui(&mut self, ctx: &EguiContext, state: &mut EditorState);
}

/// Registry for managing panels.
pub struct PanelRegistry {
    panels: HashMap<PanelId, Box<dyn Panel>>,
    visibility: HashMap<PanelId, bool>,
    order: Vec<PanelId>,
}

impl Default for PanelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self {
            panels: HashMap::new(),
            visibility: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a panel. Panels render in registration order.
    pub fn register(&mut self, panel: Box<dyn Panel>) {
        let id = panel.id();
        self.order.push(id);
        self.visibility.insert(id, true);
        self.panels.insert(id, panel);
    }

    /// Check if a panel is visible.
    pub fn is_visible(&self, id: PanelId) -> bool {
        self.visibility.get(&id).copied().unwrap_or(false)
    }

    /// Show or hide a panel.
    pub fn set_visible(&mut self, id: PanelId, visible: bool) {
        if self.panels.contains_key(&id) {
            self.visibility.insert(id, visible);
        }
    }

    /// Toggle panel visibility.
    pub fn toggle(&mut self, id: PanelId) {
        let visible = !self.is_visible(id);
        self.set_visible(id, visible);
    }

    /// Get all panel IDs in order.
    pub fn panel_ids(&self) -> &[PanelId] {
        &self.order
    }

    /// Render all visible panels.
    pub fn render_all(&mut self, ctx: &EguiContext, state: &mut EditorState) {
        let visible: Vec<PanelId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.is_visible(*id))
            .collect();
        for id in visible {
            if let Some(panel) = self.panels.get_mut(&id) {
                panel.ui(ctx, state);
            }
        }
    }
}
