//! Selection management with multi-select support.
//!
//! Click replaces the selection, Shift+click adds, Ctrl+click removes,
//! Ctrl+Shift+click toggles.

use stage_scene::NodeId;

/// Selection mode based on modifier keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Replace current selection (normal click)
    #[default]
    Replace,
    /// Add to current selection (Shift+click)
    Add,
    /// Remove from current selection (Ctrl+click)
    Remove,
    /// Toggle selection state (Ctrl+Shift+click)
    Toggle,
}

impl SelectionMode {
    /// Determine selection mode from modifier keys.
    pub fn from_modifiers(shift: bool, ctrl: bool) -> Self {
        match (shift, ctrl) {
            (true, true) => Self::Toggle,
            (true, false) => Self::Add,
            (false, true) => Self::Remove,
            (false, false) => Self::Replace,
        }
    }
}

/// Manages node selection with multi-select support.
#[derive(Clone, Debug, Default)]
pub struct SelectionManager {
    /// Currently selected nodes (in selection order)
    selected: Vec<NodeId>,
    /// Primary selected node (last selected)
    primary: Option<NodeId>,
    /// Whether selection has changed since last frame
    dirty: bool,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary (last selected) node.
    pub fn primary(&self) -> Option<NodeId> {
        self.primary
    }

    /// Get all selected nodes.
    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    /// Get number of selected nodes.
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    /// Check if any nodes are selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Check if a specific node is selected.
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    /// Check if a specific node is the primary selection.
    pub fn is_primary(&self, id: NodeId) -> bool {
        self.primary == Some(id)
    }

    /// Check and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    /// Select a node with the given mode.
    pub fn select(&mut self, id: NodeId, mode: SelectionMode) {
        match mode {
            SelectionMode::Replace => {
                self.selected.clear();
                self.selected.push(id);
                self.primary = Some(id);
            }
            SelectionMode::Add => {
                if !self.selected.contains(&id) {
                    self.selected.push(id);
                }
                self.primary = Some(id);
            }
            SelectionMode::Remove => {
                self.selected.retain(|&e| e != id);
                if self.primary == Some(id) {
                    self.primary = self.selected.last().copied();
                }
            }
            SelectionMode::Toggle => {
                if self.selected.contains(&id) {
                    self.selected.retain(|&e| e != id);
                    if self.primary == Some(id) {
                        self.primary = self.selected.last().copied();
                    }
                } else {
                    self.selected.push(id);
                    self.primary = Some(id);
                }
            }
        }
        self.dirty = true;
    }

    /// Select multiple nodes (replaces current selection).
    pub fn select_multiple(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.selected.clear();
        self.selected.extend(ids);
        self.primary = self.selected.last().copied();
        self.dirty = true;
    }

    /// Clear all selection.
    pub fn clear(&mut self) {
        if !self.selected.is_empty() {
            self.selected.clear();
            self.primary = None;
            self.dirty = true;
        }
    }

    /// Remove a node from selection (e.g. when the node is despawned).
    pub fn remove_node(&mut self, id: NodeId) {
        let was_selected = self.selected.contains(&id);
        self.selected.retain(|&e| e != id);
        if self.primary == Some(id) {
            self.primary = self.selected.last().copied();
        }
        if was_selected {
            self.dirty = true;
        }
    }
}
