//! Hierarchy panel - scene node tree view.
//!
//! Every node carrying a marker gets a badge after its name: `[P]` when a
//! template is assigned, `[X]` when the marker still needs one. Clicking
//! the badge pings the template, cmd-click or middle-click assembles, and
//! an unassigned badge asks the host to browse for a path.

use egui::Context as EguiContext;

use stage_assembler::Assembler;
use stage_core::TemplateId;
use stage_scene::NodeId;

use super::{Panel, PanelId};
use crate::core::{EditorState, SelectionMode};

pub const HIERARCHY_PANEL_ID: PanelId = PanelId("hierarchy");

/// A marker interaction the panel cannot finish on its own. The host
/// shell drains these with [`HierarchyPanel::take_action`]: `Assemble`
/// wants a progress dialog, `Browse` wants a file picker, `Ping` wants
/// the template revealed wherever the host lists assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerAction {
    Ping(TemplateId),
    Assemble(NodeId),
    Browse(NodeId),
}

/// One row of the flattened tree.
#[derive(Clone)]
struct NodeRow {
    id: NodeId,
    name: String,
    depth: usize,
    marker: Option<Option<TemplateId>>,
    is_selected: bool,
    is_primary: bool,
}

/// Deferred mutations collected while rows render.
#[derive(Default)]
struct RowActions {
    select: Option<(NodeId, SelectionMode)>,
    add_child: Option<NodeId>,
    add_marker: Option<NodeId>,
    duplicate: Option<NodeId>,
    delete: Option<NodeId>,
    instantiate: Option<NodeId>,
    marker: Option<MarkerAction>,
}

/// Scene hierarchy panel showing all nodes as an indented tree.
pub struct HierarchyPanel {
    /// Search filter text
    filter_text: String,
    /// Whether to show search box
    show_search: bool,
    /// Marker action waiting for the host shell
    pending_action: Option<MarkerAction>,
}

impl Default for HierarchyPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyPanel {
    pub fn new() -> Self {
        Self {
            filter_text: String::new(),
            show_search: false,
            pending_action: None,
        }
    }

    /// Take the marker action emitted this frame, if any.
    pub fn take_action(&mut self) -> Option<MarkerAction> {
        self.pending_action.take()
    }

    fn collect_rows(&self, state: &EditorState) -> Vec<NodeRow> {
        fn visit(state: &EditorState, id: NodeId, depth: usize, rows: &mut Vec<NodeRow>) {
            let Some(node) = state.graph.get(id) else {
                return;
            };
            rows.push(NodeRow {
                id,
                name: node.name.clone(),
                depth,
                marker: node.behavior::<Assembler>().map(|a| a.target),
                is_selected: state.selection.is_selected(id),
                is_primary: state.selection.is_primary(id),
            });
            for &child in &node.children {
                visit(state, child, depth + 1, rows);
            }
        }

        let mut rows = Vec::new();
        let roots: Vec<NodeId> = state.graph.roots().collect();
        for root in roots {
            visit(state, root, 0, &mut rows);
        }

        if !self.filter_text.is_empty() {
            let needle = self.filter_text.to_lowercase();
            rows.retain(|r| r.name.to_lowercase().contains(&needle));
        }
        rows
    }

    fn badge_ui(&self, ui: &mut egui::Ui, row: &NodeRow, actions: &mut RowActions) {
        let Some(target) = row.marker else {
            return;
        };

        let (text, color, hover) = match target {
            Some(_) => (
                "[P]",
                egui::Color32::DARK_GRAY,
                "Click to ping the template, cmd-click or middle-click to assemble",
            ),
            None => (
                "[X]",
                egui::Color32::from_rgb(255, 100, 100),
                "No template assigned, click to browse",
            ),
        };

        let response = ui
            .add(egui::Button::new(egui::RichText::new(text).color(color)).small().frame(false))
            .on_hover_text(hover);

        let command = ui.input(|i| i.modifiers.command);
        if response.clicked() {
            actions.marker = Some(match target {
                Some(_) if command => MarkerAction::Assemble(row.id),
                Some(t) => MarkerAction::Ping(t),
                None => MarkerAction::Browse(row.id),
            });
        } else if response.clicked_by(egui::PointerButton::Middle) {
            actions.marker = Some(match target {
                Some(_) => MarkerAction::Assemble(row.id),
                None => MarkerAction::Browse(row.id),
            });
        }
    }

    fn row_ui(&self, ui: &mut egui::Ui, row: &NodeRow, actions: &mut RowActions) {
        ui.horizontal(|ui| {
            ui.add_space(row.depth as f32 * 14.0);

            let label = if row.is_primary {
                egui::RichText::new(&row.name).strong()
            } else {
                egui::RichText::new(&row.name)
            };
            let response = ui.selectable_label(row.is_selected, label);

            if response.clicked() {
                let modifiers = ui.input(|i| i.modifiers);
                let mode = SelectionMode::from_modifiers(modifiers.shift, modifiers.ctrl);
                actions.select = Some((row.id, mode));
            }

            let id = row.id;
            let marker = row.marker;
            response.context_menu(|ui| {
                if ui.button("Add Child").clicked() {
                    actions.add_child = Some(id);
                    ui.close_menu();
                }
                if ui.button("Duplicate").clicked() {
                    actions.duplicate = Some(id);
                    ui.close_menu();
                }
                if ui.button("Delete").clicked() {
                    actions.delete = Some(id);
                    ui.close_menu();
                }
                ui.separator();
                match marker {
                    None => {
                        if ui.button("Add Marker").clicked() {
                            actions.add_marker = Some(id);
                            ui.close_menu();
                        }
                    }
                    Some(target) => {
                        if ui.button("Assemble").clicked() {
                            actions.marker = Some(MarkerAction::Assemble(id));
                            ui.close_menu();
                        }
                        if target.is_some() && ui.button("Instantiate Template").clicked() {
                            actions.instantiate = Some(id);
                            ui.close_menu();
                        }
                        if ui.button("Select Template...").clicked() {
                            actions.marker = Some(MarkerAction::Browse(id));
                            ui.close_menu();
                        }
                    }
                }
            });

            self.badge_ui(ui, row, actions);
        });
    }

    fn apply_actions(&mut self, state: &mut EditorState, actions: RowActions) {
        if let Some((id, mode)) = actions.select {
            state.selection.select(id, mode);
        }
        if let Some(parent) = actions.add_child {
            if let Err(err) = state.spawn_child_node(parent, "Node") {
                state.activity.error(format!("Add child failed: {}", err));
            }
        }
        if let Some(id) = actions.add_marker {
            if let Some(node) = state.graph.get_mut(id) {
                node.add_behavior(Box::new(Assembler::default()));
                state.scene_modified = true;
            }
        }
        if let Some(id) = actions.duplicate {
            state.selection.select(id, SelectionMode::Replace);
            state.duplicate_selected();
        }
        if let Some(id) = actions.delete {
            state.selection.select(id, SelectionMode::Replace);
            state.despawn_selected();
        }
        if let Some(id) = actions.instantiate {
            if let Err(err) = state.instantiate_template(id) {
                state.activity.error(format!("Instantiate failed: {}", err));
            }
        }
        if let Some(action) = actions.marker {
            if let MarkerAction::Ping(target) = action {
                let path = state.database.template_path(target).map(str::to_string);
                if let Some(path) = path {
                    state.set_status(format!("Template: {}", path));
                }
            }
            self.pending_action = Some(action);
        }
    }
}

impl Panel for HierarchyPanel {
    fn id(&self) -> PanelId {
        HIERARCHY_PANEL_ID
    }

    fn name(&self) -> &str {
        "Hierarchy"
    }

    fn ui(&mut self, ctx: &EguiContext, state: &mut EditorState) {
        egui::SidePanel::left("hierarchy_panel")
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Hierarchy");
                ui.separator();

                // Toolbar
                ui.horizontal(|ui| {
                    if ui.button("+ Node").clicked() {
                        let id = state.spawn_node("Node");
                        state.selection.select(id, SelectionMode::Replace);
                    }
                    if ui.small_button("Search").clicked() {
                        self.show_search = !self.show_search;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(format!("{}", state.graph.len()));
                    });
                });

                if self.show_search {
                    ui.horizontal(|ui| {
                        ui.label("Filter:");
                        ui.text_edit_singleline(&mut self.filter_text);
                        if ui.small_button("X").clicked() {
                            self.filter_text.clear();
                        }
                    });
                }

                ui.separator();

                let rows = self.collect_rows(state);
                let is_empty = state.graph.is_empty();
                let mut actions = RowActions::default();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for row in &rows {
                        self.row_ui(ui, row, &mut actions);
                    }

                    if is_empty {
                        ui.label("No nodes in scene");
                        ui.label("");
                        ui.label("Use + Node to add one, then");
                        ui.label("Add Marker to aim it at a template.");
                    }
                });

                self.apply_actions(state, actions);

                if !ctx.wants_keyboard_input() {
                    if ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
                        state.despawn_selected();
                    }
                    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
                        state.deselect_all();
                    }
                }
            });
    }
}
