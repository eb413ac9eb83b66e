//! Inspector panel - property editor for selected nodes.
//!
//! Besides name and transform, the inspector owns the marker section:
//! assigning a template path, nudging assembly priority, or detaching the
//! marker. Assigning a path that has no template yet creates the file and
//! assembles it once, so the inspector is enough to bootstrap a template.

use egui::Context as EguiContext;

use stage_assembler::Assembler;
use stage_core::{NullProgress, TemplateId};
use stage_scene::{NodeId, Transform};

use super::{Panel, PanelId};
use crate::core::EditorState;

pub const INSPECTOR_PANEL_ID: PanelId = PanelId("inspector");

/// Shown in the target row while a marker has no template.
const NONE_ASSIGNED: &str = "None Assigned";

/// Inspector panel for editing node properties.
pub struct InspectorPanel {
    /// Whether transform section is expanded
    transform_expanded: bool,
    /// Whether marker section is expanded
    marker_expanded: bool,
    /// Template path being typed into the assign field
    path_input: String,
    /// Node the assign field was last primed for
    last_node: Option<NodeId>,
}

impl Default for InspectorPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectorPanel {
    pub fn new() -> Self {
        Self {
            transform_expanded: true,
            marker_expanded: true,
            path_input: String::new(),
            last_node: None,
        }
    }
}

impl Panel for InspectorPanel {
    fn id(&self) -> PanelId {
        INSPECTOR_PANEL_ID
    }

    fn name(&self) -> &str {
        "Inspector"
    }

    fn ui(&mut self, ctx: &EguiContext, state: &mut EditorState) {
        egui::SidePanel::right("inspector_panel")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Inspector");
                ui.separator();

                let selected = state.selection.selected().to_vec();

                match selected.len() {
                    0 => {
                        ui.label("No node selected");
                        ui.label("");
                        ui.label("Select a node from the");
                        ui.label("Hierarchy panel.");
                    }
                    1 => {
                        self.single_node_inspector(ui, state, selected[0]);
                    }
                    n => {
                        ui.label(format!("{} nodes selected", n));
                        ui.separator();
                        self.multi_node_inspector(ui, state, &selected);
                    }
                }
            });
    }
}

impl InspectorPanel {
    fn single_node_inspector(&mut self, ui: &mut egui::Ui, state: &mut EditorState, id: NodeId) {
        // Clone display data to avoid borrow issues with egui
        let Some(node) = state.graph.get(id) else {
            return;
        };
        let mut name = node.name.clone();
        let mut transform = node.transform;
        let marker = node.behavior::<Assembler>().map(|a| (a.target, a.priority));
        let target_path = marker
            .and_then(|(target, _)| target)
            .and_then(|t| state.database.template_path(t))
            .map(str::to_string);

        if self.last_node != Some(id) {
            self.last_node = Some(id);
            self.path_input = target_path.clone().unwrap_or_default();
        }

        let mut modified = false;

        // Name
        ui.horizontal(|ui| {
            ui.label("Name:");
            if ui.text_edit_singleline(&mut name).changed() {
                modified = true;
            }
        });

        ui.separator();

        // Transform section
        egui::CollapsingHeader::new("Transform")
            .default_open(self.transform_expanded)
            .show(ui, |ui| {
                modified |= vec3_row(ui, "Position", &mut transform.position, 0.1);
                modified |= vec3_row(ui, "Rotation", &mut transform.rotation, 0.01);
                modified |= vec3_row(ui, "Scale", &mut transform.scale, 0.1);

                ui.horizontal(|ui| {
                    if ui.small_button("Reset").clicked() {
                        transform = Transform::new();
                        modified = true;
                    }
                });
            });

        ui.separator();

        // Marker section
        let mut priority = marker.map(|(_, p)| p).unwrap_or(0);
        let mut remove_marker = false;
        egui::CollapsingHeader::new("Marker")
            .default_open(self.marker_expanded)
            .show(ui, |ui| match marker {
                None => {
                    ui.label("This node is not a marker.");
                    if ui.button("Add Marker").clicked() {
                        if let Some(node) = state.graph.get_mut(id) {
                            node.add_behavior(Box::new(Assembler::default()));
                            state.scene_modified = true;
                        }
                    }
                }
                Some(_) => {
                    ui.horizontal(|ui| {
                        ui.label("Target:");
                        match &target_path {
                            Some(path) => ui.label(path),
                            None => ui.label(NONE_ASSIGNED),
                        };
                    });

                    ui.horizontal(|ui| {
                        ui.text_edit_singleline(&mut self.path_input);
                        if ui.button("Assign").clicked() && !self.path_input.is_empty() {
                            let path = self.path_input.clone();
                            if let Err(err) =
                                state.set_assembler_target(id, &path, &mut NullProgress)
                            {
                                state.activity.error(format!("Assign failed: {}", err));
                            }
                        }
                    });

                    ui.horizontal(|ui| {
                        ui.label("Priority:");
                        if ui.add(egui::DragValue::new(&mut priority)).changed() {
                            modified = true;
                        }
                        if ui.small_button("-").clicked() {
                            priority -= 1;
                            modified = true;
                        }
                        if ui.small_button("+").clicked() {
                            priority += 1;
                            modified = true;
                        }
                    });

                    if ui.button("Remove Marker").clicked() {
                        remove_marker = true;
                    }
                }
            });

        ui.separator();

        // Actions
        ui.horizontal(|ui| {
            if ui.button("Duplicate").clicked() {
                state.duplicate_selected();
            }
            if ui.button("Delete").clicked() {
                state.despawn_selected();
            }
        });

        // Apply modifications
        if modified {
            if let Some(node) = state.graph.get_mut(id) {
                node.name = name;
                node.transform = transform;
                if let Some(m) = node.behavior_mut::<Assembler>() {
                    m.priority = priority;
                }
            }
            state.scene_modified = true;
        }
        if remove_marker {
            if let Some(node) = state.graph.get_mut(id) {
                node.remove_behavior::<Assembler>();
            }
            state.scene_modified = true;
        }
    }

    /// Matches the single-node marker section, one compact row per marker
    /// in the selection.
    fn multi_node_inspector(&mut self, ui: &mut egui::Ui, state: &mut EditorState, selected: &[NodeId]) {
        struct MarkerRow {
            id: NodeId,
            name: String,
            target: Option<String>,
            priority: i32,
        }

        let rows: Vec<MarkerRow> = selected
            .iter()
            .filter_map(|&id| {
                let node = state.graph.get(id)?;
                let marker = node.behavior::<Assembler>()?;
                Some(MarkerRow {
                    id,
                    name: node.name.clone(),
                    target: marker
                        .target
                        .and_then(|t: TemplateId| state.database.template_path(t))
                        .map(str::to_string),
                    priority: marker.priority,
                })
            })
            .collect();

        if rows.is_empty() {
            ui.label("No markers in selection.");
        } else {
            let mut priority_edits: Vec<(NodeId, i32)> = Vec::new();
            for row in &rows {
                ui.horizontal(|ui| {
                    ui.label(&row.name);
                    match &row.target {
                        Some(path) => ui.label(path),
                        None => ui.label(NONE_ASSIGNED),
                    };
                    let mut priority = row.priority;
                    if ui.add(egui::DragValue::new(&mut priority)).changed() {
                        priority_edits.push((row.id, priority));
                    }
                });
            }
            for (id, priority) in priority_edits {
                if let Some(m) = state
                    .graph
                    .get_mut(id)
                    .and_then(|n| n.behavior_mut::<Assembler>())
                {
                    m.priority = priority;
                    state.scene_modified = true;
                }
            }
        }

        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Duplicate All").clicked() {
                state.duplicate_selected();
            }
            if ui.button("Delete All").clicked() {
                state.despawn_selected();
            }
        });
    }
}

fn vec3_row(ui: &mut egui::Ui, label: &str, value: &mut [f32; 3], speed: f64) -> bool {
    let mut changed = false;
    ui.label(label);
    ui.horizontal(|ui| {
        for (axis, v) in ["X:", "Y:", "Z:"].iter().zip(value.iter_mut()) {
            ui.label(*axis);
            if ui.add(egui::DragValue::new(v).speed(speed)).changed() {
                changed = true;
            }
        }
    });
    changed
}
