//! Assemble-on-save marker discovery.
//!
//! Behaviors opt in through [`Behavior::assemble_on_save`]; saving a scene
//! then reassembles every marker that contains such a behavior. The marker
//! is found by walking up from the flagged node, and every marker on that
//! ancestor chain is taken, not just the nearest one, so nested markers
//! stay in sync with their outermost template.

use std::collections::HashSet;

use stage_assembler::Assembler;
use stage_scene::{NodeId, SceneGraph};

/// Markers to reassemble when the scene is saved: for every node carrying
/// a behavior that requests it, the markers on that node and its ancestors.
/// Deduplicated, in discovery order.
pub fn save_hook_markers(graph: &SceneGraph) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut markers = Vec::new();

    for node in graph.iter() {
        if !node.behaviors.iter().any(|b| b.assemble_on_save()) {
            continue;
        }
        let mut chain = vec![node.id];
        chain.extend(graph.ancestors(node.id));
        for id in chain {
            let is_marker = graph
                .get(id)
                .map(|n| n.has_behavior::<Assembler>())
                .unwrap_or(false);
            if is_marker && seen.insert(id) {
                markers.push(id);
            }
        }
    }

    markers
}
