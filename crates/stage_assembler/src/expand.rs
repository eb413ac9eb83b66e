//! Expansion of marker selections along the template reference graph.
//!
//! A marker "produces" its target template. A marker "consumes" a template
//! when its subtree contains an instance of it. Hierarchy expansion walks
//! from producers to consumers, so assembling a low-level template also
//! reassembles everything built on top of it. Dependency expansion walks
//! the other way and pulls in producers first.

use std::collections::{HashMap, HashSet};

use stage_core::TemplateId;
use stage_scene::{NodeId, SceneGraph};

use crate::marker::Assembler;

/// All marker nodes in the scene, in insertion order.
pub fn all_assemblers(graph: &SceneGraph) -> Vec<NodeId> {
    graph
        .iter()
        .filter(|node| node.has_behavior::<Assembler>())
        .map(|node| node.id)
        .collect()
}

/// Map each produced template to the marker that produces it. When several
/// markers target the same template the first one in scene order wins and
/// the rest are ignored with a warning.
pub fn assemblers_by_template(graph: &SceneGraph) -> HashMap<TemplateId, NodeId> {
    let mut by_template = HashMap::new();
    for id in all_assemblers(graph) {
        let Some(node) = graph.get(id) else { continue };
        let Some(marker) = node.behavior::<Assembler>() else {
            continue;
        };
        let Some(target) = marker.target else { continue };
        if let Some(&first) = by_template.get(&target) {
            let first_name = graph.get(first).map(|n| n.name.as_str()).unwrap_or("?");
            log::warn!(
                "Multiple assemblers target the same template: '{}' and '{}' (keeping '{}')",
                first_name,
                node.name,
                first_name
            );
            continue;
        }
        by_template.insert(target, id);
    }
    by_template
}

/// Templates consumed by the subtree under a marker. Instances nested
/// inside other instances belong to their own template, so the walk does
/// not descend into them.
fn consumed_templates(graph: &SceneGraph, marker: NodeId) -> Vec<TemplateId> {
    graph.template_instances_in(marker)
}

/// Expand a seed set of markers to include every marker that transitively
/// consumes a template produced by the set. Seeds come first, consumers
/// follow in discovery order.
pub fn expand_hierarchy(graph: &SceneGraph, seeds: &[NodeId]) -> Vec<NodeId> {
    let producers = assemblers_by_template(graph);

    // Invert: which markers consume each template.
    let mut consumers: HashMap<TemplateId, Vec<NodeId>> = HashMap::new();
    for &marker in producers.values() {
        for template in consumed_templates(graph, marker) {
            consumers.entry(template).or_default().push(marker);
        }
    }
    for list in consumers.values_mut() {
        list.sort_by_key(|id| id.0);
    }

    let mut visited = HashSet::new();
    let mut out = Vec::new();
    for &seed in seeds {
        visit_consumers(graph, seed, &consumers, &mut visited, &mut out);
    }
    out
}

fn visit_consumers(
    graph: &SceneGraph,
    marker: NodeId,
    consumers: &HashMap<TemplateId, Vec<NodeId>>,
    visited: &mut HashSet<NodeId>,
    out: &mut Vec<NodeId>,
) {
    if !visited.insert(marker) {
        return;
    }
    out.push(marker);
    let Some(target) = marker_target(graph, marker) else {
        return;
    };
    if let Some(deps) = consumers.get(&target) {
        for &consumer in deps {
            visit_consumers(graph, consumer, consumers, visited, out);
        }
    }
}

/// Expand a seed set of markers to include the producers of every template
/// the set transitively consumes. Each marker appears before the producers
/// it pulled in; the batch sort puts them in assembly order afterwards.
pub fn expand_dependencies(graph: &SceneGraph, seeds: &[NodeId]) -> Vec<NodeId> {
    let producers = assemblers_by_template(graph);
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    for &seed in seeds {
        visit_producers(graph, seed, &producers, &mut visited, &mut out);
    }
    out
}

fn visit_producers(
    graph: &SceneGraph,
    marker: NodeId,
    producers: &HashMap<TemplateId, NodeId>,
    visited: &mut HashSet<NodeId>,
    out: &mut Vec<NodeId>,
) {
    if !visited.insert(marker) {
        return;
    }
    out.push(marker);
    for template in consumed_templates(graph, marker) {
        if let Some(&producer) = producers.get(&template) {
            visit_producers(graph, producer, producers, visited, out);
        }
    }
}

fn marker_target(graph: &SceneGraph, marker: NodeId) -> Option<TemplateId> {
    graph.get(marker)?.behavior::<Assembler>()?.target
}
