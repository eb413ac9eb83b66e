//! Batch execution over many markers.

use stage_asset::AssetDatabase;
use stage_core::ProgressSink;
use stage_scene::{AssembleContext, BehaviorRegistry, NodeId, SceneGraph};

use crate::error::AssembleError;
use crate::marker::Assembler;
use crate::pipeline::{assemble_one, AssembleOutcome};

/// What happened across one batch run.
#[derive(Default)]
pub struct BatchReport {
    /// Marker names whose templates were rewritten, in execution order.
    pub assembled: Vec<String>,
    /// Markers with nothing to do (gone, markerless, or no target).
    pub skipped: usize,
    /// Failures, attributed to the marker they came from.
    pub errors: Vec<(String, AssembleError)>,
    /// True when the sink cancelled the run between items.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }
}

/// Assemble a set of markers, lowest priority first.
///
/// Markers run independently: an error is recorded against its marker and
/// the rest of the batch continues. Each item gets the slice
/// `[i/n, (i+1)/n]` of the sink; cancellation is honored between items.
pub fn assemble_batch(
    graph: &mut SceneGraph,
    markers: &[NodeId],
    database: &mut AssetDatabase,
    registry: &BehaviorRegistry,
    ctx: &AssembleContext,
    progress: &mut dyn ProgressSink,
) -> BatchReport {
    if markers.is_empty() {
        log::info!("No markers to assemble");
        return BatchReport::default();
    }

    let mut order: Vec<NodeId> = markers.to_vec();
    // Stable, so equal priorities keep their incoming order.
    order.sort_by_key(|&id| priority_of(graph, id));

    let announce: Vec<&str> = order
        .iter()
        .filter_map(|&id| runnable_name(graph, id))
        .collect();
    if !announce.is_empty() {
        log::info!("Assembling: {}", announce.join(", "));
    }

    let total = order.len();
    let mut report = BatchReport::default();
    for (i, &marker) in order.iter().enumerate() {
        if progress.is_cancelled() {
            report.cancelled = true;
            log::info!("Assembly cancelled, {} marker(s) left", total - i);
            break;
        }

        let name = graph
            .get(marker)
            .map(|n| n.name.clone())
            .unwrap_or_default();
        let mut item = ItemProgress {
            inner: &mut *progress,
            start: i as f32 / total as f32,
            end: (i + 1) as f32 / total as f32,
            label: item_label(graph, database, marker, &name),
        };

        match assemble_one(graph, marker, database, registry, ctx, &mut item) {
            Ok(AssembleOutcome::Assembled) => report.assembled.push(name),
            Ok(AssembleOutcome::Skipped) => report.skipped += 1,
            Err(err) => {
                log::error!("Assembly of '{}' failed: {}", name, err);
                report.errors.push((name, err));
            }
        }
    }

    if !report.errors.is_empty() {
        log::error!(
            "Assembly completed with {} error(s), see above",
            report.errors.len()
        );
    }
    report
}

fn priority_of(graph: &SceneGraph, id: NodeId) -> i32 {
    graph
        .get(id)
        .and_then(|n| n.behavior::<Assembler>())
        .map(|a| a.priority)
        .unwrap_or(0)
}

/// Name of the marker node, if the marker would actually run.
fn runnable_name(graph: &SceneGraph, id: NodeId) -> Option<&str> {
    let node = graph.get(id)?;
    node.behavior::<Assembler>()?.target?;
    Some(node.name.as_str())
}

fn item_label(graph: &SceneGraph, database: &AssetDatabase, marker: NodeId, name: &str) -> String {
    let template = graph
        .get(marker)
        .and_then(|n| n.behavior::<Assembler>())
        .and_then(|a| a.target)
        .and_then(|t| database.get(t));
    match template {
        Some(t) => format!("Assembling {} into {}.{}", name, t.name, stage_asset::TEMPLATE_EXTENSION),
        None => format!("Assembling {}", name),
    }
}

/// Scales one item's progress into its batch slice and prefixes the item
/// label onto hook messages.
struct ItemProgress<'a> {
    inner: &'a mut dyn ProgressSink,
    start: f32,
    end: f32,
    label: String,
}

impl ProgressSink for ItemProgress<'_> {
    fn update(&mut self, fraction: f32, message: &str) {
        let t = fraction.clamp(0.0, 1.0);
        let scaled = self.start + (self.end - self.start) * t;
        self.inner
            .update(scaled, &format!("{} ({})", self.label, message));
    }

    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}
