//! The single-marker assembly pipeline.

use stage_asset::AssetDatabase;
use stage_core::{ProgressSink, ScaledProgress, TemplateId};
use stage_scene::{
    run_assembly_stage, AssembleContext, AssemblyStage, BehaviorRegistry, NodeId, SceneGraph,
};

use crate::error::{AssembleError, Result};
use crate::marker::Assembler;

// Progress fractions for each stage of one marker's pipeline. Hook stages
// report fine-grained progress inside their slice.
pub const PRE_ASSEMBLY: f32 = 0.0;
pub const PRE_HOOKS_END: f32 = 0.2;
pub const CLONING: f32 = 0.2;
pub const ASSEMBLING: f32 = 0.3333;
pub const ASSEMBLE_HOOKS_END: f32 = 0.6;
pub const APPLYING: f32 = 0.6;
pub const POST_ASSEMBLY: f32 = 0.8;
pub const POST_HOOKS_END: f32 = 0.95;
pub const CLEANUP: f32 = 0.95;

/// How one marker's pipeline ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssembleOutcome {
    /// The target template was rewritten and saved.
    Assembled,
    /// Nothing to do: the node or marker is gone, or no target is set.
    Skipped,
}

/// Run the full pipeline for one marker node.
///
/// Stages: pre-assembly hooks on the live subtree, clone, assembly hooks on
/// the clone, replace the template's contents and save, post-assembly hooks
/// on the written template, stamp the stage label and save again. The clone
/// is transient and despawned on every exit path, error or not.
pub fn assemble_one(
    graph: &mut SceneGraph,
    marker: NodeId,
    database: &mut AssetDatabase,
    registry: &BehaviorRegistry,
    ctx: &AssembleContext,
    progress: &mut dyn ProgressSink,
) -> Result<AssembleOutcome> {
    let Some(node) = graph.get(marker) else {
        return Ok(AssembleOutcome::Skipped);
    };
    let name = node.name.clone();
    let Some(target) = node.behavior::<Assembler>().and_then(|a| a.target) else {
        return Ok(AssembleOutcome::Skipped);
    };
    if !database.contains(target) {
        return Err(AssembleError::TemplateNotFound(target));
    }

    progress.update(PRE_ASSEMBLY, "Pre-assembly");
    run_hooks(
        graph,
        marker,
        AssemblyStage::PreAssemble,
        (PRE_ASSEMBLY, PRE_HOOKS_END),
        ctx,
        progress,
        &name,
    )?;

    progress.update(CLONING, "Cloning");
    let clone = graph.duplicate_subtree(marker)?;

    let result = assemble_clone(graph, clone, target, database, registry, ctx, progress);

    progress.update(CLEANUP, "Cleanup");
    graph.despawn_subtree(clone);

    result.map(|()| AssembleOutcome::Assembled)
}

/// The stages that touch the clone and the template. Split out so the
/// caller can despawn the clone whether these succeed or not.
fn assemble_clone(
    graph: &mut SceneGraph,
    clone: NodeId,
    target: TemplateId,
    database: &mut AssetDatabase,
    registry: &BehaviorRegistry,
    ctx: &AssembleContext,
    progress: &mut dyn ProgressSink,
) -> Result<()> {
    // The clone kept the marker node's name.
    let name = graph
        .get(clone)
        .map(|n| n.name.clone())
        .unwrap_or_default();

    progress.update(ASSEMBLING, "Assembling");
    run_hooks(
        graph,
        clone,
        AssemblyStage::Assemble,
        (ASSEMBLING, ASSEMBLE_HOOKS_END),
        ctx,
        progress,
        &name,
    )?;

    progress.update(APPLYING, "Applying");
    let template = database
        .get_mut(target)
        .ok_or(AssembleError::TemplateNotFound(target))?;
    template.replace_contents(graph, clone)?;
    database.save(target, registry)?;

    progress.update(POST_ASSEMBLY, "Post-assembly");
    let template = database
        .get_mut(target)
        .ok_or(AssembleError::TemplateNotFound(target))?;
    if let Some(root) = template.root() {
        let mut scoped = ScaledProgress::new(progress, POST_ASSEMBLY, POST_HOOKS_END);
        run_assembly_stage(
            &mut template.content,
            root,
            root,
            AssemblyStage::PostAssemble,
            ctx,
            &mut scoped,
        )
        .map_err(|source| AssembleError::Hook {
            marker: name.clone(),
            stage: AssemblyStage::PostAssemble,
            source,
        })?;
    }
    template.set_stage_label(&ctx.scene_name);
    database.save(target, registry)?;

    Ok(())
}

fn run_hooks(
    graph: &mut SceneGraph,
    root: NodeId,
    stage: AssemblyStage,
    slice: (f32, f32),
    ctx: &AssembleContext,
    progress: &mut dyn ProgressSink,
    name: &str,
) -> Result<()> {
    let mut scoped = ScaledProgress::new(progress, slice.0, slice.1);
    run_assembly_stage(graph, root, root, stage, ctx, &mut scoped).map_err(|source| {
        AssembleError::Hook {
            marker: name.to_string(),
            stage,
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_core::NullProgress;

    fn registry() -> BehaviorRegistry {
        let mut registry = BehaviorRegistry::new();
        registry.register::<Assembler>();
        registry
    }

    #[test]
    fn test_skips_marker_without_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut database = AssetDatabase::new(dir.path());
        let registry = registry();

        let mut graph = SceneGraph::new();
        let marker = graph.spawn("Props");
        graph
            .get_mut(marker)
            .unwrap()
            .add_behavior(Box::new(Assembler::default()));

        let ctx = AssembleContext::new("demo.scene");
        let outcome = assemble_one(
            &mut graph,
            marker,
            &mut database,
            &registry,
            &ctx,
            &mut NullProgress,
        )
        .unwrap();
        assert_eq!(outcome, AssembleOutcome::Skipped);
        assert_eq!(database.count(), 0);
    }

    #[test]
    fn test_skips_missing_node() {
        let dir = tempfile::tempdir().unwrap();
        let mut database = AssetDatabase::new(dir.path());
        let registry = registry();
        let mut graph = SceneGraph::new();

        let ctx = AssembleContext::new("demo.scene");
        let outcome = assemble_one(
            &mut graph,
            NodeId(99),
            &mut database,
            &registry,
            &ctx,
            &mut NullProgress,
        )
        .unwrap();
        assert_eq!(outcome, AssembleOutcome::Skipped);
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut database = AssetDatabase::new(dir.path());
        let registry = registry();

        let mut graph = SceneGraph::new();
        let marker = graph.spawn("Props");
        graph.get_mut(marker).unwrap().add_behavior(Box::new(
            Assembler::with_target(TemplateId::from_path("missing.prefab")),
        ));

        let ctx = AssembleContext::new("demo.scene");
        let err = assemble_one(
            &mut graph,
            marker,
            &mut database,
            &registry,
            &ctx,
            &mut NullProgress,
        );
        assert!(matches!(err, Err(AssembleError::TemplateNotFound(_))));
        // No clone left behind.
        assert_eq!(graph.len(), 1);
    }
}
