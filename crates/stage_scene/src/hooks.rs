//! Assembly lifecycle hooks.
//!
//! Behaviors that take part in template assembly implement [`AssemblyHooks`]
//! and surface it through [`Behavior::assembly`]. Each pipeline stage walks
//! the relevant subtree breadth-first, top-down, and calls the matching hook
//! with an explicit [`HookContext`]. Structural edits requested by hooks are
//! queued and applied once the stage's walk is over, so the walk never
//! iterates a graph that is changing under it.

use std::fmt;

use stage_core::ProgressSink;

use crate::behavior::Behavior;
use crate::error::{HookError, HookResult};
use crate::graph::{NodeId, SceneGraph};

/// Which lifecycle stage is being run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblyStage {
    /// On the live source subtree, before cloning.
    PreAssemble,
    /// On the transient clone, before it replaces the template.
    Assemble,
    /// On the written template's contents.
    PostAssemble,
}

impl AssemblyStage {
    pub fn label(&self) -> &'static str {
        match self {
            AssemblyStage::PreAssemble => "pre-assembly",
            AssemblyStage::Assemble => "assembling",
            AssemblyStage::PostAssemble => "post-assembly",
        }
    }
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ambient facts about an assembly run, passed explicitly down the call
/// chain instead of living in globals.
#[derive(Clone, Debug)]
pub struct AssembleContext {
    /// Name of the scene driving the assembly. Ends up in template labels
    /// and log lines.
    pub scene_name: String,
    /// True when the run was triggered by a scene save.
    pub is_saving: bool,
}

impl AssembleContext {
    pub fn new(scene_name: impl Into<String>) -> Self {
        Self {
            scene_name: scene_name.into(),
            is_saving: false,
        }
    }

    pub fn saving(mut self) -> Self {
        self.is_saving = true;
        self
    }
}

/// Lifecycle callbacks a behavior can run during assembly. All methods
/// default to doing nothing.
pub trait AssemblyHooks {
    /// Called on the live source subtree before cloning.
    fn on_pre_assemble(&mut self, _ctx: &mut HookContext) -> HookResult {
        Ok(())
    }

    /// Called on the transient clone before it replaces the template.
    /// An error here aborts the marker's pipeline and discards the clone.
    fn on_assemble(&mut self, _ctx: &mut HookContext) -> HookResult {
        Ok(())
    }

    /// Called on the freshly written template's behaviors.
    fn on_post_assemble(&mut self, _ctx: &mut HookContext) -> HookResult {
        Ok(())
    }
}

/// Per-call view handed to a hook.
pub struct HookContext<'a> {
    /// Node owning the behavior currently being called.
    pub node: NodeId,
    /// Root node of the marker whose pipeline is running.
    pub assembler: NodeId,
    /// Name of the scene driving the assembly.
    pub scene_name: &'a str,
    /// True when the run was triggered by a scene save.
    pub is_saving: bool,
    behavior_index: usize,
    sink: &'a mut dyn ProgressSink,
    queue: &'a mut HookQueue,
}

impl HookContext<'_> {
    /// Report hook progress. The fraction covers this stage's slice of the
    /// overall pipeline bar.
    pub fn progress(&mut self, fraction: f32, message: &str) {
        self.sink.update(fraction, message);
    }

    /// Queue removal of the behavior this hook belongs to. Applied once the
    /// current stage finishes walking.
    pub fn remove_self(&mut self) {
        self.queue.remove_behavior(self.node, self.behavior_index);
    }

    /// Queue removal of a node and its subtree. Applied once the current
    /// stage finishes walking.
    pub fn despawn_node(&mut self, node: NodeId) {
        self.queue.despawn(node);
    }
}

/// Structural edits queued by hooks during a stage walk.
#[derive(Default)]
pub struct HookQueue {
    remove_behaviors: Vec<(NodeId, usize)>,
    despawns: Vec<NodeId>,
}

impl HookQueue {
    fn remove_behavior(&mut self, node: NodeId, index: usize) {
        self.remove_behaviors.push((node, index));
    }

    fn despawn(&mut self, node: NodeId) {
        self.despawns.push(node);
    }

    fn apply(mut self, graph: &mut SceneGraph) {
        // Highest index first, so earlier removals on the same node do not
        // shift the later ones.
        self.remove_behaviors
            .sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        self.remove_behaviors.dedup();
        for (node_id, index) in self.remove_behaviors {
            if let Some(node) = graph.get_mut(node_id) {
                if index < node.behaviors.len() {
                    node.behaviors.remove(index);
                }
            }
        }
        for id in self.despawns {
            graph.despawn_subtree(id);
        }
    }
}

/// Run one lifecycle stage over a subtree.
///
/// Walks `root`'s subtree breadth-first, calling the stage's hook on every
/// behavior that exposes the assembly capability. Stops at the first hook
/// error; edits queued by hooks that already ran are still applied.
pub fn run_assembly_stage(
    graph: &mut SceneGraph,
    root: NodeId,
    assembler: NodeId,
    stage: AssemblyStage,
    ctx: &AssembleContext,
    progress: &mut dyn ProgressSink,
) -> Result<(), HookError> {
    let order = graph.behaviors_top_down(root);
    let mut queue = HookQueue::default();
    let mut result = Ok(());

    for (node_id, index) in order {
        let Some(node) = graph.get_mut(node_id) else {
            continue;
        };
        let Some(slot) = node.behaviors.get_mut(index) else {
            continue;
        };
        let Some(hooks) = slot.assembly() else {
            continue;
        };

        let mut call_ctx = HookContext {
            node: node_id,
            assembler,
            scene_name: ctx.scene_name.as_str(),
            is_saving: ctx.is_saving,
            behavior_index: index,
            sink: &mut *progress,
            queue: &mut queue,
        };
        let call = match stage {
            AssemblyStage::PreAssemble => hooks.on_pre_assemble(&mut call_ctx),
            AssemblyStage::Assemble => hooks.on_assemble(&mut call_ctx),
            AssemblyStage::PostAssemble => hooks.on_post_assemble(&mut call_ctx),
        };
        if let Err(err) = call {
            result = Err(err);
            break;
        }
    }

    queue.apply(graph);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_core::NullProgress;
    use std::any::Any;

    #[derive(Clone, Default)]
    struct Probe {
        calls: Vec<String>,
        remove_on_assemble: bool,
        fail_on_assemble: bool,
    }

    impl Behavior for Probe {
        fn type_name(&self) -> &'static str {
            "probe"
        }

        fn clone_box(&self) -> Box<dyn Behavior> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn assembly(&mut self) -> Option<&mut dyn AssemblyHooks> {
            Some(self)
        }
    }

    impl AssemblyHooks for Probe {
        fn on_pre_assemble(&mut self, ctx: &mut HookContext) -> HookResult {
            self.calls.push(format!("pre:{}", ctx.scene_name));
            Ok(())
        }

        fn on_assemble(&mut self, ctx: &mut HookContext) -> HookResult {
            self.calls.push("assemble".to_string());
            if self.fail_on_assemble {
                return Err(HookError::new("probe failed"));
            }
            if self.remove_on_assemble {
                ctx.remove_self();
            }
            Ok(())
        }

        fn on_post_assemble(&mut self, _ctx: &mut HookContext) -> HookResult {
            self.calls.push("post".to_string());
            Ok(())
        }
    }

    fn probe_calls(graph: &SceneGraph, id: NodeId) -> Vec<String> {
        graph
            .get(id)
            .and_then(|n| n.behavior::<Probe>())
            .map(|p| p.calls.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_stage_calls_matching_hook() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("Root");
        let child = graph.spawn_child(root, "Child").unwrap();
        graph
            .get_mut(child)
            .unwrap()
            .add_behavior(Box::new(Probe::default()));

        let ctx = AssembleContext::new("demo");
        run_assembly_stage(
            &mut graph,
            root,
            root,
            AssemblyStage::PreAssemble,
            &ctx,
            &mut NullProgress,
        )
        .unwrap();

        assert_eq!(probe_calls(&graph, child), vec!["pre:demo"]);
    }

    #[test]
    fn test_remove_self_applies_after_walk() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("Root");
        graph.get_mut(root).unwrap().add_behavior(Box::new(Probe {
            remove_on_assemble: true,
            ..Default::default()
        }));
        graph
            .get_mut(root)
            .unwrap()
            .add_behavior(Box::new(Probe::default()));

        let ctx = AssembleContext::new("demo");
        run_assembly_stage(
            &mut graph,
            root,
            root,
            AssemblyStage::Assemble,
            &ctx,
            &mut NullProgress,
        )
        .unwrap();

        // Both probes ran, then the first one's removal landed.
        let behaviors = &graph.get(root).unwrap().behaviors;
        assert_eq!(behaviors.len(), 1);
        let survivor = behaviors[0].as_any().downcast_ref::<Probe>().unwrap();
        assert!(!survivor.remove_on_assemble);
        assert_eq!(survivor.calls, vec!["assemble"]);
    }

    #[test]
    fn test_hook_error_stops_walk_but_applies_queue() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("Root");
        let first = graph.spawn_child(root, "First").unwrap();
        let second = graph.spawn_child(root, "Second").unwrap();
        graph.get_mut(first).unwrap().add_behavior(Box::new(Probe {
            remove_on_assemble: true,
            ..Default::default()
        }));
        graph.get_mut(second).unwrap().add_behavior(Box::new(Probe {
            fail_on_assemble: true,
            ..Default::default()
        }));
        let third = graph.spawn_child(root, "Third").unwrap();
        graph
            .get_mut(third)
            .unwrap()
            .add_behavior(Box::new(Probe::default()));

        let ctx = AssembleContext::new("demo");
        let err = run_assembly_stage(
            &mut graph,
            root,
            root,
            AssemblyStage::Assemble,
            &ctx,
            &mut NullProgress,
        );
        assert!(err.is_err());

        // The failing hook stopped the walk before the third probe.
        assert!(probe_calls(&graph, third).is_empty());
        // The first probe's queued removal still landed.
        assert!(graph.get(first).unwrap().behaviors.is_empty());
    }

    #[test]
    fn test_despawn_node_queued() {
        #[derive(Clone, Default)]
        struct StripChildren;

        impl Behavior for StripChildren {
            fn type_name(&self) -> &'static str {
                "strip_children"
            }

            fn clone_box(&self) -> Box<dyn Behavior> {
                Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }

            fn assembly(&mut self) -> Option<&mut dyn AssemblyHooks> {
                Some(self)
            }
        }

        impl AssemblyHooks for StripChildren {
            fn on_assemble(&mut self, ctx: &mut HookContext) -> HookResult {
                let node = ctx.node;
                ctx.despawn_node(node);
                Ok(())
            }
        }

        let mut graph = SceneGraph::new();
        let root = graph.spawn("Root");
        let editor_only = graph.spawn_child(root, "EditorOnly").unwrap();
        graph
            .get_mut(editor_only)
            .unwrap()
            .add_behavior(Box::new(StripChildren));

        let ctx = AssembleContext::new("demo");
        run_assembly_stage(
            &mut graph,
            root,
            root,
            AssemblyStage::Assemble,
            &ctx,
            &mut NullProgress,
        )
        .unwrap();

        assert!(!graph.contains(editor_only));
        assert!(graph.get(root).unwrap().children.is_empty());
    }
}
