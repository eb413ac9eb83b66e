//! Integration tests for stage_assembler

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use stage_assembler::*;
use stage_asset::{AssetDatabase, STAGE_LABEL_PREFIX};
use stage_core::{NullProgress, ProgressSink, TemplateId};
use stage_scene::{
    AssembleContext, AssemblyHooks, AssemblyStage, Behavior, BehaviorRegistry, HookContext,
    HookError, HookResult, NodeId, SceneGraph,
};

/// Records every hook call into a shared log. Clones made for the
/// assembly pipeline share the same log.
#[derive(Clone, Default, Serialize, Deserialize)]
struct Recorder {
    #[serde(skip)]
    log: Rc<RefCell<Vec<String>>>,
}

impl Behavior for Recorder {
    fn type_name(&self) -> &'static str {
        "recorder"
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

impl AssemblyHooks for Recorder {
    fn on_pre_assemble(&mut self, ctx: &mut HookContext) -> HookResult {
        self.log
            .borrow_mut()
            .push(format!("pre:{}", ctx.scene_name));
        ctx.progress(0.5, "halfway");
        Ok(())
    }

    fn on_assemble(&mut self, _ctx: &mut HookContext) -> HookResult {
        self.log.borrow_mut().push("assemble".to_string());
        Ok(())
    }

    fn on_post_assemble(&mut self, _ctx: &mut HookContext) -> HookResult {
        self.log.borrow_mut().push("post".to_string());
        Ok(())
    }
}

/// Fails the assemble stage.
#[derive(Clone, Default, Serialize, Deserialize)]
struct Sabotage;

impl Behavior for Sabotage {
    fn type_name(&self) -> &'static str {
        "sabotage"
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

impl AssemblyHooks for Sabotage {
    fn on_assemble(&mut self, _ctx: &mut HookContext) -> HookResult {
        Err(HookError::new("sabotaged"))
    }
}

fn registry() -> BehaviorRegistry {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut registry = BehaviorRegistry::new();
    registry.register::<Assembler>();
    registry.register::<Recorder>();
    registry.register::<Sabotage>();
    registry
}

/// A marker named "Crates" with a small subtree and a recorder on the root.
fn crates_scene(
    database: &mut AssetDatabase,
    registry: &BehaviorRegistry,
) -> (SceneGraph, NodeId, TemplateId, Rc<RefCell<Vec<String>>>) {
    let mut graph = SceneGraph::new();
    let target = database
        .load_or_create("props/crates.prefab", registry)
        .unwrap();

    let marker = graph.spawn("Crates");
    graph
        .get_mut(marker)
        .unwrap()
        .add_behavior(Box::new(Assembler::with_target(target)));
    let log = Rc::new(RefCell::new(Vec::new()));
    graph.get_mut(marker).unwrap().add_behavior(Box::new(Recorder {
        log: Rc::clone(&log),
    }));

    let lid = graph.spawn_child(marker, "Lid").unwrap();
    graph.spawn_child(lid, "Hinge").unwrap();
    graph.spawn_child(marker, "Base").unwrap();

    (graph, marker, target, log)
}

#[test]
fn test_assemble_writes_template_from_marker_subtree() {
    let dir = tempfile::tempdir().unwrap();
    let mut database = AssetDatabase::new(dir.path());
    let registry = registry();
    let (mut graph, marker, target, log) = crates_scene(&mut database, &registry);
    let before = graph.len();

    let ctx = AssembleContext::new("yard.scene");
    let outcome = assemble_one(
        &mut graph,
        marker,
        &mut database,
        &registry,
        &ctx,
        &mut NullProgress,
    )
    .unwrap();
    assert_eq!(outcome, AssembleOutcome::Assembled);

    // The scene is back to its pre-assembly shape, marker intact.
    assert_eq!(graph.len(), before);
    assert!(graph.get(marker).unwrap().has_behavior::<Assembler>());

    // The template holds the subtree, minus the marker behavior.
    let template = database.get(target).unwrap();
    let root = template.root().unwrap();
    let root_node = template.content.get(root).unwrap();
    assert_eq!(root_node.name, "Crates");
    assert!(!root_node.has_behavior::<Assembler>());
    assert_eq!(template.content.len(), 4);
    assert!(template.content.find_by_name("Hinge").is_some());

    // The template records which scene produced it.
    assert_eq!(template.staging_scene(), Some("yard.scene"));

    // Pre ran on the source, assemble on the clone, post on the template.
    assert_eq!(
        log.borrow().clone(),
        vec!["pre:yard.scene", "assemble", "post"]
    );

    // And it landed on disk.
    let on_disk = std::fs::read_to_string(dir.path().join("props/crates.prefab")).unwrap();
    assert!(on_disk.contains("Crates"));
}

#[test]
fn test_failed_marker_leaves_template_and_scene_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut database = AssetDatabase::new(dir.path());
    let registry = registry();
    let mut graph = SceneGraph::new();

    // A child behavior fails during assembly.
    let broken = graph.spawn("Broken");
    let broken_target = database.load_or_create("broken.prefab", &registry).unwrap();
    graph
        .get_mut(broken)
        .unwrap()
        .add_behavior(Box::new(Assembler::with_target(broken_target)));
    let child = graph.spawn_child(broken, "Child").unwrap();
    graph.get_mut(child).unwrap().add_behavior(Box::new(Sabotage));

    let healthy = graph.spawn("Healthy");
    let healthy_target = database.load_or_create("healthy.prefab", &registry).unwrap();
    graph
        .get_mut(healthy)
        .unwrap()
        .add_behavior(Box::new(Assembler::with_target(healthy_target)));

    let before = graph.len();
    let ctx = AssembleContext::new("demo.scene");
    let report = assemble_batch(
        &mut graph,
        &[broken, healthy],
        &mut database,
        &registry,
        &ctx,
        &mut NullProgress,
    );

    // The failure is attributed to its marker and the batch went on.
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, "Broken");
    assert!(matches!(
        report.errors[0].1,
        AssembleError::Hook {
            stage: AssemblyStage::Assemble,
            ..
        }
    ));
    assert_eq!(report.assembled, vec!["Healthy"]);

    // No clone leaked.
    assert_eq!(graph.len(), before);

    // The broken marker's template was never written, the healthy one was.
    assert!(database.get(broken_target).unwrap().is_empty());
    assert!(!database.get(healthy_target).unwrap().is_empty());
}

#[derive(Default)]
struct CaptureProgress {
    updates: Vec<(f32, String)>,
}

impl ProgressSink for CaptureProgress {
    fn update(&mut self, fraction: f32, message: &str) {
        self.updates.push((fraction, message.to_string()));
    }
}

#[test]
fn test_progress_is_monotonic_through_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let mut database = AssetDatabase::new(dir.path());
    let registry = registry();
    let (mut graph, marker, _target, _log) = crates_scene(&mut database, &registry);

    let ctx = AssembleContext::new("yard.scene");
    let mut sink = CaptureProgress::default();
    assemble_one(&mut graph, marker, &mut database, &registry, &ctx, &mut sink).unwrap();

    let fractions: Vec<f32> = sink.updates.iter().map(|u| u.0).collect();
    for pair in fractions.windows(2) {
        assert!(
            pair[0] <= pair[1],
            "progress went backwards: {:?}",
            fractions
        );
    }
    assert!(sink.updates.iter().any(|u| u.1 == "Cloning"));
    assert!(sink.updates.iter().any(|u| u.1 == "Cleanup"));

    // Hook progress is scaled into the pre-assembly slice.
    let halfway = sink.updates.iter().find(|u| u.1 == "halfway").unwrap();
    assert!(halfway.0 > 0.0 && halfway.0 < 0.2);
}

#[test]
fn test_hierarchy_expansion_reassembles_consumers() {
    let dir = tempfile::tempdir().unwrap();
    let mut database = AssetDatabase::new(dir.path());
    let registry = registry();
    let mut graph = SceneGraph::new();

    let bolt_target = database.load_or_create("bolt.prefab", &registry).unwrap();
    let panel_target = database.load_or_create("panel.prefab", &registry).unwrap();
    let hull_target = database.load_or_create("hull.prefab", &registry).unwrap();

    let bolt = graph.spawn("Bolt");
    graph
        .get_mut(bolt)
        .unwrap()
        .add_behavior(Box::new(Assembler::with_target(bolt_target)));

    // The panel is built out of bolts, the hull out of panels.
    let panel = graph.spawn("Panel");
    graph
        .get_mut(panel)
        .unwrap()
        .add_behavior(Box::new(Assembler::with_target(panel_target)));
    let bolt_instance = graph.spawn_child(panel, "Bolt").unwrap();
    graph.get_mut(bolt_instance).unwrap().instance_of = Some(bolt_target);

    let hull = graph.spawn("Hull");
    graph
        .get_mut(hull)
        .unwrap()
        .add_behavior(Box::new(Assembler::with_target(hull_target)));
    let panel_instance = graph.spawn_child(hull, "Panel").unwrap();
    graph.get_mut(panel_instance).unwrap().instance_of = Some(panel_target);

    // Touching the bolt reassembles everything built on top of it.
    let expanded = expand_hierarchy(&graph, &[bolt]);
    assert_eq!(expanded, vec![bolt, panel, hull]);

    let ctx = AssembleContext::new("assembly_bay.scene");
    let report = assemble_batch(
        &mut graph,
        &expanded,
        &mut database,
        &registry,
        &ctx,
        &mut NullProgress,
    );
    assert!(report.ok());
    assert_eq!(report.assembled, vec!["Bolt", "Panel", "Hull"]);

    // The stored panel keeps its reference to the bolt template.
    let panel_template = database.get(panel_target).unwrap();
    let stored = panel_template.content.find_by_name("Bolt").unwrap();
    assert_eq!(
        panel_template.content.get(stored).unwrap().instance_of,
        Some(bolt_target)
    );
}

#[test]
fn test_dependency_expansion_with_priorities_builds_bottom_up() {
    let dir = tempfile::tempdir().unwrap();
    let mut database = AssetDatabase::new(dir.path());
    let registry = registry();
    let mut graph = SceneGraph::new();

    let bolt_target = database.load_or_create("bolt.prefab", &registry).unwrap();
    let panel_target = database.load_or_create("panel.prefab", &registry).unwrap();
    let hull_target = database.load_or_create("hull.prefab", &registry).unwrap();

    let bolt = graph.spawn("Bolt");
    graph.get_mut(bolt).unwrap().add_behavior(Box::new(Assembler {
        target: Some(bolt_target),
        priority: -2,
    }));

    let panel = graph.spawn("Panel");
    graph.get_mut(panel).unwrap().add_behavior(Box::new(Assembler {
        target: Some(panel_target),
        priority: -1,
    }));
    let bolt_instance = graph.spawn_child(panel, "Bolt").unwrap();
    graph.get_mut(bolt_instance).unwrap().instance_of = Some(bolt_target);

    let hull = graph.spawn("Hull");
    graph.get_mut(hull).unwrap().add_behavior(Box::new(Assembler {
        target: Some(hull_target),
        priority: 0,
    }));
    let panel_instance = graph.spawn_child(hull, "Panel").unwrap();
    graph.get_mut(panel_instance).unwrap().instance_of = Some(panel_target);

    // Expansion discovers top-down, the priority sort runs bottom-up.
    let expanded = expand_dependencies(&graph, &[hull]);
    assert_eq!(expanded, vec![hull, panel, bolt]);

    let ctx = AssembleContext::new("assembly_bay.scene");
    let report = assemble_batch(
        &mut graph,
        &expanded,
        &mut database,
        &registry,
        &ctx,
        &mut NullProgress,
    );
    assert!(report.ok());
    assert_eq!(report.assembled, vec!["Bolt", "Panel", "Hull"]);
}

#[test]
fn test_reassembly_keeps_ids_of_name_matched_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let mut database = AssetDatabase::new(dir.path());
    let registry = registry();
    let (mut graph, marker, target, _log) = crates_scene(&mut database, &registry);

    let ctx = AssembleContext::new("yard.scene");
    assemble_one(
        &mut graph,
        marker,
        &mut database,
        &registry,
        &ctx,
        &mut NullProgress,
    )
    .unwrap();
    let lid_first = database
        .get(target)
        .unwrap()
        .content
        .find_by_name("Lid")
        .unwrap();

    // Grow the source, then reassemble from a different scene.
    let lid_src = graph.find_by_name("Lid").unwrap();
    graph.spawn_child(lid_src, "Latch").unwrap();

    let ctx = AssembleContext::new("other.scene");
    assemble_one(
        &mut graph,
        marker,
        &mut database,
        &registry,
        &ctx,
        &mut NullProgress,
    )
    .unwrap();

    let template = database.get(target).unwrap();
    // Name-matched nodes keep their stored ids, new nodes get fresh ones.
    assert_eq!(template.content.find_by_name("Lid"), Some(lid_first));
    assert!(template.content.find_by_name("Latch").is_some());

    // The stage label moved instead of stacking up.
    assert_eq!(template.staging_scene(), Some("other.scene"));
    let stage_labels = template
        .labels
        .iter()
        .filter(|l| l.starts_with(STAGE_LABEL_PREFIX))
        .count();
    assert_eq!(stage_labels, 1);
}

#[test]
fn test_assembled_template_survives_database_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let mut database = AssetDatabase::new(dir.path());
    let registry = registry();
    let (mut graph, marker, _target, _log) = crates_scene(&mut database, &registry);

    let ctx = AssembleContext::new("yard.scene");
    assemble_one(
        &mut graph,
        marker,
        &mut database,
        &registry,
        &ctx,
        &mut NullProgress,
    )
    .unwrap();

    // A fresh database picks the written template up from disk.
    let mut fresh = AssetDatabase::new(dir.path());
    assert_eq!(fresh.refresh(&registry), 1);
    let id = fresh.find_by_path("props/crates.prefab").unwrap();
    let template = fresh.get(id).unwrap();
    assert_eq!(template.staging_scene(), Some("yard.scene"));
    assert_eq!(template.content.len(), 4);
}
