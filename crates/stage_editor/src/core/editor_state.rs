//! Central editor state - single source of truth.
//!
//! All editor data flows through `EditorState`: the open scene graph, the
//! template database, selection, preferences and the activity feed. Panels
//! read from it and call its methods; none of them hold scene data of
//! their own.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use stage_assembler::{
    all_assemblers, assemble_batch, assemble_one, expand_dependencies, expand_hierarchy,
    AssembleError, Assembler, BatchReport,
};
use stage_asset::AssetDatabase;
use stage_core::{ProgressSink, ScaledProgress, TemplateId};
use stage_scene::{AssembleContext, BehaviorRegistry, NodeId, SceneDoc, SceneGraph};

use super::save_hook::save_hook_markers;
use super::{Preferences, SelectionManager, SelectionMode};
use crate::error::{EditorError, Result};
use crate::panels::ActivityLog;

/// Scene name used before the scene has been saved anywhere.
pub const UNTITLED_SCENE: &str = "untitled";

/// Outcome of a project-wide assembly pass over every scene file.
#[derive(Debug, Default)]
pub struct ProjectReport {
    /// Scenes that were opened and assembled
    pub scenes: usize,
    /// Templates written across all scenes
    pub assembled: usize,
    /// Failed markers plus scenes that would not load
    pub errors: usize,
    /// True when the user cancelled between scenes
    pub cancelled: bool,
}

/// Central editor state.
pub struct EditorState {
    // Scene data
    pub graph: SceneGraph,
    pub scene_path: Option<PathBuf>,
    pub scene_modified: bool,

    // Selection
    pub selection: SelectionManager,

    // Behavior serialization
    pub registry: BehaviorRegistry,

    // Template database
    pub database: AssetDatabase,

    // Preferences
    pub preferences: Preferences,

    // Activity feed
    pub activity: ActivityLog,

    // Status message
    pub status_message: String,
}

impl EditorState {
    /// Create an editor over a project root. Templates and scene files are
    /// indexed relative to this directory.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let mut registry = BehaviorRegistry::new();
        registry.register::<Assembler>();

        let preferences = Preferences::default();
        let mut database = AssetDatabase::new(project_root);
        let indexed = database.refresh(&registry);

        let mut activity = ActivityLog::with_capacity(preferences.activity_capacity);
        activity.info(format!("Indexed {} template(s)", indexed));

        Self {
            graph: SceneGraph::new(),
            scene_path: None,
            scene_modified: false,
            selection: SelectionManager::new(),
            registry,
            database,
            preferences,
            activity,
            status_message: "Ready".to_string(),
        }
    }

    /// Set the status bar message.
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    /// Display name of the current scene (file stem, or a placeholder).
    pub fn scene_name(&self) -> String {
        self.scene_path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| UNTITLED_SCENE.to_string())
    }

    /// Scene path relative to the project root, forward slashes. This is
    /// the name stamped into templates the scene produces.
    pub fn scene_rel_path(&self) -> String {
        let Some(path) = &self.scene_path else {
            return UNTITLED_SCENE.to_string();
        };
        match path.strip_prefix(self.database.root()) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| UNTITLED_SCENE.to_string()),
        }
    }

    /// Load preferences from the default config path and apply them.
    pub fn load_preferences(&mut self) -> Result<()> {
        if let Some(path) = Preferences::default_path() {
            self.preferences = Preferences::load(&path)?;
            self.apply_preferences();
        }
        Ok(())
    }

    /// Write preferences to the default config path.
    pub fn save_preferences(&self) -> Result<()> {
        match Preferences::default_path() {
            Some(path) => self.preferences.save(&path),
            None => Ok(()),
        }
    }

    /// Push preference values into the parts of the editor that cache them.
    pub fn apply_preferences(&mut self) {
        self.activity.set_capacity(self.preferences.activity_capacity);
        self.activity.collapse_duplicates = self.preferences.collapse_duplicates;
    }

    // ========================================================================
    // Node Operations
    // ========================================================================

    /// Spawn a new root node.
    pub fn spawn_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.graph.spawn(name);
        self.scene_modified = true;
        id
    }

    /// Spawn a child under an existing node.
    pub fn spawn_child_node(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId> {
        let id = self.graph.spawn_child(parent, name)?;
        self.scene_modified = true;
        Ok(id)
    }

    /// Delete the selected nodes and their subtrees.
    pub fn despawn_selected(&mut self) {
        let selected: Vec<NodeId> = self.selection.selected().to_vec();
        for id in selected {
            let Some(node) = self.graph.get(id) else {
                // Already gone, deleted as part of an earlier subtree.
                self.selection.remove_node(id);
                continue;
            };
            let name = node.name.clone();
            self.graph.despawn_subtree(id);
            self.selection.remove_node(id);
            self.scene_modified = true;
            self.activity.info(format!("Deleted: {}", name));
        }
        self.set_status("Deleted selection");
    }

    /// Duplicate the selected subtrees and select the copies.
    pub fn duplicate_selected(&mut self) {
        let selected: Vec<NodeId> = self.selection.selected().to_vec();
        let mut copies = Vec::new();

        for id in selected {
            match self.graph.duplicate_subtree(id) {
                Ok(copy) => {
                    if let Some(node) = self.graph.get_mut(copy) {
                        node.name = format!("{} (Copy)", node.name);
                    }
                    copies.push(copy);
                }
                Err(err) => self.activity.error(format!("Duplicate failed: {}", err)),
            }
        }

        if !copies.is_empty() {
            self.scene_modified = true;
            self.selection.select_multiple(copies);
            self.set_status("Duplicated selection");
        }
    }

    /// Deselect everything.
    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    // ========================================================================
    // Scene Save/Load
    // ========================================================================

    /// Create a new empty scene.
    pub fn new_scene(&mut self) {
        self.graph = SceneGraph::new();
        self.selection.clear();
        self.scene_path = None;
        self.scene_modified = false;

        self.activity.info("New scene created");
        self.set_status("New scene created");
    }

    /// Load a scene from a file.
    pub fn load_scene(&mut self, path: PathBuf) -> Result<()> {
        let doc = SceneDoc::load(&path)?;
        self.graph = doc.instantiate(&self.registry)?;
        self.selection.clear();
        self.scene_path = Some(path);
        self.scene_modified = false;

        let name = self.scene_name();
        self.activity
            .info(format!("Loaded scene: {} ({} nodes)", name, self.graph.len()));
        self.set_status(format!("Loaded: {}", name));
        Ok(())
    }

    /// Save the current scene to a file, then run the assemble-on-save
    /// hook. Returns the hook's batch report when it ran.
    pub fn save_scene(
        &mut self,
        path: PathBuf,
        progress: &mut dyn ProgressSink,
    ) -> Result<Option<BatchReport>> {
        self.write_scene_doc(&path)?;
        self.scene_path = Some(path);
        self.scene_modified = false;

        let name = self.scene_name();
        self.activity.info(format!("Saved scene: {}", name));
        self.set_status(format!("Saved: {}", name));

        Ok(self.run_save_hook(progress))
    }

    /// Save to the current path. Returns `false` when no path is set yet
    /// and the caller has to ask for one.
    pub fn save_scene_current(&mut self, progress: &mut dyn ProgressSink) -> Result<bool> {
        match self.scene_path.clone() {
            Some(path) => {
                self.save_scene(path, progress)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn write_scene_doc(&self, path: &Path) -> Result<()> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| UNTITLED_SCENE.to_string());
        let doc = SceneDoc::from_graph(&self.graph, &self.registry, name)?;
        doc.save(path)?;
        Ok(())
    }

    /// Flush unsaved changes to disk before an operation that switches
    /// scenes. An unsaved scene with no path yet is an error, since there
    /// is nowhere to put it without asking the user.
    fn ensure_scene_saved(&mut self) -> Result<()> {
        if !self.scene_modified {
            return Ok(());
        }
        match self.scene_path.clone() {
            Some(path) => {
                self.write_scene_doc(&path)?;
                self.scene_modified = false;
                Ok(())
            }
            None => Err(EditorError::UnsavedScene),
        }
    }

    // ========================================================================
    // Assembly
    // ========================================================================

    /// Markers relevant to the current selection: every marker inside a
    /// selected subtree, plus markers on ancestors of the selection.
    /// Deduplicated, in discovery order.
    pub fn selected_markers(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut markers = Vec::new();
        for &selected in self.selection.selected() {
            for id in self.graph.subtree(selected) {
                self.push_if_marker(id, &mut seen, &mut markers);
            }
            for id in self.graph.ancestors(selected) {
                self.push_if_marker(id, &mut seen, &mut markers);
            }
        }
        markers
    }

    fn push_if_marker(&self, id: NodeId, seen: &mut HashSet<NodeId>, out: &mut Vec<NodeId>) {
        let is_marker = self
            .graph
            .get(id)
            .map(|n| n.has_behavior::<Assembler>())
            .unwrap_or(false);
        if is_marker && seen.insert(id) {
            out.push(id);
        }
    }

    /// Assemble the selection's markers together with every marker whose
    /// template transitively contains their output.
    pub fn assemble_selected(&mut self, progress: &mut dyn ProgressSink) -> BatchReport {
        let markers = expand_hierarchy(&self.graph, &self.selected_markers());
        self.run_batch(&markers, false, progress)
    }

    /// Assemble the selection's markers after every marker that produces
    /// a template they contain.
    pub fn assemble_dependencies(&mut self, progress: &mut dyn ProgressSink) -> BatchReport {
        let markers = expand_dependencies(&self.graph, &self.selected_markers());
        self.run_batch(&markers, false, progress)
    }

    /// Assemble every marker in the scene, without expansion.
    pub fn assemble_all(&mut self, progress: &mut dyn ProgressSink) -> BatchReport {
        let markers = all_assemblers(&self.graph);
        self.run_batch(&markers, false, progress)
    }

    /// Run the assemble-on-save hook: markers picked out by behaviors that
    /// request reassembly on save. `None` when the preference is off or
    /// nothing asked for it.
    pub fn run_save_hook(&mut self, progress: &mut dyn ProgressSink) -> Option<BatchReport> {
        if !self.preferences.assemble_on_save {
            return None;
        }
        let markers = save_hook_markers(&self.graph);
        if markers.is_empty() {
            return None;
        }
        log::debug!("Save hook selected {} marker(s)", markers.len());
        Some(self.run_batch(&markers, true, progress))
    }

    /// Open every scene file under the project root in turn and assemble
    /// all of its markers, then restore the scene that was open. The
    /// current scene must be saved (or saveable) first.
    pub fn assemble_all_scenes(
        &mut self,
        progress: &mut dyn ProgressSink,
    ) -> Result<ProjectReport> {
        self.ensure_scene_saved()?;
        let original = self.scene_path.clone();

        let scenes = self.database.scene_files();
        let total = scenes.len();
        let mut report = ProjectReport::default();

        for (i, scene) in scenes.iter().enumerate() {
            let start = i as f32 / total as f32;
            let end = (i + 1) as f32 / total as f32;
            progress.update(start, &format!("Assembling {}", scene.display()));
            if progress.is_cancelled() {
                report.cancelled = true;
                log::info!("Project assembly cancelled, {} scene(s) left", total - i);
                break;
            }

            if let Err(err) = self.load_scene(scene.clone()) {
                self.activity
                    .error(format!("Could not open {}: {}", scene.display(), err));
                report.errors += 1;
                continue;
            }
            report.scenes += 1;

            let mut slice = ScaledProgress::new(&mut *progress, start, end);
            let batch = self.assemble_all(&mut slice);
            report.assembled += batch.assembled.len();
            report.errors += batch.errors.len();
            if batch.cancelled {
                report.cancelled = true;
                break;
            }
        }

        match original {
            Some(path) => self.load_scene(path)?,
            None => self.new_scene(),
        }

        self.activity.info(format!(
            "Project assembly: {} scene(s), {} template(s), {} error(s)",
            report.scenes, report.assembled, report.errors
        ));
        if report.cancelled {
            self.set_status("Project assembly cancelled");
        } else {
            self.set_status(format!(
                "Assembled {} template(s) across {} scene(s)",
                report.assembled, report.scenes
            ));
        }
        Ok(report)
    }

    fn run_batch(
        &mut self,
        markers: &[NodeId],
        saving: bool,
        progress: &mut dyn ProgressSink,
    ) -> BatchReport {
        if markers.is_empty() {
            self.set_status("No markers to assemble");
            return BatchReport::default();
        }

        let mut ctx = AssembleContext::new(self.scene_rel_path());
        if saving {
            ctx = ctx.saving();
        }

        let report = assemble_batch(
            &mut self.graph,
            markers,
            &mut self.database,
            &self.registry,
            &ctx,
            progress,
        );
        self.note_batch(&report);
        report
    }

    fn note_batch(&mut self, report: &BatchReport) {
        for (marker, err) in &report.errors {
            self.activity.error(format!("{}: {}", marker, err));
        }
        self.activity
            .batch(report.assembled.len(), report.errors.len());

        if report.cancelled {
            self.set_status("Assembly cancelled");
        } else if report.errors.is_empty() {
            self.set_status(format!("Assembled {} template(s)", report.assembled.len()));
        } else {
            self.set_status(format!(
                "Assembled {} template(s), {} failed",
                report.assembled.len(),
                report.errors.len()
            ));
        }
    }

    // ========================================================================
    // Staging
    // ========================================================================

    /// Start a staging scene for one template: a fresh scene holding a
    /// single marker aimed at the template. Creating the template assembles
    /// it once so the file exists with the marker's (empty) contents.
    pub fn new_staging_scene(
        &mut self,
        template_path: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<NodeId> {
        self.ensure_scene_saved()?;
        self.new_scene();

        let name = Path::new(template_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| template_path.to_string());
        let node = self.spawn_node(name);
        self.set_assembler_target(node, template_path, progress)?;

        self.selection.select(node, SelectionMode::Replace);
        self.set_status(format!("Staging scene for {}", template_path));
        Ok(node)
    }

    /// Instantiate a marker's template next to the marker, at the marker's
    /// transform, as a sibling under the same parent. The marker stays
    /// selected so repeated placement is one click per copy.
    pub fn instantiate_template(&mut self, node: NodeId) -> Result<NodeId> {
        let marker = self.graph.get(node).ok_or(EditorError::NodeNotFound(node))?;
        let target = marker
            .behavior::<Assembler>()
            .and_then(|a| a.target)
            .ok_or(EditorError::NoMarker(node))?;
        let transform = marker.transform;
        let parent = marker.parent;

        let template = self
            .database
            .get(target)
            .ok_or(AssembleError::TemplateNotFound(target))?;
        let instance = template
            .instantiate_into(&mut self.graph)
            .ok_or(EditorError::EmptyTemplate(target))?;

        if let Some(n) = self.graph.get_mut(instance) {
            n.transform = transform;
        }
        self.graph.reparent(instance, parent)?;
        self.scene_modified = true;
        self.selection.select(node, SelectionMode::Replace);

        let name = self
            .graph
            .get(instance)
            .map(|n| n.name.clone())
            .unwrap_or_default();
        self.activity.info(format!("Instantiated template: {}", name));
        self.set_status(format!("Instantiated: {}", name));
        Ok(instance)
    }

    /// Point a node's marker at a template path, attaching a marker first
    /// when the node has none. A template that does not exist yet is
    /// created and assembled once; an existing one is only assigned, so
    /// its contents survive until the user assembles deliberately.
    pub fn set_assembler_target(
        &mut self,
        node: NodeId,
        template_path: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<TemplateId> {
        if !self.graph.contains(node) {
            return Err(EditorError::NodeNotFound(node));
        }

        let existed = self.database.find_by_path(template_path).is_some()
            || self.database.abs_path(template_path).is_file();
        let target = self.database.load_or_create(template_path, &self.registry)?;

        if let Some(n) = self.graph.get_mut(node) {
            match n.behavior_mut::<Assembler>() {
                Some(marker) => marker.target = Some(target),
                None => n.add_behavior(Box::new(Assembler::with_target(target))),
            }
        }
        self.scene_modified = true;

        if !existed {
            let ctx = AssembleContext::new(self.scene_rel_path());
            assemble_one(
                &mut self.graph,
                node,
                &mut self.database,
                &self.registry,
                &ctx,
                progress,
            )?;
        }

        self.activity
            .info(format!("Marker target set: {}", template_path));
        self.set_status(format!("Target: {}", template_path));
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_core::NullProgress;

    fn state() -> (tempfile::TempDir, EditorState) {
        let dir = tempfile::tempdir().unwrap();
        let state = EditorState::new(dir.path());
        (dir, state)
    }

    #[test]
    fn test_scene_rel_path_tracks_the_saved_location() {
        let (dir, mut state) = state();
        assert_eq!(state.scene_rel_path(), UNTITLED_SCENE);

        state.spawn_node("Root");
        let path = dir.path().join("scenes").join("yard.scene");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        state.save_scene(path, &mut NullProgress).unwrap();

        assert_eq!(state.scene_rel_path(), "scenes/yard.scene");
        assert_eq!(state.scene_name(), "yard");
        assert!(!state.scene_modified);
    }

    #[test]
    fn test_selected_markers_cover_subtree_and_ancestors() {
        let (_dir, mut state) = state();
        let outer = state.spawn_node("Outer");
        let mid = state.spawn_child_node(outer, "Mid").unwrap();
        let inner = state.spawn_child_node(mid, "Inner").unwrap();
        for id in [outer, inner] {
            state.graph.get_mut(id).unwrap().add_behavior(Box::new(Assembler::default()));
        }

        state.selection.select(mid, SelectionMode::Replace);

        assert_eq!(state.selected_markers(), vec![inner, outer]);
    }

    #[test]
    fn test_despawn_selected_drops_subtrees_and_selection() {
        let (_dir, mut state) = state();
        let root = state.spawn_node("Root");
        let child = state.spawn_child_node(root, "Child").unwrap();
        state.selection.select_multiple([root, child]);

        state.despawn_selected();

        assert!(state.graph.is_empty());
        assert!(state.selection.is_empty());
    }

    #[test]
    fn test_assemble_all_scenes_requires_a_saveable_scene() {
        let (_dir, mut state) = state();
        state.spawn_node("Root");

        let err = state.assemble_all_scenes(&mut NullProgress).unwrap_err();
        assert!(matches!(err, EditorError::UnsavedScene));
    }
}
