//! Template assets: persisted node trees produced by assembly.
//!
//! A template holds a single-rooted scene subtree plus free-text labels and
//! metadata. Replacing its contents matches the incoming tree against the
//! stored one by node name, so records that survive a re-assembly keep
//! their ids.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use stage_core::TemplateId;
use stage_scene::{
    docs_to_graph, nodes_to_docs, BehaviorRegistry, Node, NodeDoc, NodeId, SceneError, SceneGraph,
};

use crate::error::Result;

/// File extension for template documents.
pub const TEMPLATE_EXTENSION: &str = "prefab";

/// Label prefix recording which scene last produced a template.
pub const STAGE_LABEL_PREFIX: &str = "stage:";

fn default_version() -> u32 {
    1
}

/// Template metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TemplateMetadata {
    /// Creation timestamp
    pub created: Option<String>,
    /// Author/source
    pub author: Option<String>,
    /// Description
    pub description: Option<String>,
}

/// On-disk template document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateDoc {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub metadata: TemplateMetadata,
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
}

/// A loaded template asset.
pub struct TemplateAsset {
    /// Identifier derived from the project-relative path
    pub id: TemplateId,
    /// Display name (the file stem)
    pub name: String,
    /// Project-relative path, forward slashes
    pub path: String,
    /// Free-text labels
    pub labels: Vec<String>,
    /// Document metadata
    pub metadata: TemplateMetadata,
    /// The stored node tree
    pub content: SceneGraph,
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

fn stem_of(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

impl TemplateAsset {
    /// Create an empty template for a project-relative path.
    pub fn new(path: impl Into<String>) -> Self {
        let path = normalize(&path.into());
        Self {
            id: TemplateId::from_path(&path),
            name: stem_of(&path),
            path,
            labels: Vec::new(),
            metadata: TemplateMetadata::default(),
            content: SceneGraph::new(),
        }
    }

    /// Root of the stored tree, if the template has contents.
    pub fn root(&self) -> Option<NodeId> {
        self.content.roots().next()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Whether a label is present.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Add a label if it is not already present.
    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.has_label(&label) {
            self.labels.push(label);
        }
    }

    /// Record which scene produced this template. An existing stage label
    /// is replaced in place; otherwise one is appended.
    pub fn set_stage_label(&mut self, scene: &str) {
        let label = format!("{}{}", STAGE_LABEL_PREFIX, scene);
        for existing in self.labels.iter_mut() {
            if existing.starts_with(STAGE_LABEL_PREFIX) {
                *existing = label;
                return;
            }
        }
        self.labels.push(label);
    }

    /// The scene recorded as this template's producer, if any.
    pub fn staging_scene(&self) -> Option<&str> {
        self.labels
            .iter()
            .find_map(|l| l.strip_prefix(STAGE_LABEL_PREFIX))
    }

    /// Replace the stored tree with a deep copy of a subtree from another
    /// graph.
    ///
    /// Nodes are matched against the old contents by name, pairwise down
    /// the tree (the two roots always pair); matched records keep their
    /// ids, unmatched incoming nodes get fresh ones, and old records with
    /// no match are dropped.
    pub fn replace_contents(&mut self, source: &SceneGraph, source_root: NodeId) -> Result<()> {
        let order = source.subtree(source_root);
        if order.is_empty() {
            return Err(SceneError::NodeNotFound(source_root).into());
        }

        // Pair incoming nodes with stored records.
        let mut pairs: HashMap<NodeId, NodeId> = HashMap::new();
        if let Some(old_root) = self.root() {
            pair_by_name(&self.content, old_root, source, source_root, &mut pairs);
        }

        // Fresh ids start past everything the old tree used.
        let mut next = self.content.iter().map(|n| n.id.0).max().unwrap_or(0) + 1;
        let mut assign: HashMap<NodeId, NodeId> = HashMap::with_capacity(order.len());
        for &sid in &order {
            let final_id = pairs.get(&sid).copied().unwrap_or_else(|| {
                let id = NodeId(next);
                next += 1;
                id
            });
            assign.insert(sid, final_id);
        }

        let mut content = SceneGraph::new();
        for &sid in &order {
            let node = source.get(sid).ok_or(SceneError::NodeNotFound(sid))?;
            content.insert(Node {
                id: assign[&sid],
                name: node.name.clone(),
                transform: node.transform,
                parent: node.parent.and_then(|p| assign.get(&p).copied()),
                children: node
                    .children
                    .iter()
                    .filter_map(|c| assign.get(c).copied())
                    .collect(),
                instance_of: node.instance_of,
                behaviors: node.behaviors.iter().map(|b| b.clone_box()).collect(),
            });
        }
        self.content = content;
        Ok(())
    }

    /// Deep-copy the template's tree into a scene graph as a new root,
    /// marked as an instance of this template. Returns the instance root,
    /// or `None` for an empty template.
    pub fn instantiate_into(&self, graph: &mut SceneGraph) -> Option<NodeId> {
        let root = self.root()?;
        let order = self.content.subtree(root);

        let mut mapping: HashMap<NodeId, NodeId> = HashMap::with_capacity(order.len());
        for &cid in &order {
            let name = self.content.get(cid)?.name.clone();
            mapping.insert(cid, graph.spawn(name));
        }
        for &cid in &order {
            let src = self.content.get(cid)?;
            let nid = mapping[&cid];
            let node = graph.get_mut(nid)?;
            node.transform = src.transform;
            node.parent = src.parent.and_then(|p| mapping.get(&p).copied());
            node.children = src
                .children
                .iter()
                .filter_map(|c| mapping.get(c).copied())
                .collect();
            node.instance_of = src.instance_of;
            node.behaviors = src.behaviors.iter().map(|b| b.clone_box()).collect();
        }

        let instance = mapping[&root];
        graph.get_mut(instance)?.instance_of = Some(self.id);
        Some(instance)
    }

    /// Serialize into a document.
    pub fn to_doc(&self, registry: &BehaviorRegistry) -> Result<TemplateDoc> {
        Ok(TemplateDoc {
            version: 1,
            name: self.name.clone(),
            labels: self.labels.clone(),
            metadata: self.metadata.clone(),
            nodes: nodes_to_docs(&self.content, registry)?,
        })
    }

    /// Rebuild from a document loaded from `path`.
    pub fn from_doc(doc: TemplateDoc, path: &str, registry: &BehaviorRegistry) -> Result<Self> {
        let path = normalize(path);
        Ok(Self {
            id: TemplateId::from_path(&path),
            name: stem_of(&path),
            path,
            labels: doc.labels,
            metadata: doc.metadata,
            content: docs_to_graph(&doc.nodes, registry)?,
        })
    }

    /// Write the template to disk as pretty JSON.
    pub fn save(&self, file: &Path, registry: &BehaviorRegistry) -> Result<()> {
        let doc = self.to_doc(registry)?;
        let json = serde_json::to_string_pretty(&doc)?;
        fs::write(file, json)?;
        Ok(())
    }

    /// Load a template from disk. `path` is the project-relative path the
    /// id derives from; `file` is where the document actually lives.
    pub fn load(file: &Path, path: &str, registry: &BehaviorRegistry) -> Result<Self> {
        let content = fs::read_to_string(file)?;
        let doc: TemplateDoc = serde_json::from_str(&content)?;
        Self::from_doc(doc, path, registry)
    }
}

/// Recursively pair same-named children of two trees, seeding from the two
/// roots. Each stored child is claimed at most once.
fn pair_by_name(
    old: &SceneGraph,
    old_id: NodeId,
    new: &SceneGraph,
    new_id: NodeId,
    out: &mut HashMap<NodeId, NodeId>,
) {
    out.insert(new_id, old_id);

    let Some(old_node) = old.get(old_id) else {
        return;
    };
    let Some(new_node) = new.get(new_id) else {
        return;
    };

    let old_children = old_node.children.clone();
    let mut claimed = vec![false; old_children.len()];
    for &nc in &new_node.children {
        let Some(child) = new.get(nc) else {
            continue;
        };
        let matched = old_children.iter().enumerate().find(|(i, oc)| {
            !claimed[*i]
                && old
                    .get(**oc)
                    .map(|n| n.name == child.name)
                    .unwrap_or(false)
        });
        if let Some((i, &oc)) = matched {
            claimed[i] = true;
            pair_by_name(old, oc, new, nc, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_scene::Behavior;
    use std::any::Any;

    #[derive(Clone, Default)]
    struct Payload {
        value: i32,
    }

    impl Behavior for Payload {
        fn type_name(&self) -> &'static str {
            "payload"
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
    }

    fn tree(names: &[(&str, Option<&str>)]) -> (SceneGraph, NodeId) {
        // names: (node, parent name), first entry is the root
        let mut graph = SceneGraph::new();
        let mut ids: HashMap<String, NodeId> = HashMap::new();
        let root = graph.spawn(names[0].0);
        ids.insert(names[0].0.to_string(), root);
        for (name, parent) in &names[1..] {
            let pid = ids[parent.unwrap()];
            let id = graph.spawn_child(pid, *name).unwrap();
            ids.insert(name.to_string(), id);
        }
        (graph, root)
    }

    #[test]
    fn test_replace_into_empty_template() {
        let (scene, root) = tree(&[("Crate", None), ("Lid", Some("Crate"))]);
        let mut template = TemplateAsset::new("props/crate.prefab");

        template.replace_contents(&scene, root).unwrap();
        assert_eq!(template.content.len(), 2);
        let troot = template.root().unwrap();
        assert_eq!(template.content.get(troot).unwrap().name, "Crate");
    }

    #[test]
    fn test_replace_preserves_ids_by_name() {
        let (first, first_root) = tree(&[("Crate", None), ("Lid", Some("Crate")), ("Hinge", Some("Crate"))]);
        let mut template = TemplateAsset::new("props/crate.prefab");
        template.replace_contents(&first, first_root).unwrap();

        let old_root = template.root().unwrap();
        let old_lid = template.content.find_by_name("Lid").unwrap();
        let old_hinge = template.content.find_by_name("Hinge").unwrap();

        // Second assembly: Lid survives, Hinge is gone, Latch is new.
        let (second, second_root) = tree(&[("Crate", None), ("Latch", Some("Crate")), ("Lid", Some("Crate"))]);
        template.replace_contents(&second, second_root).unwrap();

        assert_eq!(template.root().unwrap(), old_root);
        assert_eq!(template.content.find_by_name("Lid"), Some(old_lid));
        assert!(!template.content.contains(old_hinge));

        let latch = template.content.find_by_name("Latch").unwrap();
        assert_ne!(latch, old_hinge);
        assert_ne!(latch, old_lid);
    }

    #[test]
    fn test_replace_matches_same_names_once() {
        let mut first = SceneGraph::new();
        let first_root = first.spawn("Root");
        first.spawn_child(first_root, "Slot").unwrap();
        first.spawn_child(first_root, "Slot").unwrap();

        let mut template = TemplateAsset::new("props/slots.prefab");
        template.replace_contents(&first, first_root).unwrap();
        let slot_ids: Vec<NodeId> = template
            .content
            .get(template.root().unwrap())
            .unwrap()
            .children
            .clone();
        assert_eq!(slot_ids.len(), 2);
        assert_ne!(slot_ids[0], slot_ids[1]);

        let mut second = SceneGraph::new();
        let second_root = second.spawn("Root");
        second.spawn_child(second_root, "Slot").unwrap();
        second.spawn_child(second_root, "Slot").unwrap();
        template.replace_contents(&second, second_root).unwrap();

        let new_slots: Vec<NodeId> = template
            .content
            .get(template.root().unwrap())
            .unwrap()
            .children
            .clone();
        // Each incoming slot claims a distinct stored record, in order.
        assert_eq!(new_slots, slot_ids);
    }

    #[test]
    fn test_replace_copies_behaviors() {
        let (mut scene, root) = tree(&[("Thing", None)]);
        scene
            .get_mut(root)
            .unwrap()
            .add_behavior(Box::new(Payload { value: 9 }));

        let mut template = TemplateAsset::new("thing.prefab");
        template.replace_contents(&scene, root).unwrap();

        let troot = template.root().unwrap();
        let payload = template.content.get(troot).unwrap().behavior::<Payload>();
        assert_eq!(payload.map(|p| p.value), Some(9));

        // The copy is detached from the scene's instance.
        scene.get_mut(root).unwrap().behavior_mut::<Payload>().unwrap().value = 1;
        let payload = template.content.get(troot).unwrap().behavior::<Payload>();
        assert_eq!(payload.map(|p| p.value), Some(9));
    }

    #[test]
    fn test_stage_label_replace_or_append() {
        let mut template = TemplateAsset::new("props/crate.prefab");
        template.add_label("gameplay");

        template.set_stage_label("scenes/staging.scene");
        assert_eq!(template.staging_scene(), Some("scenes/staging.scene"));
        assert_eq!(template.labels.len(), 2);

        template.set_stage_label("scenes/other.scene");
        assert_eq!(template.staging_scene(), Some("scenes/other.scene"));
        assert_eq!(template.labels.len(), 2);
        assert!(template.has_label("gameplay"));
    }

    #[test]
    fn test_instantiate_into_marks_instance() {
        let (scene, root) = tree(&[("Crate", None), ("Lid", Some("Crate"))]);
        let mut template = TemplateAsset::new("props/crate.prefab");
        template.replace_contents(&scene, root).unwrap();

        let mut target = SceneGraph::new();
        let instance = template.instantiate_into(&mut target).unwrap();

        assert_eq!(target.get(instance).unwrap().instance_of, Some(template.id));
        assert_eq!(target.get(instance).unwrap().name, "Crate");
        assert_eq!(target.get(instance).unwrap().children.len(), 1);
    }

    #[test]
    fn test_instantiate_empty_template_is_none() {
        let template = TemplateAsset::new("props/empty.prefab");
        let mut target = SceneGraph::new();
        assert!(template.instantiate_into(&mut target).is_none());
        assert!(target.is_empty());
    }

    #[test]
    fn test_document_roundtrip_through_disk() {
        let registry = BehaviorRegistry::new();
        let (scene, root) = tree(&[("Crate", None), ("Lid", Some("Crate"))]);
        let mut template = TemplateAsset::new("props/crate.prefab");
        template.replace_contents(&scene, root).unwrap();
        template.set_stage_label("scenes/staging.scene");

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("crate.prefab");
        template.save(&file, &registry).unwrap();

        let loaded = TemplateAsset::load(&file, "props/crate.prefab", &registry).unwrap();
        assert_eq!(loaded.id, template.id);
        assert_eq!(loaded.name, "crate");
        assert_eq!(loaded.staging_scene(), Some("scenes/staging.scene"));
        assert_eq!(loaded.content.len(), 2);
        assert_eq!(loaded.root(), template.root());
    }
}
