//! Scene document serialization.
//!
//! Documents are plain serde structs; behavior payloads pass through the
//! [`BehaviorRegistry`] as raw JSON values so the document model never
//! depends on concrete behavior types. Nodes are written in hierarchy order
//! (roots first, each subtree preorder) so children links rebuild in the
//! same order they were saved.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use stage_core::TemplateId;

use crate::behavior::BehaviorRegistry;
use crate::error::{Result, SceneError};
use crate::graph::{Node, NodeId, SceneGraph, Transform};

/// File extension for scene documents.
pub const SCENE_EXTENSION: &str = "scene";

fn default_version() -> u32 {
    1
}

/// On-disk scene document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneDoc {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub metadata: SceneMetadata,
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
}

/// Document header.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One node record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeDoc {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub instance_of: Option<TemplateId>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorDoc>,
}

/// One serialized behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorDoc {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

/// Serialize a graph's nodes into document records, hierarchy order.
pub fn nodes_to_docs(graph: &SceneGraph, registry: &BehaviorRegistry) -> Result<Vec<NodeDoc>> {
    let mut nodes = Vec::with_capacity(graph.len());
    let roots: Vec<NodeId> = graph.roots().collect();
    for root in roots {
        for id in graph.subtree(root) {
            let node = graph.get(id).ok_or(SceneError::NodeNotFound(id))?;
            let mut behaviors = Vec::with_capacity(node.behaviors.len());
            for behavior in &node.behaviors {
                behaviors.push(BehaviorDoc {
                    kind: behavior.type_name().to_string(),
                    data: registry.to_value(behavior.as_ref())?,
                });
            }
            nodes.push(NodeDoc {
                id: node.id.0,
                name: node.name.clone(),
                transform: node.transform,
                parent: node.parent.map(|p| p.0),
                instance_of: node.instance_of,
                behaviors,
            });
        }
    }
    Ok(nodes)
}

/// Rebuild a live graph from document records.
pub fn docs_to_graph(docs: &[NodeDoc], registry: &BehaviorRegistry) -> Result<SceneGraph> {
    let mut graph = SceneGraph::new();
    for doc in docs {
        let id = NodeId(doc.id);
        if graph.contains(id) {
            return Err(SceneError::DuplicateNode(id));
        }
        let mut behaviors = Vec::with_capacity(doc.behaviors.len());
        for b in &doc.behaviors {
            behaviors.push(registry.from_value(&b.kind, &b.data)?);
        }
        graph.insert(Node {
            id,
            name: doc.name.clone(),
            transform: doc.transform,
            parent: doc.parent.map(NodeId),
            children: Vec::new(),
            instance_of: doc.instance_of,
            behaviors,
        });
    }

    // Children links rebuild in document order.
    for doc in docs {
        if let Some(parent) = doc.parent {
            let pid = NodeId(parent);
            if !graph.contains(pid) {
                return Err(SceneError::NodeNotFound(pid));
            }
            if let Some(pnode) = graph.get_mut(pid) {
                pnode.children.push(NodeId(doc.id));
            }
        }
    }

    // Malformed documents must not produce parent cycles.
    for doc in docs {
        let id = NodeId(doc.id);
        let mut steps = 0usize;
        let mut current = graph.get(id).and_then(|n| n.parent);
        while let Some(pid) = current {
            steps += 1;
            if steps > graph.len() {
                return Err(SceneError::Cycle { node: id, parent: pid });
            }
            current = graph.get(pid).and_then(|n| n.parent);
        }
    }

    Ok(graph)
}

impl SceneDoc {
    /// Capture a live graph into a document.
    pub fn from_graph(
        graph: &SceneGraph,
        registry: &BehaviorRegistry,
        name: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            version: 1,
            metadata: SceneMetadata {
                name: name.into(),
                description: String::new(),
            },
            nodes: nodes_to_docs(graph, registry)?,
        })
    }

    /// Rebuild a live graph from the document.
    pub fn instantiate(&self, registry: &BehaviorRegistry) -> Result<SceneGraph> {
        docs_to_graph(&self.nodes, registry)
    }

    /// Load a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the document to disk as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
