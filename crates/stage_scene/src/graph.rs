//! Scene graph of named, hierarchical nodes with attached behaviors.
//!
//! Nodes are stored in a flat vector with an id-to-index map; hierarchy is
//! expressed through parent/children links. Structural edits keep both maps
//! and links consistent, and reject edits that would introduce a cycle.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use stage_core::TemplateId;

use crate::behavior::Behavior;
use crate::error::{Result, SceneError};

/// Unique identifier for a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local transform of a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// A node in the scene graph.
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Local transform
    pub transform: Transform,
    /// Parent node (for hierarchy)
    pub parent: Option<NodeId>,
    /// Children nodes
    pub children: Vec<NodeId>,
    /// Template this node is an instance of, if any
    pub instance_of: Option<TemplateId>,
    /// Attached behaviors
    pub behaviors: Vec<Box<dyn Behavior>>,
}

impl Node {
    /// Get the first behavior of a concrete type.
    pub fn behavior<T: Behavior>(&self) -> Option<&T> {
        self.behaviors
            .iter()
            .find_map(|b| b.as_any().downcast_ref::<T>())
    }

    /// Get the first behavior of a concrete type, mutably.
    pub fn behavior_mut<T: Behavior>(&mut self) -> Option<&mut T> {
        self.behaviors
            .iter_mut()
            .find_map(|b| b.as_any_mut().downcast_mut::<T>())
    }

    /// Whether a behavior of the given type is attached.
    pub fn has_behavior<T: Behavior>(&self) -> bool {
        self.behaviors.iter().any(|b| b.as_any().is::<T>())
    }

    /// Attach a behavior.
    pub fn add_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.behaviors.push(behavior);
    }

    /// Detach and return the first behavior of the given type.
    pub fn remove_behavior<T: Behavior>(&mut self) -> Option<Box<dyn Behavior>> {
        let index = self.behaviors.iter().position(|b| b.as_any().is::<T>())?;
        Some(self.behaviors.remove(index))
    }
}

/// Flat-storage scene graph.
pub struct SceneGraph {
    /// All nodes in insertion order
    nodes: Vec<Node>,
    /// Id to index lookup
    node_map: HashMap<NodeId, usize>,
    /// Next id to hand out
    next_id: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            node_map: HashMap::new(),
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.node_map.get(&id).map(|&idx| &self.nodes[idx])
    }

    /// Get a mutable node by id.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.node_map.get(&id).map(|&idx| &mut self.nodes[idx])
    }

    /// Whether a node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node_map.contains_key(&id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Nodes without a parent, in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
    }

    /// Insert a fully formed node, keeping the id counter ahead of it.
    ///
    /// Used by document loading and subtree duplication; links are the
    /// caller's responsibility.
    pub fn insert(&mut self, node: Node) {
        if node.id.0 >= self.next_id {
            self.next_id = node.id.0 + 1;
        }
        let id = node.id;
        let idx = self.nodes.len();
        self.nodes.push(node);
        self.node_map.insert(id, idx);
    }

    /// Spawn a new root node.
    pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.alloc_id();
        self.insert(Node {
            id,
            name: name.into(),
            transform: Transform::new(),
            parent: None,
            children: Vec::new(),
            instance_of: None,
            behaviors: Vec::new(),
        });
        id
    }

    /// Spawn a new node under a parent.
    pub fn spawn_child(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId> {
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let id = self.spawn(name);
        if let Some(node) = self.get_mut(id) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    fn remove_record(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.node_map.remove(&id)?;
        let node = self.nodes.remove(idx);

        // Update indices for nodes after the removed one
        for (_, nidx) in self.node_map.iter_mut() {
            if *nidx > idx {
                *nidx -= 1;
            }
        }

        Some(node)
    }

    /// Remove a node and its whole subtree. Returns how many nodes went.
    pub fn despawn_subtree(&mut self, id: NodeId) -> usize {
        let order = self.subtree(id);
        if order.is_empty() {
            return 0;
        }

        // Detach the subtree root from its parent
        let parent = self.get(id).and_then(|n| n.parent);
        if let Some(pid) = parent {
            if let Some(pnode) = self.get_mut(pid) {
                pnode.children.retain(|c| *c != id);
            }
        }

        let mut removed = 0;
        for nid in order {
            if self.remove_record(nid).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Move a node under a new parent (or to the root when `None`).
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<()> {
        if !self.contains(id) {
            return Err(SceneError::NodeNotFound(id));
        }
        if let Some(parent) = new_parent {
            if !self.contains(parent) {
                return Err(SceneError::NodeNotFound(parent));
            }
            if self.subtree(id).contains(&parent) {
                return Err(SceneError::Cycle { node: id, parent });
            }
        }

        let old_parent = self.get(id).and_then(|n| n.parent);
        if let Some(pid) = old_parent {
            if let Some(pnode) = self.get_mut(pid) {
                pnode.children.retain(|c| *c != id);
            }
        }
        if let Some(pid) = new_parent {
            if let Some(pnode) = self.get_mut(pid) {
                pnode.children.push(id);
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = new_parent;
        }
        Ok(())
    }

    /// Depth-first preorder listing of a subtree, root included.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                out.push(id);
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Ancestors of a node, nearest first, the node itself excluded.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(pid) = current {
            if out.contains(&pid) {
                break;
            }
            out.push(pid);
            current = self.get(pid).and_then(|n| n.parent);
        }
        out
    }

    /// Breadth-first, top-down walk of a subtree yielding each attached
    /// behavior as a (node, behavior index) pair. A node's own behaviors
    /// come before any of its children's.
    pub fn behaviors_top_down(&self, root: NodeId) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let mut queue = VecDeque::new();
        if self.contains(root) {
            queue.push_back(root);
        }
        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.get(id) {
                for index in 0..node.behaviors.len() {
                    out.push((id, index));
                }
                for &child in &node.children {
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// Deep copy of a subtree, attached as a new root. Behaviors are cloned
    /// through [`Behavior::clone_box`]; the copy keeps the source's names.
    pub fn duplicate_subtree(&mut self, source: NodeId) -> Result<NodeId> {
        let order = self.subtree(source);
        if order.is_empty() {
            return Err(SceneError::NodeNotFound(source));
        }

        let mut mapping: HashMap<NodeId, NodeId> = HashMap::with_capacity(order.len());
        for &old in &order {
            let new = self.alloc_id();
            mapping.insert(old, new);
        }

        let mut copies = Vec::with_capacity(order.len());
        for &old in &order {
            let node = self.get(old).ok_or(SceneError::NodeNotFound(old))?;
            copies.push(Node {
                id: mapping[&old],
                name: node.name.clone(),
                transform: node.transform,
                // The source's own parent is not in the mapping, so the
                // copy's root comes out detached.
                parent: node.parent.and_then(|p| mapping.get(&p).copied()),
                children: node
                    .children
                    .iter()
                    .filter_map(|c| mapping.get(c).copied())
                    .collect(),
                instance_of: node.instance_of,
                behaviors: node.behaviors.iter().map(|b| b.clone_box()).collect(),
            });
        }
        for node in copies {
            self.insert(node);
        }
        Ok(mapping[&source])
    }

    /// Find the first node with the given name, in hierarchy order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let roots: Vec<NodeId> = self.roots().collect();
        for root in roots {
            for id in self.subtree(root) {
                if self.get(id).map(|n| n.name == name).unwrap_or(false) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Template instances sitting inside a node's subtree.
    ///
    /// Walks children only (the node itself is never reported), records each
    /// instance root's template, and does not descend into instances.
    pub fn template_instances_in(&self, id: NodeId) -> Vec<TemplateId> {
        let mut found = Vec::new();
        if let Some(node) = self.get(id) {
            for &child in &node.children {
                self.collect_instances(child, &mut found);
            }
        }
        found
    }

    fn collect_instances(&self, id: NodeId, out: &mut Vec<TemplateId>) {
        let Some(node) = self.get(id) else {
            return;
        };
        if let Some(template) = node.instance_of {
            out.push(template);
            return;
        }
        for &child in &node.children {
            self.collect_instances(child, out);
        }
    }
}
