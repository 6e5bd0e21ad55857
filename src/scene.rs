//! A minimal scene tree.
//!
//! Physics objects publish their poses here: one root node per object, one
//! node per articulated link, and visual child nodes carrying render assets.
//! Renderers read from the tree; only the world writes the physics nodes.

use crate::math::Isometry;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Identifier of a node of a [`SceneTree`].
    pub struct NodeId;
}

/// Role of a scene node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The root of the tree.
    Root,
    /// A node driven by the physics (object root or articulated link).
    Physics,
    /// A node carrying a render asset.
    Visual {
        /// Handle of the render asset.
        asset: String,
    },
}

/// A node of the scene tree.
#[derive(Clone, Debug)]
pub struct SceneNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transformation: Isometry,
    kind: NodeKind,
}

impl SceneNode {
    /// The parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The child nodes.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Transformation relative to the parent node.
    pub fn transformation(&self) -> &Isometry {
        &self.transformation
    }

    /// Role of this node.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// Arena of scene nodes with a single root.
#[derive(Clone, Debug)]
pub struct SceneTree {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    /// A tree containing only its root node.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode {
            parent: None,
            children: vec![],
            transformation: Isometry::identity(),
            kind: NodeKind::Root,
        });
        Self { nodes, root }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Does the tree only contain its root?
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Does `node` exist?
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// The node with the given id.
    pub fn get(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(node)
    }

    /// Adds a node under `parent` (the root when `None`).
    ///
    /// Returns `None` if `parent` does not exist.
    pub fn add_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> Option<NodeId> {
        let parent = parent.unwrap_or(self.root);
        if !self.nodes.contains_key(parent) {
            return None;
        }
        let id = self.nodes.insert(SceneNode {
            parent: Some(parent),
            children: vec![],
            transformation: Isometry::identity(),
            kind,
        });
        self.nodes[parent].children.push(id);
        Some(id)
    }

    /// Removes `node` and all its descendants. The root cannot be removed.
    pub fn remove_subtree(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        let Some(removed) = self.nodes.remove(node) else {
            return;
        };
        if let Some(parent) = removed.parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|child| *child != node);
        }

        let mut stack = removed.children;
        while let Some(id) = stack.pop() {
            if let Some(child) = self.nodes.remove(id) {
                stack.extend(child.children);
            }
        }
    }

    /// Sets the transformation of `node` relative to its parent.
    pub fn set_transformation(&mut self, node: NodeId, transformation: Isometry) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.transformation = transformation;
        }
    }

    /// Transformation of `node` relative to the root.
    pub fn absolute_transformation(&self, node: NodeId) -> Option<Isometry> {
        let mut current = self.nodes.get(node)?;
        let mut result = current.transformation;
        while let Some(parent) = current.parent.and_then(|p| self.nodes.get(p)) {
            result = parent.transformation * result;
            current = parent;
        }
        Some(result)
    }

    /// Visual nodes of the subtree rooted at `node`.
    ///
    /// The walk does not descend into other physics nodes, so the visual
    /// nodes of articulated links are not reported for their object's root.
    pub fn visual_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = vec![];
        let Some(start) = self.nodes.get(node) else {
            return result;
        };

        let mut stack: Vec<NodeId> = start.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(child) = self.nodes.get(id) else {
                continue;
            };
            match child.kind {
                NodeKind::Visual { .. } => {
                    result.push(id);
                    stack.extend(child.children.iter().rev().copied());
                }
                NodeKind::Physics | NodeKind::Root => {}
            }
        }
        result
    }
}
