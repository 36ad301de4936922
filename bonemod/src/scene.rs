//! In-memory scene-graph table.
//!
//! The host owns the hierarchy; the engine only keeps [`NodeId`] handles into it and
//! re-validates them on every access. Destroying a node bumps the generation of its
//! slot so stale handles stop resolving instead of aliasing a new node.

use crate::Error;
use glam::{Quat, Vec3};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Local transform of a node relative to its parent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };
}

#[derive(Clone, Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Transform,
}

#[derive(Clone, Debug)]
struct Entry {
    generation: u32,
    node: Option<Node>,
}

#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    entries: Vec<Entry>,
    free: Vec<u32>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, name: &str) -> NodeId {
        self.insert(name, None)
    }

    pub fn add_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, Error> {
        if !self.is_alive(parent) {
            return Err(Error::UnknownNode);
        }
        let id = self.insert(name, Some(parent));
        if let Some(node) = self.node_mut(parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    fn insert(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let node = Node {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            local: Transform::IDENTITY,
        };
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.node = Some(node);
            return NodeId {
                index,
                generation: entry.generation,
            };
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Destroys `id` and its whole subtree. Returns `false` for stale handles.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).map(|n| n.parent) else {
            return false;
        };
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|&c| c != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let entry = &mut self.entries[current.index()];
            if let Some(node) = entry.node.take() {
                stack.extend(node.children);
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
        true
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let entry = self.entries.get(id.index())?;
        if entry.generation != id.generation {
            return None;
        }
        entry.node.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let entry = self.entries.get_mut(id.index())?;
        if entry.generation != id.generation {
            return None;
        }
        entry.node.as_mut()
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn local_transform(&self, id: NodeId) -> Option<Transform> {
        self.node(id).map(|n| n.local)
    }

    pub fn set_local_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), Error> {
        let node = self.node_mut(id).ok_or(Error::UnknownNode)?;
        node.local = transform;
        Ok(())
    }

    /// Depth-first search for the first node named `name` under `root` (inclusive).
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            if node.name == name {
                return Some(current);
            }
            // Reverse so children are visited in declaration order.
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Names of `root` and every descendant, in depth-first order.
    pub fn subtree_names(&self, root: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            out.push(node.name.clone());
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}

/// Hierarchy roots the bone locator searches.
#[derive(Clone, Debug, Default)]
pub struct CharacterRoots {
    /// Body root (BodyTop). Accessory subtrees parented under it are skipped.
    pub body: Option<NodeId>,
    /// Accessory roots indexed by slot; empty slots are `None`.
    pub accessories: Vec<Option<NodeId>>,
}

impl CharacterRoots {
    pub fn accessory(&self, slot: usize) -> Option<NodeId> {
        self.accessories.get(slot).copied().flatten()
    }
}
