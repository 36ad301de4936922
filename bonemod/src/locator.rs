//! Bone name to scene node resolution.

use crate::{BoneLocation, BoneModifier, CharacterRoots, NodeId, SceneGraph};
use std::collections::HashMap;

/// Caches one `name -> node` map per hierarchy root.
///
/// Maps are built lazily and dropped when their root no longer exists. A miss against a
/// cached map rebuilds it once, which picks up nodes attached after the map was built.
#[derive(Debug, Default)]
pub struct BoneLocator {
    lookup: HashMap<NodeId, HashMap<String, NodeId>>,
    no_retry: bool,
}

impl BoneLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached root maps.
    pub fn cached_roots(&self) -> usize {
        self.lookup.len()
    }

    pub fn clear(&mut self) {
        self.lookup.clear();
    }

    /// Maps every node name under `root` to its first occurrence in depth-first order.
    /// Subtrees rooted at any accessory root are skipped; accessories are searched as
    /// separate roots.
    pub fn create_bone_map(
        scene: &SceneGraph,
        root: NodeId,
        roots: &CharacterRoots,
    ) -> HashMap<String, NodeId> {
        log::debug!(
            "creating bone map for root {:?} ({})",
            root,
            scene.name(root).unwrap_or("<destroyed>")
        );
        let excluded: Vec<NodeId> = roots.accessories.iter().flatten().copied().collect();
        let mut map = HashMap::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let Some(name) = scene.name(current) else {
                continue;
            };
            map.entry(name.to_string()).or_insert(current);
            for &child in scene.children(current).iter().rev() {
                if !excluded.contains(&child) {
                    stack.push(child);
                }
            }
        }
        map
    }

    fn purge_destroyed(&mut self, scene: &SceneGraph) {
        self.lookup.retain(|root, _| scene.is_alive(*root));
    }

    fn find_in_root(
        &mut self,
        scene: &SceneGraph,
        roots: &CharacterRoots,
        name: &str,
        root: NodeId,
    ) -> Option<NodeId> {
        if !scene.is_alive(root) {
            return None;
        }

        let mut recreated = false;
        if !self.lookup.contains_key(&root) {
            let map = Self::create_bone_map(scene, root, roots);
            self.lookup.insert(root, map);
            recreated = true;
            self.purge_destroyed(scene);
        }

        let found = self
            .lookup
            .get(&root)
            .and_then(|map| map.get(name).copied())
            .filter(|&node| scene.is_alive(node));
        if found.is_some() || recreated || self.no_retry {
            return found;
        }

        let map = Self::create_bone_map(scene, root, roots);
        let found = map.get(name).copied();
        self.lookup.insert(root, map);
        found
    }

    /// Resolves `name` at `location`.
    ///
    /// `Unknown` searches the body root first, then every accessory slot in order; on
    /// success `location` is updated to where the bone was found. Returns `None` when
    /// the bone is not (yet) present.
    pub fn find_bone(
        &mut self,
        scene: &SceneGraph,
        roots: &CharacterRoots,
        name: &str,
        location: &mut BoneLocation,
    ) -> Option<NodeId> {
        match *location {
            BoneLocation::BodyTop => {
                let body = roots.body?;
                self.find_in_root(scene, roots, name, body)
            }
            BoneLocation::Accessory(slot) => {
                let root = roots.accessory(slot as usize)?;
                self.find_in_root(scene, roots, name, root)
            }
            BoneLocation::Unknown => {
                // Rebuilding every root on every miss would be quadratic here.
                self.no_retry = true;
                let found = self.find_everywhere(scene, roots, name);
                self.no_retry = false;

                let (node, resolved) = found?;
                *location = resolved;
                Some(node)
            }
        }
    }

    fn find_everywhere(
        &mut self,
        scene: &SceneGraph,
        roots: &CharacterRoots,
        name: &str,
    ) -> Option<(NodeId, BoneLocation)> {
        if let Some(body) = roots.body {
            if let Some(node) = self.find_in_root(scene, roots, name, body) {
                return Some((node, BoneLocation::BodyTop));
            }
        }
        for (slot, root) in roots.accessories.iter().enumerate() {
            let Some(root) = *root else {
                continue;
            };
            if let Some(node) = self.find_in_root(scene, roots, name, root) {
                return Some((node, BoneLocation::Accessory(slot as u32)));
            }
        }
        None
    }

    /// Resolves the modifier's node and pins its location if it was `Unknown`.
    pub fn assign_bone(
        &mut self,
        scene: &SceneGraph,
        roots: &CharacterRoots,
        modifier: &mut BoneModifier,
    ) {
        let mut location = modifier.location();
        let bone = self.find_bone(scene, roots, modifier.bone_name(), &mut location);
        modifier.set_bone(bone);
        modifier.set_location(location);
    }
}
