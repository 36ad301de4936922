//! Procedural contributions layered on top of authored modifiers.

use crate::{BoneLocation, BoneModifier, BoneModifierData};
use std::collections::HashMap;

/// Read-only view of a controller handed to effects.
#[derive(Copy, Clone, Debug)]
pub struct EffectContext<'a> {
    pub modifiers: &'a [BoneModifier],
    pub coordinate: usize,
}

impl<'a> EffectContext<'a> {
    pub fn modifier(&self, bone_name: &str, location: BoneLocation) -> Option<&'a BoneModifier> {
        self.modifiers.iter().find(|m| m.matches(bone_name, location))
    }
}

/// A per-frame procedural source of bone deltas (breathing, jiggle, ...).
///
/// Effects are queried every frame and never persisted. Contributions target
/// body bones.
pub trait BoneEffect {
    /// Bones this effect may contribute to this frame.
    fn affected_bones(&self, ctx: &EffectContext<'_>) -> Vec<String>;

    /// Contribution for `bone_name` on `coordinate`, or `None` for no change.
    fn effect(
        &self,
        bone_name: &str,
        ctx: &EffectContext<'_>,
        coordinate: usize,
    ) -> Option<BoneModifierData>;
}

/// Fixed contributions keyed by bone name, optionally restricted to one coordinate.
#[derive(Clone, Debug, Default)]
pub struct ConstantEffect {
    bones: HashMap<String, BoneModifierData>,
    coordinate: Option<usize>,
}

impl ConstantEffect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only_on_coordinate(mut self, coordinate: usize) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    pub fn with_bone(mut self, bone_name: impl Into<String>, data: BoneModifierData) -> Self {
        self.bones.insert(bone_name.into(), data);
        self
    }
}

impl BoneEffect for ConstantEffect {
    fn affected_bones(&self, _ctx: &EffectContext<'_>) -> Vec<String> {
        let mut names: Vec<String> = self.bones.keys().cloned().collect();
        names.sort();
        names
    }

    fn effect(
        &self,
        bone_name: &str,
        _ctx: &EffectContext<'_>,
        coordinate: usize,
    ) -> Option<BoneModifierData> {
        if self.coordinate.is_some_and(|c| c != coordinate) {
            return None;
        }
        self.bones.get(bone_name).copied()
    }
}
