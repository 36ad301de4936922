//! Per-frame composition of authored modifiers and procedural effects.

use super::BoneController;
use crate::{
    BoneLocation, BoneModifier, BoneModifierData, EffectContext, HostAdapter, HostProfile, NodeId,
    SceneGraph,
};
use std::collections::{HashMap, HashSet};

impl BoneController {
    /// Gathers effect contributions and writes every modifier onto its bone.
    pub(crate) fn apply_effects<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        let coordinate = self.current_coordinate;

        let mut contributions: Vec<(String, BoneModifierData)> = Vec::new();
        {
            let ctx = EffectContext {
                modifiers: &self.modifiers,
                coordinate,
            };
            for effect in &self.effects {
                for bone in effect.affected_bones(&ctx) {
                    match effect.effect(&bone, &ctx, coordinate) {
                        Some(data) if !data.is_empty() => contributions.push((bone, data)),
                        _ => {}
                    }
                }
            }
        }

        // Effects only target body bones. Inserting may merge duplicates and shift
        // indices, so all inserts happen before grouping.
        for (bone, _) in &contributions {
            if self.position(bone, BoneLocation::BodyTop).is_none() {
                self.insert_modifier(host, BoneModifier::new(bone.as_str(), BoneLocation::BodyTop));
            }
        }
        let mut grouped: HashMap<usize, Vec<BoneModifierData>> = HashMap::new();
        for (bone, data) in contributions {
            if let Some(index) = self.position(&bone, BoneLocation::BodyTop) {
                grouped.entry(index).or_default().push(data);
            }
        }

        let scene = host.scene_mut();
        for (index, modifier) in self.modifiers.iter_mut().enumerate() {
            handle_dynamic_bone(&self.profile, modifier, scene);
            let extra = grouped.get(&index).map(Vec::as_slice).unwrap_or(&[]);
            modifier.apply(scene, coordinate, extra);
        }

        if !self.modifiers.is_empty() {
            host.update_bust_gravity();
        }
    }

    /// Keeps host shape edits (e.g. maker sliders) out of the modifier baselines: reset the
    /// modifiers on bones the shape system writes, let it recompute, then recapture only
    /// those baselines.
    pub(crate) fn update_baseline<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        let affected_bones: HashSet<NodeId> = host.shape_affected_bones().into_iter().collect();
        let affected: Vec<usize> = self
            .modifiers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.bone().is_some_and(|b| affected_bones.contains(&b)))
            .map(|(i, _)| i)
            .collect();

        {
            let scene = host.scene_mut();
            for &i in &affected {
                self.modifiers[i].reset(scene);
            }
        }

        host.recompute_shapes();

        let scene = host.scene();
        for &i in &affected {
            self.modifiers[i].collect_baseline(scene);
        }
    }
}

/// Bones animated by a secondary-motion simulation get a fresh baseline every frame so
/// modifiers ride on top of the simulation instead of overwriting it.
fn handle_dynamic_bone(profile: &HostProfile, modifier: &mut BoneModifier, scene: &mut SceneGraph) {
    if modifier.location() > BoneLocation::BodyTop {
        return;
    }
    if profile.is_dynamic_bone(modifier.bone_name()) {
        modifier.reset(scene);
        modifier.collect_baseline(scene);
    }
}
