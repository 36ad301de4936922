use crate::{BoneLocation, NodeId, SceneGraph, Transform};
use glam::{EulerRot, Quat, Vec3};

const EPSILON: f32 = 1.0e-4;

/// A single transform delta relative to the captured baseline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoneModifierData {
    /// Multiplies the baseline scale.
    pub scale: Vec3,
    /// Added to the baseline position.
    pub position: Vec3,
    /// Euler angles in degrees, composed after the baseline rotation.
    pub rotation: Vec3,
}

impl Default for BoneModifierData {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneModifierData {
    pub const IDENTITY: Self = Self {
        scale: Vec3::ONE,
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
    };

    pub fn new(scale: Vec3, position: Vec3, rotation: Vec3) -> Self {
        Self {
            scale,
            position,
            rotation,
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Vec3) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn has_scale(&self) -> bool {
        !self.scale.abs_diff_eq(Vec3::ONE, EPSILON)
    }

    pub fn has_position(&self) -> bool {
        !self.position.abs_diff_eq(Vec3::ZERO, EPSILON)
    }

    pub fn has_rotation(&self) -> bool {
        !self.rotation.abs_diff_eq(Vec3::ZERO, EPSILON)
    }

    pub fn is_empty(&self) -> bool {
        !self.has_scale() && !self.has_position() && !self.has_rotation()
    }

    pub fn clear(&mut self) {
        *self = Self::IDENTITY;
    }

    /// Folds another contribution into this one.
    pub fn merge(&mut self, other: &Self) {
        self.scale *= other.scale;
        self.position += other.position;
        self.rotation += other.rotation;
    }

    pub fn rotation_quat(&self) -> Quat {
        // Z first, then X, then Y.
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y.to_radians(),
            self.rotation.x.to_radians(),
            self.rotation.z.to_radians(),
        )
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct Channels {
    scale: bool,
    position: bool,
    rotation: bool,
}

impl Channels {
    fn any(self) -> bool {
        self.scale || self.position || self.rotation
    }
}

/// Layered transform delta for one bone, optionally per coordinate slot.
#[derive(Clone, Debug)]
pub struct BoneModifier {
    bone_name: String,
    location: BoneLocation,
    // Never empty. One entry means "same delta for every coordinate".
    coordinate_data: Vec<BoneModifierData>,

    bone: Option<NodeId>,
    baseline: Option<Transform>,
    written: Channels,
}

impl BoneModifier {
    pub fn new(bone_name: impl Into<String>, location: BoneLocation) -> Self {
        Self::with_data(bone_name, location, vec![BoneModifierData::IDENTITY])
    }

    /// An empty `coordinate_data` is replaced by a single identity delta.
    pub fn with_data(
        bone_name: impl Into<String>,
        location: BoneLocation,
        mut coordinate_data: Vec<BoneModifierData>,
    ) -> Self {
        if coordinate_data.is_empty() {
            coordinate_data.push(BoneModifierData::IDENTITY);
        }
        Self {
            bone_name: bone_name.into(),
            location,
            coordinate_data,
            bone: None,
            baseline: None,
            written: Channels::default(),
        }
    }

    pub fn bone_name(&self) -> &str {
        &self.bone_name
    }

    pub fn location(&self) -> BoneLocation {
        self.location
    }

    pub(crate) fn set_location(&mut self, location: BoneLocation) {
        self.location = location;
    }

    pub fn matches(&self, bone_name: &str, location: BoneLocation) -> bool {
        (location == BoneLocation::Unknown || location == self.location)
            && self.bone_name == bone_name
    }

    /// Resolved scene node. Only a cache; validate with [`SceneGraph::is_alive`].
    pub fn bone(&self) -> Option<NodeId> {
        self.bone
    }

    pub(crate) fn set_bone(&mut self, bone: Option<NodeId>) {
        if self.bone != bone {
            self.baseline = None;
            self.written = Channels::default();
        }
        self.bone = bone;
    }

    pub fn baseline(&self) -> Option<&Transform> {
        self.baseline.as_ref()
    }

    pub fn coordinate_data(&self) -> &[BoneModifierData] {
        &self.coordinate_data
    }

    pub fn is_coordinate_specific(&self) -> bool {
        self.coordinate_data.len() > 1
    }

    /// Gives every coordinate its own delta, seeded from the current default.
    pub fn make_coordinate_specific(&mut self, coordinate_count: usize) {
        let seed = self.coordinate_data[0];
        if self.coordinate_data.len() < coordinate_count {
            self.coordinate_data.resize(coordinate_count, seed);
        }
    }

    /// Keeps only the delta of `coordinate` as the shared default.
    pub fn make_non_coordinate_specific(&mut self, coordinate: usize) {
        let keep = *self.data(coordinate);
        self.coordinate_data.clear();
        self.coordinate_data.push(keep);
    }

    pub fn data(&self, coordinate: usize) -> &BoneModifierData {
        if self.is_coordinate_specific() {
            if let Some(data) = self.coordinate_data.get(coordinate) {
                return data;
            }
        }
        &self.coordinate_data[0]
    }

    pub fn data_mut(&mut self, coordinate: usize) -> &mut BoneModifierData {
        let index = if self.is_coordinate_specific() && coordinate < self.coordinate_data.len() {
            coordinate
        } else {
            0
        };
        &mut self.coordinate_data[index]
    }

    pub fn is_empty(&self) -> bool {
        self.coordinate_data.iter().all(BoneModifierData::is_empty)
    }

    /// Snapshots the bone's current local transform as the zero point for deltas.
    pub fn collect_baseline(&mut self, scene: &SceneGraph) {
        let Some(bone) = self.bone else {
            return;
        };
        match scene.local_transform(bone) {
            Some(local) => self.baseline = Some(local),
            None => self.forget_bone(),
        }
    }

    /// Writes the baseline back for every channel this modifier touched, then
    /// forgets the baseline.
    pub fn reset(&mut self, scene: &mut SceneGraph) {
        if let (Some(bone), Some(baseline)) = (self.bone, self.baseline) {
            if self.written.any() {
                match scene.local_transform(bone) {
                    Some(mut local) => {
                        if self.written.scale {
                            local.scale = baseline.scale;
                        }
                        if self.written.position {
                            local.position = baseline.position;
                        }
                        if self.written.rotation {
                            local.rotation = baseline.rotation;
                        }
                        if scene.set_local_transform(bone, local).is_err() {
                            self.forget_bone();
                        }
                    }
                    None => self.forget_bone(),
                }
            }
        }
        self.baseline = None;
        self.written = Channels::default();
    }

    fn forget_bone(&mut self) {
        self.bone = None;
        self.baseline = None;
        self.written = Channels::default();
    }

    /// Writes `baseline ⊕ delta(coordinate) ⊕ extra` onto the bone.
    ///
    /// Channels at identity are left to the host unless this modifier wrote them
    /// last time, in which case the baseline value is restored once.
    pub fn apply(&mut self, scene: &mut SceneGraph, coordinate: usize, extra: &[BoneModifierData]) {
        let Some(bone) = self.bone else {
            return;
        };
        let Some(mut local) = scene.local_transform(bone) else {
            self.forget_bone();
            return;
        };
        let Some(baseline) = self.baseline else {
            return;
        };

        let mut delta = *self.data(coordinate);
        for contribution in extra {
            delta.merge(contribution);
        }

        if delta.has_scale() {
            local.scale = baseline.scale * delta.scale;
            self.written.scale = true;
        } else if self.written.scale {
            local.scale = baseline.scale;
            self.written.scale = false;
        }

        if delta.has_position() {
            local.position = baseline.position + delta.position;
            self.written.position = true;
        } else if self.written.position {
            local.position = baseline.position;
            self.written.position = false;
        }

        if delta.has_rotation() {
            local.rotation = baseline.rotation * delta.rotation_quat();
            self.written.rotation = true;
        } else if self.written.rotation {
            local.rotation = baseline.rotation;
            self.written.rotation = false;
        }

        if scene.set_local_transform(bone, local).is_err() {
            self.forget_bone();
        }
    }
}
