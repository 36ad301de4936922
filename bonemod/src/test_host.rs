//! In-memory host used by unit tests.

use crate::{CharacterRoots, HostAdapter, NodeId, SceneGraph, Transform};

pub(crate) struct TestHost {
    pub scene: SceneGraph,
    pub body: NodeId,
    pub accessories: Vec<Option<NodeId>>,
    pub coordinate_count: usize,
    pub animation_speed: Option<f32>,
    pub pose_copy: Option<Vec<bool>>,
    pub shape_affected: Vec<NodeId>,
    /// Transforms written by the host shape system whenever shapes are recomputed.
    pub shape_writes: Vec<(NodeId, Transform)>,
    pub forced_recomputes: usize,
    pub shape_recomputes: usize,
    pub shape_update_requests: usize,
    pub bust_gravity_updates: usize,
}

impl TestHost {
    /// BodyTop
    ///   cf_j_hips
    ///     cf_j_spine01
    ///       chest_L
    ///       cf_j_head
    ///         cf_j_eye_L
    ///         cf_s_nose
    ///       ca_slot00 (accessory 0)
    ///         acc_bone
    ///     cf_d_sk_00_00
    ///     cf_t_root
    ///   ca_slot02 (accessory 2)
    ///     ribbon
    pub fn new() -> Self {
        let mut scene = SceneGraph::new();
        let body = scene.add_root("BodyTop");
        let hips = scene.add_child(body, "cf_j_hips").unwrap();
        let spine = scene.add_child(hips, "cf_j_spine01").unwrap();
        scene.add_child(spine, "chest_L").unwrap();
        let head = scene.add_child(spine, "cf_j_head").unwrap();
        scene.add_child(head, "cf_j_eye_L").unwrap();
        scene.add_child(head, "cf_s_nose").unwrap();
        let acc0 = scene.add_child(spine, "ca_slot00").unwrap();
        scene.add_child(acc0, "acc_bone").unwrap();
        scene.add_child(hips, "cf_d_sk_00_00").unwrap();
        scene.add_child(hips, "cf_t_root").unwrap();
        let acc2 = scene.add_child(body, "ca_slot02").unwrap();
        scene.add_child(acc2, "ribbon").unwrap();

        Self {
            scene,
            body,
            accessories: vec![Some(acc0), None, Some(acc2)],
            coordinate_count: 7,
            animation_speed: Some(1.0),
            pose_copy: None,
            shape_affected: Vec::new(),
            shape_writes: Vec::new(),
            forced_recomputes: 0,
            shape_recomputes: 0,
            shape_update_requests: 0,
            bust_gravity_updates: 0,
        }
    }

    pub fn node(&self, name: &str) -> NodeId {
        self.scene
            .find_by_name(self.body, name)
            .unwrap_or_else(|| panic!("missing node {name}"))
    }

    pub fn local(&self, name: &str) -> Transform {
        self.scene.local_transform(self.node(name)).unwrap()
    }

    pub fn set_local(&mut self, name: &str, transform: Transform) {
        let node = self.node(name);
        self.scene.set_local_transform(node, transform).unwrap();
    }

    fn write_shapes(&mut self) {
        for (node, transform) in self.shape_writes.clone() {
            let _ = self.scene.set_local_transform(node, transform);
        }
    }
}

impl HostAdapter for TestHost {
    fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    fn roots(&self) -> CharacterRoots {
        CharacterRoots {
            body: Some(self.body),
            accessories: self.accessories.clone(),
        }
    }

    fn coordinate_count(&self) -> usize {
        self.coordinate_count
    }

    fn animation_speed(&self) -> Option<f32> {
        self.animation_speed
    }

    fn set_animation_speed(&mut self, speed: f32) {
        self.animation_speed = Some(speed);
    }

    fn suspend_pose_copy(&mut self) -> Option<Vec<bool>> {
        let flags = self.pose_copy.as_mut()?;
        let saved = flags.clone();
        flags.iter_mut().for_each(|f| *f = false);
        Some(saved)
    }

    fn restore_pose_copy(&mut self, saved: &[bool]) {
        self.pose_copy = Some(saved.to_vec());
    }

    fn force_shape_recompute(&mut self) {
        self.forced_recomputes += 1;
        self.write_shapes();
    }

    fn request_shape_update(&mut self) {
        self.shape_update_requests += 1;
    }

    fn shape_affected_bones(&self) -> Vec<NodeId> {
        self.shape_affected.clone()
    }

    fn recompute_shapes(&mut self) {
        self.shape_recomputes += 1;
        self.write_shapes();
    }

    fn update_bust_gravity(&mut self) {
        self.bust_gravity_updates += 1;
    }
}

/// Runs frames until the baseline is known (bounded).
pub(crate) fn settle(controller: &mut crate::BoneController, host: &mut TestHost) {
    for _ in 0..8 {
        controller.late_update(host);
        controller.end_of_frame(host);
        if controller.baseline_state() == crate::BaselineState::Known && !controller.is_capturing_baseline() {
            return;
        }
    }
    panic!("baseline capture did not finish");
}

pub(crate) fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-5,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

pub(crate) fn assert_vec3_approx(actual: glam::Vec3, expected: glam::Vec3) {
    assert_approx(actual.x, expected.x);
    assert_approx(actual.y, expected.y);
    assert_approx(actual.z, expected.z);
}
