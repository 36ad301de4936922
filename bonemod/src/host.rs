//! Boundary to the embedding application.

use crate::{CharacterRoots, NodeId, SceneGraph};

/// Host game mode at the time of a lifecycle event.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GameMode {
    #[default]
    Unknown,
    Maker,
    Studio,
    MainGame,
}

/// Host-specific operations the engine needs.
///
/// One implementation per host/version replaces build-variant branching inside the
/// engine. All calls happen on the host's main thread.
pub trait HostAdapter {
    fn scene(&self) -> &SceneGraph;

    fn scene_mut(&mut self) -> &mut SceneGraph;

    fn roots(&self) -> CharacterRoots;

    /// Number of coordinate (outfit) slots on the character.
    fn coordinate_count(&self) -> usize;

    /// `None` while the animator does not exist yet.
    fn animation_speed(&self) -> Option<f32>;

    fn set_animation_speed(&mut self, speed: f32);

    /// Disables the pose-copy side channel and returns its previous enabled flags,
    /// or `None` if the host has no such channel.
    fn suspend_pose_copy(&mut self) -> Option<Vec<bool>> {
        None
    }

    fn restore_pose_copy(&mut self, _saved: &[bool]) {}

    /// Synchronous face/body shape recompute followed by a forced late update.
    fn force_shape_recompute(&mut self);

    /// Marks face/body shapes dirty so the host recomputes them on its own schedule.
    fn request_shape_update(&mut self) {}

    /// Nodes the host shape system writes when it recomputes shapes.
    fn shape_affected_bones(&self) -> Vec<NodeId> {
        Vec::new()
    }

    /// Recomputes face and body shapes immediately.
    fn recompute_shapes(&mut self) {}

    /// Corrective pass run after modifiers were applied.
    fn update_bust_gravity(&mut self) {}
}
