//! Multi-frame baseline capture.
//!
//! The host needs whole frames to settle animation and shape state, so the capture is a
//! small state machine advanced once per frame boundary by
//! [`BoneController::end_of_frame`](crate::BoneController::end_of_frame).

use super::BoneController;
use crate::HostAdapter;

/// Whether each modifier's baseline can be trusted.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BaselineState {
    /// A capture will be started on the next update.
    #[default]
    Unknown,
    /// A capture is running; no second one may start.
    Capturing,
    /// Baselines are valid and modifiers are applied every update.
    Known,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum CaptureStep {
    /// Waiting for the host animator to exist.
    WaitForAnimator,
    /// Animation is frozen; the next boundary measures.
    Measure { saved_pose_copy: Option<Vec<bool>> },
    /// Baselines are taken; the next boundary restores host state.
    Restore { saved_pose_copy: Option<Vec<bool>> },
}

#[derive(Clone, Debug)]
pub(crate) struct BaselineCapture {
    pub(crate) step: CaptureStep,
}

impl BaselineCapture {
    pub(crate) fn new() -> Self {
        Self {
            step: CaptureStep::WaitForAnimator,
        }
    }

    pub(crate) fn saved_pose_copy(&self) -> Option<&[bool]> {
        match &self.step {
            CaptureStep::WaitForAnimator => None,
            CaptureStep::Measure { saved_pose_copy } | CaptureStep::Restore { saved_pose_copy } => {
                saved_pose_copy.as_deref()
            }
        }
    }
}

impl BoneController {
    pub(crate) fn start_baseline_capture(&mut self) {
        log::trace!("baseline capture started");
        self.baseline_state = BaselineState::Capturing;
        self.capture = Some(BaselineCapture::new());
    }

    /// Runs one step of the capture. Returns `true` once the capture is finished.
    pub(crate) fn advance_baseline_capture<H: HostAdapter + ?Sized>(
        &mut self,
        host: &mut H,
        capture: &mut BaselineCapture,
    ) -> bool {
        match std::mem::replace(&mut capture.step, CaptureStep::WaitForAnimator) {
            CaptureStep::WaitForAnimator => {
                let Some(speed) = host.animation_speed() else {
                    return false;
                };
                // A cancelled run may have left its remembered speed behind; keep it.
                if self.previous_anim_speed.is_none() {
                    self.previous_anim_speed = Some(speed);
                }
                host.set_animation_speed(0.0);
                let saved_pose_copy = host.suspend_pose_copy();
                log::trace!("baseline capture: animation frozen");
                capture.step = CaptureStep::Measure { saved_pose_copy };
                false
            }
            CaptureStep::Measure { saved_pose_copy } => {
                host.force_shape_recompute();
                self.fill_in_transforms(host);
                let scene = host.scene();
                for modifier in &mut self.modifiers {
                    modifier.collect_baseline(scene);
                }
                self.baseline_state = BaselineState::Known;
                log::trace!(
                    "baseline capture: collected {} baselines",
                    self.modifiers.len()
                );
                capture.step = CaptureStep::Restore { saved_pose_copy };
                false
            }
            CaptureStep::Restore { saved_pose_copy } => {
                if let Some(saved) = saved_pose_copy {
                    host.restore_pose_copy(&saved);
                }
                host.set_animation_speed(self.previous_anim_speed.take().unwrap_or(1.0));
                log::trace!("baseline capture finished");
                true
            }
        }
    }

    /// Abandons a running capture. Baselines are only trusted once the state reads
    /// `Known`, so nothing else needs undoing; the remembered animation speed is kept
    /// for the next run to restore.
    pub(crate) fn cancel_baseline_capture<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        if let Some(capture) = self.capture.take() {
            if let Some(saved) = capture.saved_pose_copy() {
                host.restore_pose_copy(saved);
            }
            log::trace!("baseline capture cancelled");
        }
        self.baseline_state = BaselineState::Unknown;
    }
}
