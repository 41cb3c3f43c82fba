//! The solver state and the per-frame stepping primitive.

use std::ops::Range;

use marq_engine::RigidBodyEngine;
use marq_markers::AttachmentManager;
use marq_skeleton::{Result, Skeleton};
use marq_types::{FrameState, GroupId};

use crate::follow::FollowFrames;
use crate::id::InverseDynamics;
use crate::ik::InverseKinematics;

/// Owns the engine, skeleton, and marker attachments, and coordinates all
/// frame advancement.
///
/// Every drive mode ([`follow`](Self::follow),
/// [`inverse_kinematics`](Self::inverse_kinematics),
/// [`inverse_dynamics`](Self::inverse_dynamics),
/// [`forward_dynamics`](Self::forward_dynamics)) borrows the solver mutably
/// for its whole lifetime, so two sequences can never interleave on the same
/// engine and a sequence can only be advanced in frame order.
#[derive(Debug)]
pub struct Solver<E: RigidBodyEngine> {
    pub(crate) engine: E,
    pub(crate) skeleton: Skeleton,
    pub(crate) markers: AttachmentManager,
    pub(crate) contacts: GroupId,
}

impl<E: RigidBodyEngine> Solver<E> {
    /// Assemble a solver from its parts.
    pub fn new(mut engine: E, skeleton: Skeleton, markers: AttachmentManager) -> Self {
        let contacts = engine.create_group();
        Self {
            engine,
            skeleton,
            markers,
            contacts,
        }
    }

    /// The engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The skeleton.
    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// The attachment manager.
    #[must_use]
    pub const fn markers(&self) -> &AttachmentManager {
        &self.markers
    }

    /// Restore skeleton body states from a snapshot.
    pub fn set_body_states(&mut self, states: &FrameState) {
        self.skeleton.set_body_states(&mut self.engine, states);
    }

    /// First half of one frame: marker bookkeeping up to the checkpoint.
    ///
    /// Detaches the previous frame's springs, repositions the proxies,
    /// attaches this frame's springs, runs collision detection, and captures
    /// the checkpoint (capture immediately followed by restore, so the
    /// checkpoint provably round-trips through the engine).
    pub(crate) fn prepare_frame(&mut self, frame_no: usize) -> FrameState {
        self.markers.detach(&mut self.engine);
        self.markers.reposition(&mut self.engine, frame_no);
        self.markers.attach(&mut self.engine, frame_no);

        self.engine.collide(self.contacts);

        let states = self.skeleton.get_body_states(&self.engine);
        self.skeleton.set_body_states(&mut self.engine, &states);
        states
    }

    /// Second half of one frame: step the engine and drop transient
    /// contacts.
    pub(crate) fn complete_frame(&mut self) {
        let dt = self.engine.timestep();
        self.engine.step(dt);
        self.engine.clear_group(self.contacts);
    }

    fn clamp(&self, frames: Range<usize>) -> Range<usize> {
        let end = frames.end.min(self.markers.track().num_frames());
        frames.start..end.max(frames.start)
    }

    /// Follow marker data over `frames`, yielding each checkpoint.
    ///
    /// When `states` is given, the skeleton is restored to it before the
    /// first frame.
    pub fn follow(&mut self, frames: Range<usize>, states: Option<&FrameState>) -> FollowFrames<'_, E> {
        if let Some(states) = states {
            self.set_body_states(states);
        }
        let frames = self.clamp(frames);
        FollowFrames::new(self, frames)
    }

    /// Follow marker data, yielding per-frame joint angle vectors.
    ///
    /// With `max_force > 0`, motors are enabled once up front and targeted
    /// at zero every frame so the spring attachments, not the motors, do
    /// the kinematic work. With `max_force <= 0` the motors are never
    /// touched.
    pub fn inverse_kinematics(
        &mut self,
        frames: Range<usize>,
        states: Option<&FrameState>,
        max_force: f64,
    ) -> InverseKinematics<'_, E> {
        if let Some(states) = states {
            self.set_body_states(states);
        }
        let frames = self.clamp(frames);
        InverseKinematics::new(self, frames, max_force)
    }

    /// Replay a per-frame angle sequence, yielding per-frame torque vectors.
    ///
    /// Fails up front with a DOF mismatch if any angle vector has the wrong
    /// length. The sequence ends at the shorter of `frames` and `angles`.
    pub fn inverse_dynamics(
        &mut self,
        angles: Vec<Vec<f64>>,
        frames: Range<usize>,
        states: Option<&FrameState>,
        max_force: f64,
    ) -> Result<InverseDynamics<'_, E>> {
        if let Some(states) = states {
            self.set_body_states(states);
        }
        let frames = self.clamp(frames);
        InverseDynamics::new(self, angles, frames, max_force)
    }

    /// Replay a per-frame torque sequence through the follow driver.
    ///
    /// Side-effecting only: the marker and contact bookkeeping runs exactly
    /// as in [`follow`](Self::follow), with the given torques injected each
    /// frame. Stops after the shorter of `frames` and `torques`.
    pub fn forward_dynamics(
        &mut self,
        torques: &[Vec<f64>],
        frames: Range<usize>,
        states: Option<&FrameState>,
    ) -> Result<()> {
        if let Some(states) = states {
            self.set_body_states(states);
        }
        let frames = self.clamp(frames);
        let mut cursor = FollowCursor::new(frames);
        let mut frame = 0usize;
        while cursor.advance(self).is_some() {
            let Some(torques) = torques.get(frame) else {
                break;
            };
            self.skeleton.add_torques(&mut self.engine, torques)?;
            frame += 1;
        }
        // Run out the deferred step for the last injected frame.
        cursor.finish(self);
        Ok(())
    }

    /// Repeatedly re-step one frame until the skeleton settles onto the
    /// markers, returning the last checkpoint.
    ///
    /// Iterates until [`AttachmentManager::rms_distance`] falls to
    /// `max_rms` or below. No iteration cap exists: an unachievably small
    /// threshold loops forever, so callers must pick one the spring
    /// dynamics can reach.
    ///
    /// # Panics
    ///
    /// Panics if `frame_no` is outside the loaded marker data.
    pub fn settle(
        &mut self,
        frame_no: usize,
        max_rms: f64,
        states: Option<&FrameState>,
    ) -> FrameState {
        if let Some(states) = states {
            self.set_body_states(states);
        }
        loop {
            let states = self.prepare_frame(frame_no);
            self.complete_frame();
            let rmsd = self.markers.rms_distance(&self.engine);
            tracing::info!(frame_no, rmsd, "settling");
            if rmsd <= max_rms {
                return states;
            }
        }
    }
}

/// Shared frame-advancement state for the drive-mode iterators.
///
/// The engine step for a yielded frame is deferred until the next
/// [`advance`](Self::advance) call, reproducing suspend-at-yield semantics:
/// the caller observes the checkpoint before the frame's step happens, and
/// abandoning a sequence leaves its last yielded frame un-stepped.
#[derive(Debug)]
pub(crate) struct FollowCursor {
    next_frame: usize,
    end: usize,
    pending_step: bool,
}

impl FollowCursor {
    pub(crate) const fn new(frames: Range<usize>) -> Self {
        Self {
            next_frame: frames.start,
            end: frames.end,
            pending_step: false,
        }
    }

    /// Complete the previous frame, then prepare and yield the next
    /// checkpoint. Returns `None`, after completing the final frame, once
    /// the range is exhausted.
    pub(crate) fn advance<E: RigidBodyEngine>(
        &mut self,
        solver: &mut Solver<E>,
    ) -> Option<FrameState> {
        if self.pending_step {
            solver.complete_frame();
            self.pending_step = false;
        }
        if self.next_frame >= self.end {
            return None;
        }
        let frame_no = self.next_frame;
        self.next_frame += 1;
        let states = solver.prepare_frame(frame_no);
        self.pending_step = true;
        Some(states)
    }

    /// Complete any deferred step without yielding another frame.
    pub(crate) fn finish<E: RigidBodyEngine>(&mut self, solver: &mut Solver<E>) {
        if self.pending_step {
            solver.complete_frame();
            self.pending_step = false;
        }
    }
}
