//! Inverse dynamics: angle replay with torque readback.

use std::ops::Range;

use marq_engine::RigidBodyEngine;
use marq_skeleton::{Result, SkeletonError};

use crate::solver::{FollowCursor, Solver};

/// Iterator yielding one joint-torque vector per replayed frame.
///
/// Each frame runs the stability correction: enable motors, follow the
/// given angles through one extra engine step, read the constraint torques,
/// then throw the angle-constrained step away by restoring the frame's
/// checkpoint and re-applying the measured torques directly. Skipping the
/// restore would let the small mismatch between angle-constrained and
/// torque-driven dynamics compound across frames.
#[derive(Debug)]
pub struct InverseDynamics<'a, E: RigidBodyEngine> {
    solver: &'a mut Solver<E>,
    cursor: FollowCursor,
    angles: std::vec::IntoIter<Vec<f64>>,
    max_force: f64,
}

impl<'a, E: RigidBodyEngine> InverseDynamics<'a, E> {
    pub(crate) fn new(
        solver: &'a mut Solver<E>,
        angles: Vec<Vec<f64>>,
        frames: Range<usize>,
        max_force: f64,
    ) -> Result<Self> {
        let expected = solver.skeleton.num_dofs();
        for frame in &angles {
            if frame.len() != expected {
                return Err(SkeletonError::dof_mismatch(expected, frame.len()));
            }
        }
        solver.skeleton.reset_controllers();
        Ok(Self {
            solver,
            cursor: FollowCursor::new(frames),
            angles: angles.into_iter(),
            max_force,
        })
    }
}

impl<E: RigidBodyEngine> Iterator for InverseDynamics<'_, E> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        let Some(target) = self.angles.next() else {
            // Angle data ran out first: run the deferred step so the last
            // frame's re-applied torques actually drive an engine step.
            self.cursor.finish(self.solver);
            return None;
        };
        let checkpoint = self.cursor.advance(self.solver)?;

        let solver = &mut *self.solver;
        solver
            .skeleton
            .enable_motors(&mut solver.engine, self.max_force);
        // Validated against num_dofs at construction.
        let _ = solver
            .skeleton
            .set_target_angles(&mut solver.engine, &target);

        let dt = solver.engine.timestep();
        solver.engine.step(dt);

        let torques = solver.skeleton.joint_torques(&solver.engine);
        solver.skeleton.disable_motors(&mut solver.engine);
        solver.skeleton.set_body_states(&mut solver.engine, &checkpoint);
        let _ = solver.skeleton.add_torques(&mut solver.engine, &torques);

        Some(torques)
    }
}
