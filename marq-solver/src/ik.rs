//! Inverse kinematics: marker following with joint-angle readback.

use std::ops::Range;

use marq_engine::RigidBodyEngine;

use crate::solver::{FollowCursor, Solver};

/// Iterator yielding one joint-angle vector per followed frame.
///
/// The skeleton is dragged by the marker springs; when motors are enabled
/// (`max_force > 0`) they hold a zero-angle equilibrium so the skeleton
/// resists drift without fighting the springs. The yielded vectors have
/// `num_dofs` entries in the skeleton's fixed DOF ordering.
#[derive(Debug)]
pub struct InverseKinematics<'a, E: RigidBodyEngine> {
    solver: &'a mut Solver<E>,
    cursor: FollowCursor,
    zeros: Option<Vec<f64>>,
}

impl<'a, E: RigidBodyEngine> InverseKinematics<'a, E> {
    pub(crate) fn new(solver: &'a mut Solver<E>, frames: Range<usize>, max_force: f64) -> Self {
        solver.skeleton.reset_controllers();
        let zeros = (max_force > 0.0).then(|| {
            solver
                .skeleton
                .enable_motors(&mut solver.engine, max_force);
            vec![0.0; solver.skeleton.num_dofs()]
        });
        Self {
            solver,
            cursor: FollowCursor::new(frames),
            zeros,
        }
    }
}

impl<E: RigidBodyEngine> Iterator for InverseKinematics<'_, E> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        self.cursor.advance(self.solver)?;
        if let Some(zeros) = &self.zeros {
            // Sized to num_dofs at construction, so this cannot mismatch.
            let _ = self
                .solver
                .skeleton
                .set_target_angles(&mut self.solver.engine, zeros);
        }
        Some(self.solver.skeleton.joint_angles(&self.solver.engine))
    }
}
