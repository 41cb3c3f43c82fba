//! The follow driver: pure marker playback.

use std::ops::Range;

use marq_engine::RigidBodyEngine;
use marq_types::FrameState;

use crate::solver::{FollowCursor, Solver};

/// Iterator over followed marker frames, yielding each checkpoint.
///
/// The sequence is lazy, finite, and not restartable: each element requires
/// the engine to have advanced to exactly that frame. The engine step for a
/// yielded frame runs when the iterator is advanced past it; exhausting the
/// iterator (the final `None`) completes the last frame. Dropping the
/// iterator early is safe but leaves the last yielded frame un-stepped and
/// its contacts in place.
#[derive(Debug)]
pub struct FollowFrames<'a, E: RigidBodyEngine> {
    solver: &'a mut Solver<E>,
    cursor: FollowCursor,
}

impl<'a, E: RigidBodyEngine> FollowFrames<'a, E> {
    pub(crate) fn new(solver: &'a mut Solver<E>, frames: Range<usize>) -> Self {
        Self {
            solver,
            cursor: FollowCursor::new(frames),
        }
    }
}

impl<E: RigidBodyEngine> Iterator for FollowFrames<'_, E> {
    type Item = FrameState;

    fn next(&mut self) -> Option<FrameState> {
        self.cursor.advance(self.solver)
    }
}
