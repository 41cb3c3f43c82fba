//! Two-pass marker-following solver ("Cooper method").
//!
//! The solver drives an articulated skeleton with recorded motion-capture
//! markers to recover, in two passes, the joint angles that best explain
//! the markers and the joint torques that reproduce those angles under
//! forward simulation:
//!
//! 1. **Inverse kinematics** — marker proxies drag the skeleton through
//!    compliant spring constraints; joint angles are read back each frame.
//! 2. **Inverse dynamics** — PID-driven motors replay the recovered angles;
//!    the constraint torques the engine computes to follow them are read
//!    back, and each frame is re-baselined to its pre-step checkpoint
//!    before the torques are re-applied.
//!
//! All drive modes share one per-frame protocol (detach, reposition,
//! attach, collide, checkpoint, yield, step, clear contacts) and are
//! exposed as single-pass iterators over a mutably-borrowed [`Solver`],
//! which makes out-of-order or interleaved frame advancement unrepresentable.
//!
//! ```no_run
//! use marq_engine::mock::MockEngine;
//! use marq_markers::{load_csv, AttachmentManager, LinearUnit, MarkerTrack};
//! use marq_skeleton::SkeletonBuilder;
//! use marq_solver::Solver;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = MockEngine::new(1.0 / 60.0);
//! let skeleton = SkeletonBuilder::new().build(&mut engine)?;
//! let data = load_csv("m0\n0.0, 0.0, 0.0, 0.0\n".as_bytes(), 60.0, LinearUnit::Meters)?;
//! let track = MarkerTrack::from_data(data, 1.0 / 60.0, None)?;
//! let markers = AttachmentManager::new(&mut engine, track);
//!
//! let mut solver = Solver::new(engine, skeleton, markers);
//! let angles: Vec<Vec<f64>> = solver.inverse_kinematics(0..1, None, 20.0).collect();
//! let torques: Vec<Vec<f64>> =
//!     solver.inverse_dynamics(angles, 0..1, None, 100.0)?.collect();
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::missing_errors_doc)]

mod follow;
mod id;
mod ik;
mod solver;

pub use follow::FollowFrames;
pub use id::InverseDynamics;
pub use ik::InverseKinematics;
pub use solver::Solver;
