//! Articulated skeleton with motorized, PID-driven joints.
//!
//! A [`Skeleton`] wraps a set of rigid bodies connected by motorized joints
//! inside an externally-owned engine. It exposes the control surface the
//! marker-following solver drives:
//!
//! - Kinematic snapshot and restore ([`Skeleton::get_body_states`],
//!   [`Skeleton::set_body_states`]) over a name-ordered [`FrameState`]
//! - Motor control ([`Skeleton::enable_motors`],
//!   [`Skeleton::disable_motors`], [`Skeleton::set_target_angles`])
//! - Per-DOF readback ([`Skeleton::joint_angles`],
//!   [`Skeleton::joint_torques`]) and direct torque injection
//!   ([`Skeleton::add_torques`])
//!
//! Skeletons are built programmatically through [`SkeletonBuilder`]; every
//! name is resolved into an engine handle at build time.
//!
//! [`FrameState`]: marq_types::FrameState

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::missing_errors_doc)]

mod builder;
mod error;
mod skeleton;

pub use builder::{BodySpec, JointSpec, SkeletonBuilder, DEFAULT_DENSITY};
pub use error::{Result, SkeletonError};
pub use skeleton::Skeleton;
