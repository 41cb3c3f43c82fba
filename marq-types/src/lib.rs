//! Core types for marker-driven motion analysis.
//!
//! This crate provides the foundational types shared by the marker-following
//! solver stack:
//!
//! - [`Pose`], [`Twist`], [`RigidBodyState`] - rigid body kinematic state
//! - [`FrameState`] - a restorable, name-ordered snapshot of every body
//! - [`BodyShape`] - the closed set of body shapes with per-kind mass formulas
//! - [`JointKind`] - the closed set of joint kinds with fixed DOF counts
//! - [`PidController`] - per-DOF angle-error to velocity-target conversion
//! - [`BodyId`], [`JointId`], [`MotorId`] and friends - engine handles
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They carry no engine state and no stepping
//! logic. They are the common language between:
//!
//! - The rigid-body engine adapter (marq-engine)
//! - The articulated skeleton (marq-skeleton)
//! - Marker tracks and attachments (marq-markers)
//! - The two-pass solver (marq-solver)
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use marq_types::{Pose, RigidBodyState, Twist};
//! use nalgebra::Point3;
//!
//! let state = RigidBodyState::new(
//!     Pose::from_position(Point3::new(0.0, 0.0, 1.0)),
//!     Twist::zero(),
//! );
//!
//! assert_eq!(state.pose.position.z, 1.0);
//! assert!(state.twist.linear.norm() < 1e-10);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,   // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,       // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,    // usize to f64 is fine for counts
    clippy::missing_errors_doc,     // Error docs added where non-obvious
)]

mod body;
mod frame;
mod ids;
mod joint;
mod pid;
mod shape;

pub use body::{Pose, RigidBodyState, Twist};
pub use frame::FrameState;
pub use ids::{BodyId, ConstraintId, GroupId, JointId, MotorId};
pub use joint::{JointKind, JointParam, UnknownKind};
pub use pid::{PidController, PidGains};
pub use shape::{BodyShape, MassProperties, ShapeError};

// Re-export math types for convenience
pub use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Wrap an angle error into the half-open interval [-pi, pi).
///
/// Joint angle errors are wrapped before being fed to the PID controllers so
/// that a joint sitting just past the seam of its angular range does not
/// receive a full-revolution correction.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can land exactly on PI for inputs like -PI
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_wrap_angle_identity() {
        assert_relative_eq!(wrap_angle(0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-1.0), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_angle_over_seam() {
        assert_relative_eq!(wrap_angle(PI + 0.1), -PI + 0.1, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI - 0.1), PI - 0.1, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(3.0 * PI), -PI, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_angle_half_open() {
        // PI itself maps to -PI (the interval is half-open at +PI)
        assert!(wrap_angle(PI) < PI);
        assert!(wrap_angle(-PI) < PI);
    }
}
