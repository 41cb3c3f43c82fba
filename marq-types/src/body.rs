//! Rigid body kinematic state.
//!
//! Position, orientation, linear velocity, and angular velocity of a single
//! rigid segment, as read from and written to the engine.

use nalgebra::{Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position and orientation of a rigid body.
///
/// # Example
///
/// ```
/// use marq_types::Pose;
/// use nalgebra::Point3;
///
/// let pose = Pose::from_position(Point3::new(1.0, 2.0, 3.0));
/// let world = pose.transform_point(&Point3::new(1.0, 0.0, 0.0));
/// assert_eq!(world, Point3::new(2.0, 2.0, 3.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in world coordinates.
    pub position: Point3<f64>,
    /// Orientation as a unit quaternion.
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Create an identity pose (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Create a pose from position only (identity rotation).
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Create a pose from position and rotation.
    #[must_use]
    pub const fn from_position_rotation(
        position: Point3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        Self { position, rotation }
    }

    /// Transform a point from body-local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.rotation * local.coords
    }

    /// Transform a vector from body-local to world coordinates (rotation only).
    #[must_use]
    pub fn transform_vector(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * local
    }

    /// Transform a point from world to body-local coordinates.
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation.inverse() * (world - self.position))
    }

    /// Check if the pose contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite())
            && self.rotation.coords.iter().all(|x| x.is_finite())
    }
}

/// Linear and angular velocity of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Twist {
    /// Linear velocity in world coordinates (m/s).
    pub linear: Vector3<f64>,
    /// Angular velocity in world coordinates (rad/s).
    pub angular: Vector3<f64>,
}

impl Default for Twist {
    fn default() -> Self {
        Self::zero()
    }
}

impl Twist {
    /// Create a twist with specified linear and angular velocity.
    #[must_use]
    pub const fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }

    /// Create a zero twist (at rest).
    #[must_use]
    pub fn zero() -> Self {
        Self {
            linear: Vector3::zeros(),
            angular: Vector3::zeros(),
        }
    }

    /// Create a twist with linear velocity only.
    #[must_use]
    pub fn linear(v: Vector3<f64>) -> Self {
        Self {
            linear: v,
            angular: Vector3::zeros(),
        }
    }

    /// Check if the twist contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|x| x.is_finite()) && self.angular.iter().all(|x| x.is_finite())
    }
}

/// Complete kinematic state of a rigid body.
///
/// Combines pose (position + orientation) with twist (linear + angular
/// velocity). This is the unit of state transfer between the skeleton and
/// the engine; restoring a previously captured state must reproduce
/// bit-for-bit identical subsequent engine behavior.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyState {
    /// Position and orientation.
    pub pose: Pose,
    /// Linear and angular velocity.
    pub twist: Twist,
}

impl RigidBodyState {
    /// Create a state from pose and twist.
    #[must_use]
    pub const fn new(pose: Pose, twist: Twist) -> Self {
        Self { pose, twist }
    }

    /// Create a state at rest at the given pose.
    #[must_use]
    pub fn at_rest(pose: Pose) -> Self {
        Self {
            pose,
            twist: Twist::zero(),
        }
    }

    /// Check if the state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.twist.is_finite()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pose_transform_roundtrip() {
        let pose = Pose::from_position_rotation(
            Point3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );

        let local = Point3::new(0.5, -0.5, 0.25);
        let world = pose.transform_point(&local);
        let back = pose.inverse_transform_point(&world);

        assert_relative_eq!(back.coords, local.coords, epsilon = 1e-12);
    }

    #[test]
    fn test_pose_rotation() {
        // 90 degree rotation around Z maps +X to +Y
        let pose = Pose::from_position_rotation(
            Point3::origin(),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );

        let world = pose.transform_vector(&Vector3::x());
        assert_relative_eq!(world.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(world.y, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_state_finite() {
        let mut state = RigidBodyState::at_rest(Pose::identity());
        assert!(state.is_finite());

        state.twist.linear.x = f64::NAN;
        assert!(!state.is_finite());
    }
}
