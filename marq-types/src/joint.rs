//! Joint kinds and per-DOF parameters.
//!
//! The joint set is closed and each kind has a fixed number of angular and
//! linear degrees of freedom. Ball joints have no native per-DOF parameters
//! in the engine; they are driven through a pair of auxiliary angular motors
//! owned by the skeleton.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A joint kind name matched no known kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown joint kind: {0}")]
pub struct UnknownKind(pub String);

/// Kind of joint connecting two skeleton bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointKind {
    /// Rigid connection, no relative motion.
    Fixed,
    /// Translation along a single axis.
    Slider,
    /// Rotation around a single axis.
    Hinge,
    /// Rotation around two perpendicular axes.
    Universal,
    /// Rotation around all three axes (ball-and-socket).
    Ball,
}

impl JointKind {
    /// Parse a kind name, accepting the documented 3-letter abbreviations
    /// (`fix`, `sli`, `hin`, `uni`, `bal`) alongside the full names.
    pub fn parse(name: &str) -> Result<Self, UnknownKind> {
        match name.to_ascii_lowercase().as_str() {
            "fix" | "fixed" => Ok(Self::Fixed),
            "sli" | "slider" => Ok(Self::Slider),
            "hin" | "hinge" => Ok(Self::Hinge),
            "uni" | "universal" => Ok(Self::Universal),
            "bal" | "ball" => Ok(Self::Ball),
            other => Err(UnknownKind(other.to_owned())),
        }
    }

    /// Number of angular degrees of freedom.
    #[must_use]
    pub const fn angular_dofs(self) -> usize {
        match self {
            Self::Fixed | Self::Slider => 0,
            Self::Hinge => 1,
            Self::Universal => 2,
            Self::Ball => 3,
        }
    }

    /// Number of linear degrees of freedom.
    #[must_use]
    pub const fn linear_dofs(self) -> usize {
        match self {
            Self::Slider => 1,
            _ => 0,
        }
    }

    /// Total degrees of freedom, angular DOFs ordered before linear.
    #[must_use]
    pub const fn dofs(self) -> usize {
        self.angular_dofs() + self.linear_dofs()
    }
}

impl std::str::FromStr for JointKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for JointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Slider => write!(f, "slider"),
            Self::Hinge => write!(f, "hinge"),
            Self::Universal => write!(f, "universal"),
            Self::Ball => write!(f, "ball"),
        }
    }
}

/// Per-DOF parameter on a joint or auxiliary motor.
///
/// Mirrors the parameter surface the engine exposes per degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointParam {
    /// Lower angle/position stop.
    LoStop,
    /// Upper angle/position stop.
    HiStop,
    /// Target velocity for the DOF's motor.
    Velocity,
    /// Maximum force/torque the motor may exert to reach its target velocity.
    MaxForce,
    /// Constraint-force mixing (compliance) for the DOF.
    Cfm,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dof_counts() {
        assert_eq!(JointKind::Fixed.dofs(), 0);
        assert_eq!(JointKind::Slider.dofs(), 1);
        assert_eq!(JointKind::Hinge.dofs(), 1);
        assert_eq!(JointKind::Universal.dofs(), 2);
        assert_eq!(JointKind::Ball.dofs(), 3);

        assert_eq!(JointKind::Slider.angular_dofs(), 0);
        assert_eq!(JointKind::Slider.linear_dofs(), 1);
        assert_eq!(JointKind::Ball.linear_dofs(), 0);
    }

    #[test]
    fn test_parse_with_abbreviations() {
        assert_eq!(JointKind::parse("ball").unwrap(), JointKind::Ball);
        assert_eq!(JointKind::parse("bal").unwrap(), JointKind::Ball);
        assert_eq!(JointKind::parse("Hinge").unwrap(), JointKind::Hinge);
        assert_eq!("uni".parse::<JointKind>().unwrap(), JointKind::Universal);
        assert!(JointKind::parse("gimbal").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(JointKind::Universal.to_string(), "universal");
    }
}
