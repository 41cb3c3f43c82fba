//! Engine handle types.
//!
//! The rigid-body engine hands out opaque identifiers for everything it owns:
//! bodies, joints, auxiliary motors, constraint groups, and the per-frame
//! spring constraints. Holding an id does not keep the underlying object
//! alive; ids created inside a constraint group are invalidated when the
//! group is cleared.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a rigid body in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Unique identifier for a joint in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointId(pub u64);

impl JointId {
    /// Create a new joint ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for JointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Joint({})", self.0)
    }
}

/// Unique identifier for an auxiliary angular motor.
///
/// Ball joints are driven through two of these: one carries the velocity
/// motor, the other carries the angular limits and angle readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotorId(pub u64);

impl MotorId {
    /// Create a new motor ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MotorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Motor({})", self.0)
    }
}

/// Unique identifier for a constraint group.
///
/// Groups collect short-lived constraints (marker springs, contacts) so they
/// can be destroyed together between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupId(pub u64);

impl GroupId {
    /// Create a new group ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group({})", self.0)
    }
}

/// Unique identifier for a single constraint inside a group.
///
/// Only valid until the owning group is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintId(pub u64);

impl ConstraintId {
    /// Create a new constraint ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Constraint({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        assert_eq!(BodyId::new(7).raw(), 7);
        assert_eq!(JointId::new(7).raw(), 7);
        assert_eq!(MotorId::new(7).raw(), 7);
        assert_eq!(GroupId::new(7).raw(), 7);
        assert_eq!(ConstraintId::new(7).raw(), 7);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(BodyId::new(3).to_string(), "Body(3)");
        assert_eq!(JointId::new(3).to_string(), "Joint(3)");
        assert_eq!(MotorId::new(3).to_string(), "Motor(3)");
    }
}
