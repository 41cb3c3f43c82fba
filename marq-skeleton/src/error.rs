//! Skeleton construction and control errors.

use thiserror::Error;

/// Errors raised while building or driving a skeleton.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkeletonError {
    /// Two body specs share a name.
    #[error("duplicate body name: {name}")]
    DuplicateBody {
        /// The offending name.
        name: String,
    },

    /// Two joint specs share a name.
    #[error("duplicate joint name: {name}")]
    DuplicateJoint {
        /// The offending name.
        name: String,
    },

    /// A joint or placement referenced a body that was never declared.
    #[error("unknown body: {name}")]
    UnknownBody {
        /// The unresolved name.
        name: String,
    },

    /// A per-DOF vector had the wrong length.
    #[error("DOF vector length mismatch: expected {expected}, got {actual}")]
    DofMismatch {
        /// The skeleton's DOF count.
        expected: usize,
        /// The caller-supplied length.
        actual: usize,
    },
}

impl SkeletonError {
    /// Duplicate body name.
    #[must_use]
    pub fn duplicate_body(name: impl Into<String>) -> Self {
        Self::DuplicateBody { name: name.into() }
    }

    /// Duplicate joint name.
    #[must_use]
    pub fn duplicate_joint(name: impl Into<String>) -> Self {
        Self::DuplicateJoint { name: name.into() }
    }

    /// Unresolved body reference.
    #[must_use]
    pub fn unknown_body(name: impl Into<String>) -> Self {
        Self::UnknownBody { name: name.into() }
    }

    /// Wrong per-DOF vector length.
    #[must_use]
    pub const fn dof_mismatch(expected: usize, actual: usize) -> Self {
        Self::DofMismatch { expected, actual }
    }
}

/// Result alias for skeleton operations.
pub type Result<T> = core::result::Result<T, SkeletonError>;
