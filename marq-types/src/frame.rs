//! Restorable snapshots of skeleton body states.

use crate::RigidBodyState;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A snapshot of every skeleton body's kinematic state, ordered by body name.
///
/// Captured by `Skeleton::get_body_states` and restored by
/// `Skeleton::set_body_states`. The two-pass solver relies on capture/restore
/// being lossless: re-applying a checkpoint and stepping the engine must
/// reproduce the exact trajectory that would have followed from the original
/// states.
///
/// # Example
///
/// ```
/// use marq_types::{FrameState, Pose, RigidBodyState};
/// use nalgebra::Point3;
///
/// let frame = FrameState::new(vec![
///     ("thigh".into(), RigidBodyState::default()),
///     ("calf".into(), RigidBodyState::at_rest(Pose::from_position(Point3::new(0.0, 0.0, -0.4)))),
/// ]);
///
/// // Entries are kept sorted by body name regardless of insertion order.
/// let names: Vec<&str> = frame.iter().map(|(name, _)| name).collect();
/// assert_eq!(names, ["calf", "thigh"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameState {
    entries: Vec<(String, RigidBodyState)>,
}

impl FrameState {
    /// Create a frame state from (name, state) pairs.
    ///
    /// Entries are sorted by body name so that two snapshots of the same
    /// skeleton always compare equal entry-for-entry.
    #[must_use]
    pub fn new(mut entries: Vec<(String, RigidBodyState)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    /// Look up the state recorded for a body name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RigidBodyState> {
        self.entries
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// Iterate over (name, state) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RigidBodyState)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Number of bodies in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{Pose, Twist};
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_sorted_on_construction() {
        let frame = FrameState::new(vec![
            ("zeta".into(), RigidBodyState::default()),
            ("alpha".into(), RigidBodyState::default()),
            ("mid".into(), RigidBodyState::default()),
        ]);

        let names: Vec<&str> = frame.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_lookup() {
        let state = RigidBodyState::new(
            Pose::from_position(Point3::new(1.0, 2.0, 3.0)),
            Twist::linear(Vector3::x()),
        );
        let frame = FrameState::new(vec![("pelvis".into(), state)]);

        assert_eq!(frame.get("pelvis"), Some(&state));
        assert_eq!(frame.get("skull"), None);
        assert_eq!(frame.len(), 1);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_snapshot_equality_ignores_insertion_order() {
        let a = FrameState::new(vec![
            ("a".into(), RigidBodyState::default()),
            ("b".into(), RigidBodyState::default()),
        ]);
        let b = FrameState::new(vec![
            ("b".into(), RigidBodyState::default()),
            ("a".into(), RigidBodyState::default()),
        ]);
        assert_eq!(a, b);
    }
}
