//! Programmatic skeleton construction.
//!
//! A [`SkeletonBuilder`] collects body and joint specifications by name and
//! resolves them into engine handles in a single [`build`](SkeletonBuilder::build)
//! call. Name resolution happens at build time, so specs can be declared in
//! any order.

use hashbrown::HashMap;
use marq_engine::RigidBodyEngine;
use marq_types::{
    BodyShape, JointKind, JointParam, PidController, PidGains, Point3, RigidBodyState, Vector3,
};

use crate::error::{Result, SkeletonError};
use crate::skeleton::{BodyEntry, Drive, JointEntry, Skeleton};

/// Default body density in kg/m^3 (water).
pub const DEFAULT_DENSITY: f64 = 1000.0;

/// Specification of one rigid segment.
#[derive(Debug, Clone)]
pub struct BodySpec {
    pub(crate) name: String,
    pub(crate) shape: BodyShape,
    pub(crate) density: f64,
    pub(crate) state: RigidBodyState,
    pub(crate) root: bool,
}

impl BodySpec {
    /// A body with the given name and shape at [`DEFAULT_DENSITY`],
    /// at rest at the origin.
    #[must_use]
    pub fn new(name: impl Into<String>, shape: BodyShape) -> Self {
        Self {
            name: name.into(),
            shape,
            density: DEFAULT_DENSITY,
            state: RigidBodyState::default(),
            root: false,
        }
    }

    /// Override the density.
    #[must_use]
    pub const fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Set the initial position, at rest.
    #[must_use]
    pub fn with_position(mut self, position: Point3<f64>) -> Self {
        self.state.pose.position = position;
        self
    }

    /// Set the full initial kinematic state.
    #[must_use]
    pub const fn with_state(mut self, state: RigidBodyState) -> Self {
        self.state = state;
        self
    }

    /// Mark this body as a root (torso/pelvis class), giving its marker
    /// attachments stiffened compliance.
    #[must_use]
    pub const fn with_root(mut self) -> Self {
        self.root = true;
        self
    }
}

/// Specification of one motorized joint.
#[derive(Debug, Clone)]
pub struct JointSpec {
    pub(crate) name: String,
    pub(crate) kind: JointKind,
    pub(crate) parent: String,
    pub(crate) child: Option<String>,
    pub(crate) anchor: Point3<f64>,
    pub(crate) axes: Vec<(usize, Vector3<f64>)>,
    pub(crate) stops: Vec<(usize, f64, f64)>,
    pub(crate) gains: PidGains,
}

impl JointSpec {
    /// A joint of the given kind anchored on `parent`, attached to the
    /// static environment until a child is named.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: JointKind, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: parent.into(),
            child: None,
            anchor: Point3::origin(),
            axes: Vec::new(),
            stops: Vec::new(),
            gains: PidGains::default(),
        }
    }

    /// Connect the joint to a second body.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.child = Some(child.into());
        self
    }

    /// Set the world-space anchor point.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Point3<f64>) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set the axis for one DOF.
    #[must_use]
    pub fn with_axis(mut self, dof: usize, axis: Vector3<f64>) -> Self {
        self.axes.push((dof, axis));
        self
    }

    /// Set angle (or position) stops for one DOF.
    #[must_use]
    pub fn with_stops(mut self, dof: usize, lo: f64, hi: f64) -> Self {
        self.stops.push((dof, lo, hi));
        self
    }

    /// Set the PID gains shared by every DOF of this joint.
    #[must_use]
    pub const fn with_gains(mut self, gains: PidGains) -> Self {
        self.gains = gains;
        self
    }
}

/// Collects body and joint specs and resolves them against an engine.
#[derive(Debug, Default)]
pub struct SkeletonBuilder {
    bodies: Vec<BodySpec>,
    joints: Vec<JointSpec>,
}

impl SkeletonBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body spec.
    #[must_use]
    pub fn body(mut self, spec: BodySpec) -> Self {
        self.bodies.push(spec);
        self
    }

    /// Add a joint spec.
    #[must_use]
    pub fn joint(mut self, spec: JointSpec) -> Self {
        self.joints.push(spec);
        self
    }

    /// Resolve every spec into engine handles.
    ///
    /// Bodies and joints are registered in lexicographic name order, which
    /// fixes the DOF ordering for the lifetime of the skeleton.
    pub fn build<E: RigidBodyEngine>(mut self, engine: &mut E) -> Result<Skeleton> {
        self.bodies.sort_by(|a, b| a.name.cmp(&b.name));
        self.joints.sort_by(|a, b| a.name.cmp(&b.name));

        let mut body_index = HashMap::new();
        let mut bodies = Vec::with_capacity(self.bodies.len());
        for spec in &self.bodies {
            if body_index.contains_key(&spec.name) {
                return Err(SkeletonError::duplicate_body(&spec.name));
            }
            let id = engine.create_body(&spec.name, &spec.shape, spec.density);
            engine.set_body_state(id, spec.state);
            body_index.insert(spec.name.clone(), bodies.len());
            bodies.push(BodyEntry {
                name: spec.name.clone(),
                id,
                shape: spec.shape,
                density: spec.density,
                root: spec.root,
            });
        }

        let mut joint_names: HashMap<&str, ()> = HashMap::new();
        let mut joints = Vec::with_capacity(self.joints.len());
        let mut num_dofs = 0;
        for spec in &self.joints {
            if joint_names.insert(&spec.name, ()).is_some() {
                return Err(SkeletonError::duplicate_joint(&spec.name));
            }
            let parent = bodies[Self::resolve(&body_index, &spec.parent)?].id;
            let child = match &spec.child {
                Some(name) => Some(bodies[Self::resolve(&body_index, name)?].id),
                None => None,
            };

            let joint = engine.create_joint(&spec.name, spec.kind, parent, child, spec.anchor);
            let drive = if spec.kind == JointKind::Ball {
                // A ball joint is driven through a pair of auxiliary angular
                // motors: one exerting control torques, one enforcing limits.
                let amotor = engine.create_angular_motor(
                    &format!("{}:drive", spec.name),
                    parent,
                    child,
                    spec.kind.angular_dofs(),
                    true,
                );
                let alimit = engine.create_angular_motor(
                    &format!("{}:limit", spec.name),
                    parent,
                    child,
                    spec.kind.angular_dofs(),
                    true,
                );
                for &(dof, axis) in &spec.axes {
                    engine.set_motor_axis(amotor, dof, axis);
                    engine.set_motor_axis(alimit, dof, axis);
                }
                for &(dof, lo, hi) in &spec.stops {
                    engine.set_motor_param(alimit, dof, JointParam::LoStop, lo);
                    engine.set_motor_param(alimit, dof, JointParam::HiStop, hi);
                }
                Drive::Ball { amotor, alimit }
            } else {
                for &(dof, axis) in &spec.axes {
                    engine.set_joint_axis(joint, dof, axis);
                }
                for &(dof, lo, hi) in &spec.stops {
                    engine.set_joint_param(joint, dof, JointParam::LoStop, lo);
                    engine.set_joint_param(joint, dof, JointParam::HiStop, hi);
                }
                Drive::Direct
            };

            num_dofs += spec.kind.dofs();
            joints.push(JointEntry {
                name: spec.name.clone(),
                kind: spec.kind,
                joint,
                drive,
                pids: vec![PidController::new(spec.gains); spec.kind.dofs()],
            });
        }

        Ok(Skeleton {
            bodies,
            body_index,
            joints,
            num_dofs,
        })
    }

    fn resolve(index: &HashMap<String, usize>, name: &str) -> Result<usize> {
        index
            .get(name)
            .copied()
            .ok_or_else(|| SkeletonError::unknown_body(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use marq_engine::mock::MockEngine;
    use marq_types::JointParam;

    const DT: f64 = 1.0 / 60.0;

    fn capsule() -> BodyShape {
        BodyShape::Capsule {
            radius: 0.05,
            length: 0.3,
        }
    }

    #[test]
    fn test_duplicate_body_rejected() {
        let mut engine = MockEngine::new(DT);
        let err = SkeletonBuilder::new()
            .body(BodySpec::new("torso", capsule()))
            .body(BodySpec::new("torso", capsule()))
            .build(&mut engine)
            .unwrap_err();
        assert_eq!(err, SkeletonError::duplicate_body("torso"));
    }

    #[test]
    fn test_duplicate_joint_rejected() {
        let mut engine = MockEngine::new(DT);
        let err = SkeletonBuilder::new()
            .body(BodySpec::new("torso", capsule()))
            .joint(JointSpec::new("j", JointKind::Hinge, "torso"))
            .joint(JointSpec::new("j", JointKind::Fixed, "torso"))
            .build(&mut engine)
            .unwrap_err();
        assert_eq!(err, SkeletonError::duplicate_joint("j"));
    }

    #[test]
    fn test_unknown_body_rejected() {
        let mut engine = MockEngine::new(DT);
        let err = SkeletonBuilder::new()
            .body(BodySpec::new("torso", capsule()))
            .joint(JointSpec::new("hip", JointKind::Ball, "torso").with_child("pelvis"))
            .build(&mut engine)
            .unwrap_err();
        assert_eq!(err, SkeletonError::unknown_body("pelvis"));
    }

    #[test]
    fn test_dof_count_sums_over_joints() {
        let mut engine = MockEngine::new(DT);
        let skeleton = SkeletonBuilder::new()
            .body(BodySpec::new("a", capsule()))
            .body(BodySpec::new("b", capsule()))
            .body(BodySpec::new("c", capsule()))
            .joint(JointSpec::new("ab", JointKind::Ball, "a").with_child("b"))
            .joint(JointSpec::new("bc", JointKind::Hinge, "b").with_child("c"))
            .build(&mut engine)
            .unwrap();
        assert_eq!(skeleton.num_dofs(), 4);
    }

    #[test]
    fn test_ball_stops_land_on_limit_motor() {
        let mut engine = MockEngine::new(DT);
        let _skeleton = SkeletonBuilder::new()
            .body(BodySpec::new("a", capsule()))
            .body(BodySpec::new("b", capsule()))
            .joint(
                JointSpec::new("ab", JointKind::Ball, "a")
                    .with_child("b")
                    .with_stops(0, -1.0, 1.0),
            )
            .build(&mut engine)
            .unwrap();
        // One LoStop and one HiStop write for the configured DOF.
        assert_eq!(engine.param_writes(JointParam::LoStop), 1);
        assert_eq!(engine.param_writes(JointParam::HiStop), 1);
    }

    #[test]
    fn test_bodies_registered_in_name_order() {
        let mut engine = MockEngine::new(DT);
        let skeleton = SkeletonBuilder::new()
            .body(BodySpec::new("zeta", capsule()))
            .body(BodySpec::new("alpha", capsule()))
            .build(&mut engine)
            .unwrap();
        let names: Vec<&str> = skeleton.body_names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
