//! Rigid-body engine contract for the marker-following solver.
//!
//! The solver does not implement rigid-body dynamics. It drives an external
//! engine through the [`RigidBodyEngine`] trait, which covers exactly the
//! surface the two-pass solver needs: body and joint creation, per-DOF
//! parameter access, kinematic state transfer, constraint groups for
//! short-lived springs and contacts, collision detection, and stepping.
//!
//! Engine state is always an explicitly owned value passed into the
//! components that need it. Nothing in this stack holds a global world, so
//! independent engines can coexist (one per test, for instance).
//!
//! The [`mock`] module provides a recording, kinematically-stepping engine
//! used throughout the downstream test suites.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::missing_errors_doc)]

pub mod mock;

use marq_types::{
    BodyId, BodyShape, ConstraintId, GroupId, JointId, JointKind, JointParam, MotorId, Point3,
    RigidBodyState, Vector3,
};

/// The rigid-body engine surface consumed by the solver stack.
///
/// Conventions:
///
/// - DOF indices are zero-based per joint/motor, angular DOFs first.
/// - Anchor points passed to [`create_spring`](Self::create_spring) are in
///   the respective body's local frame; anchors reported back by
///   [`spring_anchors`](Self::spring_anchors) are in world coordinates.
/// - Feedback torques are the constraint forces the engine exerted on the
///   DOF during the most recent step, projected onto the DOF axis.
pub trait RigidBodyEngine {
    /// Fixed simulation timestep in seconds.
    fn timestep(&self) -> f64;

    /// Create a rigid body with the given shape at uniform density.
    fn create_body(&mut self, name: &str, shape: &BodyShape, density: f64) -> BodyId;

    /// Mark a body as kinematic (position-driven, infinite effective mass).
    fn set_kinematic(&mut self, body: BodyId, kinematic: bool);

    /// Read a body's pose and velocities.
    fn body_state(&self, body: BodyId) -> RigidBodyState;

    /// Write a body's pose and velocities.
    fn set_body_state(&mut self, body: BodyId, state: RigidBodyState);

    /// Create a joint of the given kind between two bodies.
    ///
    /// `child` of `None` attaches the joint to the static environment.
    /// The anchor is in world coordinates at creation time.
    fn create_joint(
        &mut self,
        name: &str,
        kind: JointKind,
        parent: BodyId,
        child: Option<BodyId>,
        anchor: Point3<f64>,
    ) -> JointId;

    /// Set the axis for one DOF of a joint.
    fn set_joint_axis(&mut self, joint: JointId, dof: usize, axis: Vector3<f64>);

    /// Create an auxiliary angular motor between two bodies.
    ///
    /// `euler` selects the engine's Euler-angle mode (axes 0 and 2 anchored
    /// to the respective bodies); otherwise axes are user-defined.
    fn create_angular_motor(
        &mut self,
        name: &str,
        parent: BodyId,
        child: Option<BodyId>,
        dofs: usize,
        euler: bool,
    ) -> MotorId;

    /// Set the axis for one DOF of an angular motor.
    fn set_motor_axis(&mut self, motor: MotorId, dof: usize, axis: Vector3<f64>);

    /// Set a per-DOF parameter on a joint.
    fn set_joint_param(&mut self, joint: JointId, dof: usize, param: JointParam, value: f64);

    /// Read a per-DOF parameter from a joint.
    fn joint_param(&self, joint: JointId, dof: usize, param: JointParam) -> f64;

    /// Set a per-DOF parameter on an angular motor.
    fn set_motor_param(&mut self, motor: MotorId, dof: usize, param: JointParam, value: f64);

    /// Read a per-DOF parameter from an angular motor.
    fn motor_param(&self, motor: MotorId, dof: usize, param: JointParam) -> f64;

    /// Current angle (or slider position) of one joint DOF.
    fn joint_angle(&self, joint: JointId, dof: usize) -> f64;

    /// Current angle of one motor DOF.
    fn motor_angle(&self, motor: MotorId, dof: usize) -> f64;

    /// Constraint-force-derived torque on one joint DOF from the last step.
    fn joint_feedback_torque(&self, joint: JointId, dof: usize) -> f64;

    /// Constraint-force-derived torque on one motor DOF from the last step.
    fn motor_feedback_torque(&self, motor: MotorId, dof: usize) -> f64;

    /// Apply a torque directly to one joint DOF for the next step.
    fn add_joint_torque(&mut self, joint: JointId, dof: usize, torque: f64);

    /// Apply a torque directly to one motor DOF for the next step.
    fn add_motor_torque(&mut self, motor: MotorId, dof: usize, torque: f64);

    /// Create a constraint group for short-lived constraints.
    fn create_group(&mut self) -> GroupId;

    /// Destroy every constraint currently in the group.
    ///
    /// Must be a no-op on an empty group.
    fn clear_group(&mut self, group: GroupId);

    /// Create a compliant ball ("spring") constraint inside a group.
    ///
    /// The constraint pulls `anchor_a` on `body_a` and `anchor_b` on
    /// `body_b` toward coincidence with compliance `cfm` and stiffness
    /// `erp`. Both anchors are body-local.
    #[allow(clippy::too_many_arguments)]
    fn create_spring(
        &mut self,
        group: GroupId,
        body_a: BodyId,
        body_b: BodyId,
        anchor_a: Point3<f64>,
        anchor_b: Point3<f64>,
        cfm: f64,
        erp: f64,
    ) -> ConstraintId;

    /// Engine-reported world-space positions of a spring's two anchors.
    fn spring_anchors(&self, spring: ConstraintId) -> (Point3<f64>, Point3<f64>);

    /// Run collision detection and deposit transient contact constraints
    /// into the given group.
    fn collide(&mut self, contacts: GroupId);

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f64);
}
