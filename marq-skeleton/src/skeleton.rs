//! The articulated skeleton and its motor-control surface.

use hashbrown::HashMap;
use marq_engine::RigidBodyEngine;
use marq_types::{
    wrap_angle, BodyId, BodyShape, FrameState, JointId, JointKind, JointParam, MotorId,
    PidController, Point3, Vector3,
};

use crate::error::{Result, SkeletonError};

/// How control torques reach a joint.
///
/// Most joint kinds are driven through the joint's own per-DOF motor
/// parameters. Ball joints have no native DOF parameters; they are driven
/// through an auxiliary angular motor and limited through a second one.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Drive {
    Direct,
    Ball {
        amotor: MotorId,
        #[allow(dead_code)]
        alimit: MotorId,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct BodyEntry {
    pub(crate) name: String,
    pub(crate) id: BodyId,
    pub(crate) shape: BodyShape,
    pub(crate) density: f64,
    pub(crate) root: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct JointEntry {
    #[allow(dead_code)]
    pub(crate) name: String,
    pub(crate) kind: JointKind,
    pub(crate) joint: JointId,
    pub(crate) drive: Drive,
    pub(crate) pids: Vec<PidController>,
}

impl JointEntry {
    /// Set one per-DOF control parameter on whatever drives this joint.
    fn set_param<E: RigidBodyEngine>(&self, engine: &mut E, dof: usize, param: JointParam, value: f64) {
        match self.drive {
            Drive::Direct => engine.set_joint_param(self.joint, dof, param, value),
            Drive::Ball { amotor, .. } => engine.set_motor_param(amotor, dof, param, value),
        }
    }

    fn angle<E: RigidBodyEngine>(&self, engine: &E, dof: usize) -> f64 {
        match self.drive {
            Drive::Direct => engine.joint_angle(self.joint, dof),
            Drive::Ball { amotor, .. } => engine.motor_angle(amotor, dof),
        }
    }

    fn feedback_torque<E: RigidBodyEngine>(&self, engine: &E, dof: usize) -> f64 {
        match self.drive {
            Drive::Direct => engine.joint_feedback_torque(self.joint, dof),
            Drive::Ball { amotor, .. } => engine.motor_feedback_torque(amotor, dof),
        }
    }

    fn add_torque<E: RigidBodyEngine>(&self, engine: &mut E, dof: usize, torque: f64) {
        match self.drive {
            Drive::Direct => engine.add_joint_torque(self.joint, dof, torque),
            Drive::Ball { amotor, .. } => engine.add_motor_torque(amotor, dof, torque),
        }
    }
}

/// An articulated set of rigid bodies connected by motorized joints.
///
/// Bodies and joints are held in lexicographic name order, which fixes the
/// DOF ordering: joints sorted by name, and within a joint DOF index 0..k,
/// angular DOFs before the linear one. Every per-DOF vector exchanged with
/// the skeleton ([`joint_angles`](Self::joint_angles),
/// [`set_target_angles`](Self::set_target_angles),
/// [`add_torques`](Self::add_torques)) uses this ordering.
#[derive(Debug)]
pub struct Skeleton {
    pub(crate) bodies: Vec<BodyEntry>,
    pub(crate) body_index: HashMap<String, usize>,
    pub(crate) joints: Vec<JointEntry>,
    pub(crate) num_dofs: usize,
}

impl Skeleton {
    /// Total DOF count across all joints. Fixed at build time.
    #[must_use]
    pub const fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    /// Body names in registration (lexicographic) order.
    pub fn body_names(&self) -> impl Iterator<Item = &str> {
        self.bodies.iter().map(|b| b.name.as_str())
    }

    /// Engine handle for a named body.
    #[must_use]
    pub fn body_id(&self, name: &str) -> Option<BodyId> {
        self.body_index.get(name).map(|&i| self.bodies[i].id)
    }

    /// Bounding dimensions of a named body's shape.
    #[must_use]
    pub fn body_dimensions(&self, name: &str) -> Option<Vector3<f64>> {
        self.body_index
            .get(name)
            .map(|&i| self.bodies[i].shape.dimensions())
    }

    /// Whether the named body was declared a root.
    #[must_use]
    pub fn is_root(&self, name: &str) -> bool {
        self.body_index
            .get(name)
            .is_some_and(|&i| self.bodies[i].root)
    }

    /// Snapshot every body's kinematic state, ordered by body name.
    #[must_use]
    pub fn get_body_states<E: RigidBodyEngine>(&self, engine: &E) -> FrameState {
        FrameState::new(
            self.bodies
                .iter()
                .map(|b| (b.name.clone(), engine.body_state(b.id)))
                .collect(),
        )
    }

    /// Restore body states from a snapshot.
    ///
    /// Entries naming bodies this skeleton does not own are skipped with a
    /// warning. All writes land before this call returns, so a subsequent
    /// engine step observes no partial update.
    pub fn set_body_states<E: RigidBodyEngine>(&self, engine: &mut E, states: &FrameState) {
        for (name, state) in states.iter() {
            match self.body_index.get(name) {
                Some(&i) => engine.set_body_state(self.bodies[i].id, *state),
                None => tracing::warn!(body = name, "state snapshot names an unknown body"),
            }
        }
    }

    /// Enable velocity-following motors on every DOF, capped at `max_force`.
    ///
    /// PID state is left intact, so a control pass may toggle motors every
    /// frame without losing integral or derivative memory. Call
    /// [`reset_controllers`](Self::reset_controllers) at pass boundaries.
    pub fn enable_motors<E: RigidBodyEngine>(&mut self, engine: &mut E, max_force: f64) {
        for entry in &mut self.joints {
            for dof in 0..entry.kind.dofs() {
                entry.set_param(engine, dof, JointParam::MaxForce, max_force);
            }
        }
    }

    /// Release motor control on every DOF without altering body state.
    ///
    /// Like [`enable_motors`](Self::enable_motors), leaves PID state intact.
    pub fn disable_motors<E: RigidBodyEngine>(&mut self, engine: &mut E) {
        for entry in &mut self.joints {
            for dof in 0..entry.kind.dofs() {
                entry.set_param(engine, dof, JointParam::MaxForce, 0.0);
                entry.set_param(engine, dof, JointParam::Velocity, 0.0);
            }
        }
    }

    /// Zero every DOF's PID controller state.
    ///
    /// Run once at the start of each control pass, so no error accumulated
    /// under a previous pass leaks into the next.
    pub fn reset_controllers(&mut self) {
        for entry in &mut self.joints {
            for pid in &mut entry.pids {
                pid.reset();
            }
        }
    }

    /// Drive every DOF toward the given target angles.
    ///
    /// Each DOF's angle error is wrapped to [-pi, pi) and fed through that
    /// DOF's PID controller; the output becomes the motor's velocity target.
    /// Only effective while motors are enabled.
    pub fn set_target_angles<E: RigidBodyEngine>(
        &mut self,
        engine: &mut E,
        angles: &[f64],
    ) -> Result<()> {
        if angles.len() != self.num_dofs {
            return Err(SkeletonError::dof_mismatch(self.num_dofs, angles.len()));
        }
        let dt = engine.timestep();
        let mut offset = 0;
        for entry in &mut self.joints {
            for dof in 0..entry.kind.dofs() {
                let error = wrap_angle(angles[offset + dof] - entry.angle(engine, dof));
                let velocity = entry.pids[dof].update(error, dt);
                entry.set_param(engine, dof, JointParam::Velocity, velocity);
            }
            offset += entry.kind.dofs();
        }
        Ok(())
    }

    /// Current per-DOF joint angles, in the fixed DOF ordering.
    #[must_use]
    pub fn joint_angles<E: RigidBodyEngine>(&self, engine: &E) -> Vec<f64> {
        let mut angles = Vec::with_capacity(self.num_dofs);
        for entry in &self.joints {
            for dof in 0..entry.kind.dofs() {
                angles.push(entry.angle(engine, dof));
            }
        }
        angles
    }

    /// Constraint-force-derived per-DOF torques from the last engine step.
    #[must_use]
    pub fn joint_torques<E: RigidBodyEngine>(&self, engine: &E) -> Vec<f64> {
        let mut torques = Vec::with_capacity(self.num_dofs);
        for entry in &self.joints {
            for dof in 0..entry.kind.dofs() {
                torques.push(entry.feedback_torque(engine, dof));
            }
        }
        torques
    }

    /// Apply a per-DOF torque vector directly, bypassing the PID loop.
    pub fn add_torques<E: RigidBodyEngine>(&self, engine: &mut E, torques: &[f64]) -> Result<()> {
        if torques.len() != self.num_dofs {
            return Err(SkeletonError::dof_mismatch(self.num_dofs, torques.len()));
        }
        let mut offset = 0;
        for entry in &self.joints {
            for dof in 0..entry.kind.dofs() {
                entry.add_torque(engine, dof, torques[offset + dof]);
            }
            offset += entry.kind.dofs();
        }
        Ok(())
    }

    /// Place `body_b` so that a fractional-extent point on `body_a` meets a
    /// fractional-extent point on `body_b`, and return that shared world
    /// point (a natural joint anchor).
    ///
    /// Offsets are unitless in [-1, 1] per axis and scale half the body's
    /// bounding dimensions, in the body's local frame.
    pub fn move_next_to<E: RigidBodyEngine>(
        &self,
        engine: &mut E,
        body_a: &str,
        body_b: &str,
        offset_a: Vector3<f64>,
        offset_b: Vector3<f64>,
    ) -> Result<Point3<f64>> {
        let a = &self.bodies[self.index_of(body_a)?];
        let b = &self.bodies[self.index_of(body_b)?];

        let anchor = Self::world_offset_point(engine, a, offset_a);
        let mut state = engine.body_state(b.id);
        let local = Self::scaled_offset(b, offset_b);
        state.pose.position = anchor - state.pose.rotation * local;
        engine.set_body_state(b.id, state);
        Ok(anchor)
    }

    /// Mass-weighted centroid of every body, from per-shape mass properties.
    #[must_use]
    pub fn center_of_mass<E: RigidBodyEngine>(&self, engine: &E) -> Point3<f64> {
        let mut weighted = Vector3::zeros();
        let mut total = 0.0;
        for body in &self.bodies {
            let mass = body.shape.mass_properties(body.density).mass;
            weighted += engine.body_state(body.id).pose.position.coords * mass;
            total += mass;
        }
        if total > 0.0 {
            Point3::from(weighted / total)
        } else {
            Point3::origin()
        }
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.body_index
            .get(name)
            .copied()
            .ok_or_else(|| SkeletonError::unknown_body(name))
    }

    fn scaled_offset(body: &BodyEntry, offset: Vector3<f64>) -> Vector3<f64> {
        offset.component_mul(&(body.shape.dimensions() / 2.0))
    }

    fn world_offset_point<E: RigidBodyEngine>(
        engine: &E,
        body: &BodyEntry,
        offset: Vector3<f64>,
    ) -> Point3<f64> {
        let pose = engine.body_state(body.id).pose;
        pose.position + pose.rotation * Self::scaled_offset(body, offset)
    }
}
