//! A recording engine for tests.
//!
//! [`MockEngine`] implements [`RigidBodyEngine`](crate::RigidBodyEngine)
//! with deliberately simple semantics:
//!
//! - Bodies integrate position from linear velocity; orientation is held.
//! - Joint and motor DOFs integrate their angle from the motor's target
//!   velocity whenever the motor is powered (`MaxForce > 0`).
//! - Springs and contacts exert no forces; spring anchors are reported from
//!   the current body poses, so anchor separation is observable.
//! - Feedback torques default to zero and are test-settable.
//!
//! Every mutating call is appended to an event log that tests can query,
//! which is how properties like "no motor was ever enabled" are verified.

use hashbrown::HashMap;
use marq_types::{
    BodyId, BodyShape, ConstraintId, GroupId, JointId, JointKind, JointParam, MotorId, Point3,
    RigidBodyState, Vector3,
};

use crate::RigidBodyEngine;

/// One recorded engine interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    /// A per-DOF joint parameter was written.
    JointParamSet {
        /// Target joint.
        joint: JointId,
        /// DOF index.
        dof: usize,
        /// Which parameter.
        param: JointParam,
        /// New value.
        value: f64,
    },
    /// A per-DOF motor parameter was written.
    MotorParamSet {
        /// Target motor.
        motor: MotorId,
        /// DOF index.
        dof: usize,
        /// Which parameter.
        param: JointParam,
        /// New value.
        value: f64,
    },
    /// A torque was applied directly to a joint DOF.
    JointTorqueAdded {
        /// Target joint.
        joint: JointId,
        /// DOF index.
        dof: usize,
        /// Applied torque.
        torque: f64,
    },
    /// A torque was applied directly to a motor DOF.
    MotorTorqueAdded {
        /// Target motor.
        motor: MotorId,
        /// DOF index.
        dof: usize,
        /// Applied torque.
        torque: f64,
    },
    /// A spring constraint was created.
    SpringCreated(ConstraintId),
    /// A constraint group was emptied.
    GroupCleared(GroupId),
    /// Collision detection ran against the given contact group.
    Collided(GroupId),
    /// The engine stepped.
    Stepped,
}

#[derive(Debug, Clone)]
struct MockBody {
    name: String,
    shape: BodyShape,
    state: RigidBodyState,
    kinematic: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct DofState {
    lo_stop: f64,
    hi_stop: f64,
    velocity: f64,
    max_force: f64,
    cfm: f64,
    angle: f64,
    feedback_torque: f64,
}

impl DofState {
    fn get(&self, param: JointParam) -> f64 {
        match param {
            JointParam::LoStop => self.lo_stop,
            JointParam::HiStop => self.hi_stop,
            JointParam::Velocity => self.velocity,
            JointParam::MaxForce => self.max_force,
            JointParam::Cfm => self.cfm,
        }
    }

    fn set(&mut self, param: JointParam, value: f64) {
        match param {
            JointParam::LoStop => self.lo_stop = value,
            JointParam::HiStop => self.hi_stop = value,
            JointParam::Velocity => self.velocity = value,
            JointParam::MaxForce => self.max_force = value,
            JointParam::Cfm => self.cfm = value,
        }
    }
}

fn new_dofs(n: usize) -> Vec<DofState> {
    vec![
        DofState {
            lo_stop: f64::NEG_INFINITY,
            hi_stop: f64::INFINITY,
            ..DofState::default()
        };
        n
    ]
}

#[derive(Debug, Clone)]
struct MockJoint {
    name: String,
    kind: JointKind,
    dofs: Vec<DofState>,
}

#[derive(Debug, Clone)]
struct MockMotor {
    name: String,
    dofs: Vec<DofState>,
}

/// A spring constraint as recorded by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringRecord {
    /// Owning constraint group.
    pub group: GroupId,
    /// First constrained body (marker proxy side).
    pub body_a: BodyId,
    /// Second constrained body (skeleton side).
    pub body_b: BodyId,
    /// Anchor in `body_a`'s local frame.
    pub anchor_a: Point3<f64>,
    /// Anchor in `body_b`'s local frame.
    pub anchor_b: Point3<f64>,
    /// Compliance.
    pub cfm: f64,
    /// Stiffness.
    pub erp: f64,
}

/// Recording engine with kinematic stepping. See the module docs.
#[derive(Debug, Clone)]
pub struct MockEngine {
    dt: f64,
    bodies: HashMap<BodyId, MockBody>,
    joints: HashMap<JointId, MockJoint>,
    motors: HashMap<MotorId, MockMotor>,
    groups: HashMap<GroupId, Vec<ConstraintId>>,
    springs: HashMap<ConstraintId, SpringRecord>,
    events: Vec<MockEvent>,
    next_id: u64,
}

impl MockEngine {
    /// Create a mock engine with the given timestep.
    #[must_use]
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            bodies: HashMap::new(),
            joints: HashMap::new(),
            motors: HashMap::new(),
            groups: HashMap::new(),
            springs: HashMap::new(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Every event recorded so far, in order.
    #[must_use]
    pub fn events(&self) -> &[MockEvent] {
        &self.events
    }

    /// Number of writes of the given parameter, across joints and motors.
    #[must_use]
    pub fn param_writes(&self, param: JointParam) -> usize {
        self.events
            .iter()
            .filter(|event| match event {
                MockEvent::JointParamSet { param: p, .. }
                | MockEvent::MotorParamSet { param: p, .. } => *p == param,
                _ => false,
            })
            .count()
    }

    /// Springs currently alive, in creation order.
    #[must_use]
    pub fn live_springs(&self) -> Vec<(ConstraintId, &SpringRecord)> {
        let mut springs: Vec<_> = self.springs.iter().map(|(id, s)| (*id, s)).collect();
        springs.sort_by_key(|(id, _)| *id);
        springs
    }

    /// Number of springs currently alive.
    #[must_use]
    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    /// Override the angle of one joint DOF (test setup).
    pub fn set_joint_angle(&mut self, joint: JointId, dof: usize, angle: f64) {
        if let Some(j) = self.joints.get_mut(&joint) {
            j.dofs[dof].angle = angle;
        }
    }

    /// Override the feedback torque of one joint DOF (test setup).
    pub fn set_joint_feedback_torque(&mut self, joint: JointId, dof: usize, torque: f64) {
        if let Some(j) = self.joints.get_mut(&joint) {
            j.dofs[dof].feedback_torque = torque;
        }
    }

    /// Override the feedback torque of one motor DOF (test setup).
    pub fn set_motor_feedback_torque(&mut self, motor: MotorId, dof: usize, torque: f64) {
        if let Some(m) = self.motors.get_mut(&motor) {
            m.dofs[dof].feedback_torque = torque;
        }
    }

    /// The kind a joint was created with.
    #[must_use]
    pub fn joint_kind(&self, joint: JointId) -> JointKind {
        self.joints[&joint].kind
    }

    /// Whether the body was marked kinematic.
    #[must_use]
    pub fn is_kinematic(&self, body: BodyId) -> bool {
        self.body(body).kinematic
    }

    /// The shape a body was created with.
    #[must_use]
    pub fn body_shape(&self, body: BodyId) -> BodyShape {
        self.body(body).shape
    }

    /// Look up a body id by name (test convenience).
    #[must_use]
    pub fn body_by_name(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .find(|(_, b)| b.name == name)
            .map(|(id, _)| *id)
    }

    /// Look up a joint id by name (test convenience).
    #[must_use]
    pub fn joint_by_name(&self, name: &str) -> Option<JointId> {
        self.joints
            .iter()
            .find(|(_, j)| j.name == name)
            .map(|(id, _)| *id)
    }

    /// Look up a motor id by name (test convenience).
    #[must_use]
    pub fn motor_by_name(&self, name: &str) -> Option<MotorId> {
        self.motors
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| *id)
    }

    fn body(&self, id: BodyId) -> &MockBody {
        &self.bodies[&id]
    }
}

impl RigidBodyEngine for MockEngine {
    fn timestep(&self) -> f64 {
        self.dt
    }

    fn create_body(&mut self, name: &str, shape: &BodyShape, _density: f64) -> BodyId {
        let id = BodyId::new(self.next_id());
        self.bodies.insert(
            id,
            MockBody {
                name: name.to_owned(),
                shape: *shape,
                state: RigidBodyState::default(),
                kinematic: false,
            },
        );
        id
    }

    fn set_kinematic(&mut self, body: BodyId, kinematic: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.kinematic = kinematic;
        }
    }

    fn body_state(&self, body: BodyId) -> RigidBodyState {
        self.body(body).state
    }

    fn set_body_state(&mut self, body: BodyId, state: RigidBodyState) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.state = state;
        }
    }

    fn create_joint(
        &mut self,
        name: &str,
        kind: JointKind,
        _parent: BodyId,
        _child: Option<BodyId>,
        _anchor: Point3<f64>,
    ) -> JointId {
        let id = JointId::new(self.next_id());
        self.joints.insert(
            id,
            MockJoint {
                name: name.to_owned(),
                kind,
                dofs: new_dofs(kind.dofs()),
            },
        );
        id
    }

    fn set_joint_axis(&mut self, _joint: JointId, _dof: usize, _axis: Vector3<f64>) {}

    fn create_angular_motor(
        &mut self,
        name: &str,
        _parent: BodyId,
        _child: Option<BodyId>,
        dofs: usize,
        _euler: bool,
    ) -> MotorId {
        let id = MotorId::new(self.next_id());
        self.motors.insert(
            id,
            MockMotor {
                name: name.to_owned(),
                dofs: new_dofs(dofs),
            },
        );
        id
    }

    fn set_motor_axis(&mut self, _motor: MotorId, _dof: usize, _axis: Vector3<f64>) {}

    fn set_joint_param(&mut self, joint: JointId, dof: usize, param: JointParam, value: f64) {
        if let Some(j) = self.joints.get_mut(&joint) {
            j.dofs[dof].set(param, value);
            self.events.push(MockEvent::JointParamSet {
                joint,
                dof,
                param,
                value,
            });
        }
    }

    fn joint_param(&self, joint: JointId, dof: usize, param: JointParam) -> f64 {
        self.joints[&joint].dofs[dof].get(param)
    }

    fn set_motor_param(&mut self, motor: MotorId, dof: usize, param: JointParam, value: f64) {
        if let Some(m) = self.motors.get_mut(&motor) {
            m.dofs[dof].set(param, value);
            self.events.push(MockEvent::MotorParamSet {
                motor,
                dof,
                param,
                value,
            });
        }
    }

    fn motor_param(&self, motor: MotorId, dof: usize, param: JointParam) -> f64 {
        self.motors[&motor].dofs[dof].get(param)
    }

    fn joint_angle(&self, joint: JointId, dof: usize) -> f64 {
        self.joints[&joint].dofs[dof].angle
    }

    fn motor_angle(&self, motor: MotorId, dof: usize) -> f64 {
        self.motors[&motor].dofs[dof].angle
    }

    fn joint_feedback_torque(&self, joint: JointId, dof: usize) -> f64 {
        self.joints[&joint].dofs[dof].feedback_torque
    }

    fn motor_feedback_torque(&self, motor: MotorId, dof: usize) -> f64 {
        self.motors[&motor].dofs[dof].feedback_torque
    }

    fn add_joint_torque(&mut self, joint: JointId, dof: usize, torque: f64) {
        self.events.push(MockEvent::JointTorqueAdded { joint, dof, torque });
    }

    fn add_motor_torque(&mut self, motor: MotorId, dof: usize, torque: f64) {
        self.events.push(MockEvent::MotorTorqueAdded { motor, dof, torque });
    }

    fn create_group(&mut self) -> GroupId {
        let id = GroupId::new(self.next_id());
        self.groups.insert(id, Vec::new());
        id
    }

    fn clear_group(&mut self, group: GroupId) {
        if let Some(members) = self.groups.get_mut(&group) {
            for id in members.drain(..) {
                self.springs.remove(&id);
            }
        }
        self.events.push(MockEvent::GroupCleared(group));
    }

    fn create_spring(
        &mut self,
        group: GroupId,
        body_a: BodyId,
        body_b: BodyId,
        anchor_a: Point3<f64>,
        anchor_b: Point3<f64>,
        cfm: f64,
        erp: f64,
    ) -> ConstraintId {
        let id = ConstraintId::new(self.next_id());
        self.springs.insert(
            id,
            SpringRecord {
                group,
                body_a,
                body_b,
                anchor_a,
                anchor_b,
                cfm,
                erp,
            },
        );
        if let Some(members) = self.groups.get_mut(&group) {
            members.push(id);
        }
        self.events.push(MockEvent::SpringCreated(id));
        id
    }

    fn spring_anchors(&self, spring: ConstraintId) -> (Point3<f64>, Point3<f64>) {
        let record = &self.springs[&spring];
        let a = self.body(record.body_a).state.pose;
        let b = self.body(record.body_b).state.pose;
        (
            a.transform_point(&record.anchor_a),
            b.transform_point(&record.anchor_b),
        )
    }

    fn collide(&mut self, contacts: GroupId) {
        self.events.push(MockEvent::Collided(contacts));
    }

    fn step(&mut self, dt: f64) {
        for body in self.bodies.values_mut() {
            body.state.pose.position += body.state.twist.linear * dt;
        }
        for joint in self.joints.values_mut() {
            for dof in &mut joint.dofs {
                if dof.max_force > 0.0 {
                    dof.angle += dof.velocity * dt;
                }
            }
        }
        for motor in self.motors.values_mut() {
            for dof in &mut motor.dofs {
                if dof.max_force > 0.0 {
                    dof.angle += dof.velocity * dt;
                }
            }
        }
        self.events.push(MockEvent::Stepped);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marq_types::{Pose, Twist};

    const DT: f64 = 1.0 / 60.0;

    fn sphere() -> BodyShape {
        BodyShape::Sphere { radius: 0.02 }
    }

    #[test]
    fn test_step_integrates_linear_velocity() {
        let mut engine = MockEngine::new(DT);
        let body = engine.create_body("b", &sphere(), 1000.0);
        engine.set_body_state(
            body,
            RigidBodyState::new(Pose::identity(), Twist::linear(Vector3::new(0.0, 0.0, 6.0))),
        );

        engine.step(DT);

        assert_relative_eq!(engine.body_state(body).pose.position.z, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_powered_joint_tracks_velocity_target() {
        let mut engine = MockEngine::new(DT);
        let a = engine.create_body("a", &sphere(), 1000.0);
        let b = engine.create_body("b", &sphere(), 1000.0);
        let joint = engine.create_joint("j", JointKind::Hinge, a, Some(b), Point3::origin());

        // Unpowered: angle holds
        engine.set_joint_param(joint, 0, JointParam::Velocity, 2.0);
        engine.step(DT);
        assert_relative_eq!(engine.joint_angle(joint, 0), 0.0, epsilon = 1e-12);

        // Powered: angle integrates
        engine.set_joint_param(joint, 0, JointParam::MaxForce, 10.0);
        engine.step(DT);
        assert_relative_eq!(engine.joint_angle(joint, 0), 2.0 * DT, epsilon = 1e-12);
    }

    #[test]
    fn test_group_clear_destroys_springs() {
        let mut engine = MockEngine::new(DT);
        let a = engine.create_body("a", &sphere(), 1000.0);
        let b = engine.create_body("b", &sphere(), 1000.0);
        let group = engine.create_group();

        engine.create_spring(
            group,
            a,
            b,
            Point3::origin(),
            Point3::new(0.1, 0.0, 0.0),
            1e-4,
            0.3,
        );
        assert_eq!(engine.spring_count(), 1);

        engine.clear_group(group);
        assert_eq!(engine.spring_count(), 0);

        // Clearing an empty group is a no-op
        engine.clear_group(group);
        assert_eq!(engine.spring_count(), 0);
    }

    #[test]
    fn test_spring_anchors_follow_bodies() {
        let mut engine = MockEngine::new(DT);
        let a = engine.create_body("a", &sphere(), 1000.0);
        let b = engine.create_body("b", &sphere(), 1000.0);
        engine.set_body_state(
            b,
            RigidBodyState::at_rest(Pose::from_position(Point3::new(1.0, 0.0, 0.0))),
        );
        let group = engine.create_group();
        let spring = engine.create_spring(
            group,
            a,
            b,
            Point3::origin(),
            Point3::new(0.0, 0.5, 0.0),
            1e-4,
            0.3,
        );

        let (anchor_a, anchor_b) = engine.spring_anchors(spring);
        assert_relative_eq!(anchor_a.coords, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(anchor_b.coords, Vector3::new(1.0, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_param_write_counting() {
        let mut engine = MockEngine::new(DT);
        let a = engine.create_body("a", &sphere(), 1000.0);
        let joint = engine.create_joint("j", JointKind::Hinge, a, None, Point3::origin());

        engine.set_joint_param(joint, 0, JointParam::MaxForce, 5.0);
        engine.set_joint_param(joint, 0, JointParam::Velocity, 1.0);

        assert_eq!(engine.param_writes(JointParam::MaxForce), 1);
        assert_eq!(engine.param_writes(JointParam::Velocity), 1);
        assert_eq!(engine.param_writes(JointParam::Cfm), 0);
    }
}
