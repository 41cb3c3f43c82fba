//! Per-frame spring attachments between marker proxies and skeleton bodies.

use std::io::BufRead;

use marq_engine::RigidBodyEngine;
use marq_skeleton::Skeleton;
use marq_types::{
    BodyId, BodyShape, ConstraintId, GroupId, Point3, Pose, RigidBodyState, Twist, Vector3,
};

use crate::error::Result;
use crate::track::MarkerTrack;

/// Default spring compliance.
pub const DEFAULT_CFM: f64 = 1e-4;
/// Default spring stiffness.
pub const DEFAULT_ERP: f64 = 0.3;
/// Visual/collision radius of a marker proxy body.
pub const PROXY_RADIUS: f64 = 0.02;

#[derive(Debug, Clone, Copy)]
struct AttachTarget {
    body: BodyId,
    /// Body-local anchor, already scaled by the body's half-extents.
    offset: Vector3<f64>,
    root: bool,
}

/// Owns the marker proxies and the per-frame spring-constraint lifecycle.
///
/// One kinematic sphere proxy body exists per marker channel for the life of
/// the manager. Springs, in contrast, live for exactly one frame: every
/// frame [`detach`](Self::detach) destroys the previous frame's set before
/// [`attach`](Self::attach) creates the next, so two frames' constraints
/// never coexist.
#[derive(Debug)]
pub struct AttachmentManager {
    track: MarkerTrack,
    group: GroupId,
    proxies: Vec<BodyId>,
    targets: Vec<Option<AttachTarget>>,
    springs: Vec<ConstraintId>,
    cfm: f64,
    erp: f64,
    root_attachment_factor: f64,
}

impl AttachmentManager {
    /// Create one kinematic sphere proxy per channel of `track`.
    pub fn new<E: RigidBodyEngine>(engine: &mut E, track: MarkerTrack) -> Self {
        let shape = BodyShape::Sphere {
            radius: PROXY_RADIUS,
        };
        let proxies: Vec<BodyId> = track
            .labels()
            .map(|label| {
                let id = engine.create_body(&format!("marker:{label}"), &shape, 0.0);
                engine.set_kinematic(id, true);
                id
            })
            .collect();
        let group = engine.create_group();
        let targets = vec![None; proxies.len()];
        Self {
            track,
            group,
            proxies,
            targets,
            springs: Vec::new(),
            cfm: DEFAULT_CFM,
            erp: DEFAULT_ERP,
            root_attachment_factor: 1.0,
        }
    }

    /// Override the base spring compliance.
    #[must_use]
    pub const fn with_compliance(mut self, cfm: f64) -> Self {
        self.cfm = cfm;
        self
    }

    /// Override the spring stiffness.
    #[must_use]
    pub const fn with_stiffness(mut self, erp: f64) -> Self {
        self.erp = erp;
        self
    }

    /// Stiffen root-body attachments by this factor (divides the compliance).
    #[must_use]
    pub const fn with_root_attachment_factor(mut self, factor: f64) -> Self {
        self.root_attachment_factor = factor;
        self
    }

    /// The marker track driving these attachments.
    #[must_use]
    pub const fn track(&self) -> &MarkerTrack {
        &self.track
    }

    /// Number of currently live springs.
    #[must_use]
    pub fn num_attachments(&self) -> usize {
        self.springs.len()
    }

    /// Parse attachment configuration from line-oriented text.
    ///
    /// Each line, after stripping `#` comments, reads
    /// `marker-label body-name ox oy oz`, with the offsets in fractional
    /// extents of the target body (-1..1 per axis). Lines naming unknown
    /// markers or bodies, or with unparseable offsets, are logged and
    /// skipped; only I/O failures abort the load.
    pub fn load_attachments<R: BufRead>(&mut self, reader: R, skeleton: &Skeleton) -> Result<()> {
        self.targets = vec![None; self.proxies.len()];
        let mut resolved = 0usize;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = index + 1;
            let text = line.split('#').next().unwrap_or("");
            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            let [label, body, offsets @ ..] = tokens.as_slice() else {
                continue;
            };
            let Some(channel) = self.track.index_of(label) else {
                tracing::warn!(line = line_no, label, "unknown marker, skipping");
                continue;
            };
            let Some(id) = skeleton.body_id(body) else {
                tracing::warn!(line = line_no, body, "unknown skeleton body, skipping");
                continue;
            };
            let parsed: std::result::Result<Vec<f64>, _> =
                offsets.iter().map(|t| t.parse::<f64>()).collect();
            let offset = match parsed.as_deref() {
                Ok([ox, oy, oz]) => Vector3::new(*ox, *oy, *oz),
                _ => {
                    tracing::warn!(line = line_no, "malformed offsets, skipping");
                    continue;
                }
            };
            // Fractional extents to body-local meters.
            let dimensions = skeleton.body_dimensions(body).unwrap_or_default();
            self.targets[channel] = Some(AttachTarget {
                body: id,
                offset: offset.component_mul(&(dimensions / 2.0)),
                root: skeleton.is_root(body),
            });
            resolved += 1;
        }
        tracing::info!(resolved, channels = self.proxies.len(), "attachments loaded");
        Ok(())
    }

    /// Destroy every live spring. A no-op when none exist.
    pub fn detach<E: RigidBodyEngine>(&mut self, engine: &mut E) {
        engine.clear_group(self.group);
        self.springs.clear();
    }

    /// Create springs for every resolved, non-dropout channel at `frame_no`.
    ///
    /// Root-body attachments get compliance `cfm / root_attachment_factor`;
    /// all others use the base compliance.
    ///
    /// # Panics
    ///
    /// Panics if `frame_no` is outside the loaded marker data.
    pub fn attach<E: RigidBodyEngine>(&mut self, engine: &mut E, frame_no: usize) {
        for (channel, target) in self.targets.iter().enumerate() {
            let Some(target) = target else { continue };
            if self.track.sample(frame_no, channel).is_dropout() {
                continue;
            }
            let factor = if target.root {
                self.root_attachment_factor
            } else {
                1.0
            };
            let spring = engine.create_spring(
                self.group,
                self.proxies[channel],
                target.body,
                Point3::origin(),
                Point3::origin() + target.offset,
                self.cfm / factor,
                self.erp,
            );
            self.springs.push(spring);
        }
    }

    /// Move every proxy to its recorded position for `frame_no`.
    ///
    /// Linear velocity comes from the centered finite difference over the
    /// two neighboring frames, but only when both neighbors exist and
    /// neither is a dropout for that marker; otherwise it is zero. The
    /// first and last frame therefore always get zero velocity.
    ///
    /// # Panics
    ///
    /// Panics if `frame_no` is outside the loaded marker data.
    pub fn reposition<E: RigidBodyEngine>(&mut self, engine: &mut E, frame_no: usize) {
        let interior = frame_no > 0 && frame_no + 1 < self.track.num_frames();
        for (channel, &proxy) in self.proxies.iter().enumerate() {
            let sample = self.track.sample(frame_no, channel);
            let velocity = if interior {
                let prev = self.track.sample(frame_no - 1, channel);
                let next = self.track.sample(frame_no + 1, channel);
                if prev.is_dropout() || next.is_dropout() {
                    Vector3::zeros()
                } else {
                    (next.position - prev.position) / (2.0 * self.track.dt())
                }
            } else {
                Vector3::zeros()
            };
            engine.set_body_state(
                proxy,
                RigidBodyState::new(
                    Pose::from_position(sample.position),
                    Twist::linear(velocity),
                ),
            );
        }
    }

    /// Root-mean-square distance between the two anchors of every live
    /// spring, as reported by the engine. Zero when nothing is attached.
    #[must_use]
    pub fn rms_distance<E: RigidBodyEngine>(&self, engine: &E) -> f64 {
        if self.springs.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .springs
            .iter()
            .map(|&spring| {
                let (a, b) = engine.spring_anchors(spring);
                (a - b).norm_squared()
            })
            .sum();
        (sum / self.springs.len() as f64).sqrt()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marq_engine::mock::MockEngine;
    use marq_skeleton::{BodySpec, SkeletonBuilder};

    use crate::track::{load_csv, LinearUnit, MarkerTrack};

    const DT: f64 = 1.0 / 60.0;

    // Three frames, two channels. m1 drops out at frame 1.
    const CSV: &str = "\
m0, m1
0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0
0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 2.0, -1.0
0.0, 0.0, 2.0, 0.0, 1.0, 1.0, 3.0, 0.0
";

    const ATTACH: &str = "\
# marker  body   ox oy oz
m0 torso 0.0 0.0 1.0
m1 torso 0.0 0.0 0.0
ghost torso 0.0 0.0 0.0   # unknown marker: skipped
m1 missing 0.0 0.0 0.0    # unknown body: overwritten above, skipped here
";

    fn track() -> MarkerTrack {
        let data = load_csv(CSV.as_bytes(), 60.0, LinearUnit::Meters).unwrap();
        MarkerTrack::from_data(data, DT, None).unwrap()
    }

    fn torso(engine: &mut MockEngine) -> Skeleton {
        SkeletonBuilder::new()
            .body(
                BodySpec::new(
                    "torso",
                    BodyShape::Box {
                        lengths: Vector3::new(0.2, 0.2, 0.4),
                    },
                )
                .with_root(),
            )
            .build(engine)
            .unwrap()
    }

    fn manager(engine: &mut MockEngine, skeleton: &Skeleton) -> AttachmentManager {
        let mut manager = AttachmentManager::new(engine, track());
        manager
            .load_attachments(ATTACH.as_bytes(), skeleton)
            .unwrap();
        manager
    }

    #[test]
    fn test_proxies_are_kinematic_spheres() {
        let mut engine = MockEngine::new(DT);
        let _manager = AttachmentManager::new(&mut engine, track());
        let proxy = engine.body_by_name("marker:m0").unwrap();
        assert!(engine.is_kinematic(proxy));
        assert_eq!(
            engine.body_shape(proxy),
            BodyShape::Sphere {
                radius: PROXY_RADIUS
            }
        );
    }

    #[test]
    fn test_attach_detach_determinism() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton);

        manager.attach(&mut engine, 0);
        assert_eq!(manager.num_attachments(), 2);
        let first: Vec<_> = engine
            .live_springs()
            .iter()
            .map(|(_, s)| (*s).clone())
            .collect();

        manager.detach(&mut engine);
        assert_eq!(manager.num_attachments(), 0);
        assert_eq!(engine.spring_count(), 0);

        // Detach with nothing attached is a no-op.
        manager.detach(&mut engine);

        manager.attach(&mut engine, 0);
        let second: Vec<_> = engine
            .live_springs()
            .iter()
            .map(|(_, s)| (*s).clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_attach_skips_dropouts() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton);

        // m1 is a dropout at frame 1, so only m0 attaches.
        manager.attach(&mut engine, 1);
        assert_eq!(manager.num_attachments(), 1);
    }

    #[test]
    fn test_attachment_offset_scaled_by_half_extents() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton);

        manager.attach(&mut engine, 0);
        // m0's offset is (0, 0, 1) in fractional extents of a 0.4-tall box.
        let springs = engine.live_springs();
        let (_, record) = springs[0];
        assert_relative_eq!(
            record.anchor_b.coords,
            Vector3::new(0.0, 0.0, 0.2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_root_stiffening_divides_compliance() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton).with_root_attachment_factor(10.0);

        manager.attach(&mut engine, 0);
        let springs = engine.live_springs();
        for (_, record) in springs {
            assert_relative_eq!(record.cfm, DEFAULT_CFM / 10.0, epsilon = 1e-18);
            assert_relative_eq!(record.erp, DEFAULT_ERP, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_root_stiffening_spares_non_root_bodies() {
        let mut engine = MockEngine::new(DT);
        let skeleton = SkeletonBuilder::new()
            .body(
                BodySpec::new(
                    "pelvis",
                    BodyShape::Box {
                        lengths: Vector3::new(0.2, 0.2, 0.4),
                    },
                )
                .with_root(),
            )
            .body(BodySpec::new(
                "thigh",
                BodyShape::Box {
                    lengths: Vector3::new(0.1, 0.1, 0.4),
                },
            ))
            .build(&mut engine)
            .unwrap();
        let mut manager =
            AttachmentManager::new(&mut engine, track()).with_root_attachment_factor(4.0);
        manager
            .load_attachments("m0 pelvis 0 0 0\nm1 thigh 0 0 0\n".as_bytes(), &skeleton)
            .unwrap();

        manager.attach(&mut engine, 0);
        assert_eq!(manager.num_attachments(), 2);

        // Only the root-body spring is stiffened.
        let pelvis = skeleton.body_id("pelvis").unwrap();
        let thigh = skeleton.body_id("thigh").unwrap();
        for (_, record) in engine.live_springs() {
            let expected = if record.body_b == pelvis {
                DEFAULT_CFM / 4.0
            } else {
                assert_eq!(record.body_b, thigh);
                DEFAULT_CFM
            };
            assert_relative_eq!(record.cfm, expected, epsilon = 1e-18);
        }
    }

    #[test]
    #[should_panic]
    fn test_attach_out_of_range_frame_panics() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton);
        manager.attach(&mut engine, 99);
    }

    #[test]
    #[should_panic]
    fn test_reposition_out_of_range_frame_panics() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton);
        manager.reposition(&mut engine, 99);
    }

    #[test]
    fn test_reposition_centered_difference() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton);

        manager.reposition(&mut engine, 1);
        let proxy = engine.body_by_name("marker:m0").unwrap();
        let state = engine.body_state(proxy);
        assert_relative_eq!(state.pose.position.z, 1.0, epsilon = 1e-12);
        // (2 - 0) / (2 dt) = 1 / dt
        assert_relative_eq!(state.twist.linear.z, 1.0 / DT, epsilon = 1e-9);
    }

    #[test]
    fn test_reposition_boundary_frames_zero_velocity() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton);

        // m1 drops out at frame 1, but the dropout only governs attachment;
        // its neighbors (frames 0 and 2) are valid, so reposition still
        // estimates a velocity at the interior frame.
        manager.reposition(&mut engine, 1);
        let m1 = engine.body_by_name("marker:m1").unwrap();
        let state = engine.body_state(m1);
        assert_relative_eq!(state.twist.linear.z, (3.0 - 1.0) / (2.0 * DT), epsilon = 1e-9);

        // Boundary frames always get zero velocity.
        for frame in [0, 2] {
            manager.reposition(&mut engine, frame);
            let state = engine.body_state(m1);
            assert_relative_eq!(state.twist.linear.norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dropout_neighbor_rule() {
        // A four-frame track where m0 drops out at frame 2: frame 1 and
        // frame 3 both lose their velocity estimate.
        let csv = "\
m0
0.0, 0.0, 0.0, 0.0
0.0, 0.0, 1.0, 0.0
0.0, 0.0, 2.0, -1.0
0.0, 0.0, 3.0, 0.0
";
        let data = load_csv(csv.as_bytes(), 60.0, LinearUnit::Meters).unwrap();
        let track = MarkerTrack::from_data(data, DT, None).unwrap();

        let mut engine = MockEngine::new(DT);
        let mut manager = AttachmentManager::new(&mut engine, track);
        let proxy = engine.body_by_name("marker:m0").unwrap();

        manager.reposition(&mut engine, 1);
        assert_relative_eq!(
            engine.body_state(proxy).twist.linear.norm(),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rms_distance() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = manager(&mut engine, &skeleton);

        // Nothing attached: zero by definition.
        assert_relative_eq!(manager.rms_distance(&engine), 0.0, epsilon = 1e-12);

        manager.reposition(&mut engine, 0);
        manager.attach(&mut engine, 0);
        // m0 proxy at (0,0,0), torso anchor at (0,0,0.2): distance 0.2.
        // m1 proxy at (1,1,1), torso anchor at (0,0,0): distance sqrt(3).
        let expected = ((0.2f64.powi(2) + 3.0) / 2.0).sqrt();
        assert_relative_eq!(manager.rms_distance(&engine), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_unresolvable_lines_skipped() {
        let mut engine = MockEngine::new(DT);
        let skeleton = torso(&mut engine);
        let mut manager = AttachmentManager::new(&mut engine, track());
        // Every line unresolvable or malformed; the load still succeeds.
        let config = "ghost torso 0 0 0\nm0 nobody 0 0 0\nm0 torso 0 x 0\n";
        manager
            .load_attachments(config.as_bytes(), &skeleton)
            .unwrap();
        manager.attach(&mut engine, 0);
        assert_eq!(manager.num_attachments(), 0);
    }
}
