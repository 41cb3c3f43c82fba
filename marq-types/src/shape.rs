//! Body shapes and their mass formulas.
//!
//! The shape set is closed: every body in a skeleton is a box, sphere,
//! cylinder, or capsule. Each kind carries its own bounding-dimension and
//! mass-tensor computation, so shape-dependent behavior is a `match` rather
//! than open-ended dispatch.

use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors from building a shape out of a textual kind and dimension list.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShapeError {
    /// The kind name matched no known shape.
    #[error("unknown shape kind: {0}")]
    UnknownKind(String),

    /// The dimension list had the wrong length for the kind.
    #[error("shape {kind} expects {expected} dimensions, got {actual}")]
    DimensionCount {
        /// Canonical kind name.
        kind: &'static str,
        /// Number of dimensions the kind requires.
        expected: usize,
        /// Number of dimensions supplied.
        actual: usize,
    },
}

/// Geometry of a rigid segment.
///
/// Cylinders and capsules are aligned with the body-local Z axis; `length`
/// is the full extent of the cylindrical portion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BodyShape {
    /// Rectangular box with full side lengths.
    Box {
        /// Full extent along each local axis.
        lengths: Vector3<f64>,
    },
    /// Sphere.
    Sphere {
        /// Sphere radius.
        radius: f64,
    },
    /// Cylinder aligned with local Z.
    Cylinder {
        /// Cylinder radius.
        radius: f64,
        /// Full length along Z.
        length: f64,
    },
    /// Capsule (cylinder with hemispherical caps) aligned with local Z.
    Capsule {
        /// Capsule radius.
        radius: f64,
        /// Full length of the cylindrical portion.
        length: f64,
    },
}

impl BodyShape {
    /// Build a shape from a kind name and a dimension list.
    ///
    /// Kind names are matched case-insensitively; the documented 3-letter
    /// abbreviations (`box`, `sph`, `cyl`, `cap`) are accepted alongside the
    /// full names. Dimension lists are `[lx, ly, lz]` for boxes, `[r]` for
    /// spheres, and `[r, length]` for cylinders and capsules.
    pub fn from_kind_dims(kind: &str, dims: &[f64]) -> Result<Self, ShapeError> {
        let expect = |kind: &'static str, n: usize| {
            if dims.len() == n {
                Ok(())
            } else {
                Err(ShapeError::DimensionCount {
                    kind,
                    expected: n,
                    actual: dims.len(),
                })
            }
        };
        match kind.to_ascii_lowercase().as_str() {
            "box" => {
                expect("box", 3)?;
                Ok(Self::Box {
                    lengths: Vector3::new(dims[0], dims[1], dims[2]),
                })
            }
            "sph" | "sphere" => {
                expect("sphere", 1)?;
                Ok(Self::Sphere { radius: dims[0] })
            }
            "cyl" | "cylinder" => {
                expect("cylinder", 2)?;
                Ok(Self::Cylinder {
                    radius: dims[0],
                    length: dims[1],
                })
            }
            "cap" | "capsule" => {
                expect("capsule", 2)?;
                Ok(Self::Capsule {
                    radius: dims[0],
                    length: dims[1],
                })
            }
            other => Err(ShapeError::UnknownKind(other.to_owned())),
        }
    }

    /// Canonical name of the shape kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::Capsule { .. } => "capsule",
        }
    }

    /// Bounding dimensions of the shape.
    ///
    /// Marker-attachment offsets are expressed in fractional-extent units,
    /// scaled by half of these dimensions per axis.
    #[must_use]
    pub fn dimensions(&self) -> Vector3<f64> {
        match *self {
            Self::Box { lengths } => lengths,
            Self::Sphere { radius } => {
                let d = 2.0 * radius;
                Vector3::new(d, d, d)
            }
            Self::Cylinder { radius, length } => Vector3::new(radius, radius, length),
            Self::Capsule { radius, length } => {
                let d = 2.0 * radius;
                Vector3::new(d, d, d + length)
            }
        }
    }

    /// Enclosed volume of the shape.
    #[must_use]
    pub fn volume(&self) -> f64 {
        use std::f64::consts::PI;
        match *self {
            Self::Box { lengths } => lengths.x * lengths.y * lengths.z,
            Self::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Self::Cylinder { radius, length } => PI * radius * radius * length,
            Self::Capsule { radius, length } => {
                PI * radius * radius * length + 4.0 / 3.0 * PI * radius.powi(3)
            }
        }
    }

    /// Mass properties of the shape at a uniform density (kg/m^3).
    #[must_use]
    pub fn mass_properties(&self, density: f64) -> MassProperties {
        let mass = density * self.volume();
        let inertia = match *self {
            Self::Box { lengths } => {
                let x2 = lengths.x * lengths.x;
                let y2 = lengths.y * lengths.y;
                let z2 = lengths.z * lengths.z;
                Matrix3::from_diagonal(&Vector3::new(
                    mass * (y2 + z2) / 12.0,
                    mass * (x2 + z2) / 12.0,
                    mass * (x2 + y2) / 12.0,
                ))
            }
            Self::Sphere { radius } => {
                let i = 0.4 * mass * radius * radius;
                Matrix3::from_diagonal(&Vector3::new(i, i, i))
            }
            Self::Cylinder { radius, length } => {
                let r2 = radius * radius;
                let ixx = mass * (3.0 * r2 + length * length) / 12.0;
                Matrix3::from_diagonal(&Vector3::new(ixx, ixx, 0.5 * mass * r2))
            }
            Self::Capsule { radius, length } => {
                use std::f64::consts::PI;
                // Split the mass between the cylindrical portion and the
                // two hemispherical caps (together one sphere).
                let r2 = radius * radius;
                let m_cyl = density * PI * r2 * length;
                let m_sph = density * 4.0 / 3.0 * PI * radius.powi(3);
                let izz = 0.5 * m_cyl * r2 + 0.4 * m_sph * r2;
                let ixx = m_cyl * (length * length / 12.0 + r2 / 4.0)
                    + m_sph * (0.4 * r2 + length * length / 4.0 + 3.0 / 8.0 * radius * length);
                Matrix3::from_diagonal(&Vector3::new(ixx, ixx, izz))
            }
        };
        MassProperties {
            mass,
            inertia,
            center_of_mass: Vector3::zeros(),
        }
    }
}

/// Mass properties of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass in kg.
    pub mass: f64,
    /// Center of mass offset from body origin in local coordinates.
    pub center_of_mass: Vector3<f64>,
    /// Inertia tensor about the center of mass (kg·m²).
    pub inertia: Matrix3<f64>,
}
