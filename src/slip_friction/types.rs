//! Core shared types for `slip_friction` (engine-agnostic).
// slip_friction/types.rs
use rapier3d::prelude::{Point, Real, Vector};
use serde::{Deserialize, Serialize};

use crate::slip_friction::error::ContactError;

/// Wire-format vector (messages carry plain arrays, not nalgebra types).
pub type Vec3 = [f32; 3];

#[inline] pub fn to_vector(v: Vec3) -> Vector<Real> { Vector::new(v[0], v[1], v[2]) }
#[inline] pub fn to_point(v: Vec3) -> Point<Real> { Point::new(v[0], v[1], v[2]) }
#[inline] pub fn from_vector(v: Vector<Real>) -> Vec3 { [v.x, v.y, v.z] }
#[inline] pub fn from_point(p: Point<Real>) -> Vec3 { [p.x, p.y, p.z] }

// ============================================
// ----- contact messages ---------------------
// ============================================

/// Force/torque pair acting on one body at a contact point (body frame).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wrench {
    pub force: Vec3,  // N
    pub torque: Vec3, // N*m
}

/// Contact wrenches for both bodies at one contact point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactWrench {
    pub body_1_wrench: Wrench,
    pub body_2_wrench: Wrench,
}

/// One instance of two collisions touching, possibly at several points.
///
/// The three lists are parallel: entry `j` of each describes contact point `j`.
/// They arrive as separate lists on the wire, so their lengths are checked
/// before any point is read (see [`ContactPairRecord::samples`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPairRecord {
    pub collision1: String,
    pub collision2: String,
    #[serde(default)]
    pub positions: Vec<Vec3>,
    #[serde(default)]
    pub normals: Vec<Vec3>,
    #[serde(default)]
    pub wrenches: Vec<ContactWrench>,
}

impl ContactPairRecord {
    pub fn new(collision1: impl Into<String>, collision2: impl Into<String>) -> Self {
        Self {
            collision1: collision1.into(),
            collision2: collision2.into(),
            ..Self::default()
        }
    }

    /// Append one contact point, keeping the three lists aligned.
    pub fn push_point(&mut self, position: Vec3, normal: Vec3, wrench: ContactWrench) {
        self.positions.push(position);
        self.normals.push(normal);
        self.wrenches.push(wrench);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Check the record carries at least one point and that its lists agree.
    pub fn validate(&self) -> Result<(), ContactError> {
        let n = self.positions.len();
        if n == 0 || n != self.normals.len() || n != self.wrenches.len() {
            return Err(ContactError::InvalidContactRecord {
                collision1: self.collision1.clone(),
                collision2: self.collision2.clone(),
                positions: n,
                normals: self.normals.len(),
                wrenches: self.wrenches.len(),
            });
        }
        Ok(())
    }

    /// Validated per-point view of the record.
    pub fn samples(&self) -> Result<Vec<ContactPointSample>, ContactError> {
        self.validate()?;
        Ok(self
            .positions
            .iter()
            .zip(&self.normals)
            .zip(&self.wrenches)
            .map(|((p, n), w)| ContactPointSample {
                position: to_point(*p),
                normal: to_vector(*n),
                wrench: *w,
            })
            .collect())
    }
}

/// All contact pairs reported for one instant. This is the transport unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactBatch {
    /// Simulation time the contacts were captured at (s).
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub contacts: Vec<ContactPairRecord>,
}

// ============================================
// ----- per-tick samples + reductions --------
// ============================================

/// A single contact point in world space, as captured by the engine.
#[derive(Debug, Clone, Copy)]
pub struct ContactPointSample {
    pub position: Point<Real>, // world
    pub normal: Vector<Real>,  // world, unit
    pub wrench: ContactWrench, // body-local
}

/// Force-weighted slip and reference speed for one contact pair or a whole batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlipAggregate {
    pub slip_speed: Real,       // m/s
    pub reference_speed: Real,  // m/s
    pub normal_force_sum: Real, // N
}
