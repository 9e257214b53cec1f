//! Error types for the slip-friction pipeline.
//!
//! None of these abort a tick: invalid contact records are skipped and
//! out-of-range parameters are replaced, the caller only logs them.

use rapier3d::prelude::Real;
use thiserror::Error;

/// A contact pair that cannot contribute to the friction estimate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContactError {
    /// Empty record, or position/normal/wrench lists of different lengths.
    #[error(
        "no contacts or invalid contact message between [{collision1}] and [{collision2}] \
         (positions: {positions}, normals: {normals}, wrenches: {wrenches})"
    )]
    InvalidContactRecord {
        collision1: String,
        collision2: String,
        positions: usize,
        normals: usize,
        wrenches: usize,
    },

    /// The record names a collision the physics world does not know.
    #[error("unknown collision [{0}] in contact message")]
    UnknownCollision(String),
}

/// A friction parameter outside its valid range, and the value used instead.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigOutOfRange {
    #[error("slip_static parameter value [{value}] must be positive, using default value [{using}]")]
    SlipStatic { value: Real, using: Real },

    #[error(
        "slip_dynamic parameter value [{value}] must be greater than slip_static [{slip_static}], \
         using slip_static + 0.1 [{using}]"
    )]
    SlipDynamic {
        value: Real,
        slip_static: Real,
        using: Real,
    },

    #[error("speed_static parameter value [{value}] must be positive, using default value [{using}]")]
    SpeedStatic { value: Real, using: Real },
}
