//! slip_friction - engine-agnostic tire friction estimation (pure types + solver)

pub mod types;
pub mod error;
pub mod params;
pub mod curve;
pub mod kinematics;
pub mod aggregate;

pub use types::*;
pub use error::{ConfigOutOfRange, ContactError};
pub use params::{FrictionParameters, FrictionSettings};
pub use curve::compute_friction;
pub use kinematics::{ContactWorld, LinkKinematics, LinkState};
pub use aggregate::{BatchEstimate, estimate_batch_friction};
