//! Slip-dependent tire friction estimation for a rapier3d world.

pub mod slip_friction;
pub mod mailbox;
pub mod transport;
pub mod surface;
pub mod estimator;
pub mod physics;
pub mod config;
pub mod net;

pub use estimator::{FrictionEstimator, TickOutcome};
pub use mailbox::ContactMailbox;
pub use transport::ContactTransport;
