//! Friction surface capability exposed by a physics backend.

use rapier3d::prelude::Real;

/// Write access to the Coulomb coefficients of a collision's contact surface.
pub trait FrictionSurface {
    /// Backend identifier used in diagnostics ("rapier", ...).
    fn backend_name(&self) -> &str;

    /// Whether coefficient updates on `collision` take effect in this backend.
    fn supports_friction_updates(&self, collision: &str) -> bool;

    /// Set the primary and secondary friction directions of `collision`.
    /// Returns false if the collision has no surface to update.
    fn set_friction(&mut self, collision: &str, primary: Real, secondary: Real) -> bool;
}

/// Surface capability resolved once when an estimator is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceSupport {
    Supported,
    Unsupported { backend: String },
}

impl SurfaceSupport {
    pub fn probe<S: FrictionSurface + ?Sized>(surface: &S, collision: &str) -> Self {
        if surface.supports_friction_updates(collision) {
            SurfaceSupport::Supported
        } else {
            SurfaceSupport::Unsupported { backend: surface.backend_name().to_string() }
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, SurfaceSupport::Supported)
    }
}
