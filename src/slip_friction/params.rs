// ==============================================================================
// params.rs — FRICTION CURVE PARAMETERS
// ------------------------------------------------------------------------------
// Five scalars shape the slip curve (see curve.rs):
// - friction_static:  peak coefficient, reached at slip_static
// - friction_dynamic: sliding coefficient, held from slip_dynamic on
// - slip_static:      slip ratio of the peak (> 0)
// - slip_dynamic:     slip ratio where sliding starts (> slip_static)
// - speed_static:     reference speed below which slip is not trusted (> 0)
//
// Raw values come from configuration as optional fields (FrictionSettings).
// from_settings() validates them in order: slip_static, slip_dynamic (against
// the validated slip_static), speed_static. Out-of-range values are replaced,
// never rejected, and each replacement is logged and returned.
// ==============================================================================

use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::slip_friction::error::ConfigOutOfRange;

pub const DEFAULT_FRICTION_STATIC: Real = 1.1;
pub const DEFAULT_FRICTION_DYNAMIC: Real = 1.0;
pub const DEFAULT_SLIP_STATIC: Real = 0.1;
pub const DEFAULT_SLIP_DYNAMIC: Real = 0.2;
pub const DEFAULT_SPEED_STATIC: Real = 1.0;

/// Gap inserted above slip_static when slip_dynamic is not larger than it.
const SLIP_DYNAMIC_MARGIN: Real = 0.1;

/// Unvalidated friction parameters as they appear in a config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionSettings {
    pub friction_static: Option<Real>,
    pub friction_dynamic: Option<Real>,
    pub slip_static: Option<Real>,
    pub slip_dynamic: Option<Real>,
    pub speed_static: Option<Real>,
}

/// Validated friction parameters. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionParameters {
    friction_static: Real,
    friction_dynamic: Real,
    slip_static: Real,
    slip_dynamic: Real,
    speed_static: Real,
}

impl Default for FrictionParameters {
    fn default() -> Self {
        Self {
            friction_static: DEFAULT_FRICTION_STATIC,
            friction_dynamic: DEFAULT_FRICTION_DYNAMIC,
            slip_static: DEFAULT_SLIP_STATIC,
            slip_dynamic: DEFAULT_SLIP_DYNAMIC,
            speed_static: DEFAULT_SPEED_STATIC,
        }
    }
}

impl FrictionParameters {
    /// Validate raw settings, substituting defaults for out-of-range values.
    ///
    /// Friction coefficients are taken as given. Every substitution is logged
    /// with `warn!` and returned alongside the parameters.
    pub fn from_settings(settings: &FrictionSettings) -> (Self, Vec<ConfigOutOfRange>) {
        let mut params = Self::default();
        let mut warnings = Vec::new();

        if let Some(mu) = settings.friction_static {
            params.friction_static = mu;
        }
        if let Some(mu) = settings.friction_dynamic {
            params.friction_dynamic = mu;
        }

        if let Some(value) = settings.slip_static {
            if value <= 0.0 {
                warnings.push(ConfigOutOfRange::SlipStatic { value, using: params.slip_static });
            } else {
                params.slip_static = value;
            }
        }

        // Checked even when slip_dynamic is absent: a large slip_static can
        // push the default slip_dynamic out of order.
        if let Some(value) = settings.slip_dynamic {
            params.slip_dynamic = value;
        }
        if params.slip_dynamic <= params.slip_static {
            let using = params.slip_static + SLIP_DYNAMIC_MARGIN;
            warnings.push(ConfigOutOfRange::SlipDynamic {
                value: params.slip_dynamic,
                slip_static: params.slip_static,
                using,
            });
            params.slip_dynamic = using;
        }

        if let Some(value) = settings.speed_static {
            if value <= 0.0 {
                warnings.push(ConfigOutOfRange::SpeedStatic { value, using: params.speed_static });
            } else {
                params.speed_static = value;
            }
        }

        for w in &warnings {
            warn!("{w}");
        }

        (params, warnings)
    }

    #[inline] pub fn friction_static(&self) -> Real { self.friction_static }
    #[inline] pub fn friction_dynamic(&self) -> Real { self.friction_dynamic }
    #[inline] pub fn slip_static(&self) -> Real { self.slip_static }
    #[inline] pub fn slip_dynamic(&self) -> Real { self.slip_dynamic }
    #[inline] pub fn speed_static(&self) -> Real { self.speed_static }
}
