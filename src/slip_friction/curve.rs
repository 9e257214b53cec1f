// ==============================================================================
// curve.rs — SLIP-TO-FRICTION CURVE WITH LOW-SPEED REGULARIZATION
// ==============================================================================
// A piecewise linear stand-in for semi-empirical tire curves (Pacejka and
// friends). With slip_ratio = |slip_speed| / |reference_speed| the curve joins:
//
//     (0, 0) -> (slip_static, mu_static) -> (slip_dynamic, mu_dynamic) -> (inf, mu_dynamic)
//
//   mu
//   |        mu_static
//   |        /\
//   |       /  \________ mu_dynamic
//   |      /
//   |     /
//   |    /
//   |   /
//   +--------|--|---------- slip_ratio
//            |  slip_dynamic
//            slip_static
//
// Speed ranges (speed_ratio = |reference_speed| / |speed_static|):
// - speed_ratio < 0.5        : friction_static, slip is numerically meaningless
// - 0.5 <= speed_ratio < 1.0 : blend term (frictionFromSlip - friction_static)
//                              / 0.5 * (speed_ratio - 0.5)
// - speed_ratio >= 1.0       : curve value
//
// The blend term carries no additive friction_static, so it starts from 0 at
// speed_ratio = 0.5 rather than from friction_static. Kept as is; a true
// interpolation would change the coefficient every slow-rolling wheel sees.
// ==============================================================================

use rapier3d::prelude::Real;

use crate::slip_friction::params::FrictionParameters;

/// Friction coefficient from the slip ratio alone (speed_ratio >= 1).
#[inline]
pub fn friction_from_slip(slip_ratio: Real, params: &FrictionParameters) -> Real {
    let mu_static = params.friction_static().abs();
    let mu_dynamic = params.friction_dynamic().abs();
    let slip_static = params.slip_static();
    let slip_dynamic = params.slip_dynamic();

    if slip_ratio < slip_static {
        slip_ratio * mu_static / slip_static
    } else if slip_ratio < slip_dynamic {
        mu_dynamic + (mu_static - mu_dynamic) / (slip_static - slip_dynamic) * (slip_ratio - slip_dynamic)
    } else {
        mu_dynamic
    }
}

/// Friction coefficient for a contact sliding at `slip_speed` while moving at
/// `reference_speed`.
pub fn compute_friction(slip_speed: Real, reference_speed: Real, params: &FrictionParameters) -> Real {
    let speed_static = params.speed_static().abs();

    // Below half the static speed slip is noise; hold the static coefficient.
    if reference_speed.abs() < 0.5 * speed_static {
        return params.friction_static();
    }

    let slip_ratio = slip_speed.abs() / reference_speed.abs();
    let friction = friction_from_slip(slip_ratio, params);

    let speed_ratio = reference_speed.abs() / speed_static;
    if (0.5..1.0).contains(&speed_ratio) {
        return (friction - params.friction_static()) / 0.5 * (speed_ratio - 0.5);
    }

    friction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slip_friction::params::FrictionSettings;
    use approx::assert_relative_eq;

    fn params() -> FrictionParameters {
        FrictionParameters::default()
    }

    #[test]
    fn low_speed_returns_static_friction() {
        let p = params();
        for slip in [0.0, 0.05, 0.3, 10.0, -4.0] {
            assert_eq!(compute_friction(slip, 0.3, &p), 1.1);
            assert_eq!(compute_friction(slip, -0.49, &p), 1.1);
            assert_eq!(compute_friction(slip, 0.0, &p), 1.1);
        }
    }

    #[test]
    fn low_speed_clamp_returns_signed_static_friction() {
        let (p, _) = FrictionParameters::from_settings(&FrictionSettings {
            friction_static: Some(-0.8),
            ..Default::default()
        });
        assert_eq!(compute_friction(1.0, 0.1, &p), -0.8);
    }

    #[test]
    fn rising_segment() {
        // slip_ratio = 0.025 -> 0.025 * 1.1 / 0.1
        assert_relative_eq!(compute_friction(0.05, 2.0, &params()), 0.275, epsilon = 1e-6);
    }

    #[test]
    fn falling_segment() {
        // slip_ratio = 0.15 -> 1.0 + (0.1 / -0.1) * (-0.05)
        assert_relative_eq!(compute_friction(0.3, 2.0, &params()), 1.05, epsilon = 1e-6);
        assert_relative_eq!(compute_friction(0.15, 1.0, &params()), 1.05, epsilon = 1e-6);
    }

    #[test]
    fn continuous_at_slip_static() {
        let p = params();
        assert_relative_eq!(friction_from_slip(p.slip_static(), &p), p.friction_static(), epsilon = 1e-6);
        assert_relative_eq!(compute_friction(0.2, 2.0, &p), 1.1, epsilon = 1e-6);
        let below = friction_from_slip(p.slip_static() - 1e-4, &p);
        assert_relative_eq!(below, p.friction_static(), epsilon = 1e-2);
    }

    #[test]
    fn continuous_at_slip_dynamic() {
        let p = params();
        assert_relative_eq!(friction_from_slip(p.slip_dynamic(), &p), p.friction_dynamic(), epsilon = 1e-6);
        let below = friction_from_slip(p.slip_dynamic() - 1e-4, &p);
        assert_relative_eq!(below, p.friction_dynamic(), epsilon = 1e-3);
    }

    #[test]
    fn flat_tail_beyond_slip_dynamic() {
        let p = params();
        for slip_ratio in [0.2, 0.5, 1.0, 3.0, 100.0] {
            assert_eq!(compute_friction(slip_ratio * 4.0, 4.0, &p), 1.0);
        }
    }

    #[test]
    fn zero_slip_gives_zero_friction_at_speed() {
        assert_eq!(compute_friction(0.0, 5.0, &params()), 0.0);
    }

    #[test]
    fn slip_and_speed_signs_are_ignored() {
        let p = params();
        assert_relative_eq!(compute_friction(-0.05, -2.0, &p), compute_friction(0.05, 2.0, &p));
    }

    #[test]
    fn blend_region_uses_literal_formula() {
        let p = params();
        // speed_ratio = 0.75, slip_ratio = 0.3 / 0.75 = 0.4 -> curve 1.0
        // (1.0 - 1.1) / 0.5 * 0.25 = -0.05
        assert_relative_eq!(compute_friction(0.3, 0.75, &p), -0.05, epsilon = 1e-6);
    }

    #[test]
    fn blend_region_starts_at_zero() {
        // The blend term has no additive friction_static.
        assert_relative_eq!(compute_friction(0.3, 0.5, &params()), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn speed_static_scales_thresholds() {
        let (p, _) = FrictionParameters::from_settings(&FrictionSettings {
            speed_static: Some(4.0),
            ..Default::default()
        });
        // 1.9 < 0.5 * 4.0
        assert_eq!(compute_friction(1.0, 1.9, &p), 1.1);
        // speed_ratio = 1.0 exactly leaves the blend region
        assert_relative_eq!(compute_friction(0.1, 4.0, &p), 0.275, epsilon = 1e-6);
    }
}
