// ==============================================================================
// aggregate.rs — FORCE-WEIGHTED REDUCTION (POINTS -> PAIR -> BATCH)
// ==============================================================================
// Per contact pair:
//     slip_pair      = Σ(slip_j * Fn_j) / Σ Fn_j
//     reference_pair = Σ(ref_j  * Fn_j) / Σ Fn_j
// Friction is then evaluated per pair (curve.rs), and the batch coefficient is
//     mu = Σ(mu_pair * ΣFn_pair) / Σ ΣFn_pair
//
// Skips:
// - invalid record (empty / mismatched lists / unknown collision) -> error!
// - zero total normal force on a pair                               -> silent
// A batch with no contributing pair yields no coefficient.
// ==============================================================================

use rapier3d::prelude::Real;
use tracing::error;

use crate::slip_friction::curve::compute_friction;
use crate::slip_friction::error::ContactError;
use crate::slip_friction::kinematics::{ContactWorld, PointEvaluation, evaluate_point};
use crate::slip_friction::params::FrictionParameters;
use crate::slip_friction::types::{ContactBatch, ContactPairRecord, SlipAggregate};

/// Force-weighted mean of per-point slip and reference speed.
///
/// Returns `None` when the points carry no normal force at all.
pub fn aggregate_pair(points: &[PointEvaluation]) -> Option<SlipAggregate> {
    let mut scaled_slip = 0.0;
    let mut scaled_reference = 0.0;
    let mut normal_force_sum = 0.0;

    for p in points {
        scaled_slip += p.slip_speed * p.normal_force;
        scaled_reference += p.reference_speed * p.normal_force;
        normal_force_sum += p.normal_force;
    }

    if normal_force_sum <= 0.0 {
        return None;
    }

    Some(SlipAggregate {
        slip_speed: scaled_slip / normal_force_sum,
        reference_speed: scaled_reference / normal_force_sum,
        normal_force_sum,
    })
}

/// Running force-weighted mean of per-pair friction coefficients.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrictionAccumulator {
    scaled_friction: Real,
    normal_force_sum: Real,
    pairs: usize,
}

impl FrictionAccumulator {
    pub fn add(&mut self, friction: Real, normal_force_sum: Real) {
        self.scaled_friction += friction * normal_force_sum;
        self.normal_force_sum += normal_force_sum;
        self.pairs += 1;
    }

    pub fn pairs(&self) -> usize {
        self.pairs
    }

    /// The weighted mean, or `None` if nothing with positive load was added.
    pub fn finish(&self) -> Option<Real> {
        if self.pairs == 0 || self.normal_force_sum <= 0.0 {
            return None;
        }
        Some(self.scaled_friction / self.normal_force_sum)
    }
}

/// Outcome of reducing one contact batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchEstimate {
    pub friction: Option<Real>,
    pub valid_pairs: usize,
    pub invalid_pairs: usize,
    pub degenerate_pairs: usize,
}

/// Evaluate every point of a record against the world's links.
pub fn evaluate_pair<W: ContactWorld + ?Sized>(
    record: &ContactPairRecord,
    world: &W,
) -> Result<Vec<PointEvaluation>, ContactError> {
    let samples = record.samples()?;

    let link1 = world
        .link_for_collision(&record.collision1)
        .ok_or_else(|| ContactError::UnknownCollision(record.collision1.clone()))?;
    let link2 = world
        .link_for_collision(&record.collision2)
        .ok_or_else(|| ContactError::UnknownCollision(record.collision2.clone()))?;

    Ok(samples.iter().map(|s| evaluate_point(s, &link1, &link2)).collect())
}

/// Reduce a whole batch to one friction coefficient.
pub fn estimate_batch_friction<W: ContactWorld + ?Sized>(
    batch: &ContactBatch,
    world: &W,
    params: &FrictionParameters,
) -> BatchEstimate {
    let mut acc = FrictionAccumulator::default();
    let mut estimate = BatchEstimate::default();

    for record in &batch.contacts {
        let points = match evaluate_pair(record, world) {
            Ok(points) => points,
            Err(e) => {
                error!("{e}");
                estimate.invalid_pairs += 1;
                continue;
            }
        };

        let Some(pair) = aggregate_pair(&points) else {
            estimate.degenerate_pairs += 1;
            continue;
        };

        let friction = compute_friction(pair.slip_speed, pair.reference_speed, params);
        acc.add(friction, pair.normal_force_sum);
    }

    estimate.valid_pairs = acc.pairs();
    estimate.friction = acc.finish();
    estimate
}
