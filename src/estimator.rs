// ==============================================================================
// estimator.rs — PER-TICK TIRE FRICTION ESTIMATOR
// ==============================================================================
// advance(dt, world), once per simulation tick:
//
//   mailbox empty  -> staleness += dt; past 1 s log the wait and restart it;
//                     coefficient left untouched
//   mailbox batch  -> take it (slot cleared), staleness = 0,
//                     kinematics -> aggregation -> curve (slip_friction),
//                     push mu to primary + secondary slot of the surface
//
// The surface capability is probed once in new(); an unsupported backend is
// reported every tick a coefficient is produced and never written.
// ==============================================================================

use rapier3d::prelude::Real;
use tracing::{debug, error, info};

use crate::mailbox::ContactMailbox;
use crate::slip_friction::{ContactWorld, FrictionParameters, estimate_batch_friction};
use crate::surface::{FrictionSurface, SurfaceSupport};

/// Simulated time without a batch before a wait is reported (s).
pub const STALE_REPORT_AFTER: Real = 1.0;

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No batch this tick; `waited` is the staleness timer after this tick.
    Waiting { waited: Real },
    /// A batch arrived but no contact pair contributed.
    NoValidContacts,
    /// Coefficient computed and written to the surface.
    Applied(Real),
    /// Coefficient computed but not written (unsupported backend or missing surface).
    Unapplied(Real),
}

pub struct FrictionEstimator {
    params: FrictionParameters,
    collision: String,
    mailbox: ContactMailbox,
    support: SurfaceSupport,
    staleness: Real,
    last_applied: Option<Real>,
}

impl FrictionEstimator {
    /// Build an estimator for the scoped collision name `collision`, reading
    /// batches posted to `mailbox`.
    pub fn new<S: FrictionSurface + ?Sized>(
        params: FrictionParameters,
        collision: impl Into<String>,
        mailbox: ContactMailbox,
        surface: &S,
    ) -> Self {
        let collision = collision.into();
        let support = SurfaceSupport::probe(surface, &collision);
        if let SurfaceSupport::Unsupported { backend } = &support {
            error!(backend = %backend, collision = %collision, "friction updates are not supported by this backend");
        }
        Self {
            params,
            collision,
            mailbox,
            support,
            staleness: 0.0,
            last_applied: None,
        }
    }

    pub fn params(&self) -> &FrictionParameters {
        &self.params
    }

    pub fn collision(&self) -> &str {
        &self.collision
    }

    pub fn support(&self) -> &SurfaceSupport {
        &self.support
    }

    /// Simulated time since the last consumed batch (reset after each report).
    pub fn staleness(&self) -> Real {
        self.staleness
    }

    /// Last coefficient written to the surface.
    pub fn last_applied(&self) -> Option<Real> {
        self.last_applied
    }

    pub fn advance<W>(&mut self, dt: Real, world: &mut W) -> TickOutcome
    where
        W: ContactWorld + FrictionSurface + ?Sized,
    {
        let Some(batch) = self.mailbox.take() else {
            self.staleness += dt;
            if self.staleness > STALE_REPORT_AFTER {
                info!(waited_s = self.staleness, "waited without a contact message");
                self.staleness = 0.0;
            }
            return TickOutcome::Waiting { waited: self.staleness };
        };
        self.staleness = 0.0;

        let estimate = estimate_batch_friction(&batch, &*world, &self.params);
        let Some(mu) = estimate.friction else {
            return TickOutcome::NoValidContacts;
        };

        if let SurfaceSupport::Unsupported { backend } = &self.support {
            error!(backend = %backend, "only backends with friction surface updates are supported");
            return TickOutcome::Unapplied(mu);
        }

        if !world.set_friction(&self.collision, mu, mu) {
            error!(collision = %self.collision, "setting friction failed");
            return TickOutcome::Unapplied(mu);
        }

        debug!(mu, pairs = estimate.valid_pairs, "tire friction applied");
        self.last_applied = Some(mu);
        TickOutcome::Applied(mu)
    }
}
