//! Consistency policy: the eventual-consistency simulation
//!
//! The policy decides, per job, whether a committed mutation log applies
//! immediately or stays pending, and whether a pending job rolls forward
//! when an eventually-consistent read touches its group. Both decisions
//! consume exactly one draw from a generator seeded at construction, so
//! a fixed seed reproduces the full decision sequence. Call order is
//! therefore part of the observable contract and must be preserved.
//!
//! The generator is an explicitly constructed value held inside the
//! policy, never ambient global state; concurrent callers serialize on
//! its mutex, and the facade makes commit-scope decisions while holding
//! the group lock so draws interleave in a well-defined order.

use burrow_core::{Error, Key, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Decides whether jobs apply immediately or simulate replication lag
#[derive(Debug)]
pub struct ConsistencyPolicy {
    unapplied_pct: f64,
    rng: Mutex<StdRng>,
}

impl ConsistencyPolicy {
    /// Create a policy leaving `unapplied_pct` percent of new jobs
    /// pending, drawing decisions from a generator seeded with `seed`
    ///
    /// The percentage must lie in [0, 100] and is kept at two-decimal
    /// precision.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` for non-finite or
    /// out-of-range percentages.
    pub fn new(unapplied_pct: f64, seed: u64) -> Result<Self> {
        if !unapplied_pct.is_finite() || !(0.0..=100.0).contains(&unapplied_pct) {
            return Err(Error::InvalidConfiguration(format!(
                "unapplied job percentage must be in [0, 100], got {}",
                unapplied_pct
            )));
        }
        let rounded = (unapplied_pct * 100.0).round() / 100.0;
        Ok(ConsistencyPolicy {
            unapplied_pct: rounded,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    /// Configured unapplied percentage, after rounding
    pub fn unapplied_pct(&self) -> f64 {
        self.unapplied_pct
    }

    /// One draw in [0, 100); every decision consumes exactly one
    fn draw(&self) -> f64 {
        self.rng.lock().gen_range(0.0..100.0)
    }

    /// Decide whether a newly committed job applies immediately
    pub fn should_apply_new_job(&self, root: &Key) -> bool {
        let apply = self.draw() >= self.unapplied_pct;
        debug!(%root, apply, "consistency decision for new job");
        apply
    }

    /// Decide whether a pending job rolls forward on an
    /// eventually-consistent read
    pub fn should_roll_forward_existing_job(&self, root: &Key) -> bool {
        let roll_forward = self.draw() >= self.unapplied_pct;
        debug!(%root, roll_forward, "consistency decision for pending job");
        roll_forward
    }
}
