//! Engine configuration
//!
//! The consistency simulation is configured from exactly two knobs: the
//! unapplied-job percentage and the random seed feeding the policy's
//! generator. Both can come from the environment
//! (`BURROW_UNAPPLIED_JOB_PCT`, `BURROW_CONSISTENCY_SEED`) or be set
//! directly. Range validation happens when the policy is constructed,
//! not here, so a config loaded from a bad environment still reports the
//! error through the normal construction path.

use burrow_core::{Error, Result};

/// Environment variable holding the unapplied-job percentage
pub const ENV_UNAPPLIED_JOB_PCT: &str = "BURROW_UNAPPLIED_JOB_PCT";
/// Environment variable holding the consistency random seed
pub const ENV_CONSISTENCY_SEED: &str = "BURROW_CONSISTENCY_SEED";

/// Configuration for a [`Datastore`](crate::Datastore)
///
/// # Example
///
/// ```
/// use burrow_engine::DatastoreConfig;
///
/// let config = DatastoreConfig::default()
///     .with_unapplied_job_pct(20.0)
///     .with_consistency_seed(42);
/// assert_eq!(config.unapplied_job_pct, 20.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DatastoreConfig {
    /// Percentage of new jobs left unapplied, 0.0–100.0
    pub unapplied_job_pct: f64,
    /// Seed for the policy's pseudo-random generator
    pub consistency_seed: u64,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        DatastoreConfig {
            unapplied_job_pct: 0.0,
            consistency_seed: 0,
        }
    }
}

impl DatastoreConfig {
    /// Set the unapplied-job percentage
    pub fn with_unapplied_job_pct(mut self, pct: f64) -> Self {
        self.unapplied_job_pct = pct;
        self
    }

    /// Set the consistency seed
    pub fn with_consistency_seed(mut self, seed: u64) -> Self {
        self.consistency_seed = seed;
        self
    }

    /// Load configuration from the environment, falling back to defaults
    /// for unset variables
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` when a variable is set but
    /// unparseable. Out-of-range percentages are accepted here and
    /// rejected at policy construction.
    pub fn from_env() -> Result<Self> {
        let mut config = DatastoreConfig::default();
        if let Ok(raw) = std::env::var(ENV_UNAPPLIED_JOB_PCT) {
            config.unapplied_job_pct = raw.parse().map_err(|_| {
                Error::InvalidConfiguration(format!(
                    "{} must be a number, got {:?}",
                    ENV_UNAPPLIED_JOB_PCT, raw
                ))
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_CONSISTENCY_SEED) {
            config.consistency_seed = raw.parse().map_err(|_| {
                Error::InvalidConfiguration(format!(
                    "{} must be an unsigned integer, got {:?}",
                    ENV_CONSISTENCY_SEED, raw
                ))
            })?;
        }
        Ok(config)
    }
}
