//! Reconciliation configuration

use serde::Deserialize;

use crate::application::handlers::reconciliation::DEFAULT_REPLAY_CONCURRENCY;
use crate::domain::reconciliation::ReconciliationPolicy;

use super::billing::BillingConfig;
use super::error::ValidationError;

/// Reconciliation and repair settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Tolerated lag of an actual expiry behind the expected one
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,

    /// Repair replays in flight
    #[serde(default = "default_replay_concurrency")]
    pub replay_concurrency: usize,
}

impl ReconciliationConfig {
    /// The period is taken from billing so both sides agree on its length.
    pub fn policy(&self, billing: &BillingConfig) -> ReconciliationPolicy {
        ReconciliationPolicy {
            grace_period: chrono::Duration::days(self.grace_period_days),
            period: billing.policy().nominal_period(),
        }
    }

    /// Validate reconciliation configuration
    pub fn validate(&self, billing: &BillingConfig) -> Result<(), ValidationError> {
        if self.grace_period_days < 0 {
            return Err(ValidationError::NegativeGracePeriod);
        }
        let period_days = billing.period_days();
        if self.grace_period_days >= period_days {
            return Err(ValidationError::GraceExceedsPeriod {
                grace_days: self.grace_period_days,
                period_days,
            });
        }
        if self.replay_concurrency == 0 {
            return Err(ValidationError::InvalidReplayConcurrency);
        }
        Ok(())
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period_days(),
            replay_concurrency: default_replay_concurrency(),
        }
    }
}

fn default_grace_period_days() -> i64 {
    3
}

fn default_replay_concurrency() -> usize {
    DEFAULT_REPLAY_CONCURRENCY
}
