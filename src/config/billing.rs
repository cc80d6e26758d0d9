//! Billing configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::subscription::{BillingPolicy, DEFAULT_DEDUP_CAPACITY};

use super::error::ValidationError;

/// Longest accepted billing period.
pub const MAX_PERIOD_MONTHS: u32 = 120;

/// Billing and webhook-processing settings
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Months added per successful renewal
    #[serde(default = "default_period_months")]
    pub period_months: u32,

    /// Transaction ids remembered per user for deduplication
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// Wait for a user's lock, in milliseconds
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl BillingConfig {
    pub fn policy(&self) -> BillingPolicy {
        BillingPolicy {
            period_months: self.period_months,
            dedup_capacity: self.dedup_capacity,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Nominal period length in days.
    pub fn period_days(&self) -> i64 {
        self.policy().nominal_period().num_days()
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.period_months == 0 {
            return Err(ValidationError::InvalidBillingPeriod);
        }
        if self.period_months > MAX_PERIOD_MONTHS {
            return Err(ValidationError::BillingPeriodTooLong {
                max: MAX_PERIOD_MONTHS,
            });
        }
        if self.dedup_capacity == 0 {
            return Err(ValidationError::InvalidDedupCapacity);
        }
        if self.lock_timeout_ms == 0 {
            return Err(ValidationError::InvalidLockTimeout);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            period_months: default_period_months(),
            dedup_capacity: default_dedup_capacity(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

fn default_period_months() -> u32 {
    1
}

fn default_dedup_capacity() -> usize {
    DEFAULT_DEDUP_CAPACITY
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}
