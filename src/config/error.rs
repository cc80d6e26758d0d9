//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Billing period must be at least one month")]
    InvalidBillingPeriod,

    #[error("Billing period must not exceed {max} months")]
    BillingPeriodTooLong { max: u32 },

    #[error("Dedup capacity must be positive")]
    InvalidDedupCapacity,

    #[error("Lock timeout must be positive")]
    InvalidLockTimeout,

    #[error("Grace period must not be negative")]
    NegativeGracePeriod,

    #[error("Grace period of {grace_days} days must be shorter than the {period_days}-day billing period")]
    GraceExceedsPeriod { grace_days: i64, period_days: i64 },

    #[error("Replay concurrency must be positive")]
    InvalidReplayConcurrency,
}
