//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ENTITLEMENT_` prefix and nested values use double underscores as separators.
//! Every setting has a default, so an empty environment is a valid one.
//!
//! # Example
//!
//! ```no_run
//! use entitlement_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Renewals add {} month(s)", config.billing.period_months);
//! ```

mod billing;
mod error;
mod logging;
mod reconciliation;

pub use billing::BillingConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use reconciliation::ReconciliationConfig;

use serde::Deserialize;

use crate::domain::reconciliation::ReconciliationPolicy;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Renewal period, dedup window, lock timeout
    #[serde(default)]
    pub billing: BillingConfig,

    /// Grace period and repair parallelism
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ENTITLEMENT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ENTITLEMENT__BILLING__PERIOD_MONTHS=1` -> `billing.period_months = 1`
    /// - `ENTITLEMENT__LOGGING__FORMAT=json` -> `logging.format = json`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ENTITLEMENT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.billing.validate()?;
        self.reconciliation.validate(&self.billing)?;
        self.logging.validate()?;
        Ok(())
    }

    pub fn reconciliation_policy(&self) -> ReconciliationPolicy {
        self.reconciliation.policy(&self.billing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("ENTITLEMENT__BILLING__PERIOD_MONTHS");
        env::remove_var("ENTITLEMENT__BILLING__LOCK_TIMEOUT_MS");
        env::remove_var("ENTITLEMENT__RECONCILIATION__GRACE_PERIOD_DAYS");
        env::remove_var("ENTITLEMENT__LOGGING__FORMAT");
    }

    #[test]
    fn test_load_with_empty_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.billing.period_months, 1);
        assert_eq!(config.reconciliation.grace_period_days, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ENTITLEMENT__BILLING__PERIOD_MONTHS", "12");
        env::set_var("ENTITLEMENT__BILLING__LOCK_TIMEOUT_MS", "250");
        env::set_var("ENTITLEMENT__RECONCILIATION__GRACE_PERIOD_DAYS", "7");
        env::set_var("ENTITLEMENT__LOGGING__FORMAT", "json");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.billing.period_months, 12);
        assert_eq!(config.billing.lock_timeout_ms, 250);
        assert_eq!(config.reconciliation.grace_period_days, 7);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.reconciliation_policy().period,
            chrono::Duration::days(360)
        );
    }

    #[test]
    fn test_unparseable_value_is_load_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ENTITLEMENT__BILLING__PERIOD_MONTHS", "monthly");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_validate_checks_every_section() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.billing.period_months = 4_000_000_000;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::BillingPeriodTooLong { .. })
        ));

        config.billing.period_months = 1;
        config.reconciliation.grace_period_days = 45;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::GraceExceedsPeriod { .. })
        ));
    }
}
