use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::DEFAULT_TIMEZONE;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub recurrence: RecurrenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecurrenceConfig {
    /// Zone used for DATE and floating DTSTART values, and as the fallback
    /// when a TZID cannot be resolved.
    pub default_timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `config.toml` into a `Settings`.
    /// Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("recurrence.default_timezone", DEFAULT_TIMEZONE)?
            .set_default("logging.level", "info")?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Checks that values without a usable fallback are present.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` naming the first blank value.
    pub fn validate(&self) -> CoreResult<()> {
        if self.recurrence.default_timezone.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "recurrence.default_timezone is empty".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(CoreError::ConfigError("logging.level is empty".to_string()));
        }
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
