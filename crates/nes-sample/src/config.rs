//! Environment-driven configuration for the sample binary.

use nes_core::unit_of_work::SnapshotPolicy;
use thiserror::Error;

/// Default size of the Postgres connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    /// A variable is set to something unusable.
    #[error("{name} must be {expected}, got `{value}`")]
    Invalid {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
        /// What the value should have been.
        expected: &'static str,
    },
}

/// Settings of the sample binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Postgres connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Snapshot every this many events, 0 disables (`NES_SNAPSHOT_FREQUENCY`).
    pub snapshot_frequency: u32,
    /// Bucket new streams go to (`NES_BUCKET`).
    pub bucket_id: Option<String>,
    /// Connection pool size (`NES_MAX_CONNECTIONS`).
    pub max_connections: u32,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `DATABASE_URL` is unset or blank and
    /// `ConfigError::Invalid` if a numeric variable does not parse or
    /// `NES_MAX_CONNECTIONS` is 0.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let snapshot_frequency =
            parse_u32(&lookup, "NES_SNAPSHOT_FREQUENCY", "a non-negative integer")?.unwrap_or(0);
        let max_connections = match parse_u32(&lookup, "NES_MAX_CONNECTIONS", "a positive integer")? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    name: "NES_MAX_CONNECTIONS",
                    value: "0".to_owned(),
                    expected: "a positive integer",
                });
            }
            Some(n) => n,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let bucket_id = lookup("NES_BUCKET")
            .map(|bucket| bucket.trim().to_owned())
            .filter(|bucket| !bucket.is_empty());

        Ok(Self {
            database_url,
            snapshot_frequency,
            bucket_id,
            max_connections,
        })
    }

    /// Snapshot policy derived from `snapshot_frequency`.
    #[must_use]
    pub fn snapshot_policy(&self) -> SnapshotPolicy {
        match self.snapshot_frequency {
            0 => SnapshotPolicy::Never,
            1 => SnapshotPolicy::Always,
            n => SnapshotPolicy::EveryNEvents(n),
        }
    }
}

fn parse_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<u32>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
            expected,
        })
}
