use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable holding the soft lock lease, in minutes
pub const LEASE_ENV_VAR: &str = "SOFT_LOCK_DELAY";

/// Arbitration settings, read once at startup and injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// How long a soft lock stays live after it is (re)acquired
    pub lease_minutes: u32,
}

impl ArbiterConfig {
    pub const DEFAULT_LEASE_MINUTES: u32 = 10;

    pub fn new(lease_minutes: u32) -> Result<Self> {
        if lease_minutes == 0 {
            return Err(Error::Config(format!(
                "lease must be at least one minute, got {}",
                lease_minutes
            )));
        }
        Ok(Self { lease_minutes })
    }

    /// Parses a lease given as text, e.g. the raw `SOFT_LOCK_DELAY` value.
    pub fn parse(raw: &str) -> Result<Self> {
        let minutes = raw.trim().parse::<u32>().map_err(|e| {
            Error::Config(format!("{} must be a whole number of minutes, got '{}': {}", LEASE_ENV_VAR, raw, e))
        })?;
        Self::new(minutes)
    }

    pub fn lease(&self) -> Duration {
        Duration::minutes(i64::from(self.lease_minutes))
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            lease_minutes: Self::DEFAULT_LEASE_MINUTES,
        }
    }
}
