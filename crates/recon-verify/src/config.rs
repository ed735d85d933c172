use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

/// Default lifetime of a cached verdict, positive or negative.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default pause between two ledger calls of a batch.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Longest reference accepted before any lookup.
pub const DEFAULT_MAX_REFERENCE_LEN: usize = 100;

/// Configuration for the verification service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationServiceConfig {
    /// Lifetime of every cached verdict. One TTL covers positive and
    /// negative verdicts alike.
    pub cache_ttl_secs: u64,
    /// Pause inserted between two ledger calls of a batch.
    pub batch_delay_ms: u64,
    /// Longest accepted reference, in characters, after trimming.
    pub max_reference_len: usize,
}

impl Default for VerificationServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            batch_delay_ms: DEFAULT_BATCH_DELAY.as_millis() as u64,
            max_reference_len: DEFAULT_MAX_REFERENCE_LEN,
        }
    }
}

impl VerificationServiceConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    pub fn with_batch_delay_ms(mut self, millis: u64) -> Self {
        self.batch_delay_ms = millis;
        self
    }

    pub fn validate(&self) -> Result<(), VerifyError> {
        if self.max_reference_len == 0 {
            return Err(VerifyError::Config(
                "max_reference_len must be at least 1".into(),
            ));
        }
        if chrono::Duration::from_std(self.cache_ttl()).is_err() {
            return Err(VerifyError::Config(format!(
                "cache_ttl_secs {} is out of range",
                self.cache_ttl_secs
            )));
        }
        Ok(())
    }
}
