use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// How strict reads treat keys that hold no entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    /// Fail the whole read with `NotFound`.
    #[default]
    Fail,
    /// Leave absent keys out of the result.
    Omit,
    /// Leave absent keys out of raw results, but map their names to `None`
    /// in formatted reads.
    NullFill,
}

/// Configuration for an [`EntityStore`](crate::EntityStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Behavior of `get`/`read` on absent keys.
    pub on_missing: MissingKeyPolicy,
    /// Per-call deadline in milliseconds. `0` disables the deadline.
    pub call_timeout_ms: u64,
    /// Page size applied to queries that set no explicit limit.
    pub default_query_limit: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            on_missing: MissingKeyPolicy::Fail,
            call_timeout_ms: 30_000,
            default_query_limit: None,
        }
    }
}

impl StoreConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }

    pub fn with_on_missing(mut self, policy: MissingKeyPolicy) -> Self {
        self.on_missing = policy;
        self
    }

    pub fn with_default_query_limit(mut self, limit: Option<usize>) -> Self {
        self.default_query_limit = limit;
        self
    }

    /// Reject settings no query could run under.
    pub fn validate(&self) -> StoreResult<()> {
        if self.default_query_limit == Some(0) {
            return Err(StoreError::InvalidArgument(
                "default_query_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}
