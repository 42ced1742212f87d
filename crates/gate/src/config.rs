//! Gate configuration

use serde::{Deserialize, Serialize};
use tollgate_oracle::{FailPolicy, RetryPolicy};

/// Configuration for the Judgment Gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Maximum concurrent oracle calls
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Verdict when the oracle stays unreachable
    #[serde(default = "default_fail_policy")]
    pub fail_policy: FailPolicy,
}

fn default_concurrency() -> usize {
    3
}

// An unreachable oracle lets the actor through
fn default_fail_policy() -> FailPolicy {
    FailPolicy::FailOpen
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retry: RetryPolicy::default(),
            fail_policy: default_fail_policy(),
        }
    }
}
