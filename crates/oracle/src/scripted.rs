//! Scripted Oracle for testing
//!
//! Returns a fixed verdict, optionally after a delay and after a configured
//! number of transient failures. Tests can wait until a call is in flight.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::OracleError;
use crate::types::{Judgment, JudgmentOracle, JudgmentRequest};

pub struct ScriptedOracle {
    verdict: AtomicBool,
    failures_remaining: AtomicU32,
    delay: Duration,
    calls: AtomicU32,
    call_started: Notify,
}

impl ScriptedOracle {
    /// Always answer `verdict` immediately
    pub fn new(verdict: bool) -> Self {
        Self {
            verdict: AtomicBool::new(verdict),
            failures_remaining: AtomicU32::new(0),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            call_started: Notify::new(),
        }
    }

    /// Sleep this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `n` calls with a transient error
    pub fn failing_first(self, n: u32) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    pub fn set_verdict(&self, verdict: bool) {
        self.verdict.store(verdict, Ordering::SeqCst);
    }

    /// Number of `judge` invocations so far, failed ones included
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resolve once a call has started
    pub async fn wait_for_call(&self) {
        self.call_started.notified().await;
    }
}

#[async_trait]
impl JudgmentOracle for ScriptedOracle {
    async fn judge(&self, _request: &JudgmentRequest) -> Result<Judgment, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_started.notify_one();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(OracleError::Transient("scripted failure".into()));
        }

        if self.verdict.load(Ordering::SeqCst) {
            Ok(Judgment::ban("scripted"))
        } else {
            Ok(Judgment::pass("scripted"))
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
