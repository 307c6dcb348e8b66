//! Readiness gate: wait until shared state satisfies a predicate.
//!
//! Resolution of a unit's dependencies and generation of its markup run in
//! separate tasks. Instead of threading a future from one to the other, the
//! consumer treats "is the record complete?" as an idempotent query over the
//! [`crate::store::FileRecordStore`] and the [`crate::registry::GlobalComponentRegistry`],
//! and waits here until the answer is yes.
//!
//! # Wake-ups
//!
//! Every mutation of the store or registry calls [`ReadinessGate::signal`], which
//! wakes all current waiters through a shared [`tokio::sync::Notify`]. Waiters also
//! re-check on a fixed poll interval, so a predicate over state that never signals
//! still converges. The predicate is always evaluated once before the first
//! suspension: a condition that already holds resolves without any delay.
//!
//! # Lost wake-up prevention
//!
//! The `notified()` future is created *before* the predicate is evaluated.
//! `Notify::notify_waiters` only wakes futures that already exist, so a mutation
//! landing between the check and the wait would otherwise be missed until the
//! next poll tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::Notify;

use crate::constants::default_poll_interval;
use crate::core::MpError;

/// Shared wait/notify primitive.
///
/// Cloning is cheap; clones share the same notification channel.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    notify: Arc<Notify>,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(default_poll_interval(), None)
    }
}

impl ReadinessGate {
    /// Create a gate with the given poll interval and optional wait timeout.
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            poll_interval,
            timeout,
        }
    }

    /// Wake every task currently waiting on this gate so it re-checks its predicate.
    pub fn signal(&self) {
        self.notify.notify_waiters();
    }

    /// Wait until `predicate` returns true.
    ///
    /// # Errors
    ///
    /// Returns [`MpError::WaitTimedOut`] if a timeout is configured and expires.
    pub async fn await_ready<F>(&self, mut predicate: F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        self.await_value("condition", || predicate().then_some(Ok(()))).await
    }

    /// Wait until `check` produces a value.
    ///
    /// `check` returns `None` while the value is not available yet, `Some(Ok(v))`
    /// once it is, and `Some(Err(e))` when waiting is pointless (the producer failed);
    /// the error is returned as is.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `check`, or [`MpError::WaitTimedOut`] naming
    /// `what` if a timeout is configured and expires.
    pub async fn await_value<T, F>(&self, what: &str, check: F) -> Result<T>
    where
        F: FnMut() -> Option<Result<T>>,
    {
        match self.timeout {
            None => self.wait_loop(check).await,
            Some(limit) => {
                let started = Instant::now();
                match tokio::time::timeout(limit, self.wait_loop(check)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!(target: "gate", "Gave up waiting for {what}");
                        Err(MpError::WaitTimedOut {
                            what: what.to_string(),
                            waited_ms: u64::try_from(started.elapsed().as_millis())
                                .unwrap_or(u64::MAX),
                        }
                        .into())
                    }
                }
            }
        }
    }

    async fn wait_loop<T, F>(&self, mut check: F) -> Result<T>
    where
        F: FnMut() -> Option<Result<T>>,
    {
        loop {
            // Create the notified future BEFORE checking so a signal fired in
            // between is not lost
            let notified = self.notify.notified();

            if let Some(outcome) = check() {
                return outcome;
            }

            tokio::select! {
                () = notified => {}
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_ready_on_first_check() {
        // A long poll interval proves no tick is awaited when the predicate already holds
        let gate = ReadinessGate::new(Duration::from_secs(3600), None);
        let calls = AtomicUsize::new(0);

        let started = Instant::now();
        gate.await_ready(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            true
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_signal_wakes_waiter() {
        let gate = ReadinessGate::new(Duration::from_secs(3600), None);
        let flag = Arc::new(AtomicBool::new(false));

        let waiter = {
            let gate = gate.clone();
            let flag = flag.clone();
            tokio::spawn(async move { gate.await_ready(|| flag.load(Ordering::SeqCst)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        flag.store(true, Ordering::SeqCst);
        gate.signal();

        tokio::time::timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_poll_interval_catches_unsignalled_change() {
        let gate = ReadinessGate::new(Duration::from_millis(5), None);
        let flag = Arc::new(AtomicBool::new(false));

        let setter = {
            let flag = flag.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                flag.store(true, Ordering::SeqCst);
            })
        };

        tokio::time::timeout(Duration::from_secs(5), gate.await_ready(|| flag.load(Ordering::SeqCst)))
            .await
            .unwrap()
            .unwrap();
        setter.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_reports_what() {
        let gate = ReadinessGate::new(Duration::from_millis(5), Some(Duration::from_millis(30)));

        let err = gate.await_value::<(), _>("record of a.vue", || None).await.unwrap_err();
        match err.downcast_ref::<MpError>() {
            Some(MpError::WaitTimedOut {
                what,
                ..
            }) => assert_eq!(what, "record of a.vue"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_stops_waiting() {
        let gate = ReadinessGate::default();

        let err = gate
            .await_value::<u32, _>("x", || {
                Some(Err(MpError::UnitFailed {
                    unit: "a.vue".to_string(),
                    reason: "bad yaml".to_string(),
                }
                .into()))
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad yaml"));
    }

    #[tokio::test]
    async fn test_await_value_returns_value() {
        let gate = ReadinessGate::default();
        let value = gate.await_value("answer", || Some(Ok(42))).await.unwrap();
        assert_eq!(value, 42);
    }
}
