use crate::backend::BackendClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Backend reachability as of the most recent check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Unknown,
    Ok,
    Down,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthState {
    pub status: HealthStatus,
    /// Timestamp of the last successful check; never moves backwards and is
    /// untouched by failed checks.
    pub last_ok: Option<DateTime<Utc>>,
}

/// Shared accessor over the single process-wide health state.
///
/// Both the periodic monitor and inline probes go through this handle; writes
/// are whole-state replacements under a coarse lock.
#[derive(Clone)]
pub struct HealthHandle {
    inner: Arc<RwLock<HealthState>>,
}

impl HealthHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HealthState {
                status: HealthStatus::Unknown,
                last_ok: None,
            })),
        }
    }

    pub fn snapshot(&self) -> HealthState {
        *self.inner.read().expect("health state lock poisoned")
    }

    pub fn is_down(&self) -> bool {
        self.snapshot().status == HealthStatus::Down
    }

    /// Apply one check result. Success sets `status = Ok` and advances
    /// `last_ok`; failure sets `status = Down` and leaves `last_ok` alone.
    pub fn record(&self, ok: bool) -> HealthState {
        let mut state = self.inner.write().expect("health state lock poisoned");
        if ok {
            state.status = HealthStatus::Ok;
            let now = Utc::now();
            if state.last_ok.map_or(true, |prev| now > prev) {
                state.last_ok = Some(now);
            }
        } else {
            state.status = HealthStatus::Down;
        }
        *state
    }
}

impl Default for HealthHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Background loop polling the backend for the lifetime of the process.
/// Checks are sequential, so two never run concurrently.
pub async fn run_monitor(handle: HealthHandle, backend: BackendClient, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let ok = backend.check_health().await;
        let state = handle.record(ok);
        tracing::debug!(status = ?state.status, "Health monitor tick");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unknown() {
        let handle = HealthHandle::new();
        let state = handle.snapshot();
        assert_eq!(state.status, HealthStatus::Unknown);
        assert!(state.last_ok.is_none());
        assert!(!handle.is_down());
    }

    #[test]
    fn test_ok_ok_ok_fail_sequence() {
        let handle = HealthHandle::new();

        handle.record(true);
        handle.record(true);
        let third = handle.record(true);
        let third_ok = third.last_ok.expect("last_ok set after success");

        let after_fail = handle.record(false);
        assert_eq!(after_fail.status, HealthStatus::Down);
        assert_eq!(after_fail.last_ok, Some(third_ok));
        assert!(handle.is_down());
    }

    #[test]
    fn test_last_ok_is_monotonic() {
        let handle = HealthHandle::new();
        let first = handle.record(true).last_ok.unwrap();
        let second = handle.record(true).last_ok.unwrap();
        assert!(second >= first);
    }

    #[test]
    fn test_failure_before_any_success_leaves_last_ok_empty() {
        let handle = HealthHandle::new();
        let state = handle.record(false);
        assert_eq!(state.status, HealthStatus::Down);
        assert!(state.last_ok.is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unknown).unwrap(),
            "\"unknown\""
        );
        assert_eq!(serde_json::to_string(&HealthStatus::Ok).unwrap(), "\"ok\"");
        assert_eq!(
            serde_json::to_string(&HealthStatus::Down).unwrap(),
            "\"down\""
        );
    }
}
