//! Per-action request metrics.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use ec2sim_core::ErrorCode;

/// Collects request counts, error counts and latencies.
pub struct MetricsCollector {
    started: RwLock<Instant>,
    actions: RwLock<BTreeMap<String, ActionMetrics>>,
    errors: RwLock<BTreeMap<ErrorCode, u64>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            started: RwLock::new(Instant::now()),
            actions: RwLock::new(BTreeMap::new()),
            errors: RwLock::new(BTreeMap::new()),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one handled request.
    ///
    /// `error` is the provider error code the request failed with, if any.
    pub fn record_request(&self, action: &str, duration: Duration, error: Option<ErrorCode>) {
        {
            let mut actions = self.actions.write();
            let entry = actions.entry(action.to_string()).or_default();
            entry.count += 1;
            entry.total_time += duration;
            if error.is_some() {
                entry.errors += 1;
            }
        }
        if let Some(code) = error {
            *self.errors.write().entry(code).or_insert(0) += 1;
        }
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let actions = self.actions.read().clone();
        let errors: BTreeMap<String, u64> = self
            .errors
            .read()
            .iter()
            .map(|(code, n)| (code.as_str().to_string(), *n))
            .collect();
        MetricsSnapshot {
            uptime: self.started.read().elapsed(),
            total_requests: actions.values().map(|a| a.count).sum(),
            total_errors: errors.values().sum(),
            actions,
            errors,
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        *self.started.write() = Instant::now();
        self.actions.write().clear();
        self.errors.write().clear();
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("actions", &*self.actions.read())
            .field("errors", &*self.errors.read())
            .finish()
    }
}

/// Snapshot of collected metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Time since the collector was created or last reset.
    #[serde(with = "duration_serde")]
    pub uptime: Duration,
    pub total_requests: u64,
    pub total_errors: u64,
    /// Per-action counters, keyed by action name.
    pub actions: BTreeMap<String, ActionMetrics>,
    /// Failures per provider error code.
    pub errors: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Requests seen for one action.
    pub fn count(&self, action: &str) -> u64 {
        self.actions.get(action).map_or(0, |a| a.count)
    }

    /// Failures seen with one error code.
    pub fn error_count(&self, code: ErrorCode) -> u64 {
        self.errors.get(code.as_str()).copied().unwrap_or(0)
    }
}

/// Counters for a single action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetrics {
    /// Requests handled.
    pub count: u64,
    /// Requests that failed.
    pub errors: u64,
    /// Cumulative handling time.
    #[serde(with = "duration_serde")]
    pub total_time: Duration,
}

impl ActionMetrics {
    /// Mean handling time, zero when nothing was recorded.
    pub fn mean_time(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_time / n,
        }
    }
}

/// Duration as integer nanoseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_nanos())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
