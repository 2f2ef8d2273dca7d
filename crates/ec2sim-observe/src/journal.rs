//! The request journal.
//!
//! A bounded, in-order log of every request the endpoint handled, so a test
//! can assert on exactly what a client sent and how it was answered.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ec2sim_core::{Ec2Error, ErrorCode};

/// Unique identifier for a handled request, echoed to clients as `requestId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// The request succeeded.
    Success,
    /// The request failed with a provider error.
    Failed {
        code: ErrorCode,
        message: String,
    },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success)
    }

    /// The error code, for failed requests.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ActionOutcome::Success => None,
            ActionOutcome::Failed { code, .. } => Some(*code),
        }
    }
}

impl From<&Ec2Error> for ActionOutcome {
    fn from(err: &Ec2Error) -> Self {
        ActionOutcome::Failed {
            code: err.code,
            message: err.message.clone(),
        }
    }
}

/// One handled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub request_id: RequestId,
    /// The `Action` parameter, or empty when the client sent none.
    pub action: String,
    /// Every query parameter as received, in arrival order.
    pub params: Vec<(String, String)>,
    pub outcome: ActionOutcome,
    pub duration: Duration,
}

impl ActionRecord {
    /// First value of a parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Bounded record of handled requests; the oldest entries fall off first.
pub struct ActionJournal {
    records: RwLock<VecDeque<ActionRecord>>,
    capacity: usize,
}

impl ActionJournal {
    /// Create a journal keeping at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn record(&self, record: ActionRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.write();
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// All records, oldest first.
    pub fn records(&self) -> Vec<ActionRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Records for one action, oldest first.
    pub fn records_for(&self, action: &str) -> Vec<ActionRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.action == action)
            .cloned()
            .collect()
    }

    /// The record of one request.
    pub fn find(&self, request_id: RequestId) -> Option<ActionRecord> {
        self.records
            .read()
            .iter()
            .find(|r| r.request_id == request_id)
            .cloned()
    }

    /// The most recent record.
    pub fn last(&self) -> Option<ActionRecord> {
        self.records.read().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Format as human-readable text, one line per request.
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        for record in self.records.read().iter() {
            let outcome = match &record.outcome {
                ActionOutcome::Success => "ok".to_string(),
                ActionOutcome::Failed { code, .. } => code.to_string(),
            };
            output.push_str(&format!(
                "{} {} {} ({:?})\n",
                record.request_id, record.action, outcome, record.duration
            ));
        }
        output
    }

    /// Format as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.records()).unwrap_or(serde_json::Value::Null)
    }
}

impl std::fmt::Debug for ActionJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionJournal")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
