//! Queue configuration
//!
//! Limits bound how much a single queue may hold. Reaching one is reported
//! the same way as an allocation failure (`ResourceExhausted`), so callers
//! get one retryable error kind for "no room right now".

use crate::queue::error::{QueueError, QueueResult};
use serde::{Deserialize, Serialize};

/// Tunables for one job queue
///
/// Deserialises from a TOML table with kebab-case keys:
///
/// ```toml
/// name = "builds"
/// max-jobs = 1000
/// max-sessions = 16
/// max-pending-requests = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct QueueConfig {
    /// Label used in log records
    pub name: String,
    /// Maximum jobs held at once (announced jobs awaiting pops included)
    pub max_jobs: Option<usize>,
    /// Maximum live sessions
    pub max_sessions: Option<usize>,
    /// Maximum pending requests per session and request kind
    pub max_pending_requests: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_jobs: None,
            max_sessions: None,
            max_pending_requests: None,
        }
    }
}

impl QueueConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_jobs(mut self, max_jobs: usize) -> Self {
        self.max_jobs = Some(max_jobs);
        self
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = Some(max_sessions);
        self
    }

    pub fn with_max_pending_requests(mut self, max_pending_requests: usize) -> Self {
        self.max_pending_requests = Some(max_pending_requests);
        self
    }

    /// Parse a `[queue]`-style TOML table
    pub fn from_toml_table(table: &toml::Table) -> Result<Self, toml::de::Error> {
        toml::Value::Table(table.clone()).try_into()
    }

    /// Reject limits that would make the queue unusable
    pub fn validate(&self) -> QueueResult<()> {
        if self.max_jobs == Some(0) {
            return Err(QueueError::limit_reached("jobs", 0));
        }
        if self.max_sessions == Some(0) {
            return Err(QueueError::limit_reached("sessions", 0));
        }
        if self.max_pending_requests == Some(0) {
            return Err(QueueError::limit_reached("requests", 0));
        }
        Ok(())
    }
}
