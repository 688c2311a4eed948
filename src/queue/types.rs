//! Type definitions for the job queue
//!
//! Outcome and offer types crossing the callback boundary, plus the
//! snapshot structures returned by the introspection calls.

use serde::Serialize;
use std::sync::Arc;
use strum_macros::{Display, EnumIter};

/// Result delivered to a job's completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Every obligated session handled the job
    Completed,
    /// A session that owed the job a pop left, or the queue was destroyed
    Abandoned,
}

impl JobOutcome {
    pub fn is_ok(self) -> bool {
        matches!(self, JobOutcome::Completed)
    }
}

/// What a resolver is offered when its request is settled
#[derive(Debug)]
pub enum JobOffer<P> {
    /// The job at the session's cursor
    Job { sequence: u64, payload: Arc<P> },
    /// The owning session ended before a job arrived
    Abandoned,
}

impl<P> JobOffer<P> {
    pub fn payload(&self) -> Option<&Arc<P>> {
        match self {
            JobOffer::Job { payload, .. } => Some(payload),
            JobOffer::Abandoned => None,
        }
    }

    pub fn sequence(&self) -> Option<u64> {
        match self {
            JobOffer::Job { sequence, .. } => Some(*sequence),
            JobOffer::Abandoned => None,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, JobOffer::Abandoned)
    }
}

/// A resolver's verdict on an offered job
///
/// `Accept` lets the job's completion be announced when the offered job is
/// the queue's bottleneck. `Defer` only moves the cursor (and, for pops,
/// still counts the acknowledgement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Ack {
    Accept,
    Defer,
}

impl From<bool> for Ack {
    fn from(accept: bool) -> Self {
        if accept {
            Ack::Accept
        } else {
            Ack::Defer
        }
    }
}

/// Which cursor a request reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Consuming read, counts toward the job's acknowledgements
    Pop,
    /// Non-consuming read
    Get,
}

/// Queue-wide statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub name: String,
    /// Jobs still held by the queue (announced or not)
    pub total_jobs: usize,
    pub live_sessions: usize,
    /// Oldest job whose completion has not been announced
    pub bottleneck: Option<u64>,
    /// Sequence number the next pushed job will receive
    pub next_sequence: u64,
    pub pending_requests: usize,
    pub destroyed: bool,
}

/// Per-session cursor snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub session_id: u64,
    /// Next job this session will pop, `None` when caught up
    pub pop_cursor: Option<u64>,
    /// Next job this session will get, `None` when caught up
    pub get_cursor: Option<u64>,
    pub pop_lag: usize,
    pub get_lag: usize,
    pub pending_pops: usize,
    pub pending_gets: usize,
}

/// Acknowledgement snapshot of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub sequence: u64,
    pub expected_acks: usize,
    pub current_acks: usize,
    pub announced: bool,
    pub abandoned: bool,
}
