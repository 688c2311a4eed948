//! Queue Error Types
//!
//! Only call-time failures live here. Abandonment is a delivered outcome
//! (`JobOutcome::Abandoned`, `JobOffer::Abandoned`), never an error.

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Resource exhausted ({resource}): {reason}")]
    ResourceExhausted {
        resource: &'static str,
        reason: String,
    },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Lock poisoned: {message}")]
    LockPoisoned { message: String },
}

impl QueueError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        QueueError::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        QueueError::InvalidState {
            message: message.into(),
        }
    }

    pub(crate) fn limit_reached(resource: &'static str, limit: usize) -> Self {
        QueueError::ResourceExhausted {
            resource,
            reason: format!("configured limit of {} reached", limit),
        }
    }

    pub(crate) fn allocation_failed(
        resource: &'static str,
        err: std::collections::TryReserveError,
    ) -> Self {
        QueueError::ResourceExhausted {
            resource,
            reason: err.to_string(),
        }
    }

    /// Whether the caller may reasonably retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::ResourceExhausted { .. })
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
