//! Public API for the job queue
//!
//! External modules should import from here rather than directly from
//! internal modules. See the module documentation for usage examples.

// Core queue components
pub use crate::queue::manager::JobQueue;
pub use crate::queue::session::Session;

// Callback boundary types
pub use crate::queue::types::{Ack, JobOffer, JobOutcome, RequestKind};

// Awaitable requests
pub use crate::queue::awaitable::{Delivery, PendingJob};

// Configuration
pub use crate::queue::config::QueueConfig;

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};

// Introspection
pub use crate::queue::types::{JobInfo, QueueStats, SessionInfo};
