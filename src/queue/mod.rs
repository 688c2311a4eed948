//! Multi-session Job Queue
//!
//! An ordered, in-memory work queue where producers push opaque jobs and
//! independent sessions drain them, each through its own read position.
//!
//! # Overview
//!
//! - **Ordered jobs**: every job gets a monotonic sequence number at push time
//! - **Independent sessions**: each session has a pop cursor (consuming) and
//!   a get cursor (observing), both advancing in push order
//! - **Deferred requests**: a pop or get with nothing at the cursor waits and
//!   is resolved by a later push, so no call ever blocks
//! - **Exactly-once completion**: a job's completion callback fires once,
//!   `Completed` or `Abandoned`
//! - **Ack-driven reclamation**: a job is freed only once every session
//!   obligated to pop it has done so
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐ push  ┌──────────────────────────────────────────┐
//!  │ Producer │──────►│                JobQueue                  │
//!  └──────────┘       │  ┌────┬────┬────┬────┬────┬────┐         │
//!                     │  │ 11 │ 12 │ 13 │ 14 │ 15 │ .. │         │
//!                     │  └────┴────┴────┴────┴────┴────┘         │
//!                     │   ▲         ▲    ▲                       │
//!                     │   │head     │    │bottleneck (oldest     │
//!                     │   │         │    │ job not yet announced)│
//!                     └───┼─────────┼────┼───────────────────────┘
//!                  pop/get│  pop/get│    │pop/get
//!                 ┌───────┴─┐ ┌─────┴──┐ ┌┴────────┐
//!                 │Session 1│ │Session2│ │Session 3│  (own cursors)
//!                 └─────────┘ └────────┘ └─────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use jobqueue::queue::{Ack, JobOffer, JobOutcome, JobQueue};
//! use std::sync::{Arc, Mutex};
//!
//! let queue: JobQueue<&'static str> = JobQueue::new();
//! let first = queue.session_begin()?;
//! let second = queue.session_begin()?;
//!
//! let outcomes = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&outcomes);
//! queue.push("index", move |outcome| sink.lock().unwrap().push(outcome))?;
//!
//! // The first accept at the bottleneck announces completion ...
//! first.pop(|_, _: JobOffer<&'static str>| Ack::Accept)?;
//! assert_eq!(*outcomes.lock().unwrap(), vec![JobOutcome::Completed]);
//!
//! // ... and the job is reclaimed once the second session pops it too
//! second.pop(|_, _: JobOffer<&'static str>| Ack::Accept)?;
//! assert_eq!(queue.stats()?.total_jobs, 0);
//! # Ok::<(), jobqueue::queue::QueueError>(())
//! ```

pub mod api;
mod awaitable;
mod config;
mod error;
mod internal;
mod manager;
mod session;
mod types;

pub use awaitable::{Delivery, PendingJob};
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use manager::JobQueue;
pub use session::Session;
pub use types::{Ack, JobInfo, JobOffer, JobOutcome, QueueStats, RequestKind, SessionInfo};

#[cfg(test)]
mod tests;
