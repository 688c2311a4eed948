//! Session handle for reading jobs from a queue
//!
//! Each session keeps its own pop and get cursors, so several sessions can
//! drain the same job stream at their own pace. The handle only holds a
//! weak reference to its queue and the session id; the queue owns every
//! job and all cursor state.

use crate::core::gate::LifecycleGate;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::manager::{JobQueue, Shared};
use crate::queue::types::{Ack, JobOffer, SessionInfo};
use std::sync::{Arc, Weak};

/// Consumer view into a [`JobQueue`]
///
/// The session ends automatically when dropped, with the same effect as
/// [`JobQueue::session_end`].
///
/// # Example
///
/// ```rust
/// use jobqueue::queue::{Ack, JobOffer, JobQueue};
///
/// let queue: JobQueue<u32> = JobQueue::new();
/// let session = queue.session_begin()?;
/// queue.push(7, |_| {})?;
///
/// session.get(|_, offer: JobOffer<u32>| {
///     assert_eq!(offer.payload().map(|p| **p), Some(7));
///     Ack::Defer
/// })?;
/// session.end()?;
/// # Ok::<(), jobqueue::queue::QueueError>(())
/// ```
pub struct Session<P, C = ()> {
    session_id: u64,
    queue_id: u64,
    queue: Weak<Shared<P, C>>,
    gate: Arc<LifecycleGate>,
}

impl<P, C> Session<P, C> {
    pub(crate) fn new(
        session_id: u64,
        queue_id: u64,
        queue: Weak<Shared<P, C>>,
        gate: Arc<LifecycleGate>,
    ) -> Self {
        Self {
            session_id,
            queue_id,
            queue,
            gate,
        }
    }

    pub fn id(&self) -> u64 {
        self.session_id
    }

    /// Whether the session has ended (explicitly, by drop or by queue destroy)
    pub fn is_ended(&self) -> bool {
        self.gate.is_closing()
    }

    pub(crate) fn queue_id(&self) -> u64 {
        self.queue_id
    }

    pub(crate) fn gate(&self) -> &LifecycleGate {
        &self.gate
    }

    pub(crate) fn queue(&self) -> QueueResult<JobQueue<P, C>> {
        self.queue
            .upgrade()
            .map(JobQueue::from_shared)
            .ok_or_else(|| QueueError::invalid_state("queue no longer exists"))
    }

    /// See [`JobQueue::session_pop`]
    pub fn pop<F>(&self, resolver: F) -> QueueResult<()>
    where
        F: FnOnce(&C, JobOffer<P>) -> Ack + Send + 'static,
    {
        self.queue()?.session_pop(self, resolver)
    }

    /// See [`JobQueue::session_get`]
    pub fn get<F>(&self, resolver: F) -> QueueResult<()>
    where
        F: FnOnce(&C, JobOffer<P>) -> Ack + Send + 'static,
    {
        self.queue()?.session_get(self, resolver)
    }

    /// See [`JobQueue::session_end`]
    pub fn end(&self) -> QueueResult<()> {
        self.queue()?.session_end(self)
    }

    pub fn info(&self) -> QueueResult<SessionInfo> {
        self.queue()?.session_info(self)
    }
}

impl<P, C> Drop for Session<P, C> {
    fn drop(&mut self) {
        if self.gate.is_closing() {
            return;
        }
        if let Ok(queue) = self.queue() {
            if let Err(e) = queue.session_end(self) {
                log::debug!("Session {} not ended on drop: {}", self.session_id, e);
            }
        }
    }
}

impl<P, C> std::fmt::Debug for Session<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("queue_id", &self.queue_id)
            .field("ended", &self.is_ended())
            .finish()
    }
}
