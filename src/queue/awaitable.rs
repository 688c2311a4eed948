//! Awaitable requests on top of the callback API
//!
//! A pending request is bridged to a `tokio::sync::oneshot` channel: the
//! resolver forwards whatever it is offered and the caller awaits the
//! receiving half. The call that queues the request still never blocks.

use crate::queue::error::QueueResult;
use crate::queue::manager::JobQueue;
use crate::queue::session::Session;
use crate::queue::types::{Ack, JobOffer, RequestKind};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// A job handed to an awaiting session
#[derive(Debug)]
pub struct Delivery<P> {
    pub sequence: u64,
    pub payload: Arc<P>,
}

/// Future resolving once the session's request is settled
///
/// Yields `Some(Delivery)` for a job and `None` when the session ended
/// before one arrived. Dropping the future before it resolves makes the
/// eventual offer a `Defer`: the cursor still moves (and a pop still
/// counts) but completion is not announced on its behalf.
#[derive(Debug)]
#[must_use = "the request stays queued whether or not the future is awaited"]
pub struct PendingJob<P> {
    kind: RequestKind,
    receiver: oneshot::Receiver<Option<Delivery<P>>>,
}

impl<P> PendingJob<P> {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

impl<P> Future for PendingJob<P> {
    type Output = Option<Delivery<P>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(delivery)) => Poll::Ready(delivery),
            // Sender dropped without an offer: treat like abandonment
            Poll::Ready(Err(_)) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<P, C> JobQueue<P, C>
where
    P: Send + Sync + 'static,
    C: 'static,
{
    /// Queue a pop request and return a future for its outcome
    pub fn session_pop_async(&self, session: &Session<P, C>) -> QueueResult<PendingJob<P>> {
        self.submit_async(session, RequestKind::Pop)
    }

    /// Queue a get request and return a future for its outcome
    pub fn session_get_async(&self, session: &Session<P, C>) -> QueueResult<PendingJob<P>> {
        self.submit_async(session, RequestKind::Get)
    }

    fn submit_async(
        &self,
        session: &Session<P, C>,
        kind: RequestKind,
    ) -> QueueResult<PendingJob<P>> {
        let (sender, receiver) = oneshot::channel();
        let resolver = move |_: &C, offer: JobOffer<P>| -> Ack {
            match offer {
                JobOffer::Job { sequence, payload } => {
                    // A dropped future no longer wants the job announced on its behalf
                    if sender.send(Some(Delivery { sequence, payload })).is_ok() {
                        Ack::Accept
                    } else {
                        Ack::Defer
                    }
                }
                JobOffer::Abandoned => {
                    let _ = sender.send(None);
                    Ack::Defer
                }
            }
        };
        self.submit(session, kind, Box::new(resolver))?;
        Ok(PendingJob { kind, receiver })
    }
}

impl<P, C> Session<P, C>
where
    P: Send + Sync + 'static,
    C: 'static,
{
    /// See [`JobQueue::session_pop_async`]
    pub fn pop_async(&self) -> QueueResult<PendingJob<P>> {
        self.queue()?.session_pop_async(self)
    }

    /// See [`JobQueue::session_get_async`]
    pub fn get_async(&self) -> QueueResult<PendingJob<P>> {
        self.queue()?.session_get_async(self)
    }
}
