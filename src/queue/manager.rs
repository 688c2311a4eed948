//! JobQueue - the shared handle producers and sessions operate on
//!
//! Every operation takes the queue's single mutex for its full duration,
//! so the queue behaves as a strict critical section. Teardown is
//! coordinated through lifecycle gates: one for the queue (push and
//! session_begin take a unit, live sessions hold one) and one per session
//! (its pop/get calls take a unit).

use crate::core::gate::LifecycleGate;
use crate::core::sync::{handle_mutex_poison, recover_poison};
use crate::queue::config::QueueConfig;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::internal::{Deferred, QueueState, ResolverFn};
use crate::queue::session::Session;
use crate::queue::types::{Ack, JobInfo, JobOffer, JobOutcome, QueueStats, RequestKind, SessionInfo};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct Shared<P, C> {
    queue_id: u64,
    config: QueueConfig,
    context: C,
    state: Mutex<QueueState<P, C>>,
    gate: Arc<LifecycleGate>,
}

impl<P, C> Drop for Shared<P, C> {
    fn drop(&mut self) {
        // Dropped without destroy: completion callbacks must still fire once
        let state = recover_poison(self.state.get_mut());
        if state.is_destroyed() {
            return;
        }
        let mut deferred = Deferred::new();
        state.finalize(&mut deferred);
        deferred.deliver(&self.context);
    }
}

/// Multi-session ordered job queue
///
/// Producers [`push`](JobQueue::push) jobs; each [`Session`] reads them in
/// push order through its own pop and get cursors. A job's completion
/// callback fires exactly once: `Completed` when a session resolving it at
/// the bottleneck accepts it (or every obligated session popped it), or
/// `Abandoned` when the sessions that owed it a pop left without it.
///
/// The handle is cheap to clone; all clones refer to the same queue.
///
/// # Example
///
/// ```rust
/// use jobqueue::queue::{Ack, JobOffer, JobOutcome, JobQueue};
/// use std::sync::mpsc;
///
/// let queue: JobQueue<String> = JobQueue::new();
/// let session = queue.session_begin()?;
///
/// let (done_tx, done_rx) = mpsc::channel();
/// queue.push("compile".to_string(), move |outcome| {
///     done_tx.send(outcome).unwrap();
/// })?;
///
/// queue.session_pop(&session, |_, offer: JobOffer<String>| {
///     assert_eq!(offer.payload().map(|p| p.as_str()), Some("compile"));
///     Ack::Accept
/// })?;
///
/// assert_eq!(done_rx.recv().unwrap(), JobOutcome::Completed);
/// # Ok::<(), jobqueue::queue::QueueError>(())
/// ```
pub struct JobQueue<P, C = ()> {
    shared: Arc<Shared<P, C>>,
}

impl<P, C> Clone for JobQueue<P, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P> JobQueue<P, ()> {
    /// Unbounded queue without a creation context
    pub fn new() -> Self {
        Self::from_parts(QueueConfig::default(), ())
    }
}

impl<P> Default for JobQueue<P, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, C> JobQueue<P, C> {
    /// Create a queue whose resolvers all receive `context`
    pub fn create(context: C) -> QueueResult<Self> {
        Self::with_config(QueueConfig::default(), context)
    }

    pub fn with_config(config: QueueConfig, context: C) -> QueueResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, context))
    }

    fn from_parts(config: QueueConfig, context: C) -> Self {
        let queue_id = NEXT_QUEUE_ID.fetch_add(1, Ordering::SeqCst);
        log::debug!("[{}] Created queue {}", config.name, queue_id);
        Self {
            shared: Arc::new(Shared {
                queue_id,
                state: Mutex::new(QueueState::new(config.name.clone())),
                config,
                context,
                gate: Arc::new(LifecycleGate::new()),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared<P, C>>) -> Self {
        Self { shared }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Creation context forwarded to every resolver
    pub fn context(&self) -> &C {
        &self.shared.context
    }

    /// Whether destroy has begun
    pub fn is_destroyed(&self) -> bool {
        self.shared.gate.is_closing()
    }

    fn lock(&self) -> QueueResult<MutexGuard<'_, QueueState<P, C>>> {
        handle_mutex_poison(self.shared.state.lock(), |message| {
            QueueError::LockPoisoned { message }
        })
    }

    fn check_owner(&self, session: &Session<P, C>) -> QueueResult<()> {
        if session.queue_id() != self.shared.queue_id {
            return Err(QueueError::invalid_argument(format!(
                "session {} does not belong to queue '{}'",
                session.id(),
                self.name()
            )));
        }
        Ok(())
    }

    fn closing_error(&self) -> QueueError {
        QueueError::invalid_state(format!("queue '{}' is closing", self.name()))
    }

    /// Append a job owed one pop by every live session
    ///
    /// Waiting requests that can now be satisfied are resolved before this
    /// returns. On error no job is created and `on_complete` is dropped
    /// without being called. Returns the job's sequence number.
    pub fn push<F>(&self, payload: P, on_complete: F) -> QueueResult<u64>
    where
        F: FnOnce(JobOutcome) + Send + 'static,
    {
        let unit = self
            .shared
            .gate
            .enter()
            .ok_or_else(|| self.closing_error())?;

        let mut deferred = Deferred::new();
        let sequence = {
            let mut state = self.lock()?;
            let sequence = state.push(payload, Box::new(on_complete), &self.shared.config)?;
            state.resolve_pending(&self.shared.context, &mut deferred);
            state.settle(&mut deferred);
            sequence
        };
        // Callbacks may end sessions or destroy the queue
        drop(unit);
        deferred.deliver(&self.shared.context);
        Ok(sequence)
    }

    /// Start a session positioned at the current bottleneck
    ///
    /// The session inherits a pop obligation for every job from the
    /// bottleneck to the tail.
    pub fn session_begin(&self) -> QueueResult<Session<P, C>> {
        let unit = self
            .shared
            .gate
            .enter_owned()
            .ok_or_else(|| self.closing_error())?;
        let session_gate = Arc::new(LifecycleGate::new());

        let session_id =
            self.lock()?
                .begin_session(Arc::clone(&session_gate), unit, &self.shared.config)?;

        Ok(Session::new(
            session_id,
            self.shared.queue_id,
            Arc::downgrade(&self.shared),
            session_gate,
        ))
    }

    /// End a session, settling what it still owed
    ///
    /// Waits for the session's in-flight pop/get calls, releases its pop
    /// obligations (abandoning jobs nobody else can complete) and resolves
    /// its waiting requests with [`JobOffer::Abandoned`].
    pub fn session_end(&self, session: &Session<P, C>) -> QueueResult<()> {
        self.check_owner(session)?;
        if !session.gate().close() {
            return Err(QueueError::invalid_state(format!(
                "session {} has already ended",
                session.id()
            )));
        }
        session.gate().wait_drained();

        // Gate is closed: the record has to go even from a poisoned lock
        let mut deferred = Deferred::new();
        {
            let mut state = recover_poison(self.shared.state.lock());
            state.end_session(session.id(), &mut deferred)?;
        }
        deferred.deliver(&self.shared.context);
        Ok(())
    }

    /// Request the next job at the session's pop cursor
    ///
    /// Never blocks: if no job is at the cursor the request waits and
    /// `resolver` runs during a later push. Popping counts toward the job's
    /// acknowledgements whatever the resolver answers.
    ///
    /// Resolvers run inside the queue's critical section and must not call
    /// back into the same queue.
    pub fn session_pop<F>(&self, session: &Session<P, C>, resolver: F) -> QueueResult<()>
    where
        F: FnOnce(&C, JobOffer<P>) -> Ack + Send + 'static,
    {
        self.submit(session, RequestKind::Pop, Box::new(resolver))
    }

    /// Request the next job at the session's get cursor without consuming it
    pub fn session_get<F>(&self, session: &Session<P, C>, resolver: F) -> QueueResult<()>
    where
        F: FnOnce(&C, JobOffer<P>) -> Ack + Send + 'static,
    {
        self.submit(session, RequestKind::Get, Box::new(resolver))
    }

    pub(crate) fn submit(
        &self,
        session: &Session<P, C>,
        kind: RequestKind,
        resolver: ResolverFn<P, C>,
    ) -> QueueResult<()> {
        self.check_owner(session)?;
        let unit = session.gate().enter().ok_or_else(|| {
            QueueError::invalid_state(format!("session {} is ending", session.id()))
        })?;

        let mut deferred = Deferred::new();
        {
            let mut state = self.lock()?;
            state.enqueue_request(
                session.id(),
                kind,
                resolver,
                &self.shared.context,
                &self.shared.config,
                &mut deferred,
            )?;
            state.settle(&mut deferred);
        }
        drop(unit);
        deferred.deliver(&self.shared.context);
        Ok(())
    }

    /// Tear the queue down
    ///
    /// Refuses new pushes and sessions, ends every live session, abandons
    /// every job whose completion was never announced and waits for
    /// in-flight calls to drain. A second call returns `InvalidState`.
    pub fn destroy(&self) -> QueueResult<()> {
        if !self.shared.gate.close() {
            return Err(QueueError::invalid_state(format!(
                "queue '{}' has already been destroyed",
                self.name()
            )));
        }
        log::info!("[{}] Destroying queue", self.name());

        let gates = recover_poison(self.shared.state.lock()).begin_close();
        let mut closed = Vec::with_capacity(gates.len());
        for (session_id, gate) in gates {
            // Sessions already ending on another thread finish on their own
            if gate.close() {
                gate.wait_drained();
                closed.push(session_id);
            }
        }

        let mut deferred = Deferred::new();
        {
            let mut state = recover_poison(self.shared.state.lock());
            for session_id in closed {
                if let Err(e) = state.end_session(session_id, &mut deferred) {
                    log::debug!("[{}] Session already gone at destroy: {}", self.name(), e);
                }
            }
        }
        deferred.deliver(&self.shared.context);

        self.shared.gate.wait_drained();

        let mut deferred = Deferred::new();
        recover_poison(self.shared.state.lock()).finalize(&mut deferred);
        deferred.deliver(&self.shared.context);

        log::info!("[{}] Queue destroyed", self.name());
        Ok(())
    }

    pub fn stats(&self) -> QueueResult<QueueStats> {
        Ok(self.lock()?.stats())
    }

    pub fn session_info(&self, session: &Session<P, C>) -> QueueResult<SessionInfo> {
        self.check_owner(session)?;
        self.lock()?.session_info(session.id())
    }

    /// Acknowledgement state of a job still held by the queue
    pub fn job_info(&self, sequence: u64) -> QueueResult<Option<JobInfo>> {
        Ok(self.lock()?.job_info(sequence))
    }

    /// Whether the session is still live on this queue
    pub fn has_session(&self, session: &Session<P, C>) -> bool {
        session.queue_id() == self.shared.queue_id
            && self
                .lock()
                .map(|state| state.has_session(session.id()))
                .unwrap_or(false)
    }
}
