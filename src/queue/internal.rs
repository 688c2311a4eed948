//! Internal queue state with sequence-based job ordering
//!
//! This module holds the unlocked state machine behind [`JobQueue`]:
//! - Jobs are kept in push order and numbered with a monotonic sequence
//! - Sessions hold sequence cursors, never references to job storage
//! - Acknowledgement counting decides when a job's storage is reclaimed
//! - The bottleneck cursor decides when a job's completion is announced
//!
//! Callbacks whose result does not feed back into the state (completion
//! callbacks and abandoned requests) are collected into [`Deferred`] and
//! delivered by the caller once the lock is released.
//!
//! [`JobQueue`]: crate::queue::JobQueue

use crate::core::gate::{LifecycleGate, OwnedGateUnit};
use crate::queue::config::QueueConfig;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::types::{
    Ack, JobInfo, JobOffer, JobOutcome, QueueStats, RequestKind, SessionInfo,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub(crate) type CompletionFn = Box<dyn FnOnce(JobOutcome) + Send>;
pub(crate) type ResolverFn<P, C> = Box<dyn FnOnce(&C, JobOffer<P>) -> Ack + Send>;

/// Queued work item
struct Job<P> {
    sequence: u64,
    payload: Arc<P>,
    /// Taken on first announcement, so it can never fire twice
    on_complete: Option<CompletionFn>,
    /// Pops still owed by live sessions plus pops already received
    expected_acks: usize,
    current_acks: usize,
    announced: bool,
    /// Set when a session that owed this job a pop ended without it
    abandoned: bool,
}

impl<P> Job<P> {
    fn fully_acknowledged(&self) -> bool {
        self.current_acks == self.expected_acks
    }
}

/// Per-session cursors and pending requests
struct SessionState<P, C> {
    /// Sequence of the next job to pop; equals the queue's next sequence when caught up
    pop_cursor: u64,
    /// Sequence of the next job to get; equals the queue's next sequence when caught up
    get_cursor: u64,
    pending_pops: VecDeque<ResolverFn<P, C>>,
    pending_gets: VecDeque<ResolverFn<P, C>>,
    gate: Arc<LifecycleGate>,
    /// Keeps the queue's gate from draining while the session is live
    _unit: OwnedGateUnit,
}

impl<P, C> SessionState<P, C> {
    fn cursor_mut(&mut self, kind: RequestKind) -> &mut u64 {
        match kind {
            RequestKind::Pop => &mut self.pop_cursor,
            RequestKind::Get => &mut self.get_cursor,
        }
    }

    fn pending_mut(&mut self, kind: RequestKind) -> &mut VecDeque<ResolverFn<P, C>> {
        match kind {
            RequestKind::Pop => &mut self.pending_pops,
            RequestKind::Get => &mut self.pending_gets,
        }
    }
}

enum Effect<P, C> {
    Complete {
        sequence: u64,
        on_complete: CompletionFn,
        outcome: JobOutcome,
    },
    AbandonRequest {
        session_id: u64,
        kind: RequestKind,
        resolver: ResolverFn<P, C>,
    },
}

/// Side effects collected under the lock, delivered after it is released
pub(crate) struct Deferred<P, C> {
    effects: Vec<Effect<P, C>>,
}

impl<P, C> Deferred<P, C> {
    pub(crate) fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    fn complete(&mut self, sequence: u64, on_complete: CompletionFn, outcome: JobOutcome) {
        self.effects.push(Effect::Complete {
            sequence,
            on_complete,
            outcome,
        });
    }

    fn abandon(&mut self, session_id: u64, kind: RequestKind, resolver: ResolverFn<P, C>) {
        self.effects.push(Effect::AbandonRequest {
            session_id,
            kind,
            resolver,
        });
    }

    /// Invoke the collected callbacks in the order they were produced
    pub(crate) fn deliver(self, context: &C) {
        for effect in self.effects {
            match effect {
                Effect::Complete {
                    sequence,
                    on_complete,
                    outcome,
                } => {
                    log::trace!("Delivering {} outcome for job {}", outcome, sequence);
                    on_complete(outcome);
                }
                Effect::AbandonRequest {
                    session_id,
                    kind,
                    resolver,
                } => {
                    log::trace!(
                        "Delivering abandonment to {} request of session {}",
                        kind,
                        session_id
                    );
                    // The verdict on an abandoned offer has nothing to act on
                    let _ = resolver(context, JobOffer::Abandoned);
                }
            }
        }
    }
}

/// Unlocked state of one job queue
pub(crate) struct QueueState<P, C> {
    name: String,
    jobs: VecDeque<Job<P>>,
    sessions: HashMap<u64, SessionState<P, C>>,
    /// Sequence the next pushed job receives, starting from 1
    next_sequence: u64,
    next_session_id: u64,
    /// Oldest job whose completion has not been announced
    bottleneck: Option<u64>,
    closing: bool,
    destroyed: bool,
}

impl<P, C> QueueState<P, C> {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            jobs: VecDeque::new(),
            sessions: HashMap::new(),
            next_sequence: 1,
            next_session_id: 1,
            bottleneck: None,
            closing: false,
            destroyed: false,
        }
    }

    /// Sequence of the oldest retained job, or the next sequence when empty
    fn head_sequence(&self) -> u64 {
        self.jobs
            .front()
            .map_or(self.next_sequence, |job| job.sequence)
    }

    /// Jobs are removed only from the front, so sequences stay contiguous
    fn job_index(&self, sequence: u64) -> Option<usize> {
        let head = self.head_sequence();
        if sequence < head || sequence >= self.next_sequence {
            return None;
        }
        usize::try_from(sequence - head).ok()
    }

    fn job_mut(&mut self, sequence: u64) -> Option<&mut Job<P>> {
        let index = self.job_index(sequence)?;
        self.jobs.get_mut(index)
    }

    fn ensure_open(&self) -> QueueResult<()> {
        if self.destroyed || self.closing {
            return Err(QueueError::invalid_state(format!(
                "queue '{}' is closing",
                self.name
            )));
        }
        Ok(())
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn has_session(&self, session_id: u64) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Append a job owed a pop by every live session
    pub(crate) fn push(
        &mut self,
        payload: P,
        on_complete: CompletionFn,
        config: &QueueConfig,
    ) -> QueueResult<u64> {
        if self.destroyed {
            return Err(QueueError::invalid_state(format!(
                "queue '{}' has been destroyed",
                self.name
            )));
        }
        if let Some(max_jobs) = config.max_jobs {
            if self.jobs.len() >= max_jobs {
                return Err(QueueError::limit_reached("jobs", max_jobs));
            }
        }
        self.jobs
            .try_reserve(1)
            .map_err(|e| QueueError::allocation_failed("jobs", e))?;

        let sequence = self.next_sequence;
        let expected_acks = self.sessions.len();
        self.jobs.push_back(Job {
            sequence,
            payload: Arc::new(payload),
            on_complete: Some(on_complete),
            expected_acks,
            current_acks: 0,
            announced: false,
            abandoned: false,
        });
        // Caught-up cursors equal the old next sequence, so they now point at this job
        self.next_sequence += 1;
        if self.bottleneck.is_none() {
            self.bottleneck = Some(sequence);
        }

        log::debug!(
            "[{}] Pushed job {} (expected acks: {})",
            self.name,
            sequence,
            expected_acks
        );
        Ok(sequence)
    }

    /// Give every session one chance per request kind to resolve a waiting request
    pub(crate) fn resolve_pending(&mut self, context: &C, deferred: &mut Deferred<P, C>) {
        let mut session_ids: Vec<u64> = self.sessions.keys().copied().collect();
        session_ids.sort_unstable();

        for session_id in session_ids {
            self.resolve_next(session_id, RequestKind::Pop, context, deferred);
            self.resolve_next(session_id, RequestKind::Get, context, deferred);
        }
    }

    /// Register a session positioned at the bottleneck
    ///
    /// The session adopts every job from the bottleneck to the tail: each of
    /// them now expects one more pop.
    pub(crate) fn begin_session(
        &mut self,
        gate: Arc<LifecycleGate>,
        unit: OwnedGateUnit,
        config: &QueueConfig,
    ) -> QueueResult<u64> {
        self.ensure_open()?;
        if let Some(max_sessions) = config.max_sessions {
            if self.sessions.len() >= max_sessions {
                return Err(QueueError::limit_reached("sessions", max_sessions));
            }
        }
        self.sessions
            .try_reserve(1)
            .map_err(|e| QueueError::allocation_failed("sessions", e))?;

        let start = self.bottleneck.unwrap_or(self.next_sequence);
        let mut adopted = 0;
        for job in self.jobs.iter_mut().filter(|job| job.sequence >= start) {
            job.expected_acks += 1;
            adopted += 1;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;
        self.sessions.insert(
            session_id,
            SessionState {
                pop_cursor: start,
                get_cursor: start,
                pending_pops: VecDeque::new(),
                pending_gets: VecDeque::new(),
                gate,
                _unit: unit,
            },
        );

        log::debug!(
            "[{}] Session {} began at job {} ({} pending jobs adopted)",
            self.name,
            session_id,
            start,
            adopted
        );
        Ok(session_id)
    }

    /// Queue a request and try to resolve the oldest one against the cursor
    pub(crate) fn enqueue_request(
        &mut self,
        session_id: u64,
        kind: RequestKind,
        resolver: ResolverFn<P, C>,
        context: &C,
        config: &QueueConfig,
        deferred: &mut Deferred<P, C>,
    ) -> QueueResult<()> {
        if self.destroyed {
            return Err(QueueError::invalid_state(format!(
                "queue '{}' has been destroyed",
                self.name
            )));
        }
        let session = self.sessions.get_mut(&session_id).ok_or_else(|| {
            QueueError::invalid_argument(format!(
                "session {} is not live on queue '{}'",
                session_id, self.name
            ))
        })?;

        let pending = session.pending_mut(kind);
        if let Some(max_pending) = config.max_pending_requests {
            if pending.len() >= max_pending {
                return Err(QueueError::limit_reached("requests", max_pending));
            }
        }
        pending
            .try_reserve(1)
            .map_err(|e| QueueError::allocation_failed("requests", e))?;
        pending.push_back(resolver);

        self.resolve_next(session_id, kind, context, deferred);
        Ok(())
    }

    /// Offer the job at the session's cursor to its oldest waiting request
    ///
    /// Does nothing while the cursor is caught up; the request then waits
    /// for the next push.
    fn resolve_next(
        &mut self,
        session_id: u64,
        kind: RequestKind,
        context: &C,
        deferred: &mut Deferred<P, C>,
    ) {
        let head = self.head_sequence();
        let next_sequence = self.next_sequence;
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };

        // A get-cursor may trail a job that every obligated session already popped
        let position = (*session.cursor_mut(kind)).max(head);
        if position >= next_sequence {
            *session.cursor_mut(kind) = position;
            return;
        }
        let Some(resolver) = session.pending_mut(kind).pop_front() else {
            return;
        };

        let job = &mut self.jobs[(position - head) as usize];
        let offer = JobOffer::Job {
            sequence: position,
            payload: Arc::clone(&job.payload),
        };
        let ack = resolver(context, offer);

        *session.cursor_mut(kind) = position + 1;
        if kind == RequestKind::Pop {
            job.current_acks += 1;
            debug_assert!(job.current_acks <= job.expected_acks);
        }

        log::trace!(
            "[{}] Session {} {} job {} ({}), cursor now {}",
            self.name,
            session_id,
            kind,
            position,
            ack,
            position + 1
        );

        if ack == Ack::Accept && self.bottleneck == Some(position) {
            self.announce(position, JobOutcome::Completed, deferred);
        }
    }

    /// Fire a job's completion once and move the bottleneck past it
    fn announce(&mut self, sequence: u64, outcome: JobOutcome, deferred: &mut Deferred<P, C>) {
        let next_sequence = self.next_sequence;
        let Some(job) = self.job_mut(sequence) else {
            return;
        };
        if job.announced {
            return;
        }
        job.announced = true;
        if let Some(on_complete) = job.on_complete.take() {
            deferred.complete(sequence, on_complete, outcome);
        }

        match outcome {
            JobOutcome::Completed => {
                log::debug!("[{}] Job {} completed", self.name, sequence)
            }
            JobOutcome::Abandoned => {
                log::warn!("[{}] Job {} abandoned", self.name, sequence)
            }
        }

        // Announced jobs form a prefix, so the next job is the new bottleneck
        if self.bottleneck == Some(sequence) {
            let next = sequence + 1;
            self.bottleneck = (next < next_sequence).then_some(next);
        }
    }

    /// Reclaim fully acknowledged jobs from the head of the sequence
    ///
    /// A head that every obligated session popped without any of them
    /// accepting it is announced on the way out: completed, unless one of
    /// its sessions abandoned it. Heads nobody was ever obligated to pop
    /// stay until a session adopts them or the queue is destroyed.
    pub(crate) fn settle(&mut self, deferred: &mut Deferred<P, C>) {
        while let Some(head) = self.jobs.front() {
            if !head.fully_acknowledged() {
                break;
            }
            if !head.announced {
                if head.expected_acks == 0 {
                    break;
                }
                let outcome = if head.abandoned {
                    JobOutcome::Abandoned
                } else {
                    JobOutcome::Completed
                };
                let sequence = head.sequence;
                self.announce(sequence, outcome, deferred);
            }
            if let Some(job) = self.jobs.pop_front() {
                log::trace!("[{}] Reclaimed job {}", self.name, job.sequence);
            }
        }
        debug_assert!(!self.jobs.is_empty() || self.bottleneck.is_none());
    }

    /// Remove a session and settle everything it still owed
    pub(crate) fn end_session(
        &mut self,
        session_id: u64,
        deferred: &mut Deferred<P, C>,
    ) -> QueueResult<()> {
        let session = self.sessions.remove(&session_id).ok_or_else(|| {
            QueueError::invalid_argument(format!(
                "session {} is not live on queue '{}'",
                session_id, self.name
            ))
        })?;
        session.gate.close();

        let head = self.head_sequence();
        let first = (session.pop_cursor.max(head) - head) as usize;
        let released = self.jobs.len().saturating_sub(first);
        for index in first..self.jobs.len() {
            let bottleneck = self.bottleneck;
            let job = &mut self.jobs[index];
            debug_assert!(job.expected_acks > job.current_acks);
            job.expected_acks = job.expected_acks.saturating_sub(1);
            job.abandoned = true;

            let sequence = job.sequence;
            if job.fully_acknowledged() && bottleneck == Some(sequence) {
                self.announce(sequence, JobOutcome::Abandoned, deferred);
            }
        }

        let SessionState {
            pending_pops,
            pending_gets,
            ..
        } = session;
        let abandoned_requests = pending_pops.len() + pending_gets.len();
        for resolver in pending_pops {
            deferred.abandon(session_id, RequestKind::Pop, resolver);
        }
        for resolver in pending_gets {
            deferred.abandon(session_id, RequestKind::Get, resolver);
        }
        if abandoned_requests > 0 {
            log::warn!(
                "[{}] Session {} ended with {} pending requests",
                self.name,
                session_id,
                abandoned_requests
            );
        }

        log::debug!(
            "[{}] Session {} ended ({} owed jobs released)",
            self.name,
            session_id,
            released
        );
        self.settle(deferred);
        Ok(())
    }

    /// Stop admitting sessions and hand out the gates of the live ones
    pub(crate) fn begin_close(&mut self) -> Vec<(u64, Arc<LifecycleGate>)> {
        self.closing = true;
        let mut gates: Vec<(u64, Arc<LifecycleGate>)> = self
            .sessions
            .iter()
            .map(|(id, session)| (*id, Arc::clone(&session.gate)))
            .collect();
        gates.sort_unstable_by_key(|(id, _)| *id);
        gates
    }

    /// Abandon everything that is left and mark the queue destroyed
    pub(crate) fn finalize(&mut self, deferred: &mut Deferred<P, C>) {
        self.closing = true;

        let mut remaining: Vec<u64> = self.sessions.keys().copied().collect();
        remaining.sort_unstable();
        for session_id in remaining {
            if let Err(e) = self.end_session(session_id, deferred) {
                log::warn!(
                    "[{}] Session {} not ended at teardown: {}",
                    self.name,
                    session_id,
                    e
                );
            }
        }

        while let Some(mut job) = self.jobs.pop_front() {
            if job.announced {
                continue;
            }
            if let Some(on_complete) = job.on_complete.take() {
                deferred.complete(job.sequence, on_complete, JobOutcome::Abandoned);
            }
            log::warn!(
                "[{}] Job {} abandoned at teardown",
                self.name,
                job.sequence
            );
        }
        self.bottleneck = None;
        self.destroyed = true;
    }

    pub(crate) fn stats(&self) -> QueueStats {
        QueueStats {
            name: self.name.clone(),
            total_jobs: self.jobs.len(),
            live_sessions: self.sessions.len(),
            bottleneck: self.bottleneck,
            next_sequence: self.next_sequence,
            pending_requests: self
                .sessions
                .values()
                .map(|s| s.pending_pops.len() + s.pending_gets.len())
                .sum(),
            destroyed: self.destroyed,
        }
    }

    pub(crate) fn session_info(&self, session_id: u64) -> QueueResult<SessionInfo> {
        let session = self.sessions.get(&session_id).ok_or_else(|| {
            QueueError::invalid_argument(format!(
                "session {} is not live on queue '{}'",
                session_id, self.name
            ))
        })?;

        let head = self.head_sequence();
        let pop = session.pop_cursor.max(head);
        let get = session.get_cursor.max(head);
        Ok(SessionInfo {
            session_id,
            pop_cursor: (pop < self.next_sequence).then_some(pop),
            get_cursor: (get < self.next_sequence).then_some(get),
            pop_lag: (self.next_sequence - pop) as usize,
            get_lag: (self.next_sequence - get) as usize,
            pending_pops: session.pending_pops.len(),
            pending_gets: session.pending_gets.len(),
        })
    }

    pub(crate) fn job_info(&self, sequence: u64) -> Option<JobInfo> {
        let job = self.jobs.get(self.job_index(sequence)?)?;
        Some(JobInfo {
            sequence: job.sequence,
            expected_acks: job.expected_acks,
            current_acks: job.current_acks,
            announced: job.announced,
            abandoned: job.abandoned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Outcomes = Arc<Mutex<Vec<(u64, JobOutcome)>>>;

    struct Harness {
        state: QueueState<&'static str, ()>,
        gate: Arc<LifecycleGate>,
        config: QueueConfig,
        outcomes: Outcomes,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                state: QueueState::new("test-queue".to_string()),
                gate: Arc::new(LifecycleGate::new()),
                config: QueueConfig::default(),
                outcomes: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn begin(&mut self) -> u64 {
            let unit = self.gate.enter_owned().unwrap();
            self.state
                .begin_session(Arc::new(LifecycleGate::new()), unit, &self.config)
                .unwrap()
        }

        fn push(&mut self, payload: &'static str) -> u64 {
            let outcomes = Arc::clone(&self.outcomes);
            let mut deferred = Deferred::new();
            let sequence = self
                .state
                .push(
                    payload,
                    Box::new(move |outcome| {
                        outcomes.lock().unwrap().push((0, outcome));
                    }),
                    &self.config,
                )
                .unwrap();
            self.state.resolve_pending(&(), &mut deferred);
            self.state.settle(&mut deferred);
            deferred.deliver(&());
            sequence
        }

        fn request(&mut self, session_id: u64, kind: RequestKind, ack: Ack) -> Arc<Mutex<Vec<Option<u64>>>> {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let seen_clone = Arc::clone(&seen);
            let mut deferred = Deferred::new();
            self.state
                .enqueue_request(
                    session_id,
                    kind,
                    Box::new(move |_: &(), offer: JobOffer<&'static str>| {
                        seen_clone.lock().unwrap().push(offer.sequence());
                        ack
                    }),
                    &(),
                    &self.config,
                    &mut deferred,
                )
                .unwrap();
            self.state.settle(&mut deferred);
            deferred.deliver(&());
            seen
        }

        fn end(&mut self, session_id: u64) {
            let mut deferred = Deferred::new();
            self.state.end_session(session_id, &mut deferred).unwrap();
            deferred.deliver(&());
        }

        fn outcomes(&self) -> Vec<JobOutcome> {
            self.outcomes
                .lock()
                .unwrap()
                .iter()
                .map(|(_, outcome)| *outcome)
                .collect()
        }
    }

    #[test]
    fn test_sequences_start_at_one_and_are_contiguous() {
        let mut h = Harness::new();
        assert_eq!(h.push("a"), 1);
        assert_eq!(h.push("b"), 2);
        assert_eq!(h.push("c"), 3);

        let stats = h.state.stats();
        assert_eq!(stats.total_jobs, 3);
        assert_eq!(stats.next_sequence, 4);
        assert_eq!(stats.bottleneck, Some(1));
    }

    #[test]
    fn test_push_counts_live_sessions() {
        let mut h = Harness::new();
        h.begin();
        h.begin();
        let sequence = h.push("a");

        let info = h.state.job_info(sequence).unwrap();
        assert_eq!(info.expected_acks, 2);
        assert_eq!(info.current_acks, 0);
    }

    #[test]
    fn test_late_joiner_adopts_jobs_from_bottleneck() {
        let mut h = Harness::new();
        let s1 = h.begin();
        h.push("a");
        h.push("b");

        // Announce job 1 so the bottleneck moves to job 2
        h.request(s1, RequestKind::Get, Ack::Accept);
        assert_eq!(h.state.stats().bottleneck, Some(2));

        let s2 = h.begin();
        assert_eq!(h.state.job_info(1).unwrap().expected_acks, 1);
        assert_eq!(h.state.job_info(2).unwrap().expected_acks, 2);

        let info = h.state.session_info(s2).unwrap();
        assert_eq!(info.pop_cursor, Some(2));
        assert_eq!(info.pop_lag, 1);
    }

    #[test]
    fn test_pop_without_accept_still_reclaims_and_completes() {
        let mut h = Harness::new();
        let s1 = h.begin();
        h.push("a");

        let seen = h.request(s1, RequestKind::Pop, Ack::Defer);
        assert_eq!(*seen.lock().unwrap(), vec![Some(1)]);
        assert_eq!(h.outcomes(), vec![JobOutcome::Completed]);
        assert_eq!(h.state.stats().total_jobs, 0);
        assert_eq!(h.state.stats().bottleneck, None);
    }

    #[test]
    fn test_expected_zero_head_waits_for_adoption() {
        let mut h = Harness::new();
        h.push("orphan");
        assert!(h.outcomes().is_empty());
        assert_eq!(h.state.stats().total_jobs, 1);

        let s1 = h.begin();
        assert_eq!(h.state.job_info(1).unwrap().expected_acks, 1);
        h.request(s1, RequestKind::Pop, Ack::Accept);
        assert_eq!(h.outcomes(), vec![JobOutcome::Completed]);
        assert_eq!(h.state.stats().total_jobs, 0);
    }

    #[test]
    fn test_get_cursor_skips_reclaimed_jobs() {
        let mut h = Harness::new();
        let s1 = h.begin();
        h.push("a");
        h.push("b");
        h.request(s1, RequestKind::Pop, Ack::Accept);

        // Job 1 is gone; the get cursor moves on to the oldest retained job
        assert!(h.state.job_info(1).is_none());
        let seen = h.request(s1, RequestKind::Get, Ack::Defer);
        assert_eq!(*seen.lock().unwrap(), vec![Some(2)]);
    }

    #[test]
    fn test_end_session_cascades_abandonment() {
        let mut h = Harness::new();
        let s1 = h.begin();
        h.push("a");
        h.push("b");
        h.end(s1);

        assert_eq!(
            h.outcomes(),
            vec![JobOutcome::Abandoned, JobOutcome::Abandoned]
        );
        assert_eq!(h.state.stats().total_jobs, 0);
    }

    #[test]
    fn test_finalize_abandons_unannounced_jobs_only() {
        let mut h = Harness::new();
        let s1 = h.begin();
        h.push("a");
        h.push("b");
        h.request(s1, RequestKind::Get, Ack::Accept);
        assert_eq!(h.outcomes(), vec![JobOutcome::Completed]);

        let mut deferred = Deferred::new();
        h.state.finalize(&mut deferred);
        deferred.deliver(&());

        assert_eq!(
            h.outcomes(),
            vec![JobOutcome::Completed, JobOutcome::Abandoned]
        );
        assert!(h.state.is_destroyed());
        assert_eq!(h.state.stats().live_sessions, 0);
        assert_eq!(h.state.stats().total_jobs, 0);
    }

    #[test]
    fn test_unknown_session_is_invalid_argument() {
        let mut h = Harness::new();
        let mut deferred = Deferred::new();
        let result = h.state.enqueue_request(
            42,
            RequestKind::Pop,
            Box::new(|_: &(), _| Ack::Accept),
            &(),
            &QueueConfig::default(),
            &mut deferred,
        );
        assert!(matches!(result, Err(QueueError::InvalidArgument { .. })));
        assert!(matches!(
            h.state.end_session(42, &mut deferred),
            Err(QueueError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_closing_refuses_new_sessions() {
        let mut h = Harness::new();
        h.begin();
        let gates = h.state.begin_close();
        assert_eq!(gates.len(), 1);

        let unit = h.gate.enter_owned().unwrap();
        let result = h
            .state
            .begin_session(Arc::new(LifecycleGate::new()), unit, &h.config);
        assert!(matches!(result, Err(QueueError::InvalidState { .. })));
    }
}
