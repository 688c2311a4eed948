//! Queue Integration Tests
//!
//! Reference scenarios driven through the public API only.

use jobqueue::queue::{Ack, JobOffer, JobOutcome, JobQueue, QueueConfig, Session};
use std::sync::{Arc, Mutex};

type Outcomes = Arc<Mutex<Vec<JobOutcome>>>;

fn push(queue: &JobQueue<String>, payload: &str, outcomes: &Outcomes) -> u64 {
    let outcomes = Arc::clone(outcomes);
    queue
        .push(payload.to_string(), move |outcome| {
            outcomes.lock().unwrap().push(outcome)
        })
        .unwrap()
}

fn pop(session: &Session<String>, ack: Ack) -> Arc<Mutex<Option<String>>> {
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    session
        .pop(move |_, offer: JobOffer<String>| {
            *sink.lock().unwrap() = offer.payload().map(|p| p.to_string());
            ack
        })
        .unwrap();
    slot
}

#[test]
fn scenario_single_session() {
    let queue = JobQueue::new();
    let s1 = queue.session_begin().unwrap();
    let outcomes = Outcomes::default();

    push(&queue, "j1", &outcomes);
    let seen = pop(&s1, Ack::Accept);

    assert_eq!(seen.lock().unwrap().as_deref(), Some("j1"));
    assert_eq!(*outcomes.lock().unwrap(), vec![JobOutcome::Completed]);
    assert_eq!(queue.stats().unwrap().total_jobs, 0);
}

#[test]
fn scenario_two_sessions_both_pop() {
    let queue = JobQueue::new();
    let s1 = queue.session_begin().unwrap();
    let s2 = queue.session_begin().unwrap();
    let outcomes = Outcomes::default();

    push(&queue, "j1", &outcomes);
    pop(&s1, Ack::Accept);
    assert_eq!(*outcomes.lock().unwrap(), vec![JobOutcome::Completed]);
    assert_eq!(queue.stats().unwrap().total_jobs, 1);

    pop(&s2, Ack::Accept);
    assert_eq!(outcomes.lock().unwrap().len(), 1);
    assert_eq!(queue.stats().unwrap().total_jobs, 0);
}

#[test]
fn scenario_one_session_leaves_other_pops() {
    let queue = JobQueue::new();
    let s1 = queue.session_begin().unwrap();
    let s2 = queue.session_begin().unwrap();
    let outcomes = Outcomes::default();

    push(&queue, "j1", &outcomes);
    queue.session_end(&s2).unwrap();
    assert!(outcomes.lock().unwrap().is_empty());

    pop(&s1, Ack::Accept);
    assert_eq!(*outcomes.lock().unwrap(), vec![JobOutcome::Completed]);
    assert_eq!(queue.stats().unwrap().total_jobs, 0);
}

#[test]
fn scenario_only_session_leaves() {
    let queue = JobQueue::new();
    let s1 = queue.session_begin().unwrap();
    let outcomes = Outcomes::default();

    push(&queue, "j1", &outcomes);
    queue.session_end(&s1).unwrap();

    assert_eq!(*outcomes.lock().unwrap(), vec![JobOutcome::Abandoned]);
    assert_eq!(queue.stats().unwrap().total_jobs, 0);
}

#[test]
fn scenario_pop_waits_for_push() {
    let queue = JobQueue::new();
    let s1 = queue.session_begin().unwrap();
    let outcomes = Outcomes::default();

    let seen = pop(&s1, Ack::Accept);
    assert!(seen.lock().unwrap().is_none());

    push(&queue, "j1", &outcomes);
    assert_eq!(seen.lock().unwrap().as_deref(), Some("j1"));
    assert_eq!(*outcomes.lock().unwrap(), vec![JobOutcome::Completed]);
}

#[test]
fn abandonment_propagates_once_per_job() {
    let queue = JobQueue::new();
    let sessions: Vec<_> = (0..3).map(|_| queue.session_begin().unwrap()).collect();
    let outcomes = Outcomes::default();
    for payload in ["a", "b", "c"] {
        push(&queue, payload, &outcomes);
    }

    for session in &sessions {
        session.end().unwrap();
    }

    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![JobOutcome::Abandoned; 3]
    );
    queue.destroy().unwrap();
    assert_eq!(outcomes.lock().unwrap().len(), 3);
}

#[test]
fn configured_queue_reports_its_name() {
    let queue: JobQueue<String, ()> =
        JobQueue::with_config(QueueConfig::named("integration"), ()).unwrap();
    assert_eq!(queue.name(), "integration");
    assert_eq!(queue.stats().unwrap().name, "integration");
}
