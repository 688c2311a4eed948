//! Test modules for the job queue
//!
//! Tests are organized by functional area; shared recorders live here.


use crate::queue::api::{Ack, JobOffer, JobOutcome};
use std::sync::{Arc, Mutex};

/// Completion outcomes in delivery order, labelled by job
pub(crate) type OutcomeLog = Arc<Mutex<Vec<(&'static str, JobOutcome)>>>;

/// Offers seen by a resolver: `Some(sequence)` for a job, `None` for abandonment
pub(crate) type OfferLog = Arc<Mutex<Vec<Option<u64>>>>;

pub(crate) fn outcome_log() -> OutcomeLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn offer_log() -> OfferLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Completion callback appending `(label, outcome)` to `log`
pub(crate) fn record(
    log: &OutcomeLog,
    label: &'static str,
) -> impl FnOnce(JobOutcome) + Send + 'static {
    let log = Arc::clone(log);
    move |outcome: JobOutcome| log.lock().unwrap().push((label, outcome))
}

/// Resolver recording the offer it receives and answering `ack`
pub(crate) fn answer(
    log: &OfferLog,
    ack: Ack,
) -> impl FnOnce(&(), JobOffer<&'static str>) -> Ack + Send + 'static {
    let log = Arc::clone(log);
    move |_: &(), offer: JobOffer<&'static str>| {
        log.lock().unwrap().push(offer.sequence());
        ack
    }
}

pub(crate) fn outcomes(log: &OutcomeLog) -> Vec<(&'static str, JobOutcome)> {
    log.lock().unwrap().clone()
}

pub(crate) fn offers(log: &OfferLog) -> Vec<Option<u64>> {
    log.lock().unwrap().clone()
}
