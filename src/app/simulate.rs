//! Queue simulation driven by the command line
//!
//! Producers push jobs from tokio tasks while sessions drain them with the
//! awaitable request API. Popping sessions consume every job (or leave
//! early), observers only look at jobs with get. The outcome of every job
//! is collected from its completion callback and summarised in a report.

use crate::app::cli::args::Args;
use crate::queue::api::{JobOutcome, JobQueue, QueueConfig, QueueError, QueueStats, Session};
use prettytable::{format, Cell, Row, Table};
use serde::Serialize;
use strum_macros::Display;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Simulation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Report serialisation failed: {0}")]
    Report(#[from] serde_json::Error),
}

/// What to run: worker counts and the queue they share
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub queue: QueueConfig,
    pub producers: usize,
    pub jobs_per_producer: usize,
    pub sessions: usize,
    pub early_leavers: usize,
    pub leave_after: usize,
    pub observers: usize,
}

impl SimulationPlan {
    pub fn total_jobs(&self) -> usize {
        self.producers * self.jobs_per_producer
    }
}

impl From<&Args> for SimulationPlan {
    fn from(args: &Args) -> Self {
        Self {
            queue: args.queue_config(),
            producers: args.producers(),
            jobs_per_producer: args.jobs_per_producer(),
            sessions: args.sessions(),
            early_leavers: args.early_leavers(),
            leave_after: args.leave_after(),
            observers: args.observers(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionRole {
    Consumer,
    EarlyLeaver,
    Observer,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: u64,
    pub role: SessionRole,
    pub pops: usize,
    pub gets: usize,
    /// Requests still waiting when the session ended
    pub abandoned_requests: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub queue: String,
    pub jobs_pushed: usize,
    pub completed: usize,
    pub abandoned: usize,
    /// Queue state after all workers finished, before destroy
    pub final_stats: QueueStats,
    pub sessions: Vec<SessionReport>,
}

impl SimulationReport {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render the per-session table followed by the job totals
    pub fn render_table(&self, color: bool) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.set_titles(Row::new(
            ["Session", "Role", "Pops", "Gets", "Abandoned requests"]
                .iter()
                .map(|title| Self::cell(title, "b", "bFy", color))
                .collect(),
        ));
        for session in &self.sessions {
            table.add_row(Row::new(vec![
                Cell::new(&session.session_id.to_string()),
                Cell::new(&session.role.to_string()),
                Cell::new(&session.pops.to_string()).style_spec("r"),
                Cell::new(&session.gets.to_string()).style_spec("r"),
                Cell::new(&session.abandoned_requests.to_string()).style_spec("r"),
            ]));
        }

        let mut totals = Table::new();
        totals.set_format(*format::consts::FORMAT_CLEAN);
        totals.add_row(Row::new(vec![
            Cell::new("Queue"),
            Cell::new(&self.queue),
        ]));
        totals.add_row(Row::new(vec![
            Cell::new("Jobs pushed"),
            Cell::new(&self.jobs_pushed.to_string()).style_spec("r"),
        ]));
        totals.add_row(Row::new(vec![
            Cell::new(&JobOutcome::Completed.to_string()),
            Self::cell(&self.completed.to_string(), "r", "rFg", color),
        ]));
        totals.add_row(Row::new(vec![
            Cell::new(&JobOutcome::Abandoned.to_string()),
            Self::cell(&self.abandoned.to_string(), "r", "rFr", color),
        ]));

        format!("{}\n{}", table, totals)
    }

    fn cell(text: &str, plain: &str, colored: &str, color: bool) -> Cell {
        Cell::new(text).style_spec(if color { colored } else { plain })
    }
}

/// Run the plan to completion and destroy the queue
pub async fn run_simulation(plan: SimulationPlan) -> Result<SimulationReport, SimulationError> {
    let queue: JobQueue<String> = JobQueue::with_config(plan.queue.clone(), ())?;
    let total_jobs = plan.total_jobs();
    log::info!(
        "[{}] Simulating {} producers x {} jobs, {} sessions ({} leaving early), {} observers",
        queue.name(),
        plan.producers,
        plan.jobs_per_producer,
        plan.sessions,
        plan.early_leavers,
        plan.observers
    );

    // Sessions begin before the first push so that every job is owed by all of them
    let mut workers = JoinSet::new();
    for index in 0..plan.sessions {
        let session = queue.session_begin()?;
        let role = if index < plan.early_leavers {
            SessionRole::EarlyLeaver
        } else {
            SessionRole::Consumer
        };
        let quota = match role {
            SessionRole::EarlyLeaver => plan.leave_after.min(total_jobs),
            _ => total_jobs,
        };
        workers.spawn(drain_session(session, role, quota));
    }
    for _ in 0..plan.observers {
        let session = queue.session_begin()?;
        workers.spawn(drain_session(session, SessionRole::Observer, total_jobs));
    }

    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let producers = (0..plan.producers).map(|producer| {
        let queue = queue.clone();
        let outcome_tx = outcome_tx.clone();
        let jobs = plan.jobs_per_producer;
        tokio::spawn(async move { produce(queue, producer, jobs, outcome_tx).await })
    });
    for pushed in futures::future::join_all(producers).await {
        pushed??;
    }
    drop(outcome_tx);

    let mut sessions = Vec::with_capacity(plan.sessions + plan.observers);
    while let Some(report) = workers.join_next().await {
        sessions.push(report??);
    }
    sessions.sort_by_key(|report| report.session_id);

    let final_stats = queue.stats()?;
    let teardown = queue.clone();
    tokio::task::spawn_blocking(move || teardown.destroy()).await??;

    let mut completed = 0;
    let mut abandoned = 0;
    while let Ok(outcome) = outcome_rx.try_recv() {
        match outcome {
            JobOutcome::Completed => completed += 1,
            JobOutcome::Abandoned => abandoned += 1,
        }
    }

    Ok(SimulationReport {
        queue: queue.name().to_string(),
        jobs_pushed: total_jobs,
        completed,
        abandoned,
        final_stats,
        sessions,
    })
}

async fn produce(
    queue: JobQueue<String>,
    producer: usize,
    jobs: usize,
    outcomes: mpsc::UnboundedSender<JobOutcome>,
) -> Result<(), QueueError> {
    for job in 0..jobs {
        let outcomes = outcomes.clone();
        let sequence = queue.push(format!("producer-{}/job-{}", producer, job), move |outcome| {
            let _ = outcomes.send(outcome);
        })?;
        log::trace!("Producer {} pushed job {}", producer, sequence);
        tokio::task::yield_now().await;
    }
    Ok(())
}

async fn drain_session(
    session: Session<String>,
    role: SessionRole,
    quota: usize,
) -> Result<SessionReport, QueueError> {
    let mut report = SessionReport {
        session_id: session.id(),
        role,
        pops: 0,
        gets: 0,
        abandoned_requests: 0,
    };

    while report.pops + report.gets < quota {
        let pending = match role {
            SessionRole::Observer => session.get_async()?,
            _ => session.pop_async()?,
        };
        match pending.await {
            Some(delivery) => {
                log::trace!(
                    "Session {} received job {} ({})",
                    report.session_id,
                    delivery.sequence,
                    delivery.payload
                );
                match role {
                    SessionRole::Observer => report.gets += 1,
                    _ => report.pops += 1,
                }
            }
            None => break,
        }
    }

    if role == SessionRole::EarlyLeaver {
        // Leave with one request outstanding; it is either satisfied already or abandoned
        let pending = session.pop_async()?;
        session.end()?;
        match pending.await {
            Some(_) => report.pops += 1,
            None => report.abandoned_requests += 1,
        }
    } else {
        session.end()?;
    }

    log::debug!(
        "Session {} ({}) finished: {} pops, {} gets",
        report.session_id,
        role,
        report.pops,
        report.gets
    );
    Ok(report)
}
