//! Core CLI arguments structure and basic functionality
//!
//! This module contains the Args struct definition and the merge of
//! command-line values over configuration-file values. Config file loading
//! lives in `config`.

use crate::queue::api::QueueConfig;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PRODUCERS: usize = 2;
pub const DEFAULT_JOBS_PER_PRODUCER: usize = 10;
pub const DEFAULT_SESSIONS: usize = 3;
pub const DEFAULT_EARLY_LEAVERS: usize = 1;
pub const DEFAULT_OBSERVERS: usize = 1;
pub const DEFAULT_LEAVE_AFTER: usize = 3;

// Global arguments structure with all command-line options
//
// Fields are optional so that values absent from the command line can be
// filled from the configuration file before defaults apply.
#[derive(Parser, Debug, Clone)]
#[command(name = "jobqueue")]
#[command(about = "Run producers and sessions against a multi-session job queue")]
#[command(version = crate::core::version::long_version())]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Force colored output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Report format
    #[arg(short = 'F', long = "format", value_name = "FORMAT", value_parser = ["text", "json"])]
    pub format: Option<String>,

    /// Queue name used in log records
    #[arg(short = 'n', long = "queue-name", value_name = "NAME")]
    pub queue_name: Option<String>,

    /// Maximum jobs held by the queue at once
    #[arg(long = "max-jobs", value_name = "COUNT")]
    pub max_jobs: Option<usize>,

    /// Maximum live sessions
    #[arg(long = "max-sessions", value_name = "COUNT")]
    pub max_sessions: Option<usize>,

    /// Maximum pending requests per session and request kind
    #[arg(long = "max-pending-requests", value_name = "COUNT")]
    pub max_pending_requests: Option<usize>,

    /// Number of producer tasks
    #[arg(short = 'p', long = "producers", value_name = "COUNT")]
    pub producers: Option<usize>,

    /// Jobs pushed by each producer
    #[arg(short = 'j', long = "jobs", value_name = "COUNT")]
    pub jobs: Option<usize>,

    /// Number of popping sessions
    #[arg(short = 's', long = "sessions", value_name = "COUNT")]
    pub sessions: Option<usize>,

    /// Popping sessions that end before draining the queue
    #[arg(short = 'e', long = "early-leavers", value_name = "COUNT")]
    pub early_leavers: Option<usize>,

    /// Pops an early leaver makes before ending its session
    #[arg(long = "leave-after", value_name = "COUNT")]
    pub leave_after: Option<usize>,

    /// Sessions that only observe jobs with get
    #[arg(short = 'b', long = "observers", value_name = "COUNT")]
    pub observers: Option<usize>,

    /// Queue settings from the `[queue]` table of the configuration file
    #[arg(skip)]
    pub queue: Option<QueueConfig>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config_file: None,
            color: false,
            no_color: false,
            log_level: None,
            log_file: None,
            log_format: None,
            format: None,
            queue_name: None,
            max_jobs: None,
            max_sessions: None,
            max_pending_requests: None,
            producers: None,
            jobs: None,
            sessions: None,
            early_leavers: None,
            leave_after: None,
            observers: None,
            queue: None,
        }
    }
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether output should be colored
    ///
    /// Explicit flags win; otherwise color follows whether stdout is a terminal.
    pub fn use_color(&self, stdout_is_terminal: bool) -> bool {
        if self.no_color {
            false
        } else {
            self.color || stdout_is_terminal
        }
    }

    /// Log file to write to, with the magic values `none` and `-` disabling it
    pub fn log_file_path(&self) -> Option<String> {
        let path = self.log_file.as_ref()?;
        let text = path.to_string_lossy();
        if text.eq_ignore_ascii_case("none") || text == "-" {
            None
        } else {
            Some(text.into_owned())
        }
    }

    /// Whether the report should be printed as JSON
    pub fn json_report(&self) -> bool {
        self.format.as_deref() == Some("json")
    }

    /// Queue configuration with command-line overrides applied
    pub fn queue_config(&self) -> QueueConfig {
        let mut config = self.queue.clone().unwrap_or_default();
        if let Some(name) = &self.queue_name {
            config.name = name.clone();
        }
        if let Some(max_jobs) = self.max_jobs {
            config.max_jobs = Some(max_jobs);
        }
        if let Some(max_sessions) = self.max_sessions {
            config.max_sessions = Some(max_sessions);
        }
        if let Some(max_pending_requests) = self.max_pending_requests {
            config.max_pending_requests = Some(max_pending_requests);
        }
        config
    }

    pub fn producers(&self) -> usize {
        self.producers.unwrap_or(DEFAULT_PRODUCERS)
    }

    pub fn jobs_per_producer(&self) -> usize {
        self.jobs.unwrap_or(DEFAULT_JOBS_PER_PRODUCER)
    }

    pub fn sessions(&self) -> usize {
        self.sessions.unwrap_or(DEFAULT_SESSIONS)
    }

    pub fn early_leavers(&self) -> usize {
        self.early_leavers.unwrap_or(DEFAULT_EARLY_LEAVERS)
    }

    pub fn leave_after(&self) -> usize {
        self.leave_after.unwrap_or(DEFAULT_LEAVE_AFTER)
    }

    pub fn observers(&self) -> usize {
        self.observers.unwrap_or(DEFAULT_OBSERVERS)
    }
}
