use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Trait for reporting batch progress.
///
/// `set_state` carries coarse-grained phase text, `set_progress` the
/// per-image position. All methods have default no-op implementations.
pub trait ProgressMonitor: Send {
    fn set_state(&self, _text: &str) {}
    fn set_progress(&self, _text: &str) {}
    fn set_done(&self) {}
}

/// No-op progress monitor for silent operation.
pub struct SilentMonitor;

impl ProgressMonitor for SilentMonitor {}

/// Forwards progress to the tracing subscriber.
pub struct LogMonitor;

impl ProgressMonitor for LogMonitor {
    fn set_state(&self, text: &str) {
        if !text.is_empty() {
            debug!("{}", text);
        }
    }

    fn set_progress(&self, text: &str) {
        if !text.is_empty() {
            info!("{}", text);
        }
    }

    fn set_done(&self) {
        info!("Task completed!");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
    Failed(String),
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// Summary handed to the completion listener and returned by the runner.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub total_units: usize,
    pub processed_units: usize,
    pub failed_units: usize,
    pub tables_published: usize,
    /// Staging directory of the run, whether or not it still exists.
    pub workspace: Option<PathBuf>,
}

/// Notified exactly once when a run ends, whatever the outcome.
pub trait BatchListener: Send {
    fn on_finished(&self, report: &RunReport);
}

impl<F> BatchListener for F
where
    F: Fn(&RunReport) + Send,
{
    fn on_finished(&self, report: &RunReport) {
        self(report)
    }
}
