use std::fmt::Display;

use tracing::debug;

/// Outcome of an operation whose failure the caller tolerates.
///
/// Directory pre-creation, temp file cleanup and session teardown return this
/// instead of a `Result` so that ignoring the failure is the expected use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    Done,
    Failed(String),
}

impl BestEffort {
    pub fn attempt<E: Display>(op: &'static str, target: &str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => BestEffort::Done,
            Err(err) => {
                debug!(
                    event = "best_effort.failed",
                    op,
                    target,
                    error = %err,
                    "best-effort operation failed"
                );
                BestEffort::Failed(err.to_string())
            }
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, BestEffort::Done)
    }

    /// Combines two outcomes, keeping the first failure.
    pub fn and(self, other: BestEffort) -> BestEffort {
        match self {
            BestEffort::Done => other,
            failed => failed,
        }
    }
}
