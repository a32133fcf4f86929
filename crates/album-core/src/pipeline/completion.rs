//! Fan-in completion tracking for a stage's worker pool.
//!
//! Workers hold clones of a [`CompletionSender`] and report one
//! [`Completion`] per task. The [`CompletionTracker`] accumulates them and is
//! released when the last sender is dropped, i.e. when every worker has
//! drained its closed input. The driver then checks the total against the
//! number of tasks it dispatched.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::error::PipelineError;

/// How a single task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Work was done
    Processed,
    /// A cache already covered the task
    Skipped,
    /// The task failed and produced nothing
    Failed,
}

/// One task's completion signal.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Worker that ran the task
    pub worker: usize,
    /// File the task was about
    pub path: PathBuf,
    /// How it ended
    pub outcome: TaskOutcome,
}

/// Per-worker handle for reporting completions.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionSender {
    /// Report a finished task.
    pub fn send(&self, completion: Completion) {
        // The tracker lives until every sender is gone, so this only fails
        // if the driver has already given up on the stage.
        if self.tx.send(completion).is_err() {
            tracing::trace!("completion tracker dropped");
        }
    }
}

/// Counts of task outcomes for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    /// Stage name
    pub stage: &'static str,
    /// Tasks that did work
    pub processed: usize,
    /// Tasks short-circuited by a cache
    pub skipped: usize,
    /// Tasks that failed
    pub failed: usize,
}

impl StageSummary {
    /// Create an empty summary.
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Default::default()
        }
    }

    /// Total completions recorded.
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    /// Tasks that produced output for the next stage.
    pub fn forwarded(&self) -> usize {
        self.processed + self.skipped
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Processed => self.processed += 1,
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Failed => self.failed += 1,
        }
    }

    /// Check that every dispatched task was accounted for exactly once.
    pub fn verify(&self, dispatched: usize) -> Result<(), PipelineError> {
        if self.total() == dispatched {
            Ok(())
        } else {
            Err(PipelineError::Accounting {
                stage: self.stage.to_string(),
                dispatched,
                completed: self.total(),
            })
        }
    }
}

impl std::fmt::Display for StageSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} processed, {} skipped, {} failed",
            self.stage, self.processed, self.skipped, self.failed
        )
    }
}

/// Accumulates completions for one stage.
pub struct CompletionTracker {
    stage: &'static str,
    rx: mpsc::UnboundedReceiver<Completion>,
}

/// Create a sender/tracker pair for a stage.
///
/// The sender is unbounded so reporting never blocks a worker.
pub fn completion_channel(stage: &'static str) -> (CompletionSender, CompletionTracker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, CompletionTracker { stage, rx })
}

impl CompletionTracker {
    /// Wait until every sender is dropped and return the tally.
    pub async fn wait(mut self) -> StageSummary {
        let mut summary = StageSummary::new(self.stage);
        while let Some(completion) = self.rx.recv().await {
            tracing::trace!(
                "{} worker {} finished {:?}: {:?}",
                self.stage,
                completion.worker,
                completion.path,
                completion.outcome
            );
            summary.record(completion.outcome);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(outcome: TaskOutcome) -> Completion {
        Completion {
            worker: 0,
            path: PathBuf::from("a.jpg"),
            outcome,
        }
    }

    #[tokio::test]
    async fn test_tracker_releases_after_last_sender() {
        let (tx, tracker) = completion_channel("hash");
        let other = tx.clone();

        tx.send(completion(TaskOutcome::Processed));
        other.send(completion(TaskOutcome::Skipped));
        other.send(completion(TaskOutcome::Failed));
        drop(tx);

        let handle = tokio::spawn(tracker.wait());
        other.send(completion(TaskOutcome::Processed));
        drop(other);

        let summary = handle.await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.forwarded(), 3);
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let summary = StageSummary {
            stage: "thumbnail",
            processed: 2,
            skipped: 0,
            failed: 1,
        };
        assert!(summary.verify(3).is_ok());
        let err = summary.verify(4).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Accounting {
                dispatched: 4,
                completed: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_summary_display() {
        let summary = StageSummary {
            stage: "hash",
            processed: 1,
            skipped: 2,
            failed: 3,
        };
        assert_eq!(summary.to_string(), "hash: 1 processed, 2 skipped, 3 failed");
    }
}
