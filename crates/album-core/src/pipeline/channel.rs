//! Bounded channels and fixed-size worker pools for the pipeline stages.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

use super::completion::{Completion, CompletionSender, TaskOutcome};

/// Create a bounded channel pair with the configured buffer size.
///
/// When the buffer is full, the sender will block, providing backpressure
/// to prevent memory exhaustion on large trees.
pub fn bounded_channel<T>(config: &PipelineConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.buffer_size)
}

/// Result of one task that the stage wants forwarded downstream.
#[derive(Debug)]
pub enum Step<O> {
    /// Work was done
    Processed(O),
    /// A cache already covered this task
    Skipped(O),
}

const RUNNING: u8 = 0;
const COMMITTED: u8 = 1;
const ABANDONED: u8 = 2;

/// Shared between a running task and the timer that may abandon it.
///
/// A stage calls [`TaskToken::commit`] right before its first write to disk.
/// Commit and timeout race for the token and exactly one wins: a committed
/// task is awaited past its deadline, an abandoned one can no longer commit.
#[derive(Debug, Clone)]
pub struct TaskToken {
    state: Arc<AtomicU8>,
    timeout: Duration,
}

impl TaskToken {
    /// A fresh token for a task allowed to run for `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Arc::new(AtomicU8::new(RUNNING)),
            timeout,
        }
    }

    /// Whether the pool has already given up on this task.
    pub fn is_abandoned(&self) -> bool {
        self.state.load(Ordering::Acquire) == ABANDONED
    }

    /// Bail out early if the task has been abandoned.
    pub fn check(&self, stage: &str, path: &Path) -> Result<(), PipelineError> {
        if self.is_abandoned() {
            return Err(self.timeout_error(stage, path));
        }
        Ok(())
    }

    /// Claim the right to persist results. Fails once the task timed out.
    pub fn commit(&self, stage: &str, path: &Path) -> Result<(), PipelineError> {
        match self
            .state
            .compare_exchange(RUNNING, COMMITTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) | Err(COMMITTED) => Ok(()),
            Err(_) => Err(self.timeout_error(stage, path)),
        }
    }

    /// Give up on the task. False if it already committed.
    pub(crate) fn abandon(&self) -> bool {
        match self
            .state
            .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) | Err(ABANDONED) => true,
            Err(_) => false,
        }
    }

    fn timeout_error(&self, stage: &str, path: &Path) -> PipelineError {
        PipelineError::Timeout {
            path: path.to_path_buf(),
            stage: stage.to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

/// The blocking per-task function of a pipeline stage.
pub trait StageWorker: Send + Sync + 'static {
    /// Task type pulled from the stage's input queue
    type Input: Send + 'static;
    /// Value forwarded to the next stage
    type Output: Send + 'static;

    /// Stage name for logs and errors.
    fn stage(&self) -> &'static str;

    /// Path the task refers to, for errors raised outside `process`.
    fn task_path(&self, input: &Self::Input) -> PathBuf;

    /// Run one task. Called on the blocking thread pool.
    ///
    /// Anything written to disk must be preceded by a successful
    /// [`TaskToken::commit`].
    fn process(
        &self,
        input: Self::Input,
        token: &TaskToken,
    ) -> Result<Step<Self::Output>, PipelineError>;
}

/// A fixed number of workers pulling from one shared queue.
pub struct WorkerPool {
    stage: &'static str,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` workers draining `input`.
    ///
    /// Every task yields exactly one completion, whatever its outcome.
    /// Outputs go to `output` when one is attached and are dropped otherwise.
    /// Once `input` is closed and empty each worker drops its completion
    /// sender, which is what releases the stage's
    /// [`CompletionTracker`](super::completion::CompletionTracker).
    pub fn spawn<W: StageWorker>(
        worker: Arc<W>,
        workers: usize,
        input: mpsc::Receiver<W::Input>,
        output: Option<mpsc::Sender<W::Output>>,
        completions: CompletionSender,
        task_timeout: Duration,
    ) -> Self {
        let stage = worker.stage();
        let input = Arc::new(Mutex::new(input));
        let handles = (0..workers.max(1))
            .map(|id| {
                let worker = worker.clone();
                let input = input.clone();
                let output = output.clone();
                let completions = completions.clone();
                tokio::spawn(async move {
                    run_worker(id, worker, input, output, completions, task_timeout).await;
                })
            })
            .collect();

        Self { stage, handles }
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool has no workers.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("{} worker terminated abnormally: {}", self.stage, e);
            }
        }
    }
}

async fn run_worker<W: StageWorker>(
    id: usize,
    worker: Arc<W>,
    input: Arc<Mutex<mpsc::Receiver<W::Input>>>,
    output: Option<mpsc::Sender<W::Output>>,
    completions: CompletionSender,
    task_timeout: Duration,
) {
    let stage = worker.stage();
    loop {
        // Only the lock holder waits on the queue; the others wait on the lock.
        let item = { input.lock().await.recv().await };
        let Some(item) = item else {
            break;
        };

        let path = worker.task_path(&item);
        let outcome = match run_task(&worker, item, &path, task_timeout).await {
            Ok(step) => {
                let (outcome, value) = match step {
                    Step::Processed(value) => (TaskOutcome::Processed, value),
                    Step::Skipped(value) => (TaskOutcome::Skipped, value),
                };
                if let Some(tx) = &output {
                    if tx.send(value).await.is_err() {
                        tracing::warn!("{} output closed, dropping result for {:?}", stage, path);
                    }
                }
                outcome
            }
            Err(e) => {
                tracing::warn!("{}", e);
                TaskOutcome::Failed
            }
        };

        completions.send(Completion {
            worker: id,
            path,
            outcome,
        });
    }
    tracing::trace!("{} worker {} exhausted", stage, id);
}

/// Run one task on the blocking pool under the task timeout.
///
/// A timed-out task keeps running on its blocking thread until it reaches
/// [`TaskToken::commit`], which then fails, so it never writes anything and
/// counts as failed. A task that committed before the deadline is awaited.
async fn run_task<W: StageWorker>(
    worker: &Arc<W>,
    item: W::Input,
    path: &Path,
    task_timeout: Duration,
) -> Result<Step<W::Output>, PipelineError> {
    let stage = worker.stage();
    let worker = worker.clone();
    let token = TaskToken::new(task_timeout);
    let task_token = token.clone();
    let mut handle = tokio::task::spawn_blocking(move || worker.process(item, &task_token));

    let joined = match timeout(task_timeout, &mut handle).await {
        Ok(joined) => joined,
        Err(_) if token.abandon() => return Err(token.timeout_error(stage, path)),
        // Already writing; its result has to be counted.
        Err(_) => handle.await,
    };

    match joined {
        Ok(step) => step,
        Err(e) => Err(PipelineError::Worker {
            path: path.to_path_buf(),
            stage: stage.to_string(),
            message: e.to_string(),
        }),
    }
}
