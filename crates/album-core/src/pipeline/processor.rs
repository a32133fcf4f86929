//! Pipeline orchestration - wires the walker, worker pools and trackers together.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{Config, PipelineMode};
use crate::error::{PipelineError, Result};
use crate::store::MetaStore;
use crate::types::{FileDescriptor, HashedFile};

use super::channel::{bounded_channel, WorkerPool};
use super::completion::{completion_channel, StageSummary};
use super::discovery::Walker;
use super::hash::HashStage;
use super::thumbnail::ThumbnailStage;

/// Outcome of a full run.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    /// Photos found by the walker
    pub discovered: usize,
    /// Hash stage tally
    pub hashing: StageSummary,
    /// Thumbnail stage tally
    pub thumbnails: StageSummary,
}

/// Runs the walk → hash → thumbnail pipeline over one root.
pub struct Pipeline {
    config: Config,
    store: Arc<MetaStore>,
    walker: Walker,
}

impl Pipeline {
    /// Create a pipeline for `root`.
    ///
    /// With `dry_run` set, everything is computed but nothing is written.
    pub fn new(config: Config, root: impl Into<PathBuf>, dry_run: bool) -> Self {
        let store = Arc::new(MetaStore::new(root, &config.store.meta_dir, dry_run));
        let walker =
            Walker::new(&config.processing, &config.walk).exclude(store.meta_root());
        Self {
            config,
            store,
            walker,
        }
    }

    /// The metadata store this pipeline writes to.
    pub fn store(&self) -> &MetaStore {
        &self.store
    }

    /// Run every stage to completion.
    ///
    /// Fails up front if the root can't be listed. Per-file problems are
    /// logged and counted in the report; the only other error is a stage
    /// whose completions don't add up to what was dispatched.
    pub async fn run(&self) -> Result<RunReport> {
        Walker::check_root(self.store.root())?;

        tracing::info!("Root: {:?}", self.store.root());
        tracing::info!("Meta dir: {:?}", self.store.meta_root());
        tracing::debug!(
            "{} workers per stage, {} mode{}",
            self.config.processing.workers,
            self.config.pipeline.mode,
            if self.store.is_dry_run() { ", dry run" } else { "" }
        );

        let report = match self.config.pipeline.mode {
            PipelineMode::Staged => self.run_staged().await?,
            PipelineMode::Streaming => self.run_streaming().await?,
        };

        tracing::info!(
            "Done: {} photos; {}; {}",
            report.discovered,
            report.hashing,
            report.thumbnails
        );
        Ok(report)
    }

    /// Hash everything, then thumbnail everything that hashed.
    async fn run_staged(&self) -> Result<RunReport> {
        let (file_tx, file_rx) = bounded_channel(&self.config.pipeline);
        let (hashed_tx, mut hashed_rx) = bounded_channel::<HashedFile>(&self.config.pipeline);
        let (hash_done, hash_tracker) = completion_channel("hash");

        let walk = self.spawn_walk(file_tx);
        let hash_pool = WorkerPool::spawn(
            Arc::new(HashStage::new(self.store.clone())),
            self.config.processing.workers,
            file_rx,
            Some(hashed_tx),
            hash_done,
            self.task_timeout(),
        );

        // Sole owner of the hashed results while the pool writes them.
        let collector = tokio::spawn(async move {
            let mut hashed = Vec::new();
            while let Some(file) = hashed_rx.recv().await {
                hashed.push(file);
            }
            hashed
        });

        let hashing = hash_tracker.wait().await;
        hash_pool.join().await;
        let discovered = self.join_feeder("walk", walk).await?;
        hashing.verify(discovered)?;
        tracing::info!("{}", hashing);

        let hashed = collector.await.map_err(|e| self.join_error("hash", e))?;

        let (task_tx, task_rx) = bounded_channel(&self.config.pipeline);
        let (thumb_done, thumb_tracker) = completion_channel("thumbnail");

        let feed: JoinHandle<usize> = tokio::spawn(async move {
            let mut dispatched = 0;
            for file in hashed {
                if task_tx.send(file).await.is_err() {
                    break;
                }
                dispatched += 1;
            }
            dispatched
        });
        let thumb_pool = WorkerPool::spawn(
            self.thumbnail_stage(),
            self.config.processing.workers,
            task_rx,
            None,
            thumb_done,
            self.task_timeout(),
        );

        let thumbnails = thumb_tracker.wait().await;
        thumb_pool.join().await;
        let dispatched = self.join_feeder("thumbnail", feed).await?;
        thumbnails.verify(dispatched)?;
        tracing::info!("{}", thumbnails);

        Ok(RunReport {
            discovered,
            hashing,
            thumbnails,
        })
    }

    /// Run all three stages at once; hashed files flow straight into the
    /// thumbnail pool.
    async fn run_streaming(&self) -> Result<RunReport> {
        let (file_tx, file_rx) = bounded_channel(&self.config.pipeline);
        let (hashed_tx, hashed_rx) = bounded_channel(&self.config.pipeline);
        let (hash_done, hash_tracker) = completion_channel("hash");
        let (thumb_done, thumb_tracker) = completion_channel("thumbnail");

        let walk = self.spawn_walk(file_tx);
        let hash_pool = WorkerPool::spawn(
            Arc::new(HashStage::new(self.store.clone())),
            self.config.processing.workers,
            file_rx,
            Some(hashed_tx),
            hash_done,
            self.task_timeout(),
        );
        let thumb_pool = WorkerPool::spawn(
            self.thumbnail_stage(),
            self.config.processing.workers,
            hashed_rx,
            None,
            thumb_done,
            self.task_timeout(),
        );

        let hashing = hash_tracker.wait().await;
        hash_pool.join().await;
        let discovered = self.join_feeder("walk", walk).await?;
        hashing.verify(discovered)?;
        tracing::info!("{}", hashing);

        let thumbnails = thumb_tracker.wait().await;
        thumb_pool.join().await;
        thumbnails.verify(hashing.forwarded())?;
        tracing::info!("{}", thumbnails);

        Ok(RunReport {
            discovered,
            hashing,
            thumbnails,
        })
    }

    /// Walk the tree on the blocking pool, feeding `tx`. Resolves to the
    /// number of descriptors sent.
    fn spawn_walk(&self, tx: mpsc::Sender<FileDescriptor>) -> JoinHandle<usize> {
        let files = self.walker.walk(self.store.root());
        tokio::task::spawn_blocking(move || {
            let mut dispatched = 0;
            for file in files {
                tracing::trace!("Found {:?}", file.path);
                if tx.blocking_send(file).is_err() {
                    break;
                }
                dispatched += 1;
            }
            dispatched
        })
    }

    fn thumbnail_stage(&self) -> Arc<ThumbnailStage> {
        Arc::new(ThumbnailStage::new(
            self.store.clone(),
            self.config.thumbnail.clone(),
            self.config.limits.clone(),
        ))
    }

    fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.config.limits.task_timeout_ms)
    }

    async fn join_feeder(&self, stage: &str, handle: JoinHandle<usize>) -> Result<usize> {
        handle.await.map_err(|e| self.join_error(stage, e).into())
    }

    fn join_error(&self, stage: &str, e: tokio::task::JoinError) -> PipelineError {
        PipelineError::Worker {
            path: self.store.root().to_path_buf(),
            stage: stage.to_string(),
            message: e.to_string(),
        }
    }
}
