//! Bounded worker pool for webhook-triggered diagnosis sessions.
//!
//! Capacity is `pool_size` running jobs plus `queue_depth` jobs waiting for a
//! worker. When both are full the submitting task runs the job itself, which
//! slows the ingress path down instead of dropping an alert.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::errors::DispatchError;
use crate::domain::models::config::DispatcherConfig;

/// Where a submitted job ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Started immediately on a free worker.
    Spawned,
    /// Waiting for a worker in the backing queue.
    Queued,
    /// Pool and queue were saturated; the job already ran in the caller.
    RanInCaller,
}

/// Result of a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownSummary {
    pub finished: usize,
    pub aborted: usize,
}

pub struct Dispatcher {
    workers: Arc<Semaphore>,
    queue: Arc<Semaphore>,
    accepting: AtomicBool,
    tasks: Mutex<JoinSet<()>>,
    pool_size: usize,
    shutdown_timeout: Duration,
}

impl Dispatcher {
    pub fn new(config: &DispatcherConfig) -> Self {
        info!(
            pool_size = config.pool_size,
            queue_depth = config.queue_depth,
            "dispatcher started"
        );
        Self {
            workers: Arc::new(Semaphore::new(config.pool_size)),
            queue: Arc::new(Semaphore::new(config.queue_depth)),
            accepting: AtomicBool::new(true),
            tasks: Mutex::new(JoinSet::new()),
            pool_size: config.pool_size,
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Jobs currently running on a worker.
    pub fn busy_workers(&self) -> usize {
        self.pool_size - self.workers.available_permits()
    }

    /// Spawned or queued jobs that have not finished yet.
    pub async fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        reap(&mut tasks);
        tasks.len()
    }

    /// Submit a job.
    ///
    /// Returns once the job is spawned or queued, or, under saturation, once
    /// the caller has finished running it.
    pub async fn submit<F>(&self, job: F) -> Result<Submission, DispatchError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.is_accepting() {
            return Err(DispatchError::ShuttingDown);
        }

        if let Ok(worker) = Arc::clone(&self.workers).try_acquire_owned() {
            self.spawn(async move {
                let _worker = worker;
                job.await;
            })
            .await?;
            debug!("job spawned on worker");
            return Ok(Submission::Spawned);
        }

        if let Ok(slot) = Arc::clone(&self.queue).try_acquire_owned() {
            let workers = Arc::clone(&self.workers);
            self.spawn(async move {
                let worker = workers.acquire_owned().await;
                drop(slot);
                match worker {
                    Ok(_worker) => job.await,
                    Err(_) => warn!("worker pool closed; queued job dropped"),
                }
            })
            .await?;
            debug!("job queued");
            return Ok(Submission::Queued);
        }

        warn!(
            pool_size = self.pool_size,
            "dispatcher saturated; running job in the submitting task"
        );
        job.await;
        Ok(Submission::RanInCaller)
    }

    /// Checked again under the `tasks` lock: `shutdown` may have taken the
    /// set since `submit` looked at the flag.
    async fn spawn<F>(&self, fut: F) -> Result<(), DispatchError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        if !self.is_accepting() {
            return Err(DispatchError::ShuttingDown);
        }
        reap(&mut tasks);
        tasks.spawn(fut);
        Ok(())
    }

    /// Stop accepting jobs and wait up to the configured timeout for spawned
    /// and queued jobs; whatever is still running afterwards is aborted.
    pub async fn shutdown(&self) -> ShutdownSummary {
        let mut tasks = {
            let mut guard = self.tasks.lock().await;
            self.accepting.store(false, Ordering::SeqCst);
            std::mem::take(&mut *guard)
        };
        let pending = tasks.len();
        if pending == 0 {
            info!("dispatcher stopped; nothing in flight");
            return ShutdownSummary::default();
        }

        info!(
            in_flight = pending,
            timeout_secs = self.shutdown_timeout.as_secs(),
            "waiting for in-flight sessions"
        );

        let mut finished = 0usize;
        let drain = async {
            while let Some(result) = tasks.join_next().await {
                finished += 1;
                if let Err(err) = result {
                    if err.is_panic() {
                        warn!(error = %err, "diagnosis job panicked");
                    }
                }
            }
        };

        let outcome = tokio::time::timeout(self.shutdown_timeout, drain).await;
        let aborted = match outcome {
            Ok(()) => {
                info!(finished, "all in-flight sessions finished");
                0
            }
            Err(_) => {
                let remaining = tasks.len();
                warn!(remaining, "shutdown timeout reached; aborting remaining sessions");
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                remaining
            }
        };

        self.workers.close();
        ShutdownSummary { finished, aborted }
    }
}

fn reap(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(err) = result {
            if err.is_panic() {
                warn!(error = %err, "diagnosis job panicked");
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool_size", &self.pool_size)
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}
