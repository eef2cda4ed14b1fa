//! Worker Pool
//!
//! Fixed set of workers draining a bounded job queue. Submissions never wait
//! for queue space: a full backlog is reported to the caller immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};

/// Unit of work accepted by a [`TaskRunner`].
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

// == Pool Error ==
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool backlog is full")]
    Saturated,

    #[error("worker pool is shut down")]
    Closed,
}

// == Task Runner ==
/// Fire-and-forget execution facility. The caller never observes the job's outcome.
pub trait TaskRunner: Send + Sync {
    /// Queues `job` without waiting. Fails if the job cannot be accepted right now.
    fn run_async(&self, job: Job) -> std::result::Result<(), PoolError>;
}

// == Worker Pool ==
/// Bounded pool shared by request handling and touch dispatch.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawns `workers` workers over a queue holding at most `backlog` pending jobs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(workers: usize, backlog: usize) -> Self {
        let size = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(backlog.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..size)
            .map(|id| tokio::spawn(worker_loop(id, receiver.clone())))
            .collect();

        info!("Worker pool started: {} workers, backlog {}", size, backlog.max(1));

        Self {
            sender,
            workers: Arc::new(Mutex::new(handles)),
            size,
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs waiting in the queue.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    // == Try Submit ==
    /// Queues a job, failing immediately when the backlog is full.
    pub fn try_submit(&self, job: Job) -> std::result::Result<(), PoolError> {
        self.sender.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => PoolError::Saturated,
            mpsc::error::TrySendError::Closed(_) => PoolError::Closed,
        })
    }

    // == Run ==
    /// Runs `fut` on a worker and waits for its result.
    ///
    /// A saturated queue yields `ServerBusy` instead of waiting for space.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            // Receiver gone means the client went away
            let _ = tx.send(fut.await);
        });

        self.try_submit(job).map_err(|err| match err {
            PoolError::Saturated => SessionError::ServerBusy(err.to_string()),
            PoolError::Closed => SessionError::Internal(err.to_string()),
        })?;

        rx.await
            .map_err(|_| SessionError::Internal("worker dropped the request".to_string()))?
    }

    // == Shutdown ==
    /// Stops every worker. Jobs still queued are dropped.
    pub fn shutdown(&self) {
        if let Ok(mut workers) = self.workers.lock() {
            for handle in workers.drain(..) {
                handle.abort();
            }
        }
        info!("Worker pool stopped");
    }
}

impl TaskRunner for WorkerPool {
    fn run_async(&self, job: Job) -> std::result::Result<(), PoolError> {
        self.try_submit(job)
    }
}

async fn worker_loop(id: usize, receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = {
            let mut guard = receiver.lock().await;
            guard.recv().await
        };

        let Some(job) = job else {
            break;
        };

        // Run as its own task so a panicking job does not take the worker down
        if let Err(err) = tokio::spawn(job).await {
            warn!("Worker {} job failed: {}", id, err);
        }
    }
    debug!("Worker {} exiting", id);
}
