// src/services/tasks.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundTask {
    FetchNews,
    FetchPapers,
}

impl BackgroundTask {
    pub fn slug(&self) -> &'static str {
        match self {
            BackgroundTask::FetchNews => "fetch-news",
            BackgroundTask::FetchPapers => "fetch-papers",
        }
    }
}

impl fmt::Display for BackgroundTask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub id: u64,
    pub task: BackgroundTask,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
#[error("background worker is not running; {0} was dropped")]
pub struct QueueClosed(pub BackgroundTask);

/// Sending half of the in-memory background queue. Nothing is persisted:
/// queued work disappears with the process.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<QueuedTask>,
    next_id: Arc<AtomicU64>,
}

/// Receiving half. `run` drains tasks one at a time until every queue handle
/// is dropped.
pub struct TaskWorker {
    rx: mpsc::UnboundedReceiver<QueuedTask>,
}

impl TaskQueue {
    pub fn channel() -> (TaskQueue, TaskWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            TaskQueue {
                tx,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            TaskWorker { rx },
        )
    }

    pub fn enqueue(&self, task: BackgroundTask) -> Result<u64, QueueClosed> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tx
            .send(QueuedTask {
                id,
                task,
                enqueued_at: Utc::now(),
            })
            .map_err(|_| QueueClosed(task))?;
        info!("Queued background task {} #{}", task, id);
        Ok(id)
    }
}

/// What the worker does with each task it takes off the queue.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, queued: &QueuedTask) -> Result<()>;
}

/// Logs the start and end of each fetch.
pub struct LoggingHandler;

#[async_trait]
impl TaskHandler for LoggingHandler {
    async fn handle(&self, queued: &QueuedTask) -> Result<()> {
        match queued.task {
            BackgroundTask::FetchNews => {
                info!("Fetching AI news in background (task #{})", queued.id);
                info!("News fetch completed (task #{})", queued.id);
            }
            BackgroundTask::FetchPapers => {
                info!("Fetching research papers in background (task #{})", queued.id);
                info!("Research papers fetch completed (task #{})", queued.id);
            }
        }
        Ok(())
    }
}

impl TaskWorker {
    /// Runs tasks one at a time. Each runs in its own tokio task, so an error
    /// or a panic is logged and the queue stays open.
    pub async fn run(mut self, handler: Arc<dyn TaskHandler>) {
        info!("Background worker started");
        while let Some(queued) = self.rx.recv().await {
            let waited = Utc::now() - queued.enqueued_at;
            info!(
                "Starting {} #{} after {} ms in queue",
                queued.task,
                queued.id,
                waited.num_milliseconds()
            );
            let (task, id) = (queued.task, queued.id);
            let handler = handler.clone();
            match tokio::spawn(async move { handler.handle(&queued).await }).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Background task {} #{} failed: {:#}", task, id, e),
                Err(e) => error!("Background task {} #{} aborted: {}", task, id, e),
            }
        }
        info!("Background worker stopped");
    }

    /// Takes the next queued task without running it.
    pub fn try_next(&mut self) -> Option<QueuedTask> {
        self.rx.try_recv().ok()
    }
}
