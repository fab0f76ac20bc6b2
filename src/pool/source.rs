use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::http::TaskSpec;

/// Where workers get their next request from.
#[derive(Debug, Clone)]
pub enum TaskSource {
    /// Every worker repeats the same task until cancelled.
    Uniform(Arc<TaskSpec>),
    /// Workers pop from a shared FIFO until it is closed and empty.
    Queued(TaskQueue),
}

impl TaskSource {
    #[must_use]
    pub fn uniform(task: TaskSpec) -> Self {
        TaskSource::Uniform(Arc::new(task))
    }

    /// Creates a bounded queue source and the feeder that fills it. The
    /// queue closes once every feeder clone is dropped.
    #[must_use]
    pub fn queued(capacity: usize) -> (TaskFeeder, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = TaskQueue {
            rx: Arc::new(Mutex::new(rx)),
        };
        (TaskFeeder { tx }, TaskSource::Queued(queue))
    }

    /// `None` means the worker should exit: cancelled, or the queue is done.
    pub(super) async fn next_task(&self, token: &CancellationToken) -> Option<Arc<TaskSpec>> {
        match self {
            TaskSource::Uniform(task) => Some(Arc::clone(task)),
            TaskSource::Queued(queue) => {
                tokio::select! {
                    () = token.cancelled() => None,
                    task = queue.pop() => task,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskQueue {
    rx: Arc<Mutex<mpsc::Receiver<Arc<TaskSpec>>>>,
}

impl TaskQueue {
    async fn pop(&self) -> Option<Arc<TaskSpec>> {
        self.rx.lock().await.recv().await
    }

    #[cfg(test)]
    pub(crate) async fn lock_receiver(
        &self,
    ) -> tokio::sync::MutexGuard<'_, mpsc::Receiver<Arc<TaskSpec>>> {
        self.rx.lock().await
    }
}

/// Producer side of a queued source.
#[derive(Debug, Clone)]
pub struct TaskFeeder {
    tx: mpsc::Sender<Arc<TaskSpec>>,
}

impl TaskFeeder {
    /// Waits for queue space. Returns `false` once every worker has gone.
    pub async fn push(&self, task: Arc<TaskSpec>) -> bool {
        self.tx.send(task).await.is_ok()
    }
}
