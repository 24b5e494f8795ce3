//! Fixed-size worker pool.
//!
//! A fixed number of long-lived workers share one unbounded FIFO queue. Each
//! worker runs a job to completion before taking the next one, so the pool
//! size bounds how many connections are handled at once; the rest wait in
//! the queue.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

type SharedQueue<T> = Arc<Mutex<mpsc::UnboundedReceiver<T>>>;

pub struct WorkerPool<T> {
    queue: mpsc::UnboundedSender<T>,
    workers: Vec<JoinHandle<()>>,
}

impl<T> WorkerPool<T>
where
    T: Send + 'static,
{
    /// Spawn `size` workers that pass every dequeued job to `handler`.
    pub fn new<H, Fut>(size: usize, handler: H) -> Self
    where
        H: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue: SharedQueue<T> = Arc::new(Mutex::new(rx));
        let handler = Arc::new(handler);

        let workers = (0..size)
            .map(|index| {
                let queue = Arc::clone(&queue);
                let handler = Arc::clone(&handler);
                tokio::spawn(worker_loop(index, queue, handler))
            })
            .collect();

        tracing::info!(workers = size, "Worker pool started");
        Self { queue: tx, workers }
    }

    /// Append a job and wake one idle worker.
    pub fn enqueue(&self, job: T) {
        if self.queue.send(job).is_err() {
            // Only reachable once every worker has died; the job is dropped.
            tracing::error!("No live workers left, dropping job");
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue and wait for every worker to exit.
    ///
    /// Jobs still queued are handled before the workers stop.
    pub async fn shutdown(self) {
        let Self { queue, workers } = self;
        drop(queue);

        for (index, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                tracing::error!(worker = index, error = %e, "Worker terminated abnormally");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}

async fn worker_loop<T, H, Fut>(index: usize, queue: SharedQueue<T>, handler: Arc<H>)
where
    H: Fn(T) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        // The lock is released before the job runs.
        let next = queue.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        handler(job).await;
    }
    tracing::debug!(worker = index, "Worker exiting");
}
