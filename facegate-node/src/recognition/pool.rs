//! Recognition worker pool
//!
//! Fixed set of OS threads fed from a bounded job queue. Each job answers
//! on its own oneshot channel, so callers simply `await` the result while
//! the async runtime keeps serving other requests. Submitting to a full
//! queue waits for room instead of failing.
//!
//! There is no cancellation: dropping the awaiting future does not stop a
//! job that a worker has already picked up.

use facegate_common::{Error, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct RecognitionPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl RecognitionPool {
    /// Start `workers` threads behind a queue of `queue_capacity` jobs
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("recognition-{}", worker_id))
                    .spawn(move || Self::worker_loop(worker_id, receiver))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!("Failed to spawn recognition worker: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        info!("Recognition pool started with {} worker threads", handles.len());

        Self {
            sender: Mutex::new(Some(sender)),
            size: handles.len(),
            workers: Mutex::new(handles),
        }
    }

    /// Number of running worker threads
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` on a worker and wait for its result
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let sender = self
            .lock_sender()
            .clone()
            .ok_or_else(|| Error::Recognition("Recognition pool is shut down".to_string()))?;

        let (reply, response) = oneshot::channel();
        let boxed: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            // The submitter may have gone away; nothing to do then
            let _ = reply.send(result);
        });

        sender
            .send(boxed)
            .await
            .map_err(|_| Error::Recognition("Recognition pool is closed".to_string()))?;

        match response.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => {
                error!("Recognition job panicked");
                Err(Error::Recognition("Recognition job panicked".to_string()))
            }
            Err(_) => Err(Error::Recognition(
                "Recognition worker dropped the job".to_string(),
            )),
        }
    }

    /// Close the queue and wait for the workers to drain it and exit
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let sender = self.lock_sender().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let handles: Vec<JoinHandle<()>> = match self.workers.lock() {
            Ok(mut workers) => workers.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };

        let joined = tokio::task::spawn_blocking(move || {
            for handle in handles {
                if handle.join().is_err() {
                    warn!("Recognition worker exited abnormally");
                }
            }
        })
        .await;

        if let Err(e) = joined {
            warn!("Failed to join recognition workers: {}", e);
        }

        info!("Recognition pool stopped");
    }

    fn worker_loop(worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) {
        debug!("Recognition worker {} started", worker_id);

        loop {
            let job = {
                let mut receiver = match receiver.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                receiver.blocking_recv()
            };

            match job {
                Some(job) => job(),
                None => break,
            }
        }

        debug!("Recognition worker {} stopped", worker_id);
    }

    fn lock_sender(&self) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<Job>>> {
        self.sender.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_job_off_the_runtime() {
        let pool = RecognitionPool::new(2, 4);
        assert_eq!(pool.size(), 2);
        assert_eq!(RecognitionPool::new(0, 0).size(), 1);
        let name = pool
            .run(|| thread::current().name().map(str::to_string))
            .await
            .unwrap();

        assert!(name.unwrap().starts_with("recognition-"));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_many_concurrent_jobs_complete() {
        let pool = Arc::new(RecognitionPool::new(2, 1));
        let done = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16u64)
            .map(|i| {
                let pool = Arc::clone(&pool);
                let done = Arc::clone(&done);
                tokio::spawn(async move {
                    let value = pool
                        .run(move || {
                            thread::sleep(Duration::from_millis(2));
                            i * 2
                        })
                        .await
                        .unwrap();
                    done.fetch_add(1, Ordering::SeqCst);
                    value
                })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }
        results.sort_unstable();

        assert_eq!(done.load(Ordering::SeqCst), 16);
        assert_eq!(results, (0..16u64).map(|i| i * 2).collect::<Vec<_>>());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_job_is_a_fault_and_pool_survives() {
        let pool = RecognitionPool::new(1, 2);

        let result = pool.run(|| -> u32 { panic!("engine blew up") }).await;
        assert!(matches!(result, Err(Error::Recognition(_))));

        assert_eq!(pool.run(|| 5u32).await.unwrap(), 5);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_after_shutdown_fails() {
        let pool = RecognitionPool::new(1, 1);
        pool.shutdown().await;
        pool.shutdown().await;

        let result = pool.run(|| 1).await;
        assert!(matches!(result, Err(Error::Recognition(_))));
    }
}
