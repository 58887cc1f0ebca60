use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use log::debug;
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::error::Error;

pub type Job = BoxFuture<'static, ()>;

/// Somewhere to run jobs. Implementations decide how many run at once and in which order.
pub trait TaskQueue: Send + Sync {
    fn submit(&self, job: Job) -> Result<(), Error>;

    /// Stops accepting jobs. Already queued jobs still run. Calling it twice is harmless.
    fn shutdown(&self);

    /// Stops accepting jobs and drops queued and running ones.
    fn abort(&self);
}

// state shared by the tokio backed queues
struct Workers {
    sender: Mutex<Option<UnboundedSender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Workers {
    fn new(sender: UnboundedSender<Job>, handles: Vec<JoinHandle<()>>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
        }
    }

    fn submit(&self, job: Job) -> Result<(), Error> {
        match lock(&self.sender).as_ref() {
            Some(sender) => sender.send(job).map_err(|_| Error::Shutdown),
            None => Err(Error::Shutdown),
        }
    }

    fn shutdown(&self) {
        // workers leave their loop once the channel is drained
        if lock(&self.sender).take().is_some() {
            debug!("task queue shut down");
        }
    }

    fn abort(&self) {
        self.shutdown();
        for handle in lock(&self.handles).drain(..) {
            handle.abort();
        }
    }
}

/// One worker draining the queue in submission order. Jobs never overlap.
pub struct SingleWorker {
    workers: Workers,
}

impl SingleWorker {
    /// Spawns the worker on the current tokio runtime.
    pub fn new() -> Result<Self, Error> {
        Ok(Self::spawn_on(&Handle::try_current()?))
    }

    pub fn spawn_on(runtime: &Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let handle = runtime.spawn(async move {
            while let Some(job) = receiver.recv().await {
                job.await;
            }
            debug!("worker stopped");
        });

        Self {
            workers: Workers::new(sender, vec![handle]),
        }
    }
}

impl TaskQueue for SingleWorker {
    fn submit(&self, job: Job) -> Result<(), Error> {
        self.workers.submit(job)
    }

    fn shutdown(&self) {
        self.workers.shutdown()
    }

    fn abort(&self) {
        self.workers.abort()
    }
}

/// `size` workers sharing one queue.
///
/// Jobs start in submission order but run concurrently, so nothing orders
/// their completion. Callers that need ordering between two calls must wait
/// for the first before submitting the second.
pub struct WorkerPool {
    workers: Workers,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, Error> {
        Ok(Self::spawn_on(&Handle::try_current()?, size))
    }

    pub fn spawn_on(runtime: &Handle, size: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Job>>> =
            Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..size.max(1))
            .map(|index| {
                let receiver = receiver.clone();
                runtime.spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        match job {
                            Some(job) => job.await,
                            None => break,
                        }
                    }
                    debug!("pool worker {} stopped", index);
                })
            })
            .collect();

        Self {
            workers: Workers::new(sender, handles),
        }
    }
}

impl TaskQueue for WorkerPool {
    fn submit(&self, job: Job) -> Result<(), Error> {
        self.workers.submit(job)
    }

    fn shutdown(&self) {
        self.workers.shutdown()
    }

    fn abort(&self) {
        self.workers.abort()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;
    use tokio::sync::oneshot;

    use super::*;

    fn recording_job(log: &Arc<Mutex<Vec<usize>>>, index: usize) -> Job {
        let log = log.clone();
        async move {
            // yield so a second worker would get the chance to overtake
            tokio::task::yield_now().await;
            lock(&log).push(index);
        }
        .boxed()
    }

    #[tokio::test]
    async fn single_worker_runs_jobs_in_submission_order() {
        let queue = SingleWorker::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        for index in 0..20 {
            queue.submit(recording_job(&log, index)).unwrap();
        }

        let (done, wait) = oneshot::channel();
        queue
            .submit(
                async move {
                    let _ = done.send(());
                }
                .boxed(),
            )
            .unwrap();
        wait.await.unwrap();

        assert_eq!(*lock(&log), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_jobs_but_drains_queued_ones() {
        let queue = SingleWorker::new().unwrap();
        let (done, wait) = oneshot::channel();

        queue
            .submit(
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    let _ = done.send(());
                }
                .boxed(),
            )
            .unwrap();
        queue.shutdown();
        queue.shutdown();

        assert!(matches!(
            queue.submit(async {}.boxed()),
            Err(Error::Shutdown)
        ));
        assert!(wait.await.is_ok());
    }

    #[tokio::test]
    async fn abort_drops_queued_jobs() {
        let queue = SingleWorker::new().unwrap();
        let (blocker_done, blocker_wait) = oneshot::channel::<()>();
        let (queued_done, queued_wait) = oneshot::channel::<()>();

        queue
            .submit(
                async move {
                    futures::future::pending::<()>().await;
                    let _ = blocker_done.send(());
                }
                .boxed(),
            )
            .unwrap();
        queue
            .submit(
                async move {
                    let _ = queued_done.send(());
                }
                .boxed(),
            )
            .unwrap();
        queue.abort();

        assert!(blocker_wait.await.is_err());
        assert!(queued_wait.await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pool_runs_jobs_concurrently() {
        let pool = WorkerPool::new(2).unwrap();
        let (first_sender, first_receiver) = oneshot::channel::<()>();
        let (done, wait) = oneshot::channel();

        // the first job only finishes when the second one has run
        pool.submit(
            async move {
                let _ = first_receiver.await;
                let _ = done.send(());
            }
            .boxed(),
        )
        .unwrap();
        pool.submit(
            async move {
                let _ = first_sender.send(());
            }
            .boxed(),
        )
        .unwrap();

        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("pool deadlocked")
            .unwrap();
    }
}
