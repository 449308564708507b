//! Background executors for frame loads
//!
//! Loads are fire-and-forget: a job decodes one frame and writes its slot.
//! `Workers` spreads jobs over a work-stealing thread pool; `InlineExecutor`
//! runs them on the calling thread (deterministic tests, `--sync-load`).

use crossbeam::deque::{Injector, Stealer, Worker};
use log::trace;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Boxed load job
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Anything that can run load jobs.
pub trait LoadExecutor: Send + Sync {
    /// Run `job` at some point in the future. Must not block on the job.
    fn spawn(&self, job: Job);
}

impl<T: LoadExecutor + ?Sized> LoadExecutor for Arc<T> {
    fn spawn(&self, job: Job) {
        (**self).spawn(job)
    }
}

/// Runs every job immediately on the caller's thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl LoadExecutor for InlineExecutor {
    fn spawn(&self, job: Job) {
        job();
    }
}

/// Work-stealing thread pool.
///
/// New jobs go to a global injector; idle workers steal from each other.
/// Dropping the pool signals shutdown and waits briefly for threads to exit.
pub struct Workers {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for Workers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workers")
            .field("threads", &self.handles.len())
            .finish()
    }
}

impl Workers {
    /// Create a pool with `num_threads` workers (at least one).
    ///
    /// Recommended: `num_cpus::get() * 3 / 4`, leaving room for the tick thread.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let locals: Vec<Worker<Job>> = (0..num_threads).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<Stealer<Job>> = locals.iter().map(|w| w.stealer()).collect();

        let mut handles = Vec::with_capacity(num_threads);
        for (worker_id, local) in locals.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);
            let stealers = stealers.clone();

            let spawned = thread::Builder::new()
                .name(format!("framescrub-loader-{}", worker_id))
                .spawn(move || worker_loop(worker_id, local, injector, stealers, shutdown));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => log::error!("Failed to spawn loader thread {}: {}", worker_id, e),
            }
        }

        trace!("Workers initialized: {} threads", handles.len());

        Self {
            injector,
            handles,
            shutdown,
        }
    }

    /// Number of live worker threads
    pub fn threads(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop(
    worker_id: usize,
    local: Worker<Job>,
    injector: Arc<Injector<Job>>,
    stealers: Vec<Stealer<Job>>,
    shutdown: Arc<AtomicBool>,
) {
    trace!("Loader {} started", worker_id);
    loop {
        if let Some(job) = local.pop() {
            run_job(worker_id, job);
            continue;
        }

        // Refill the local queue from the injector before stealing from peers
        if let Some(job) = injector.steal_batch_and_pop(&local).success() {
            run_job(worker_id, job);
            continue;
        }

        if let Some(job) = stealers.iter().find_map(|s| s.steal().success()) {
            run_job(worker_id, job);
            continue;
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        thread::sleep(Duration::from_millis(1));
    }
    trace!("Loader {} stopped", worker_id);
}

/// A panicking decode must not take the loader thread down with it
fn run_job(worker_id: usize, job: Job) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
        log::error!("Loader {} job panicked: {:?}", worker_id, e);
    }
}

impl LoadExecutor for Workers {
    fn spawn(&self, job: Job) {
        // With no threads the job would never run; run it here instead
        if self.handles.is_empty() {
            job();
            return;
        }
        self.injector.push(job);
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);

        self.shutdown.store(true, Ordering::SeqCst);

        // A stalled decode must not hang teardown; unfinished threads die with the process
        let deadline = Instant::now() + Duration::from_millis(500);
        for handle in std::mem::take(&mut self.handles) {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, detaching remaining loaders");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }

        trace!("All {} loaders stopped", num_threads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_inline_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        InlineExecutor.spawn(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_workers_run_all_jobs() {
        let workers = Workers::new(3);
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..50usize {
            let tx = tx.clone();
            workers.spawn(Box::new(move || {
                let _ = tx.send(i);
            }));
        }
        drop(tx);

        let mut seen: Vec<usize> = (0..50)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("job did not run"))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_worker_survives_panicking_job() {
        let workers = Workers::new(1);
        let (tx, rx) = crossbeam_channel::unbounded();
        workers.spawn(Box::new(|| panic!("bad frame")));
        workers.spawn(Box::new(move || {
            let _ = tx.send(42);
        }));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_zero_threads_clamped_to_one() {
        let workers = Workers::new(0);
        assert_eq!(workers.threads(), 1);
    }

    #[test]
    fn test_arc_executor_delegates() {
        let exec: Arc<dyn LoadExecutor> = Arc::new(InlineExecutor);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        exec.spawn(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
