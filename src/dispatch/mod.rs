//! Executors for callback delivery.
//!
//! Progress and completion callbacks run on the *primary* executor; parse
//! steps run on the *worker* executor. The state machine only ever submits
//! jobs, it never assumes a particular threading runtime.

mod blocking;
mod queue;
mod serial;

pub use blocking::BlockingExecutor;
pub use queue::MainQueue;
pub use serial::SerialExecutor;

use std::fmt;
use std::sync::Arc;

/// A unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted jobs later, in submission order.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

/// Runs every job immediately on the submitting thread.
///
/// Useful as a worker executor in tests, never as a primary one: delivering
/// a callback from inside the transport's event handler would break the
/// ordering the primary executor provides.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job()
    }
}

/// The primary/worker executor pair a connection delivers through.
#[derive(Clone)]
pub struct Dispatcher {
    primary: Arc<dyn Executor>,
    worker: Arc<dyn Executor>,
}

impl Dispatcher {
    pub fn new(primary: Arc<dyn Executor>, worker: Arc<dyn Executor>) -> Self {
        Self { primary, worker }
    }

    pub fn primary(&self) -> &Arc<dyn Executor> {
        &self.primary
    }

    pub fn worker(&self) -> &Arc<dyn Executor> {
        &self.worker
    }

    pub fn on_primary<F: FnOnce() + Send + 'static>(&self, f: F) {
        self.primary.execute(Box::new(f));
    }

    pub fn on_worker<F: FnOnce() + Send + 'static>(&self, f: F) {
        self.worker.execute(Box::new(f));
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_inline_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        InlineExecutor.execute(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatcher_routes_jobs() {
        let primary = Arc::new(MainQueue::new());
        let dispatcher = Dispatcher::new(primary.clone(), Arc::new(InlineExecutor));
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        dispatcher.on_worker(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let h = hits.clone();
        dispatcher.on_primary(move || {
            h.fetch_add(10, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(primary.run_pending(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }
}
