use super::{Executor, Job};
use tokio::runtime::Handle;

/// Runs jobs on the tokio blocking pool.
///
/// Suited to parse steps: they may take a while and must not stall the
/// runtime's async workers. Jobs are not ordered relative to each other.
#[derive(Debug, Clone)]
pub struct BlockingExecutor {
    handle: Handle,
}

impl BlockingExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for BlockingExecutor {
    fn execute(&self, job: Job) {
        drop(self.handle.spawn_blocking(job));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_runs_on_blocking_pool() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let executor = BlockingExecutor::new(runtime.handle().clone());
        let (tx, rx) = crossbeam_channel::bounded(1);
        executor.execute(Box::new(move || tx.send(7).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[test]
    fn test_current_outside_runtime() {
        assert!(BlockingExecutor::current().is_none());
    }
}
