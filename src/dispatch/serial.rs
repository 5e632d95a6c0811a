use super::{Executor, Job};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};

/// A dedicated thread that runs jobs one at a time, in order.
///
/// A panicking job is logged and the thread keeps serving later jobs.
pub struct SerialExecutor {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl SerialExecutor {
    pub fn spawn<S: Into<String>>(name: S) -> io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = unbounded::<Job>();

        let thread_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            for job in receiver.iter() {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!(executor = %thread_name, "job panicked");
                }
            }
        })?;

        Ok(Self {
            name,
            thread_id: handle.thread().id(),
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the caller is running on this executor's thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Executor for SerialExecutor {
    fn execute(&self, job: Job) {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(job).is_err() {
                    tracing::warn!(executor = %self.name, "executor thread gone, job dropped");
                }
            }
            None => tracing::warn!(executor = %self.name, "executor shut down, job dropped"),
        }
    }
}

impl Drop for SerialExecutor {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain and exit.
        self.sender.lock().take();
        if let Some(handle) = self.thread.lock().take() {
            if !self.is_current() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    #[test]
    fn test_runs_in_order_on_own_thread() {
        let executor = SerialExecutor::spawn("urlconn-test").unwrap();
        let (tx, rx) = bounded(8);
        for i in 0..4 {
            let tx = tx.clone();
            executor.execute(Box::new(move || {
                let name = thread::current().name().map(str::to_string);
                tx.send((i, name)).unwrap();
            }));
        }
        for i in 0..4 {
            let (n, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(n, i);
            assert_eq!(name.as_deref(), Some("urlconn-test"));
        }
        assert!(!executor.is_current());
    }

    #[test]
    fn test_survives_panicking_job() {
        let executor = SerialExecutor::spawn("urlconn-panic").unwrap();
        let (tx, rx) = bounded(1);
        executor.execute(Box::new(|| panic!("boom")));
        executor.execute(Box::new(move || tx.send(42).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_drop_drains_queue() {
        let (tx, rx) = bounded(4);
        {
            let executor = SerialExecutor::spawn("urlconn-drain").unwrap();
            for i in 0..3 {
                let tx = tx.clone();
                executor.execute(Box::new(move || tx.send(i).unwrap()));
            }
        }
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
