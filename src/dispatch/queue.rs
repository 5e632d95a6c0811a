use super::{Executor, Job};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// A FIFO drained by whichever thread the host designates as primary.
///
/// Nothing runs until the host calls [`run_pending`](Self::run_pending) or
/// [`run_until`](Self::run_until), which makes delivery points explicit for
/// event-loop integration and deterministic in tests.
pub struct MainQueue {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
}

impl Default for MainQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MainQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Run everything queued so far, including jobs queued by those jobs.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs as they arrive until `done` holds or `timeout` elapses.
    ///
    /// Returns whether `done` became true.
    pub fn run_until<F: FnMut() -> bool>(&self, timeout: Duration, mut done: F) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.receiver.recv_timeout(remaining) {
                Ok(job) => job(),
                Err(RecvTimeoutError::Timeout) => return done(),
                // We hold a sender, so the channel never disconnects.
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }
}

impl Executor for MainQueue {
    fn execute(&self, job: Job) {
        // Both ends live in self; send cannot fail.
        let _ = self.sender.send(job);
    }
}
