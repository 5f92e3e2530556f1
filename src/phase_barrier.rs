use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PhaseError {
    #[error("phase {phase:?} still had {remaining} of {expected} tasks outstanding after {timeout:?}")]
    Timeout {
        phase: String,
        expected: usize,
        remaining: usize,
        timeout: Duration,
    },
}

/// One-shot countdown gate: "all N submitted units have completed".
///
/// Built with the number of tasks that are about to be submitted. Every task
/// counts down exactly once, the submitter blocks in [`wait`](Self::wait) until
/// the count hits zero. A barrier is never reused after its wait returned.
pub struct PhaseBarrier {
    phase: String,
    expected: usize,
    remaining: Mutex<usize>,
    drained: Condvar,
}

impl PhaseBarrier {
    pub fn new(phase: impl Into<String>, expected: usize) -> Self {
        Self {
            phase: phase.into(),
            expected,
            remaining: Mutex::new(expected),
            drained: Condvar::new(),
        }
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        match *remaining {
            0 => log::error!(
                "Barrier of phase {:?} counted down more than {} times",
                self.phase,
                self.expected
            ),
            1 => {
                *remaining = 0;
                self.drained.notify_all();
            }
            _ => *remaining -= 1,
        }
    }

    /// Blocks until every unit has counted down.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.drained.wait(&mut remaining);
        }
    }

    /// Like [`wait`](Self::wait), but turns a hang into an error.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), PhaseError> {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.drained.wait_until(&mut remaining, deadline).timed_out() && *remaining > 0 {
                return Err(PhaseError::Timeout {
                    phase: self.phase.clone(),
                    expected: self.expected,
                    remaining: *remaining,
                    timeout,
                });
            }
        }
        Ok(())
    }

    /// Waits with or without a timeout.
    pub fn wait_for(&self, timeout: Option<Duration>) -> Result<(), PhaseError> {
        match timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => {
                self.wait();
                Ok(())
            }
        }
    }
}

/// Counts its barrier down when dropped, so a unit of work signals completion on every exit
/// path, unwinding included.
pub struct CountDownGuard<'a> {
    barrier: &'a PhaseBarrier,
}

impl<'a> CountDownGuard<'a> {
    pub fn new(barrier: &'a PhaseBarrier) -> Self {
        Self { barrier }
    }
}

impl Drop for CountDownGuard<'_> {
    fn drop(&mut self) {
        self.barrier.count_down();
    }
}
