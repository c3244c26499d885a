//! Idle auto-exit timer.

use std::time::Duration;

use tokio::time::Instant;

/// Single-shot idle deadline.
///
/// At most one deadline is armed at a time; arming a new one always
/// discards the previous, so the timer can never fire for a stale deadline.
/// In no-timeout mode `reset()` never arms and the timer stays unarmed for
/// the life of the process.
#[derive(Debug)]
pub struct IdleTimer {
    timeout: Duration,
    no_timeout: bool,
    deadline: Option<Instant>,
}

impl IdleTimer {
    pub fn new(timeout: Duration, no_timeout: bool) -> Self {
        Self {
            timeout,
            no_timeout,
            deadline: None,
        }
    }

    /// Discard any armed deadline and, unless no-timeout mode is active,
    /// arm a fresh one `timeout` from now.
    pub fn reset(&mut self) {
        self.deadline = if self.no_timeout {
            None
        } else {
            Some(Instant::now() + self.timeout)
        };
    }

    /// Disarm without rearming. Used during teardown and after firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// The armed deadline, if any. The run loop sleeps until this.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
