use std::time::{Duration, Instant};

/// Coalesces a burst of width signals into the last one.
///
/// Every `signal` restarts the quiet window. `poll` hands back the latest
/// width once no signal has arrived for the whole window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<u32>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            deadline: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    pub fn signal(&mut self, width: u32, now: Instant) {
        self.pending = Some(width);
        self.deadline = Some(now + self.quiet);
    }

    pub fn poll(&mut self, now: Instant) -> Option<u32> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
