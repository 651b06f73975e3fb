use std::time::Duration;

use tokio::time::Instant;

/// Bounded retry policy applied around every API call.
///
/// One *pass* makes up to `max_attempts` attempts separated by `delay`.
/// When a pass is exhausted the session logs in again and runs one more pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Total time budget for one call across both passes.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(10),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Whether sleeping `delay` and trying again still fits in the deadline.
    pub(crate) fn has_budget(&self, started: Instant) -> bool {
        match self.deadline {
            None => true,
            Some(deadline) => started.elapsed() + self.delay < deadline,
        }
    }
}
