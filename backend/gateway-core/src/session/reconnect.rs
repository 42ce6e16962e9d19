//! Reconnect timing after an unexpected closure.

use crate::session::actor::Internal;
use crate::session::timer::{TimerHandle, Timers};

use std::time::Duration;

use backoff::backoff::{Backoff, Constant};

/// At most one reconnect timer at a time, fixed delay, no attempt limit.
pub(crate) struct ReconnectScheduler {
    policy: Constant,
    pending: Option<TimerHandle>,
    generation: u64,
    attempts: u32,
}

impl ReconnectScheduler {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            policy: Constant::new(delay),
            pending: None,
            generation: 0,
            attempts: 0,
        }
    }

    /// Arm the reconnect timer unless one is already pending.
    ///
    /// Returns the delay when a new timer was armed.
    pub(crate) fn schedule(&mut self, timers: &Timers<Internal>) -> Option<Duration> {
        if self.pending.is_some() {
            return None;
        }
        let delay = self.policy.next_backoff()?;
        self.generation += 1;
        self.attempts += 1;
        self.pending = Some(timers.after(
            delay,
            Internal::ReconnectDue {
                generation: self.generation,
            },
        ));
        Some(delay)
    }

    /// Drop any pending timer. A `ReconnectDue` already in flight goes stale.
    pub(crate) fn cancel(&mut self) -> bool {
        self.generation += 1;
        self.pending.take().is_some()
    }

    /// Consume a fired timer. False when it was cancelled or superseded.
    pub(crate) fn take_due(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// A connection succeeded; start counting from scratch.
    pub(crate) fn reset(&mut self) {
        self.policy.reset();
        self.attempts = 0;
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}
