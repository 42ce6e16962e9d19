//! One-shot timers that post a message back to the session task.

use std::time::Duration;

use tokio::spawn as TokioSpawn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep as TokioSleep;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A pending timer. Dropping it cancels the timer.
///
/// A message already posted before the drop is still delivered, so receivers
/// check that the message is current.
pub(crate) struct TimerHandle(JoinHandle<()>);

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub(crate) struct Timers<M> {
    tx: mpsc::UnboundedSender<M>,
}

impl<M: Send + 'static> Timers<M> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<M>) -> Self {
        Self { tx }
    }

    pub(crate) fn after(&self, delay: Duration, message: M) -> TimerHandle {
        let tx = self.tx.clone();
        TimerHandle(TokioSpawn(async move {
            TokioSleep(delay).await;
            let _ = tx.send(message);
        }))
    }
}
