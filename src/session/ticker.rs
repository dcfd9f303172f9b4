use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// A cancellable fixed-interval task.
///
/// Runs `tick` every `period` until cancelled. Cancellation is deterministic
/// (a oneshot raced against the interval) and idempotent: cancelling an
/// already-cancelled ticker is a no-op, so screen teardown can always cancel
/// unconditionally without leaking a perpetually-rescheduling task.
pub struct Ticker {
    handle: Option<(JoinHandle<()>, oneshot::Sender<()>)>,
}

impl Ticker {
    /// Spawn a ticker calling `tick` every `period`.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick fires immediately; skip it so a period
            // elapses before the first callback.
            timer.tick().await;

            debug!("Ticker started: {}", name);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = timer.tick() => tick(),
                }
            }

            debug!("Ticker stopped: {}", name);
        });

        Self {
            handle: Some((handle, stop_tx)),
        }
    }

    /// Cancel the ticker and wait for it to wind down. No-op when already
    /// cancelled or never started.
    pub async fn cancel(&mut self) {
        if let Some((handle, stop_tx)) = self.handle.take() {
            let _ = stop_tx.send(());
            let _ = handle.await;
        }
    }

    /// Cancel without waiting; used from synchronous teardown.
    pub fn abort(&mut self) {
        if let Some((handle, _stop_tx)) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ticker_fires_and_cancels() {
        let count = Arc::new(AtomicU64::new(0));
        let count_for_tick = Arc::clone(&count);

        let mut ticker = Ticker::spawn("test", Duration::from_millis(10), move || {
            count_for_tick.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        ticker.cancel().await;

        let fired = count.load(Ordering::SeqCst);
        assert!(fired >= 3, "expected several ticks, got {fired}");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), fired, "ticks after cancel");
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let mut ticker = Ticker::spawn("test", Duration::from_millis(10), || {});
        ticker.cancel().await;
        ticker.cancel().await;
        ticker.abort();
    }

    #[tokio::test]
    async fn test_no_tick_before_first_period() {
        let count = Arc::new(AtomicU64::new(0));
        let count_for_tick = Arc::clone(&count);

        let mut ticker = Ticker::spawn("test", Duration::from_millis(200), move || {
            count_for_tick.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        ticker.cancel().await;
    }
}
