use std::time::Duration;

use log::info;
use rand::Rng;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceOutcome {
    Elapsed,
    Cancelled,
}

/// Delay inserted between batches and before retry rounds so the remote side does not throttle or block us.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    jitter: Duration,
}

impl Pacer {
    pub fn new(interval: Duration, jitter: Duration) -> Self {
        Pacer { interval, jitter }
    }

    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let mut rng = rand::thread_rng();
        let extra_ms = rng.gen_range(0..=self.jitter.as_millis() as u64);
        self.interval + Duration::from_millis(extra_ms)
    }

    /// Sleep for the next delay unless `shutdown` fires first.
    pub async fn pace(&self, shutdown: &mut Shutdown) -> PaceOutcome {
        if shutdown.is_triggered() {
            return PaceOutcome::Cancelled;
        }
        let delay = self.next_delay();
        if delay.is_zero() {
            return PaceOutcome::Elapsed;
        }

        info!("Waiting for {} seconds...", delay.as_secs_f32());
        tokio::select! {
            _ = tokio::time::sleep(delay) => PaceOutcome::Elapsed,
            _ = shutdown.triggered() => PaceOutcome::Cancelled,
        }
    }
}

/// Receiving half of a shutdown signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Shutdown {
        let (trigger, shutdown) = Shutdown::channel();
        // The closed sender is handled in `triggered`.
        drop(trigger);
        shutdown
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the trigger fires. Pending forever if the trigger is dropped unfired.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}
