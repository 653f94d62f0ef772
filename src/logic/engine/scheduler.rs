//! Periodic task scheduling
//!
//! Each task runs its tick inline, so a task never overlaps itself. Ticks
//! that come due while one is still running are skipped, not queued.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Cloneable shutdown signal shared by every task of one engine run
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown was signalled (or the sender is gone)
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub fn shutdown_channel() -> (watch::Sender<bool>, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (tx, Shutdown { rx })
}

async fn notified(trigger: Option<&Notify>) {
    match trigger {
        Some(n) => n.notified().await,
        None => std::future::pending().await,
    }
}

/// Spawn a task calling `tick` every `period` (first tick immediately) until shutdown.
///
/// `trigger` forces an extra tick out of schedule. The tick receives the
/// shutdown handle and must return promptly once it fires.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: Shutdown,
    trigger: Option<Arc<Notify>>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut(Shutdown) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::debug!("[Scheduler] {} every {:?}", name, period);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {}
                _ = notified(trigger.as_deref()) => {
                    log::debug!("[Scheduler] {} triggered on demand", name);
                    ticker.reset();
                }
            }

            tick(shutdown.clone()).await;

            if shutdown.is_triggered() {
                break;
            }
        }

        log::debug!("[Scheduler] {} stopped", name);
    })
}
