//! The periodic driver that ticks every session.
//!
//! There is one [`Ticker`] for the whole process, owned by whoever
//! bootstraps the players. Reconfiguring cancels the running driver before
//! installing its replacement, and dropping the ticker cancels it, so two
//! drivers never tick the same sessions.

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::session::Handle;

#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Starts ticking `sessions` every `interval`, beginning right away.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero or when called outside of a Tokio
    /// runtime.
    #[must_use]
    pub fn install(interval: Duration, sessions: Vec<Handle>) -> Self {
        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();

        info!(
            "ticking {} players every {:.1}s",
            sessions.len(),
            interval.as_secs_f32()
        );

        let task = tokio::spawn(async move {
            let mut ticks = time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    () = cancelled.cancelled() => break,

                    now = ticks.tick() => {
                        for session in &sessions {
                            if let Err(e) = session.tick(now) {
                                trace!("{}: tick not delivered: {e}", session.name());
                            }
                        }
                    }
                }
            }
        });

        Self {
            interval,
            cancel,
            task: Some(task),
        }
    }

    /// Cancels the running driver and installs a new one.
    pub fn reconfigure(&mut self, interval: Duration, sessions: Vec<Handle>) {
        self.cancel.cancel();
        *self = Self::install(interval, sessions);
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stops ticking and waits for the driver to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("ticker failed: {e}");
            }
        }
        debug!("ticker stopped");
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
