use std::time::Duration;

use tokio::{
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::runtime::RuntimeSignal;

const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Owned 1 Hz tick source for COUNTDOWN and ACTIVE.
///
/// Each tick is tagged with the generation it was started under, so a tick
/// that was already queued when the handle was stopped can be recognised and
/// dropped. Dropping the handle releases the task the same way `stop` does.
pub struct TickerHandle {
    generation: u64,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TickerHandle {
    pub fn spawn(
        generation: u64,
        period: Duration,
        signals: UnboundedSender<RuntimeSignal>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            // First tick one full period after start, not immediately.
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if signals.send(RuntimeSignal::Tick { generation }).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        log_debug!("ticker {generation} started");

        Self {
            generation,
            cancel_token,
            handle: Some(handle),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log_debug!("ticker {} stopped", self.generation);
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.release();
    }
}
