use std::time::Duration;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::runtime::RuntimeSignal;

/// Armed threshold for one press. Sends `HoldElapsed` once unless released
/// (stopped or dropped) first.
pub struct HoldTimer {
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl HoldTimer {
    pub fn arm(
        generation: u64,
        threshold: Duration,
        signals: UnboundedSender<RuntimeSignal>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(threshold) => {
                    let _ = signals.send(RuntimeSignal::HoldElapsed { generation });
                }
            }
        });

        Self {
            cancel_token,
            handle: Some(handle),
        }
    }

    pub fn disarm(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        self.release();
    }
}
