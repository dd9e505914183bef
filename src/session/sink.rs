use anyhow::Result;
use async_trait::async_trait;

use crate::models::SessionLog;

/// Persistence endpoint for finished sessions. One attempt per call; the
/// caller decides whether to try again.
#[async_trait]
pub trait SessionLogSink: Send + Sync {
    async fn submit(&self, log: &SessionLog) -> Result<()>;
}
