use std::time::Duration;

use async_trait::async_trait;

/// Delay between polls. Production sleeps on the tokio clock, so tests can
/// pause and advance time instead of waiting.
#[async_trait]
pub trait PollTimer: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl PollTimer for TokioTimer {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
