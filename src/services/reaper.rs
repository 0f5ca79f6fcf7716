use crate::services::token_store::TokenStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Background eviction of expired tokens. Runs for the lifetime of the
/// process and stops looping when the shutdown channel flips; in-flight
/// work is not awaited on shutdown.
pub struct Reaper {
    tokens: Arc<TokenStore>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Reaper {
    pub fn new(
        tokens: Arc<TokenStore>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            tokens,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🧹 Token reaper started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Token reaper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// One sweep cycle: collect the expired tokens first, then evict each
    /// through the same path as an explicit revoke. Filesystem deletion
    /// happens per token, after the index mutation, so a slow disk never
    /// blocks foreground issue/lookup calls.
    pub async fn sweep_once(&self) {
        let expired = self.tokens.expired_tokens();
        if expired.is_empty() {
            tracing::debug!("reaper sweep: nothing expired");
            return;
        }

        tracing::info!("reaper sweep: evicting {} expired token(s)", expired.len());
        for token in expired {
            self.tokens.revoke(&token).await;
        }
    }
}
