//! Paced sequential driver
//!
//! Runs one step per item, strictly in order, one in flight at a time, and
//! sleeps a fixed delay between items (never after the last). A cancelled
//! token stops issuing steps; the remaining items are mapped through the
//! caller's `cancelled` function so every item still yields an output.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Inter-item delay in the reference configuration
pub const DEFAULT_ITEM_DELAY_MS: u64 = 50;

/// Outcome message for items skipped after cancellation
pub const CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn run<I, O, F, Fut, C>(
        &self,
        items: impl IntoIterator<Item = I>,
        cancel: Option<&CancellationToken>,
        mut step: F,
        mut cancelled: C,
    ) -> Vec<O>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = O>,
        C: FnMut(I) -> O,
    {
        let mut items = items.into_iter().peekable();
        let mut outputs = Vec::with_capacity(items.size_hint().0);
        let mut skipped = 0usize;

        while let Some(item) = items.next() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                skipped += 1;
                outputs.push(cancelled(item));
                continue;
            }

            outputs.push(step(item).await);

            if items.peek().is_some() && !self.delay.is_zero() {
                self.pause(cancel).await;
            }
        }

        if skipped > 0 {
            debug!("paced run cancelled, {} items skipped", skipped);
        }
        outputs
    }

    async fn pause(&self, cancel: Option<&CancellationToken>) {
        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {},
                    _ = tokio::time::sleep(self.delay) => {},
                }
            },
            None => tokio::time::sleep(self.delay).await,
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::from_millis(DEFAULT_ITEM_DELAY_MS)
    }
}
