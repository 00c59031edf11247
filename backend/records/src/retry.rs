use std::{future::Future, time::Duration};

use tracing::warn;

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Runs `call` until it succeeds, fails permanently, or attempts run out.
    /// Attempts are spaced by a fixed delay.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!("{operation} failed (attempt {attempt}/{}): {e}", self.max_attempts);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.delay).await;
        }
    }
}
