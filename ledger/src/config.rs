use std::future::Future;
use std::time::Duration;

use ballot_store::StoreError;

/// Bounds applied to every backend round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    pub timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl LedgerConfig {
    /// Run a backend operation under the configured timeout. Expiry is
    /// reported as `Unavailable`, the same as an outage.
    pub(crate) async fn bounded<T, F>(&self, what: &'static str, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "{what} timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
