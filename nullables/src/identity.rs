//! Nullable identity provider.

use async_trait::async_trait;
use ballot_auth::{Credentials, IdentityError, IdentityProvider};
use ballot_types::Account;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::CallCounter;

/// Identity provider with a fixed user/secret table.
///
/// The verified account of a user is the identifier itself.
#[derive(Clone, Default)]
pub struct NullIdentityProvider {
    users: HashMap<String, String>,
    unavailable: Arc<AtomicBool>,
    delay: Option<Duration>,
    calls: CallCounter,
}

impl NullIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, identifier: &str, secret: &str) -> Self {
        self.users.insert(identifier.to_string(), secret.to_string());
        self
    }

    /// Sleep before answering every request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Simulate a provider outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn call_counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait]
impl IdentityProvider for NullIdentityProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn verify(&self, credentials: &Credentials) -> Result<Account, IdentityError> {
        self.calls.hit();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("null provider offline".into()));
        }
        match self.users.get(&credentials.identifier) {
            Some(secret) if *secret == credentials.secret => {
                Account::new(credentials.identifier.clone()).map_err(|_| IdentityError::Rejected)
            }
            _ => Err(IdentityError::Rejected),
        }
    }
}
