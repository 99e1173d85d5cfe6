use async_trait::async_trait;
use ballot_types::Account;
use thiserror::Error;

use crate::Credentials;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("credentials rejected")]
    Rejected,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// External identity verification.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn verify(&self, credentials: &Credentials) -> Result<Account, IdentityError>;
}
