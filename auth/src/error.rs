use thiserror::Error;

/// Why an authentication check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session expired")]
    Expired,

    #[error("identity provider unavailable")]
    ProviderUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed: {reason}")]
pub struct AuthenticationError {
    pub reason: AuthFailure,
}

impl AuthenticationError {
    pub fn invalid_credentials() -> Self {
        Self {
            reason: AuthFailure::InvalidCredentials,
        }
    }

    pub fn expired() -> Self {
        Self {
            reason: AuthFailure::Expired,
        }
    }

    pub fn provider_unavailable() -> Self {
        Self {
            reason: AuthFailure::ProviderUnavailable,
        }
    }

    /// Only a provider outage may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        self.reason == AuthFailure::ProviderUnavailable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
}
