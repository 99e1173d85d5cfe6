//! Session issuance and validation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use ballot_types::{Account, Clock, Session, SessionToken};

use crate::{AuthenticationError, Credentials, IdentityError, IdentityProvider};

/// Session lifetime and provider timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateConfig {
    pub session_ttl_secs: u64,
    pub verify_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 3600,
            verify_timeout: Duration::from_secs(5),
        }
    }
}

/// Verifies identities and owns every live session.
pub struct AuthenticationGate {
    provider: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    config: GateConfig,
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl AuthenticationGate {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        config: GateConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Verify credentials with the identity provider and open a session.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, AuthenticationError> {
        if !credentials.is_well_formed() {
            return Err(AuthenticationError::invalid_credentials());
        }

        let verified =
            tokio::time::timeout(self.config.verify_timeout, self.provider.verify(credentials))
                .await;
        let account = match verified {
            Ok(Ok(account)) => account,
            Ok(Err(IdentityError::Rejected)) => {
                tracing::warn!(identifier = %credentials.identifier, "credentials rejected");
                return Err(AuthenticationError::invalid_credentials());
            }
            Ok(Err(IdentityError::Unavailable(reason))) => {
                tracing::warn!(provider = self.provider.name(), %reason, "identity provider unavailable");
                return Err(AuthenticationError::provider_unavailable());
            }
            Err(_) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    timeout_ms = self.config.verify_timeout.as_millis() as u64,
                    "identity provider timed out"
                );
                return Err(AuthenticationError::provider_unavailable());
            }
        };

        let token = SessionToken::generate().map_err(|e| {
            tracing::warn!(error = %e, "could not generate session token");
            AuthenticationError::provider_unavailable()
        })?;
        let now = self.clock.now();
        let session = Session {
            token,
            account,
            authenticated_at: now,
            expires_at: now.plus_secs(self.config.session_ttl_secs),
        };
        self.write_sessions()
            .insert(session.token.clone(), session.clone());
        tracing::info!(account = %session.account, token = %session.token, "session opened");
        Ok(session)
    }

    /// Validate that `session` is still live and return its account.
    ///
    /// A session past its expiry, or one this gate no longer holds (logged
    /// out or purged), is `Expired`. A session whose account does not match
    /// the one the gate issued is `InvalidCredentials`.
    pub fn require_session(&self, session: &Session) -> Result<Account, AuthenticationError> {
        let now = self.clock.now();
        let held = self.read_sessions().get(&session.token).cloned();
        match held {
            None => Err(AuthenticationError::expired()),
            Some(held) if held.is_expired(now) || session.is_expired(now) => {
                self.write_sessions().remove(&session.token);
                tracing::debug!(account = %held.account, "session expired");
                Err(AuthenticationError::expired())
            }
            Some(held) if held.account != session.account => {
                Err(AuthenticationError::invalid_credentials())
            }
            Some(held) => Ok(held.account),
        }
    }

    /// Look up a live session by bearer token.
    pub fn session(&self, token: &SessionToken) -> Option<Session> {
        let now = self.clock.now();
        self.read_sessions()
            .get(token)
            .filter(|s| !s.is_expired(now))
            .cloned()
    }

    /// End a session. Returns whether it existed.
    pub fn logout(&self, token: &SessionToken) -> bool {
        let removed = self.write_sessions().remove(token);
        if let Some(session) = &removed {
            tracing::info!(account = %session.account, "session closed");
        }
        removed.is_some()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.write_sessions();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        before - sessions.len()
    }

    pub fn active_sessions(&self) -> usize {
        self.read_sessions().len()
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<SessionToken, Session>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<SessionToken, Session>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}
