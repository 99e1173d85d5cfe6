//! Password-based identity provider backed by argon2 PHC hashes.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use ballot_types::Account;
use serde::{Deserialize, Serialize};

use crate::{Credentials, IdentityError, IdentityProvider, PasswordError};

/// One configured user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    /// argon2 PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`.
    pub password_hash: String,
}

/// Hash a password into an argon2id PHC string suitable for [`UserEntry`].
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verifies usernames and passwords against a fixed user table.
///
/// The verified account is the username itself.
pub struct PasswordIdentityProvider {
    users: Arc<HashMap<String, String>>,
}

impl PasswordIdentityProvider {
    pub fn new(users: impl IntoIterator<Item = UserEntry>) -> Self {
        let users = users
            .into_iter()
            .map(|u| (u.username, u.password_hash))
            .collect();
        Self {
            users: Arc::new(users),
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

fn verify_hash(stored: &str, secret: &[u8]) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default().verify_password(secret, &parsed).is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is malformed: {e}");
            false
        }
    }
}

#[async_trait]
impl IdentityProvider for PasswordIdentityProvider {
    fn name(&self) -> &'static str {
        "password"
    }

    async fn verify(&self, credentials: &Credentials) -> Result<Account, IdentityError> {
        let Some(stored) = self.users.get(&credentials.identifier).cloned() else {
            return Err(IdentityError::Rejected);
        };
        let secret = zeroize::Zeroizing::new(credentials.secret.clone().into_bytes());

        // argon2 is deliberately slow; keep it off the async workers.
        let ok = tokio::task::spawn_blocking(move || verify_hash(&stored, &secret))
            .await
            .map_err(|e| IdentityError::Unavailable(format!("verification task failed: {e}")))?;
        if !ok {
            return Err(IdentityError::Rejected);
        }
        Account::new(credentials.identifier.clone()).map_err(|_| IdentityError::Rejected)
    }
}
