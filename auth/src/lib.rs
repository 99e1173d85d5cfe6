//! Authentication gate.
//!
//! Verifies a submitter's credentials through an external
//! [`IdentityProvider`] and owns the resulting sessions. Every coordinated
//! operation re-validates its session through
//! [`AuthenticationGate::require_session`]; a session is never assumed valid
//! across calls.

pub mod credentials;
pub mod error;
pub mod gate;
pub mod password;
pub mod provider;

pub use credentials::Credentials;
pub use error::{AuthFailure, AuthenticationError, PasswordError};
pub use gate::{AuthenticationGate, GateConfig};
pub use password::{hash_password, PasswordIdentityProvider, UserEntry};
pub use provider::{IdentityError, IdentityProvider};
