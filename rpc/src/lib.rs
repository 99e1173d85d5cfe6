//! HTTP API for the vote coordinator.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/login` | Open a session, returns a bearer token |
//! | `POST` | `/logout` | Close the caller's session |
//! | `POST` | `/candidates` | Register a candidate |
//! | `GET` | `/candidates` | List candidates in registration order |
//! | `POST` | `/votes` | Cast the caller's vote |
//! | `POST` | `/votes/retry` | Retry a vote whose outcome was unknown |
//! | `GET` | `/results` | Cached tally, zero-filled |
//! | `GET` | `/votes` | Ledger tally in read-model shape |
//! | `GET` | `/metrics` | Prometheus text exposition |

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcServer};
