//! Session module — token issuance, refresh and per-request validation.
//!
//! # Resources
//!
//! - **User** — identity consumed from the user repository
//! - **Access token** — short-lived stateless bearer credential (30 min)
//! - **Refresh token** — longer-lived credential whose validity is
//!   co-determined by the session store
//! - **Session record** — store entry bounding the absolute lifetime of a
//!   login (6 h ceiling, single session per user)
//!
//! # Usage
//!
//! ```ignore
//! use qualtrack_session::{SessionConfig, SessionService};
//!
//! let svc = SessionService::new(credentials, users, kv, SessionConfig::default());
//! let pair = svc.login("alice", "secret")?;
//! let pair = svc.refresh(&pair.refresh_token)?;
//! ```
//!
//! Credential verification, the user repository and the TTL store are
//! injected behind traits; transport (routing, header parsing) lives in
//! the calling layer, which verifies access-token signatures with
//! [`TokenCodec`] before asking the service to validate the session.

pub mod model;
pub mod service;

pub use model::{Claims, TokenPair, User};
pub use service::token::TokenCodec;
pub use service::{
    CredentialStore, SessionConfig, SessionError, SessionService, UserRepository,
};
