pub mod session;
pub mod token;

use std::sync::Arc;

use thiserror::Error;

use qualtrack_kv::{KVError, KVStore};

use crate::model::User;
use crate::service::token::TokenCodec;

/// Session subsystem error type.
///
/// Every variant is terminal — the subsystem never retries internally. A
/// caller receiving one must treat the request as unauthenticated and
/// require a fresh login, except for a plain access-token expiry, which
/// should prompt a `refresh` instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Wrong username or password. Deliberately identical for "no such
    /// user" and "bad password" — which half was wrong must not leak.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid access token")]
    InvalidAccessToken,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("session expired")]
    SessionExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("user is deactivated")]
    UserInactive,

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<KVError> for SessionError {
    fn from(e: KVError) -> Self {
        SessionError::Storage(e.to_string())
    }
}

/// Verifies submitted credentials.
///
/// Implementations must return [`SessionError::InvalidCredentials`] for
/// unknown usernames and wrong passwords alike.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Result<User, SessionError>;
}

/// Read access to user records.
pub trait UserRepository: Send + Sync {
    /// Look up a user by id. Returns None if no such user exists.
    fn find_by_id(&self, id: &str) -> Result<Option<User>, SessionError>;
}

/// Configuration for the session subsystem.
///
/// Resolved once at process start and passed in by the composition root;
/// nothing here is mutable at runtime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Access-token signing secret.
    pub access_secret: String,

    /// Refresh-token signing secret. Must differ from `access_secret`.
    pub refresh_secret: String,

    /// Access token lifetime in seconds (default: 30 min).
    pub access_ttl_secs: u64,

    /// Absolute session ceiling in seconds (default: 6 h). Also the
    /// initial refresh token lifetime.
    pub session_ttl_secs: u64,

    /// Sliding-refresh threshold in seconds (default: 1 h). At or below
    /// this much remaining session life, refresh stops rotating the
    /// refresh token so the ceiling can actually expire.
    pub slide_threshold_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_secret: "qualtrack-dev-access-secret-change-me".to_string(),
            refresh_secret: "qualtrack-dev-refresh-secret-change-me".to_string(),
            access_ttl_secs: 1800,      // 30 min
            session_ttl_secs: 21600,    // 6 h
            slide_threshold_secs: 3600, // 1 h
        }
    }
}

/// The session service. Holds collaborators and configuration.
///
/// All methods take `&self` and the only mutable state lives in the store,
/// so the service is shared across request tasks as `Arc<SessionService>`
/// without further coordination.
pub struct SessionService {
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) users: Arc<dyn UserRepository>,
    pub(crate) kv: Arc<dyn KVStore>,
    pub(crate) codec: TokenCodec,
    pub(crate) config: SessionConfig,
}

impl SessionService {
    /// Create a new SessionService.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        users: Arc<dyn UserRepository>,
        kv: Arc<dyn KVStore>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let codec = TokenCodec::new(&config);
        Arc::new(Self {
            credentials,
            users,
            kv,
            codec,
            config,
        })
    }

    /// The codec used for this service's tokens. The transport layer needs
    /// it to verify access tokens before calling
    /// [`validate_access_token`](SessionService::validate_access_token).
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }
}
