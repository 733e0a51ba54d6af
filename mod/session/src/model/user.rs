use serde::{Deserialize, Serialize};

/// A user identity as seen by the session subsystem.
///
/// Owned by the user repository; consumed here. Everything except `active`
/// is fixed for the lifetime of a session — `active` is re-checked on
/// every validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: String,

    /// Login name.
    pub username: String,

    /// Role name used for authorization downstream.
    pub role: String,

    /// Whether the account is active. A deactivated user fails validation
    /// even while holding an unexpired access token.
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}
