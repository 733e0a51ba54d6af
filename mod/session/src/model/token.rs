use serde::{Deserialize, Serialize};

/// JWT claims payload, shared by access and refresh tokens.
///
/// The two categories carry the same shape but are signed with distinct
/// secrets, so one can never pass verification as the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,

    /// Login name.
    pub username: String,

    /// Role name.
    pub role: String,

    /// Token id (UUIDv4, no dashes). Makes every minted token distinct
    /// even when claims and timestamps collide.
    pub jti: String,

    /// Issued at (unix timestamp).
    pub iat: i64,

    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Token pair returned after login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}
