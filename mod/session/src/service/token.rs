use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::model::{Claims, User};
use crate::service::{SessionConfig, SessionError};

/// Stateless signer/verifier for the two token categories.
///
/// Access and refresh tokens share the claims shape but use distinct HS256
/// secrets, so a token of one category can never pass verification as the
/// other. Pure computation — no I/O, no store lookups: a refresh token
/// that verifies here is still subject to the session store checks in the
/// service.
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: u64,
}

impl TokenCodec {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
        }
    }

    /// Mint an access token. Fixed lifetime, regardless of how much
    /// session life remains.
    pub fn issue_access(&self, user: &User) -> Result<String, SessionError> {
        let claims = build_claims(user, self.access_ttl_secs);
        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| SessionError::Internal(format!("JWT encode failed: {}", e)))
    }

    /// Mint a refresh token with the given lifetime.
    ///
    /// The lifetime is caller-chosen: the full session ceiling at login,
    /// the *remaining* session TTL on rotation.
    pub fn issue_refresh(&self, user: &User, ttl_secs: u64) -> Result<String, SessionError> {
        let claims = build_claims(user, ttl_secs);
        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| SessionError::Internal(format!("JWT encode failed: {}", e)))
    }

    /// Verify an access token's signature and expiry and return its claims.
    pub fn verify_access(&self, token: &str) -> Result<Claims, SessionError> {
        decode_with(token, &self.access_decoding).map_err(|_| SessionError::InvalidAccessToken)
    }

    /// Verify a refresh token's signature and expiry and return its claims.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, SessionError> {
        decode_with(token, &self.refresh_decoding).map_err(|_| SessionError::InvalidRefreshToken)
    }
}

fn build_claims(user: &User, ttl_secs: u64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        role: user.role.clone(),
        jti: uuid::Uuid::new_v4().simple().to_string(),
        iat: now,
        exp: now + ttl_secs as i64,
    }
}

fn decode_with(token: &str, key: &DecodingKey) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // No leeway: an expired token is expired.
    validation.leeway = 0;
    Ok(decode::<Claims>(token, key, &validation)?.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            role: "reporter".to_string(),
            active: true,
        }
    }

    fn test_codec() -> TokenCodec {
        TokenCodec::new(&SessionConfig::default())
    }

    #[test]
    fn test_access_token_roundtrip() {
        let codec = test_codec();
        let user = test_user();

        let token = codec.issue_access(&user).unwrap();
        let claims = codec.verify_access(&token).unwrap();

        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "reporter");
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_refresh_token_carries_caller_chosen_ttl() {
        let codec = test_codec();

        let token = codec.issue_refresh(&test_user(), 18000).unwrap();
        let claims = codec.verify_refresh(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 18000);
    }

    #[test]
    fn test_token_categories_do_not_cross_verify() {
        let codec = test_codec();
        let user = test_user();

        let access = codec.issue_access(&user).unwrap();
        let refresh = codec.issue_refresh(&user, 21600).unwrap();

        assert!(matches!(
            codec.verify_refresh(&access),
            Err(SessionError::InvalidRefreshToken)
        ));
        assert!(matches!(
            codec.verify_access(&refresh),
            Err(SessionError::InvalidAccessToken)
        ));
    }

    #[test]
    fn test_minted_tokens_are_unique() {
        let codec = test_codec();
        let user = test_user();

        // Same claims, same second: the jti still makes them distinct.
        let a = codec.issue_access(&user).unwrap();
        let b = codec.issue_access(&user).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = test_codec();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u1".to_string(),
            username: "alice".to_string(),
            role: "reporter".to_string(),
            jti: "t1".to_string(),
            iat: now - 200,
            exp: now - 100,
        };
        let config = SessionConfig::default();
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            codec.verify_refresh(&token),
            Err(SessionError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let codec = test_codec();

        assert!(matches!(
            codec.verify_access("this.is.not.a.valid.jwt"),
            Err(SessionError::InvalidAccessToken)
        ));
        assert!(matches!(
            codec.verify_refresh(""),
            Err(SessionError::InvalidRefreshToken)
        ));
    }
}
