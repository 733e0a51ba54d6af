use qualtrack_kv::Presence;

use crate::model::{Claims, TokenPair, User};
use crate::service::{SessionError, SessionService};

/// Store key for the session record of a user.
fn session_key(user_id: &str) -> String {
    format!("session:{}", user_id)
}

/// Store key for the refresh-token index entry.
fn refresh_key(token: &str) -> String {
    format!("refresh:{}", token)
}

impl SessionService {
    /// Log a user in: verify credentials, mint a token pair, create the
    /// session.
    ///
    /// Single session per user: the session record is keyed by user id, so
    /// a new login clobbers any prior session. The superseded refresh
    /// token fails the session-record comparison on its next use; its
    /// stale index entry just runs out its TTL.
    pub fn login(&self, username: &str, password: &str) -> Result<TokenPair, SessionError> {
        let user = self.credentials.verify(username, password)?;
        if !user.active {
            return Err(SessionError::UserInactive);
        }

        let ttl = self.config.session_ttl_secs;
        let access_token = self.codec.issue_access(&user)?;
        let refresh_token = self.codec.issue_refresh(&user, ttl)?;

        self.kv
            .set_ttl(&refresh_key(&refresh_token), user.id.as_bytes(), ttl)?;
        self.kv
            .set_ttl(&session_key(&user.id), refresh_token.as_bytes(), ttl)?;

        tracing::info!(user_id = %user.id, "session created");

        Ok(self.pair(access_token, refresh_token))
    }

    /// Exchange a refresh token for a fresh access token, rotating the
    /// refresh token while more than the slide threshold of session life
    /// remains.
    ///
    /// A rotated refresh token lives exactly as long as the *remaining*
    /// session TTL, never a fresh ceiling: the absolute limit set at login
    /// cannot be extended by refreshing. At or below the threshold,
    /// rotation stops and the same refresh token comes back — only the
    /// access token is new — so the ceiling can actually expire.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let claims = self.codec.verify_refresh(refresh_token)?;

        let index_key = refresh_key(refresh_token);
        let sess_key = session_key(&claims.sub);

        // The index entry confirms this exact token string is (or recently
        // was) sanctioned for this user.
        match self.kv.get(&index_key)? {
            Some(owner) if owner == claims.sub.as_bytes() => {}
            Some(_) => return Err(SessionError::InvalidRefreshToken),
            None => {
                // Index gone: either the whole session lapsed at the
                // ceiling, or this token was superseded and its old entry
                // already expired. The session record tells which.
                return match self.kv.get(&sess_key)? {
                    Some(_) => Err(SessionError::InvalidRefreshToken),
                    None => Err(SessionError::SessionExpired),
                };
            }
        }

        // The session record is the source of truth: it must still exist
        // and still name this token as the current one. A second login or
        // a completed rotation moves it on, invalidating this token even
        // while its index entry is still live.
        match self.kv.get(&sess_key)? {
            None => {
                self.kv.delete(&index_key)?;
                return Err(SessionError::SessionExpired);
            }
            Some(current) if current != refresh_token.as_bytes() => {
                return Err(SessionError::InvalidRefreshToken);
            }
            Some(_) => {}
        }

        let remaining = self.kv.remaining_ttl(&sess_key)?.unwrap_or(0);

        let user = self
            .users
            .find_by_id(&claims.sub)?
            .ok_or(SessionError::UserNotFound)?;
        if !user.active {
            return Err(SessionError::UserInactive);
        }

        // Always a fresh access token, even with minutes of session left —
        // its lifetime is capped at 30 minutes by construction.
        let access_token = self.codec.issue_access(&user)?;

        if remaining > self.config.slide_threshold_secs {
            let new_refresh = self.codec.issue_refresh(&user, remaining)?;

            // Write order keeps the inconsistency window small: new index
            // first, then advance the session record, then drop the old
            // index. A crash in between leaves at worst an extra index
            // entry that expires on its own TTL.
            self.kv
                .set_ttl(&refresh_key(&new_refresh), user.id.as_bytes(), remaining)?;
            self.kv
                .set_ttl(&sess_key, new_refresh.as_bytes(), remaining)?;
            self.kv.delete(&index_key)?;

            tracing::debug!(user_id = %user.id, remaining, "refresh token rotated");

            return Ok(self.pair(access_token, new_refresh));
        }

        tracing::debug!(user_id = %user.id, remaining, "refresh without rotation");

        Ok(self.pair(access_token, refresh_token.to_string()))
    }

    /// End a session: delete the session record and the refresh index.
    ///
    /// Idempotent — deleting absent keys is not an error. Store failures
    /// do propagate: a logout that silently failed would leave the tokens
    /// usable without the caller knowing.
    pub fn logout(&self, user_id: &str, refresh_token: &str) -> Result<(), SessionError> {
        self.kv.delete(&session_key(user_id))?;
        self.kv.delete(&refresh_key(refresh_token))?;

        tracing::info!(user_id = %user_id, "session ended");
        Ok(())
    }

    /// Per-request check behind an already-verified access token.
    ///
    /// The transport layer verifies signature and expiry via
    /// [`TokenCodec::verify_access`](crate::TokenCodec::verify_access) and
    /// hands the claims here. Session state is authoritative over token
    /// expiry: an unexpired access token is rejected once the session
    /// record is gone. If the store cannot be reached at all, the request
    /// is accepted on token validity alone — losing the session store must
    /// not lock every user out.
    pub fn validate_access_token(&self, claims: &Claims) -> Result<User, SessionError> {
        let user = self
            .users
            .find_by_id(&claims.sub)?
            .ok_or(SessionError::UserNotFound)?;
        if !user.active {
            return Err(SessionError::UserInactive);
        }

        match self.kv.exists(&session_key(&user.id)) {
            Presence::Present => Ok(user),
            Presence::Absent => Err(SessionError::SessionExpired),
            Presence::Unreachable => {
                tracing::warn!(
                    user_id = %user.id,
                    "session store unreachable, accepting token without session check"
                );
                Ok(user)
            }
        }
    }

    fn pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_ttl_secs as i64,
        }
    }
}
