//! Signed bearer tokens (JWT, HS256).

use chrono::{DateTime, Duration, Utc};
use derive_getters::Getters;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::auth::{AuthError, AuthErrorKind};

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Claims {
    /// Account the token was issued for.
    user_id: i32,
    /// Issued-at, seconds since the epoch.
    iat: i64,
    /// Expiry, seconds since the epoch.
    exp: i64,
}

/// Issues and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_days", &self.ttl.num_days())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer signing with `secret`, tokens valid for `ttl_days`.
    #[instrument(skip(secret))]
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Issues a token for `user_id`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if signing fails.
    #[instrument(skip(self))]
    pub fn issue(&self, user_id: i32) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token for `user_id` as if signed at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if signing fails.
    #[instrument(skip(self))]
    pub fn issue_at(&self, user_id: i32, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::new(AuthErrorKind::Signing, format!("Signing failed: {}", e)))?;
        debug!(user_id, exp = claims.exp, "Token issued");
        Ok(token)
    }

    /// Verifies signature and expiry and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] with [`AuthErrorKind::InvalidToken`] if the token
    /// is malformed, signed with another key, or expired.
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                AuthError::new(AuthErrorKind::InvalidToken, format!("Token rejected: {}", e))
            })?;
        Ok(data.claims)
    }
}
