use crate::{error::ApiError, AppState};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejectionReason,
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use password_hash::SaltString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(password_hash::Error),

    #[error("bcrypt verification failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),

    #[error("token signing failed: {0}")]
    Sign(jsonwebtoken::errors::Error),
}

// ── Passwords ──────────────────────────────────────────────────────────────

/// Hash a password into a PHC string (Argon2id, random salt).
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>()).map_err(AuthError::Hash)?;
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(AuthError::Hash)
}

/// Whether `stored` is a bcrypt hash written by an older install.
pub fn is_legacy_hash(stored: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| stored.starts_with(prefix))
}

/// Check `plain` against a stored hash. Argon2 PHC strings and legacy bcrypt
/// hashes are both accepted. A mismatch is `Ok(false)`; a hash that cannot be
/// parsed is an error.
pub fn verify_password(plain: &str, stored: &str) -> Result<bool, AuthError> {
    if is_legacy_hash(stored) {
        return Ok(bcrypt::verify(plain, stored)?);
    }

    let parsed = PasswordHash::new(stored).map_err(AuthError::Hash)?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hash(e)),
    }
}

// ── Tokens ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens signed with one shared secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
}

impl TokenService {
    pub fn new(secret: &str, validity_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validity: Duration::hours(validity_hours as i64),
        }
    }

    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            username: username.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Sign)
    }

    /// Decode `token`, rejecting bad signatures and expired tokens.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

// ── AuthUser extractor ─────────────────────────────────────────────────────

/// Extractor that enforces a valid bearer token on any handler that takes it
/// as a parameter. A request without an Authorization header is rejected
/// with 401; a malformed header or a bad or expired token with 403, so the
/// handler never runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| match rejection.reason() {
                    TypedHeaderRejectionReason::Missing => ApiError::MissingToken,
                    _ => ApiError::InvalidToken,
                })?;

        let state = Arc::<AppState>::from_ref(state);
        let claims = state.tokens.verify(bearer.token())?;

        Ok(AuthUser {
            username: claims.username,
        })
    }
}
