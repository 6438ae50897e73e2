//! Signed tokens and password handling.
//!
//! The [`Signer`] covers both token kinds the application hands out: the
//! activation token mailed after registration (payload: username) and the
//! session token returned by login (payload: user id). Both are
//! HMAC-SHA256-signed, base64url-encoded strings. The signer is built once at
//! startup from the secret key and travels inside `AppState`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use model::entities::user;
use sea_orm::EntityTrait;
use sha2::Sha256;
use thiserror::Error;
use tracing::{error, warn};

use crate::schemas::{AppState, ErrorResponse};

type HmacSha256 = Hmac<Sha256>;

const ACTIVATION_PREFIX: &str = "activate";
const SESSION_PREFIX: &str = "session";

/// Raised whenever a token is malformed, carries the wrong payload kind, or
/// fails signature verification. Deliberately a single variant: callers must
/// not be able to tell a bad signature from a doctored payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature does not verify")]
    Invalid,
}

/// HMAC-SHA256 signer for activation and session tokens.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(secret: &str) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret.as_bytes())?,
        })
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let tag = mac.finalize().into_bytes();
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(tag)
        )
    }

    fn unsign(&self, token: &str) -> Result<String, TokenError> {
        let (payload_b64, tag_b64) = token.split_once('.').ok_or(TokenError::Invalid)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Invalid)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| TokenError::Invalid)?;

        let mut mac = self.mac.clone();
        mac.update(&payload);
        // verify_slice compares in constant time
        mac.verify_slice(&tag).map_err(|_| TokenError::Invalid)?;

        String::from_utf8(payload).map_err(|_| TokenError::Invalid)
    }

    /// Token embedded in the activation link mailed after registration.
    pub fn sign_activation(&self, username: &str) -> String {
        self.sign(&format!("{ACTIVATION_PREFIX}:{username}"))
    }

    /// Extracts the username from an activation token.
    pub fn verify_activation(&self, token: &str) -> Result<String, TokenError> {
        let payload = self.unsign(token)?;
        payload
            .strip_prefix(&format!("{ACTIVATION_PREFIX}:"))
            .map(str::to_string)
            .ok_or(TokenError::Invalid)
    }

    /// Token handed out by a successful login.
    pub fn sign_session(&self, user_id: i32) -> String {
        self.sign(&format!("{SESSION_PREFIX}:{user_id}"))
    }

    /// Extracts the user id from a session token.
    pub fn verify_session(&self, token: &str) -> Result<i32, TokenError> {
        let payload = self.unsign(token)?;
        payload
            .strip_prefix(&format!("{SESSION_PREFIX}:"))
            .and_then(|id| id.parse().ok())
            .ok_or(TokenError::Invalid)
    }
}

/// Hashes a password with Argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verifies if a provided password matches a stored Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Currently authenticated user, resolved from the `Authorization: Bearer`
/// session token. Rejects with 401 when the token is missing or invalid, or
/// when it no longer maps onto an active user (deleted accounts fall out
/// here, which is what invalidates their outstanding sessions).
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

/// Anonymous-friendly variant of [`AuthUser`]: a missing or stale token
/// yields `None`, the way guest visitors browse listings.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<user::Model>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Authentication required".to_string(),
            code: "AUTH_FAILED".to_string(),
            success: false,
        }),
    )
}

async fn resolve_session_user(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<user::Model>, sea_orm::DbErr> {
    let Some(token) = bearer_token(parts) else {
        return Ok(None);
    };
    let Ok(user_id) = state.signer.verify_session(token) else {
        warn!("Rejecting request with an invalid session token");
        return Ok(None);
    };

    let user = user::Entity::find_by_id(user_id).one(&state.db).await?;
    Ok(user.filter(|u| u.is_active))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_session_user(parts, state).await {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => Err(unauthorized()),
            Err(db_error) => {
                error!("Failed to resolve session user: {}", db_error);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to resolve session".to_string(),
                        code: "ERROR".to_string(),
                        success: false,
                    }),
                ))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_session_user(parts, state).await {
            Ok(user) => Ok(OptionalAuthUser(user)),
            Err(db_error) => {
                error!("Failed to resolve session user: {}", db_error);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to resolve session".to_string(),
                        code: "ERROR".to_string(),
                        success: false,
                    }),
                ))
            }
        }
    }
}
