//! Identity gateway.
//!
//! The identity provider lives outside this service; requests arrive with a
//! bearer JWT it issued. Validation auto-creates the user row on first sight
//! and refreshes the profile and last-login after that. Admin status comes
//! from the user record's flag or the configured admin-email list.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::User;
use crate::services::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| Error::Unauthorized)?;
    Ok(data.claims)
}

/// Issue a token the gateway would accept. The production identity provider
/// signs with the same shared secret; this is also what the test suites use.
pub fn issue_token(
    sub: &str,
    email: &str,
    name: &str,
    secret: &str,
    expires_in: Duration,
) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        exp: (now + expires_in).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("token encoding failed: {e}")))
}

/// Resolve the request principal from a bearer token, creating the user row
/// on first sight. The returned record carries the effective admin flag.
pub async fn authenticate(state: &AppState, bearer: &str) -> Result<User> {
    let claims = validate_token(bearer, &state.config.jwt_secret)?;
    let mut user = state
        .users
        .upsert_login(&claims.sub, &claims.email, &claims.name)
        .await?;
    if state.config.is_admin_email(&user.email) {
        user.is_admin = true;
    }
    Ok(user)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Required principal: rejects with 401 when the token is missing or bad.
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn require_admin(&self) -> Result<()> {
        if self.0.is_admin {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self> {
        let token = bearer_token(parts).ok_or(Error::Unauthorized)?;
        let user = authenticate(state, token).await?;
        Ok(CurrentUser(user))
    }
}

/// Optional principal: anonymous requests resolve to `None`, a present but
/// invalid token is still rejected.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self> {
        match bearer_token(parts) {
            None => Ok(MaybeUser(None)),
            Some(token) => {
                let user = authenticate(state, token).await?;
                Ok(MaybeUser(Some(user)))
            }
        }
    }
}
