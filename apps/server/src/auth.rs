//! Authentication primitives.
//!
//! Issues and verifies the two bearer credentials: a short-lived access
//! token and a longer-lived refresh token signed with a distinct secret,
//! so neither kind verifies as the other. The middleware resolves the
//! caller from the store on every request; a user deactivated after
//! issuance fails with its own 401 kind.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::db::UserRepository;
use crate::models::User;
use crate::state::AppState;
use crate::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Authentication failure kinds. Each maps to 401 with a stable message so
/// callers get an actionable reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Access denied. No token provided or invalid format.")]
    MissingToken,
    #[error("Access denied. Token expired.")]
    Expired,
    #[error("Access denied. Invalid token.")]
    Malformed,
    #[error("Access denied. User not found.")]
    UserNotFound,
    #[error("Invalid email or password")]
    InvalidCredentials,
}

#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_hours: i64,
    refresh_ttl_days: i64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl_hours: config.access_ttl_hours,
            refresh_ttl_days: config.refresh_ttl_days,
        }
    }

    pub fn issue_access(&self, user_id: i64) -> Result<String, Error> {
        self.issue(
            user_id,
            chrono::Duration::hours(self.access_ttl_hours),
            &self.access_encoding,
        )
    }

    pub fn issue_refresh(&self, user_id: i64) -> Result<String, Error> {
        self.issue(
            user_id,
            chrono::Duration::days(self.refresh_ttl_days),
            &self.refresh_encoding,
        )
    }

    fn issue(
        &self,
        user_id: i64,
        ttl: chrono::Duration,
        key: &EncodingKey,
    ) -> Result<String, Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, key)
            .map_err(|e| Error::Internal(format!("sign token: {e}")))
    }

    pub fn verify_access(&self, token: &str) -> Result<i64, AuthError> {
        verify(token, &self.access_decoding)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<i64, AuthError> {
        verify(token, &self.refresh_decoding)
    }
}

fn verify(token: &str, key: &DecodingKey) -> Result<i64, AuthError> {
    let validation = Validation::default();
    match decode::<Claims>(token, key, &validation) {
        Ok(data) => Ok(data.claims.sub),
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AuthError::Expired),
            _ => Err(AuthError::Malformed),
        },
    }
}

/// One-way password digest with a configurable cost factor. Plaintext
/// never leaves this function's scope.
pub fn hash_password(plain: &str, cost: u32) -> Result<String, Error> {
    bcrypt::hash(plain, cost).map_err(|e| Error::Internal(format!("hash password: {e}")))
}

pub fn verify_password(plain: &str, digest: &str) -> bool {
    bcrypt::verify(plain, digest).unwrap_or(false)
}

/// Extractor for the authenticated user attached by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or(Error::Authentication(AuthError::MissingToken))
    }
}

/// Middleware for protected routes: validates the bearer token, loads the
/// referenced user, and attaches it to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

async fn authenticate(
    state: &AppState,
    headers: &axum::http::HeaderMap,
) -> Result<User, Error> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = authorization
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)?;

    let user_id = state.tokens.verify_access(token)?;

    // Deactivation after issuance invalidates the token.
    let user = UserRepository::new(state.pool.clone())
        .find_by_id(user_id)
        .await?;
    match user {
        Some(user) if user.is_active => Ok(user),
        _ => Err(AuthError::UserNotFound.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig {
            access_secret: "unit-test-access-secret".into(),
            refresh_secret: "unit-test-refresh-secret".into(),
            access_ttl_hours: 24,
            refresh_ttl_days: 7,
            bcrypt_cost: 4,
        })
    }

    #[test]
    fn access_token_round_trips() {
        let issuer = issuer();
        let token = issuer.issue_access(42).unwrap();
        assert_eq!(issuer.verify_access(&token).unwrap(), 42);
    }

    #[test]
    fn refresh_token_round_trips() {
        let issuer = issuer();
        let token = issuer.issue_refresh(42).unwrap();
        assert_eq!(issuer.verify_refresh(&token).unwrap(), 42);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        // Distinct secrets: neither kind verifies as the other.
        let issuer = issuer();
        let refresh = issuer.issue_refresh(42).unwrap();
        assert_eq!(issuer.verify_access(&refresh), Err(AuthError::Malformed));
        let access = issuer.issue_access(42).unwrap();
        assert_eq!(issuer.verify_refresh(&access), Err(AuthError::Malformed));
    }

    #[test]
    fn expired_token_maps_to_expired_kind() {
        let issuer = TokenIssuer::new(&AuthConfig {
            access_secret: "unit-test-access-secret".into(),
            refresh_secret: "unit-test-refresh-secret".into(),
            access_ttl_hours: -2, // already expired, beyond validation leeway
            refresh_ttl_days: 7,
            bcrypt_cost: 4,
        });
        let token = issuer.issue_access(42).unwrap();
        assert_eq!(issuer.verify_access(&token), Err(AuthError::Expired));
    }

    #[test]
    fn garbage_token_maps_to_malformed_kind() {
        let issuer = issuer();
        assert_eq!(
            issuer.verify_access("not.a.token"),
            Err(AuthError::Malformed)
        );
        assert_eq!(issuer.verify_access(""), Err(AuthError::Malformed));
    }

    #[test]
    fn wrong_secret_maps_to_malformed_kind() {
        let issuer = issuer();
        let other = TokenIssuer::new(&AuthConfig {
            access_secret: "a-completely-different-secret".into(),
            refresh_secret: "another-different-secret".into(),
            access_ttl_hours: 24,
            refresh_ttl_days: 7,
            bcrypt_cost: 4,
        });
        let token = other.issue_access(42).unwrap();
        assert_eq!(issuer.verify_access(&token), Err(AuthError::Malformed));
    }

    #[test]
    fn password_digest_round_trips() {
        let digest = hash_password("correct horse battery staple", 4).unwrap();
        assert_ne!(digest, "correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &digest));
        assert!(!verify_password("wrong password", &digest));
    }

    #[test]
    fn verify_password_tolerates_invalid_digests() {
        assert!(!verify_password("anything", "not-a-bcrypt-digest"));
    }
}
