//! Registration, login, token refresh, and the caller's own profile.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::api::envelope::ApiResponse;
use crate::api::extractors::ValidatedJson;
use crate::auth::{self, AuthError, CurrentUser};
use crate::db::UserRepository;
use crate::error::Error;
use crate::models::{LoginRequest, RefreshRequest, RegisterRequest, Role, User};
use crate::state::AppState;
use crate::Result;

/// Routes reachable without a bearer token.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

/// Routes behind the auth middleware.
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/profile", get(profile))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthData {
    user: User,
    token: String,
    refresh_token: String,
}

async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let role = Role::parse(&request.role)
        .ok_or_else(|| Error::validation("Invalid role. Must be patient, doctor, or admin."))?;

    let users = UserRepository::new(state.pool.clone());
    if users.email_exists(&request.email).await? {
        return Err(Error::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let digest = auth::hash_password(&request.password, state.config.auth.bcrypt_cost)?;
    let user = users
        .create(
            &request.email,
            &digest,
            role,
            &request.first_name,
            &request.last_name,
        )
        .await?;

    let token = state.tokens.issue_access(user.id)?;
    let refresh_token = state.tokens.issue_refresh(user.id)?;

    tracing::info!(user_id = user.id, role = role.as_str(), "User registered");

    Ok(ApiResponse::with_message(
        AuthData {
            user,
            token,
            refresh_token,
        },
        "User registered successfully",
    )
    .created())
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool.clone());

    // Unknown email, wrong password, and deactivated account all fail with
    // the identical message: no account enumeration.
    let credentials = users
        .find_by_email(&request.email)
        .await?
        .ok_or_else(Error::invalid_credentials)?;

    if !auth::verify_password(&request.password, &credentials.password_hash) {
        return Err(Error::invalid_credentials());
    }
    if !credentials.is_active {
        return Err(Error::invalid_credentials());
    }

    let user = credentials.into_public();
    let token = state.tokens.issue_access(user.id)?;
    let refresh_token = state.tokens.issue_refresh(user.id)?;

    Ok(ApiResponse::with_message(
        AuthData {
            user,
            token,
            refresh_token,
        },
        "Login successful",
    ))
}

async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<impl IntoResponse> {
    let user_id = state
        .tokens
        .verify_refresh(&request.refresh_token)
        .map_err(Error::Authentication)?;

    let user = UserRepository::new(state.pool.clone())
        .find_by_id(user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or(Error::Authentication(AuthError::UserNotFound))?;

    let token = state.tokens.issue_access(user.id)?;
    let refresh_token = state.tokens.issue_refresh(user.id)?;

    Ok(ApiResponse::ok(AuthData {
        user,
        token,
        refresh_token,
    }))
}

async fn profile(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse> {
    Ok(ApiResponse::with_message(
        user,
        "Profile retrieved successfully",
    ))
}
