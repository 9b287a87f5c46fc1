//! Message endpoints.
//!
//! Inbox and outbox are scoped to the authenticated caller; the message's
//! own sender/recipient ids gate everything else.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Deserialize;

use super::{ensure, resolve_caller};
use crate::api::envelope::{ApiResponse, Pagination};
use crate::api::extractors::ValidatedJson;
use crate::auth::CurrentUser;
use crate::db::{MessageRepository, Page, UserRepository};
use crate::error::Error;
use crate::models::CreateMessageRequest;
use crate::policy::{decide, Action};
use crate::state::AppState;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/inbox", get(inbox))
        .route("/outbox", get(outbox))
        .route("/:id", get(get_by_id))
        .route("/:id/read", put(mark_read))
        .route("/:id", delete(remove))
}

#[derive(Debug, Deserialize)]
struct InboxQuery {
    page: Option<i64>,
    limit: Option<i64>,
    #[serde(default)]
    unread_only: bool,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<CreateMessageRequest>,
) -> Result<impl IntoResponse> {
    // Any authenticated user may message any other existing user.
    UserRepository::new(state.pool.clone())
        .find_by_id(request.recipient_id)
        .await?
        .ok_or_else(|| Error::NotFound("Recipient not found.".to_string()))?;

    let message = MessageRepository::new(state.pool.clone())
        .create(user.id, &request)
        .await?;
    Ok(ApiResponse::ok(message).created())
}

async fn inbox(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<InboxQuery>,
) -> Result<impl IntoResponse> {
    // Identity comes from the token, never from a parameter.
    let page = Page::new(query.page, query.limit, Page::MESSAGE_LIMIT);
    let paged = MessageRepository::new(state.pool.clone())
        .inbox(user.id, query.unread_only, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn outbox(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let page = Page::new(query.page, query.limit, Page::MESSAGE_LIMIT);
    let paged = MessageRepository::new(state.pool.clone())
        .outbox(user.id, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn get_by_id(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let message = MessageRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Message not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::ReadMessage {
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
        },
    ))?;

    Ok(ApiResponse::ok(message))
}

async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let messages = MessageRepository::new(state.pool.clone());
    let message = messages
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Message not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::MarkMessageRead {
            recipient_id: message.recipient_id,
        },
    ))?;

    let updated = messages
        .mark_read(id)
        .await?
        .ok_or_else(|| Error::NotFound("Message not found.".to_string()))?;

    Ok(ApiResponse::ok(updated))
}

async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let messages = MessageRepository::new(state.pool.clone());
    let message = messages
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Message not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::DeleteMessage {
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
        },
    ))?;

    messages
        .delete(id)
        .await?
        .ok_or_else(|| Error::NotFound("Message not found.".to_string()))?;

    Ok(ApiResponse::message("Message deleted successfully."))
}
