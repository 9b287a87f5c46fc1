//! Medical record endpoints.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Deserialize;

use super::{ensure, resolve_caller};
use crate::api::envelope::{ApiResponse, Pagination};
use crate::api::extractors::ValidatedJson;
use crate::auth::CurrentUser;
use crate::db::{Page, RecordFilter, RecordRepository};
use crate::error::Error;
use crate::models::{CreateRecordRequest, UpdateRecordRequest};
use crate::policy::{decide, Action};
use crate::state::AppState;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/patient/:id", get(by_patient))
        .route("/doctor/:id", get(by_doctor))
        .route("/:id", get(get_by_id))
        .route("/:id", put(update))
        .route("/:id", delete(remove))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<CreateRecordRequest>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::CreateClinicalEntry {
            doctor_id: Some(request.doctor_id),
        },
    ))?;

    let record = RecordRepository::new(state.pool.clone())
        .create(&request)
        .await?;
    Ok(ApiResponse::ok(record).created())
}

async fn get_by_id(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let record = RecordRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Medical record not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::ReadClinicalEntry {
            patient_id: record.patient_id,
            doctor_id: Some(record.doctor_id),
        },
    ))?;

    Ok(ApiResponse::ok(record))
}

async fn by_patient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(patient_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    let scope = ensure(decide(&caller, &Action::ListClinicalEntries))?;

    let mut filter = RecordFilter {
        patient_id: Some(patient_id),
        doctor_id: None,
    };
    if let Some(scope) = scope {
        filter.apply_scope(&scope);
    }

    let page = Page::new(query.page, query.limit, Page::DEFAULT_LIMIT);
    let paged = RecordRepository::new(state.pool.clone())
        .list(&filter, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn by_doctor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(doctor_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    let scope = ensure(decide(&caller, &Action::ListClinicalEntries))?;

    let mut filter = RecordFilter {
        patient_id: None,
        doctor_id: Some(doctor_id),
    };
    if let Some(scope) = scope {
        filter.apply_scope(&scope);
    }

    let page = Page::new(query.page, query.limit, Page::DEFAULT_LIMIT);
    let paged = RecordRepository::new(state.pool.clone())
        .list(&filter, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateRecordRequest>,
) -> Result<impl IntoResponse> {
    let records = RecordRepository::new(state.pool.clone());
    let existing = records
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Medical record not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::UpdateClinicalEntry {
            doctor_id: Some(existing.doctor_id),
        },
    ))?;

    let updated = records
        .update(id, &patch)
        .await?
        .ok_or_else(|| Error::NotFound("Medical record not found.".to_string()))?;

    Ok(ApiResponse::ok(updated))
}

async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let records = RecordRepository::new(state.pool.clone());
    let existing = records
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Medical record not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::DeleteClinicalEntry {
            doctor_id: Some(existing.doctor_id),
        },
    ))?;

    let deleted = records
        .delete(id)
        .await?
        .ok_or_else(|| Error::NotFound("Medical record not found.".to_string()))?;

    Ok(ApiResponse::with_message(
        deleted,
        "Medical record deleted successfully.",
    ))
}
