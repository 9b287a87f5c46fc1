//! Patient profile endpoints.
//!
//! Lookups by profile id fetch first (404 when absent) and check ownership
//! second (403); lookups by owned key enforce policy before the store.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Deserialize;

use super::{ensure, resolve_caller};
use crate::api::envelope::{ApiResponse, Pagination};
use crate::api::extractors::ValidatedJson;
use crate::auth::CurrentUser;
use crate::db::{Page, PatientRepository};
use crate::error::Error;
use crate::models::{CreatePatientRequest, UpdatePatientRequest};
use crate::policy::{decide, Action};
use crate::state::AppState;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/me", get(me))
        .route("/all", get(list))
        .route("/user/:user_id", get(get_by_user))
        .route("/:id", get(get_by_id))
        .route("/:id", put(update))
        .route("/:id", delete(remove))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<CreatePatientRequest>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::CreatePatient {
            profile_user_id: request.user_id,
        },
    ))?;

    let patients = PatientRepository::new(state.pool.clone());
    if patients.find_by_user_id(request.user_id).await?.is_some() {
        return Err(Error::Conflict(
            "Patient profile already exists for this user".to_string(),
        ));
    }

    let patient = patients.create(&request).await?;
    Ok(ApiResponse::with_message(patient, "Patient profile created successfully").created())
}

async fn get_by_id(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let profile = PatientRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Patient not found".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::ReadPatient {
            owner_user_id: profile.patient.user_id,
        },
    ))?;

    Ok(ApiResponse::ok(profile))
}

async fn get_by_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse> {
    // Ownership gates the owned-key lookup before the store is touched.
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::ReadPatientByUser {
            target_user_id: user_id,
        },
    ))?;

    let profile = PatientRepository::new(state.pool.clone())
        .find_by_user_id(user_id)
        .await?
        .ok_or_else(|| Error::NotFound("Patient profile not found".to_string()))?;

    Ok(ApiResponse::ok(profile))
}

async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse> {
    let profile = PatientRepository::new(state.pool.clone())
        .find_by_user_id(user.id)
        .await?
        .ok_or_else(|| {
            Error::NotFound("Patient profile not found. Please create your profile first.".to_string())
        })?;

    Ok(ApiResponse::ok(profile))
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdatePatientRequest>,
) -> Result<impl IntoResponse> {
    let patients = PatientRepository::new(state.pool.clone());
    let existing = patients
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Patient not found".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::UpdatePatient {
            owner_user_id: existing.patient.user_id,
        },
    ))?;

    let updated = patients
        .update(id, &patch)
        .await?
        .ok_or_else(|| Error::NotFound("Patient not found".to_string()))?;

    Ok(ApiResponse::with_message(
        updated,
        "Patient profile updated successfully",
    ))
}

async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let patients = PatientRepository::new(state.pool.clone());
    let existing = patients
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Patient not found".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::DeletePatient {
            owner_user_id: existing.patient.user_id,
        },
    ))?;

    patients.deactivate(id).await?;
    Ok(ApiResponse::message("Patient profile deleted successfully"))
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(&caller, &Action::ListPatients))?;

    let page = Page::new(query.page, query.limit, Page::DEFAULT_LIMIT);
    let search = query.search.as_deref().filter(|s| !s.is_empty());

    let paged = PatientRepository::new(state.pool.clone())
        .find_all(search, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}
