//! Doctor profile and directory endpoints.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Deserialize;

use super::{ensure, resolve_caller};
use crate::api::envelope::{ApiResponse, Pagination};
use crate::api::extractors::ValidatedJson;
use crate::auth::CurrentUser;
use crate::db::{DoctorFilter, DoctorRepository, Page};
use crate::error::Error;
use crate::models::{CreateDoctorRequest, Role, UpdateDoctorRequest};
use crate::policy::{decide, Action};
use crate::state::AppState;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/", get(list))
        .route("/specialty/:specialization", get(by_specialty))
        .route("/me/profile", get(me))
        .route("/:id", get(get_by_id))
        .route("/:id", put(update))
        .route("/:id", delete(remove))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    specialization: Option<String>,
    is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<CreateDoctorRequest>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(&caller, &Action::CreateDoctor))?;
    request.validate_fee().map_err(Error::validation)?;

    let doctors = DoctorRepository::new(state.pool.clone());
    if doctors.find_by_user_id(request.user_id).await?.is_some() {
        return Err(Error::Conflict(
            "Doctor profile already exists for this user.".to_string(),
        ));
    }

    let doctor = doctors.create(&request).await?;
    Ok(ApiResponse::with_message(doctor, "Doctor profile created successfully.").created())
}

async fn get_by_id(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    // Directory read: open to any authenticated role.
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(&caller, &Action::ReadDoctorDirectory))?;

    let profile = DoctorRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Doctor not found".to_string()))?;

    Ok(ApiResponse::ok(profile))
}

async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse> {
    if user.role != Role::Doctor {
        return Err(Error::Forbidden(
            "Only doctors can access their own profile with this endpoint.".to_string(),
        ));
    }

    let profile = DoctorRepository::new(state.pool.clone())
        .find_by_user_id(user.id)
        .await?
        .ok_or_else(|| Error::NotFound("Doctor profile not found.".to_string()))?;

    Ok(ApiResponse::ok(profile))
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateDoctorRequest>,
) -> Result<impl IntoResponse> {
    let doctors = DoctorRepository::new(state.pool.clone());
    let existing = doctors
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Doctor not found".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::UpdateDoctor {
            owner_user_id: existing.doctor.user_id,
        },
    ))?;
    patch.validate_fee().map_err(Error::validation)?;

    let updated = doctors
        .update(id, &patch)
        .await?
        .ok_or_else(|| Error::NotFound("Doctor not found".to_string()))?;

    Ok(ApiResponse::with_message(
        updated,
        "Doctor profile updated successfully.",
    ))
}

async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(&caller, &Action::DeleteDoctor))?;

    let doctors = DoctorRepository::new(state.pool.clone());
    doctors
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Doctor not found".to_string()))?;

    doctors.deactivate(id).await?;
    Ok(ApiResponse::message(
        "Doctor profile deleted (deactivated) successfully.",
    ))
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(&caller, &Action::ReadDoctorDirectory))?;

    let page = Page::new(query.page, query.limit, Page::DEFAULT_LIMIT);
    let filter = DoctorFilter {
        search: query.search.filter(|s| !s.is_empty()),
        specialization: query.specialization.filter(|s| !s.is_empty()),
        is_available: query.is_available,
    };

    let paged = DoctorRepository::new(state.pool.clone())
        .find_all(&filter, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn by_specialty(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(specialization): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(&caller, &Action::ReadDoctorDirectory))?;

    let page = Page::new(query.page, query.limit, Page::DEFAULT_LIMIT);
    let paged = DoctorRepository::new(state.pool.clone())
        .find_by_specialization(&specialization, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}
