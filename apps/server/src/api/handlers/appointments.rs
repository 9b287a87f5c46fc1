//! Appointment endpoints.
//!
//! Non-privileged callers never see another party's rows: the policy
//! engine forces their own profile id into every listing, overriding any
//! conflicting path or query parameter.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{ensure, resolve_caller};
use crate::api::envelope::{ApiResponse, Pagination};
use crate::api::extractors::ValidatedJson;
use crate::auth::CurrentUser;
use crate::db::{AppointmentFilter, AppointmentRepository, Page};
use crate::error::Error;
use crate::models::{AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::policy::{decide, Action};
use crate::state::AppState;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/", get(list))
        .route("/patient/:id", get(by_patient))
        .route("/doctor/:id", get(by_doctor))
        .route("/:id", get(get_by_id))
        .route("/:id", put(update))
        .route("/:id", delete(cancel))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<AppointmentStatus>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    patient_id: Option<i64>,
    doctor_id: Option<i64>,
}

impl ListQuery {
    fn filter(&self) -> AppointmentFilter {
        AppointmentFilter {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            status: self.status.map(|s| s.as_str()),
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }

    fn page(&self) -> Page {
        Page::new(self.page, self.limit, Page::DEFAULT_LIMIT)
    }
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<CreateAppointmentRequest>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::CreateAppointment {
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
        },
    ))?;

    let appointment = AppointmentRepository::new(state.pool.clone())
        .create(&request)
        .await?;
    Ok(ApiResponse::ok(appointment).created())
}

async fn get_by_id(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let detail = AppointmentRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Appointment not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::ReadAppointment {
            patient_user_id: detail.patient_user_id,
            doctor_user_id: detail.doctor_user_id,
        },
    ))?;

    Ok(ApiResponse::ok(detail))
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    let scope = ensure(decide(&caller, &Action::ListAppointments))?;

    let mut filter = query.filter();
    if let Some(scope) = scope {
        filter.apply_scope(&scope);
    }

    let page = query.page();
    let paged = AppointmentRepository::new(state.pool.clone())
        .list(&filter, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn by_patient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(patient_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    let scope = ensure(decide(&caller, &Action::ListAppointments))?;

    let mut filter = query.filter();
    filter.patient_id = Some(patient_id);
    if let Some(scope) = scope {
        filter.apply_scope(&scope);
    }

    let page = query.page();
    let paged = AppointmentRepository::new(state.pool.clone())
        .list(&filter, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn by_doctor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(doctor_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    let scope = ensure(decide(&caller, &Action::ListAppointments))?;

    let mut filter = query.filter();
    filter.doctor_id = Some(doctor_id);
    if let Some(scope) = scope {
        filter.apply_scope(&scope);
    }

    let page = query.page();
    let paged = AppointmentRepository::new(state.pool.clone())
        .list(&filter, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateAppointmentRequest>,
) -> Result<impl IntoResponse> {
    let appointments = AppointmentRepository::new(state.pool.clone());
    let detail = appointments
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Appointment not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::UpdateAppointment {
            patient_user_id: detail.patient_user_id,
            doctor_user_id: detail.doctor_user_id,
        },
    ))?;

    let updated = appointments
        .update(id, &patch)
        .await?
        .ok_or_else(|| Error::NotFound("Appointment not found.".to_string()))?;

    Ok(ApiResponse::ok(updated))
}

/// DELETE cancels: a status mutation, never a row removal. Cancelling an
/// already-cancelled appointment returns it unchanged.
async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let appointments = AppointmentRepository::new(state.pool.clone());
    let detail = appointments
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Appointment not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::CancelAppointment {
            patient_user_id: detail.patient_user_id,
            doctor_user_id: detail.doctor_user_id,
        },
    ))?;

    let cancelled = appointments
        .cancel(id)
        .await?
        .ok_or_else(|| Error::NotFound("Appointment not found.".to_string()))?;

    Ok(ApiResponse::with_message(
        cancelled,
        "Appointment cancelled successfully.",
    ))
}
