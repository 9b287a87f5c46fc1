//! Lab result endpoints.
//!
//! Lab rows carry no doctor reference, so doctor-scoped decisions resolve
//! authorship through the anchoring medical record.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Deserialize;

use super::{ensure, resolve_caller};
use crate::api::envelope::{ApiResponse, Pagination};
use crate::api::extractors::ValidatedJson;
use crate::auth::CurrentUser;
use crate::db::{LabResultFilter, LabResultRepository, Page, RecordRepository};
use crate::error::Error;
use crate::models::{CreateLabResultRequest, UpdateLabResultRequest};
use crate::policy::{decide, Action};
use crate::state::AppState;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/patient/:id", get(by_patient))
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
    ValidatedJson(request): ValidatedJson<CreateLabResultRequest>,
) -> Result<impl IntoResponse> {
    // The anchoring record must exist and supplies the authorship hint.
    let record = RecordRepository::new(state.pool.clone())
        .find_by_id(request.medical_record_id)
        .await?
        .ok_or_else(|| Error::NotFound("Medical record not found.".to_string()))?;

    if record.patient_id != request.patient_id {
        return Err(Error::validation(
            "patient_id does not match the medical record",
        ));
    }

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::CreateClinicalEntry {
            doctor_id: Some(record.doctor_id),
        },
    ))?;

    let lab_result = LabResultRepository::new(state.pool.clone())
        .create(&request)
        .await?;
    Ok(ApiResponse::ok(lab_result).created())
}

async fn get_by_id(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let detail = LabResultRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Lab result not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::ReadClinicalEntry {
            patient_id: detail.lab_result.patient_id,
            doctor_id: detail.record_doctor_id,
        },
    ))?;

    Ok(ApiResponse::ok(detail))
}

async fn by_patient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(patient_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let caller = resolve_caller(&state, &user).await?;
    let scope = ensure(decide(&caller, &Action::ListClinicalEntries))?;

    let mut filter = LabResultFilter {
        patient_id: Some(patient_id),
        record_doctor_id: None,
    };
    if let Some(scope) = scope {
        filter.apply_scope(&scope);
    }

    let page = Page::new(query.page, query.limit, Page::DEFAULT_LIMIT);
    let paged = LabResultRepository::new(state.pool.clone())
        .list(&filter, page)
        .await?;

    let pagination = Pagination::new(paged.total, &page);
    Ok(ApiResponse::paginated(paged.items, pagination))
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateLabResultRequest>,
) -> Result<impl IntoResponse> {
    let lab_results = LabResultRepository::new(state.pool.clone());
    let detail = lab_results
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Lab result not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::UpdateClinicalEntry {
            doctor_id: detail.record_doctor_id,
        },
    ))?;

    let updated = lab_results
        .update(id, &patch)
        .await?
        .ok_or_else(|| Error::NotFound("Lab result not found.".to_string()))?;

    Ok(ApiResponse::ok(updated))
}

async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let lab_results = LabResultRepository::new(state.pool.clone());
    let detail = lab_results
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Lab result not found.".to_string()))?;

    let caller = resolve_caller(&state, &user).await?;
    ensure(decide(
        &caller,
        &Action::DeleteClinicalEntry {
            doctor_id: detail.record_doctor_id,
        },
    ))?;

    let deleted = lab_results
        .delete(id)
        .await?
        .ok_or_else(|| Error::NotFound("Lab result not found.".to_string()))?;

    Ok(ApiResponse::with_message(
        deleted,
        "Lab result deleted successfully.",
    ))
}
