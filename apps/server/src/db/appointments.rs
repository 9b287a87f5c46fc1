//! Appointment repository.

use sqlx::PgPool;

use super::query::{bind_query_as, bind_query_scalar, BindValue, Page, Paged, QueryBuilder, UpdateBuilder};
use crate::error::Error;
use crate::models::{
    Appointment, AppointmentDetail, AppointmentStatus, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::policy::Scope;
use crate::Result;

const ORDER: &str = "appointment_date DESC, appointment_time DESC, id DESC";

/// Listing filters. The policy engine's forced scope is applied on top and
/// always wins over caller-supplied patient/doctor values.
#[derive(Debug, Default, Clone)]
pub struct AppointmentFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub status: Option<&'static str>,
    pub date_from: Option<chrono::NaiveDate>,
    pub date_to: Option<chrono::NaiveDate>,
}

impl AppointmentFilter {
    pub fn apply_scope(&mut self, scope: &Scope) {
        if let Some(patient_id) = scope.patient_id {
            self.patient_id = Some(patient_id);
        }
        if let Some(doctor_id) = scope.doctor_id {
            self.doctor_id = Some(doctor_id);
        }
    }
}

#[derive(Clone)]
pub struct AppointmentRepository {
    pool: PgPool,
}

impl AppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateAppointmentRequest) -> Result<Appointment> {
        sqlx::query_as::<_, Appointment>(
            "INSERT INTO appointments (patient_id, doctor_id, appointment_date, \
             appointment_time, duration_minutes, status, reason, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(request.patient_id)
        .bind(request.doctor_id)
        .bind(request.appointment_date)
        .bind(request.appointment_time)
        .bind(request.duration_minutes.unwrap_or(30))
        .bind(request.status.unwrap_or(AppointmentStatus::Scheduled))
        .bind(&request.reason)
        .bind(&request.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::store("create appointment", e))
    }

    /// Single appointment with both parties' owning user ids for the
    /// policy check. No active-user gate: historical appointments stay
    /// readable after a profile is deactivated.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<AppointmentDetail>> {
        sqlx::query_as::<_, AppointmentDetail>(
            "SELECT a.*, p.user_id AS patient_user_id, d.user_id AS doctor_user_id \
             FROM appointments a \
             LEFT JOIN patients p ON a.patient_id = p.id \
             LEFT JOIN doctors d ON a.doctor_id = d.id \
             WHERE a.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("find appointment by id", e))
    }

    pub async fn list(&self, filter: &AppointmentFilter, page: Page) -> Result<Paged<Appointment>> {
        let mut builder = QueryBuilder::new(
            "SELECT * FROM appointments",
            "SELECT COUNT(*) FROM appointments",
        );
        if let Some(patient_id) = filter.patient_id {
            builder.filter_eq("patient_id", BindValue::Int(patient_id));
        }
        if let Some(doctor_id) = filter.doctor_id {
            builder.filter_eq("doctor_id", BindValue::Int(doctor_id));
        }
        if let Some(status) = filter.status {
            builder.filter_with(
                "status = $?::appointment_status",
                BindValue::Text(status.to_string()),
            );
        }
        if let Some(date_from) = filter.date_from {
            builder.filter_ge("appointment_date", BindValue::Date(date_from));
        }
        if let Some(date_to) = filter.date_to {
            builder.filter_le("appointment_date", BindValue::Date(date_to));
        }
        builder.order_by(ORDER);
        builder.paginate(page);

        let (sql, binds) = builder.build();
        let items = bind_query_as(sqlx::query_as::<_, Appointment>(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("list appointments", e))?;

        let (count_sql, count_binds) = builder.build_count();
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), count_binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store("count appointments", e))?;

        Ok(Paged { items, total })
    }

    pub async fn update(
        &self,
        id: i64,
        patch: &UpdateAppointmentRequest,
    ) -> Result<Option<Appointment>> {
        let mut builder = UpdateBuilder::new("appointments");
        builder
            .set_date("appointment_date", patch.appointment_date)
            .set_time("appointment_time", patch.appointment_time)
            .set_int("duration_minutes", patch.duration_minutes.map(i64::from))
            .set_cast_text(
                "status",
                "appointment_status",
                patch.status.map(|s| s.as_str()),
            )
            .set_text("reason", patch.reason.clone())
            .set_text("notes", patch.notes.clone());
        let (sql, binds) = builder.build(id)?;

        bind_query_as(sqlx::query_as::<_, Appointment>(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("update appointment", e))
    }

    /// Cancel is a status mutation, not a deletion, and is idempotent:
    /// cancelling twice returns the already-cancelled row without error.
    pub async fn cancel(&self, id: i64) -> Result<Option<Appointment>> {
        sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET status = 'cancelled', updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("cancel appointment", e))
    }
}
