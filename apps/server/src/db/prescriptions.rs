//! Prescription repository.

use sqlx::PgPool;

use super::query::{bind_query_as, bind_query_scalar, BindValue, Page, Paged, QueryBuilder, UpdateBuilder};
use crate::error::Error;
use crate::models::{
    CreatePrescriptionRequest, Prescription, PrescriptionStatus, UpdatePrescriptionRequest,
};
use crate::policy::Scope;
use crate::Result;

const ORDER: &str = "prescribed_date DESC, created_at DESC, id DESC";

#[derive(Debug, Default, Clone)]
pub struct PrescriptionFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl PrescriptionFilter {
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
pub struct PrescriptionRepository {
    pool: PgPool,
}

impl PrescriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreatePrescriptionRequest) -> Result<Prescription> {
        sqlx::query_as::<_, Prescription>(
            "INSERT INTO prescriptions (medical_record_id, patient_id, doctor_id, \
             medication_name, dosage, frequency, duration, instructions, status, \
             prescribed_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, CURRENT_DATE)) \
             RETURNING *",
        )
        .bind(request.medical_record_id)
        .bind(request.patient_id)
        .bind(request.doctor_id)
        .bind(&request.medication_name)
        .bind(&request.dosage)
        .bind(&request.frequency)
        .bind(&request.duration)
        .bind(&request.instructions)
        .bind(request.status.unwrap_or(PrescriptionStatus::Active))
        .bind(request.prescribed_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::store("create prescription", e))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Prescription>> {
        sqlx::query_as::<_, Prescription>("SELECT * FROM prescriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("find prescription by id", e))
    }

    pub async fn list(
        &self,
        filter: &PrescriptionFilter,
        page: Page,
    ) -> Result<Paged<Prescription>> {
        let mut builder = QueryBuilder::new(
            "SELECT * FROM prescriptions",
            "SELECT COUNT(*) FROM prescriptions",
        );
        if let Some(patient_id) = filter.patient_id {
            builder.filter_eq("patient_id", BindValue::Int(patient_id));
        }
        if let Some(doctor_id) = filter.doctor_id {
            builder.filter_eq("doctor_id", BindValue::Int(doctor_id));
        }
        builder.order_by(ORDER);
        builder.paginate(page);

        let (sql, binds) = builder.build();
        let items = bind_query_as(sqlx::query_as::<_, Prescription>(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("list prescriptions", e))?;

        let (count_sql, count_binds) = builder.build_count();
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), count_binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store("count prescriptions", e))?;

        Ok(Paged { items, total })
    }

    pub async fn update(
        &self,
        id: i64,
        patch: &UpdatePrescriptionRequest,
    ) -> Result<Option<Prescription>> {
        let mut builder = UpdateBuilder::new("prescriptions");
        builder
            .set_int("medical_record_id", patch.medical_record_id)
            .set_text("medication_name", patch.medication_name.clone())
            .set_text("dosage", patch.dosage.clone())
            .set_text("frequency", patch.frequency.clone())
            .set_text("duration", patch.duration.clone())
            .set_text("instructions", patch.instructions.clone())
            .set_cast_text(
                "status",
                "prescription_status",
                patch.status.map(|s| s.as_str()),
            )
            .set_date("prescribed_date", patch.prescribed_date);
        let (sql, binds) = builder.build(id)?;

        bind_query_as(sqlx::query_as::<_, Prescription>(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("update prescription", e))
    }

    pub async fn delete(&self, id: i64) -> Result<Option<Prescription>> {
        sqlx::query_as::<_, Prescription>("DELETE FROM prescriptions WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("delete prescription", e))
    }
}
