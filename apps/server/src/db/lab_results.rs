//! Lab result repository.
//!
//! Lab rows carry no doctor reference; doctor-scoped access resolves
//! through the anchoring medical record.

use sqlx::PgPool;

use super::query::{bind_query_as, bind_query_scalar, BindValue, Page, Paged, QueryBuilder, UpdateBuilder};
use crate::error::Error;
use crate::models::{
    CreateLabResultRequest, LabResult, LabResultDetail, LabStatus, UpdateLabResultRequest,
};
use crate::policy::Scope;
use crate::Result;

const ORDER: &str = "test_date DESC, created_at DESC, id DESC";

#[derive(Debug, Default, Clone)]
pub struct LabResultFilter {
    pub patient_id: Option<i64>,
    /// Restricts to results whose medical record belongs to this doctor.
    pub record_doctor_id: Option<i64>,
}

impl LabResultFilter {
    pub fn apply_scope(&mut self, scope: &Scope) {
        if let Some(patient_id) = scope.patient_id {
            self.patient_id = Some(patient_id);
        }
        if let Some(doctor_id) = scope.doctor_id {
            self.record_doctor_id = Some(doctor_id);
        }
    }
}

#[derive(Clone)]
pub struct LabResultRepository {
    pool: PgPool,
}

impl LabResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateLabResultRequest) -> Result<LabResult> {
        sqlx::query_as::<_, LabResult>(
            "INSERT INTO lab_results (medical_record_id, patient_id, test_name, test_type, \
             result_value, reference_range, unit, status, test_date, lab_technician, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, CURRENT_DATE), $10, $11) \
             RETURNING *",
        )
        .bind(request.medical_record_id)
        .bind(request.patient_id)
        .bind(&request.test_name)
        .bind(&request.test_type)
        .bind(&request.result_value)
        .bind(&request.reference_range)
        .bind(&request.unit)
        .bind(request.status.unwrap_or(LabStatus::Pending))
        .bind(request.test_date)
        .bind(&request.lab_technician)
        .bind(&request.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::store("create lab result", e))
    }

    /// Single result with the anchoring record's doctor id for ownership
    /// checks.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<LabResultDetail>> {
        sqlx::query_as::<_, LabResultDetail>(
            "SELECT l.*, mr.doctor_id AS record_doctor_id \
             FROM lab_results l \
             LEFT JOIN medical_records mr ON mr.id = l.medical_record_id \
             WHERE l.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("find lab result by id", e))
    }

    pub async fn list(&self, filter: &LabResultFilter, page: Page) -> Result<Paged<LabResult>> {
        let mut builder = QueryBuilder::new(
            "SELECT * FROM lab_results",
            "SELECT COUNT(*) FROM lab_results",
        );
        if let Some(patient_id) = filter.patient_id {
            builder.filter_eq("patient_id", BindValue::Int(patient_id));
        }
        if let Some(doctor_id) = filter.record_doctor_id {
            builder.filter_with(
                "EXISTS (SELECT 1 FROM medical_records mr \
                 WHERE mr.id = lab_results.medical_record_id AND mr.doctor_id = $?)",
                BindValue::Int(doctor_id),
            );
        }
        builder.order_by(ORDER);
        builder.paginate(page);

        let (sql, binds) = builder.build();
        let items = bind_query_as(sqlx::query_as::<_, LabResult>(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("list lab results", e))?;

        let (count_sql, count_binds) = builder.build_count();
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), count_binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store("count lab results", e))?;

        Ok(Paged { items, total })
    }

    pub async fn update(
        &self,
        id: i64,
        patch: &UpdateLabResultRequest,
    ) -> Result<Option<LabResult>> {
        let mut builder = UpdateBuilder::new("lab_results");
        builder
            .set_int("medical_record_id", patch.medical_record_id)
            .set_text("test_name", patch.test_name.clone())
            .set_text("test_type", patch.test_type.clone())
            .set_text("result_value", patch.result_value.clone())
            .set_text("reference_range", patch.reference_range.clone())
            .set_text("unit", patch.unit.clone())
            .set_cast_text("status", "lab_status", patch.status.map(|s| s.as_str()))
            .set_date("test_date", patch.test_date)
            .set_text("lab_technician", patch.lab_technician.clone())
            .set_text("notes", patch.notes.clone());
        let (sql, binds) = builder.build(id)?;

        bind_query_as(sqlx::query_as::<_, LabResult>(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("update lab result", e))
    }

    pub async fn delete(&self, id: i64) -> Result<Option<LabResult>> {
        sqlx::query_as::<_, LabResult>("DELETE FROM lab_results WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("delete lab result", e))
    }
}
