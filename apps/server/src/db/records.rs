//! Medical record repository.

use sqlx::PgPool;

use super::query::{bind_query_as, bind_query_scalar, BindValue, Page, Paged, QueryBuilder, UpdateBuilder};
use crate::error::Error;
use crate::models::{CreateRecordRequest, MedicalRecord, UpdateRecordRequest};
use crate::policy::Scope;
use crate::Result;

const ORDER: &str = "record_date DESC, created_at DESC, id DESC";

#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl RecordFilter {
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
pub struct RecordRepository {
    pool: PgPool,
}

impl RecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateRecordRequest) -> Result<MedicalRecord> {
        sqlx::query_as::<_, MedicalRecord>(
            "INSERT INTO medical_records (patient_id, doctor_id, appointment_id, \
             record_type, title, description, diagnosis, treatment_plan, file_path, \
             record_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, CURRENT_DATE)) \
             RETURNING *",
        )
        .bind(request.patient_id)
        .bind(request.doctor_id)
        .bind(request.appointment_id)
        .bind(request.record_type)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.diagnosis)
        .bind(&request.treatment_plan)
        .bind(&request.file_path)
        .bind(request.record_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::store("create medical record", e))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<MedicalRecord>> {
        sqlx::query_as::<_, MedicalRecord>("SELECT * FROM medical_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("find medical record by id", e))
    }

    pub async fn list(&self, filter: &RecordFilter, page: Page) -> Result<Paged<MedicalRecord>> {
        let mut builder = QueryBuilder::new(
            "SELECT * FROM medical_records",
            "SELECT COUNT(*) FROM medical_records",
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
        let items = bind_query_as(sqlx::query_as::<_, MedicalRecord>(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("list medical records", e))?;

        let (count_sql, count_binds) = builder.build_count();
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), count_binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store("count medical records", e))?;

        Ok(Paged { items, total })
    }

    pub async fn update(
        &self,
        id: i64,
        patch: &UpdateRecordRequest,
    ) -> Result<Option<MedicalRecord>> {
        let mut builder = UpdateBuilder::new("medical_records");
        builder
            .set_int("appointment_id", patch.appointment_id)
            .set_cast_text(
                "record_type",
                "record_type",
                patch.record_type.map(|t| t.as_str()),
            )
            .set_text("title", patch.title.clone())
            .set_text("description", patch.description.clone())
            .set_text("diagnosis", patch.diagnosis.clone())
            .set_text("treatment_plan", patch.treatment_plan.clone())
            .set_text("file_path", patch.file_path.clone())
            .set_date("record_date", patch.record_date);
        let (sql, binds) = builder.build(id)?;

        bind_query_as(sqlx::query_as::<_, MedicalRecord>(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("update medical record", e))
    }

    pub async fn delete(&self, id: i64) -> Result<Option<MedicalRecord>> {
        sqlx::query_as::<_, MedicalRecord>(
            "DELETE FROM medical_records WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("delete medical record", e))
    }
}
