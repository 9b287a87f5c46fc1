//! Patient profile repository.

use sqlx::PgPool;

use super::query::{bind_query_as, bind_query_scalar, Page, Paged, QueryBuilder, UpdateBuilder};
use crate::error::{is_unique_violation, Error};
use crate::models::{CreatePatientRequest, Patient, PatientProfile, UpdatePatientRequest};
use crate::Result;

const PROFILE_SELECT: &str = "SELECT p.*, u.first_name, u.last_name, u.email, u.role \
     FROM patients p JOIN users u ON p.user_id = u.id";
const PROFILE_COUNT: &str =
    "SELECT COUNT(*) FROM patients p JOIN users u ON p.user_id = u.id";

#[derive(Clone)]
pub struct PatientRepository {
    pool: PgPool,
}

impl PatientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreatePatientRequest) -> Result<Patient> {
        sqlx::query_as::<_, Patient>(
            "INSERT INTO patients (user_id, date_of_birth, phone, address, \
             emergency_contact_name, emergency_contact_phone, blood_type, allergies, \
             medical_conditions, insurance_provider, insurance_policy_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(request.user_id)
        .bind(request.date_of_birth)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.emergency_contact_name)
        .bind(&request.emergency_contact_phone)
        .bind(&request.blood_type)
        .bind(&request.allergies)
        .bind(&request.medical_conditions)
        .bind(&request.insurance_provider)
        .bind(&request.insurance_policy_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("Patient profile already exists for this user".to_string())
            } else {
                Error::store("create patient", e)
            }
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<PatientProfile>> {
        sqlx::query_as::<_, PatientProfile>(&format!("{PROFILE_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("find patient by id", e))
    }

    pub async fn find_by_user_id(&self, user_id: i64) -> Result<Option<PatientProfile>> {
        sqlx::query_as::<_, PatientProfile>(&format!("{PROFILE_SELECT} WHERE p.user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("find patient by user id", e))
    }

    pub async fn update(&self, id: i64, patch: &UpdatePatientRequest) -> Result<Option<Patient>> {
        let mut builder = UpdateBuilder::new("patients");
        builder
            .set_date("date_of_birth", patch.date_of_birth)
            .set_text("phone", patch.phone.clone())
            .set_text("address", patch.address.clone())
            .set_text("emergency_contact_name", patch.emergency_contact_name.clone())
            .set_text(
                "emergency_contact_phone",
                patch.emergency_contact_phone.clone(),
            )
            .set_text("blood_type", patch.blood_type.clone())
            .set_text("allergies", patch.allergies.clone())
            .set_text("medical_conditions", patch.medical_conditions.clone())
            .set_text("insurance_provider", patch.insurance_provider.clone())
            .set_text(
                "insurance_policy_number",
                patch.insurance_policy_number.clone(),
            );
        let (sql, binds) = builder.build(id)?;

        bind_query_as(sqlx::query_as::<_, Patient>(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("update patient", e))
    }

    /// Soft delete: one atomic statement deactivating the owning user, so a
    /// concurrent deactivate/recreate cannot interleave between a read and
    /// a write.
    pub async fn deactivate(&self, id: i64) -> Result<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET is_active = FALSE, updated_at = NOW() \
             FROM patients WHERE patients.id = $1 AND users.id = patients.user_id \
             RETURNING users.id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("deactivate patient", e))?;
        Ok(row.is_some())
    }

    /// Directory listing for privileged callers: active users only, with
    /// optional name/email search and exact pagination metadata.
    pub async fn find_all(
        &self,
        search: Option<&str>,
        page: Page,
    ) -> Result<Paged<PatientProfile>> {
        let mut builder = QueryBuilder::new(PROFILE_SELECT, PROFILE_COUNT);
        builder.filter_literal("u.is_active = TRUE");
        if let Some(term) = search {
            builder.filter_search(&["u.first_name", "u.last_name", "u.email"], term);
        }
        builder.order_by("p.created_at DESC, p.id DESC");
        builder.paginate(page);

        let (sql, binds) = builder.build();
        let items = bind_query_as(sqlx::query_as::<_, PatientProfile>(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("list patients", e))?;

        let (count_sql, count_binds) = builder.build_count();
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), count_binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store("count patients", e))?;

        Ok(Paged { items, total })
    }
}
