//! Doctor profile repository.

use sqlx::types::Json;
use sqlx::PgPool;

use super::query::{
    bind_query_as, bind_query_scalar, like_pattern, BindValue, Page, Paged, QueryBuilder,
    UpdateBuilder,
};
use crate::error::{is_unique_violation, Error};
use crate::models::{CreateDoctorRequest, Doctor, DoctorProfile, UpdateDoctorRequest};
use crate::Result;

const PROFILE_SELECT: &str = "SELECT d.*, u.first_name, u.last_name, u.email, u.role \
     FROM doctors d JOIN users u ON d.user_id = u.id";
const PROFILE_COUNT: &str = "SELECT COUNT(*) FROM doctors d JOIN users u ON d.user_id = u.id";

/// Optional directory filters; forced scopes do not apply to doctors
/// (directory reads are open to any authenticated role).
#[derive(Debug, Default, Clone)]
pub struct DoctorFilter {
    pub search: Option<String>,
    pub specialization: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Clone)]
pub struct DoctorRepository {
    pool: PgPool,
}

impl DoctorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateDoctorRequest) -> Result<Doctor> {
        sqlx::query_as::<_, Doctor>(
            "INSERT INTO doctors (user_id, specialization, license_number, phone, \
             years_experience, education, consultation_fee, availability, is_available) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(request.user_id)
        .bind(&request.specialization)
        .bind(&request.license_number)
        .bind(&request.phone)
        .bind(request.years_experience)
        .bind(&request.education)
        .bind(request.consultation_fee)
        .bind(request.availability.clone().map(Json))
        .bind(request.is_available.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("Doctor profile already exists for this user".to_string())
            } else {
                Error::store("create doctor", e)
            }
        })
    }

    /// Lookup by profile id. Deactivated doctors are invisible here, while
    /// appointments referencing them stay retrievable by appointment id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<DoctorProfile>> {
        sqlx::query_as::<_, DoctorProfile>(&format!(
            "{PROFILE_SELECT} WHERE d.id = $1 AND u.is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("find doctor by id", e))
    }

    pub async fn find_by_user_id(&self, user_id: i64) -> Result<Option<DoctorProfile>> {
        sqlx::query_as::<_, DoctorProfile>(&format!(
            "{PROFILE_SELECT} WHERE d.user_id = $1 AND u.is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("find doctor by user id", e))
    }

    pub async fn update(&self, id: i64, patch: &UpdateDoctorRequest) -> Result<Option<Doctor>> {
        let availability = match &patch.availability {
            Some(schedule) => Some(
                serde_json::to_value(schedule)
                    .map_err(|e| Error::Internal(format!("serialize availability: {e}")))?,
            ),
            None => None,
        };

        let mut builder = UpdateBuilder::new("doctors");
        builder
            .set_text("specialization", patch.specialization.clone())
            .set_text("license_number", patch.license_number.clone())
            .set_text("phone", patch.phone.clone())
            .set_int("years_experience", patch.years_experience.map(i64::from))
            .set_text("education", patch.education.clone())
            .set_decimal("consultation_fee", patch.consultation_fee)
            .set_json("availability", availability)
            .set_bool("is_available", patch.is_available);
        let (sql, binds) = builder.build(id)?;

        bind_query_as(sqlx::query_as::<_, Doctor>(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("update doctor", e))
    }

    /// Soft delete via the owning user, as one atomic statement.
    pub async fn deactivate(&self, id: i64) -> Result<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET is_active = FALSE, updated_at = NOW() \
             FROM doctors WHERE doctors.id = $1 AND users.id = doctors.user_id \
             RETURNING users.id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("deactivate doctor", e))?;
        Ok(row.is_some())
    }

    pub async fn find_all(&self, filter: &DoctorFilter, page: Page) -> Result<Paged<DoctorProfile>> {
        let mut builder = QueryBuilder::new(PROFILE_SELECT, PROFILE_COUNT);
        builder.filter_literal("u.is_active = TRUE");
        if let Some(term) = &filter.search {
            builder.filter_search(&["u.first_name", "u.last_name", "d.specialization"], term);
        }
        if let Some(specialization) = &filter.specialization {
            builder.filter_with(
                "d.specialization ILIKE $?",
                BindValue::Text(like_pattern(specialization)),
            );
        }
        if let Some(is_available) = filter.is_available {
            builder.filter_eq("d.is_available", BindValue::Bool(is_available));
        }
        builder.order_by("d.created_at DESC, d.id DESC");
        builder.paginate(page);

        let (sql, binds) = builder.build();
        let items = bind_query_as(sqlx::query_as::<_, DoctorProfile>(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("list doctors", e))?;

        let (count_sql, count_binds) = builder.build_count();
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), count_binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store("count doctors", e))?;

        Ok(Paged { items, total })
    }

    /// Public specialty search: active and available doctors, most
    /// experienced first.
    pub async fn find_by_specialization(
        &self,
        specialization: &str,
        page: Page,
    ) -> Result<Paged<DoctorProfile>> {
        let mut builder = QueryBuilder::new(PROFILE_SELECT, PROFILE_COUNT);
        builder.filter_literal("u.is_active = TRUE");
        builder.filter_literal("d.is_available = TRUE");
        builder.filter_with(
            "d.specialization ILIKE $?",
            BindValue::Text(like_pattern(specialization)),
        );
        builder.order_by("d.years_experience DESC NULLS LAST, d.id DESC");
        builder.paginate(page);

        let (sql, binds) = builder.build();
        let items = bind_query_as(sqlx::query_as::<_, DoctorProfile>(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("search doctors by specialization", e))?;

        let (count_sql, count_binds) = builder.build_count();
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), count_binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store("count doctors by specialization", e))?;

        Ok(Paged { items, total })
    }
}
