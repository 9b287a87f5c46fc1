//! Patient profiles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::Role;
use super::validation;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Patient {
    pub id: i64,
    pub user_id: i64,
    pub date_of_birth: NaiveDate,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Patient row joined with the owning user's public identity, the shape
/// returned by all read endpoints.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PatientProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub patient: Patient,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePatientRequest {
    pub user_id: i64,
    #[validate(custom(function = validation::not_in_future))]
    pub date_of_birth: NaiveDate,
    #[validate(custom(function = validation::phone))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    #[validate(custom(function = validation::phone))]
    pub emergency_contact_phone: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
}

/// Update patch. `user_id` is deliberately absent: it is immutable, and an
/// unknown field in the payload is silently ignored rather than rejected.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePatientRequest {
    #[validate(custom(function = validation::not_in_future))]
    pub date_of_birth: Option<NaiveDate>,
    #[validate(custom(function = validation::phone))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    #[validate(custom(function = validation::phone))]
    pub emergency_contact_phone: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_ignores_unknown_and_immutable_fields() {
        // `user_id` and arbitrary extra keys must not reach the update path.
        let patch: UpdatePatientRequest = serde_json::from_value(serde_json::json!({
            "user_id": 99,
            "phone": "5551234567",
            "favorite_color": "green"
        }))
        .unwrap();
        assert_eq!(patch.phone.as_deref(), Some("5551234567"));
        assert!(patch.date_of_birth.is_none());
    }

    #[test]
    fn empty_patch_deserializes_to_all_none() {
        let patch: UpdatePatientRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(patch.phone.is_none());
        assert!(patch.address.is_none());
    }

    #[test]
    fn create_request_rejects_bad_phone() {
        let req = CreatePatientRequest {
            user_id: 7,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            phone: Some("bad".into()),
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            blood_type: None,
            allergies: None,
            medical_conditions: None,
            insurance_provider: None,
            insurance_policy_number: None,
        };
        assert!(req.validate().is_err());
    }
}
