//! Doctor profiles and the typed availability schedule.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::Validate;

use super::user::Role;
use super::validation;

/// A bookable window within one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Weekly availability. Stored as JSONB at the store boundary only; policy
/// and business logic always see this typed value, never a raw string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monday: Vec<TimeSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tuesday: Vec<TimeSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wednesday: Vec<TimeSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thursday: Vec<TimeSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub friday: Vec<TimeSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saturday: Vec<TimeSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sunday: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Doctor {
    pub id: i64,
    pub user_id: i64,
    pub specialization: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub years_experience: Option<i32>,
    pub education: Option<String>,
    pub consultation_fee: Option<Decimal>,
    pub availability: Option<Json<WeeklySchedule>>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Doctor row joined with the owning user's public identity.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DoctorProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub doctor: Doctor,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDoctorRequest {
    pub user_id: i64,
    #[validate(length(min = 1, message = "Specialization is required"))]
    pub specialization: String,
    #[validate(custom(function = validation::license_number))]
    pub license_number: String,
    #[validate(custom(function = validation::phone))]
    pub phone: Option<String>,
    #[validate(range(min = 0, max = 50, message = "Years of experience must be between 0 and 50"))]
    pub years_experience: Option<i32>,
    pub education: Option<String>,
    pub consultation_fee: Option<Decimal>,
    pub availability: Option<WeeklySchedule>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDoctorRequest {
    #[validate(length(min = 1, message = "Specialization cannot be empty"))]
    pub specialization: Option<String>,
    #[validate(custom(function = validation::license_number))]
    pub license_number: Option<String>,
    #[validate(custom(function = validation::phone))]
    pub phone: Option<String>,
    #[validate(range(min = 0, max = 50, message = "Years of experience must be between 0 and 50"))]
    pub years_experience: Option<i32>,
    pub education: Option<String>,
    pub consultation_fee: Option<Decimal>,
    pub availability: Option<WeeklySchedule>,
    pub is_available: Option<bool>,
}

impl CreateDoctorRequest {
    /// Negative fees are rejected up front, before any store call.
    pub fn validate_fee(&self) -> Result<(), String> {
        validate_fee(self.consultation_fee.as_ref())
    }
}

impl UpdateDoctorRequest {
    pub fn validate_fee(&self) -> Result<(), String> {
        validate_fee(self.consultation_fee.as_ref())
    }
}

fn validate_fee(fee: Option<&Decimal>) -> Result<(), String> {
    match fee {
        Some(fee) if fee.is_sign_negative() => {
            Err("Consultation fee cannot be negative".to_string())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_round_trips_through_json() {
        let schedule = WeeklySchedule {
            monday: vec![TimeSlot {
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["monday"][0]["start"], "09:00:00");
        assert!(json.get("tuesday").is_none());

        let parsed: WeeklySchedule = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, schedule);
    }

    #[test]
    fn negative_fee_is_rejected() {
        let request = UpdateDoctorRequest {
            consultation_fee: Some(Decimal::new(-100, 2)),
            ..Default::default()
        };
        assert!(request.validate_fee().is_err());
    }

    #[test]
    fn create_request_rejects_lowercase_license() {
        let request = CreateDoctorRequest {
            user_id: 3,
            specialization: "Cardiology".into(),
            license_number: "md1234".into(),
            phone: None,
            years_experience: Some(12),
            education: None,
            consultation_fee: None,
            availability: None,
            is_available: None,
        };
        assert!(request.validate().is_err());
    }
}
