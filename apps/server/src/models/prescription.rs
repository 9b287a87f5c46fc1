//! Prescriptions, created alongside a medical record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "prescription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
}

impl PrescriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Completed => "completed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Prescription {
    pub id: i64,
    pub medical_record_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub status: PrescriptionStatus,
    pub prescribed_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePrescriptionRequest {
    pub medical_record_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    #[validate(length(min = 1, message = "medication_name is required"))]
    pub medication_name: String,
    #[validate(length(min = 1, message = "dosage is required"))]
    pub dosage: String,
    #[validate(length(min = 1, message = "frequency is required"))]
    pub frequency: String,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub status: Option<PrescriptionStatus>,
    pub prescribed_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePrescriptionRequest {
    pub medical_record_id: Option<i64>,
    #[validate(length(min = 1, message = "medication_name cannot be empty"))]
    pub medication_name: Option<String>,
    #[validate(length(min = 1, message = "dosage cannot be empty"))]
    pub dosage: Option<String>,
    #[validate(length(min = 1, message = "frequency cannot be empty"))]
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub status: Option<PrescriptionStatus>,
    pub prescribed_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_vocabulary_is_closed() {
        let result: Result<PrescriptionStatus, _> = serde_json::from_value("expired".into());
        assert!(result.is_err());
        let parsed: PrescriptionStatus = serde_json::from_value("active".into()).unwrap();
        assert_eq!(parsed, PrescriptionStatus::Active);
    }

    #[test]
    fn patch_ignores_patient_and_doctor_refs() {
        let patch: UpdatePrescriptionRequest = serde_json::from_value(serde_json::json!({
            "patient_id": 5,
            "doctor_id": 6,
            "status": "completed"
        }))
        .unwrap();
        assert_eq!(patch.status, Some(PrescriptionStatus::Completed));
        assert!(patch.medication_name.is_none());
    }
}
