//! Medical records, the anchor for prescriptions and lab results.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Consultation,
    LabResult,
    Prescription,
    Diagnosis,
    Procedure,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Consultation => "consultation",
            RecordType::LabResult => "lab_result",
            RecordType::Prescription => "prescription",
            RecordType::Diagnosis => "diagnosis",
            RecordType::Procedure => "procedure",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MedicalRecord {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub record_type: RecordType,
    pub title: String,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub file_path: Option<String>,
    pub record_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecordRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub record_type: RecordType,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub file_path: Option<String>,
    /// Defaults to the current date when absent.
    pub record_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRecordRequest {
    pub appointment_id: Option<i64>,
    pub record_type: Option<RecordType>,
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub file_path: Option<String>,
    pub record_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_rejects_values_outside_the_enum() {
        let result: Result<RecordType, _> = serde_json::from_value("xray".into());
        assert!(result.is_err());
        let parsed: RecordType = serde_json::from_value("lab_result".into()).unwrap();
        assert_eq!(parsed, RecordType::LabResult);
    }

    #[test]
    fn patch_does_not_expose_patient_or_doctor_refs() {
        // patient_id/doctor_id are not mutable; unknown keys are ignored.
        let patch: UpdateRecordRequest = serde_json::from_value(serde_json::json!({
            "patient_id": 1,
            "doctor_id": 2,
            "title": "Follow-up"
        }))
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("Follow-up"));
    }
}
