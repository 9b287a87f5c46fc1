//! Lab results, anchored to a medical record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lab_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LabStatus {
    Pending,
    Completed,
    Abnormal,
}

impl LabStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LabStatus::Pending => "pending",
            LabStatus::Completed => "completed",
            LabStatus::Abnormal => "abnormal",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LabResult {
    pub id: i64,
    pub medical_record_id: i64,
    pub patient_id: i64,
    pub test_name: String,
    pub test_type: Option<String>,
    pub result_value: Option<String>,
    pub reference_range: Option<String>,
    pub unit: Option<String>,
    pub status: LabStatus,
    pub test_date: NaiveDate,
    pub lab_technician: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lab result plus the prescribing doctor resolved through its medical
/// record, for ownership checks. Lab rows themselves carry no doctor ref.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LabResultDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lab_result: LabResult,
    pub record_doctor_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLabResultRequest {
    pub medical_record_id: i64,
    pub patient_id: i64,
    #[validate(length(min = 1, message = "test_name is required"))]
    pub test_name: String,
    pub test_type: Option<String>,
    pub result_value: Option<String>,
    pub reference_range: Option<String>,
    pub unit: Option<String>,
    pub status: Option<LabStatus>,
    pub test_date: Option<NaiveDate>,
    pub lab_technician: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLabResultRequest {
    pub medical_record_id: Option<i64>,
    #[validate(length(min = 1, message = "test_name cannot be empty"))]
    pub test_name: Option<String>,
    pub test_type: Option<String>,
    pub result_value: Option<String>,
    pub reference_range: Option<String>,
    pub unit: Option<String>,
    pub status: Option<LabStatus>,
    pub test_date: Option<NaiveDate>,
    pub lab_technician: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_vocabulary_is_closed() {
        let result: Result<LabStatus, _> = serde_json::from_value("inconclusive".into());
        assert!(result.is_err());
        let parsed: LabStatus = serde_json::from_value("abnormal".into()).unwrap();
        assert_eq!(parsed, LabStatus::Abnormal);
    }

    #[test]
    fn patch_ignores_patient_ref() {
        let patch: UpdateLabResultRequest = serde_json::from_value(serde_json::json!({
            "patient_id": 9,
            "status": "completed",
            "result_value": "5.1"
        }))
        .unwrap();
        assert_eq!(patch.status, Some(LabStatus::Completed));
        assert_eq!(patch.result_value.as_deref(), Some("5.1"));
    }
}
