//! Appointments between a patient and a doctor.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Appointment plus the owning user ids of both parties, used by the
/// policy engine for ownership checks on single-row operations.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AppointmentDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_user_id: Option<i64>,
    pub doctor_user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    #[validate(range(min = 1, message = "duration_minutes must be a positive number"))]
    pub duration_minutes: Option<i32>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
    #[validate(range(min = 1, message = "duration_minutes must be a positive number"))]
    pub duration_minutes: Option<i32>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(AppointmentStatus::NoShow).unwrap(),
            "no_show"
        );
        let parsed: AppointmentStatus = serde_json::from_value("cancelled".into()).unwrap();
        assert_eq!(parsed, AppointmentStatus::Cancelled);
    }

    #[test]
    fn invalid_status_value_fails_deserialization() {
        let result: Result<AppointmentStatus, _> = serde_json::from_value("postponed".into());
        assert!(result.is_err());
    }

    #[test]
    fn patch_ignores_unrelated_fields() {
        let patch: UpdateAppointmentRequest = serde_json::from_value(serde_json::json!({
            "status": "confirmed",
            "patient_id": 42
        }))
        .unwrap();
        assert_eq!(patch.status, Some(AppointmentStatus::Confirmed));
        assert!(patch.appointment_date.is_none());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let request = UpdateAppointmentRequest {
            duration_minutes: Some(0),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
