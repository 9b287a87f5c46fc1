//! Domain types: table rows, closed vocabularies, and request payloads.

pub mod appointment;
pub mod doctor;
pub mod lab_result;
pub mod message;
pub mod patient;
pub mod prescription;
pub mod record;
pub mod user;
pub mod validation;

pub use appointment::{
    Appointment, AppointmentDetail, AppointmentStatus, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
pub use doctor::{
    CreateDoctorRequest, Doctor, DoctorProfile, TimeSlot, UpdateDoctorRequest, WeeklySchedule,
};
pub use lab_result::{CreateLabResultRequest, LabResult, LabResultDetail, LabStatus, UpdateLabResultRequest};
pub use message::{CreateMessageRequest, Message};
pub use patient::{CreatePatientRequest, Patient, PatientProfile, UpdatePatientRequest};
pub use prescription::{
    CreatePrescriptionRequest, Prescription, PrescriptionStatus, UpdatePrescriptionRequest,
};
pub use record::{CreateRecordRequest, MedicalRecord, RecordType, UpdateRecordRequest};
pub use user::{LoginRequest, RefreshRequest, RegisterRequest, Role, User, UserCredentials};
