//! Database layer - connection pool, query construction, repositories

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;

pub mod appointments;
pub mod doctors;
pub mod lab_results;
pub mod messages;
pub mod patients;
pub mod prescriptions;
pub mod query;
pub mod records;
pub mod users;

pub use appointments::{AppointmentFilter, AppointmentRepository};
pub use doctors::{DoctorFilter, DoctorRepository};
pub use lab_results::{LabResultFilter, LabResultRepository};
pub use messages::MessageRepository;
pub use patients::PatientRepository;
pub use prescriptions::{PrescriptionFilter, PrescriptionRepository};
pub use query::{Page, Paged};
pub use records::{RecordFilter, RecordRepository};
pub use users::UserRepository;

/// Bounded connection pool. Acquisition fails fast once `acquire_timeout`
/// elapses instead of queueing indefinitely; idle connections are reaped
/// after `idle_timeout`.
pub async fn create_pool(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}
