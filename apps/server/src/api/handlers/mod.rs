//! Request handlers, one module per resource.

pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod lab_results;
pub mod messages;
pub mod patients;
pub mod prescriptions;
pub mod records;

use crate::db::{DoctorRepository, PatientRepository};
use crate::error::Error;
use crate::models::{Role, User};
use crate::policy::{Caller, Decision, Scope};
use crate::state::AppState;
use crate::Result;

/// Build the policy caller for this request: the authenticated identity
/// plus its profile id, resolved from the store rather than from any
/// request input.
pub(crate) async fn resolve_caller(state: &AppState, user: &User) -> Result<Caller> {
    let mut caller = Caller {
        user_id: user.id,
        role: user.role,
        patient_id: None,
        doctor_id: None,
    };
    match user.role {
        Role::Patient => {
            caller.patient_id = PatientRepository::new(state.pool.clone())
                .find_by_user_id(user.id)
                .await?
                .map(|profile| profile.patient.id);
        }
        Role::Doctor => {
            caller.doctor_id = DoctorRepository::new(state.pool.clone())
                .find_by_user_id(user.id)
                .await?
                .map(|profile| profile.doctor.id);
        }
        Role::Admin => {}
    }
    Ok(caller)
}

/// Convert a policy decision into control flow: `Deny` becomes 403, a
/// forced scope is handed back for the query builder to apply.
pub(crate) fn ensure(decision: Decision) -> Result<Option<Scope>> {
    match decision {
        Decision::Allow => Ok(None),
        Decision::AllowScoped(scope) => Ok(Some(scope)),
        Decision::Deny(message) => Err(Error::Forbidden(message.to_string())),
    }
}
