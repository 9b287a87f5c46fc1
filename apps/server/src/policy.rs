//! Authorization policy engine.
//!
//! Every protected operation is expressed as an [`Action`] and evaluated
//! by [`decide`] before any SQL is built: role first, then ownership.
//! Pure and synchronous, safe to call concurrently without locks.
//!
//! Three outcomes:
//! - `Allow`: run the operation as requested.
//! - `AllowScoped(scope)`: run it, but force the caller's own profile id
//!   into the query. Caller-supplied patient/doctor filters on the same
//!   key are overwritten, never merged, so a listing can never leak
//!   another owner's rows.
//! - `Deny(message)`: reject with 403 before touching the store.
//!
//! The caller's profile ids are resolved from the store once per request,
//! never taken from request input.

use crate::models::Role;

/// The authenticated identity for the current request, with its resolved
/// profile ids (if the matching profile exists).
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: i64,
    pub role: Role,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl Caller {
    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            patient_id: None,
            doctor_id: None,
        }
    }

    pub fn patient(user_id: i64, patient_id: Option<i64>) -> Self {
        Self {
            user_id,
            role: Role::Patient,
            patient_id,
            doctor_id: None,
        }
    }

    pub fn doctor(user_id: i64, doctor_id: Option<i64>) -> Self {
        Self {
            user_id,
            role: Role::Doctor,
            patient_id: None,
            doctor_id,
        }
    }
}

/// Owner constraint forced into a listing query. A set field always wins
/// over the equivalent caller-supplied filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl Scope {
    pub fn patient(id: i64) -> Self {
        Self {
            patient_id: Some(id),
            doctor_id: None,
        }
    }

    pub fn doctor(id: i64) -> Self {
        Self {
            patient_id: None,
            doctor_id: Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    AllowScoped(Scope),
    Deny(&'static str),
}

/// A protected operation with the ownership hints the rules need. For
/// single-row operations the hints come from the already-fetched row
/// (lookups by id stay 404-before-403); for by-owner lookups and listings
/// the decision runs before the store is touched.
#[derive(Debug, Clone)]
pub enum Action {
    // Patient profiles
    CreatePatient { profile_user_id: i64 },
    ReadPatient { owner_user_id: i64 },
    ReadPatientByUser { target_user_id: i64 },
    UpdatePatient { owner_user_id: i64 },
    DeletePatient { owner_user_id: i64 },
    ListPatients,

    // Doctor profiles
    CreateDoctor,
    ReadDoctorDirectory,
    UpdateDoctor { owner_user_id: i64 },
    DeleteDoctor,

    // Appointments (hints are the parties' owning user ids)
    CreateAppointment { patient_id: i64, doctor_id: i64 },
    ReadAppointment { patient_user_id: Option<i64>, doctor_user_id: Option<i64> },
    ListAppointments,
    UpdateAppointment { patient_user_id: Option<i64>, doctor_user_id: Option<i64> },
    CancelAppointment { patient_user_id: Option<i64>, doctor_user_id: Option<i64> },

    // Medical records, prescriptions, lab results (doctor-anchored rows;
    // lab results resolve their doctor through the medical record, which
    // may be absent)
    CreateClinicalEntry { doctor_id: Option<i64> },
    ReadClinicalEntry { patient_id: i64, doctor_id: Option<i64> },
    ListClinicalEntries,
    UpdateClinicalEntry { doctor_id: Option<i64> },
    DeleteClinicalEntry { doctor_id: Option<i64> },

    // Messages (addressing gates access; the role does not)
    ReadMessage { sender_id: i64, recipient_id: i64 },
    MarkMessageRead { recipient_id: i64 },
    DeleteMessage { sender_id: i64, recipient_id: i64 },
}

pub fn decide(caller: &Caller, action: &Action) -> Decision {
    // Rule 1: admin is unrestricted on every action.
    if caller.role == Role::Admin {
        return Decision::Allow;
    }

    // Messages are addressed, not role-scoped.
    match action {
        Action::ReadMessage {
            sender_id,
            recipient_id,
        } => {
            return if caller.user_id == *sender_id || caller.user_id == *recipient_id {
                Decision::Allow
            } else {
                Decision::Deny("Access denied. You are not a party to this message.")
            };
        }
        Action::MarkMessageRead { recipient_id } => {
            return if caller.user_id == *recipient_id {
                Decision::Allow
            } else {
                Decision::Deny("Access denied. Only the recipient can mark a message as read.")
            };
        }
        Action::DeleteMessage {
            sender_id,
            recipient_id,
        } => {
            return if caller.user_id == *sender_id || caller.user_id == *recipient_id {
                Decision::Allow
            } else {
                Decision::Deny("Access denied. You are not a party to this message.")
            };
        }
        _ => {}
    }

    match caller.role {
        Role::Patient => decide_patient(caller, action),
        Role::Doctor => decide_doctor(caller, action),
        Role::Admin => unreachable!("admin handled above"),
    }
}

fn decide_patient(caller: &Caller, action: &Action) -> Decision {
    use Action::*;
    match action {
        CreatePatient { profile_user_id } => {
            if *profile_user_id == caller.user_id {
                Decision::Allow
            } else {
                Decision::Deny("You can only create your own patient profile")
            }
        }
        ReadPatient { owner_user_id } | ReadPatientByUser { target_user_id: owner_user_id } => {
            if *owner_user_id == caller.user_id {
                Decision::Allow
            } else {
                Decision::Deny("Access denied. You can only view your own profile")
            }
        }
        UpdatePatient { owner_user_id } => {
            if *owner_user_id == caller.user_id {
                Decision::Allow
            } else {
                Decision::Deny("Access denied. You can only update your own profile")
            }
        }
        DeletePatient { owner_user_id } => {
            if *owner_user_id == caller.user_id {
                Decision::Allow
            } else {
                Decision::Deny("Access denied. You can only delete your own profile")
            }
        }
        ListPatients => Decision::Deny("Access denied. Insufficient permissions"),

        CreateDoctor => Decision::Deny("Only admin users can create doctor profiles."),
        ReadDoctorDirectory => Decision::Allow,
        UpdateDoctor { .. } => {
            Decision::Deny("Access denied. You can only update your own doctor profile.")
        }
        DeleteDoctor => Decision::Deny("Only admin can delete doctor profiles."),

        CreateAppointment { patient_id, .. } => match caller.patient_id {
            Some(own) if own == *patient_id => Decision::Allow,
            Some(_) => Decision::Deny("You can only book appointments for yourself"),
            None => Decision::Deny("Patient profile not found. Please create your profile first."),
        },
        ReadAppointment { patient_user_id, .. } => {
            owned_by(patient_user_id, caller.user_id, "Access denied.")
        }
        UpdateAppointment { patient_user_id, .. } | CancelAppointment { patient_user_id, .. } => {
            owned_by(
                patient_user_id,
                caller.user_id,
                "Access denied. You can only manage your own appointments",
            )
        }
        ListAppointments | ListClinicalEntries => match caller.patient_id {
            Some(own) => Decision::AllowScoped(Scope::patient(own)),
            None => Decision::Deny("Patient profile not found. Please create your profile first."),
        },

        CreateClinicalEntry { .. } => {
            Decision::Deny("Only doctors can create clinical entries.")
        }
        ReadClinicalEntry { patient_id, .. } => match caller.patient_id {
            Some(own) if own == *patient_id => Decision::Allow,
            _ => Decision::Deny("Access denied. You can only view your own records"),
        },
        UpdateClinicalEntry { .. } | DeleteClinicalEntry { .. } => {
            Decision::Deny("Access denied. Clinical entries are managed by doctors.")
        }

        // Messages handled before the role branch.
        ReadMessage { .. } | MarkMessageRead { .. } | DeleteMessage { .. } => {
            unreachable!("messages handled above")
        }
    }
}

fn decide_doctor(caller: &Caller, action: &Action) -> Decision {
    use Action::*;
    match action {
        // Doctors read patient data in their care context, but patient
        // profile writes belong to the patient (or admin).
        CreatePatient { .. } => Decision::Deny("You can only create your own patient profile"),
        ReadPatient { .. } | ReadPatientByUser { .. } | ListPatients => Decision::Allow,
        UpdatePatient { .. } => {
            Decision::Deny("Access denied. Patients manage their own profiles")
        }
        DeletePatient { .. } => {
            Decision::Deny("Access denied. Patients manage their own profiles")
        }

        CreateDoctor => Decision::Deny("Only admin users can create doctor profiles."),
        ReadDoctorDirectory => Decision::Allow,
        UpdateDoctor { owner_user_id } => {
            if *owner_user_id == caller.user_id {
                Decision::Allow
            } else {
                Decision::Deny("Access denied. You can only update your own doctor profile.")
            }
        }
        DeleteDoctor => Decision::Deny("Only admin can delete doctor profiles."),

        CreateAppointment { doctor_id, .. } => match caller.doctor_id {
            Some(own) if own == *doctor_id => Decision::Allow,
            Some(_) => Decision::Deny("You can only book appointments under your own profile"),
            None => Decision::Deny("Doctor profile not found."),
        },
        ReadAppointment { doctor_user_id, .. } => {
            owned_by(doctor_user_id, caller.user_id, "Access denied.")
        }
        UpdateAppointment { doctor_user_id, .. } | CancelAppointment { doctor_user_id, .. } => {
            owned_by(
                doctor_user_id,
                caller.user_id,
                "Access denied. You can only manage your own appointments",
            )
        }
        ListAppointments | ListClinicalEntries => match caller.doctor_id {
            Some(own) => Decision::AllowScoped(Scope::doctor(own)),
            None => Decision::Deny("Doctor profile not found."),
        },

        CreateClinicalEntry { doctor_id } => match (caller.doctor_id, doctor_id) {
            (Some(own), Some(target)) if own == *target => Decision::Allow,
            (Some(_), Some(_)) => {
                Decision::Deny("You can only create clinical entries under your own profile")
            }
            (None, _) => Decision::Deny("Doctor profile not found."),
            (_, None) => Decision::Deny("Access denied."),
        },
        ReadClinicalEntry { doctor_id, .. }
        | UpdateClinicalEntry { doctor_id }
        | DeleteClinicalEntry { doctor_id } => match (caller.doctor_id, doctor_id) {
            (Some(own), Some(target)) if own == *target => Decision::Allow,
            _ => Decision::Deny("Access denied. You can only manage entries you authored"),
        },

        ReadMessage { .. } | MarkMessageRead { .. } | DeleteMessage { .. } => {
            unreachable!("messages handled above")
        }
    }
}

fn owned_by(owner: &Option<i64>, caller_user_id: i64, deny_message: &'static str) -> Decision {
    if *owner == Some(caller_user_id) {
        Decision::Allow
    } else {
        Decision::Deny(deny_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped(decision: Decision) -> Scope {
        match decision {
            Decision::AllowScoped(scope) => scope,
            other => panic!("expected AllowScoped, got {other:?}"),
        }
    }

    // ── Admin: unrestricted ───────────────────────────────

    #[test]
    fn admin_is_unrestricted() {
        let admin = Caller::admin(1);
        for action in [
            Action::ListPatients,
            Action::CreateDoctor,
            Action::DeleteDoctor,
            Action::ListAppointments,
            Action::UpdateClinicalEntry { doctor_id: Some(9) },
            Action::DeleteMessage {
                sender_id: 5,
                recipient_id: 6,
            },
        ] {
            assert_eq!(decide(&admin, &action), Decision::Allow, "{action:?}");
        }
    }

    // ── Patient profiles ──────────────────────────────────

    #[test]
    fn patient_creates_only_own_profile() {
        let caller = Caller::patient(7, None);
        assert_eq!(
            decide(&caller, &Action::CreatePatient { profile_user_id: 7 }),
            Decision::Allow
        );
        assert!(matches!(
            decide(&caller, &Action::CreatePatient { profile_user_id: 8 }),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn patient_reads_only_own_profile() {
        let caller = Caller::patient(7, Some(70));
        assert_eq!(
            decide(&caller, &Action::ReadPatient { owner_user_id: 7 }),
            Decision::Allow
        );
        assert!(matches!(
            decide(&caller, &Action::ReadPatient { owner_user_id: 8 }),
            Decision::Deny(_)
        ));
        assert!(matches!(
            decide(&caller, &Action::ReadPatientByUser { target_user_id: 8 }),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn patient_cannot_list_patients() {
        let caller = Caller::patient(7, Some(70));
        assert!(matches!(
            decide(&caller, &Action::ListPatients),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn doctor_reads_patients_but_cannot_write_them() {
        let caller = Caller::doctor(3, Some(30));
        assert_eq!(decide(&caller, &Action::ListPatients), Decision::Allow);
        assert_eq!(
            decide(&caller, &Action::ReadPatient { owner_user_id: 7 }),
            Decision::Allow
        );
        assert!(matches!(
            decide(&caller, &Action::UpdatePatient { owner_user_id: 7 }),
            Decision::Deny(_)
        ));
        assert!(matches!(
            decide(&caller, &Action::DeletePatient { owner_user_id: 7 }),
            Decision::Deny(_)
        ));
    }

    // ── Doctor profiles ───────────────────────────────────

    #[test]
    fn only_admin_creates_and_deletes_doctors() {
        for caller in [Caller::patient(7, Some(70)), Caller::doctor(3, Some(30))] {
            assert!(matches!(
                decide(&caller, &Action::CreateDoctor),
                Decision::Deny(_)
            ));
            assert!(matches!(
                decide(&caller, &Action::DeleteDoctor),
                Decision::Deny(_)
            ));
        }
    }

    #[test]
    fn directory_reads_are_open_to_all_roles() {
        for caller in [
            Caller::patient(7, Some(70)),
            Caller::doctor(3, Some(30)),
            Caller::admin(1),
        ] {
            assert_eq!(decide(&caller, &Action::ReadDoctorDirectory), Decision::Allow);
        }
    }

    #[test]
    fn doctor_updates_only_own_profile() {
        let caller = Caller::doctor(3, Some(30));
        assert_eq!(
            decide(&caller, &Action::UpdateDoctor { owner_user_id: 3 }),
            Decision::Allow
        );
        assert!(matches!(
            decide(&caller, &Action::UpdateDoctor { owner_user_id: 4 }),
            Decision::Deny(_)
        ));
    }

    // ── Appointments ──────────────────────────────────────

    #[test]
    fn patient_listing_is_forced_to_own_patient_id() {
        let caller = Caller::patient(7, Some(70));
        assert_eq!(
            scoped(decide(&caller, &Action::ListAppointments)),
            Scope::patient(70)
        );
    }

    #[test]
    fn doctor_listing_is_forced_to_own_doctor_id() {
        let caller = Caller::doctor(3, Some(30));
        assert_eq!(
            scoped(decide(&caller, &Action::ListAppointments)),
            Scope::doctor(30)
        );
    }

    #[test]
    fn listing_without_a_profile_is_denied_not_unscoped() {
        assert!(matches!(
            decide(&Caller::patient(7, None), &Action::ListAppointments),
            Decision::Deny(_)
        ));
        assert!(matches!(
            decide(&Caller::doctor(3, None), &Action::ListAppointments),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn patient_books_only_for_own_profile() {
        let caller = Caller::patient(7, Some(70));
        assert_eq!(
            decide(
                &caller,
                &Action::CreateAppointment {
                    patient_id: 70,
                    doctor_id: 30
                }
            ),
            Decision::Allow
        );
        assert!(matches!(
            decide(
                &caller,
                &Action::CreateAppointment {
                    patient_id: 71,
                    doctor_id: 30
                }
            ),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn appointment_row_access_follows_party_user_ids() {
        let patient = Caller::patient(7, Some(70));
        let doctor = Caller::doctor(3, Some(30));
        let row = Action::ReadAppointment {
            patient_user_id: Some(7),
            doctor_user_id: Some(3),
        };
        assert_eq!(decide(&patient, &row), Decision::Allow);
        assert_eq!(decide(&doctor, &row), Decision::Allow);

        let foreign = Action::ReadAppointment {
            patient_user_id: Some(8),
            doctor_user_id: Some(4),
        };
        assert!(matches!(decide(&patient, &foreign), Decision::Deny(_)));
        assert!(matches!(decide(&doctor, &foreign), Decision::Deny(_)));
    }

    #[test]
    fn cancel_follows_the_same_ownership_as_update() {
        let patient = Caller::patient(7, Some(70));
        let own = Action::CancelAppointment {
            patient_user_id: Some(7),
            doctor_user_id: Some(3),
        };
        let foreign = Action::CancelAppointment {
            patient_user_id: Some(8),
            doctor_user_id: Some(3),
        };
        assert_eq!(decide(&patient, &own), Decision::Allow);
        assert!(matches!(decide(&patient, &foreign), Decision::Deny(_)));
    }

    // ── Clinical entries ──────────────────────────────────

    #[test]
    fn patient_cannot_create_or_modify_clinical_entries() {
        let caller = Caller::patient(7, Some(70));
        assert!(matches!(
            decide(&caller, &Action::CreateClinicalEntry { doctor_id: Some(30) }),
            Decision::Deny(_)
        ));
        assert!(matches!(
            decide(&caller, &Action::UpdateClinicalEntry { doctor_id: Some(30) }),
            Decision::Deny(_)
        ));
        assert!(matches!(
            decide(&caller, &Action::DeleteClinicalEntry { doctor_id: Some(30) }),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn patient_reads_only_own_clinical_rows() {
        let caller = Caller::patient(7, Some(70));
        assert_eq!(
            decide(
                &caller,
                &Action::ReadClinicalEntry {
                    patient_id: 70,
                    doctor_id: Some(30)
                }
            ),
            Decision::Allow
        );
        assert!(matches!(
            decide(
                &caller,
                &Action::ReadClinicalEntry {
                    patient_id: 71,
                    doctor_id: Some(30)
                }
            ),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn doctor_clinical_access_is_bound_to_authorship() {
        let caller = Caller::doctor(3, Some(30));
        assert_eq!(
            decide(&caller, &Action::CreateClinicalEntry { doctor_id: Some(30) }),
            Decision::Allow
        );
        assert!(matches!(
            decide(&caller, &Action::CreateClinicalEntry { doctor_id: Some(31) }),
            Decision::Deny(_)
        ));
        assert_eq!(
            decide(
                &caller,
                &Action::ReadClinicalEntry {
                    patient_id: 70,
                    doctor_id: Some(30)
                }
            ),
            Decision::Allow
        );
        // A lab result whose record is gone has no resolvable author.
        assert!(matches!(
            decide(
                &caller,
                &Action::ReadClinicalEntry {
                    patient_id: 70,
                    doctor_id: None
                }
            ),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn doctor_clinical_listing_is_forced_to_own_id() {
        let caller = Caller::doctor(3, Some(30));
        assert_eq!(
            scoped(decide(&caller, &Action::ListClinicalEntries)),
            Scope::doctor(30)
        );
    }

    // ── Messages ──────────────────────────────────────────

    #[test]
    fn any_party_reads_and_deletes_a_message() {
        let sender = Caller::patient(5, Some(50));
        let recipient = Caller::doctor(6, Some(60));
        let outsider = Caller::patient(9, Some(90));

        let read = Action::ReadMessage {
            sender_id: 5,
            recipient_id: 6,
        };
        assert_eq!(decide(&sender, &read), Decision::Allow);
        assert_eq!(decide(&recipient, &read), Decision::Allow);
        assert!(matches!(decide(&outsider, &read), Decision::Deny(_)));

        let delete = Action::DeleteMessage {
            sender_id: 5,
            recipient_id: 6,
        };
        assert_eq!(decide(&sender, &delete), Decision::Allow);
        assert_eq!(decide(&recipient, &delete), Decision::Allow);
        assert!(matches!(decide(&outsider, &delete), Decision::Deny(_)));
    }

    #[test]
    fn only_the_recipient_marks_a_message_read() {
        let sender = Caller::patient(5, Some(50));
        let recipient = Caller::doctor(6, Some(60));
        let action = Action::MarkMessageRead { recipient_id: 6 };
        assert!(matches!(decide(&sender, &action), Decision::Deny(_)));
        assert_eq!(decide(&recipient, &action), Decision::Allow);
    }

    // ── Forced filters win over supplied values ───────────

    #[test]
    fn forced_scope_overrides_caller_supplied_owner_filters() {
        use crate::db::AppointmentFilter;

        let caller = Caller::patient(7, Some(70));
        let scope = scoped(decide(&caller, &Action::ListAppointments));

        // Caller asked for another patient's rows; the forced value wins.
        let mut filter = AppointmentFilter {
            patient_id: Some(71),
            doctor_id: Some(31),
            ..Default::default()
        };
        filter.apply_scope(&scope);
        assert_eq!(filter.patient_id, Some(70));
        // Unforced keys keep the caller's value.
        assert_eq!(filter.doctor_id, Some(31));
    }
}
