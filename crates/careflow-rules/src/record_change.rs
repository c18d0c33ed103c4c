//! Record-change routing — archival, resignation, and the SIMP override.

use chrono::{DateTime, Duration, Utc};

use careflow_core::error::{CareflowError, Result};
use careflow_core::traits::Store;
use careflow_core::types::{
    ELIGIBILITY_WINDOW_DAYS, PatientPatch, PatientRecord, PatientStatus, append_system_note,
};

/// What the router decided for a changed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    /// Archive with a scheduled re-permission date two years after the key
    /// action. `via_simp` marks the priority override path for the audit note.
    Archive {
        next_permission_date: DateTime<Utc>,
        via_simp: bool,
    },
    /// Resignation archive: terminal, permission date cleared.
    ArchiveResignation,
    /// Status needs nothing from this handler.
    Ignore,
}

/// Route a changed record to its action. Pure — evaluated in strict priority
/// order, first match wins.
pub fn route_record_change(record: &PatientRecord) -> Result<RecordAction> {
    let registered = matches!(
        record.status,
        PatientStatus::Registered | PatientStatus::RegisteredElsewhere
    );

    // 1. SIMP override — fires regardless of current status, except for the
    // two registered variants. Missing key action date falls through to the
    // status router instead of failing.
    if record.simp_verified
        && !registered
        && let Some(key_action) = record.key_action_date
    {
        return Ok(RecordAction::Archive {
            next_permission_date: key_action + Duration::days(ELIGIBILITY_WINDOW_DAYS),
            via_simp: true,
        });
    }

    // 2. Status router.
    if registered {
        let key_action = record.key_action_date.ok_or_else(|| {
            CareflowError::Validation("Missing key action date.".into())
        })?;
        return Ok(RecordAction::Archive {
            next_permission_date: key_action + Duration::days(ELIGIBILITY_WINDOW_DAYS),
            via_simp: false,
        });
    }
    if record.status == PatientStatus::Resigned {
        return Ok(RecordAction::ArchiveResignation);
    }
    Ok(RecordAction::Ignore)
}

/// Fetch the record, route it, and apply the resulting mutation.
pub async fn handle_record_change(
    store: &dyn Store,
    record_id: &str,
    now: DateTime<Utc>,
) -> Result<RecordAction> {
    let record = store.fetch_patient(record_id).await?;
    let action = route_record_change(&record)?;

    match &action {
        RecordAction::Archive {
            next_permission_date,
            via_simp,
        } => {
            let message = if *via_simp {
                "Record archived (SIMP rule)."
            } else {
                "Record archived."
            };
            let patch = PatientPatch {
                status: PatientStatus::Archived,
                next_permission_date: Some(*next_permission_date),
                notes: Some(append_system_note(&record.notes, now, message)),
            };
            store.update_patient(record_id, patch).await?;
            tracing::info!(
                "Record {record_id} archived{}",
                if *via_simp { " (SIMP rule)" } else { "" }
            );
        }
        RecordAction::ArchiveResignation => {
            // No audit note on this branch — long-standing behavior.
            let patch = PatientPatch {
                status: PatientStatus::ArchivedResignation,
                next_permission_date: None,
                notes: None,
            };
            store.update_patient(record_id, patch).await?;
            tracing::info!("Record {record_id} marked as resignation");
        }
        RecordAction::Ignore => {
            tracing::debug!(
                "Record {record_id} status '{}' needs no action",
                record.status
            );
        }
    }
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use careflow_store::MemoryStore;
    use chrono::TimeZone;

    fn patient(id: &str, status: PatientStatus) -> PatientRecord {
        PatientRecord {
            id: id.into(),
            status,
            simp_verified: false,
            key_action_date: None,
            next_permission_date: None,
            notes: String::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_registered_archives_730_days_out() {
        let mut record = patient("rec1", PatientStatus::Registered);
        record.key_action_date = Some(date(2024, 1, 10));
        let action = route_record_change(&record).unwrap();
        assert_eq!(
            action,
            RecordAction::Archive {
                next_permission_date: date(2026, 1, 9),
                via_simp: false,
            }
        );
    }

    #[test]
    fn test_registered_without_key_action_date_is_validation_error() {
        let record = patient("rec1", PatientStatus::RegisteredElsewhere);
        let err = route_record_change(&record).unwrap_err();
        assert!(matches!(err, CareflowError::Validation(_)));
    }

    #[test]
    fn test_simp_overrides_resignation() {
        let mut record = patient("rec1", PatientStatus::Resigned);
        record.simp_verified = true;
        record.key_action_date = Some(date(2024, 6, 1));
        let action = route_record_change(&record).unwrap();
        assert!(matches!(
            action,
            RecordAction::Archive { via_simp: true, .. }
        ));
    }

    #[test]
    fn test_simp_does_not_fire_for_registered_statuses() {
        let mut record = patient("rec1", PatientStatus::Registered);
        record.simp_verified = true;
        record.key_action_date = Some(date(2024, 6, 1));
        // Falls through to the status router, which archives without SIMP.
        let action = route_record_change(&record).unwrap();
        assert!(matches!(
            action,
            RecordAction::Archive {
                via_simp: false,
                ..
            }
        ));
    }

    #[test]
    fn test_simp_without_key_action_date_falls_through() {
        let mut record = patient("rec1", PatientStatus::ToContact);
        record.simp_verified = true;
        assert_eq!(route_record_change(&record).unwrap(), RecordAction::Ignore);
    }

    #[test]
    fn test_resigned_routes_to_resignation_archive() {
        let record = patient("rec1", PatientStatus::Resigned);
        assert_eq!(
            route_record_change(&record).unwrap(),
            RecordAction::ArchiveResignation
        );
    }

    #[test]
    fn test_other_statuses_are_ignored() {
        for status in [
            PatientStatus::PendingCallback,
            PatientStatus::NotAnswering,
            PatientStatus::ToContact,
            PatientStatus::Archived,
            PatientStatus::Other("First visit".into()),
        ] {
            let record = patient("rec1", status);
            assert_eq!(route_record_change(&record).unwrap(), RecordAction::Ignore);
        }
    }

    #[tokio::test]
    async fn test_handle_archives_and_appends_note() {
        let store = MemoryStore::new();
        let mut record = patient("rec1", PatientStatus::Registered);
        record.key_action_date = Some(date(2024, 1, 10));
        record.notes = "Intake done.".into();
        store.insert_patient(record);

        let now = date(2026, 3, 14);
        handle_record_change(&store, "rec1", now).await.unwrap();

        let updated = store.patient("rec1").unwrap();
        assert_eq!(updated.status, PatientStatus::Archived);
        assert_eq!(updated.next_permission_date, Some(date(2026, 1, 9)));
        assert_eq!(
            updated.notes,
            "Intake done.\nSystem (2026-03-14): Record archived."
        );
    }

    #[tokio::test]
    async fn test_handle_simp_note_is_tagged() {
        let store = MemoryStore::new();
        let mut record = patient("rec1", PatientStatus::NotAnswering);
        record.simp_verified = true;
        record.key_action_date = Some(date(2024, 6, 1));
        store.insert_patient(record);

        handle_record_change(&store, "rec1", date(2026, 3, 14))
            .await
            .unwrap();

        let updated = store.patient("rec1").unwrap();
        assert_eq!(updated.status, PatientStatus::Archived);
        assert!(updated.notes.contains("Record archived (SIMP rule)."));
    }

    #[tokio::test]
    async fn test_handle_resignation_clears_date_without_note() {
        let store = MemoryStore::new();
        let mut record = patient("rec1", PatientStatus::Resigned);
        record.next_permission_date = Some(date(2026, 6, 1));
        record.notes = "Called twice.".into();
        store.insert_patient(record);

        handle_record_change(&store, "rec1", date(2026, 3, 14))
            .await
            .unwrap();

        let updated = store.patient("rec1").unwrap();
        assert_eq!(updated.status, PatientStatus::ArchivedResignation);
        assert_eq!(updated.next_permission_date, None);
        assert_eq!(updated.notes, "Called twice.");
    }

    #[tokio::test]
    async fn test_handle_validation_error_leaves_record_untouched() {
        let store = MemoryStore::new();
        store.insert_patient(patient("rec1", PatientStatus::Registered));

        let err = handle_record_change(&store, "rec1", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CareflowError::Validation(_)));

        let untouched = store.patient("rec1").unwrap();
        assert_eq!(untouched.status, PatientStatus::Registered);
        assert_eq!(untouched.next_permission_date, None);
    }

    #[tokio::test]
    async fn test_handle_noop_leaves_record_untouched() {
        let store = MemoryStore::new();
        let record = patient("rec1", PatientStatus::ToContact);
        store.insert_patient(record.clone());

        let action = handle_record_change(&store, "rec1", Utc::now())
            .await
            .unwrap();
        assert_eq!(action, RecordAction::Ignore);
        assert_eq!(store.patient("rec1").unwrap(), record);
    }

    #[tokio::test]
    async fn test_handle_unknown_record_is_not_found() {
        let store = MemoryStore::new();
        let err = handle_record_change(&store, "recMissing", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CareflowError::NotFound(_)));
    }
}
