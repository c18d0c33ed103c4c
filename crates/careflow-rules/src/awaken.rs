//! Daily awaken sweep — reactivates archived records nearing their
//! permission date.

use chrono::{DateTime, Duration, Utc};

use careflow_core::error::Result;
use careflow_core::traits::Store;
use careflow_core::types::{
    AWAKEN_HORIZON_DAYS, PatientPatch, PatientStatus, append_system_note,
};

/// Outcome of one sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Records the due query returned.
    pub matched: usize,
    /// Records successfully moved to `ToContact`.
    pub awakened: usize,
}

/// Find archived patients whose permission date falls strictly within the
/// next [`AWAKEN_HORIZON_DAYS`] days and move them back to `ToContact`.
///
/// The batch is best-effort: a failed update is logged and skipped so one
/// bad record cannot starve the rest. Only a failed query is an error.
pub async fn run_awaken_sweep(store: &dyn Store, now: DateTime<Utc>) -> Result<SweepReport> {
    let limit = now + Duration::days(AWAKEN_HORIZON_DAYS);
    let due = store.patients_due_for_awakening(now, limit).await?;
    let matched = due.len();
    if matched == 0 {
        tracing::info!("Awaken sweep: no patients due");
        return Ok(SweepReport {
            matched: 0,
            awakened: 0,
        });
    }

    let mut awakened = 0;
    for patient in due {
        // The query guarantees a permission date; skip defensively if the
        // record changed between query and processing.
        let Some(permission_due) = patient.next_permission_date else {
            tracing::warn!(
                "Record {} matched the sweep without a permission date, skipping",
                patient.id
            );
            continue;
        };
        let message = format!(
            "Record restored from archive. Permission due: {}.",
            permission_due.to_rfc3339()
        );
        let patch = PatientPatch {
            status: PatientStatus::ToContact,
            next_permission_date: None,
            notes: Some(append_system_note(&patient.notes, now, &message)),
        };
        match store.update_patient(&patient.id, patch).await {
            Ok(()) => {
                awakened += 1;
                tracing::info!("Awakened patient record {}", patient.id);
            }
            Err(e) => {
                tracing::error!("Failed to awaken record {}: {e}", patient.id);
            }
        }
    }

    tracing::info!("Awaken sweep: {awakened} of {matched} due records awakened");
    Ok(SweepReport { matched, awakened })
}

#[cfg(test)]
mod tests {
    use super::*;
    use careflow_core::types::PatientRecord;
    use careflow_store::MemoryStore;
    use chrono::TimeZone;

    fn archived(id: &str, due: DateTime<Utc>) -> PatientRecord {
        PatientRecord {
            id: id.into(),
            status: PatientStatus::Archived,
            simp_verified: false,
            key_action_date: None,
            next_permission_date: Some(due),
            notes: String::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 5, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_awakens_due_records() {
        let store = MemoryStore::new();
        let due_date = now() + Duration::days(10);
        store.insert_patient(archived("rec1", due_date));

        let report = run_awaken_sweep(&store, now()).await.unwrap();
        assert_eq!(report, SweepReport { matched: 1, awakened: 1 });

        let updated = store.patient("rec1").unwrap();
        assert_eq!(updated.status, PatientStatus::ToContact);
        assert_eq!(updated.next_permission_date, None);
        assert!(updated.notes.contains("Record restored from archive."));
        assert!(updated.notes.contains(&due_date.to_rfc3339()));
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let store = MemoryStore::new();
        store.insert_patient(archived("rec1", now() + Duration::days(10)));

        let first = run_awaken_sweep(&store, now()).await.unwrap();
        assert_eq!(first.awakened, 1);

        // Once awakened, the record no longer matches the Archived filter.
        let second = run_awaken_sweep(&store, now()).await.unwrap();
        assert_eq!(second, SweepReport { matched: 0, awakened: 0 });
        let notes = store.patient("rec1").unwrap().notes;
        assert_eq!(notes.matches("restored from archive").count(), 1);
    }

    #[tokio::test]
    async fn test_sweep_excludes_boundary_dates() {
        let store = MemoryStore::new();
        store.insert_patient(archived("rec_at_now", now()));
        store.insert_patient(archived("rec_at_limit", now() + Duration::days(30)));

        let report = run_awaken_sweep(&store, now()).await.unwrap();
        assert_eq!(report, SweepReport { matched: 0, awakened: 0 });
        assert_eq!(store.patient("rec_at_now").unwrap().status, PatientStatus::Archived);
        assert_eq!(store.patient("rec_at_limit").unwrap().status, PatientStatus::Archived);
    }

    #[tokio::test]
    async fn test_sweep_ignores_past_and_distant_records() {
        let store = MemoryStore::new();
        store.insert_patient(archived("rec_past", now() - Duration::days(3)));
        store.insert_patient(archived("rec_far", now() + Duration::days(45)));
        store.insert_patient(archived("rec_due", now() + Duration::days(29)));

        let report = run_awaken_sweep(&store, now()).await.unwrap();
        assert_eq!(report, SweepReport { matched: 1, awakened: 1 });
        assert_eq!(store.patient("rec_due").unwrap().status, PatientStatus::ToContact);
        assert_eq!(store.patient("rec_past").unwrap().status, PatientStatus::Archived);
        assert_eq!(store.patient("rec_far").unwrap().status, PatientStatus::Archived);
    }

    #[tokio::test]
    async fn test_sweep_with_empty_store_reports_zero() {
        let store = MemoryStore::new();
        let report = run_awaken_sweep(&store, now()).await.unwrap();
        assert_eq!(report, SweepReport { matched: 0, awakened: 0 });
    }
}
