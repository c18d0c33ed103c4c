//! Callback-list sync — keeps list membership a pure function of patient
//! status.

use chrono::{DateTime, Utc};

use careflow_core::error::Result;
use careflow_core::traits::Store;
use careflow_core::types::NewCallbackEntry;

/// What the sync did for the patient's list membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Added,
    AlreadyListed,
    Removed,
    NotListed,
}

/// Reconcile the callback list with a patient's current status.
///
/// Idempotent in both directions: repeated calls with the same status leave
/// membership unchanged. Membership is a set — lookup-before-create keeps it
/// to at most one entry per patient.
pub async fn sync_callback_list(
    store: &dyn Store,
    record_id: &str,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    let patient = store.fetch_patient(record_id).await?;
    let existing = store.find_callback_entry(record_id).await?;

    let outcome = match (patient.status.needs_callback(), existing) {
        (true, None) => {
            store
                .create_callback_entry(NewCallbackEntry {
                    patient_id: record_id.to_string(),
                    status_at_addition: patient.status.clone(),
                    date_added: now,
                })
                .await?;
            tracing::info!("Added record {record_id} to the callback list");
            SyncOutcome::Added
        }
        (true, Some(_)) => {
            tracing::debug!("Record {record_id} already on the callback list");
            SyncOutcome::AlreadyListed
        }
        (false, Some(entry)) => {
            store.delete_callback_entry(&entry.id).await?;
            tracing::info!("Removed record {record_id} from the callback list");
            SyncOutcome::Removed
        }
        (false, None) => {
            tracing::debug!("Record {record_id} not on the callback list, nothing to do");
            SyncOutcome::NotListed
        }
    };
    Ok(outcome)
}
