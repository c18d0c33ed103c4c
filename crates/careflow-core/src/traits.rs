//! The record-store boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{CallbackEntry, NewCallbackEntry, PatientPatch, PatientRecord};

/// Narrow interface to the external record store.
///
/// The store owns all shared state and all consistency guarantees (typically
/// last-write-wins per record). Handlers are single read-modify-write passes
/// through this trait with no internal retries — retry policy belongs to the
/// webhook/scheduler caller.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a patient record by id. `NotFound` when the id does not exist.
    async fn fetch_patient(&self, id: &str) -> Result<PatientRecord>;

    /// Apply a partial update to a patient record.
    async fn update_patient(&self, id: &str, patch: PatientPatch) -> Result<()>;

    /// Archived patients whose `next_permission_date` lies strictly between
    /// `after` and `before`. Records exactly at either bound are excluded.
    async fn patients_due_for_awakening(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<PatientRecord>>;

    /// The callback-list entry for a patient, if one exists. The list is a
    /// set — at most one entry per patient id.
    async fn find_callback_entry(&self, patient_id: &str) -> Result<Option<CallbackEntry>>;

    /// Create a callback-list entry, returning its new store id.
    async fn create_callback_entry(&self, entry: NewCallbackEntry) -> Result<String>;

    /// Delete a callback-list entry by its entry id.
    async fn delete_callback_entry(&self, entry_id: &str) -> Result<()>;
}
