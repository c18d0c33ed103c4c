//! In-memory record store — credential-free backend for local runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use careflow_core::error::{CareflowError, Result};
use careflow_core::traits::Store;
use careflow_core::types::{
    CallbackEntry, NewCallbackEntry, PatientPatch, PatientRecord, PatientStatus,
};

/// Record store held in process memory. Mirrors the external store's
/// last-write-wins per-record semantics; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    patients: Mutex<HashMap<String, PatientRecord>>,
    callbacks: Mutex<HashMap<String, CallbackEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a patient record (seeding helper).
    pub fn insert_patient(&self, record: PatientRecord) {
        self.patients
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    /// Snapshot a patient record by id.
    pub fn patient(&self, id: &str) -> Option<PatientRecord> {
        self.patients.lock().unwrap().get(id).cloned()
    }

    /// Number of callback-list entries currently held.
    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_patient(&self, id: &str) -> Result<PatientRecord> {
        self.patients
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CareflowError::NotFound(format!("Patient record {id}")))
    }

    async fn update_patient(&self, id: &str, patch: PatientPatch) -> Result<()> {
        let mut patients = self.patients.lock().unwrap();
        let record = patients
            .get_mut(id)
            .ok_or_else(|| CareflowError::NotFound(format!("Patient record {id}")))?;
        record.status = patch.status;
        record.next_permission_date = patch.next_permission_date;
        if let Some(notes) = patch.notes {
            record.notes = notes;
        }
        Ok(())
    }

    async fn patients_due_for_awakening(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<PatientRecord>> {
        let patients = self.patients.lock().unwrap();
        Ok(patients
            .values()
            .filter(|p| p.status == PatientStatus::Archived)
            .filter(|p| {
                // Strict on both bounds, matching the store formula.
                p.next_permission_date
                    .is_some_and(|due| after < due && due < before)
            })
            .cloned()
            .collect())
    }

    async fn find_callback_entry(&self, patient_id: &str) -> Result<Option<CallbackEntry>> {
        let callbacks = self.callbacks.lock().unwrap();
        Ok(callbacks
            .values()
            .find(|entry| entry.patient_id == patient_id)
            .cloned())
    }

    async fn create_callback_entry(&self, entry: NewCallbackEntry) -> Result<String> {
        let id = format!("cbk{}", uuid::Uuid::new_v4().simple());
        self.callbacks.lock().unwrap().insert(
            id.clone(),
            CallbackEntry {
                id: id.clone(),
                patient_id: entry.patient_id,
                status_at_addition: entry.status_at_addition,
                date_added: entry.date_added,
            },
        );
        Ok(id)
    }

    async fn delete_callback_entry(&self, entry_id: &str) -> Result<()> {
        self.callbacks
            .lock()
            .unwrap()
            .remove(entry_id)
            .map(|_| ())
            .ok_or_else(|| CareflowError::NotFound(format!("Callback entry {entry_id}")))
    }
}
