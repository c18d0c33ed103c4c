//! Airtable record store — REST client over the v0 API.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use careflow_core::config::StoreConfig;
use careflow_core::error::{CareflowError, Result};
use careflow_core::traits::Store;
use careflow_core::types::{
    CallbackEntry, NewCallbackEntry, PatientPatch, PatientRecord, PatientStatus,
};

const API_BASE: &str = "https://api.airtable.com/v0";

/// Date serialization used by the store: ISO-8601, milliseconds, UTC `Z`.
const STORE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// Patient table field names.
const F_STATUS: &str = "Status";
const F_SIMP_VERIFIED: &str = "SIMP verified";
const F_KEY_ACTION_DATE: &str = "Key action date";
const F_NEXT_PERMISSION_DATE: &str = "Next permission date";
const F_NOTES: &str = "Notes";

// Callback list field names.
const F_PATIENT_LINK: &str = "Patient";
const F_STATUS_AT_ADDITION: &str = "Status at addition";
const F_DATE_ADDED: &str = "Date added";

/// Airtable-backed record store.
pub struct AirtableStore {
    client: reqwest::Client,
    api_key: String,
    base_id: String,
    patients_table: String,
    callback_table: String,
}

#[derive(Debug, Deserialize)]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct AirtableList {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

impl AirtableStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_id: config.base_id.clone(),
            patients_table: config.patients_table.clone(),
            callback_table: config.callback_table.clone(),
        }
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        let mut url = Url::parse(API_BASE)
            .map_err(|e| CareflowError::Store(format!("Invalid API base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CareflowError::Store("API base url cannot hold paths".into()))?
            .push(&self.base_id)
            .push(table);
        Ok(url)
    }

    fn record_url(&self, table: &str, id: &str) -> Result<Url> {
        let mut url = self.table_url(table)?;
        url.path_segments_mut()
            .map_err(|_| CareflowError::Store("API base url cannot hold paths".into()))?
            .push(id);
        Ok(url)
    }

    /// List every record matching a filter formula, following pagination.
    async fn list_all(&self, table: &str, formula: &str) -> Result<Vec<AirtableRecord>> {
        let url = self.table_url(table)?;
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(&self.api_key)
                .query(&[("filterByFormula", formula)]);
            if let Some(cursor) = &offset {
                request = request.query(&[("offset", cursor.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| CareflowError::Store(format!("List '{table}' failed: {e}")))?;
            if !response.status().is_success() {
                return Err(CareflowError::Store(format!(
                    "List '{table}' failed: HTTP {}",
                    response.status()
                )));
            }
            let page: AirtableList = response
                .json()
                .await
                .map_err(|e| CareflowError::Store(format!("Invalid list response: {e}")))?;

            records.extend(page.records);
            match page.offset {
                Some(cursor) => offset = Some(cursor),
                None => return Ok(records),
            }
        }
    }
}

#[async_trait]
impl Store for AirtableStore {
    async fn fetch_patient(&self, id: &str) -> Result<PatientRecord> {
        let url = self.record_url(&self.patients_table, id)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| CareflowError::Store(format!("Fetch patient {id} failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CareflowError::NotFound(format!("Patient record {id}")));
        }
        if !response.status().is_success() {
            return Err(CareflowError::Store(format!(
                "Fetch patient {id} failed: HTTP {}",
                response.status()
            )));
        }

        let record: AirtableRecord = response
            .json()
            .await
            .map_err(|e| CareflowError::Store(format!("Invalid patient response: {e}")))?;
        Ok(patient_from_record(&record))
    }

    async fn update_patient(&self, id: &str, patch: PatientPatch) -> Result<()> {
        let url = self.record_url(&self.patients_table, id)?;
        let body = json!({ "fields": patch_fields(&patch) });
        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CareflowError::Store(format!("Update patient {id} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CareflowError::Store(format!(
                "Update patient {id} failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn patients_due_for_awakening(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<PatientRecord>> {
        // IS_AFTER / IS_BEFORE are strict, which gives the sweep its
        // exclusive bounds on both sides.
        let formula = format!(
            "AND({{{F_STATUS}}} = '{}', IS_AFTER({{{F_NEXT_PERMISSION_DATE}}}, '{}'), IS_BEFORE({{{F_NEXT_PERMISSION_DATE}}}, '{}'))",
            PatientStatus::Archived.as_str(),
            format_store_date(after),
            format_store_date(before),
        );
        let records = self.list_all(&self.patients_table, &formula).await?;
        Ok(records.iter().map(patient_from_record).collect())
    }

    async fn find_callback_entry(&self, patient_id: &str) -> Result<Option<CallbackEntry>> {
        let formula = format!(
            "{{{F_PATIENT_LINK}}} = '{}'",
            escape_formula_str(patient_id)
        );
        let records = self.list_all(&self.callback_table, &formula).await?;
        if records.len() > 1 {
            tracing::warn!(
                "Callback list has {} entries for patient {patient_id}, expected at most one",
                records.len()
            );
        }
        Ok(records.first().map(|r| callback_from_record(r, patient_id)))
    }

    async fn create_callback_entry(&self, entry: NewCallbackEntry) -> Result<String> {
        let url = self.table_url(&self.callback_table)?;
        let body = json!({
            "fields": {
                F_PATIENT_LINK: [entry.patient_id],
                F_STATUS_AT_ADDITION: entry.status_at_addition.as_str(),
                F_DATE_ADDED: format_store_date(entry.date_added),
            }
        });
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CareflowError::Store(format!("Create callback entry failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CareflowError::Store(format!(
                "Create callback entry failed: HTTP {}",
                response.status()
            )));
        }
        let created: AirtableRecord = response
            .json()
            .await
            .map_err(|e| CareflowError::Store(format!("Invalid create response: {e}")))?;
        Ok(created.id)
    }

    async fn delete_callback_entry(&self, entry_id: &str) -> Result<()> {
        let url = self.record_url(&self.callback_table, entry_id)?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                CareflowError::Store(format!("Delete callback entry {entry_id} failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(CareflowError::Store(format!(
                "Delete callback entry {entry_id} failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Format a timestamp the way the store serializes date fields.
pub fn format_store_date(date: DateTime<Utc>) -> String {
    date.format(STORE_DATE_FORMAT).to_string()
}

/// Parse a store date field. Accepts full ISO-8601 timestamps and the
/// date-only form Airtable uses for date fields without a time component.
pub fn parse_store_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn escape_formula_str(raw: &str) -> String {
    raw.replace('\'', "\\'")
}

fn date_field(fields: &serde_json::Map<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    fields.get(name).and_then(Value::as_str).and_then(parse_store_date)
}

fn patient_from_record(record: &AirtableRecord) -> PatientRecord {
    let fields = &record.fields;
    // A record without a status label routes to the no-op branch downstream.
    let status = PatientStatus::from_label(
        fields.get(F_STATUS).and_then(Value::as_str).unwrap_or(""),
    );
    PatientRecord {
        id: record.id.clone(),
        status,
        simp_verified: fields
            .get(F_SIMP_VERIFIED)
            .and_then(Value::as_bool)
            .unwrap_or(false),
        key_action_date: date_field(fields, F_KEY_ACTION_DATE),
        next_permission_date: date_field(fields, F_NEXT_PERMISSION_DATE),
        notes: fields
            .get(F_NOTES)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn callback_from_record(record: &AirtableRecord, patient_id: &str) -> CallbackEntry {
    let fields = &record.fields;
    let linked_id = fields
        .get(F_PATIENT_LINK)
        .and_then(Value::as_array)
        .and_then(|links| links.first())
        .and_then(Value::as_str)
        .unwrap_or(patient_id);
    CallbackEntry {
        id: record.id.clone(),
        patient_id: linked_id.to_string(),
        status_at_addition: PatientStatus::from_label(
            fields
                .get(F_STATUS_AT_ADDITION)
                .and_then(Value::as_str)
                .unwrap_or(""),
        ),
        date_added: date_field(fields, F_DATE_ADDED).unwrap_or_else(Utc::now),
    }
}

fn patch_fields(patch: &PatientPatch) -> serde_json::Map<String, Value> {
    let mut fields = serde_json::Map::new();
    fields.insert(F_STATUS.into(), json!(patch.status.as_str()));
    // Status and the permission date travel together; None clears the field.
    fields.insert(
        F_NEXT_PERMISSION_DATE.into(),
        match patch.next_permission_date {
            Some(date) => json!(format_store_date(date)),
            None => Value::Null,
        },
    );
    if let Some(notes) = &patch.notes {
        fields.insert(F_NOTES.into(), json!(notes));
    }
    fields
}
