//! Domain types for patient records and the callback list.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days between the key action and the next permission date (two-year
/// eligibility window). Shared by the SIMP override and the status router —
/// the two archival paths must never drift apart.
pub const ELIGIBILITY_WINDOW_DAYS: i64 = 730;

/// How far ahead (in days) the daily sweep looks for archived records whose
/// permission date is coming up.
pub const AWAKEN_HORIZON_DAYS: i64 = 30;

/// Workflow status of a patient record.
///
/// The store keeps these as free-form single-select labels; we validate them
/// into a closed enum at the store boundary. Labels we do not recognize are
/// preserved verbatim in `Other` so a round trip never corrupts the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientStatus {
    Registered,
    RegisteredElsewhere,
    Resigned,
    PendingCallback,
    NotAnswering,
    ToContact,
    Archived,
    ArchivedResignation,
    Other(String),
}

impl PatientStatus {
    /// The store-side label for this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registered => "Registered",
            Self::RegisteredElsewhere => "Registered elsewhere",
            Self::Resigned => "Resigned",
            Self::PendingCallback => "Pending callback",
            Self::NotAnswering => "Not answering",
            Self::ToContact => "To contact",
            Self::Archived => "Archived",
            Self::ArchivedResignation => "Archived - resignation",
            Self::Other(label) => label,
        }
    }

    /// Parse a store label. Unknown labels land in `Other`, never an error.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Registered" => Self::Registered,
            "Registered elsewhere" => Self::RegisteredElsewhere,
            "Resigned" => Self::Resigned,
            "Pending callback" => Self::PendingCallback,
            "Not answering" => Self::NotAnswering,
            "To contact" => Self::ToContact,
            "Archived" => Self::Archived,
            "Archived - resignation" => Self::ArchivedResignation,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this status puts the patient on the callback list.
    pub fn needs_callback(&self) -> bool {
        matches!(self, Self::PendingCallback | Self::NotAnswering)
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PatientStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PatientStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// A patient record as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Opaque store record id.
    pub id: String,
    pub status: PatientStatus,
    /// SIMP verification checkbox — independent of status, absent means false.
    #[serde(default)]
    pub simp_verified: bool,
    pub key_action_date: Option<DateTime<Utc>>,
    pub next_permission_date: Option<DateTime<Utc>>,
    /// Append-only free-text log. System mutations append, never overwrite.
    #[serde(default)]
    pub notes: String,
}

/// A partial update to a patient record.
///
/// `status` and `next_permission_date` always travel together — they are the
/// pair every transition updates atomically. `None` for the permission date
/// means "clear it in the store", not "leave it alone". `notes`, when set,
/// replaces the notes field with the already-appended text.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientPatch {
    pub status: PatientStatus,
    pub next_permission_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// An entry on the callback list, referencing exactly one patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackEntry {
    /// Opaque store entry id (distinct from the patient record id).
    pub id: String,
    pub patient_id: String,
    pub status_at_addition: PatientStatus,
    pub date_added: DateTime<Utc>,
}

/// Fields for a callback-list entry about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCallbackEntry {
    pub patient_id: String,
    pub status_at_addition: PatientStatus,
    pub date_added: DateTime<Utc>,
}

/// Append a system audit line to a notes field.
///
/// Existing notes are preserved verbatim; the new line carries a date-only
/// timestamp so repeated runs on the same day read naturally.
pub fn append_system_note(existing: &str, now: DateTime<Utc>, message: &str) -> String {
    format!("{existing}\nSystem ({}): {message}", now.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_label_round_trip() {
        for label in [
            "Registered",
            "Registered elsewhere",
            "Resigned",
            "Pending callback",
            "Not answering",
            "To contact",
            "Archived",
            "Archived - resignation",
        ] {
            assert_eq!(PatientStatus::from_label(label).as_str(), label);
        }
    }

    #[test]
    fn test_unknown_status_preserved() {
        let status = PatientStatus::from_label("First visit");
        assert_eq!(status, PatientStatus::Other("First visit".into()));
        assert_eq!(status.as_str(), "First visit");
    }

    #[test]
    fn test_status_serde_as_label() {
        let json = serde_json::to_string(&PatientStatus::RegisteredElsewhere).unwrap();
        assert_eq!(json, "\"Registered elsewhere\"");
        let back: PatientStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PatientStatus::RegisteredElsewhere);
    }

    #[test]
    fn test_needs_callback() {
        assert!(PatientStatus::PendingCallback.needs_callback());
        assert!(PatientStatus::NotAnswering.needs_callback());
        assert!(!PatientStatus::Registered.needs_callback());
        assert!(!PatientStatus::Archived.needs_callback());
    }

    #[test]
    fn test_append_system_note_preserves_existing() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let notes = append_system_note("First contact 2026-01-02.", now, "Record archived.");
        assert_eq!(
            notes,
            "First contact 2026-01-02.\nSystem (2026-03-14): Record archived."
        );
    }

    #[test]
    fn test_append_system_note_on_empty_notes() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let notes = append_system_note("", now, "Record archived.");
        assert_eq!(notes, "\nSystem (2026-03-14): Record archived.");
    }
}
