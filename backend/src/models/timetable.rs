//! Timetable entry types shared by the parser, the pipeline and the store.
//!
//! Field names serialize in camelCase (`startTime`, `className`, ...) so that
//! stored documents and API payloads keep the same shape the mobile client
//! already consumes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, sanitized identifier of the user owning a partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an already sanitized identifier.
    ///
    /// Use [`crate::db::services::sanitize_user_id`] for raw input coming from
    /// a request.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One normalized timetable row, before the store assigns it an identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleEntry {
    pub group: String,
    pub day: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub class_name: String,
    pub teacher_name: String,
    pub room: String,
}

impl ScheduleEntry {
    /// Key used to detect repeated rows inside a single upload.
    pub fn comparison_key(&self) -> ComparisonKey {
        ComparisonKey::from(self)
    }

    /// Field/value pairs used to probe the store for an already persisted copy.
    pub fn match_fields(&self) -> MatchFields {
        MatchFields {
            group: self.group.clone(),
            day: self.day.clone(),
            date: self.date.clone(),
            start_time: self.start_time.clone(),
            class_name: self.class_name.clone(),
        }
    }
}

/// A persisted entry together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    #[serde(flatten)]
    pub entry: ScheduleEntry,
}

/// Concatenation of `group|day|date|startTime|className`.
///
/// Only lives for the duration of one upload and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonKey(String);

impl ComparisonKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ScheduleEntry> for ComparisonKey {
    fn from(entry: &ScheduleEntry) -> Self {
        Self(format!(
            "{}|{}|{}|{}|{}",
            entry.group, entry.day, entry.date, entry.start_time, entry.class_name
        ))
    }
}

/// Discriminant fields of an existence probe.
///
/// All five fields are compared for equality; the date participates even when
/// empty so that weekly rows and dated rows never shadow each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFields {
    pub group: String,
    pub day: String,
    pub date: String,
    pub start_time: String,
    pub class_name: String,
}

impl MatchFields {
    pub fn matches(&self, entry: &ScheduleEntry) -> bool {
        self.group == entry.group
            && self.day == entry.day
            && self.date == entry.date
            && self.start_time == entry.start_time
            && self.class_name == entry.class_name
    }
}

/// Outcome tallies of one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    /// Data rows that carried a discriminant cell.
    pub rows_seen: usize,
    /// Rows that passed the validity gate.
    pub valid_records: usize,
    /// Rows rejected for missing mandatory fields.
    pub invalid_records: usize,
    /// Rows already present in the user's partition.
    pub persisted_duplicates: usize,
    /// Rows repeating an earlier row of the same upload.
    pub batch_duplicates: usize,
    pub saved_count: usize,
    pub saved_ids: Vec<String>,
}

/// Wire response of the upload endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadResponse {
    pub message: String,
    pub note: String,
    pub error: String,
    pub count: usize,
    pub ids: Vec<String>,
}

impl UploadResponse {
    /// Success response for a completed upload.
    pub fn from_summary(user_id: &UserId, summary: UploadSummary) -> Self {
        Self {
            message: "Upload successful".to_string(),
            note: format!(
                "user id :{}; {} duplicates already stored, {} repeated rows in file",
                user_id, summary.persisted_duplicates, summary.batch_duplicates
            ),
            error: String::new(),
            count: summary.saved_count,
            ids: summary.saved_ids,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            message: "Error".to_string(),
            error: error.into(),
            ..Default::default()
        }
    }
}
