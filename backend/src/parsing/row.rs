//! Row assembly and the validity gate.

use super::cell::{normalize, RawCell};
use crate::models::ScheduleEntry;

/// Number of positional columns in a timetable sheet.
pub const COLUMN_COUNT: usize = 8;

/// Fields that must be non-blank for an entry to be persisted.
pub const MANDATORY_FIELDS: [&str; 5] = ["group", "day", "startTime", "endTime", "className"];

/// What happened to one sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The row produced a valid entry.
    Assembled(ScheduleEntry),
    /// The discriminant cell was absent or blank.
    Skipped,
    /// The row produced an entry with blank mandatory fields.
    Rejected(ScheduleEntry),
}

/// Map a row of raw cells to an entry.
///
/// Returns `None` when the first cell is missing or normalizes to blank.
/// Cells past the eighth column are ignored and missing trailing cells read
/// as blank.
pub fn assemble(row: &[RawCell]) -> Option<ScheduleEntry> {
    let cell = |index: usize| row.get(index).map(normalize).unwrap_or_default();

    let group = cell(0);
    if group.is_empty() {
        return None;
    }

    Some(ScheduleEntry {
        group,
        day: cell(1),
        date: cell(2),
        start_time: cell(3),
        end_time: cell(4),
        class_name: cell(5),
        teacher_name: cell(6),
        room: cell(7),
    })
}

/// Names of mandatory fields that are blank after trimming.
pub fn missing_fields(entry: &ScheduleEntry) -> Vec<&'static str> {
    let values = [
        &entry.group,
        &entry.day,
        &entry.start_time,
        &entry.end_time,
        &entry.class_name,
    ];
    MANDATORY_FIELDS
        .iter()
        .zip(values)
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

pub fn is_valid(entry: &ScheduleEntry) -> bool {
    missing_fields(entry).is_empty()
}

/// Assemble a row and pass it through the validity gate.
pub fn evaluate_row(row: &[RawCell]) -> RowOutcome {
    match assemble(row) {
        None => RowOutcome::Skipped,
        Some(entry) if is_valid(&entry) => RowOutcome::Assembled(entry),
        Some(entry) => RowOutcome::Rejected(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(values: &[&str]) -> Vec<RawCell> {
        values.iter().map(|v| RawCell::text(*v)).collect()
    }

    #[test]
    fn test_assemble_full_row() {
        let row = text_row(&["A", "Mon", "2024-01-01", "09:00", "10:00", "Math", "Smith", "101"]);
        let entry = assemble(&row).unwrap();
        assert_eq!(entry.group, "A");
        assert_eq!(entry.start_time, "09:00");
        assert_eq!(entry.class_name, "Math");
        assert_eq!(entry.room, "101");
    }

    #[test]
    fn test_blank_discriminant_is_skipped() {
        assert_eq!(assemble(&text_row(&["", "Mon", "", "09:00"])), None);
        assert_eq!(assemble(&text_row(&["   ", "Mon"])), None);
        assert_eq!(assemble(&[RawCell::Blank, RawCell::text("Mon")]), None);
        assert_eq!(assemble(&[]), None);
        assert_eq!(evaluate_row(&text_row(&["", "", "", "", "", "", "", ""])), RowOutcome::Skipped);
    }

    #[test]
    fn test_numeric_discriminant_is_kept() {
        let row = vec![RawCell::number(11.0), RawCell::text("Tue")];
        assert_eq!(assemble(&row).unwrap().group, "11");
    }

    #[test]
    fn test_short_row_reads_blank_and_is_rejected() {
        let row = text_row(&["A", "Mon"]);
        let outcome = evaluate_row(&row);
        let RowOutcome::Rejected(entry) = outcome else {
            panic!("expected rejection, got {:?}", outcome);
        };
        assert_eq!(
            missing_fields(&entry),
            vec!["startTime", "endTime", "className"]
        );
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let row = text_row(&["A", "Mon", "", "09:00", "10:00", "Math", "", "", "extra", "more"]);
        let RowOutcome::Assembled(entry) = evaluate_row(&row) else {
            panic!("row should be valid");
        };
        assert_eq!(entry.room, "");
    }

    #[test]
    fn test_teacher_and_room_are_optional() {
        let row = text_row(&["A", "Mon", "", "09:00", "10:00", "Math"]);
        assert!(matches!(evaluate_row(&row), RowOutcome::Assembled(_)));
    }
}
