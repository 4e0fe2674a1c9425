#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use timetable_ingest::db::LocalRepository;
use timetable_ingest::models::ScheduleEntry;
use timetable_ingest::parsing::RawCell;
use timetable_ingest::{IngestPipeline, PipelineSettings};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process environment across parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

pub const HEADER: [&str; 8] = [
    "group",
    "day",
    "date",
    "startTime",
    "endTime",
    "className",
    "teacherName",
    "room",
];

/// A row of text cells.
pub fn text_row(values: &[&str]) -> Vec<RawCell> {
    values.iter().map(|v| RawCell::text(*v)).collect()
}

/// A complete, valid row for `group` starting at `start`.
pub fn lesson_row(group: &str, start: &str, class_name: &str) -> Vec<RawCell> {
    text_row(&[group, "Mon", "", start, "10:00", class_name, "Smith", "101"])
}

pub fn entry(group: &str, start: &str, class_name: &str) -> ScheduleEntry {
    ScheduleEntry {
        group: group.into(),
        day: "Mon".into(),
        start_time: start.into(),
        end_time: "10:00".into(),
        class_name: class_name.into(),
        teacher_name: "Smith".into(),
        room: "101".into(),
        ..Default::default()
    }
}

pub fn pipeline_with(repo: &LocalRepository, settings: PipelineSettings) -> IngestPipeline {
    IngestPipeline::new(Arc::new(repo.clone()), settings)
}

pub fn pipeline(repo: &LocalRepository) -> IngestPipeline {
    pipeline_with(repo, PipelineSettings::default())
}

/// One spreadsheet cell to author in a fixture.
#[derive(Debug, Clone)]
pub enum Cell {
    Empty,
    Text(&'static str),
    Number(f64),
    /// Serial number with a display format code
    Styled(f64, &'static str),
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Write an xlsx workbook whose first sheet holds `rows` starting at A1.
pub fn write_workbook(path: &Path, rows: &[Vec<Cell>]) {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_mut(&0).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let coordinate = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Cell::Empty => {}
                Cell::Text(text) => {
                    sheet.get_cell_mut(coordinate.as_str()).set_value(*text);
                }
                Cell::Number(value) => {
                    sheet.get_cell_mut(coordinate.as_str()).set_value_number(*value);
                }
                Cell::Styled(value, code) => {
                    let target = sheet.get_cell_mut(coordinate.as_str());
                    target.set_value_number(*value);
                    target
                        .get_style_mut()
                        .get_number_format_mut()
                        .set_format_code(*code);
                }
            }
        }
    }
    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

/// Author a workbook and return its bytes.
pub fn workbook_bytes(rows: &[Vec<Cell>]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.xlsx");
    write_workbook(&path, rows);
    std::fs::read(&path).unwrap()
}

pub fn header_cells() -> Vec<Cell> {
    HEADER.iter().map(|h| Cell::Text(*h)).collect()
}
