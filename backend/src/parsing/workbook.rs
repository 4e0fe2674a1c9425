//! Workbook decoding for uploaded timetable files.
//!
//! The upload is spooled into a temporary file, opened with calamine and the
//! first worksheet is turned into rows of [`RawCell`]s. Values come from the
//! cached cell contents; formula text is read from the formula layer of the
//! same sheet so formula cells keep their cached result kind.
//!
//! calamine does not expose number formats, so for xlsx uploads the display
//! format of every styled cell is read separately with umya-spreadsheet and
//! attached to numeric values. Other containers fall back to format codes
//! synthesized from calamine's date-time classification.

use calamine::{open_workbook_auto, Data, ExcelDateTime, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use umya_spreadsheet::reader::xlsx;

use super::cell::{datetime_to_serial, FormatClass, RawCell};
use crate::error::{IngestError, IngestResult};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Format codes synthesized for date-time values without a known display format.
const TIME_CODE: &str = "h:mm";
const DATE_CODE: &str = "yyyy-mm-dd";
const DATE_TIME_CODE: &str = "yyyy-mm-dd h:mm";

/// Container detected from the first bytes of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Zip based (xlsx, xlsm, ods).
    OpenXml,
    /// Legacy OLE compound document (xls).
    Legacy,
    Unknown,
}

impl ContainerKind {
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(ZIP_MAGIC) {
            ContainerKind::OpenXml
        } else if head.starts_with(OLE_MAGIC) {
            ContainerKind::Legacy
        } else {
            ContainerKind::Unknown
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ContainerKind::Legacy => ".xls",
            ContainerKind::OpenXml | ContainerKind::Unknown => ".xlsx",
        }
    }
}

/// Temporary on-disk copy of an uploaded file.
///
/// The file is deleted when the buffer is dropped.
#[derive(Debug)]
pub struct UploadBuffer {
    file: NamedTempFile,
    len: u64,
    kind: ContainerKind,
}

impl UploadBuffer {
    /// Copy a byte stream into a fresh temporary file.
    pub fn spool<R: Read>(mut reader: R) -> IngestResult<Self> {
        let mut head = Vec::with_capacity(8);
        reader.by_ref().take(8).read_to_end(&mut head)?;
        if head.is_empty() {
            return Err(IngestError::input("The uploaded file is empty"));
        }

        let kind = ContainerKind::sniff(&head);
        let mut file = tempfile::Builder::new()
            .prefix("upload")
            .suffix(kind.extension())
            .tempfile()?;

        file.write_all(&head)?;
        let rest = io::copy(&mut reader, &mut file)?;
        file.flush()?;

        let len = head.len() as u64 + rest;
        debug!("Spooled {} upload bytes to {}", len, file.path().display());

        Ok(Self { file, len, kind })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }
}

/// One worksheet row with its absolute, zero-based sheet index.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub index: usize,
    pub cells: Vec<RawCell>,
}

/// Decoded content of the first worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSheet {
    pub name: String,
    pub rows: Vec<SheetRow>,
}

impl ParsedSheet {
    /// Rows below the header block, as plain cell vectors.
    pub fn data_rows(self, header_rows: usize) -> impl Iterator<Item = Vec<RawCell>> {
        self.rows
            .into_iter()
            .filter(move |row| row.index >= header_rows)
            .map(|row| row.cells)
    }
}

/// Open a buffered upload and decode its first worksheet.
pub fn read_first_sheet(buffer: &UploadBuffer) -> IngestResult<ParsedSheet> {
    if buffer.is_empty() {
        return Err(IngestError::input("The uploaded file is empty"));
    }

    let mut workbook = open_workbook_auto(buffer.path())
        .map_err(|e| IngestError::input_with_cause("Failed to open workbook", e))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let Some(name) = sheet_names.first().cloned() else {
        return Err(IngestError::input("The uploaded Excel file has no sheets"));
    };

    let values = workbook
        .worksheet_range(&name)
        .map_err(|e| IngestError::input_with_cause(format!("Failed to read sheet '{}'", name), e))?;

    if values.is_empty() {
        return Err(IngestError::input("The uploaded Excel file is empty"));
    }

    // A sheet without any formula (or a reader that cannot expose formulas)
    // simply yields no formula layer.
    let formulas = match workbook.worksheet_formula(&name) {
        Ok(range) => Some(range),
        Err(e) => {
            debug!("No formula layer for sheet '{}': {}", name, e);
            None
        }
    };

    let formats = match buffer.kind() {
        ContainerKind::OpenXml => FormatLayer::from_xlsx(buffer.path(), &name),
        ContainerKind::Legacy | ContainerKind::Unknown => FormatLayer::default(),
    };

    let rows = decode_rows(&values, formulas.as_ref(), &formats);
    info!(
        "Decoded sheet '{}' (first of {}): {} rows",
        name,
        sheet_names.len(),
        rows.len()
    );

    Ok(ParsedSheet { name, rows })
}

/// Display-format codes of one worksheet, keyed by zero-based (row, column).
#[derive(Debug, Clone, Default)]
pub struct FormatLayer {
    codes: HashMap<(u32, u32), String>,
}

impl FormatLayer {
    /// Read the number formats of a named xlsx worksheet.
    ///
    /// Anything the styles reader cannot handle (ods archives, damaged style
    /// parts) yields an empty layer; the values are still decoded by calamine.
    pub fn from_xlsx(path: &Path, sheet_name: &str) -> Self {
        let book = match xlsx::read(path) {
            Ok(book) => book,
            Err(e) => {
                debug!("No number formats for '{}': {}", path.display(), e);
                return Self::default();
            }
        };
        let Some(sheet) = book.get_sheet_by_name(sheet_name) else {
            debug!("Sheet '{}' has no style information", sheet_name);
            return Self::default();
        };

        let mut layer = Self::default();
        for cell in sheet.get_cell_collection() {
            let Some(format) = cell.get_style().get_number_format() else {
                continue;
            };
            let coordinate = cell.get_coordinate();
            // umya coordinates are one-based.
            let row = coordinate.get_row_num().saturating_sub(1);
            let col = coordinate.get_col_num().saturating_sub(1);
            layer.insert(row, col, format.get_format_code());
        }
        debug!("Read {} number formats from sheet '{}'", layer.len(), sheet_name);
        layer
    }

    pub fn insert(&mut self, row: u32, col: u32, code: impl Into<String>) {
        self.codes.insert((row, col), code.into());
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&str> {
        self.codes.get(&(row, col)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Merge the value, formula and format layers into absolute-indexed rows.
fn decode_rows(
    values: &Range<Data>,
    formulas: Option<&Range<String>>,
    formats: &FormatLayer,
) -> Vec<SheetRow> {
    let Some((start_row, start_col)) = values.start() else {
        return Vec::new();
    };
    let (height, width) = values.get_size();

    let mut rows = Vec::with_capacity(height);
    for row_offset in 0..height {
        let row = start_row + row_offset as u32;
        // Column positions are absolute so that a sheet starting at column B
        // still maps its cells to the right fields.
        let mut cells = vec![RawCell::Blank; start_col as usize];
        for col_offset in 0..width {
            let col = start_col + col_offset as u32;
            let value = convert_data(values.get_value((row, col)), formats.get(row, col));
            let formula = formulas
                .and_then(|layer| layer.get_value((row, col)))
                .filter(|text| !text.trim().is_empty());

            cells.push(match formula {
                Some(text) => RawCell::Formula {
                    formula: text.clone(),
                    cached: cached_result(value),
                },
                None => value,
            });
        }
        rows.push(SheetRow {
            index: row as usize,
            cells,
        });
    }
    rows
}

/// A formula's cached value; blank means nothing was cached.
fn cached_result(value: RawCell) -> Option<Box<RawCell>> {
    match value {
        RawCell::Blank => None,
        other => Some(Box::new(other)),
    }
}

/// Translate one calamine value into a raw cell.
///
/// `format` is the cell's display-format code when the container exposes it.
pub fn convert_data(data: Option<&Data>, format: Option<&str>) -> RawCell {
    match data {
        None => RawCell::Blank,
        Some(data) => match data {
            Data::Empty => RawCell::Blank,
            Data::String(s) => RawCell::Text(s.clone()),
            Data::Float(f) => numeric(*f, format),
            Data::Int(i) => numeric(*i as f64, format),
            Data::Bool(b) => RawCell::Boolean(*b),
            Data::DateTime(dt) => convert_datetime(dt, format),
            Data::DateTimeIso(s) => convert_iso(s),
            Data::DurationIso(s) => RawCell::Text(s.clone()),
            Data::Error(e) => RawCell::Error(format!("{:?}", e)),
        },
    }
}

fn numeric(value: f64, format: Option<&str>) -> RawCell {
    RawCell::Numeric {
        value,
        format: format.map(str::to_string),
    }
}

/// A calamine date-time as a 1900-system serial.
///
/// calamine resolves the workbook's 1904 flag when building the date-time, so
/// going through it keeps 1904-system workbooks on the right calendar day.
fn convert_datetime(dt: &ExcelDateTime, format: Option<&str>) -> RawCell {
    let serial = dt
        .as_datetime()
        .and_then(datetime_to_serial)
        .unwrap_or_else(|| dt.as_f64());
    let code = format
        .filter(|code| FormatClass::detect(Some(code)) != FormatClass::Number)
        .unwrap_or_else(|| synthesized_format(serial));
    RawCell::formatted(serial, code)
}

/// Pick a format code matching the shape of a date-time serial.
pub fn synthesized_format(serial: f64) -> &'static str {
    if serial < 1.0 {
        TIME_CODE
    } else if serial.fract() == 0.0 {
        DATE_CODE
    } else {
        DATE_TIME_CODE
    }
}

/// Translate an ISO 8601 value (ods files) into a serial with a format code.
fn convert_iso(text: &str) -> RawCell {
    let trimmed = text.trim().trim_end_matches('Z');

    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        if let Some(serial) = datetime_to_serial(datetime) {
            return RawCell::formatted(serial, DATE_TIME_CODE);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(serial) = date.and_hms_opt(0, 0, 0).and_then(datetime_to_serial) {
            return RawCell::formatted(serial, DATE_CODE);
        }
    }
    if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f") {
        // 1899-12-31 is the day serial zero renders as.
        if let Some(serial) = NaiveDate::from_ymd_opt(1899, 12, 31)
            .map(|epoch| epoch.and_time(time))
            .and_then(datetime_to_serial)
        {
            return RawCell::formatted(serial, TIME_CODE);
        }
    }

    RawCell::Text(text.to_string())
}
