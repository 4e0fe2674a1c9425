//! Spreadsheet parsing: workbook decoding, cell normalization and row
//! assembly.

pub mod cell;
pub mod row;
pub mod workbook;

pub use cell::{normalize, FormatClass, RawCell};
pub use row::{assemble, evaluate_row, is_valid, missing_fields, RowOutcome, MANDATORY_FIELDS};
pub use workbook::{read_first_sheet, ParsedSheet, SheetRow, UploadBuffer};
