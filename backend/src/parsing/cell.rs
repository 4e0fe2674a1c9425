//! Cell normalization.
//!
//! Every raw spreadsheet cell is reduced to one canonical text value. The
//! conversion is total: unreadable values degrade to empty text instead of
//! failing the row.
//!
//! Numeric cells are classified by their display-format code. A code is
//! reduced to its significant letters (quoted literals, escapes, colour and
//! locale sections are dropped) and then inspected for date tokens (`y`, `d`)
//! and time tokens (`h`, `s`). The `m` token is read as minutes when the same
//! code carries an hour or second token and as months otherwise, so `mm:ss`
//! and `h:mm` are times while `mmm yyyy` and `d-mmm` are dates.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::debug;

/// Seconds in one spreadsheet day.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Largest serial representable in the 1900 date system (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.999_988_4;

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A spreadsheet cell as decoded from the workbook, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Blank,
    Text(String),
    Boolean(bool),
    /// A number together with the display-format code of its cell style.
    Numeric { value: f64, format: Option<String> },
    /// An error value such as `#DIV/0!`.
    Error(String),
    /// A formula with the result cached by the last application that saved it.
    Formula {
        formula: String,
        cached: Option<Box<RawCell>>,
    },
}

impl RawCell {
    pub fn text(value: impl Into<String>) -> Self {
        RawCell::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        RawCell::Numeric {
            value,
            format: None,
        }
    }

    pub fn formatted(value: f64, format: impl Into<String>) -> Self {
        RawCell::Numeric {
            value,
            format: Some(format.into()),
        }
    }

    pub fn formula(formula: impl Into<String>, cached: Option<RawCell>) -> Self {
        RawCell::Formula {
            formula: formula.into(),
            cached: cached.map(Box::new),
        }
    }
}

/// Which formatter a numeric cell is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    /// Plain number, no date or time tokens.
    Number,
    Date,
    Time,
    DateTime,
}

impl FormatClass {
    /// Classify a display-format code.
    pub fn detect(code: Option<&str>) -> Self {
        let Some(code) = code else {
            return FormatClass::Number;
        };

        let letters = significant_letters(code);
        let has = |token: char| letters.contains(&token);

        let has_hour = has('h');
        let has_second = has('s');
        let month_or_minute = has('m');
        let m_is_minute = has_hour || has_second;

        let date = has('y') || has('d') || (month_or_minute && !m_is_minute);
        let time = has_hour || has_second || (month_or_minute && m_is_minute);

        match (date, time) {
            (true, true) => FormatClass::DateTime,
            (true, false) => FormatClass::Date,
            (false, true) => FormatClass::Time,
            (false, false) => FormatClass::Number,
        }
    }
}

/// Lowercased format letters that can act as date/time tokens.
fn significant_letters(code: &str) -> Vec<char> {
    // Only the first section of a multi-section code describes positive values.
    let section = code.split(';').next().unwrap_or_default();
    if section.trim().eq_ignore_ascii_case("general") {
        return Vec::new();
    }

    let mut letters = Vec::new();
    let mut chars = section.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for quoted in chars.by_ref() {
                    if quoted == '"' {
                        break;
                    }
                }
            }
            // Escape, padding and fill directives consume the next character.
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let mut inner = String::new();
                for bracketed in chars.by_ref() {
                    if bracketed == ']' {
                        break;
                    }
                    inner.push(bracketed);
                }
                // Elapsed-time sections like [h] or [mm] are real tokens.
                let inner = inner.to_ascii_lowercase();
                if !inner.is_empty() && inner.chars().all(|t| matches!(t, 'h' | 'm' | 's')) {
                    letters.extend(inner.chars());
                }
            }
            // `AM/PM` and `A/P` markers are not month/minute tokens.
            'a' | 'A' if starts_with_ignore_case(chars.as_str(), "M/PM") => {
                chars.nth(3);
            }
            'a' | 'A' if starts_with_ignore_case(chars.as_str(), "/P") => {
                chars.nth(1);
            }
            c if c.is_ascii_alphabetic() => {
                let lower = c.to_ascii_lowercase();
                if matches!(lower, 'y' | 'd' | 'h' | 'm' | 's') {
                    letters.push(lower);
                }
            }
            _ => {}
        }
    }

    letters
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Convert one raw cell into canonical text.
pub fn normalize(cell: &RawCell) -> String {
    match cell {
        RawCell::Blank => String::new(),
        RawCell::Text(text) => text.trim().to_string(),
        RawCell::Boolean(value) => value.to_string(),
        RawCell::Numeric { value, format } => normalize_numeric(*value, format.as_deref()),
        RawCell::Error(_) => String::new(),
        RawCell::Formula { formula, cached } => normalize_cached(formula, cached.as_deref()),
    }
}

/// Normalize a formula through its cached result kind.
fn normalize_cached(formula: &str, cached: Option<&RawCell>) -> String {
    match cached {
        None => {
            debug!("Formula '{}' has no cached result; using empty text", formula);
            String::new()
        }
        Some(RawCell::Error(error)) => {
            debug!("Formula '{}' cached an error ({}); using empty text", formula, error);
            String::new()
        }
        Some(RawCell::Formula { .. }) => {
            debug!("Formula '{}' cached another formula; using empty text", formula);
            String::new()
        }
        Some(result) => normalize(result),
    }
}

fn normalize_numeric(value: f64, format: Option<&str>) -> String {
    let pattern = match FormatClass::detect(format) {
        FormatClass::Number => return render_number(value),
        FormatClass::Date => DATE_FORMAT,
        FormatClass::Time => TIME_FORMAT,
        FormatClass::DateTime => DATE_TIME_FORMAT,
    };

    match serial_to_datetime(value) {
        Some(datetime) => datetime.format(pattern).to_string(),
        None => {
            debug!("Serial {} is outside the representable date range", value);
            String::new()
        }
    }
}

/// Render a number as an integer literal when it has no fractional part.
pub fn render_number(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// First serial after the fictitious 1900-02-29 of the 1900 date system.
const LEAP_BUG_SERIAL: f64 = 60.0;

/// Convert a 1900-system serial number into a calendar date-time.
///
/// Serial 1 is 1900-01-01. Serials from 60 on count from 1899-12-30, which
/// absorbs the non-existent 1900-02-29. The value is rounded to the nearest
/// second.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = if serial < LEAP_BUG_SERIAL {
        serial + 1.0
    } else {
        serial
    };
    let seconds = (days * SECONDS_PER_DAY).round() as i64;
    serial_epoch()?.checked_add_signed(Duration::seconds(seconds))
}

/// Inverse of [`serial_to_datetime`].
pub fn datetime_to_serial(datetime: NaiveDateTime) -> Option<f64> {
    let seconds = datetime.signed_duration_since(serial_epoch()?).num_seconds();
    let days = seconds as f64 / SECONDS_PER_DAY;
    Some(if days < LEAP_BUG_SERIAL { days - 1.0 } else { days })
}

fn serial_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

#[cfg(test)]
#[path = "cell_tests.rs"]
mod tests;
