//! Number-format lookups from `xl/styles.xml`.
//!
//! The reader only needs to know which cell formats display a date or a time
//! of day, so numbers under those formats can be read as [`CellValue::DateTime`]
//! or [`CellValue::Time`] instead of bare serials.

use crate::grid_parser::{GridParseError, get_attr_value};
use crate::workbook::CellValue;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Which epoch a workbook's date serials count from (`workbookPr/@date1904`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateSystem {
    #[default]
    Excel1900,
    Excel1904,
}

impl DateSystem {
    fn epoch(self) -> Option<NaiveDateTime> {
        let date = match self {
            DateSystem::Excel1900 => NaiveDate::from_ymd_opt(1899, 12, 30),
            DateSystem::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1),
        }?;
        date.and_hms_opt(0, 0, 0)
    }
}

/// Per-workbook formatting needed to type cell values.
#[derive(Debug, Clone, Default)]
pub struct CellStyles {
    /// Indexed by a cell's `s` attribute.
    date_styles: Vec<bool>,
    pub date_system: DateSystem,
}

impl CellStyles {
    pub fn with_date_system(mut self, date_system: DateSystem) -> CellStyles {
        self.date_system = date_system;
        self
    }

    /// Whether the cell format at `index` shows a date or time of day.
    pub fn is_date_style(&self, index: usize) -> bool {
        self.date_styles.get(index).copied().unwrap_or(false)
    }
}

/// Read `numFmts` and `cellXfs` from `xl/styles.xml`.
pub fn parse_styles(xml: &[u8]) -> Result<CellStyles, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut xf_formats: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"numFmt" => {
                let id = get_attr_value(&e, b"numFmtId")?.and_then(|v| v.trim().parse::<u32>().ok());
                let code = get_attr_value(&e, b"formatCode")?;
                if let (Some(id), Some(code)) = (id, code) {
                    custom_formats.insert(id, code);
                }
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if in_cell_xfs && e.name().as_ref() == b"xf" =>
            {
                let id = get_attr_value(&e, b"numFmtId")?
                    .and_then(|v| v.trim().parse::<u32>().ok())
                    .unwrap_or(0);
                xf_formats.push(id);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GridParseError::XmlError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let date_styles = xf_formats
        .iter()
        .map(|id| match custom_formats.get(id) {
            Some(code) => is_date_format_code(code),
            None => is_builtin_date_format(*id),
        })
        .collect();

    Ok(CellStyles {
        date_styles,
        date_system: DateSystem::default(),
    })
}

/// Built-in format ids that show dates or times, including the East Asian
/// locale ranges. Id 46 (`[h]:mm:ss`) is an elapsed duration and stays numeric.
fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45 | 47 | 50..=58)
}

/// Whether a custom format code shows a date or time of day.
///
/// Only the first section counts. Quoted literals, escaped characters and
/// bracketed tags are skipped, and an elapsed-time tag such as `[h]` makes
/// the format a duration.
pub fn is_date_format_code(code: &str) -> bool {
    let mut chars = code.chars();
    while let Some(ch) = chars.next() {
        match ch {
            ';' => return false,
            '\\' | '_' | '*' => {
                chars.next();
            }
            '"' => {
                for quoted in chars.by_ref() {
                    if quoted == '"' {
                        break;
                    }
                }
            }
            '[' => {
                let tag: String = chars.by_ref().take_while(|&c| c != ']').collect();
                if !tag.is_empty()
                    && tag
                        .chars()
                        .all(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's'))
                {
                    return false;
                }
            }
            'd' | 'm' | 'y' | 'h' | 's' | 'D' | 'M' | 'Y' | 'H' | 'S' => return true,
            _ => {}
        }
    }
    false
}

/// Read a date-formatted serial.
///
/// Serials in `[0, 1)` are a time of day; everything else is a date-time
/// rounded to the millisecond. In the 1900 system serials below 60 move one
/// day forward to skip Excel's nonexistent 1900-02-29. `None` when the serial
/// is out of range.
pub(crate) fn serial_to_cell_value(serial: f64, date_system: DateSystem) -> Option<CellValue> {
    if !serial.is_finite() {
        return None;
    }

    let mut days = serial.floor();
    let millis = ((serial - days) * MILLIS_PER_DAY).round();

    if (0.0..1.0).contains(&serial) && millis < MILLIS_PER_DAY {
        let millis = millis as u32;
        return NaiveTime::from_num_seconds_from_midnight_opt(
            millis / 1_000,
            (millis % 1_000) * 1_000_000,
        )
        .map(CellValue::Time);
    }

    if date_system == DateSystem::Excel1900 && serial > 0.0 && serial < 60.0 {
        days += 1.0;
    }

    let offset = TimeDelta::try_days(days as i64)?
        .checked_add(&TimeDelta::try_milliseconds(millis as i64)?)?;
    date_system
        .epoch()?
        .checked_add_signed(offset)
        .map(CellValue::DateTime)
}

/// Read an ISO 8601 value from a `t="d"` cell.
pub(crate) fn iso_to_cell_value(text: &str) -> Option<CellValue> {
    let text = text.trim().trim_end_matches('Z');
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(CellValue::DateTime(dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(CellValue::DateTime);
    }
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .ok()
        .map(CellValue::Time)
}
