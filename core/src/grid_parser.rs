//! XML parsing for SpreadsheetML parts.
//!
//! Handles worksheet XML, shared strings, workbook structure, and relationship
//! files, producing the dense [`Row`] sequences the differ compares.

use crate::addressing::address_to_index;
use crate::styles::{CellStyles, DateSystem, iso_to_cell_value, serial_to_cell_value};
use crate::workbook::{CellValue, Row};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Upper bound on `rows x columns` of a materialized sheet.
const MAX_DENSE_CELLS: u64 = 50_000_000;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GridParseError {
    #[error("[EXROW_XML_001] XML parse error: {0}")]
    XmlError(String),
    #[error("[EXROW_XML_002] invalid cell address: {0}")]
    InvalidAddress(String),
    #[error("[EXROW_XML_003] shared string index {0} out of bounds")]
    SharedStringOutOfBounds(usize),
    #[error("[EXROW_XML_004] sheet is too large to materialize: {rows} rows x {cols} columns")]
    SheetTooLarge { rows: u64, cols: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDescriptor {
    pub name: String,
    pub rel_id: Option<String>,
    pub sheet_id: Option<u32>,
}

pub fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"si" => {
                strings.push(read_string_item(&mut reader, b"si")?);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(GridParseError::XmlError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

pub fn parse_workbook_xml(xml: &[u8]) -> Result<Vec<SheetDescriptor>, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"sheet" => {
                let name = get_attr_value(&e, b"name")?;
                let rel_id = get_attr_value(&e, b"r:id")?;
                let sheet_id = get_attr_value(&e, b"sheetId")?.and_then(|v| v.parse::<u32>().ok());
                if let Some(name) = name {
                    sheets.push(SheetDescriptor {
                        name,
                        rel_id,
                        sheet_id,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GridParseError::XmlError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Read the date epoch from `workbookPr/@date1904`.
pub fn parse_date_system(xml: &[u8]) -> Result<DateSystem, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"workbookPr" => {
                let date1904 = get_attr_value(&e, b"date1904")?;
                return Ok(match date1904.as_deref().map(str::trim) {
                    Some("1") | Some("true") => DateSystem::Excel1904,
                    _ => DateSystem::Excel1900,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GridParseError::XmlError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(DateSystem::Excel1900)
}

/// Map relationship ids to worksheet part targets.
pub fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                let id = get_attr_value(&e, b"Id")?;
                let target = get_attr_value(&e, b"Target")?;
                let rel_type = get_attr_value(&e, b"Type")?;

                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type)
                    && rel_type.ends_with("/worksheet")
                {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GridParseError::XmlError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(map)
}

pub fn resolve_sheet_target(
    sheet: &SheetDescriptor,
    relationships: &HashMap<String, String>,
    index: usize,
) -> String {
    if let Some(rel_id) = &sheet.rel_id
        && let Some(target) = relationships.get(rel_id)
    {
        return normalize_target(target);
    }

    let guessed = sheet
        .sheet_id
        .map(|id| format!("xl/worksheets/sheet{id}.xml"))
        .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));
    normalize_target(&guessed)
}

fn normalize_target(target: &str) -> String {
    let trimmed = target.trim_start_matches('/');
    if trimmed.starts_with("xl/") {
        trimmed.to_string()
    } else {
        format!("xl/{trimmed}")
    }
}

/// Parse worksheet XML into rows.
///
/// Rows run from row 1 to the last row holding a cell element, and every row
/// is padded with [`CellValue::Absent`] to the sheet's used width (column A to
/// the rightmost cell element). A sheet without cells has no rows. Numbers
/// whose cell format shows a date or time are read through `styles`.
pub fn parse_sheet_xml(
    xml: &[u8],
    shared_strings: &[String],
    styles: &CellStyles,
) -> Result<Vec<Row>, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut cells: BTreeMap<u32, Vec<(u32, CellValue)>> = BTreeMap::new();
    let mut current_row: Option<u32> = None;
    let mut next_col: u32 = 0;
    let mut max_row: Option<u32> = None;
    let mut max_col: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"row" => {
                let row = match get_attr_value(&e, b"r")? {
                    Some(r) => r
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .and_then(|r| r.checked_sub(1))
                        .ok_or_else(|| GridParseError::InvalidAddress(r.clone()))?,
                    None => current_row.map_or(0, |r| r + 1),
                };
                current_row = Some(row);
                next_col = 0;
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"c" => {
                let (row, col, value) =
                    parse_cell(&mut reader, &e, current_row, next_col, shared_strings, styles, true)?;
                record_cell(&mut cells, &mut max_row, &mut max_col, row, col, value);
                next_col = col.saturating_add(1);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                let (row, col, value) =
                    parse_cell(&mut reader, &e, current_row, next_col, shared_strings, styles, false)?;
                record_cell(&mut cells, &mut max_row, &mut max_col, row, col, value);
                next_col = col.saturating_add(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GridParseError::XmlError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let (Some(max_row), Some(max_col)) = (max_row, max_col) else {
        return Ok(Vec::new());
    };

    let nrows = u64::from(max_row) + 1;
    let ncols = u64::from(max_col) + 1;
    if nrows.saturating_mul(ncols) > MAX_DENSE_CELLS {
        return Err(GridParseError::SheetTooLarge {
            rows: nrows,
            cols: ncols,
        });
    }

    let width = ncols as usize;
    let mut rows = Vec::with_capacity(nrows as usize);
    for row_idx in 0..=max_row {
        let mut values = vec![CellValue::Absent; width];
        if let Some(row_cells) = cells.remove(&row_idx) {
            for (col, value) in row_cells {
                values[col as usize] = value;
            }
        }
        rows.push(Row::new(row_idx + 1, values));
    }

    Ok(rows)
}

fn record_cell(
    cells: &mut BTreeMap<u32, Vec<(u32, CellValue)>>,
    max_row: &mut Option<u32>,
    max_col: &mut Option<u32>,
    row: u32,
    col: u32,
    value: CellValue,
) {
    *max_row = Some(max_row.map_or(row, |r| r.max(row)));
    *max_col = Some(max_col.map_or(col, |c| c.max(col)));
    cells.entry(row).or_default().push((col, value));
}

fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    current_row: Option<u32>,
    next_col: u32,
    shared_strings: &[String],
    styles: &CellStyles,
    has_body: bool,
) -> Result<(u32, u32, CellValue), GridParseError> {
    let (row, col) = match get_attr_value(start, b"r")? {
        Some(address) => address_to_index(&address)
            .ok_or_else(|| GridParseError::InvalidAddress(address.clone()))?,
        None => (current_row.unwrap_or(0), next_col),
    };

    let cell_type = get_attr_value(start, b"t")?;
    let is_date = get_attr_value(start, b"s")?
        .and_then(|s| s.trim().parse::<usize>().ok())
        .is_some_and(|idx| styles.is_date_style(idx));

    let mut value_text: Option<String> = None;
    let mut inline_text: Option<String> = None;

    if has_body {
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.name().as_ref() == b"v" => {
                    value_text = Some(read_text_until(reader, b"v")?);
                }
                Ok(Event::Start(e)) if e.name().as_ref() == b"is" => {
                    inline_text = Some(read_string_item(reader, b"is")?);
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"c" => break,
                Ok(Event::Eof) => {
                    return Err(GridParseError::XmlError(
                        "unexpected EOF inside cell".into(),
                    ));
                }
                Err(e) => return Err(GridParseError::XmlError(e.to_string())),
                _ => {}
            }
            buf.clear();
        }
    }

    let value = match inline_text {
        Some(text) => CellValue::Text(text),
        None => {
            let value = convert_value(value_text.as_deref(), cell_type.as_deref(), shared_strings)?;
            match value {
                CellValue::Number(serial) if is_date => {
                    serial_to_cell_value(serial, styles.date_system)
                        .unwrap_or(CellValue::Number(serial))
                }
                other => other,
            }
        }
    };

    Ok((row, col, value))
}

/// Concatenate the `<t>` runs of a string item (`<si>` or `<is>`), skipping
/// phonetic `<rPh>` runs.
fn read_string_item(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, GridParseError> {
    let mut buf = Vec::new();
    let mut value = String::new();
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"rPh" => phonetic_depth += 1,
            Ok(Event::End(e)) if e.name().as_ref() == b"rPh" => {
                phonetic_depth = phonetic_depth.saturating_sub(1)
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"t" => {
                let text = read_text_until(reader, b"t")?;
                if phonetic_depth == 0 {
                    value.push_str(&text);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == end => break,
            Ok(Event::Eof) => {
                return Err(GridParseError::XmlError(
                    "unexpected EOF inside string item".into(),
                ));
            }
            Err(e) => return Err(GridParseError::XmlError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(value)
}

/// Read unescaped text up to the closing tag `end`.
fn read_text_until(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, GridParseError> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(e)) => {
                text.push_str(&e.unescape().map_err(to_xml_err)?);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(e)) if e.name().as_ref() == end => break,
            Ok(Event::Eof) => {
                return Err(GridParseError::XmlError(format!(
                    "unexpected EOF inside <{}>",
                    String::from_utf8_lossy(end)
                )));
            }
            Err(e) => return Err(GridParseError::XmlError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Turn a cell's cached `<v>` text into a value according to its `t` attribute.
fn convert_value(
    value_text: Option<&str>,
    cell_type: Option<&str>,
    shared_strings: &[String],
) -> Result<CellValue, GridParseError> {
    let Some(raw) = value_text else {
        return Ok(CellValue::Absent);
    };

    let trimmed = raw.trim();
    match cell_type {
        Some("s") => {
            let idx = trimmed
                .parse::<usize>()
                .map_err(|e| GridParseError::XmlError(e.to_string()))?;
            let text = shared_strings
                .get(idx)
                .ok_or(GridParseError::SharedStringOutOfBounds(idx))?;
            Ok(CellValue::Text(text.clone()))
        }
        Some("b") => Ok(match trimmed {
            "1" | "true" => CellValue::Bool(true),
            "0" | "false" => CellValue::Bool(false),
            _ => CellValue::Text(raw.to_string()),
        }),
        Some("d") => {
            Ok(iso_to_cell_value(raw).unwrap_or_else(|| CellValue::Text(raw.to_string())))
        }
        Some("str") | Some("inlineStr") | Some("e") => Ok(CellValue::Text(raw.to_string())),
        _ => {
            if trimmed.is_empty() {
                Ok(CellValue::Absent)
            } else if let Ok(n) = trimmed.parse::<f64>() {
                Ok(CellValue::Number(n))
            } else {
                Ok(CellValue::Text(raw.to_string()))
            }
        }
    }
}

pub(crate) fn get_attr_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, GridParseError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| GridParseError::XmlError(e.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value().map_err(to_xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

fn to_xml_err(err: quick_xml::Error) -> GridParseError {
    GridParseError::XmlError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(row: &Row) -> Vec<String> {
        row.cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn shared_strings_flatten_rich_text_and_skip_phonetics() {
        let xml = br#"<?xml version="1.0"?>
<sst>
  <si><t>plain &amp; simple</t></si>
  <si>
    <r><t>Hello</t></r>
    <r><t xml:space="preserve"> World</t></r>
    <rPh sb="0" eb="1"><t>HAROO</t></rPh>
  </si>
  <si/>
</sst>"#;
        let strings = parse_shared_strings(xml).expect("shared strings should parse");
        assert_eq!(strings, vec!["plain & simple", "Hello World", ""]);
    }

    #[test]
    fn workbook_and_relationships_resolve_targets() {
        let workbook = br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="Other &amp; More" sheetId="7"/>
  </sheets>
</workbook>"#;
        let rels = br#"<Relationships>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/>
  <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

        let sheets = parse_workbook_xml(workbook).expect("workbook parses");
        let rels = parse_relationships(rels).expect("rels parse");
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1].name, "Other & More");
        assert_eq!(rels.len(), 1);
        assert_eq!(resolve_sheet_target(&sheets[0], &rels, 0), "xl/worksheets/data.xml");
        assert_eq!(resolve_sheet_target(&sheets[1], &rels, 1), "xl/worksheets/sheet7.xml");
    }

    #[test]
    fn sheet_rows_are_dense_and_padded_to_sheet_width() {
        let xml = br#"<worksheet><sheetData>
  <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1"><v>3.5</v></c></row>
  <row r="3"><c r="B3" t="b"><v>1</v></c></row>
</sheetData></worksheet>"#;
        let shared = vec!["name".to_string()];
        let rows = parse_sheet_xml(xml, &shared, &CellStyles::default()).expect("sheet parses");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].number, 1);
        assert_eq!(
            rows[0].cells,
            vec![CellValue::Text("name".into()), CellValue::Absent, CellValue::Number(3.5)]
        );
        assert_eq!(rows[1].cells, vec![CellValue::Absent; 3]);
        assert_eq!(rows[2].number, 3);
        assert_eq!(
            rows[2].cells,
            vec![CellValue::Absent, CellValue::Bool(true), CellValue::Absent]
        );
    }

    #[test]
    fn cached_values_win_over_formulas() {
        let xml = br#"<worksheet><sheetData>
  <row r="1">
    <c r="A1"><f>1+1</f><v>2</v></c>
    <c r="B1" t="str"><f>"a"&amp;"b"</f><v>ab</v></c>
    <c r="C1" t="e"><f>1/0</f><v>#DIV/0!</v></c>
    <c r="D1"><f>NOW()</f></c>
  </row>
</sheetData></worksheet>"#;
        let rows = parse_sheet_xml(xml, &[], &CellStyles::default()).expect("sheet parses");
        assert_eq!(texts(&rows[0]), vec!["2", "ab", "#DIV/0!", ""]);
        assert_eq!(rows[0].cells[3], CellValue::Absent);
    }

    #[test]
    fn inline_strings_and_missing_addresses() {
        let xml = br#"<worksheet><sheetData>
  <row><c t="inlineStr"><is><t xml:space="preserve"> hi </t></is></c><c><v>4</v></c></row>
  <row><c/><c t="inlineStr"><is><r><t>x</t></r><r><t>y</t></r></is></c></row>
</sheetData></worksheet>"#;
        let rows = parse_sheet_xml(xml, &[], &CellStyles::default()).expect("sheet parses");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, vec![CellValue::Text(" hi ".into()), CellValue::Number(4.0)]);
        assert_eq!(rows[1].cells, vec![CellValue::Absent, CellValue::Text("xy".into())]);
    }

    #[test]
    fn date_styled_numbers_become_dates() {
        let styles = crate::styles::parse_styles(
            br#"<styleSheet><cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="14"/><xf numFmtId="20"/></cellXfs></styleSheet>"#,
        )
        .expect("styles parse");
        let xml = br#"<worksheet><sheetData>
  <row r="1">
    <c r="A1" s="1"><v>45292</v></c>
    <c r="B1" s="0"><v>45292</v></c>
    <c r="C1" s="2"><v>0.25</v></c>
    <c r="D1" s="1" t="s"><v>0</v></c>
    <c r="E1" t="d"><v>2024-02-29T10:00:00</v></c>
  </row>
</sheetData></worksheet>"#;
        let rows = parse_sheet_xml(xml, &["label".to_string()], &styles).expect("sheet parses");
        assert_eq!(
            texts(&rows[0]),
            vec!["2024-01-01 00:00:00", "45292", "06:00:00", "label", "2024-02-29 10:00:00"]
        );
        assert!(matches!(rows[0].cells[0], CellValue::DateTime(_)));
        assert!(matches!(rows[0].cells[2], CellValue::Time(_)));
    }

    #[test]
    fn date1904_flag_selects_the_epoch() {
        let flagged = br#"<workbook><workbookPr date1904="1"/><sheets/></workbook>"#;
        let plain = br#"<workbook><workbookPr defaultThemeVersion="124226"/><sheets/></workbook>"#;
        assert_eq!(parse_date_system(flagged).expect("parses"), DateSystem::Excel1904);
        assert_eq!(parse_date_system(plain).expect("parses"), DateSystem::Excel1900);
        assert_eq!(parse_date_system(b"<workbook/>").expect("parses"), DateSystem::Excel1900);
    }

    #[test]
    fn empty_sheet_has_no_rows() {
        let xml = br#"<worksheet><sheetData/></worksheet>"#;
        assert!(parse_sheet_xml(xml, &[], &CellStyles::default()).expect("parses").is_empty());
    }

    #[test]
    fn shared_string_index_out_of_bounds_errors() {
        let xml = br#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>5</v></c></row></sheetData></worksheet>"#;
        let err = parse_sheet_xml(xml, &["only".to_string()], &CellStyles::default())
            .expect_err("should fail");
        assert!(matches!(err, GridParseError::SharedStringOutOfBounds(5)));
    }

    #[test]
    fn invalid_cell_address_errors() {
        let xml = br#"<worksheet><sheetData><row r="1"><c r="1A"><v>5</v></c></row></sheetData></worksheet>"#;
        let err = parse_sheet_xml(xml, &[], &CellStyles::default()).expect_err("should fail");
        assert!(matches!(err, GridParseError::InvalidAddress(ref a) if a == "1A"));
    }

    #[test]
    fn oversized_sheet_is_rejected() {
        let xml = br#"<worksheet><sheetData><row r="1048576"><c r="XFD1048576"><v>1</v></c></row></sheetData></worksheet>"#;
        let err = parse_sheet_xml(xml, &[], &CellStyles::default()).expect_err("should fail");
        assert!(matches!(err, GridParseError::SheetTooLarge { .. }));
    }
}
