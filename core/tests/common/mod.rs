//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use excel_rowdiff::{CellValue, Sheet, Workbook, address_to_index, index_to_address};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;

pub fn sheet(name: &str, rows: &[&[&str]]) -> Sheet {
    Sheet::from_cells(
        name,
        rows.iter()
            .map(|r| r.iter().map(|c| CellValue::from(*c)).collect())
            .collect(),
    )
}

pub fn workbook(source: &str, sheets: Vec<Sheet>) -> Workbook {
    sheets
        .into_iter()
        .fold(Workbook::new(source), |wb, sheet| wb.with_sheet(sheet))
}

/// Build an `.xlsx` package in memory.
///
/// Cell text is typed the way a user would type it into Excel: numbers
/// become numeric cells, `TRUE`/`FALSE` become booleans, the empty string
/// leaves the cell out, and anything else is an inline string.
pub fn xlsx_bytes(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
    let options = SimpleFileOptions::default();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    let mut put = |name: &str, body: String| {
        writer.start_file(name, options).expect("start part");
        writer.write_all(body.as_bytes()).expect("write part");
    };

    put(
        "[Content_Types].xml",
        r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
    );

    let sheet_entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, (name, _))| {
            format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(name),
                i + 1,
                i + 1
            )
        })
        .collect();
    put(
        "xl/workbook.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_entries}</sheets></workbook>"#
        ),
    );

    let rels: String = (1..=sheets.len())
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            )
        })
        .collect();
    put(
        "xl/_rels/workbook.xml.rels",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        ),
    );

    for (i, (_, rows)) in sheets.iter().enumerate() {
        put(&format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(rows));
    }

    writer.finish().expect("finish zip").into_inner()
}

pub fn write_xlsx(path: &Path, sheets: &[(&str, &[&[&str]])]) {
    std::fs::write(path, xlsx_bytes(sheets)).expect("write xlsx");
}

fn sheet_xml(rows: &[&[&str]]) -> String {
    let mut body = String::new();
    for (r, row) in rows.iter().enumerate() {
        body.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, text) in row.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let address = index_to_address(r as u32, c as u32);
            debug_assert_eq!(address_to_index(&address), Some((r as u32, c as u32)));
            let cell = match *text {
                "TRUE" => format!(r#"<c r="{address}" t="b"><v>1</v></c>"#),
                "FALSE" => format!(r#"<c r="{address}" t="b"><v>0</v></c>"#),
                t if t.parse::<f64>().is_ok() => format!(r#"<c r="{address}"><v>{t}</v></c>"#),
                t => format!(
                    r#"<c r="{address}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    escape(t)
                ),
            };
            body.push_str(&cell);
        }
        body.push_str("</row>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{body}</sheetData></worksheet>"#
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
