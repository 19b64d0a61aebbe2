//! Excel Open XML file parsing.
//!
//! Provides functions for opening `.xlsx` files and reading their worksheets
//! into the [`Workbook`] model used for diffing.

use crate::container::{ContainerError, OpcContainer};
use crate::grid_parser::{
    GridParseError, parse_date_system, parse_relationships, parse_shared_strings, parse_sheet_xml,
    parse_workbook_xml, resolve_sheet_target,
};
use crate::styles::{CellStyles, parse_styles};
use crate::workbook::{Sheet, Workbook};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackageError {
    #[error("container error: {0}")]
    Container(#[from] ContainerError),
    #[error("grid parse error in sheet '{sheet_name}': {source}")]
    GridParse {
        sheet_name: String,
        #[source]
        source: GridParseError,
    },
    #[error("[EXROW_PKG_009] workbook.xml missing or unreadable: {0}")]
    WorkbookXmlMissing(#[source] GridParseError),
    #[error("[EXROW_PKG_010] worksheet XML missing for sheet {sheet_name}")]
    WorksheetXmlMissing { sheet_name: String },
    #[error("[EXROW_PKG_011] duplicate sheet name in workbook: {sheet_name}")]
    DuplicateSheetName { sheet_name: String },
    #[error("[EXROW_PKG_012] failed to parse {part}: {source}")]
    PartParse {
        part: String,
        #[source]
        source: GridParseError,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
}

fn part_error(part: &str) -> impl FnOnce(GridParseError) -> PackageError + '_ {
    move |source| PackageError::PartParse {
        part: part.to_string(),
        source,
    }
}

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

pub(crate) fn open_workbook_from_container(
    container: &mut OpcContainer,
    label: &str,
) -> Result<Workbook, PackageError> {
    let shared_strings = match container.read_file_optional_checked(SHARED_STRINGS_PART)? {
        Some(bytes) => parse_shared_strings(&bytes).map_err(part_error(SHARED_STRINGS_PART))?,
        None => Vec::new(),
    };

    let workbook_bytes = container
        .read_file_optional_checked("xl/workbook.xml")?
        .ok_or_else(|| {
            PackageError::WorkbookXmlMissing(GridParseError::XmlError(
                "xl/workbook.xml not found".into(),
            ))
        })?;
    let sheets = parse_workbook_xml(&workbook_bytes).map_err(PackageError::WorkbookXmlMissing)?;
    let date_system =
        parse_date_system(&workbook_bytes).map_err(PackageError::WorkbookXmlMissing)?;

    let styles = match container.read_file_optional_checked(STYLES_PART)? {
        Some(bytes) => parse_styles(&bytes).map_err(part_error(STYLES_PART))?,
        None => CellStyles::default(),
    }
    .with_date_system(date_system);

    let relationships = match container.read_file_optional_checked(WORKBOOK_RELS_PART)? {
        Some(bytes) => parse_relationships(&bytes).map_err(part_error(WORKBOOK_RELS_PART))?,
        None => HashMap::new(),
    };

    let mut workbook = Workbook::new(label);
    for (idx, sheet) in sheets.iter().enumerate() {
        if workbook.sheet(&sheet.name).is_some() {
            return Err(PackageError::DuplicateSheetName {
                sheet_name: sheet.name.clone(),
            });
        }

        let target = resolve_sheet_target(sheet, &relationships, idx);
        let sheet_bytes = container
            .read_file_optional_checked(&target)?
            .ok_or_else(|| PackageError::WorksheetXmlMissing {
                sheet_name: sheet.name.clone(),
            })?;
        let rows = parse_sheet_xml(&sheet_bytes, &shared_strings, &styles).map_err(|source| {
            PackageError::GridParse {
                sheet_name: sheet.name.clone(),
                source,
            }
        })?;

        log::trace!("read sheet '{}' from {} ({} rows)", sheet.name, target, rows.len());
        workbook.insert_sheet(Sheet::new(sheet.name.clone(), rows));
    }

    log::debug!("opened '{}' with {} sheets", label, workbook.sheets.len());
    Ok(workbook)
}

/// Open an `.xlsx` file from disk. The workbook's source label is the path.
pub fn open_workbook(path: impl AsRef<Path>) -> Result<Workbook, PackageError> {
    let path = path.as_ref();
    let mut container = OpcContainer::open_from_path(path)?;
    open_workbook_from_container(&mut container, &path.display().to_string())
}

/// Open an `.xlsx` package held in memory, such as a blob read from git.
pub fn open_workbook_from_bytes(bytes: Vec<u8>, label: &str) -> Result<Workbook, PackageError> {
    open_workbook_from_reader(Cursor::new(bytes), label)
}

pub fn open_workbook_from_reader<R: Read + Seek + 'static>(
    reader: R,
    label: &str,
) -> Result<Workbook, PackageError> {
    let mut container = OpcContainer::open_from_reader(reader)?;
    open_workbook_from_container(&mut container, label)
}
