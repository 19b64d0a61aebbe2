use anyhow::{Context, Result};
use excel_rowdiff::{Workbook, open_workbook};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

pub fn run(path: &Path) -> Result<ExitCode> {
    let workbook = open_workbook(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_info(&mut handle, path, &workbook)?;

    Ok(ExitCode::from(0))
}

/// Stable, line-oriented description of a workbook, usable as a git
/// textconv filter.
fn write_info<W: Write>(w: &mut W, path: &Path, workbook: &Workbook) -> Result<()> {
    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());

    writeln!(w, "Workbook: {}", filename)?;
    writeln!(w, "Sheets: {}", workbook.sheets.len())?;

    for sheet in workbook.sheets.values() {
        writeln!(
            w,
            "  - \"{}\" {} rows x {} columns",
            sheet.name,
            sheet.rows.len(),
            sheet.max_columns()
        )?;
        for row in &sheet.rows {
            writeln!(w, "    {}: {}", row.number, row.joined("|"))?;
        }
    }

    Ok(())
}
