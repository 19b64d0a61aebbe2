use anyhow::Result;
use excel_rowdiff::{WorkbookDiff, write_diff_json};
use std::io::Write;

pub fn write_json_report<W: Write>(w: &mut W, diff: &WorkbookDiff) -> Result<()> {
    write_diff_json(w, diff, true)?;
    Ok(())
}
