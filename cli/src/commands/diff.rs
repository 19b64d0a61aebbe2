use crate::output::{csv, json, text};
use crate::{DiffArgs, OutputFormat};
use anyhow::{Context, Result, bail};
use excel_rowdiff::{
    DiffConfig, GitRepo, MatchStrategy, Workbook, WorkbookDiff, diff_single_sheet, diff_workbooks,
    open_workbook,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

const CONFIG_ENV: &str = "EXCEL_ROWDIFF_CONFIG";

pub fn run(args: DiffArgs) -> Result<ExitCode> {
    let direct = args.old.is_some() || args.new.is_some();
    let git_mode = args.from.is_some() || args.working_tree;
    if direct && git_mode {
        bail!("Cannot use --old/--new with Git options (--from/--to/--working-tree)");
    }

    let config = build_config(
        std::env::var_os(CONFIG_ENV).as_deref().map(Path::new),
        args.threshold,
        args.optimal,
    )?;

    let (old, new) = if direct {
        let (Some(old_path), Some(new_path)) = (&args.old, &args.new) else {
            bail!("Direct comparison requires both --old and --new");
        };
        let old = open_workbook(old_path)
            .with_context(|| format!("Failed to open old workbook: {}", old_path.display()))?;
        let new = open_workbook(new_path)
            .with_context(|| format!("Failed to open new workbook: {}", new_path.display()))?;
        (old, new)
    } else {
        let Some(file) = args.file.as_deref() else {
            bail!("A workbook path is required for git comparisons (or use --old/--new)");
        };
        load_from_git(file, &args)?
    };

    let diff = match &args.sheet {
        Some(name) => diff_single_sheet(&old, &new, name, &config)?,
        None => diff_workbooks(&old, &new, &config),
    };
    let summary = diff.summary();
    log::info!(
        "{} -> {}: {} sheet changes, {} row changes",
        diff.old_source,
        diff.new_source,
        diff.sheet_changes.len(),
        summary.total_rows()
    );

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            render(&mut writer, &diff, args.format)?;
            writer.flush()?;
            eprintln!("Diff written to: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            render(&mut handle, &diff, args.format)?;
            handle.flush()?;
        }
    }

    Ok(exit_code_from_diff(&diff))
}

fn load_from_git(file: &Path, args: &DiffArgs) -> Result<(Workbook, Workbook)> {
    let repo = GitRepo::discover(file)?;
    let pair = if args.working_tree {
        let rev = args.from.as_deref().unwrap_or("HEAD");
        log::info!("comparing {} at {} with the working tree", file.display(), rev);
        repo.compare_with_working_tree(file, rev)?
    } else {
        repo.compare_revisions(file, args.from.as_deref(), &args.to)?
    };
    Ok(pair)
}

/// Defaults, then the JSON config file if one is named, then flags.
fn build_config(
    config_path: Option<&Path>,
    threshold: Option<f64>,
    optimal: bool,
) -> Result<DiffConfig> {
    let mut config = match config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            DiffConfig::from_json(&json)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => DiffConfig::default(),
    };

    if let Some(threshold) = threshold {
        config.similarity_threshold = threshold;
    }
    if optimal {
        config.match_strategy = MatchStrategy::Optimal;
    }
    config.validate()?;
    Ok(config)
}

fn render<W: Write>(w: &mut W, diff: &WorkbookDiff, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => text::write_text_report(w, diff),
        OutputFormat::Csv => csv::write_csv_report(w, diff),
        OutputFormat::Json => json::write_json_report(w, diff),
    }
}

fn exit_code_from_diff(diff: &WorkbookDiff) -> ExitCode {
    if diff.is_empty() {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}
