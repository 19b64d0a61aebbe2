mod commands;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use excel_rowdiff::{ContainerError, DiffError, GitError, GridParseError, PackageError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "excel-rowdiff")]
#[command(about = "Row- and cell-level diffs of Excel workbooks, directly or across git revisions")]
#[command(version)]
pub struct Cli {
    #[arg(long, short, action = clap::ArgAction::Count, global = true, help = "Increase log verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Compare two versions of a workbook")]
    Diff(DiffArgs),
    #[command(about = "Show information about a workbook")]
    Info {
        #[arg(help = "Path to the workbook")]
        path: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct DiffArgs {
    #[arg(help = "Workbook tracked in git (required unless --old/--new are given)")]
    pub file: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Old workbook for direct comparison (cannot be used with git options)")]
    pub old: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "New workbook for direct comparison (cannot be used with git options)")]
    pub new: Option<PathBuf>,
    #[arg(long = "from", value_name = "REV", help = "Git revision to compare from (default: parent of --to)")]
    pub from: Option<String>,
    #[arg(long = "to", value_name = "REV", default_value = "HEAD", help = "Git revision to compare to")]
    pub to: String,
    #[arg(long, help = "Compare a revision (--from, default HEAD) with the file on disk")]
    pub working_tree: bool,
    #[arg(long, value_enum, default_value = "text", help = "Output format")]
    pub format: OutputFormat,
    #[arg(long, short, value_name = "PATH", help = "Write the diff to a file instead of stdout")]
    pub output: Option<PathBuf>,
    #[arg(long, value_name = "NAME", help = "Only diff this sheet")]
    pub sheet: Option<String>,
    #[arg(long, value_name = "F", help = "Similarity threshold for pairing rows as modified (0 < F <= 1)")]
    pub threshold: Option<f64>,
    #[arg(long, help = "Pair rows by maximum total similarity instead of first-come order")]
    pub optimal: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Diff(args) => commands::diff::run(args),
        Commands::Info { path } => commands::info::run(&path),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for_error(&e)
        }
    }
}

fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    if is_internal_error(err) {
        ExitCode::from(3)
    } else {
        ExitCode::from(2)
    }
}

/// Failures while reading workbook contents are internal; bad arguments,
/// missing files, and git lookups are input errors.
fn is_internal_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(diff_err) = cause.downcast_ref::<DiffError>() {
            return !matches!(
                diff_err,
                DiffError::SheetNotFound { .. } | DiffError::InvalidConfig(_)
            );
        }
        if let Some(git_err) = cause.downcast_ref::<GitError>() {
            return match git_err {
                GitError::Package(package_err) => is_internal_package_error(package_err),
                GitError::UnexpectedOutput(_) => true,
                _ => false,
            };
        }
        if let Some(container_err) = cause.downcast_ref::<ContainerError>() {
            return !matches!(container_err, ContainerError::Io(_));
        }
        if let Some(package_err) = cause.downcast_ref::<PackageError>() {
            return is_internal_package_error(package_err);
        }
        cause.is::<GridParseError>()
    })
}

/// A workbook that cannot be read from disk is an input error wherever it
/// was requested; anything wrong with its contents is internal.
fn is_internal_package_error(err: &PackageError) -> bool {
    !matches!(err, PackageError::Container(ContainerError::Io(_)))
}
