//! Reading workbooks out of a git repository.
//!
//! Everything goes through the `git` executable; no repository state is
//! modified.

use crate::excel_open_xml::{PackageError, open_workbook, open_workbook_from_bytes};
use crate::workbook::Workbook;
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GitError {
    #[error("[EXROW_GIT_001] not a git repository: {path}")]
    NotARepository { path: String },
    #[error("[EXROW_GIT_002] unknown revision '{rev}'")]
    UnknownRevision { rev: String },
    #[error("[EXROW_GIT_003] file '{path}' not found in commit '{rev}'")]
    FileNotInRevision { path: String, rev: String },
    #[error("[EXROW_GIT_004] commit '{rev}' has no parent (initial commit)")]
    NoParent { rev: String },
    #[error("[EXROW_GIT_005] failed to run git: {0}")]
    GitUnavailable(#[source] std::io::Error),
    #[error("[EXROW_GIT_006] git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("[EXROW_GIT_007] git produced unexpected output: {0}")]
    UnexpectedOutput(String),
    #[error(transparent)]
    Package(#[from] PackageError),
}

/// Metadata for a single commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    /// First seven hex digits of the commit id.
    pub short_id: String,
    pub id: String,
    pub message: String,
    /// `Name <email>`.
    pub author: String,
    /// Committer date, ISO-8601 with offset.
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Find the repository enclosing `start`, which may be a file or a
    /// directory (existing or not).
    pub fn discover(start: impl AsRef<Path>) -> Result<GitRepo, GitError> {
        let start = start.as_ref();
        let absolute = std::path::absolute(start).map_err(GitError::GitUnavailable)?;
        let dir = absolute
            .ancestors()
            .find(|p| p.is_dir())
            .map(Path::to_path_buf)
            .ok_or_else(|| GitError::NotARepository {
                path: start.display().to_string(),
            })?;

        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(&dir)
            .output()
            .map_err(GitError::GitUnavailable)?;
        if !output.status.success() {
            return Err(GitError::NotARepository {
                path: start.display().to_string(),
            });
        }

        let toplevel = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if toplevel.is_empty() {
            return Err(GitError::UnexpectedOutput("empty --show-toplevel".into()));
        }
        let root = PathBuf::from(&toplevel);
        let root = root.canonicalize().unwrap_or(root);
        log::debug!("discovered git repository at {}", root.display());
        Ok(GitRepo { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `rev` to a full commit id.
    pub fn resolve_revision(&self, rev: &str) -> Result<String, GitError> {
        let spec = format!("{rev}^{{commit}}");
        match self.git(["rev-parse", "--verify", "--quiet", spec.as_str()])? {
            Some(stdout) => Ok(stdout_line(&stdout)?),
            None => Err(GitError::UnknownRevision {
                rev: rev.to_string(),
            }),
        }
    }

    /// Path of `path` relative to the repository root, with forward slashes.
    ///
    /// Relative paths are resolved against the current directory. A path that
    /// cannot be located under the root is taken to be root-relative already.
    pub fn relative_path(&self, path: &Path) -> String {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let located = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|parent| parent.join(name))
                .unwrap_or_else(|_| absolute.clone()),
            _ => absolute.clone(),
        };

        let relative = located
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf());
        to_git_path(&relative)
    }

    /// Raw bytes of `path` as committed in `rev`.
    pub fn file_at_revision(&self, path: &Path, rev: &str) -> Result<Vec<u8>, GitError> {
        let commit = self.resolve_revision(rev)?;
        let git_path = self.relative_path(path);
        let object = format!("{commit}:{git_path}");

        self.git(["cat-file", "blob", object.as_str()])?
            .ok_or_else(|| GitError::FileNotInRevision {
                path: git_path,
                rev: rev.to_string(),
            })
    }

    /// Full id of the first parent of `rev`.
    pub fn parent_revision(&self, rev: &str) -> Result<String, GitError> {
        let commit = self.resolve_revision(rev)?;
        let parent = format!("{commit}^1");
        match self.git(["rev-parse", "--verify", "--quiet", parent.as_str()])? {
            Some(stdout) => Ok(stdout_line(&stdout)?),
            None => Err(GitError::NoParent {
                rev: rev.to_string(),
            }),
        }
    }

    pub fn commit_info(&self, rev: &str) -> Result<CommitInfo, GitError> {
        let commit = self.resolve_revision(rev)?;
        let stdout = self
            .git([
                "show",
                "-s",
                "--format=%H%x00%an <%ae>%x00%cI%x00%B",
                commit.as_str(),
            ])?
            .ok_or_else(|| GitError::UnknownRevision {
                rev: rev.to_string(),
            })?;

        let text = String::from_utf8_lossy(&stdout);
        let mut fields = text.splitn(4, '\0');
        let (Some(id), Some(author), Some(timestamp), Some(message)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(GitError::UnexpectedOutput(text.to_string()));
        };

        let id = id.trim().to_string();
        Ok(CommitInfo {
            short_id: id.chars().take(7).collect(),
            id,
            message: message.trim().to_string(),
            author: author.to_string(),
            timestamp: timestamp.to_string(),
        })
    }

    /// Parse the workbook committed at `rev`, labelled `"<file name> (<rev>)"`.
    pub fn workbook_at_revision(&self, path: &Path, rev: &str) -> Result<Workbook, GitError> {
        let bytes = self.file_at_revision(path, rev)?;
        let label = format!("{} ({rev})", display_name(path));
        Ok(open_workbook_from_bytes(bytes, &label)?)
    }

    /// Workbooks for `path` at `from` and `to`, labelled with short commit
    /// ids. `from` defaults to the first parent of `to`.
    pub fn compare_revisions(
        &self,
        path: &Path,
        from: Option<&str>,
        to: &str,
    ) -> Result<(Workbook, Workbook), GitError> {
        let from = match from {
            Some(rev) => rev.to_string(),
            None => self.parent_revision(to)?,
        };

        let from_info = self.commit_info(&from)?;
        let to_info = self.commit_info(to)?;
        log::debug!(
            "comparing {} at {} -> {}",
            self.relative_path(path),
            from_info.short_id,
            to_info.short_id
        );

        let mut old = self.workbook_at_revision(path, &from_info.id)?;
        let mut new = self.workbook_at_revision(path, &to_info.id)?;
        old.source = format!("{} ({})", display_name(path), from_info.short_id);
        new.source = format!("{} ({})", display_name(path), to_info.short_id);
        Ok((old, new))
    }

    /// The workbook committed at `rev` against the file currently on disk.
    pub fn compare_with_working_tree(
        &self,
        path: &Path,
        rev: &str,
    ) -> Result<(Workbook, Workbook), GitError> {
        let old = self.workbook_at_revision(path, rev)?;
        let mut new = open_workbook(path)?;
        new.source = format!("{} (working tree)", display_name(path));
        Ok((old, new))
    }

    /// Run git in the repository root. `Ok(None)` means git ran and exited
    /// non-zero with nothing on stderr worth surfacing.
    fn git<I, S>(&self, args: I) -> Result<Option<Vec<u8>>, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let output = Command::new("git")
            .args(&args)
            .current_dir(&self.root)
            .output()
            .map_err(GitError::GitUnavailable)?;

        if output.status.success() {
            return Ok(Some(output.stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let command = args
            .iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        log::trace!("git {command} exited with {}: {stderr}", output.status);

        if stderr.contains("not a git repository") {
            return Err(GitError::CommandFailed { command, stderr });
        }
        Ok(None)
    }
}

fn stdout_line(stdout: &[u8]) -> Result<String, GitError> {
    let line = String::from_utf8_lossy(stdout).trim().to_string();
    if line.is_empty() {
        return Err(GitError::UnexpectedOutput("empty output".into()));
    }
    Ok(line)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn to_git_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
