//! Worktree identity resolution
//!
//! Every linked worktree has its own git directory (usually
//! `<main>/.git/worktrees/<name>`), so pairing the top-level directory with the
//! absolute git directory tells sibling worktrees of one repository apart.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::rev_parse;

/// Joins the top-level directory and the git directory in an identity
pub const IDENTITY_SEPARATOR: &str = "::";

/// Stable identifier of a (repository, worktree) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorktreeIdentity(String);

impl WorktreeIdentity {
    /// Resolve the identity of the worktree enclosing `path`.
    ///
    /// Never fails: when git metadata is unavailable the canonical path itself
    /// is the identity.
    pub fn resolve(path: &Path) -> Self {
        let real_path = canonicalize_or_original(path);

        match query_git_dirs(&real_path) {
            Some((top_level, git_dir)) => Self(format!(
                "{}{}{}",
                canonicalize_or_original(&top_level).display(),
                IDENTITY_SEPARATOR,
                canonicalize_or_original(&git_dir).display()
            )),
            None => Self(real_path.display().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identity came from git metadata rather than the bare path
    pub fn is_git_backed(&self) -> bool {
        self.0.contains(IDENTITY_SEPARATOR)
    }
}

impl fmt::Display for WorktreeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn query_git_dirs(dir: &Path) -> Option<(PathBuf, PathBuf)> {
    let top_level = rev_parse(dir, "--show-toplevel");
    let git_dir = rev_parse(dir, "--absolute-git-dir");

    match (top_level, git_dir) {
        (Ok(top_level), Ok(git_dir)) => Some((PathBuf::from(top_level), PathBuf::from(git_dir))),
        (Err(e), _) | (_, Err(e)) => {
            debug!("Falling back to path identity for {}: {}", dir.display(), e);
            None
        }
    }
}

/// Resolve symlinks, keeping the original path when that fails
pub fn canonicalize_or_original(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
