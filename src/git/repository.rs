//! Repository discovery and rev-parse queries using git CLI

use color_eyre::eyre::{Context, Result, eyre};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Run `git rev-parse <flag>` in `dir` and return its trimmed stdout.
///
/// Stderr is discarded; a spawn failure or non-zero exit is an error.
pub fn rev_parse(dir: &Path, flag: &str) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", flag])
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run git rev-parse {} in: {}", flag, dir.display()))?;

    if !output.status.success() {
        return Err(eyre!(
            "git rev-parse {} failed in '{}' (exit code: {})",
            flag,
            dir.display(),
            output.status.code().unwrap_or(-1)
        ));
    }

    let stdout = String::from_utf8(output.stdout)
        .with_context(|| format!("git rev-parse {} returned non UTF-8 output", flag))?;

    Ok(stdout.trim_end().to_string())
}

/// Wrapper around a git repository (uses git CLI)
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Discover the repository (or linked worktree) enclosing the given path
    pub fn discover(path: &Path) -> Result<Self> {
        let root = rev_parse(path, "--show-toplevel").map_err(|e| {
            eyre!(
                "Could not find a git repository in '{}' or in any of its parents.\n{}",
                path.display(),
                e
            )
        })?;
        let root = PathBuf::from(root);

        debug!("Discovered git repository at: {}", root.display());

        Ok(Self { root })
    }

    /// Get the worktree root path
    pub fn root(&self) -> &Path {
        &self.root
    }
}
