//! Worktree listing with per-worktree identities

use color_eyre::eyre::{Context, Result, eyre};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

use super::{Repository, WorktreeIdentity};

/// One worktree of a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    /// Worktree directory as reported by git
    pub path: PathBuf,
    /// Checked out branch, `None` when detached
    pub branch: Option<String>,
    /// HEAD commit
    pub head: String,
    /// The first worktree git reports (or a bare repository)
    pub is_main: bool,
    pub is_locked: bool,
    /// Directory is gone but git still tracks it
    pub is_prunable: bool,
    /// Resolved identity; `None` until resolved and for prunable worktrees
    pub identity: Option<WorktreeIdentity>,
}

impl WorktreeInfo {
    /// Build from one porcelain stanza; `None` if it has no `worktree` line
    fn from_stanza(stanza: &str) -> Option<Self> {
        let mut lines = stanza.lines();
        let path = lines.next()?.strip_prefix("worktree ")?;

        let mut info = Self {
            path: PathBuf::from(path),
            branch: None,
            head: String::new(),
            is_main: false,
            is_locked: false,
            is_prunable: false,
            identity: None,
        };

        for line in lines {
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "HEAD" => info.head = value.to_string(),
                "branch" => {
                    info.branch = Some(value.strip_prefix("refs/heads/").unwrap_or(value).to_string())
                }
                "bare" => info.is_main = true,
                "locked" => info.is_locked = true,
                "prunable" => info.is_prunable = true,
                _ => {}
            }
        }

        Some(info)
    }

    /// Branch name, else the abbreviated HEAD
    pub fn label(&self) -> &str {
        match &self.branch {
            Some(branch) => branch,
            None => self.head.get(..8).unwrap_or("(detached)"),
        }
    }
}

/// Parse `git worktree list --porcelain`; identities are left unresolved
pub fn parse_worktree_list(output: &str) -> Vec<WorktreeInfo> {
    let mut worktrees: Vec<WorktreeInfo> = output
        .split("\n\n")
        .map(str::trim)
        .filter(|stanza| !stanza.is_empty())
        .filter_map(WorktreeInfo::from_stanza)
        .collect();

    if let Some(first) = worktrees.first_mut() {
        first.is_main = true;
    }

    worktrees
}

/// Lists the worktrees of a repository
pub struct WorktreeManager<'a> {
    repo: &'a Repository,
}

impl<'a> WorktreeManager<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// All worktrees, main worktree first, each with its identity resolved
    pub fn list(&self) -> Result<Vec<WorktreeInfo>> {
        let output = Command::new("git")
            .args(["worktree", "list", "--porcelain"])
            .current_dir(self.repo.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| {
                format!("Failed to run git worktree list in: {}", self.repo.root().display())
            })?;

        if !output.status.success() {
            return Err(eyre!(
                "git worktree list failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let mut worktrees = parse_worktree_list(&String::from_utf8_lossy(&output.stdout));
        for wt in worktrees.iter_mut().filter(|wt| !wt.is_prunable) {
            wt.identity = Some(WorktreeIdentity::resolve(&wt.path));
        }

        debug!("Listed {} worktrees", worktrees.len());
        Ok(worktrees)
    }
}
