//! Git operations module using the git CLI
//!
//! Provides functionality for:
//! - Resolving the identity of the worktree enclosing a path
//! - Discovering repositories
//! - Listing the worktrees of a repository

mod identity;
mod repository;
mod worktree;

pub use identity::*;
pub use repository::*;
pub use worktree::*;
