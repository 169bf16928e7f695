//! Diff the last two commits of a local git repository.
//!
//! ```no_run
//! use last_changes::{DiffEngine, DiffOptions, LocatorOptions, RepoHandle};
//!
//! let repo = RepoHandle::open(".", &LocatorOptions::default())?;
//! let mut out = std::io::stdout();
//! DiffEngine::compute_last_changes(repo, &mut out, &DiffOptions::default())?;
//! # Ok::<(), last_changes::LastChangesError>(())
//! ```

pub mod config;
pub mod error;
pub mod git;

pub use error::{ErrorKind, LastChangesError, Result};
pub use git::{DiffEngine, DiffOptions, LocatorOptions, OutputFormat, RepoHandle};
