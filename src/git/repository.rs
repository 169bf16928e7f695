use git2::Repository;
use log::debug;
use std::path::{Path, PathBuf};

use super::store::Git2Store;
use crate::error::{LastChangesError, Result};

#[derive(Debug, Clone, Default)]
pub struct LocatorOptions {
    /// Accept repositories without a working tree.
    pub allow_bare: bool,
}

/// An open, validated repository. Consumed by the diff engine.
pub struct RepoHandle {
    repo: Repository,
    location: PathBuf,
}

impl RepoHandle {
    /// Open the repository at exactly `path`; parent directories are not
    /// searched. Accepts a working tree or its `.git` directory.
    pub fn open(path: &str, options: &LocatorOptions) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(LastChangesError::InvalidArgument(
                "Git repository path cannot be empty.".to_string(),
            ));
        }

        let location = PathBuf::from(path);
        if !location.exists() {
            return Err(LastChangesError::NotFound { path: location });
        }

        let repo = Repository::open(&location).map_err(|e| LastChangesError::InvalidRepository {
            path: location.clone(),
            reason: e.message().to_string(),
        })?;

        if repo.is_bare() && !options.allow_bare {
            return Err(LastChangesError::InvalidRepository {
                path: location,
                reason: "bare repositories are not supported".to_string(),
            });
        }

        debug!("Opened git repository at {}", repo.path().display());
        Ok(Self { repo, location })
    }

    /// The path the handle was opened from.
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    pub fn store(&self) -> Git2Store<'_> {
        Git2Store::new(&self.repo)
    }
}
