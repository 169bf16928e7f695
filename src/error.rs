use std::path::PathBuf;

/// Result alias used by the library.
pub type Result<T> = std::result::Result<T, LastChangesError>;

/// Coarse failure category. Callers branch on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    InvalidRepository,
    PrecedingCommitMissing,
    IoFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum LastChangesError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Git repository path not found at location {}.", path.display())]
    NotFound { path: PathBuf },

    #[error("No git repository found at {}: {reason}", path.display())]
    InvalidRepository { path: PathBuf, reason: String },

    #[error(
        "Could not find previous head of repository located at {}. Is this the first commit?",
        location.display()
    )]
    PrecedingCommitMissing { location: PathBuf },

    #[error("Repository located at {} has no commits yet.", location.display())]
    NoCommits { location: PathBuf },

    #[error("Failed to write changes: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    Store(String),
}

impl LastChangesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LastChangesError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LastChangesError::NotFound { .. } => ErrorKind::NotFound,
            LastChangesError::InvalidRepository { .. } => ErrorKind::InvalidRepository,
            LastChangesError::PrecedingCommitMissing { .. } | LastChangesError::NoCommits { .. } => {
                ErrorKind::PrecedingCommitMissing
            }
            LastChangesError::Io(_) | LastChangesError::Store(_) => ErrorKind::IoFailure,
        }
    }
}

impl From<git2::Error> for LastChangesError {
    fn from(err: git2::Error) -> Self {
        LastChangesError::Store(err.message().to_string())
    }
}

impl From<serde_json::Error> for LastChangesError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json only fails here when the underlying writer does
        LastChangesError::Io(std::io::Error::other(err))
    }
}
