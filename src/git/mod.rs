pub mod diff;
pub mod patch;
pub mod repository;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_repo;

pub use diff::{DiffEngine, DiffOptions};
pub use patch::OutputFormat;
pub use repository::{LocatorOptions, RepoHandle};
pub use store::{Git2Store, MemoryStore, ObjectStore};
