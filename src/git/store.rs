//! Narrow object-store interface the diff engine runs against.
//!
//! [`Git2Store`] reads a real repository through libgit2. [`MemoryStore`]
//! holds a linear history in memory so engine behavior can be exercised
//! without touching disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use git2::{ErrorCode, ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use log::debug;

use super::types::{CommitInfo, FileMode, ObjectId, TreeEntry, TreeSnapshot};
use crate::error::{LastChangesError, Result};

/// Revision expression for the tip tree.
pub const HEAD_TREE: &str = "HEAD^{tree}";
/// Revision expression for the tree of the tip's first parent.
pub const PARENT_TREE: &str = "HEAD~^{tree}";

pub trait ObjectStore {
    /// Where the store lives, used in error messages.
    fn location(&self) -> &Path;

    /// Resolve a revision expression to a tree id. `Ok(None)` when the
    /// revision does not exist.
    fn resolve_tree(&self, revision: &str) -> Result<Option<ObjectId>>;

    /// Every blob, symlink and gitlink reachable from `tree`.
    fn walk_tree(&self, tree: &ObjectId) -> Result<TreeSnapshot>;

    fn read_blob(&self, id: &ObjectId) -> Result<Vec<u8>>;

    /// Commit metadata for a revision expression naming a commit.
    fn commit_info(&self, revision: &str) -> Result<Option<CommitInfo>>;
}

pub struct Git2Store<'repo> {
    repo: &'repo Repository,
    location: PathBuf,
}

impl<'repo> Git2Store<'repo> {
    pub fn new(repo: &'repo Repository) -> Self {
        Self {
            repo,
            location: repo.path().to_path_buf(),
        }
    }

    fn oid(id: &ObjectId) -> Result<Oid> {
        Ok(Oid::from_str(id.as_str())?)
    }
}

fn is_missing(err: &git2::Error) -> bool {
    matches!(err.code(), ErrorCode::NotFound | ErrorCode::UnbornBranch)
}

impl ObjectStore for Git2Store<'_> {
    fn location(&self) -> &Path {
        &self.location
    }

    fn resolve_tree(&self, revision: &str) -> Result<Option<ObjectId>> {
        match self.repo.revparse_single(revision) {
            Ok(obj) => {
                let tree = obj.peel_to_tree()?;
                debug!("Resolved {revision} to tree {}", tree.id());
                Ok(Some(tree.id().into()))
            }
            Err(e) if is_missing(&e) => {
                debug!("Revision {revision} not found: {}", e.message());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn walk_tree(&self, tree: &ObjectId) -> Result<TreeSnapshot> {
        let tree = self.repo.find_tree(Self::oid(tree)?)?;
        let mut entries = Vec::new();

        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if let Some(mode) = FileMode::from_raw(entry.filemode()) {
                let name = String::from_utf8_lossy(entry.name_bytes());
                entries.push(TreeEntry {
                    path: format!("{root}{name}"),
                    id: entry.id().into(),
                    mode,
                });
            }
            TreeWalkResult::Ok
        })?;

        Ok(TreeSnapshot::new(entries))
    }

    fn read_blob(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let blob = self.repo.find_blob(Self::oid(id)?)?;
        Ok(blob.content().to_vec())
    }

    fn commit_info(&self, revision: &str) -> Result<Option<CommitInfo>> {
        let obj = match self.repo.revparse_single(revision) {
            Ok(obj) => obj,
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let commit = obj.peel_to_commit()?;
        Ok(Some(to_commit_info(&commit)))
    }
}

fn to_commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    let committer = commit.committer();
    let id = commit.id().to_string();
    CommitInfo {
        short_id: id.chars().take(8).collect(),
        id,
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        committer_name: String::from_utf8_lossy(committer.name_bytes()).into_owned(),
        committer_email: String::from_utf8_lossy(committer.email_bytes()).into_owned(),
        date: format_time(&committer.when()),
    }
}

/// Render a commit time in the committer's own offset.
fn format_time(time: &git2::Time) -> String {
    FixedOffset::east_opt(time.offset_minutes() * 60)
        .zip(DateTime::from_timestamp(time.seconds(), 0))
        .map(|(tz, utc)| {
            utc.with_timezone(&tz)
                .format("%Y-%m-%d %H:%M:%S %:z")
                .to_string()
        })
        .unwrap_or_default()
}

struct MemoryCommit {
    tree: ObjectId,
    info: CommitInfo,
}

/// In-memory linear history. Understands `HEAD`, `HEAD~`, `HEAD~N`, each
/// optionally followed by `^{tree}`.
#[derive(Default)]
pub struct MemoryStore {
    location: PathBuf,
    blobs: HashMap<ObjectId, Vec<u8>>,
    trees: HashMap<ObjectId, Vec<TreeEntry>>,
    history: Vec<MemoryCommit>,
}

impl MemoryStore {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Store a blob under its git blob id.
    pub fn insert_blob(&mut self, content: &[u8]) -> Result<ObjectId> {
        let id: ObjectId = Oid::hash_object(ObjectType::Blob, content)?.into();
        self.blobs.insert(id.clone(), content.to_vec());
        Ok(id)
    }

    /// Commit a snapshot made of regular files.
    pub fn commit(&mut self, message: &str, files: &[(&str, &str)]) -> Result<ObjectId> {
        let mut entries = Vec::with_capacity(files.len());
        for (path, content) in files {
            entries.push(TreeEntry {
                path: path.to_string(),
                id: self.insert_blob(content.as_bytes())?,
                mode: FileMode::Regular,
            });
        }
        self.commit_entries(message, entries)
    }

    /// Commit a snapshot from prepared entries. Blob contents must already
    /// be stored with [`MemoryStore::insert_blob`].
    pub fn commit_entries(&mut self, message: &str, entries: Vec<TreeEntry>) -> Result<ObjectId> {
        let mut listing = String::new();
        for entry in TreeSnapshot::new(entries.clone()).entries() {
            listing.push_str(&format!("{} {} {}\n", entry.mode.octal(), entry.id, entry.path));
        }
        let tree: ObjectId = Oid::hash_object(ObjectType::Tree, listing.as_bytes())?.into();
        self.trees.insert(tree.clone(), entries);

        let parent = self
            .history
            .last()
            .map(|c| c.info.id.clone())
            .unwrap_or_default();
        let body = format!("tree {tree}\nparent {parent}\n\n{message}");
        let id = Oid::hash_object(ObjectType::Commit, body.as_bytes())?.to_string();

        self.history.push(MemoryCommit {
            tree,
            info: CommitInfo {
                short_id: id.chars().take(8).collect(),
                id: id.clone(),
                message: message.to_string(),
                committer_name: "Test".to_string(),
                committer_email: "test@example.com".to_string(),
                date: String::new(),
            },
        });
        Ok(ObjectId::new(id))
    }

    /// Index into `history` for a revision expression.
    fn lookup(&self, revision: &str) -> Option<&MemoryCommit> {
        let rev = revision.strip_suffix("^{tree}").unwrap_or(revision);
        let rest = rev.strip_prefix("HEAD")?;
        let back = match rest.strip_prefix('~') {
            None if rest.is_empty() => 0,
            None => return None,
            Some("") => 1,
            Some(n) => n.parse::<usize>().ok()?,
        };
        let idx = self.history.len().checked_sub(back + 1)?;
        self.history.get(idx)
    }
}

impl ObjectStore for MemoryStore {
    fn location(&self) -> &Path {
        &self.location
    }

    fn resolve_tree(&self, revision: &str) -> Result<Option<ObjectId>> {
        Ok(self.lookup(revision).map(|c| c.tree.clone()))
    }

    fn walk_tree(&self, tree: &ObjectId) -> Result<TreeSnapshot> {
        self.trees
            .get(tree)
            .map(|entries| TreeSnapshot::new(entries.clone()))
            .ok_or_else(|| LastChangesError::Store(format!("tree {tree} not found")))
    }

    fn read_blob(&self, id: &ObjectId) -> Result<Vec<u8>> {
        self.blobs
            .get(id)
            .cloned()
            .ok_or_else(|| LastChangesError::Store(format!("blob {id} not found")))
    }

    fn commit_info(&self, revision: &str) -> Result<Option<CommitInfo>> {
        Ok(self.lookup(revision).map(|c| c.info.clone()))
    }
}
