use std::fmt;

use serde::Serialize;

/// Hex content identity of a git object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub const ABBREV_LEN: usize = 7;

    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The all-zero id git prints for a missing side.
    pub fn zero() -> Self {
        Self("0".repeat(40))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        self.0.get(..Self::ABBREV_LEN).unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<git2::Oid> for ObjectId {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Regular,
    Executable,
    Symlink,
    Gitlink,
}

impl FileMode {
    /// Map a raw git filemode. Trees and unknown modes yield `None`.
    pub fn from_raw(mode: i32) -> Option<Self> {
        match mode {
            0o100644 | 0o100664 => Some(FileMode::Regular),
            0o100755 => Some(FileMode::Executable),
            0o120000 => Some(FileMode::Symlink),
            0o160000 => Some(FileMode::Gitlink),
            _ => None,
        }
    }

    pub fn octal(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Symlink => "120000",
            FileMode::Gitlink => "160000",
        }
    }

    /// Regular and executable files are both plain blobs; any other pairing
    /// is a type change.
    pub fn same_kind(&self, other: &FileMode) -> bool {
        let blob = |m: &FileMode| matches!(m, FileMode::Regular | FileMode::Executable);
        (blob(self) && blob(other)) || self == other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub id: ObjectId,
    pub mode: FileMode,
}

/// Every non-tree entry reachable from a root tree, ordered by path bytes.
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    entries: Vec<TreeEntry>,
}

impl TreeSnapshot {
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));
        Self { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    #[serde(rename = "add")]
    Added,
    #[serde(rename = "delete")]
    Deleted,
    #[serde(rename = "modify")]
    Modified,
    #[serde(rename = "rename")]
    Renamed,
}

/// One side of a change: where the file lived and what it contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSide {
    pub path: String,
    pub id: ObjectId,
    pub mode: FileMode,
}

impl From<&TreeEntry> for FileSide {
    fn from(entry: &TreeEntry) -> Self {
        Self {
            path: entry.path.clone(),
            id: entry.id.clone(),
            mode: entry.mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub status: FileStatus,
    pub old: Option<FileSide>,
    pub new: Option<FileSide>,
}

impl ChangeEntry {
    pub fn added(entry: &TreeEntry) -> Self {
        Self {
            status: FileStatus::Added,
            old: None,
            new: Some(entry.into()),
        }
    }

    pub fn deleted(entry: &TreeEntry) -> Self {
        Self {
            status: FileStatus::Deleted,
            old: Some(entry.into()),
            new: None,
        }
    }

    pub fn modified(old: &TreeEntry, new: &TreeEntry) -> Self {
        Self {
            status: FileStatus::Modified,
            old: Some(old.into()),
            new: Some(new.into()),
        }
    }

    pub fn old_path(&self) -> Option<&str> {
        self.old.as_ref().map(|s| s.path.as_str())
    }

    pub fn new_path(&self) -> Option<&str> {
        self.new.as_ref().map(|s| s.path.as_str())
    }

    /// Path shown for this entry: the new path, or the old one for deletions.
    pub fn path(&self) -> &str {
        self.new_path().or_else(|| self.old_path()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineOrigin {
    Context,
    #[serde(rename = "insert")]
    Addition,
    #[serde(rename = "delete")]
    Deletion,
}

impl DiffLineOrigin {
    pub fn prefix(&self) -> char {
        match self {
            DiffLineOrigin::Context => ' ',
            DiffLineOrigin::Addition => '+',
            DiffLineOrigin::Deletion => '-',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub origin: DiffLineOrigin,
    /// Line text for display; invalid UTF-8 is replaced.
    pub content: String,
    /// Line bytes exactly as stored, without the trailing newline.
    #[serde(skip)]
    pub raw: Vec<u8>,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
    /// The source line had no trailing newline (last line of the file).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub missing_newline: bool,
}

impl DiffLine {
    pub fn new(
        origin: DiffLineOrigin,
        raw: &[u8],
        old_lineno: Option<u32>,
        new_lineno: Option<u32>,
        missing_newline: bool,
    ) -> Self {
        Self {
            origin,
            content: String::from_utf8_lossy(raw).into_owned(),
            raw: raw.to_vec(),
            old_lineno,
            new_lineno,
            missing_newline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{} +{} @@",
            format_range(self.old_start, self.old_lines),
            format_range(self.new_start, self.new_lines)
        )
    }
}

fn format_range(start: u32, len: u32) -> String {
    if len == 1 {
        start.to_string()
    } else {
        format!("{start},{len}")
    }
}

/// A change entry together with its rendered hunks.
#[derive(Debug, Clone)]
pub struct FileDelta {
    pub change: ChangeEntry,
    pub hunks: Vec<Hunk>,
    pub additions: usize,
    pub deletions: usize,
    pub binary: bool,
}

impl FileDelta {
    pub fn status(&self) -> FileStatus {
        self.change.status
    }

    pub fn path(&self) -> &str {
        self.change.path()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    pub fn record(&mut self, delta: &FileDelta) {
        self.files_changed += 1;
        self.insertions += delta.additions;
        self.deletions += delta.deletions;
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        write!(
            f,
            "{} file{} changed, {} insertion{}(+), {} deletion{}(-)",
            self.files_changed,
            plural(self.files_changed),
            self.insertions,
            plural(self.insertions),
            self.deletions,
            plural(self.deletions)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub message: String,
    pub committer_name: String,
    pub committer_email: String,
    pub date: String,
}

impl fmt::Display for CommitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Commit: {}", self.id)?;
        writeln!(f, "Author: {}", self.committer_name)?;
        writeln!(f, "E-mail: {}", self.committer_email)?;
        writeln!(f, "Date: {}", self.date)?;
        write!(f, "Message: {}", self.message.trim_end())
    }
}

/// The tip commit, its parent, and every file that differs between them.
#[derive(Debug, Clone)]
pub struct LastChanges {
    pub current: CommitInfo,
    pub previous: CommitInfo,
    pub deltas: Vec<FileDelta>,
}

impl LastChanges {
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for delta in &self.deltas {
            summary.record(delta);
        }
        summary
    }
}
