use std::cmp::Ordering;
use std::io::Write;
use std::ops::Range;

use log::{debug, info};
use similar::{ChangeTag, TextDiff};

use super::patch::{OutputFormat, PatchWriter};
use super::repository::RepoHandle;
use super::store::{ObjectStore, HEAD_TREE, PARENT_TREE};
use super::types::*;
use crate::error::{LastChangesError, Result};

/// Blob id of the empty file. Never used to pair renames.
const EMPTY_BLOB: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

/// How many leading bytes are scanned for NUL when sniffing binary content.
const BINARY_SNIFF_LEN: usize = 8000;

#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub format: OutputFormat,
    /// Unchanged lines shown around each change.
    pub context_lines: usize,
    /// Pair deletions and additions with identical content into renames.
    pub detect_renames: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Patch,
            context_lines: 3,
            detect_renames: false,
        }
    }
}

pub struct DiffEngine;

impl DiffEngine {
    /// Stream the changes between `HEAD~` and `HEAD` of `repo` into `sink`.
    /// The handle is released when this returns.
    pub fn compute_last_changes<W: Write>(
        repo: RepoHandle,
        sink: &mut W,
        options: &DiffOptions,
    ) -> Result<DiffSummary> {
        debug!("Repository validated: {}", repo.location().display());
        let store = repo.store();
        Self::write_changes(&store, sink, options)
    }

    /// Same as [`DiffEngine::compute_last_changes`] against any object store.
    pub fn write_changes(
        store: &dyn ObjectStore,
        sink: &mut dyn Write,
        options: &DiffOptions,
    ) -> Result<DiffSummary> {
        let changes = Self::changes(store, options.detect_renames)?;

        let mut writer = PatchWriter::new(sink, options.format);
        let mut summary = DiffSummary::default();
        writer.begin()?;
        for change in changes {
            let delta = Self::build_delta(store, change, options.context_lines)?;
            summary.record(&delta);
            writer.write_delta(&delta)?;
        }
        writer.finish()?;

        debug!("Changes formatted: {summary}");
        Ok(summary)
    }

    /// Collect the tip commit, its parent and all deltas in memory.
    pub fn last_changes(repo: RepoHandle, options: &DiffOptions) -> Result<LastChanges> {
        let store = repo.store();
        Self::collect(&store, options)
    }

    pub fn collect(store: &dyn ObjectStore, options: &DiffOptions) -> Result<LastChanges> {
        let changes = Self::changes(store, options.detect_renames)?;

        let current = store
            .commit_info("HEAD")?
            .ok_or_else(|| LastChangesError::NoCommits {
                location: store.location().to_path_buf(),
            })?;
        let previous = store
            .commit_info("HEAD~")?
            .ok_or_else(|| LastChangesError::PrecedingCommitMissing {
                location: store.location().to_path_buf(),
            })?;
        info!("Comparing {} with {}", current.short_id, previous.short_id);

        let deltas = changes
            .into_iter()
            .map(|change| Self::build_delta(store, change, options.context_lines))
            .collect::<Result<Vec<_>>>()?;

        Ok(LastChanges {
            current,
            previous,
            deltas,
        })
    }

    /// Resolve both trees, walk them, and compare.
    fn changes(store: &dyn ObjectStore, detect_renames: bool) -> Result<Vec<ChangeEntry>> {
        let location = store.location().to_path_buf();
        let new_tree = store
            .resolve_tree(HEAD_TREE)?
            .ok_or_else(|| LastChangesError::NoCommits {
                location: location.clone(),
            })?;
        let old_tree = store
            .resolve_tree(PARENT_TREE)?
            .ok_or(LastChangesError::PrecedingCommitMissing { location })?;
        debug!("Trees resolved: old {old_tree}, new {new_tree}");

        let old = store.walk_tree(&old_tree)?;
        let new = store.walk_tree(&new_tree)?;
        let changes = diff_snapshots(&old, &new, detect_renames);
        debug!(
            "Changes computed: {} of {} old / {} new entries differ",
            changes.len(),
            old.len(),
            new.len()
        );
        Ok(changes)
    }

    /// Load both sides of a change and compute its hunks.
    pub fn build_delta(
        store: &dyn ObjectStore,
        change: ChangeEntry,
        context_lines: usize,
    ) -> Result<FileDelta> {
        let unchanged_content = match (&change.old, &change.new) {
            (Some(old), Some(new)) => old.id == new.id,
            _ => false,
        };
        if unchanged_content {
            return Ok(FileDelta {
                change,
                hunks: Vec::new(),
                additions: 0,
                deletions: 0,
                binary: false,
            });
        }

        let old = side_content(store, change.old.as_ref())?;
        let new = side_content(store, change.new.as_ref())?;

        if is_binary(&old) || is_binary(&new) {
            return Ok(FileDelta {
                change,
                hunks: Vec::new(),
                additions: 0,
                deletions: 0,
                binary: true,
            });
        }

        let hunks = compute_hunks(&old, &new, context_lines);
        let count = |origin: DiffLineOrigin| {
            hunks
                .iter()
                .flat_map(|h| &h.lines)
                .filter(|l| l.origin == origin)
                .count()
        };
        let additions = count(DiffLineOrigin::Addition);
        let deletions = count(DiffLineOrigin::Deletion);

        Ok(FileDelta {
            change,
            hunks,
            additions,
            deletions,
            binary: false,
        })
    }
}

fn side_content(store: &dyn ObjectStore, side: Option<&FileSide>) -> Result<Vec<u8>> {
    match side {
        None => Ok(Vec::new()),
        Some(side) if side.mode == FileMode::Gitlink => {
            Ok(format!("Subproject commit {}\n", side.id).into_bytes())
        }
        Some(side) => store.read_blob(&side.id),
    }
}

fn is_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0)
}

/// Compare two snapshots path by path. Both are already sorted, so this is a
/// single merge pass and the result comes out in path order.
pub fn diff_snapshots(
    old: &TreeSnapshot,
    new: &TreeSnapshot,
    detect_renames: bool,
) -> Vec<ChangeEntry> {
    let old = old.entries();
    let new = new.entries();
    let mut changes = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < old.len() || j < new.len() {
        let order = match (old.get(i), new.get(j)) {
            (Some(o), Some(n)) => o.path.as_bytes().cmp(n.path.as_bytes()),
            (Some(_), None) => Ordering::Less,
            (None, _) => Ordering::Greater,
        };
        match order {
            Ordering::Less => {
                changes.push(ChangeEntry::deleted(&old[i]));
                i += 1;
            }
            Ordering::Greater => {
                changes.push(ChangeEntry::added(&new[j]));
                j += 1;
            }
            Ordering::Equal => {
                let (o, n) = (&old[i], &new[j]);
                if !o.mode.same_kind(&n.mode) {
                    changes.push(ChangeEntry::deleted(o));
                    changes.push(ChangeEntry::added(n));
                } else if o.id != n.id || o.mode != n.mode {
                    changes.push(ChangeEntry::modified(o, n));
                }
                i += 1;
                j += 1;
            }
        }
    }

    if detect_renames {
        pair_renames(changes)
    } else {
        changes
    }
}

/// Fold each addition whose content matches a deletion into one rename,
/// kept at the position of the added path.
fn pair_renames(mut changes: Vec<ChangeEntry>) -> Vec<ChangeEntry> {
    let mut deleted: Vec<usize> = changes
        .iter()
        .enumerate()
        .filter(|(_, c)| c.status == FileStatus::Deleted)
        .map(|(i, _)| i)
        .collect();
    let mut consumed = vec![false; changes.len()];

    for idx in 0..changes.len() {
        if changes[idx].status != FileStatus::Added {
            continue;
        }
        let Some(new) = changes[idx].new.clone() else {
            continue;
        };
        if new.id.as_str() == EMPTY_BLOB {
            continue;
        }
        let candidate = deleted.iter().position(|&d| {
            changes[d]
                .old
                .as_ref()
                .is_some_and(|old| old.id == new.id && old.mode.same_kind(&new.mode))
        });
        let Some(pos) = candidate else {
            continue;
        };
        let d = deleted.remove(pos);
        consumed[d] = true;
        let old = changes[d].old.take();
        changes[idx] = ChangeEntry {
            status: FileStatus::Renamed,
            old,
            new: Some(new),
        };
    }

    changes
        .into_iter()
        .zip(consumed)
        .filter(|(_, gone)| !gone)
        .map(|(c, _)| c)
        .collect()
}

/// Line-level Myers diff grouped into hunks with `context` lines around each
/// change.
pub fn compute_hunks(old: &[u8], new: &[u8], context: usize) -> Vec<Hunk> {
    let diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in diff.grouped_ops(context) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        let mut lines = Vec::new();
        for op in &group {
            for change in diff.iter_changes(op) {
                let value = change.value();
                let (raw, missing_newline) = match value.strip_suffix(b"\n") {
                    Some(stripped) => (stripped, false),
                    None => (value, true),
                };
                let origin = match change.tag() {
                    ChangeTag::Equal => DiffLineOrigin::Context,
                    ChangeTag::Insert => DiffLineOrigin::Addition,
                    ChangeTag::Delete => DiffLineOrigin::Deletion,
                };
                lines.push(DiffLine::new(
                    origin,
                    raw,
                    change.old_index().map(|i| i as u32 + 1),
                    change.new_index().map(|i| i as u32 + 1),
                    missing_newline,
                ));
            }
        }

        hunks.push(Hunk {
            old_start: range_start(&old_range),
            old_lines: old_range.len() as u32,
            new_start: range_start(&new_range),
            new_lines: new_range.len() as u32,
            lines,
        });
    }

    hunks
}

/// 1-based start line; an empty range names the line before it.
fn range_start(range: &Range<usize>) -> u32 {
    if range.is_empty() {
        range.start as u32
    } else {
        range.start as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::git::repository::LocatorOptions;
    use crate::git::store::MemoryStore;
    use crate::git::test_repo::TestRepo;
    use pretty_assertions::assert_eq;

    fn entry(path: &str, id: &str, mode: FileMode) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            id: ObjectId::new(id),
            mode,
        }
    }

    fn patch_of(store: &MemoryStore, options: &DiffOptions) -> String {
        let mut out = Vec::new();
        DiffEngine::write_changes(store, &mut out, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn open(repo: &TestRepo) -> RepoHandle {
        RepoHandle::open(&repo.path_str(), &LocatorOptions::default()).unwrap()
    }

    #[test]
    fn test_modified_file_patch() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("add a", &[("a.txt", "hello\n")]).unwrap();
        store.commit("edit a", &[("a.txt", "hello world\n")]).unwrap();

        let old = store.insert_blob(b"hello\n").unwrap();
        let new = store.insert_blob(b"hello world\n").unwrap();
        let expected = format!(
            "diff --git a/a.txt b/a.txt\n\
             index {}..{} 100644\n\
             --- a/a.txt\n\
             +++ b/a.txt\n\
             @@ -1 +1 @@\n\
             -hello\n\
             +hello world\n",
            old.short(),
            new.short()
        );
        assert_eq!(patch_of(&store, &DiffOptions::default()), expected);
    }

    #[test]
    fn test_modified_file_entries() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("add a", &[("a.txt", "hello")]).unwrap();
        store.commit("edit a", &[("a.txt", "hello world")]).unwrap();

        let changes = DiffEngine::collect(&store, &DiffOptions::default()).unwrap();
        assert_eq!(changes.deltas.len(), 1);
        let delta = &changes.deltas[0];
        assert_eq!(delta.status(), FileStatus::Modified);
        assert_eq!(delta.path(), "a.txt");
        assert_eq!(delta.hunks.len(), 1);

        let lines = &delta.hunks[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].origin, DiffLineOrigin::Deletion);
        assert_eq!(lines[0].content, "hello");
        assert!(lines[0].missing_newline);
        assert_eq!(lines[1].origin, DiffLineOrigin::Addition);
        assert_eq!(lines[1].content, "hello world");
        assert_eq!((delta.additions, delta.deletions), (1, 1));
    }

    #[test]
    fn test_deleted_file() {
        let mut store = MemoryStore::new("/mem/.git");
        store
            .commit("two files", &[("a.txt", "keep\n"), ("b.txt", "bye\n")])
            .unwrap();
        store.commit("drop b", &[("a.txt", "keep\n")]).unwrap();

        let changes = DiffEngine::collect(&store, &DiffOptions::default()).unwrap();
        assert_eq!(changes.deltas.len(), 1);
        let change = &changes.deltas[0].change;
        assert_eq!(change.status, FileStatus::Deleted);
        assert_eq!(change.old_path(), Some("b.txt"));
        assert_eq!(change.new_path(), None);

        let patch = patch_of(&store, &DiffOptions::default());
        assert!(patch.starts_with("diff --git a/b.txt b/b.txt\ndeleted file mode 100644\n"));
        assert!(patch.contains("--- a/b.txt\n+++ /dev/null\n@@ -1 +0,0 @@\n-bye\n"));
    }

    #[test]
    fn test_disjoint_commits_only_show_tip() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("x", &[("x.txt", "x\n")]).unwrap();
        store
            .commit("y", &[("x.txt", "x\n"), ("y.txt", "y\n")])
            .unwrap();

        let changes = DiffEngine::collect(&store, &DiffOptions::default()).unwrap();
        let summary: Vec<(FileStatus, &str)> = changes
            .deltas
            .iter()
            .map(|d| (d.status(), d.path()))
            .collect();
        assert_eq!(summary, vec![(FileStatus::Added, "y.txt")]);

        let patch = patch_of(&store, &DiffOptions::default());
        assert!(!patch.contains("x.txt"));
        assert!(patch.contains("new file mode 100644\nindex 0000000.."));
        assert!(patch.contains("--- /dev/null\n+++ b/y.txt\n@@ -0,0 +1 @@\n+y\n"));
    }

    #[test]
    fn test_single_commit_is_preceding_commit_missing() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("only", &[("a.txt", "a\n")]).unwrap();

        let mut out = Vec::new();
        let err = DiffEngine::write_changes(&store, &mut out, &DiffOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrecedingCommitMissing);
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_history() {
        let store = MemoryStore::new("/mem/.git");
        let err = DiffEngine::collect(&store, &DiffOptions::default()).unwrap_err();
        assert!(matches!(err, LastChangesError::NoCommits { .. }));
        assert_eq!(err.kind(), ErrorKind::PrecedingCommitMissing);
    }

    #[test]
    fn test_merge_join_order_and_kinds() {
        let old = TreeSnapshot::new(vec![
            entry("b", "b1", FileMode::Regular),
            entry("c", "c1", FileMode::Regular),
            entry("d", "d1", FileMode::Regular),
            entry("e", "e1", FileMode::Regular),
        ]);
        let new = TreeSnapshot::new(vec![
            entry("a", "a1", FileMode::Regular),
            entry("c", "c2", FileMode::Regular),
            entry("d", "d1", FileMode::Executable),
            entry("e", "e1", FileMode::Symlink),
        ]);

        let changes = diff_snapshots(&old, &new, false);
        let got: Vec<(FileStatus, &str)> = changes.iter().map(|c| (c.status, c.path())).collect();
        assert_eq!(
            got,
            vec![
                (FileStatus::Added, "a"),
                (FileStatus::Deleted, "b"),
                (FileStatus::Modified, "c"),
                (FileStatus::Modified, "d"),
                (FileStatus::Deleted, "e"),
                (FileStatus::Added, "e"),
            ]
        );
    }

    #[test]
    fn test_identical_snapshots_have_no_changes() {
        let snapshot = TreeSnapshot::new(vec![entry("a", "a1", FileMode::Regular)]);
        assert!(diff_snapshots(&snapshot, &snapshot, true).is_empty());
    }

    #[test]
    fn test_rename_detection() {
        let old = TreeSnapshot::new(vec![
            entry("docs/old.md", "same", FileMode::Regular),
            entry("keep", "k", FileMode::Regular),
        ]);
        let new = TreeSnapshot::new(vec![
            entry("keep", "k", FileMode::Regular),
            entry("notes/new.md", "same", FileMode::Regular),
        ]);

        let plain = diff_snapshots(&old, &new, false);
        assert_eq!(plain.len(), 2);

        let renamed = diff_snapshots(&old, &new, true);
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].status, FileStatus::Renamed);
        assert_eq!(renamed[0].old_path(), Some("docs/old.md"));
        assert_eq!(renamed[0].new_path(), Some("notes/new.md"));
    }

    #[test]
    fn test_rename_patch() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("a", &[("old.txt", "content\n")]).unwrap();
        store.commit("mv", &[("new.txt", "content\n")]).unwrap();

        let options = DiffOptions {
            detect_renames: true,
            ..DiffOptions::default()
        };
        assert_eq!(
            patch_of(&store, &options),
            "diff --git a/old.txt b/new.txt\n\
             similarity index 100%\n\
             rename from old.txt\n\
             rename to new.txt\n"
        );
    }

    #[test]
    fn test_mode_change_only() {
        let mut store = MemoryStore::new("/mem/.git");
        let id = store.insert_blob(b"#!/bin/sh\n").unwrap();
        store
            .commit_entries(
                "script",
                vec![TreeEntry {
                    path: "run.sh".to_string(),
                    id: id.clone(),
                    mode: FileMode::Regular,
                }],
            )
            .unwrap();
        store
            .commit_entries(
                "chmod",
                vec![TreeEntry {
                    path: "run.sh".to_string(),
                    id,
                    mode: FileMode::Executable,
                }],
            )
            .unwrap();

        assert_eq!(
            patch_of(&store, &DiffOptions::default()),
            "diff --git a/run.sh b/run.sh\nold mode 100644\nnew mode 100755\n"
        );
    }

    #[test]
    fn test_binary_file() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("img", &[("logo.png", "\u{0}PNG")]).unwrap();
        store.commit("img2", &[("logo.png", "\u{0}PNG2")]).unwrap();

        let patch = patch_of(&store, &DiffOptions::default());
        assert!(patch.ends_with("Binary files a/logo.png and b/logo.png differ\n"));
        assert!(!patch.contains("@@"));
    }

    #[test]
    fn test_hunks_with_context() {
        let old: String = (1..=20).map(|n| format!("line {n}\n")).collect();
        let new = old.replace("line 3\n", "line three\n").replace("line 18\n", "line eighteen\n");

        let hunks = compute_hunks(old.as_bytes(), new.as_bytes(), 3);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].header(), "@@ -1,6 +1,6 @@");
        assert_eq!(hunks[1].header(), "@@ -15,6 +15,6 @@");
        assert_eq!(hunks[1].lines[0].content, "line 15");
        assert_eq!(hunks[1].lines[0].old_lineno, Some(15));

        let merged = compute_hunks(old.as_bytes(), new.as_bytes(), 10);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_no_newline_marker() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("a", &[("a.txt", "hello")]).unwrap();
        store.commit("b", &[("a.txt", "hello world")]).unwrap();

        let patch = patch_of(&store, &DiffOptions::default());
        assert!(patch.ends_with(
            "@@ -1 +1 @@\n-hello\n\\ No newline at end of file\n+hello world\n\\ No newline at end of file\n"
        ));
    }

    #[test]
    fn test_non_utf8_lines_are_written_verbatim() {
        let mut store = MemoryStore::new("/mem/.git");
        for (message, content) in [("a", &b"caf\xe9\n"[..]), ("b", &b"caf\xe9 au lait\n"[..])] {
            let id = store.insert_blob(content).unwrap();
            let listing = vec![entry("latin1.txt", id.as_str(), FileMode::Regular)];
            store.commit_entries(message, listing).unwrap();
        }

        let mut out = Vec::new();
        DiffEngine::write_changes(&store, &mut out, &DiffOptions::default()).unwrap();
        assert!(out.ends_with(b"@@ -1 +1 @@\n-caf\xe9\n+caf\xe9 au lait\n"));

        let changes = DiffEngine::collect(&store, &DiffOptions::default()).unwrap();
        let line = &changes.deltas[0].hunks[0].lines[0];
        assert_eq!(line.raw, b"caf\xe9");
        assert_eq!(line.content, "caf\u{fffd}");
    }

    #[test]
    fn test_json_output() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("a", &[("a.txt", "hello\n"), ("b.txt", "b\n")]).unwrap();
        store.commit("b", &[("a.txt", "hello world\n")]).unwrap();

        let options = DiffOptions {
            format: OutputFormat::Json,
            ..DiffOptions::default()
        };
        let json: serde_json::Value = serde_json::from_str(&patch_of(&store, &options)).unwrap();
        let files = json.as_array().unwrap();
        assert_eq!(files.len(), 2);

        assert_eq!(files[0]["old_path"], "a.txt");
        assert_eq!(files[0]["new_path"], "a.txt");
        assert_eq!(files[0]["change_type"], "modify");
        let hunk = &files[0]["hunks"][0];
        assert_eq!(hunk["old_start"], 1);
        assert_eq!(hunk["new_lines"], 1);
        assert_eq!(hunk["lines"][0]["type"], "delete");
        assert_eq!(hunk["lines"][0]["content"], "hello");
        assert_eq!(hunk["lines"][1]["type"], "insert");
        assert_eq!(hunk["lines"][1]["content"], "hello world");

        assert_eq!(files[1]["change_type"], "delete");
        assert_eq!(files[1]["new_path"], serde_json::Value::Null);
    }

    #[test]
    fn test_repository_round_trip() {
        let repo = TestRepo::new();
        repo.commit("add a", &[("a.txt", "hello\n")]);
        repo.commit("edit a", &[("a.txt", "hello world\n")]);

        let mut out = Vec::new();
        let summary =
            DiffEngine::compute_last_changes(open(&repo), &mut out, &DiffOptions::default())
                .unwrap();
        assert_eq!(summary.files_changed, 1);

        let patch = String::from_utf8(out).unwrap();
        assert!(patch.starts_with("diff --git a/a.txt b/a.txt\nindex "));
        assert!(patch.ends_with("--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-hello\n+hello world\n"));
    }

    #[test]
    fn test_repository_output_is_deterministic() {
        let repo = TestRepo::new();
        repo.commit("one", &[("a.txt", "1\n2\n3\n"), ("dir/b.txt", "b\n")]);
        repo.commit("two", &[("a.txt", "1\n2\n3\n4\n"), ("dir/c.txt", "c\n")]);

        for format in [OutputFormat::Patch, OutputFormat::Json] {
            let options = DiffOptions {
                format,
                ..DiffOptions::default()
            };
            let mut first = Vec::new();
            let mut second = Vec::new();
            DiffEngine::compute_last_changes(open(&repo), &mut first, &options).unwrap();
            DiffEngine::compute_last_changes(open(&repo), &mut second, &options).unwrap();
            assert!(!first.is_empty());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_repository_single_commit() {
        let repo = TestRepo::new();
        repo.commit("initial", &[("a.txt", "a\n")]);

        let mut out = Vec::new();
        let err = DiffEngine::compute_last_changes(open(&repo), &mut out, &DiffOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrecedingCommitMissing);
    }

    #[test]
    fn test_repository_last_changes_commit_info() {
        let repo = TestRepo::new();
        let first = repo.commit("first", &[("a.txt", "a\n")]);
        let second = repo.commit("second", &[("a.txt", "b\n")]);

        let changes = DiffEngine::last_changes(open(&repo), &DiffOptions::default()).unwrap();
        assert_eq!(changes.current.id, second.to_string());
        assert_eq!(changes.previous.id, first.to_string());
        assert_eq!(changes.summary().files_changed, 1);
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("sink closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_io_failure() {
        let mut store = MemoryStore::new("/mem/.git");
        store.commit("a", &[("a.txt", "a\n")]).unwrap();
        store.commit("b", &[("a.txt", "b\n")]).unwrap();

        let err = DiffEngine::write_changes(&store, &mut BrokenSink, &DiffOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }
}
