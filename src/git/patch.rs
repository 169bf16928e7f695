use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use super::types::{FileDelta, FileStatus, Hunk, ObjectId};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Unified diff text, as `git diff` prints it
    #[default]
    Patch,
    /// JSON array of per-file diffs for HTML renderers
    Json,
}

/// Writes deltas to a sink one at a time, in either output format.
pub struct PatchWriter<'a> {
    sink: &'a mut dyn Write,
    format: OutputFormat,
    written: usize,
}

impl<'a> PatchWriter<'a> {
    pub fn new(sink: &'a mut dyn Write, format: OutputFormat) -> Self {
        Self {
            sink,
            format,
            written: 0,
        }
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.format == OutputFormat::Json {
            self.sink.write_all(b"[")?;
        }
        Ok(())
    }

    pub fn write_delta(&mut self, delta: &FileDelta) -> Result<()> {
        match self.format {
            OutputFormat::Patch => write_unified(&mut *self.sink, delta)?,
            OutputFormat::Json => {
                if self.written > 0 {
                    self.sink.write_all(b",")?;
                }
                self.sink.write_all(b"\n")?;
                serde_json::to_writer(&mut *self.sink, &JsonFileDiff::from(delta))?;
            }
        }
        self.written += 1;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.format == OutputFormat::Json {
            if self.written > 0 {
                self.sink.write_all(b"\n")?;
            }
            self.sink.write_all(b"]\n")?;
        }
        self.sink.flush()?;
        Ok(())
    }
}

/// One element of the JSON document.
#[derive(Serialize)]
struct JsonFileDiff<'a> {
    old_path: Option<&'a str>,
    new_path: Option<&'a str>,
    change_type: FileStatus,
    binary: bool,
    additions: usize,
    deletions: usize,
    hunks: &'a [Hunk],
}

impl<'a> From<&'a FileDelta> for JsonFileDiff<'a> {
    fn from(delta: &'a FileDelta) -> Self {
        Self {
            old_path: delta.change.old_path(),
            new_path: delta.change.new_path(),
            change_type: delta.status(),
            binary: delta.binary,
            additions: delta.additions,
            deletions: delta.deletions,
            hunks: &delta.hunks,
        }
    }
}

/// Git-style patch text for a single file.
pub fn write_unified(out: &mut dyn Write, delta: &FileDelta) -> io::Result<()> {
    let change = &delta.change;
    let old_path = change.old_path().unwrap_or_else(|| change.path());
    let new_path = change.new_path().unwrap_or_else(|| change.path());

    writeln!(
        out,
        "diff --git {} {}",
        quote_path("a/", old_path),
        quote_path("b/", new_path)
    )?;

    match (&change.old, &change.new) {
        (None, Some(new)) => writeln!(out, "new file mode {}", new.mode.octal())?,
        (Some(old), None) => writeln!(out, "deleted file mode {}", old.mode.octal())?,
        (Some(old), Some(new)) => {
            if old.mode != new.mode {
                writeln!(out, "old mode {}", old.mode.octal())?;
                writeln!(out, "new mode {}", new.mode.octal())?;
            }
            if change.status == FileStatus::Renamed {
                writeln!(out, "similarity index 100%")?;
                writeln!(out, "rename from {}", quote_path("", old_path))?;
                writeln!(out, "rename to {}", quote_path("", new_path))?;
            }
        }
        (None, None) => {}
    }

    let old_id = change.old.as_ref().map_or_else(ObjectId::zero, |s| s.id.clone());
    let new_id = change.new.as_ref().map_or_else(ObjectId::zero, |s| s.id.clone());
    if old_id != new_id {
        write!(out, "index {}..{}", old_id.short(), new_id.short())?;
        if let (Some(old), Some(new)) = (&change.old, &change.new) {
            if old.mode == new.mode {
                write!(out, " {}", new.mode.octal())?;
            }
        }
        writeln!(out)?;
    }

    let old_label = match change.old {
        Some(_) => quote_path("a/", old_path),
        None => "/dev/null".to_string(),
    };
    let new_label = match change.new {
        Some(_) => quote_path("b/", new_path),
        None => "/dev/null".to_string(),
    };

    if delta.binary {
        writeln!(out, "Binary files {old_label} and {new_label} differ")?;
        return Ok(());
    }
    if delta.hunks.is_empty() {
        return Ok(());
    }

    writeln!(out, "--- {old_label}{}", label_tab(&old_label))?;
    writeln!(out, "+++ {new_label}{}", label_tab(&new_label))?;
    for hunk in &delta.hunks {
        writeln!(out, "{}", hunk.header())?;
        for line in &hunk.lines {
            write!(out, "{}", line.origin.prefix())?;
            out.write_all(&line.raw)?;
            writeln!(out)?;
            if line.missing_newline {
                writeln!(out, "\\ No newline at end of file")?;
            }
        }
    }
    Ok(())
}

/// `---`/`+++` labels containing a space end with a tab.
fn label_tab(label: &str) -> &'static str {
    if label.contains(' ') {
        "\t"
    } else {
        ""
    }
}

fn needs_quoting(b: u8) -> bool {
    b < 0x20 || b == b'"' || b == b'\\' || b >= 0x7f
}

/// `prefix` + `path`, C-quoted the way git prints paths with control,
/// quote, backslash or non-ASCII bytes. Plain paths pass through.
fn quote_path(prefix: &str, path: &str) -> String {
    let joined = format!("{prefix}{path}");
    if !joined.bytes().any(needs_quoting) {
        return joined;
    }

    let mut quoted = String::with_capacity(joined.len() + 2);
    quoted.push('"');
    for b in joined.bytes() {
        match b {
            0x07 => quoted.push_str("\\a"),
            0x08 => quoted.push_str("\\b"),
            b'\t' => quoted.push_str("\\t"),
            b'\n' => quoted.push_str("\\n"),
            0x0b => quoted.push_str("\\v"),
            0x0c => quoted.push_str("\\f"),
            b'\r' => quoted.push_str("\\r"),
            b'"' => quoted.push_str("\\\""),
            b'\\' => quoted.push_str("\\\\"),
            b if needs_quoting(b) => quoted.push_str(&format!("\\{b:03o}")),
            b => quoted.push(b as char),
        }
    }
    quoted.push('"');
    quoted
}
