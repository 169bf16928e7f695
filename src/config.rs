use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::git::{DiffOptions, LocatorOptions, OutputFormat};

pub const DEFAULT_OUTPUT: &str = "git-diff.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastChangesConfig {
    pub format: OutputFormat,
    pub context_lines: usize,
    pub allow_bare: bool,
    pub detect_renames: bool,
    /// File the diff is written to when no output is given on the command line.
    pub output: PathBuf,
}

impl Default for LastChangesConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Patch,
            context_lines: 3,
            allow_bare: false,
            detect_renames: false,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl LastChangesConfig {
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            format: self.format,
            context_lines: self.context_lines,
            detect_renames: self.detect_renames,
        }
    }

    pub fn locator_options(&self) -> LocatorOptions {
        LocatorOptions {
            allow_bare: self.allow_bare,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    format: Option<OutputFormat>,
    #[serde(default)]
    context_lines: Option<usize>,
    #[serde(default)]
    allow_bare: Option<bool>,
    #[serde(default)]
    detect_renames: Option<bool>,
    #[serde(default)]
    output: Option<PathBuf>,
}

fn config_path() -> PathBuf {
    let mut path = dirs_home().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("last-changes");
    path.push("config.toml");
    path
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Load config from `~/.config/last-changes/config.toml`, falling back to defaults.
pub fn load_config() -> LastChangesConfig {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> LastChangesConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => {
            log::debug!("No config at {}, using defaults", path.display());
            return LastChangesConfig::default();
        }
    };

    let file: ConfigFile = match toml::from_str(&contents) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("Failed to parse config file {}: {}", path.display(), e);
            return LastChangesConfig::default();
        }
    };

    log::debug!("Loaded config from {}", path.display());
    let defaults = LastChangesConfig::default();
    LastChangesConfig {
        format: file.format.unwrap_or(defaults.format),
        context_lines: file.context_lines.unwrap_or(defaults.context_lines),
        allow_bare: file.allow_bare.unwrap_or(defaults.allow_bare),
        detect_renames: file.detect_renames.unwrap_or(defaults.detect_renames),
        output: file.output.unwrap_or(defaults.output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml"));
        assert_eq!(config, LastChangesConfig::default());
        assert_eq!(config.output, PathBuf::from("git-diff.txt"));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "format = \"json\"\ncontext_lines = 5\n").unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.context_lines, 5);
        assert!(!config.allow_bare);

        let options = config.diff_options();
        assert_eq!(options.context_lines, 5);
        assert!(!options.detect_renames);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "format = \"html\"\n").unwrap();
        assert_eq!(load_config_from(&path), LastChangesConfig::default());
    }

    #[test]
    fn test_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "allow_bare = true\ndetect_renames = true\noutput = \"out/changes.diff\"\n",
        )
        .unwrap();

        let config = load_config_from(&path);
        assert!(config.locator_options().allow_bare);
        assert!(config.detect_renames);
        assert_eq!(config.output, PathBuf::from("out/changes.diff"));
    }
}
