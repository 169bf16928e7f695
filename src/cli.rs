use clap::Parser;
use std::path::PathBuf;

use last_changes::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "last-changes",
    version,
    about = "Show the changes between the last two commits of a git repository"
)]
pub struct Cli {
    /// Repository working tree or its .git directory
    #[arg(default_value = ".")]
    pub path: String,

    /// File to write the diff to (default: git-diff.txt)
    #[arg(short, long, conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write the diff to standard output instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Lines of context around each change
    #[arg(short = 'U', long = "unified", value_name = "N")]
    pub context_lines: Option<usize>,

    /// Accept repositories without a working tree
    #[arg(long)]
    pub allow_bare: bool,

    /// Report files moved without content changes as renames
    #[arg(short = 'M', long = "find-renames")]
    pub find_renames: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
