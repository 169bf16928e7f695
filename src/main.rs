mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::cli::Cli;
use last_changes::config::{self, LastChangesConfig};
use last_changes::git::ObjectStore;
use last_changes::{DiffEngine, ErrorKind, OutputFormat, RepoHandle};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// CLI flags win over the config file.
fn apply_overrides(mut config: LastChangesConfig, cli: &Cli) -> LastChangesConfig {
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(n) = cli.context_lines {
        config.context_lines = n;
    }
    if let Some(ref output) = cli.output {
        config.output = output.clone();
    }
    config.allow_bare |= cli.allow_bare;
    config.detect_renames |= cli.find_renames;
    config
}

fn log_commits(repo: &RepoHandle) {
    let store = repo.store();
    for revision in ["HEAD", "HEAD~"] {
        if let Ok(Some(commit)) = store.commit_info(revision) {
            info!("{revision}\n{commit}");
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = apply_overrides(config::load_config(), &cli);
    let options = config.diff_options();

    let repo = match RepoHandle::open(&cli.path, &config.locator_options()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("last-changes: {e}");
            std::process::exit(1);
        }
    };
    log_commits(&repo);

    let output: Option<PathBuf> = (!cli.stdout).then(|| config.output.clone());
    let mut sink: Box<dyn Write> = match output {
        Some(ref path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Could not create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    match DiffEngine::compute_last_changes(repo, &mut sink, &options) {
        Ok(summary) => {
            eprintln!("{summary}");
        }
        Err(e) if e.kind() == ErrorKind::PrecedingCommitMissing => {
            info!("{e}");
            eprintln!("no previous revision to compare");
            if options.format == OutputFormat::Json {
                sink.write_all(b"[]\n")?;
            }
            sink.flush()?;
        }
        Err(e) => {
            drop(sink);
            if let Some(ref path) = output {
                // Discard partial output.
                let _ = fs::remove_file(path);
            }
            eprintln!("last-changes: {e}");
            std::process::exit(1);
        }
    }

    if let Some(path) = output {
        info!("Wrote changes to {}", path.display());
    }
    Ok(())
}
