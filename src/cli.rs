//! CLI front end (ambient, external-caller demonstration)
//!
//! Deliberately thin: explicit file paths only, no subcommands, no
//! directory recursion, no parallel workers — the CLI processes its
//! file list sequentially.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::analyzer::analyze_file;
use crate::config::ProjectConfig;
use crate::reporters;

/// phpguard - unescaped output and SQL injection scanner for PHP
#[derive(Parser, Debug)]
#[command(name = "phpguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// PHP source files to analyze
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format: text or json
    #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Directory to load an optional phpguard.toml from (default: current directory)
    #[arg(long, default_value = ".")]
    pub config_dir: PathBuf,
}

pub fn run(cli: Cli) -> Result<()> {
    let config = ProjectConfig::load(&cli.config_dir)
        .with_context(|| format!("loading project config from {}", cli.config_dir.display()))?;

    let mut any_findings = false;
    for path in &cli.files {
        let findings = analyze_file(path, &config)
            .with_context(|| format!("reading {}", path.display()))?;
        any_findings = any_findings || !findings.is_empty();

        let rendered = reporters::report(&path.display().to_string(), &findings, &cli.format)?;
        print!("{rendered}");
    }

    info!(files = cli.files.len(), "analysis complete");
    std::process::exit(if any_findings { 1 } else { 0 });
}
