#![cfg_attr(not(test), deny(clippy::unwrap_used))]

//! phpguard — static analyzer for unescaped output and SQL injection in PHP

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use phpguard::cli;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    cli::run(cli)
}
