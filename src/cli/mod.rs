// CLI module for nbrp
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// nbrp - Read-through caching reverse proxy with query telemetry
#[derive(Parser, Debug)]
#[command(name = "nbrp", version, about, long_about = None)]
pub struct Args {
    /// TOML config file (default: ~/.nbrp/config.toml when present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Listen port, overrides APP_PORT and the config file
    #[arg(long)]
    pub port: Option<u16>,

    /// Connect to the cache and stats stores, report, then exit
    #[arg(long)]
    pub check: bool,
}
