//! # CLI Arguments
//!
//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

/// AIGamer - lets a language model play Warsim: The Realm of Aslona
#[derive(Parser, Debug)]
#[command(name = "aigamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (.toml, or .json)
    #[arg(short, long, env = "AIGAMER_CONFIG", default_value = "appsettings.toml")]
    pub config: PathBuf,

    /// Session name used in the log file name (skips the prompt)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Start playing immediately instead of waiting for a key
    #[arg(long)]
    pub no_wait: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
