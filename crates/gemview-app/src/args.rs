//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "gemview", version, about = "Render a Gemini page to the terminal")]
pub struct Args {
    /// URL or local file to open.
    pub target: String,
    #[arg(long, default_value_t = 800, value_parser = clap::value_parser!(i32).range(1..))]
    pub width: i32,
    #[arg(long, default_value_t = 600, value_parser = clap::value_parser!(i32).range(1..))]
    pub height: i32,
    /// TOML document preferences.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// JSON file of trusted server certificates, read at start and written
    /// on exit.
    #[arg(long)]
    pub certs: Option<PathBuf>,
}
