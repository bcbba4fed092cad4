use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Op {
    Query,
    Download,
}

#[derive(Parser)]
#[command(name = "subfetch")]
#[command(about = "Find subtitles for a movie file by its hash or title")]
pub struct Cli {
    /// Movie file to identify by hash and name
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Title to search for (used directly, or as the hash search fallback)
    #[arg(short = 't', long)]
    pub title: Option<String>,

    /// Preferred subtitle languages, best first (2/3-letter code or name)
    #[arg(short = 'l', long = "language")]
    pub languages: Vec<String>,

    /// Operation to perform
    #[arg(short = 'o', long, default_value = "query")]
    pub op: Op,

    /// Index of the result to download
    #[arg(short = 'i', long)]
    pub index: Option<usize>,

    /// Ignore cached results
    #[arg(long)]
    pub refresh: bool,

    /// Download the best result without asking
    #[arg(long)]
    pub lucky: bool,

    /// Write the subtitle next to the movie file instead of stdout
    #[arg(long)]
    pub save: bool,

    /// Overwrite an existing subtitle without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
