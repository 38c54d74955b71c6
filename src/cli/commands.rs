use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::pipeline::TargetSources;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(
    name = "scanwarden",
    version,
    long_version = LONG_VERSION,
    about = "Run security scanners against repositories, images, IaC, web apps, GitLab and Kubernetes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover targets and run the selected scanners
    Scan(ScanArgs),
    /// Validate a configuration file and all of its profiles
    Validate(ValidateArgs),
    /// List known scanners and whether they are installed
    Tools,
}

#[derive(Args, Clone, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub sources: TargetSources,

    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile from the configuration file
    #[arg(short, long, requires = "config")]
    pub profile: Option<String>,

    /// Results directory [default: ./results]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Comma-separated scanners to run [default: all]
    #[arg(long, value_delimiter = ',', value_name = "LIST")]
    pub tools: Option<Vec<String>>,

    /// Per-tool timeout in seconds [default: 600]
    #[arg(long, allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// Extra attempts after a failed run [default: 1]
    #[arg(long, allow_negative_numbers = true)]
    pub retries: Option<i64>,

    /// Tools run in parallel per target [default: CPU count, max 8]
    #[arg(long, env = "SCANWARDEN_THREADS", allow_negative_numbers = true)]
    pub threads: Option<i64>,

    /// Write stub output for scanners that are not installed
    #[arg(long)]
    pub allow_missing_tools: bool,

    /// Only scan repositories whose name matches (repeatable glob)
    #[arg(long, value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Skip repositories whose name matches (repeatable glob)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Path to the YAML configuration file
    pub config: PathBuf,
}
