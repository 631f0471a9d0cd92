//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::client::FeedSource;
use crate::filters::SortKey;
use crate::output::Format;

/// Interactive BMKG earthquake monitor.
#[derive(Parser, Debug)]
#[command(name = "gempawatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show events from one feed (one-shot fetch and exit)
    Show(ShowArgs),

    /// Start the web dashboard server
    Ui(UiArgs),
}

/// Feed endpoint overrides shared by both commands.
#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Override the BMKG base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Cache time-to-live in seconds
    #[arg(long)]
    pub cache_ttl: Option<u64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Feed source: felt, m5, or realtime
    #[arg(long, default_value = "m5", value_parser = parse_source)]
    pub source: FeedSource,

    /// Lower magnitude bound (defaults to the dataset minimum)
    #[arg(long)]
    pub min_magnitude: Option<f64>,

    /// Upper magnitude bound (defaults to the dataset maximum)
    #[arg(long)]
    pub max_magnitude: Option<f64>,

    /// Lower depth bound in km (defaults to the dataset minimum)
    #[arg(long)]
    pub min_depth: Option<f64>,

    /// Upper depth bound in km (defaults to the dataset maximum)
    #[arg(long)]
    pub max_depth: Option<f64>,

    /// Sort order: newest, strongest, or shallowest
    #[arg(long, default_value = "newest", value_parser = parse_sort_key)]
    pub sort: SortKey,

    /// Maximum number of events to show
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,

    #[command(flatten)]
    pub feed: FeedArgs,
}

/// Arguments for the `ui` command.
#[derive(Parser, Debug)]
pub struct UiArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Feed source selected on first load
    #[arg(long, default_value = "felt", value_parser = parse_source)]
    pub source: FeedSource,

    #[command(flatten)]
    pub feed: FeedArgs,
}

/// Parse a feed source from string.
fn parse_source(s: &str) -> Result<FeedSource, String> {
    s.parse()
}

/// Parse a sort key from string.
fn parse_sort_key(s: &str) -> Result<SortKey, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
