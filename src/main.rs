//! GempaWatch - Interactive BMKG earthquake monitor.
//!
//! Fetches the public BMKG earthquake feeds, normalizes them into a
//! canonical event table, and drives either a one-shot terminal view or
//! the filterable web dashboard with its map layers.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cache;
mod cli;
mod client;
mod config;
mod errors;
mod filters;
mod layers;
mod models;
mod normalize;
mod output;
mod server;
mod stats;

use cli::{Cli, Command};
use client::BmkgClient;
use config::FeedConfig;
use filters::FilterState;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Show(args) => cmd_show(args),
        Command::Ui(args) => cmd_ui(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `show` command - one-shot fetch, filter, sort, print.
fn cmd_show(args: cli::ShowArgs) -> Result<()> {
    let config = FeedConfig::with_overrides(args.feed.base_url, args.feed.cache_ttl, args.feed.timeout);
    let client = BmkgClient::new(&config).context("failed to create BMKG client")?;

    let payload = client
        .fetch_feed(args.source)
        .context("failed to fetch earthquake feed")?;
    let events = normalize::normalize_feed(&payload, &config.asset_base_url);

    if events.is_empty() {
        eprintln!("The feed returned no data.");
        return Ok(());
    }

    // Full-extent state for this dataset, narrowed by whatever bounds the
    // user passed. Out-of-range values clamp instead of erroring.
    let mut state = FilterState::for_events(args.source, &events);
    state.sort_key = args.sort;
    if args.min_magnitude.is_some() || args.max_magnitude.is_some() {
        state.magnitude.select(
            args.min_magnitude.unwrap_or(state.magnitude.lo),
            args.max_magnitude.unwrap_or(state.magnitude.hi),
        );
    }
    if args.min_depth.is_some() || args.max_depth.is_some() {
        state.depth.select(
            args.min_depth.unwrap_or(state.depth.lo),
            args.max_depth.unwrap_or(state.depth.hi),
        );
    }

    let mut events = filters::apply_filters(&events, &state);
    events.truncate(args.limit);

    if events.is_empty() {
        eprintln!("No events match the given filters.");
        return Ok(());
    }

    // Write output
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, &events, args.format)?;

    Ok(())
}

/// Execute the `ui` command - start the dashboard server.
fn cmd_ui(args: cli::UiArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        initial_source: args.source,
        feed: FeedConfig::with_overrides(args.feed.base_url, args.feed.cache_ttl, args.feed.timeout),
    };

    println!("GempaWatch dashboard");
    println!("  Local:  http://{}:{}", args.host, args.port);
    println!("  Source: {}", args.source.label());
    println!("Press Ctrl+C to stop\n");

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config))
}
