//! `SlidePrint` CLI - inspect site adapters and assemble captured decks

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slideprint")]
#[command(about = "Capture hosted slide decks and assemble them for print")]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported viewer sites and their URL patterns
    Sites,

    /// Show which site adapter handles a URL
    Match {
        /// Viewer page URL
        url: String,
    },

    /// Parse an "N / M" slide counter
    Counter {
        /// Counter text, e.g. "3 / 20"
        text: String,
    },

    /// Read slide counts from a saved viewer page
    Counts {
        /// Saved HTML of the viewer page
        html: PathBuf,

        /// URL the page was saved from (selects the adapter)
        #[arg(short, long)]
        url: String,
    },

    /// Crop captured slides and write a printable HTML document
    Assemble {
        /// JSON list of captured slides (`[{"img", "dimensions", "preScaled"}]`)
        slides: PathBuf,

        /// Output HTML file
        #[arg(short, long)]
        output: PathBuf,

        /// Device pixel ratio of the capturing display
        #[arg(short, long, default_value = "1.0")]
        ratio: f64,
    },

    /// Show the configuration file location and effective settings
    Config,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "slideprint=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Sites => cmd::cmd_sites()?,
        Commands::Match { url } => cmd::cmd_match(&url)?,
        Commands::Counter { text } => cmd::cmd_counter(&text)?,
        Commands::Counts { html, url } => cmd::cmd_counts(&html, &url).await?,
        Commands::Assemble {
            slides,
            output,
            ratio,
        } => cmd::cmd_assemble(&slides, &output, ratio).await?,
        Commands::Config => cmd::cmd_config()?,
    }

    Ok(())
}
