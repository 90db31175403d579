//! FrameSnap CLI: record a screen region, review it, export frames.
//!
//! Usage:
//!   framesnap record --region L,T,W,H [OPTIONS]   Record, then review interactively
//!   framesnap monitors                             List connected monitors

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use framesnap_common::config::AppConfig;

mod commands;
mod terminal;

#[derive(Parser)]
#[command(
    name = "framesnap",
    about = "Capture a screen region frame by frame and pick the stills you need",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a screen region, then review and export frames
    Record {
        /// Region to capture as LEFT,TOP,WIDTH,HEIGHT in desktop pixels
        #[arg(short, long, allow_hyphen_values = true)]
        region: String,

        /// Capture rate (defaults to the configured rate)
        #[arg(long)]
        fps: Option<u32>,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Start capturing immediately
        #[arg(long)]
        no_countdown: bool,

        /// Directory exported frames and snapshots are written to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List connected monitors
    Monitors,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::default(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    framesnap_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Record {
            region,
            fps,
            duration,
            no_countdown,
            output,
        } => {
            commands::record::run(
                config,
                commands::record::RecordArgs {
                    region,
                    fps,
                    duration,
                    countdown: !no_countdown,
                    output,
                },
            )
            .await
        }
        Commands::Monitors => commands::monitors::run(),
    }
}
