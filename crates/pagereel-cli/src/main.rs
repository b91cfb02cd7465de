use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "pagereel")]
#[command(author, version, about = "Waypoint itinerary and report tools for Pagereel recordings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit waypoint itineraries
    Waypoints {
        #[command(subcommand)]
        action: WaypointsAction,
    },
    /// Render preview reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum WaypointsAction {
    /// Print an itinerary saved as JSON
    Show {
        /// Waypoints JSON file
        file: PathBuf,
    },
    /// Apply an overrides file to an itinerary
    Merge {
        /// Waypoints JSON file
        file: PathBuf,
        /// JSON array of waypoint overrides
        #[arg(short = 'O', long)]
        overrides: PathBuf,
        /// Where to write the merged itinerary (defaults to in place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ReportAction {
    /// Convert a JSON preview report to another format
    Render {
        /// Preview report JSON file
        file: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Output format: json or html
        #[arg(short, long, default_value = "html")]
        format: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file if none exists
    Init,
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Waypoints { action } => match action {
            WaypointsAction::Show { file } => commands::waypoints::show(&file),
            WaypointsAction::Merge {
                file,
                overrides,
                output,
            } => commands::waypoints::merge(&file, &overrides, output.as_deref()),
        },
        Commands::Report { action } => match action {
            ReportAction::Render {
                file,
                output,
                format,
            } => commands::report::render(&file, &output, &format),
        },
        Commands::Config { action } => match action {
            ConfigAction::Init => commands::config::init(),
            ConfigAction::Path => commands::config::path(),
            ConfigAction::Show => commands::config::show(),
        },
    }
}
