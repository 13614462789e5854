use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use habits_dashboard::load::{self, LoadedDataset};
use habits_dashboard::render::JsonLinesSink;
use habits_dashboard::{report, Dashboard, DashboardConfig, InputEvent};

#[derive(Parser)]
#[command(name = "habits-dashboard")]
#[command(about = "Statistics and interaction state for the student habits dashboard", long_about = None)]
struct Cli {
    /// JSON file overriding dashboard defaults
    #[arg(long, global = true, env = "DASHBOARD_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a markdown summary of every view
    Summary {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Write the markdown summary to a file
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Replay recorded input events and print each redraw as a JSON line
    Replay {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        events: PathBuf,
    },
}

fn load_dataset(csv: &Path) -> anyhow::Result<LoadedDataset> {
    load::load_csv(csv).with_context(|| format!("failed to load {}", csv.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => DashboardConfig::default(),
    };

    match cli.command {
        Commands::Summary { csv } => {
            let dataset = load_dataset(&csv)?;
            let summary = report::build_report(
                chrono::Utc::now(),
                &csv.display().to_string(),
                &dataset,
                &config,
            );
            print!("{summary}");
        }
        Commands::Report { csv, out } => {
            let dataset = load_dataset(&csv)?;
            let summary = report::build_report(
                chrono::Utc::now(),
                &csv.display().to_string(),
                &dataset,
                &config,
            );
            std::fs::write(&out, summary)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Replay { csv, events } => {
            let dataset = load_dataset(&csv)?;
            let text = std::fs::read_to_string(&events)
                .with_context(|| format!("failed to read {}", events.display()))?;
            let events: Vec<InputEvent> =
                serde_json::from_str(&text).context("events must be a JSON array of input events")?;

            let stdout = std::io::stdout();
            let mut sink = JsonLinesSink::new(BufWriter::new(stdout.lock()));
            let mut dashboard = Dashboard::new(&dataset.records, config);
            dashboard.initial_render(&mut sink)?;
            for event in events {
                dashboard.handle(event, &mut sink)?;
            }
            sink.into_inner().flush()?;
            tracing::info!("replay finished");
        }
    }

    Ok(())
}
