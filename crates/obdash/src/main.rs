//! obdash - live OBD-II RPM gauge and trouble code tool

mod commands;
mod terminal;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use obdash_core::settings::{LinkKind, Settings};

#[derive(Parser)]
#[command(name = "obdash", version)]
#[command(about = "Live OBD-II RPM gauge for ELM327 adapters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (default: <config dir>/obdash/settings.json)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial port of the adapter
    #[arg(short, long, global = true, conflicts_with_all = ["tcp", "demo"])]
    port: Option<String>,

    /// Address of a WiFi adapter (host:port)
    #[arg(long, global = true, value_name = "ADDR", conflicts_with = "demo")]
    tcp: Option<String>,

    /// Use the simulated engine instead of an adapter
    #[arg(long, global = true)]
    demo: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the live RPM gauge (default)
    Gauge {
        /// Also poll and show vehicle speed
        #[arg(long)]
        speed: bool,
    },
    /// Read stored diagnostic trouble codes
    Dtc {
        /// Clear the codes after reading them
        #[arg(long)]
        clear: bool,

        /// Do not ask before clearing
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the connection state and every known parameter once
    Status {
        /// Only these parameters (e.g. RPM SPEED COOLANT_TEMP)
        #[arg(value_name = "PARAM")]
        params: Vec<String>,
    },
    /// List serial ports that may hold an adapter
    Ports,
    /// Print the effective settings as JSON
    Config {
        /// Write them to the settings file
        #[arg(long)]
        save: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("obdash=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn settings_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => dirs::config_dir()
            .map(|dir| dir.join("obdash").join("settings.json"))
            .context("No user config directory; pass --config"),
    }
}

/// Settings from file with the command line applied on top
fn load_settings(cli: &Cli, path: &Path) -> Result<Settings> {
    let mut settings = if cli.config.is_some() {
        Settings::load(path)
    } else {
        Settings::load_or_default(path)
    }
    .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    if let Some(port) = &cli.port {
        settings.link.kind = LinkKind::Serial;
        settings.link.port = Some(port.clone());
    }
    if let Some(address) = &cli.tcp {
        settings.link.kind = LinkKind::Tcp;
        settings.link.address = address.clone();
    }
    if cli.demo {
        settings.link.kind = LinkKind::Demo;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let path = settings_path(&cli)?;
    let mut settings = load_settings(&cli, &path)?;

    match cli.command.unwrap_or(Commands::Gauge { speed: false }) {
        Commands::Gauge { speed } => {
            settings.poller.poll_speed |= speed;
            commands::gauge(settings).await
        }
        Commands::Dtc { clear, yes } => commands::dtc(&settings, clear, yes),
        Commands::Status { params } => commands::status(&settings, &params),
        Commands::Ports => {
            commands::ports();
            Ok(())
        }
        Commands::Config { save } => commands::config(&settings, save.then_some(path.as_path())),
    }
}
