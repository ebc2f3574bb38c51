//! Subcommand implementations

use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use obdash_core::gauge::{run_render_loop, GaugeRenderer};
use obdash_core::history::LiveHistory;
use obdash_core::link::{list_ports, ConnectionState, Parameter, VehicleLink};
use obdash_core::poller::{Poller, PollerConfig};
use obdash_core::sample::SampleStore;
use obdash_core::settings::Settings;

use crate::terminal::TerminalSurface;

/// Live gauge until Ctrl-C
pub async fn gauge(settings: Settings) -> Result<()> {
    let store = SampleStore::new();
    let config = PollerConfig::from_settings(&settings.poller, settings.gauge.poll_interval_ms);
    let poller = Poller::new(settings.link.factory(), store.clone(), config)
        .spawn()
        .context("Failed to start poller thread")?;

    let history = Arc::new(Mutex::new(LiveHistory::from_settings(&settings.history)));
    let stdout = io::stdout();
    let ansi = stdout.is_terminal();
    let mut surface = TerminalSurface::new(stdout, ansi)
        .with_history(history.clone(), settings.gauge.max_value);
    if settings.poller.poll_speed {
        surface = surface.with_speed(store.clone());
    }
    let mut renderer =
        GaugeRenderer::new(settings.gauge.clone(), surface).context("Invalid gauge configuration")?;

    println!("{} ({})", settings.gauge.title, settings.gauge.unit_caption);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
        }
        on_signal.cancel();
    });

    let frames = run_render_loop(&mut renderer, &store, cancel, |snapshot| {
        history.lock().record(snapshot);
    })
    .await;

    renderer.surface_mut().finish()?;
    poller.stop().map_err(|_| anyhow!("Poller thread panicked"))?;
    info!(frames, "gauge closed");
    Ok(())
}

fn open_link(settings: &Settings) -> Result<Box<dyn VehicleLink>> {
    settings
        .link
        .factory()
        .open()
        .context("Could not open the vehicle link")
}

/// Read (and optionally clear) stored trouble codes
pub fn dtc(settings: &Settings, clear: bool, yes: bool) -> Result<()> {
    let mut link = open_link(settings)?;
    let result = run_dtc(link.as_mut(), clear, yes);
    link.close();
    result
}

fn run_dtc(link: &mut dyn VehicleLink, clear: bool, yes: bool) -> Result<()> {
    ensure_car_connected(link)?;

    let codes = link.read_dtcs().context("Failed to read trouble codes")?;
    if codes.is_empty() {
        println!("No fault codes found.");
        return Ok(());
    }

    println!("Stored fault codes:");
    for code in &codes {
        println!("  {}", code);
    }

    if !clear {
        return Ok(());
    }
    if !yes && !confirm("Clear all fault codes? This also resets emission monitors. [y/N] ")? {
        println!("Left codes in place.");
        return Ok(());
    }
    link.clear_dtcs().context("Failed to clear trouble codes")?;
    println!("Fault codes cleared.");
    Ok(())
}

fn ensure_car_connected(link: &mut dyn VehicleLink) -> Result<()> {
    match link.status().context("Adapter did not answer")? {
        ConnectionState::CarConnected => Ok(()),
        other => bail!("Vehicle not reachable: {}", other),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

/// Print connection state and one reading per parameter
pub fn status(settings: &Settings, names: &[String]) -> Result<()> {
    let parameters = if names.is_empty() {
        Parameter::ALL.to_vec()
    } else {
        names
            .iter()
            .map(|n| Parameter::from_name(n).ok_or_else(|| anyhow!("Unknown parameter '{}'", n)))
            .collect::<Result<Vec<_>>>()?
    };

    let mut link = open_link(settings)?;
    let result = run_status(link.as_mut(), &parameters);
    link.close();
    result
}

fn run_status(link: &mut dyn VehicleLink, parameters: &[Parameter]) -> Result<()> {
    let state = link.status().context("Adapter did not answer")?;
    println!("Status: {}", state);
    if state != ConnectionState::CarConnected {
        return Ok(());
    }

    for &parameter in parameters {
        match link.query(parameter) {
            Ok(Some(m)) => println!("{:<24} {}", parameter.name(), m),
            Ok(None) => println!("{:<24} no data", parameter.name()),
            Err(e) if e.is_link_failure() => return Err(e).context("Vehicle link failed"),
            Err(e) => println!("{:<24} {}", parameter.name(), e),
        }
    }
    Ok(())
}

/// List candidate serial ports
pub fn ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found.");
        return;
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}  [{:04x}:{:04x}] {}",
                port.name,
                vid,
                pid,
                port.product.as_deref().unwrap_or("")
            ),
            _ => println!("{}", port.name),
        }
    }
}

/// Print the effective settings, saving them when a path is given
pub fn config(settings: &Settings, save_to: Option<&Path>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    if let Some(path) = save_to {
        settings
            .save(path)
            .with_context(|| format!("Failed to save settings to {}", path.display()))?;
        eprintln!("Saved to {}", path.display());
    }
    Ok(())
}
