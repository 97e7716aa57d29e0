//! Panelcast Daemon
//!
//! Plays frame sequences on ST7789 panels wired to a Linux SPI bus.

mod config;
mod source;

use anyhow::{Context, Result};
use clap::Parser;
use panelcast_hw::linux::{LinuxBus, LinuxDriver};
use panelcast_hw::Panel;
use panelcast_playback::{MultiPanelCoordinator, PlaybackOutcome, PlaybackScheduler};
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use source::PanelSource;

#[derive(Parser)]
#[command(name = "panelcastd")]
#[command(about = "Frame playback daemon for SPI panels")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(default_value = "config/default.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Play this many loops and exit, overriding the configuration
    #[arg(long)]
    loops: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    // Load configuration
    let mut config = Config::load(&cli.config).context("Failed to load configuration")?;
    if let Some(loops) = cli.loops {
        config.loops = i64::from(loops);
    }
    config.validate()?;
    info!("Loaded configuration from: {}", cli.config.display());

    let clear = config.clear_color()?;
    let mut bus = LinuxBus::open(config.bus.bus_config()).context("Failed to open GPIO lines")?;

    // Only the first panel pulses the shared reset line. A second pulse would
    // reset the panels already initialized.
    let mut panels = Vec::with_capacity(config.panels.len());
    for (i, panel) in config.panels.iter().enumerate() {
        let mut driver = bus
            .open_panel(panel.profile()?, &panel.wiring(i == 0))
            .with_context(|| format!("Failed to initialize panel {}", panel.name))?;
        driver.fill_screen(clear)?;
        let source = PanelSource::from_config(panel, config.fps)?;
        info!("Panel {} ready ({})", panel.name, driver.profile().kind);
        panels.push((panel.name.clone(), driver, source));
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let options = config.playback_options();
    match <[_; 1]>::try_from(panels) {
        Ok([(_, driver, source)]) => {
            let mut scheduler = PlaybackScheduler::new(driver, source);
            let outcome = scheduler.play(options, &cancel).await?;
            report(outcome);
            if config.clear_on_exit {
                scheduler.clear(clear)?;
            }
        }
        Err(panels) => {
            let mut coordinator: MultiPanelCoordinator<LinuxDriver, PanelSource> =
                MultiPanelCoordinator::new(config.settle());
            for (name, driver, source) in panels {
                coordinator.add_panel(name, driver, source);
            }
            let outcome = coordinator.play(options, &cancel).await?;
            report(outcome);
            if config.clear_on_exit {
                coordinator.clear(clear).await?;
            }
        }
    }

    Ok(())
}

fn report(outcome: PlaybackOutcome) {
    match outcome {
        PlaybackOutcome::Completed => info!("Playback complete"),
        PlaybackOutcome::Cancelled => info!("Playback cancelled"),
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers: {}", e);
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
    }
    cancel.cancel();
}
