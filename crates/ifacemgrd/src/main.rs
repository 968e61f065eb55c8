//! Chassis interface manager daemon.
//!
//! Loads the board description, builds the interface table and runs the
//! detect poll loop until asked to stop. This build wires the in-memory
//! hardware backends; board support packages substitute real regulator and
//! pin-controller drivers behind the same contracts.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chassis_hal::mock::{MockGpioBank, MockLinkCtrl, MockRail};
use chassis_hal::{GpioBank, LinkCtrl, Rail};
use chassis_ifacemgrd::{BoardConfig, InterfaceRegistry, InterfaceSpec};

#[derive(Debug, Parser)]
#[command(name = "ifacemgrd", about = "Chassis interface manager daemon")]
struct Args {
    /// Board configuration file
    #[arg(long, default_value = "board.toml")]
    config: PathBuf,

    /// Detect poll period in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let board = BoardConfig::from_file(&args.config)
        .with_context(|| format!("loading board config {}", args.config.display()))?;

    let gpio = MockGpioBank::new();
    let link = MockLinkCtrl::new();
    let specs: Vec<InterfaceSpec> = board
        .interfaces
        .iter()
        .map(|config| {
            let vsys: Arc<dyn Rail> = MockRail::new(config.vsys_rail.clone());
            let refclk: Arc<dyn Rail> = MockRail::new(config.refclk_rail.clone());
            InterfaceSpec {
                config: config.clone(),
                vsys,
                refclk,
            }
        })
        .collect();

    let gpio_dyn: Arc<dyn GpioBank> = gpio.clone();
    let link_dyn: Arc<dyn LinkCtrl> = link.clone();
    let registry = InterfaceRegistry::init(specs, gpio_dyn, link_dyn, board.timings())?;
    registry.start();
    info!(interfaces = registry.count(), "ifacemgrd started");

    let shutdown = setup_signal_handler();
    let poll = Duration::from_millis(args.poll_ms);
    while !shutdown.load(Ordering::Relaxed) {
        tokio::time::sleep(poll).await;
        for index in 0..registry.count() {
            registry.on_detect_signal(index);
        }
    }

    info!("shutting down");
    registry.shutdown();
    Ok(())
}

/// Flips the returned flag on SIGINT/SIGTERM so the poll loop can drain
/// gracefully.
fn setup_signal_handler() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
            flag.store(true, Ordering::Relaxed);
        }
    });
    shutdown
}
