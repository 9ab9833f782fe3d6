//! pmm-bot: runs the funding-aware market making controller against Hyperliquid market data.
//!
//! Loads a YAML strategy config, starts the controller and ticks it at the configured
//! refresh interval until Ctrl-C or `--max-ticks`. Orders are never transmitted.

use anyhow::{Context, Result};
use clap::Parser;
use pmm_funding::{Controller, HyperliquidGateway, StrategyConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// sleep granularity while waiting for the next tick, bounds Ctrl-C latency
const POLL_STEP: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "pmm-bot", about = "Funding-aware perp market making loop (dry-run only)")]
struct Args {
    /// Strategy config (YAML)
    #[arg(long, short)]
    config: PathBuf,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Force dry-run regardless of the config
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = StrategyConfig::from_file(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    if args.dry_run {
        config.dry_run = true;
    }
    let interval = config.refresh_interval();

    let gateway = HyperliquidGateway::connect(config.base_url.as_deref(), config.network)
        .context("building hyperliquid gateway")?;
    let mut controller = Controller::new(config, gateway).context("invalid strategy config")?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl-C handler")?;

    controller.start();

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        if let Some(report) = controller.on_tick() {
            info!(
                tick = report.tick,
                kept = report.kept,
                added = report.added,
                removed = report.removed,
                blocked = report.is_blocked(),
                equity = %report.equity,
                "tick done"
            );
        }

        if args.max_ticks.is_some_and(|max| controller.tick_count() >= max) {
            info!(ticks = controller.tick_count(), "tick limit reached");
            break;
        }

        let elapsed = started.elapsed();
        if elapsed > interval {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "tick overran refresh interval");
        }
        while running.load(Ordering::SeqCst) && started.elapsed() < interval {
            std::thread::sleep(POLL_STEP.min(interval.saturating_sub(started.elapsed())));
        }
    }

    controller.stop();
    for (request, stats) in controller.gateway().latency().summary() {
        info!(
            request = %request,
            count = stats.count,
            mean_ms = stats.mean_ms,
            p50_ms = stats.p50_ms,
            p90_ms = stats.p90_ms,
            "gateway latency"
        );
    }
    Ok(())
}
