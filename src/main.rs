//! keepalive-soak
//!
//! Runs the keep-alive controller against a bundled asset directory for a
//! while, optionally injecting interruptions, then prints the final status.

use std::path::PathBuf;
use std::time::Duration;

use alarm_keepalive_lib::audio::default_playback_factory;
use alarm_keepalive_lib::platform::{BundleRegistrar, InterruptionEvent};
use alarm_keepalive_lib::{logging, KeepAliveSettings, KeepAliveState};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "keepalive-soak", version, about = "Soak-test the silent keep-alive signal")]
struct Args {
    /// Directory holding `packages/<package>/<asset>`
    #[arg(long)]
    asset_root: PathBuf,

    /// Directory with an optional keepalive.json
    #[arg(long)]
    settings_dir: Option<PathBuf>,

    /// Override the emission period
    #[arg(long)]
    period_ms: Option<u64>,

    /// How long to keep the session alive
    #[arg(long, default_value_t = 30)]
    duration_secs: u64,

    /// Inject a began/ended interruption pair at this interval
    #[arg(long)]
    interrupt_every_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let mut settings = match &args.settings_dir {
        Some(dir) => KeepAliveSettings::load(dir).context("failed to load keep-alive settings")?,
        None => KeepAliveSettings::default(),
    };
    if let Some(period_ms) = args.period_ms {
        settings.period_ms = period_ms;
    }

    let state = KeepAliveState::new(
        settings,
        BundleRegistrar::new(&args.asset_root),
        tokio::runtime::Handle::current(),
        default_playback_factory(),
    );

    state
        .controller
        .try_start(&state.registrar)
        .context("silent player did not start")?;
    info!(duration_secs = args.duration_secs, "soak running");

    let deadline = tokio::time::sleep(Duration::from_secs(args.duration_secs));
    tokio::pin!(deadline);

    match args.interrupt_every_secs {
        Some(secs) => {
            let mut interrupts = tokio::time::interval(Duration::from_secs(secs.max(1)));
            interrupts.tick().await;
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    _ = interrupts.tick() => {
                        state.interruptions.post(InterruptionEvent::Began);
                        state.interruptions.post(InterruptionEvent::Ended);
                    }
                }
            }
        }
        None => deadline.await,
    }

    state.controller.stop();

    let status = serde_json::to_string_pretty(&state.controller.status())?;
    println!("{status}");
    Ok(())
}
