/*
 *  main.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Entry point: config, logging, setup hand-off and the session supervisor
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::convert::Infallible;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::BufReader;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::LocalSet;

use artmatrix::config::{self, Cli, Config};
use artmatrix::display::{MatrixDisplay, PanelFactory, STATUS_COLOR};
use artmatrix::memory::Checkpoints;
use artmatrix::remote::RemoteClient;
use artmatrix::session::{Session, SessionSettings};
use artmatrix::setup;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Pause between a failed session and its replacement
const RESTART_PAUSE: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    let level = if cli.debug { "debug" } else { cfg.log_level.as_deref().unwrap_or("info") };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} - the cover, in pixels", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    // one thread, one task at a time
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let local = LocalSet::new();
    local.block_on(&runtime, run(cli, cfg))
}

async fn run(cli: Cli, cfg: Config) -> anyhow::Result<()> {
    if cli.setup || cfg.refresh_token().is_none() {
        if !cli.setup {
            warn!("No refresh token configured, starting guided setup");
        }
        let mut screen = build_screen(&cfg)?;
        let client = RemoteClient::from_config(&cfg, Checkpoints::new())?;
        let stdin = BufReader::new(tokio::io::stdin());
        tokio::select! {
            result = setup::run(&cfg, &client, &mut screen, stdin) => {
                result.context("guided setup")?;
            }
            result = signal_handler() => result?,
        }
        return Ok(());
    }

    tokio::select! {
        result = signal_handler() => result?,
        never = supervise(cfg) => match never {},
    }
    info!("Shutdown complete");
    Ok(())
}

/// Run sessions forever. A session that fails or panics is dropped whole and
/// a fresh one is built in its place.
async fn supervise(cfg: Config) -> Infallible {
    let mut restarts: u64 = 0;
    loop {
        let session_cfg = cfg.clone();
        let task = tokio::task::spawn_local(run_session(session_cfg));
        match task.await {
            Ok(Ok(never)) => match never {},
            Ok(Err(e)) => error!("Session ended: {:#}", e),
            Err(e) if e.is_panic() => error!("Session panicked: {}", e),
            Err(e) => error!("Session task failed: {}", e),
        }
        restarts += 1;
        warn!("Restarting session in {:?} (restart {})", RESTART_PAUSE, restarts);
        tokio::time::sleep(RESTART_PAUSE).await;
    }
}

async fn run_session(cfg: Config) -> anyhow::Result<Infallible> {
    let checkpoints = Checkpoints::new();
    let client = RemoteClient::from_config(&cfg, checkpoints.clone())?;
    let screen = build_screen(&cfg)?;
    let settings = SessionSettings::from_config(&cfg);
    let mut session = Session::new(client, screen, settings, checkpoints, StdRng::from_os_rng());
    Ok(session.run().await?)
}

fn build_screen(cfg: &Config) -> anyhow::Result<MatrixDisplay> {
    let display = cfg.display.clone().unwrap_or_default();
    let panel = PanelFactory::create_from_config(&display)?;
    let screen = MatrixDisplay::new(panel, display.status_color.unwrap_or(STATUS_COLOR))?;
    Ok(screen)
}

/// Wait for SIGINT, SIGTERM or SIGHUP.
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}
