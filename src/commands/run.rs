//! The foreground runner for the automation cycle.
//!
//! Wires the activity monitor, the scheduler, and the `rdev` input
//! simulator together and runs until Ctrl+C, SIGTERM, or runtime expiry.

use crate::libs::config::Config;
use crate::libs::messages::Message;
use crate::libs::monitor::{Monitor, RdevSource};
use crate::libs::scheduler::Scheduler;
use crate::libs::simulator::InputSimulator;
use crate::libs::state::Phase;
use crate::{msg_bail_anyhow, msg_info, msg_print};
use anyhow::Result;
use chrono::Local;
use clap::Args;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Override the total runtime budget in seconds (0 for unlimited).
    #[arg(long)]
    pub runtime: Option<u64>,
}

/// Runs the scheduler in the foreground with graceful shutdown on signals
/// or runtime expiry.
pub async fn cmd(args: RunArgs) -> Result<()> {
    let config = Config::read()?;
    let mut scheduler_config = config.scheduler_config();
    if let Some(runtime) = args.runtime {
        scheduler_config.total_runtime = runtime;
    }

    let monitor = Monitor::new(config.monitor_config(), Box::new(RdevSource::new()));
    let scheduler = Arc::new(Scheduler::new(monitor, Arc::new(InputSimulator::new())));

    // Echo each new action and phase transition to the console.
    let last_printed = Mutex::new((Phase::Stopped, String::new()));
    scheduler.set_on_state_change(move |snapshot| {
        let mut last = last_printed.lock();
        if *last != (snapshot.phase, snapshot.last_action.clone()) {
            *last = (snapshot.phase, snapshot.last_action.clone());
            let at = Local::now().format("%H:%M:%S");
            msg_print!(format!("{} [{}] {}", at, snapshot.phase, snapshot.last_action));
        }
    });

    // Runtime expiry is reported by the scheduling thread; forward it to
    // the select below so the runner exits.
    let (expired_tx, expired_rx) = tokio::sync::oneshot::channel();
    let expired_tx = Mutex::new(Some(expired_tx));
    scheduler.set_on_runtime_expired(move || {
        if let Some(tx) = expired_tx.lock().take() {
            let _ = tx.send(());
        }
    });

    if !scheduler.start(scheduler_config) {
        msg_bail_anyhow!(Message::SchedulerAlreadyRunning);
    }
    msg_info!(Message::RunnerStarted);

    // Set up a channel to handle shutdown signals
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let sigterm = signal(SignalKind::terminate());
            let sigint = signal(SignalKind::interrupt());
            match (sigterm, sigint) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => {
                            msg_info!(Message::RunnerReceivedSigterm);
                        }
                        _ = sigint.recv() => {
                            msg_info!(Message::RunnerReceivedSigint);
                        }
                    }
                }
                _ => {
                    crate::msg_warning!(Message::RunnerSignalHandlingNotSupported);
                    std::future::pending::<()>().await;
                }
            }

            let _ = shutdown_tx.send(());
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    msg_info!(Message::RunnerReceivedCtrlC);
                }
                Err(e) => {
                    crate::msg_error!(Message::RunnerCtrlCListenFailed(e.to_string()));
                }
            }

            let _ = shutdown_tx.send(());
        });
    }

    #[cfg(not(any(unix, windows)))]
    {
        // Keep the sender alive so the select below does not resolve
        // immediately; only runtime expiry can end the run here.
        std::mem::forget(shutdown_tx);
        crate::msg_warning!(Message::RunnerSignalHandlingNotSupported);
    }

    // Wait for a shutdown signal or for the runtime budget to run out.
    tokio::select! {
        _ = shutdown_rx => {
            msg_info!(Message::RunnerShuttingDown);
        }
        _ = expired_rx => {
            msg_info!(Message::RuntimeExpired);
        }
    }

    scheduler.stop();
    Ok(())
}
