//! Display implementation for cadence application messages.
//!
//! Provides the `Display` trait implementation for the `Message` enum,
//! converting structured message data into human-readable text suitable for
//! terminal output. All user-facing text lives here so wording stays
//! consistent across the scheduler, monitor, configuration, and runner
//! surfaces.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

impl Display for Message {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let text = match self {
            // === SCHEDULER MESSAGES ===
            Message::SchedulerStarted {
                active_min,
                active_max,
                total_runtime,
            } => {
                if *total_runtime == 0 {
                    format!(
                        "Scheduler started (active phase {}-{}s, no runtime limit)",
                        active_min, active_max
                    )
                } else {
                    format!(
                        "Scheduler started (active phase {}-{}s, runtime budget {}s)",
                        active_min, active_max, total_runtime
                    )
                }
            }
            Message::SchedulerAlreadyRunning => "Scheduler is already running".to_string(),
            Message::SchedulerNotRunning => "Scheduler is not running".to_string(),
            Message::SchedulerStopped => "Scheduler stopped".to_string(),
            Message::SchedulerStopping => "Stopping scheduler...".to_string(),
            Message::SchedulerThreadNotJoined => "Scheduling thread did not stop within the join timeout".to_string(),
            Message::SchedulerFault(reason) => format!("Scheduling loop fault: {}", reason),
            Message::RuntimeExpired => "Runtime budget exhausted, automation finished".to_string(),
            Message::CycleStarted(count) => format!("Starting cycle {}", count),
            Message::ActivePhaseStarted(secs) => format!("Active phase for {}s", secs),
            Message::IdlePhaseStarted(secs) => format!("Idle phase for {}s", secs),
            Message::IdlePhaseSkipped => "Idle phase skipped (zero duration configured)".to_string(),
            Message::ActionExecuted(desc) => desc.clone(),
            Message::ActionFailed(desc) => format!("Action failed: {}", desc),
            Message::AppSwitchFailed(reason) => format!("App switch failed: {}", reason),
            Message::PauseEntered => "User input detected, automation paused".to_string(),
            Message::PauseResumed(secs) => format!("User idle again, resuming after {}s pause", secs),

            // === MONITOR MESSAGES ===
            Message::MonitorStarted { idle_timeout, poll_interval } => {
                format!(
                    "Activity monitor started (idle timeout {}s, polling every {}ms)",
                    idle_timeout, poll_interval
                )
            }
            Message::MonitorAlreadyRunning => "Activity monitor is already running".to_string(),
            Message::MonitorStopped => "Activity monitor stopped".to_string(),
            Message::MonitorThreadNotJoined => "Monitor thread did not stop within the join timeout".to_string(),
            Message::MonitorSampleFailed(err) => format!("Device state sample failed: {}", err),
            Message::ActivityDetected(kind) => format!("{} detected", kind),
            Message::UserIdle => "User is idle".to_string(),

            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved successfully".to_string(),
            Message::ConfigParseError => "Failed to parse configuration file".to_string(),
            Message::ConfigModuleScheduler => "Scheduler configuration".to_string(),
            Message::ConfigModuleMonitor => "Monitor configuration".to_string(),
            Message::PromptSelectModules => "Select modules to configure".to_string(),
            Message::PromptActiveMin => "Minimum active phase duration (seconds)".to_string(),
            Message::PromptActiveMax => "Maximum active phase duration (seconds)".to_string(),
            Message::PromptIdleMin => "Minimum idle phase duration (seconds, 0 with max 0 skips the phase)".to_string(),
            Message::PromptIdleMax => "Maximum idle phase duration (seconds)".to_string(),
            Message::PromptActionIntervalMin => "Minimum interval between actions (seconds)".to_string(),
            Message::PromptActionIntervalMax => "Maximum interval between actions (seconds)".to_string(),
            Message::PromptAppSwitchInterval => "Interval between app switches (seconds)".to_string(),
            Message::PromptClickDelayMax => "Maximum safe-click pre-delay (milliseconds)".to_string(),
            Message::PromptTotalRuntime => "Total runtime budget (seconds, 0 for unlimited)".to_string(),
            Message::PromptUserIdleTimeout => "Quiet period before automation resumes (seconds)".to_string(),
            Message::PromptPollInterval => "Input polling interval (milliseconds)".to_string(),
            Message::PromptCheckInterval => "Cancellation check interval (milliseconds)".to_string(),

            // === RUNNER MESSAGES ===
            Message::RunnerStarted => "Automation runner started, press Ctrl+C to stop".to_string(),
            Message::RunnerReceivedCtrlC => "Received Ctrl+C, shutting down...".to_string(),
            Message::RunnerCtrlCListenFailed(err) => format!("Failed to listen for Ctrl+C: {}", err),
            Message::RunnerReceivedSigterm => "Received SIGTERM, shutting down...".to_string(),
            Message::RunnerReceivedSigint => "Received SIGINT, shutting down...".to_string(),
            Message::RunnerSignalHandlingNotSupported => "Signal handling is not supported on this platform".to_string(),
            Message::RunnerShuttingDown => "Shutting down automation...".to_string(),

            // === GENERIC ERROR MESSAGES ===
            Message::InvalidInput => "Invalid input provided".to_string(),
            Message::OperationCancelled => "Operation cancelled".to_string(),
        };
        write!(f, "{}", text)
    }
}
