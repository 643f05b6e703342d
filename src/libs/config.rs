//! Configuration management for the cadence application.
//!
//! Settings live in a JSON file in the platform-specific application data
//! directory. Each module has an optional section, so a missing file or a
//! missing section simply falls back to defaults; the interactive `init`
//! wizard fills sections in guided steps.
//!
//! ## Configuration Structure
//!
//! - **Scheduler Config**: phase durations, action cadence, runtime budget,
//!   and action-selection weights
//! - **Monitor Config**: idle timeout and input polling interval
//!
//! ## Storage
//!
//! The file location follows OS conventions:
//! - **Windows**: `%LOCALAPPDATA%\sorrel\cadence\config.json`
//! - **macOS**: `~/Library/Application Support/sorrel/cadence/config.json`
//! - **Linux**: `~/.local/share/sorrel/cadence/config.json`

use super::data_storage::DataStorage;
use crate::libs::messages::Message;
use crate::libs::monitor::MonitorConfig;
use crate::libs::scheduler::SchedulerConfig;
use crate::msg_print;
use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};

/// Configuration file name used for storing application settings.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Represents a configurable module during interactive setup.
#[derive(Debug, Clone)]
pub struct ConfigModule {
    /// Unique identifier for the module used in configuration routing
    pub key: String,
    /// Display name shown to users during interactive setup
    pub name: String,
}

/// Main configuration container for the entire application.
///
/// All sections are optional so users configure only what they need and
/// unconfigured sections are omitted from the JSON output.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Config {
    /// Automation cycle configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerConfig>,

    /// Activity monitoring configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorConfig>,
}

impl Config {
    /// Reads configuration from the filesystem.
    ///
    /// Returns the default configuration when no file exists; a file that
    /// exists but cannot be read or parsed is an error.
    pub fn read() -> Result<Config> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;

        if !config_file_path.exists() {
            return Ok(Config::default());
        }

        let config_str = fs::read_to_string(config_file_path)?;
        let config: Config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    /// Saves the current configuration as pretty-printed JSON, creating the
    /// application data directory if needed.
    pub fn save(&self) -> Result<()> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;

        let config_file = File::create(config_file_path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    /// Runs the interactive configuration setup wizard.
    ///
    /// Loads the existing configuration as defaults, lets the user pick
    /// which modules to configure, prompts for each parameter, and returns
    /// the updated configuration ready for saving.
    pub fn init() -> Result<Self> {
        let mut config = Self::read().unwrap_or_default();

        let node_descriptions = vec![
            ConfigModule {
                key: "scheduler".to_string(),
                name: "Scheduler".to_string(),
            },
            ConfigModule {
                key: "monitor".to_string(),
                name: "Monitor".to_string(),
            },
        ];

        let selected_nodes = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptSelectModules.to_string())
            .items(&node_descriptions.iter().map(|module| &module.name).collect::<Vec<_>>())
            .interact()?;

        for &selection in &selected_nodes {
            match node_descriptions[selection].key.as_str() {
                "scheduler" => {
                    let default = config.scheduler.clone().unwrap_or_default();
                    msg_print!(Message::ConfigModuleScheduler);
                    config.scheduler = Some(SchedulerConfig {
                        active_min: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptActiveMin.to_string())
                            .default(default.active_min)
                            .interact_text()?,

                        active_max: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptActiveMax.to_string())
                            .default(default.active_max)
                            .interact_text()?,

                        idle_min: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptIdleMin.to_string())
                            .default(default.idle_min)
                            .interact_text()?,

                        idle_max: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptIdleMax.to_string())
                            .default(default.idle_max)
                            .interact_text()?,

                        action_interval_min: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptActionIntervalMin.to_string())
                            .default(default.action_interval_min)
                            .interact_text()?,

                        action_interval_max: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptActionIntervalMax.to_string())
                            .default(default.action_interval_max)
                            .interact_text()?,

                        app_switch_interval: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptAppSwitchInterval.to_string())
                            .default(default.app_switch_interval)
                            .interact_text()?,

                        click_delay_max: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptClickDelayMax.to_string())
                            .default(default.click_delay_max)
                            .interact_text()?,

                        total_runtime: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptTotalRuntime.to_string())
                            .default(default.total_runtime)
                            .interact_text()?,

                        user_idle_timeout: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptUserIdleTimeout.to_string())
                            .default(default.user_idle_timeout)
                            .interact_text()?,

                        check_interval: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptCheckInterval.to_string())
                            .default(default.check_interval)
                            .interact_text()?,

                        // Weights keep their current values; edit the config
                        // file directly for fine-grained tuning.
                        weights: default.weights.clone(),
                    });
                }

                "monitor" => {
                    let default = config.monitor.clone().unwrap_or_default();
                    msg_print!(Message::ConfigModuleMonitor);
                    config.monitor = Some(MonitorConfig {
                        idle_timeout: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptUserIdleTimeout.to_string())
                            .default(default.idle_timeout)
                            .interact_text()?,

                        poll_interval: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptPollInterval.to_string())
                            .default(default.poll_interval)
                            .interact_text()?,
                    });
                }
                _ => {} // Unknown module keys are safely ignored
            }
        }

        Ok(config)
    }

    /// The scheduler section, falling back to defaults, with the monitor
    /// section's idle timeout folded in when the scheduler section does not
    /// override it.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let mut scheduler = self.scheduler.clone().unwrap_or_default();
        if self.scheduler.is_none() {
            if let Some(monitor) = &self.monitor {
                scheduler.user_idle_timeout = monitor.idle_timeout;
            }
        }
        scheduler
    }

    /// The monitor section, falling back to defaults.
    pub fn monitor_config(&self) -> MonitorConfig {
        self.monitor.clone().unwrap_or_default()
    }
}
