//! # Cadence - Activity-Aware Automation Scheduler
//!
//! A background automation driver that alternates randomized active and
//! idle phases while yielding instantly to real user input.
//!
//! ## Features
//!
//! - **Activity Monitoring**: Polled press-edge detection over mouse
//!   buttons and a fixed key set; pointer movement never counts
//! - **Phase Scheduling**: Randomized active/idle cycles with a total
//!   runtime budget that excludes time spent paused for the user
//! - **Instant Yielding**: Any real click or keypress suspends automation
//!   within one polling interval; it resumes after a quiet period
//! - **Round-Robin App Switching**: Fair rotation over visible windows with
//!   bounded retries
//! - **Pluggable Execution**: All concrete effects go through the
//!   `ActionExecutor` capability interface
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cadence::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     Cli::menu().await
//! }
//! ```

pub mod commands;
pub mod libs;
