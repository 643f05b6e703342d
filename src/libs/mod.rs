//! Core library modules for the cadence application.
//!
//! Serves as the main entry point for all cadence library components.
//!
//! ## Features
//!
//! - **Core Infrastructure**: Configuration, data storage, messaging
//! - **Activity Monitoring**: Polled press-edge detection with idle accounting
//! - **Phase Scheduling**: Active/Idle automation cycles that pause on real
//!   user input and resume after a quiet period
//! - **Action Execution**: Capability interface plus an `rdev`-backed
//!   synthetic input implementation

pub mod config;
pub mod data_storage;
pub mod executor;
pub mod messages;
pub mod monitor;
pub mod scheduler;
pub mod simulator;
pub mod state;
