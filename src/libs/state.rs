//! Scheduler lifecycle phases and the observable state snapshot.

use std::fmt;

/// Current phase of the automation lifecycle.
///
/// Exactly one phase holds at any instant. `WaitingIdle` is the interruption
/// state entered when real user input is detected; it resumes the
/// interrupted phase once the user has been quiet long enough.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Stopped,
    Active,
    Idle,
    WaitingIdle,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Snapshot of the scheduler's observable state.
///
/// The scheduler owns a single instance as the source of truth and mutates
/// it only through one synchronized update operation. Every external read
/// receives a clone, never a reference to the live value, so observers can
/// not see torn reads.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Seconds remaining in the current Active or Idle phase.
    pub phase_time_remaining: u64,
    /// Number of Active phases entered from the top-level loop. Not
    /// incremented when a phase resumes after a WaitingIdle interruption.
    pub cycle_count: u32,
    /// Title of the application currently in the foreground.
    pub current_app: String,
    /// Human-readable description of the last action, including failure text.
    pub last_action: String,
    /// Whether the scheduling loop is running.
    pub is_running: bool,
    /// Seconds until the next automation action fires.
    pub next_action_in: u64,
    /// Seconds left in the total runtime budget. Frozen while paused;
    /// `u64::MAX` renders as unlimited when no budget is configured.
    pub runtime_remaining: u64,
    /// Countdown to the end of the quiet period while in WaitingIdle,
    /// zero in every other phase.
    pub idle_wait_remaining: u64,
    /// Whether real user input was seen within the idle timeout.
    pub is_user_active: bool,
}

impl SchedulerState {
    /// Resets the snapshot to its stopped baseline, preserving nothing from
    /// the previous run. Called on each `start()` so the state value lives
    /// for the scheduler's lifetime instead of being recreated.
    pub fn reset(&mut self) {
        *self = SchedulerState::default();
    }
}
