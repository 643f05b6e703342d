//! Activity-aware automation phase scheduler.
//!
//! The scheduler alternates Active and Idle phases on a background thread.
//! During an Active phase it dispatches automation actions at randomized
//! intervals through the [`ActionExecutor`] capability interface; during an
//! Idle phase it waits quietly. The moment the activity monitor reports a
//! real click or keypress, the current phase is suspended into
//! `WaitingIdle` and automation resumes only once the user has been quiet
//! for the configured timeout. Time spent waiting for the user is excluded
//! from both phase durations and the total runtime budget.
//!
//! All waits are broken into short polling increments so cancellation and
//! countdown updates stay responsive; shutdown latency is bounded by one
//! check interval plus the thread-join timeout. Monitor notifications reach
//! the scheduling thread over a channel, so an activity edge is consumed
//! exactly once.

use crate::libs::executor::{supports_scroll, supports_tabs, ActionError, ActionExecutor, WindowInfo};
use crate::libs::messages::Message;
use crate::libs::monitor::{ActivityEvent, Monitor};
use crate::libs::state::{Phase, SchedulerState};
use crate::msg_debug;
use anyhow::Result;
use parking_lot::Mutex;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long `stop()` waits for the scheduling thread before giving up.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Floor between window-list enumerations, bounding enumeration cost.
const WINDOW_LIST_REFRESH: Duration = Duration::from_secs(5);

/// Round-robin attempts per app-switch tick before reporting failure.
const MAX_SWITCH_ATTEMPTS: usize = 3;

/// Chance of cycling to another window of the foreground application before
/// moving on to a different application.
const SAME_APP_CHANCE: f64 = 0.6;

/// Relative weights for general-action sampling.
///
/// These are weights, not probabilities; they are fed to a weighted sampler
/// as-is and need not sum to 1.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct ActionWeights {
    pub cursor_move: f64,
    pub safe_click: f64,
    pub tab_switch: f64,
    pub scroll: f64,
}

impl Default for ActionWeights {
    fn default() -> Self {
        ActionWeights {
            cursor_move: 0.4,
            safe_click: 0.1,
            tab_switch: 0.15,
            scroll: 0.2,
        }
    }
}

/// Scheduler configuration, immutable for the duration of a run.
///
/// Supplied to `start()` and normalized there: reversed ranges are swapped,
/// the check interval is clamped so cancellation latency stays bounded, and
/// degenerate weights fall back to the defaults.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Active phase duration range in seconds.
    pub active_min: u64,
    pub active_max: u64,
    /// Idle phase duration range in seconds. Both zero skips the phase.
    pub idle_min: u64,
    pub idle_max: u64,
    /// Interval between automation actions in seconds.
    pub action_interval_min: u64,
    pub action_interval_max: u64,
    /// Independent sub-timer between app switches, in seconds.
    pub app_switch_interval: u64,
    /// Upper bound of the random safe-click pre-delay, in milliseconds.
    pub click_delay_max: u64,
    /// Total automation budget in seconds, excluding paused time.
    /// Zero means no budget.
    pub total_runtime: u64,
    /// Quiet period in seconds before automation resumes after user input.
    pub user_idle_timeout: u64,
    /// Cancellation/countdown polling increment in milliseconds,
    /// clamped to 10..=100.
    pub check_interval: u64,
    pub weights: ActionWeights,
}

impl Default for SchedulerConfig {
    /// Defaults mirror the original tool: five-minute active phases,
    /// two-to-four minute idle phases, actions every 3-10 seconds, and no
    /// runtime budget.
    fn default() -> Self {
        SchedulerConfig {
            active_min: 300,
            active_max: 300,
            idle_min: 120,
            idle_max: 240,
            action_interval_min: 3,
            action_interval_max: 10,
            app_switch_interval: 60,
            click_delay_max: 2000,
            total_runtime: 0,
            user_idle_timeout: 30,
            check_interval: 100,
            weights: ActionWeights::default(),
        }
    }
}

impl SchedulerConfig {
    /// Returns a validated copy with out-of-range values clamped.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        if config.active_min > config.active_max {
            std::mem::swap(&mut config.active_min, &mut config.active_max);
        }
        if config.idle_min > config.idle_max {
            std::mem::swap(&mut config.idle_min, &mut config.idle_max);
        }
        if config.action_interval_min > config.action_interval_max {
            std::mem::swap(&mut config.action_interval_min, &mut config.action_interval_max);
        }
        // A zero-length active phase would spin the cycle loop.
        config.active_min = config.active_min.max(1);
        config.active_max = config.active_max.max(1);
        config.user_idle_timeout = config.user_idle_timeout.max(1);
        config.check_interval = config.check_interval.clamp(10, 100);

        let w = &mut config.weights;
        w.cursor_move = w.cursor_move.max(0.0);
        w.safe_click = w.safe_click.max(0.0);
        w.tab_switch = w.tab_switch.max(0.0);
        w.scroll = w.scroll.max(0.0);
        if w.cursor_move + w.safe_click + w.tab_switch + w.scroll <= 0.0 {
            config.weights = ActionWeights::default();
        }
        config
    }
}

/// Notification from the activity monitor, delivered over a channel so each
/// edge is consumed exactly once by the scheduling thread.
#[derive(Debug, Copy, Clone)]
enum MonitorSignal {
    Activity(ActivityEvent),
    Idle,
}

/// Why the scheduling loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoopEnd {
    Stopped,
    Expired,
    Fault(String),
}

/// Result of a single phase.
enum PhaseOutcome {
    Completed,
    Stopped,
    Expired,
}

/// Result of an interruptible wait.
enum WaitOutcome {
    Completed,
    /// A user-activity pause was taken and has resumed; the wait aborted.
    Interrupted,
    Stopped,
    Expired,
}

/// Result of a WaitingIdle interval.
enum PauseOutcome {
    Resumed,
    Stopped,
    Expired,
}

/// Wall-clock runtime accounting with pause exclusion.
///
/// Effective runtime is elapsed time minus every completed pause minus the
/// pause currently in progress, which keeps the remaining budget frozen for
/// the whole of a WaitingIdle interval.
struct RunClock {
    started: Instant,
    paused_total: Duration,
    pause_started: Option<Instant>,
    budget: Option<Duration>,
}

impl RunClock {
    fn new(total_runtime: u64) -> Self {
        RunClock {
            started: Instant::now(),
            paused_total: Duration::ZERO,
            pause_started: None,
            budget: (total_runtime > 0).then(|| Duration::from_secs(total_runtime)),
        }
    }

    fn begin_pause(&mut self) {
        if self.pause_started.is_none() {
            self.pause_started = Some(Instant::now());
        }
    }

    /// Folds the in-progress pause into the excluded total, returning its
    /// duration.
    fn end_pause(&mut self) -> Duration {
        match self.pause_started.take() {
            Some(started) => {
                let paused = started.elapsed();
                self.paused_total += paused;
                paused
            }
            None => Duration::ZERO,
        }
    }

    fn effective_elapsed(&self) -> Duration {
        let pause_in_progress = self.pause_started.map(|p| p.elapsed()).unwrap_or(Duration::ZERO);
        self.started
            .elapsed()
            .saturating_sub(self.paused_total)
            .saturating_sub(pause_in_progress)
    }

    fn expired(&self) -> bool {
        match self.budget {
            Some(budget) => self.effective_elapsed() >= budget,
            None => false,
        }
    }

    /// Remaining budget in whole seconds; `u64::MAX` when unbudgeted.
    fn remaining_secs(&self) -> u64 {
        match self.budget {
            Some(budget) => budget.saturating_sub(self.effective_elapsed()).as_secs(),
            None => u64::MAX,
        }
    }
}

type StateCallback = Box<dyn Fn(SchedulerState) + Send + Sync>;
type ExpiredCallback = Box<dyn Fn() + Send + Sync>;

/// State shared between the scheduler handle and the scheduling thread.
struct SchedulerShared {
    state: Mutex<SchedulerState>,
    on_state_change: Mutex<Option<StateCallback>>,
    on_runtime_expired: Mutex<Option<ExpiredCallback>>,
    stop: AtomicBool,
    running: AtomicBool,
}

impl SchedulerShared {
    /// The one synchronized state mutation. Observers get a clone taken
    /// under the lock, invoked after the lock is released.
    fn update<F: FnOnce(&mut SchedulerState)>(&self, mutate: F) {
        let snapshot = {
            let mut state = self.state.lock();
            mutate(&mut state);
            state.clone()
        };
        if let Some(callback) = &*self.on_state_change.lock() {
            callback(snapshot);
        }
    }

    fn snapshot(&self) -> SchedulerState {
        self.state.lock().clone()
    }
}

/// Round-robin rotation over the visible-window list.
///
/// The list is refreshed at most every [`WINDOW_LIST_REFRESH`] unless
/// invalidated after a failed switch attempt. The cursor advances past each
/// selected window so every eligible window is visited before any repeats.
struct WindowRotation {
    windows: Vec<WindowInfo>,
    cursor: usize,
    refreshed_at: Option<Instant>,
}

impl WindowRotation {
    fn new() -> Self {
        WindowRotation {
            windows: Vec::new(),
            cursor: 0,
            refreshed_at: None,
        }
    }

    fn invalidate(&mut self) {
        self.refreshed_at = None;
    }

    fn ensure_fresh(&mut self, executor: &dyn ActionExecutor) -> Result<()> {
        let stale = self.refreshed_at.map_or(true, |at| at.elapsed() >= WINDOW_LIST_REFRESH);
        if stale {
            self.windows = executor.list_visible_windows()?;
            self.refreshed_at = Some(Instant::now());
            if self.cursor >= self.windows.len() {
                self.cursor = 0;
            }
        }
        Ok(())
    }

    /// Picks the next switch target: skips the foreground window and
    /// minimized windows, preferring (probabilistically) another window of
    /// the foreground application when it has several.
    fn next_target(&mut self, executor: &dyn ActionExecutor, foreground: Option<&WindowInfo>) -> Result<WindowInfo> {
        if self.windows.is_empty() {
            return Err(ActionError::NoEligibleWindow.into());
        }

        let mut first_eligible = None;
        let mut first_same_app = None;
        for offset in 0..self.windows.len() {
            let index = (self.cursor + offset) % self.windows.len();
            let window = &self.windows[index];
            if foreground.map(|fg| fg.id) == Some(window.id) {
                continue;
            }
            // A failed minimized query skips the window rather than the tick.
            match executor.is_minimized(window.id) {
                Ok(true) | Err(_) => continue,
                Ok(false) => {}
            }
            if first_eligible.is_none() {
                first_eligible = Some(index);
            }
            if first_same_app.is_none() && foreground.map(|fg| fg.app.as_str()) == Some(window.app.as_str()) {
                first_same_app = Some(index);
            }
            if first_eligible.is_some() && first_same_app.is_some() {
                break;
            }
        }

        let chosen = match (first_same_app, first_eligible) {
            (Some(same), Some(_)) if rand::thread_rng().gen_bool(SAME_APP_CHANCE) => same,
            (_, Some(any)) => any,
            _ => return Err(ActionError::NoEligibleWindow.into()),
        };
        self.cursor = (chosen + 1) % self.windows.len();
        Ok(self.windows[chosen].clone())
    }
}

/// Everything the scheduling thread works with.
struct LoopCtx {
    shared: Arc<SchedulerShared>,
    monitor: Arc<Monitor>,
    executor: Arc<dyn ActionExecutor>,
    config: SchedulerConfig,
    signals: Receiver<MonitorSignal>,
    clock: RunClock,
    /// App-switch sub-timer baseline; reset on start, after each switch,
    /// and after every pause so a long pause cannot cause a burst of
    /// catch-up switches.
    app_switch_at: Instant,
    rotation: WindowRotation,
}

/// Drives the Active/Idle automation cycle.
///
/// Owns its [`Monitor`] and talks to the outside world through the
/// [`ActionExecutor`] it was constructed with and the state/expiry
/// callbacks. One instance supports any number of sequential runs; state is
/// reset, not recreated, on each `start()`.
pub struct Scheduler {
    monitor: Arc<Monitor>,
    executor: Arc<dyn ActionExecutor>,
    shared: Arc<SchedulerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(monitor: Monitor, executor: Arc<dyn ActionExecutor>) -> Self {
        Scheduler {
            monitor: Arc::new(monitor),
            executor,
            shared: Arc::new(SchedulerShared {
                state: Mutex::new(SchedulerState::default()),
                on_state_change: Mutex::new(None),
                on_runtime_expired: Mutex::new(None),
                stop: AtomicBool::new(false),
                running: AtomicBool::new(false),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Registers the observer invoked with a snapshot on every state
    /// mutation. Must be set before `start()`.
    pub fn set_on_state_change(&self, callback: impl Fn(SchedulerState) + Send + Sync + 'static) {
        *self.shared.on_state_change.lock() = Some(Box::new(callback));
    }

    /// Registers the callback invoked exactly once when the runtime budget
    /// is exhausted. Not invoked on manual stop.
    pub fn set_on_runtime_expired(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.shared.on_runtime_expired.lock() = Some(Box::new(callback));
    }

    /// Starts the automation cycle. Returns `false` if already running.
    pub fn start(&self, config: SchedulerConfig) -> bool {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            msg_debug!(Message::SchedulerAlreadyRunning.to_string());
            return false;
        }
        let config = config.normalized();
        self.shared.stop.store(false, Ordering::SeqCst);

        // Monitor notifications flow over a channel so the scheduling
        // thread consumes each edge exactly once.
        let (tx, rx) = std::sync::mpsc::channel();
        let activity_tx = tx.clone();
        self.monitor.set_on_activity(move |event| {
            activity_tx.send(MonitorSignal::Activity(event)).ok();
        });
        self.monitor.set_on_idle(move || {
            tx.send(MonitorSignal::Idle).ok();
        });
        self.monitor.set_idle_timeout(Duration::from_secs(config.user_idle_timeout));
        self.monitor.start();

        let clock = RunClock::new(config.total_runtime);
        let runtime_remaining = clock.remaining_secs();
        // Initial snapshot: reset, not recreated.
        self.shared.update(|state| {
            state.reset();
            state.is_running = true;
            state.runtime_remaining = runtime_remaining;
            state.last_action = "Starting...".to_string();
        });

        msg_debug!(format!(
            "{}",
            Message::SchedulerStarted {
                active_min: config.active_min,
                active_max: config.active_max,
                total_runtime: config.total_runtime,
            }
        ));

        let ctx = LoopCtx {
            shared: self.shared.clone(),
            monitor: self.monitor.clone(),
            executor: self.executor.clone(),
            config,
            signals: rx,
            clock,
            app_switch_at: Instant::now(),
            rotation: WindowRotation::new(),
        };
        let handle = std::thread::Builder::new()
            .name("cadence-scheduler".into())
            .spawn(move || run_loop(ctx))
            .ok();

        match handle {
            Some(handle) => {
                *self.handle.lock() = Some(handle);
                true
            }
            None => {
                self.monitor.stop();
                self.shared.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Stops the automation cycle and joins the scheduling thread within a
    /// bounded timeout (one check interval of loop latency plus the join
    /// timeout). Idempotent; returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        if !self.shared.running.load(Ordering::SeqCst) {
            msg_debug!(Message::SchedulerNotRunning.to_string());
            return false;
        }
        msg_debug!(Message::SchedulerStopping.to_string());
        self.shared.stop.store(true, Ordering::SeqCst);
        self.monitor.stop();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let deadline = Instant::now() + JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                msg_debug!(Message::SchedulerThreadNotJoined.to_string());
            }
        }
        msg_debug!(Message::SchedulerStopped.to_string());
        true
    }

    /// Whether the scheduling loop is currently running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// A copy of the current state.
    pub fn state(&self) -> SchedulerState {
        self.shared.snapshot()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Scheduling-thread entry point: runs the cycle, contains faults, and
/// guarantees monitor shutdown and a final Stopped snapshot.
fn run_loop(mut ctx: LoopCtx) {
    let end = match catch_unwind(AssertUnwindSafe(|| automation_loop(&mut ctx))) {
        Ok(end) => end,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            msg_debug!(Message::SchedulerFault(reason.clone()).to_string());
            LoopEnd::Fault(reason)
        }
    };

    // Monitor shutdown is guaranteed on every exit path.
    ctx.monitor.stop();

    let final_action = match &end {
        LoopEnd::Stopped => "Stopped".to_string(),
        LoopEnd::Expired => Message::RuntimeExpired.to_string(),
        LoopEnd::Fault(reason) => Message::SchedulerFault(reason.clone()).to_string(),
    };
    ctx.shared.update(|state| {
        state.phase = Phase::Stopped;
        state.is_running = false;
        state.phase_time_remaining = 0;
        state.next_action_in = 0;
        state.idle_wait_remaining = 0;
        state.last_action = final_action.clone();
    });
    ctx.shared.running.store(false, Ordering::SeqCst);

    if end == LoopEnd::Expired {
        msg_debug!(Message::RuntimeExpired.to_string());
        if let Some(callback) = &*ctx.shared.on_runtime_expired.lock() {
            callback();
        }
    }
}

/// Top-level cycle: Active phase, then Idle phase unless disabled.
fn automation_loop(ctx: &mut LoopCtx) -> LoopEnd {
    loop {
        if ctx.shared.stop.load(Ordering::SeqCst) {
            return LoopEnd::Stopped;
        }
        if ctx.clock.expired() {
            return LoopEnd::Expired;
        }

        let mut cycle = 0;
        ctx.shared.update(|state| {
            state.cycle_count += 1;
            cycle = state.cycle_count;
        });
        msg_debug!(Message::CycleStarted(cycle).to_string());

        match active_phase(ctx) {
            PhaseOutcome::Completed => {}
            PhaseOutcome::Stopped => return LoopEnd::Stopped,
            PhaseOutcome::Expired => return LoopEnd::Expired,
        }

        if ctx.config.idle_min == 0 && ctx.config.idle_max == 0 {
            msg_debug!(Message::IdlePhaseSkipped.to_string());
            continue;
        }
        match idle_phase(ctx) {
            PhaseOutcome::Completed => {}
            PhaseOutcome::Stopped => return LoopEnd::Stopped,
            PhaseOutcome::Expired => return LoopEnd::Expired,
        }
    }
}

/// One Active phase: randomized action cadence until the drawn duration
/// elapses, with pause time excluded from the accounting.
fn active_phase(ctx: &mut LoopCtx) -> PhaseOutcome {
    let duration = Duration::from_secs(rand::thread_rng().gen_range(ctx.config.active_min..=ctx.config.active_max));
    msg_debug!(Message::ActivePhaseStarted(duration.as_secs()).to_string());

    let started = Instant::now();
    let mut phase_paused = Duration::ZERO;
    ctx.shared.update(|state| {
        state.phase = Phase::Active;
        state.phase_time_remaining = duration.as_secs();
    });
    refresh_current_app(ctx);

    loop {
        if ctx.shared.stop.load(Ordering::SeqCst) {
            return PhaseOutcome::Stopped;
        }
        if ctx.clock.expired() {
            return PhaseOutcome::Expired;
        }

        let elapsed = started.elapsed().saturating_sub(phase_paused);
        let remaining = duration.saturating_sub(elapsed);
        if remaining.is_zero() {
            break;
        }
        let runtime_remaining = ctx.clock.remaining_secs();
        ctx.shared.update(|state| {
            state.phase_time_remaining = remaining.as_secs();
            state.runtime_remaining = runtime_remaining;
        });

        let interval =
            Duration::from_secs(rand::thread_rng().gen_range(ctx.config.action_interval_min..=ctx.config.action_interval_max));
        match interruptible_wait(ctx, interval, true, &mut phase_paused, Phase::Active) {
            WaitOutcome::Completed => {}
            // Re-evaluate the phase from the top after a pause.
            WaitOutcome::Interrupted => continue,
            WaitOutcome::Stopped => return PhaseOutcome::Stopped,
            WaitOutcome::Expired => return PhaseOutcome::Expired,
        }

        // App switches run on their own sub-timer; everything else is
        // weighted sampling.
        let description = if ctx.app_switch_at.elapsed() >= Duration::from_secs(ctx.config.app_switch_interval) {
            ctx.app_switch_at = Instant::now();
            app_switch(ctx)
        } else {
            general_action(ctx, &mut phase_paused)
        };
        msg_debug!(Message::ActionExecuted(description.clone()).to_string());
        ctx.shared.update(|state| {
            state.next_action_in = 0;
            state.last_action = description.clone();
        });
    }
    PhaseOutcome::Completed
}

/// One Idle phase: a quiet wait with the same interruption and expiry
/// checks as the Active phase. Never entered when both bounds are zero.
fn idle_phase(ctx: &mut LoopCtx) -> PhaseOutcome {
    let duration = Duration::from_secs(rand::thread_rng().gen_range(ctx.config.idle_min..=ctx.config.idle_max));
    msg_debug!(Message::IdlePhaseStarted(duration.as_secs()).to_string());

    let started = Instant::now();
    let mut phase_paused = Duration::ZERO;
    ctx.shared.update(|state| {
        state.phase = Phase::Idle;
        state.phase_time_remaining = duration.as_secs();
        state.last_action = "Idle - no actions".to_string();
    });

    loop {
        if ctx.shared.stop.load(Ordering::SeqCst) {
            return PhaseOutcome::Stopped;
        }
        if ctx.clock.expired() {
            return PhaseOutcome::Expired;
        }

        let elapsed = started.elapsed().saturating_sub(phase_paused);
        let remaining = duration.saturating_sub(elapsed);
        if remaining.is_zero() {
            break;
        }
        let runtime_remaining = ctx.clock.remaining_secs();
        ctx.shared.update(|state| {
            state.phase_time_remaining = remaining.as_secs();
            state.runtime_remaining = runtime_remaining;
        });

        if let Some(event) = drain_signals(ctx) {
            match wait_for_idle(ctx, event, &mut phase_paused, Phase::Idle) {
                PauseOutcome::Resumed => continue,
                PauseOutcome::Stopped => return PhaseOutcome::Stopped,
                PauseOutcome::Expired => return PhaseOutcome::Expired,
            }
        }
        std::thread::sleep(Duration::from_millis(ctx.config.check_interval));
    }
    PhaseOutcome::Completed
}

/// Waits `total` in short increments, reacting to cancellation, runtime
/// expiry, and activity edges. An edge takes the full WaitingIdle detour
/// before the wait reports `Interrupted`.
fn interruptible_wait(
    ctx: &mut LoopCtx,
    total: Duration,
    show_countdown: bool,
    phase_paused: &mut Duration,
    resume_phase: Phase,
) -> WaitOutcome {
    let started = Instant::now();
    loop {
        if ctx.shared.stop.load(Ordering::SeqCst) {
            return WaitOutcome::Stopped;
        }
        if ctx.clock.expired() {
            return WaitOutcome::Expired;
        }

        let elapsed = started.elapsed();
        if elapsed >= total {
            if show_countdown {
                ctx.shared.update(|state| state.next_action_in = 0);
            }
            return WaitOutcome::Completed;
        }
        if show_countdown {
            let runtime_remaining = ctx.clock.remaining_secs();
            ctx.shared.update(|state| {
                state.next_action_in = (total - elapsed).as_secs();
                state.runtime_remaining = runtime_remaining;
            });
        }

        if let Some(event) = drain_signals(ctx) {
            return match wait_for_idle(ctx, event, phase_paused, resume_phase) {
                PauseOutcome::Resumed => WaitOutcome::Interrupted,
                PauseOutcome::Stopped => WaitOutcome::Stopped,
                PauseOutcome::Expired => WaitOutcome::Expired,
            };
        }
        std::thread::sleep(Duration::from_millis(ctx.config.check_interval));
    }
}

/// Drains pending monitor signals, returning the latest activity edge if
/// any. Idle signals outside a pause carry no information and are dropped.
fn drain_signals(ctx: &mut LoopCtx) -> Option<ActivityEvent> {
    let mut edge = None;
    loop {
        match ctx.signals.try_recv() {
            Ok(MonitorSignal::Activity(event)) => edge = Some(event),
            Ok(MonitorSignal::Idle) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    edge
}

/// The WaitingIdle interval: blocks in short increments until the monitor
/// reports the user idle again, keeping the countdown fresh and the runtime
/// budget frozen. Resets the app-switch baseline on resume.
fn wait_for_idle(ctx: &mut LoopCtx, event: ActivityEvent, phase_paused: &mut Duration, resume_phase: Phase) -> PauseOutcome {
    let pause_started = Instant::now();
    ctx.clock.begin_pause();
    msg_debug!(Message::PauseEntered.to_string());

    let idle_wait = ctx.monitor.time_until_idle().as_secs();
    ctx.shared.update(|state| {
        state.phase = Phase::WaitingIdle;
        state.is_user_active = true;
        state.next_action_in = 0;
        state.idle_wait_remaining = idle_wait;
        state.last_action = format!("{} detected, waiting for idle", event.kind);
    });

    let outcome = loop {
        if ctx.shared.stop.load(Ordering::SeqCst) {
            break PauseOutcome::Stopped;
        }
        if ctx.clock.expired() {
            break PauseOutcome::Expired;
        }

        let mut resumed = false;
        loop {
            match ctx.signals.try_recv() {
                // Further edges only extend the monitor's own countdown.
                Ok(MonitorSignal::Activity(_)) => {}
                Ok(MonitorSignal::Idle) => {
                    resumed = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if resumed {
            break PauseOutcome::Resumed;
        }

        let idle_wait = ctx.monitor.time_until_idle().as_secs();
        ctx.shared.update(|state| state.idle_wait_remaining = idle_wait);
        std::thread::sleep(Duration::from_millis(ctx.config.check_interval));
    };

    let paused = ctx.clock.end_pause();
    *phase_paused += pause_started.elapsed();
    // A long pause must not cause a burst of catch-up app switches.
    ctx.app_switch_at = Instant::now();

    if let PauseOutcome::Resumed = outcome {
        msg_debug!(Message::PauseResumed(paused.as_secs()).to_string());
        ctx.shared.update(|state| {
            state.phase = resume_phase;
            state.is_user_active = false;
            state.idle_wait_remaining = 0;
        });
    }
    outcome
}

/// App switch with bounded round-robin retries; a failed attempt forces a
/// window-list refresh before the next one.
fn app_switch(ctx: &mut LoopCtx) -> String {
    let mut last_error: Option<anyhow::Error> = None;
    for attempt in 0..MAX_SWITCH_ATTEMPTS {
        if attempt > 0 {
            ctx.rotation.invalidate();
        }
        match try_app_switch(ctx) {
            Ok(description) => return description,
            Err(e) => {
                msg_debug!(Message::AppSwitchFailed(e.to_string()).to_string());
                last_error = Some(e);
            }
        }
    }
    let reason = last_error.map(|e| e.to_string()).unwrap_or_else(|| "unknown".to_string());
    Message::AppSwitchFailed(format!("{} (after {} attempts)", reason, MAX_SWITCH_ATTEMPTS)).to_string()
}

fn try_app_switch(ctx: &mut LoopCtx) -> Result<String> {
    let foreground = ctx.executor.foreground_window()?;
    ctx.rotation.ensure_fresh(ctx.executor.as_ref())?;
    let target = ctx.rotation.next_target(ctx.executor.as_ref(), foreground.as_ref())?;

    let switched = {
        let _suppress = ctx.monitor.suppress();
        ctx.executor.switch_to_window(target.id)?
    };
    if !switched {
        anyhow::bail!("window '{}' refused focus", target.title);
    }
    ctx.shared.update(|state| state.current_app = target.title.clone());
    Ok(format!("Switched to: {}", truncate(&target.title, 40)))
}

/// Weighted selection and execution of one general action.
fn general_action(ctx: &mut LoopCtx, phase_paused: &mut Duration) -> String {
    let w = &ctx.config.weights;
    let weights = [w.cursor_move, w.safe_click, w.tab_switch, w.scroll];
    // normalized() guarantees non-negative weights with a positive sum.
    let choice = match WeightedIndex::new(weights) {
        Ok(dist) => dist.sample(&mut rand::thread_rng()),
        Err(_) => 0,
    };
    match choice {
        1 => safe_click(ctx, phase_paused),
        2 => tab_switch(ctx),
        3 => scroll(ctx),
        _ => cursor_move(ctx),
    }
}

fn cursor_move(ctx: &mut LoopCtx) -> String {
    let result = {
        let _suppress = ctx.monitor.suppress();
        ctx.executor.move_cursor_random()
    };
    match result {
        Ok((x, y)) => format!("Mouse moved to ({}, {})", x, y),
        Err(e) => failure_text("Cursor move", &e),
    }
}

/// Safe click with an interruptible random pre-delay: cancellation or an
/// activity edge mid-delay abandons the click.
fn safe_click(ctx: &mut LoopCtx, phase_paused: &mut Duration) -> String {
    let delay = Duration::from_millis(rand::thread_rng().gen_range(0..=ctx.config.click_delay_max));
    let resume_phase = ctx.shared.snapshot().phase;
    match interruptible_wait(ctx, delay, false, phase_paused, resume_phase) {
        WaitOutcome::Completed => {
            let result = {
                let _suppress = ctx.monitor.suppress();
                ctx.executor.safe_click()
            };
            match result {
                Ok((x, y)) => format!("Safe click at ({}, {})", x, y),
                Err(e) => failure_text("Safe click", &e),
            }
        }
        WaitOutcome::Interrupted => "Safe click cancelled (user activity)".to_string(),
        WaitOutcome::Stopped | WaitOutcome::Expired => "Safe click cancelled".to_string(),
    }
}

/// In-app tab switch; degrades to scroll or cursor move when the foreground
/// application has no tab strip.
fn tab_switch(ctx: &mut LoopCtx) -> String {
    let app = current_app(ctx);
    if supports_tabs(&app) {
        let result = {
            let _suppress = ctx.monitor.suppress();
            ctx.executor.switch_tab(&app)
        };
        match result {
            Ok(description) => description,
            Err(e) => failure_text("Tab switch", &e),
        }
    } else if supports_scroll(&app) {
        scroll(ctx)
    } else {
        cursor_move(ctx)
    }
}

/// Scroll burst; degrades to a cursor move for non-scrollable apps.
fn scroll(ctx: &mut LoopCtx) -> String {
    let app = current_app(ctx);
    if supports_scroll(&app) {
        let result = {
            let _suppress = ctx.monitor.suppress();
            ctx.executor.scroll_sequence()
        };
        match result {
            Ok(description) => format!("{} in {}", description, truncate(&app, 20)),
            Err(e) => failure_text("Scroll", &e),
        }
    } else {
        cursor_move(ctx)
    }
}

/// Foreground window title for context-sensitive actions; a failed query
/// falls back to the last known title.
fn current_app(ctx: &mut LoopCtx) -> String {
    match ctx.executor.foreground_window() {
        Ok(Some(window)) => {
            let title = window.title.clone();
            ctx.shared.update(|state| state.current_app = title.clone());
            title
        }
        Ok(None) => String::new(),
        Err(_) => ctx.shared.snapshot().current_app,
    }
}

fn refresh_current_app(ctx: &mut LoopCtx) {
    if let Ok(Some(window)) = ctx.executor.foreground_window() {
        ctx.shared.update(|state| state.current_app = window.title.clone());
    }
}

fn failure_text(action: &str, error: &anyhow::Error) -> String {
    let text = format!("{} failed: {}", action, error);
    msg_debug!(Message::ActionFailed(text.clone()).to_string());
    text
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max).collect();
        format!("{}...", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_swaps_reversed_ranges() {
        let config = SchedulerConfig {
            active_min: 400,
            active_max: 100,
            idle_min: 50,
            idle_max: 10,
            ..SchedulerConfig::default()
        }
        .normalized();
        assert_eq!((config.active_min, config.active_max), (100, 400));
        assert_eq!((config.idle_min, config.idle_max), (10, 50));
    }

    #[test]
    fn normalized_clamps_check_interval_and_timeout() {
        let config = SchedulerConfig {
            check_interval: 5000,
            user_idle_timeout: 0,
            ..SchedulerConfig::default()
        }
        .normalized();
        assert_eq!(config.check_interval, 100);
        assert_eq!(config.user_idle_timeout, 1);
    }

    #[test]
    fn normalized_rejects_degenerate_weights() {
        let config = SchedulerConfig {
            weights: ActionWeights {
                cursor_move: -1.0,
                safe_click: 0.0,
                tab_switch: 0.0,
                scroll: 0.0,
            },
            ..SchedulerConfig::default()
        }
        .normalized();
        assert_eq!(config.weights, ActionWeights::default());
    }

    #[test]
    fn run_clock_freezes_remaining_during_pause() {
        let mut clock = RunClock::new(30);
        let before = clock.remaining_secs();
        clock.begin_pause();
        std::thread::sleep(Duration::from_millis(150));
        let during = clock.remaining_secs();
        clock.end_pause();
        assert_eq!(before, during);
        assert!(clock.paused_total >= Duration::from_millis(150));
    }

    #[test]
    fn run_clock_unbudgeted_never_expires() {
        let clock = RunClock::new(0);
        assert!(!clock.expired());
        assert_eq!(clock.remaining_secs(), u64::MAX);
    }

    /// A fixed window list where switching updates the foreground window.
    struct StaticWindows {
        windows: Vec<WindowInfo>,
        foreground: Mutex<Option<u64>>,
        minimized: Vec<u64>,
    }

    impl StaticWindows {
        fn new(windows: Vec<WindowInfo>, foreground: Option<u64>) -> Self {
            StaticWindows {
                windows,
                foreground: Mutex::new(foreground),
                minimized: Vec::new(),
            }
        }
    }

    impl ActionExecutor for StaticWindows {
        fn move_cursor_random(&self) -> Result<(i32, i32)> {
            Ok((0, 0))
        }
        fn safe_click(&self) -> Result<(i32, i32)> {
            Ok((0, 0))
        }
        fn switch_tab(&self, _app_hint: &str) -> Result<String> {
            Ok("Switched tab".to_string())
        }
        fn scroll_sequence(&self) -> Result<String> {
            Ok("Scrolled".to_string())
        }
        fn list_visible_windows(&self) -> Result<Vec<WindowInfo>> {
            Ok(self.windows.clone())
        }
        fn switch_to_window(&self, id: u64) -> Result<bool> {
            *self.foreground.lock() = Some(id);
            Ok(true)
        }
        fn is_minimized(&self, id: u64) -> Result<bool> {
            Ok(self.minimized.contains(&id))
        }
        fn foreground_window(&self) -> Result<Option<WindowInfo>> {
            let id = *self.foreground.lock();
            Ok(self.windows.iter().find(|w| Some(w.id) == id).cloned())
        }
    }

    fn window(id: u64, app: &str) -> WindowInfo {
        WindowInfo {
            id,
            title: format!("{} - window {}", app, id),
            app: app.to_string(),
        }
    }

    #[test]
    fn rotation_visits_all_windows_before_repeating() {
        let executor = StaticWindows::new(vec![window(1, "alpha"), window(2, "beta"), window(3, "gamma")], Some(1));
        let mut rotation = WindowRotation::new();
        rotation.ensure_fresh(&executor).unwrap();

        let mut visited = Vec::new();
        for _ in 0..3 {
            let foreground = executor.foreground_window().unwrap();
            let target = rotation.next_target(&executor, foreground.as_ref()).unwrap();
            executor.switch_to_window(target.id).unwrap();
            visited.push(target.id);
        }
        visited.sort_unstable();
        assert_eq!(visited, vec![1, 2, 3]);
    }

    #[test]
    fn rotation_skips_minimized_and_foreground() {
        let mut executor = StaticWindows::new(vec![window(1, "alpha"), window(2, "beta"), window(3, "gamma")], Some(1));
        executor.minimized.push(2);
        let mut rotation = WindowRotation::new();
        rotation.ensure_fresh(&executor).unwrap();

        let foreground = executor.foreground_window().unwrap();
        let target = rotation.next_target(&executor, foreground.as_ref()).unwrap();
        assert_eq!(target.id, 3);
    }

    #[test]
    fn rotation_reports_no_eligible_window() {
        let mut executor = StaticWindows::new(vec![window(1, "alpha"), window(2, "beta")], Some(1));
        executor.minimized.push(2);
        let mut rotation = WindowRotation::new();
        rotation.ensure_fresh(&executor).unwrap();

        let foreground = executor.foreground_window().unwrap();
        let error = rotation.next_target(&executor, foreground.as_ref()).unwrap_err();
        assert!(error.to_string().contains("no eligible window"));
    }

    #[test]
    fn rotation_same_app_preference_stays_within_app() {
        // With only windows of the foreground application eligible, the
        // preference cannot leave the app regardless of the coin flip.
        let executor = StaticWindows::new(vec![window(1, "alpha"), window(2, "alpha"), window(3, "alpha")], Some(1));
        let mut rotation = WindowRotation::new();
        rotation.ensure_fresh(&executor).unwrap();

        let foreground = executor.foreground_window().unwrap();
        let target = rotation.next_target(&executor, foreground.as_ref()).unwrap();
        assert_eq!(target.app, "alpha");
        assert_ne!(target.id, 1);
    }
}
