//! User activity monitoring through polled input-device state.
//!
//! The monitor samples discrete input state (mouse buttons plus a fixed key
//! set) at a short fixed cadence and turns not-pressed→pressed transitions
//! into activity edges. Pointer movement never counts as activity: synthetic
//! cursor motion generated by the scheduler would otherwise pause the very
//! automation that produced it.
//!
//! Two notifications are exposed as callbacks:
//!
//! - `on_activity(kind)` fires once per detected press edge.
//! - `on_idle()` fires at most once per continuous idle stretch of at least
//!   `idle_timeout`, and is re-armed only by the next activity edge.
//!
//! Device access sits behind [`DeviceStateSource`] so tests can script input
//! without touching real devices. The production source feeds a
//! process-lifetime `rdev` listener thread into a shared pressed-state table
//! that the poll loop samples.

use crate::libs::messages::Message;
use crate::msg_debug;
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long `stop()` waits for the poll thread before giving up.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Kind of user input behind an activity edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    Click,
    KeyPress,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ActivityKind::Click => write!(f, "Mouse click"),
            ActivityKind::KeyPress => write!(f, "Key press"),
        }
    }
}

/// A single detected activity edge.
///
/// Ephemeral: produced by the monitor's check cadence and consumed once by
/// whoever registered the activity callback.
#[derive(Debug, Copy, Clone)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub at: Instant,
}

/// Snapshot of the monitor's idle accounting.
///
/// Owned exclusively by the monitor; every read gets a copy.
#[derive(Debug, Clone, Default)]
pub struct IdleState {
    /// Whether an activity edge was seen within the idle timeout.
    pub is_user_active: bool,
    /// When the last activity edge occurred, if any.
    pub last_activity_time: Option<Instant>,
    /// Time elapsed since the last activity edge.
    pub idle_duration: Duration,
    /// Kind of the last detected activity.
    pub last_activity_kind: Option<ActivityKind>,
}

/// One sample of the tracked input devices.
///
/// Contains every tracked input that is currently held down. Edge detection
/// compares consecutive samples, so an input present in the current sample
/// but absent from the previous one is a press edge.
#[derive(Debug, Clone, Default)]
pub struct DeviceSample {
    pub buttons: HashSet<rdev::Button>,
    pub keys: HashSet<rdev::Key>,
}

/// Source of input-device state samples.
///
/// The seam between the monitor and the OS: production uses [`RdevSource`],
/// tests inject scripted samples. A failed sample is logged and treated as
/// "no activity this sample", never propagated.
pub trait DeviceStateSource: Send {
    fn sample(&mut self) -> Result<DeviceSample>;
}

/// Activity monitor configuration settings.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Inactivity duration in seconds before the user counts as idle.
    pub idle_timeout: u64,
    /// Interval in milliseconds between device-state samples. Activity is
    /// detected within one such interval; lower values respond faster at
    /// slightly higher CPU cost.
    pub poll_interval: u64,
}

impl Default for MonitorConfig {
    /// Defaults match the original tool's calibration: a 30 second quiet
    /// period before automation may resume, sampled every 50ms.
    fn default() -> Self {
        MonitorConfig {
            idle_timeout: 30,
            poll_interval: 50,
        }
    }
}

type ActivityCallback = Box<dyn Fn(ActivityEvent) + Send + Sync>;
type IdleCallback = Box<dyn Fn() + Send + Sync>;

/// State shared between the monitor handle and its poll thread.
struct MonitorShared {
    state: Mutex<InnerState>,
    idle_timeout: Mutex<Duration>,
    /// Suppression depth; detection is off while non-zero.
    suppress_count: AtomicUsize,
    stop: AtomicBool,
    running: AtomicBool,
    on_activity: Mutex<Option<ActivityCallback>>,
    on_idle: Mutex<Option<IdleCallback>>,
}

#[derive(Default)]
struct InnerState {
    last_activity_time: Option<Instant>,
    last_activity_kind: Option<ActivityKind>,
    idle_duration: Duration,
    is_user_active: bool,
    idle_notified: bool,
}

/// Suppresses activity detection for its lifetime.
///
/// Acquired immediately before injecting synthetic input and released on
/// drop, so detection is restored on every exit path including panics and
/// early returns. Guards nest; detection resumes when the last one drops.
pub struct SuppressionGuard {
    shared: Arc<MonitorShared>,
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        self.shared.suppress_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Polls input-device state and reports activity edges and idle stretches.
pub struct Monitor {
    config: MonitorConfig,
    shared: Arc<MonitorShared>,
    /// The device source parks here between runs and is taken by the poll
    /// thread while running.
    source_slot: Arc<Mutex<Option<Box<dyn DeviceStateSource>>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Monitor {
    /// Creates a monitor over the given device source.
    pub fn new(config: MonitorConfig, source: Box<dyn DeviceStateSource>) -> Self {
        let shared = Arc::new(MonitorShared {
            state: Mutex::new(InnerState::default()),
            idle_timeout: Mutex::new(Duration::from_secs(config.idle_timeout)),
            suppress_count: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            running: AtomicBool::new(false),
            on_activity: Mutex::new(None),
            on_idle: Mutex::new(None),
        });
        Monitor {
            config,
            shared,
            source_slot: Arc::new(Mutex::new(Some(source))),
            handle: Mutex::new(None),
        }
    }

    /// Overrides the idle timeout. Takes effect from the next sample; the
    /// scheduler calls this with its own quiet-period setting before
    /// starting the monitor.
    pub fn set_idle_timeout(&self, timeout: Duration) {
        *self.shared.idle_timeout.lock() = timeout;
    }

    /// Registers the activity-edge callback. Must be set before `start()`.
    pub fn set_on_activity(&self, callback: impl Fn(ActivityEvent) + Send + Sync + 'static) {
        *self.shared.on_activity.lock() = Some(Box::new(callback));
    }

    /// Registers the idle callback. Must be set before `start()`.
    pub fn set_on_idle(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.shared.on_idle.lock() = Some(Box::new(callback));
    }

    /// Starts the polling loop. Returns `false` if already running.
    pub fn start(&self) -> bool {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            msg_debug!(Message::MonitorAlreadyRunning.to_string());
            return false;
        }

        let source = match self.source_slot.lock().take() {
            Some(source) => source,
            None => {
                // Previous thread still owns the source; treat as running.
                return false;
            }
        };

        // The user counts as active at start, so the first idle notification
        // comes only after a full quiet period.
        {
            let mut state = self.shared.state.lock();
            *state = InnerState {
                last_activity_time: Some(Instant::now()),
                is_user_active: true,
                ..InnerState::default()
            };
        }
        self.shared.stop.store(false, Ordering::SeqCst);

        let shared = self.shared.clone();
        let slot = self.source_slot.clone();
        let poll_interval = Duration::from_millis(self.config.poll_interval);
        let handle = std::thread::Builder::new()
            .name("cadence-monitor".into())
            .spawn(move || {
                let mut source = source;
                poll_loop(&shared, source.as_mut(), poll_interval);
                *slot.lock() = Some(source);
                shared.running.store(false, Ordering::SeqCst);
            })
            .ok();

        match handle {
            Some(handle) => {
                *self.handle.lock() = Some(handle);
                msg_debug!(format!(
                    "{}",
                    Message::MonitorStarted {
                        idle_timeout: self.config.idle_timeout,
                        poll_interval: self.config.poll_interval,
                    }
                ));
                true
            }
            None => {
                self.shared.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Signals the poll loop to exit and joins it within a bounded timeout.
    /// Safe to call when not running.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let deadline = Instant::now() + JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
                msg_debug!(Message::MonitorStopped.to_string());
            } else {
                msg_debug!(Message::MonitorThreadNotJoined.to_string());
            }
        }
    }

    /// Whether the polling loop is currently running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Suppresses detection until the returned guard is dropped.
    pub fn suppress(&self) -> SuppressionGuard {
        self.shared.suppress_count.fetch_add(1, Ordering::SeqCst);
        SuppressionGuard { shared: self.shared.clone() }
    }

    /// Whether an activity edge occurred within the idle timeout.
    pub fn is_user_active(&self) -> bool {
        let timeout = *self.shared.idle_timeout.lock();
        let state = self.shared.state.lock();
        match state.last_activity_time {
            Some(last) => last.elapsed() < timeout,
            None => false,
        }
    }

    /// Time remaining until the user counts as idle; zero when already idle
    /// or when no activity has been seen yet.
    pub fn time_until_idle(&self) -> Duration {
        let timeout = *self.shared.idle_timeout.lock();
        let state = self.shared.state.lock();
        match state.last_activity_time {
            Some(last) => timeout.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// A copy of the current idle accounting.
    pub fn state(&self) -> IdleState {
        let state = self.shared.state.lock();
        IdleState {
            is_user_active: state.is_user_active,
            last_activity_time: state.last_activity_time,
            idle_duration: state
                .last_activity_time
                .map(|last| last.elapsed())
                .unwrap_or(state.idle_duration),
            last_activity_kind: state.last_activity_kind,
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fixed-cadence sampling loop: edge detection plus idle accounting.
///
/// The body never blocks outside the interval sleep; callbacks are invoked
/// with no lock held.
fn poll_loop(shared: &MonitorShared, source: &mut dyn DeviceStateSource, poll_interval: Duration) {
    let mut prev = DeviceSample::default();
    // Prime the previous sample so inputs already held at start are not
    // reported as edges.
    if let Ok(sample) = source.sample() {
        prev = sample;
    }

    while !shared.stop.load(Ordering::SeqCst) {
        if shared.suppress_count.load(Ordering::SeqCst) > 0 {
            // Keep the previous sample fresh while suppressed: a synthetic
            // press still held when suppression lifts must not register as
            // an edge on the next tick.
            if let Ok(sample) = source.sample() {
                prev = sample;
            }
        } else {
            match source.sample() {
                Ok(sample) => {
                    let click_edge = sample.buttons.iter().any(|b| !prev.buttons.contains(b));
                    let key_edge = sample.keys.iter().any(|k| !prev.keys.contains(k));

                    if click_edge || key_edge {
                        let kind = if click_edge { ActivityKind::Click } else { ActivityKind::KeyPress };
                        let event = ActivityEvent {
                            kind,
                            at: Instant::now(),
                        };
                        {
                            let mut state = shared.state.lock();
                            state.last_activity_time = Some(event.at);
                            state.last_activity_kind = Some(kind);
                            state.idle_duration = Duration::ZERO;
                            state.is_user_active = true;
                            state.idle_notified = false;
                        }
                        msg_debug!(Message::ActivityDetected(kind.to_string()).to_string());
                        if let Some(callback) = &*shared.on_activity.lock() {
                            callback(event);
                        }
                    }
                    prev = sample;
                }
                Err(e) => {
                    // A failed read counts as no activity this sample.
                    msg_debug!(Message::MonitorSampleFailed(e.to_string()).to_string());
                }
            }
        }

        // Idle accounting runs every tick, independent of edge detection.
        let idle_timeout = *shared.idle_timeout.lock();
        let notify_idle = {
            let mut state = shared.state.lock();
            match state.last_activity_time {
                Some(last) => {
                    let elapsed = last.elapsed();
                    state.idle_duration = elapsed;
                    if elapsed >= idle_timeout {
                        state.is_user_active = false;
                        if !state.idle_notified {
                            state.idle_notified = true;
                            true
                        } else {
                            false
                        }
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        if notify_idle {
            msg_debug!(Message::UserIdle.to_string());
            if let Some(callback) = &*shared.on_idle.lock() {
                callback();
            }
        }

        std::thread::sleep(poll_interval);
    }
}

/// Keys that count toward activity detection.
///
/// Covers the inputs a person actually types with; modifier-only presses and
/// exotic keys are ignored, mirroring the fixed key set the original polled.
fn is_tracked_key(key: rdev::Key) -> bool {
    use rdev::Key::*;
    matches!(
        key,
        KeyA | KeyB | KeyC | KeyD | KeyE | KeyF | KeyG | KeyH | KeyI | KeyJ | KeyK | KeyL | KeyM | KeyN | KeyO
            | KeyP | KeyQ | KeyR | KeyS | KeyT | KeyU | KeyV | KeyW | KeyX | KeyY | KeyZ
            | Num0 | Num1 | Num2 | Num3 | Num4 | Num5 | Num6 | Num7 | Num8 | Num9
            | F1 | F2 | F3 | F4 | F5 | F6 | F7 | F8 | F9 | F10 | F11 | F12
            | Space | Return | Tab | Escape | Backspace | Delete | Insert
            | UpArrow | DownArrow | LeftArrow | RightArrow
            | Home | End | PageUp | PageDown
    )
}

/// Pressed-input table maintained by the global listener thread.
#[derive(Default)]
struct PressedState {
    buttons: HashSet<rdev::Button>,
    keys: HashSet<rdev::Key>,
}

static LISTENER_STATE: OnceLock<Arc<Mutex<PressedState>>> = OnceLock::new();

/// Production device source backed by a global `rdev` listener.
///
/// `rdev::listen` blocks its thread for the process lifetime and cannot be
/// unhooked, so the listener is started once and shared by every
/// `RdevSource`; it only maintains the pressed-state table. All cadence
/// control lives in the monitor's poll loop, which samples the table.
/// Pointer movement and wheel events are deliberately not recorded.
pub struct RdevSource {
    state: Arc<Mutex<PressedState>>,
}

impl RdevSource {
    pub fn new() -> Self {
        let state = LISTENER_STATE
            .get_or_init(|| {
                let state = Arc::new(Mutex::new(PressedState::default()));
                let listener_state = state.clone();
                std::thread::Builder::new()
                    .name("cadence-input-listener".into())
                    .spawn(move || listener_loop(listener_state))
                    .ok();
                state
            })
            .clone();
        RdevSource { state }
    }
}

impl Default for RdevSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStateSource for RdevSource {
    fn sample(&mut self) -> Result<DeviceSample> {
        let state = self.state.lock();
        Ok(DeviceSample {
            buttons: state.buttons.clone(),
            keys: state.keys.clone(),
        })
    }
}

/// Runs `rdev::listen`, restarting it on error to keep monitoring alive.
fn listener_loop(state: Arc<Mutex<PressedState>>) {
    loop {
        let listener_state = state.clone();
        if let Err(e) = rdev::listen(move |event: rdev::Event| {
            let mut pressed = listener_state.lock();
            match event.event_type {
                rdev::EventType::ButtonPress(button) => {
                    pressed.buttons.insert(button);
                }
                rdev::EventType::ButtonRelease(button) => {
                    pressed.buttons.remove(&button);
                }
                rdev::EventType::KeyPress(key) if is_tracked_key(key) => {
                    pressed.keys.insert(key);
                }
                rdev::EventType::KeyRelease(key) => {
                    pressed.keys.remove(&key);
                }
                // MouseMove and Wheel are not activity.
                _ => {}
            }
        }) {
            msg_debug!(format!("Input listener failed: {:?}, retrying in 1s", e));
            std::thread::sleep(Duration::from_secs(1));
        } else {
            break;
        }
    }
}
