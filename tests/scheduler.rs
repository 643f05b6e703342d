#[cfg(test)]
mod tests {
    use anyhow::Result;
    use cadence::libs::executor::{ActionExecutor, WindowInfo};
    use cadence::libs::monitor::{DeviceSample, DeviceStateSource, Monitor, MonitorConfig};
    use cadence::libs::scheduler::{Scheduler, SchedulerConfig};
    use cadence::libs::state::Phase;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Device source whose sample the test mutates to simulate user input.
    struct SharedSource(Arc<Mutex<DeviceSample>>);

    impl DeviceStateSource for SharedSource {
        fn sample(&mut self) -> Result<DeviceSample> {
            Ok(self.0.lock().clone())
        }
    }

    /// Executor that counts input actions and has no windows to manage.
    struct CountingExecutor {
        actions: Arc<AtomicUsize>,
    }

    impl ActionExecutor for CountingExecutor {
        fn move_cursor_random(&self) -> Result<(i32, i32)> {
            self.actions.fetch_add(1, Ordering::SeqCst);
            Ok((100, 100))
        }
        fn safe_click(&self) -> Result<(i32, i32)> {
            self.actions.fetch_add(1, Ordering::SeqCst);
            Ok((5, 5))
        }
        fn switch_tab(&self, app_hint: &str) -> Result<String> {
            self.actions.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Switched tab (Ctrl+Tab) in {}", app_hint))
        }
        fn scroll_sequence(&self) -> Result<String> {
            self.actions.fetch_add(1, Ordering::SeqCst);
            Ok("Scrolled down 3 ticks".to_string())
        }
        fn list_visible_windows(&self) -> Result<Vec<WindowInfo>> {
            Ok(Vec::new())
        }
        fn switch_to_window(&self, _id: u64) -> Result<bool> {
            Ok(false)
        }
        fn is_minimized(&self, _id: u64) -> Result<bool> {
            Ok(false)
        }
        fn foreground_window(&self) -> Result<Option<WindowInfo>> {
            Ok(None)
        }
    }

    struct Harness {
        scheduler: Scheduler,
        sample: Arc<Mutex<DeviceSample>>,
        actions: Arc<AtomicUsize>,
    }

    fn harness() -> Harness {
        let sample = Arc::new(Mutex::new(DeviceSample::default()));
        let monitor = Monitor::new(
            MonitorConfig {
                idle_timeout: 1,
                poll_interval: 20,
            },
            Box::new(SharedSource(sample.clone())),
        );
        let actions = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(monitor, Arc::new(CountingExecutor { actions: actions.clone() }));
        Harness {
            scheduler,
            sample,
            actions,
        }
    }

    /// Base configuration for fast tests; individual tests override fields.
    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            active_min: 30,
            active_max: 30,
            idle_min: 0,
            idle_max: 0,
            action_interval_min: 1,
            action_interval_max: 1,
            // Keep the sub-timer out of the way unless a test wants it.
            app_switch_interval: 3600,
            click_delay_max: 0,
            total_runtime: 0,
            user_idle_timeout: 1,
            check_interval: 20,
            ..SchedulerConfig::default()
        }
    }

    fn press(harness: &Harness) {
        harness.sample.lock().buttons.insert(rdev::Button::Left);
    }

    fn release(harness: &Harness) {
        harness.sample.lock().buttons.remove(&rdev::Button::Left);
    }

    fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_start_then_stop_leaves_stopped() {
        let harness = harness();
        assert!(harness.scheduler.start(fast_config()));
        assert!(harness.scheduler.is_running());
        assert!(!harness.scheduler.start(fast_config()), "second start must be rejected");

        assert!(harness.scheduler.stop());
        assert!(!harness.scheduler.is_running());
        let state = harness.scheduler.state();
        assert_eq!(state.phase, Phase::Stopped);
        assert!(!state.is_running);
        assert_eq!(state.last_action, "Stopped");

        // stop is idempotent
        assert!(!harness.scheduler.stop());
    }

    #[test]
    fn test_zero_idle_skips_idle_phase_and_actions_fire() {
        let harness = harness();
        let config = SchedulerConfig {
            active_min: 2,
            active_max: 2,
            ..fast_config()
        };
        assert!(harness.scheduler.start(config));

        // Two active phases back to back: the idle phase is skipped, so the
        // cycle count advances and actions keep firing.
        let saw_idle = Arc::new(AtomicUsize::new(0));
        let deadline = Instant::now() + Duration::from_millis(4800);
        while Instant::now() < deadline {
            if harness.scheduler.state().phase == Phase::Idle {
                saw_idle.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        let state = harness.scheduler.state();
        assert_eq!(saw_idle.load(Ordering::SeqCst), 0, "idle phase must be skipped");
        assert!(state.cycle_count >= 2, "expected a second cycle, got {}", state.cycle_count);
        assert!(
            harness.actions.load(Ordering::SeqCst) >= 2,
            "expected roughly one action per second"
        );

        harness.scheduler.stop();
    }

    #[test]
    fn test_activity_edge_pauses_then_resumes_with_frozen_budget() {
        let harness = harness();
        let config = SchedulerConfig {
            total_runtime: 60,
            ..fast_config()
        };
        assert!(harness.scheduler.start(config));
        std::thread::sleep(Duration::from_millis(1200));
        let before_pause = harness.scheduler.state().runtime_remaining;

        press(&harness);
        assert!(
            wait_for(|| harness.scheduler.state().phase == Phase::WaitingIdle, Duration::from_millis(500)),
            "an activity edge must enter WaitingIdle within the polling cadence"
        );
        release(&harness);

        let state = harness.scheduler.state();
        assert!(state.is_user_active);
        assert!(state.idle_wait_remaining <= 1);
        let frozen = state.runtime_remaining;
        assert!(before_pause.abs_diff(frozen) <= 1);

        // The budget must not tick while paused.
        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(harness.scheduler.state().runtime_remaining, frozen);

        // One quiet second after the edge, the phase resumes.
        assert!(
            wait_for(|| harness.scheduler.state().phase == Phase::Active, Duration::from_millis(1500)),
            "the interrupted phase must resume after the quiet period"
        );
        let state = harness.scheduler.state();
        assert!(!state.is_user_active);
        assert_eq!(state.idle_wait_remaining, 0);

        harness.scheduler.stop();
    }

    #[test]
    fn test_runtime_expiry_fires_callback_once() {
        let harness = harness();
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = expired.clone();
        harness.scheduler.set_on_runtime_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let config = SchedulerConfig {
            total_runtime: 2,
            ..fast_config()
        };
        assert!(harness.scheduler.start(config));

        assert!(
            wait_for(|| !harness.scheduler.is_running(), Duration::from_secs(4)),
            "the loop must end when the budget is exhausted"
        );
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(expired.load(Ordering::SeqCst), 1);
        let state = harness.scheduler.state();
        assert_eq!(state.phase, Phase::Stopped);
        assert!(state.last_action.contains("Runtime"));

        // Already stopped: a manual stop now reports nothing to do.
        assert!(!harness.scheduler.stop());
    }

    #[test]
    fn test_manual_stop_does_not_fire_expiry() {
        let harness = harness();
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = expired.clone();
        harness.scheduler.set_on_runtime_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(harness.scheduler.start(fast_config()));
        std::thread::sleep(Duration::from_millis(500));
        assert!(harness.scheduler.stop());

        assert_eq!(expired.load(Ordering::SeqCst), 0);
        assert_eq!(harness.scheduler.state().phase, Phase::Stopped);
    }

    #[test]
    fn test_state_snapshots_reach_observer() {
        let harness = harness();
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let sink = snapshots.clone();
        harness.scheduler.set_on_state_change(move |snapshot| {
            sink.lock().push(snapshot);
        });

        assert!(harness.scheduler.start(fast_config()));
        std::thread::sleep(Duration::from_millis(600));
        harness.scheduler.stop();

        let snapshots = snapshots.lock();
        assert!(!snapshots.is_empty());
        // The initial snapshot is emitted before the loop begins.
        assert_eq!(snapshots[0].last_action, "Starting...");
        assert!(snapshots[0].is_running);
        // The final snapshot reports the stopped lifecycle.
        let last = snapshots.last().unwrap();
        assert_eq!(last.phase, Phase::Stopped);
        assert!(!last.is_running);
    }

    /// Executor with a static window list; switching moves the foreground.
    struct SwitchingExecutor {
        windows: Vec<WindowInfo>,
        foreground: Mutex<Option<u64>>,
        order: Mutex<Vec<u64>>,
    }

    impl ActionExecutor for SwitchingExecutor {
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
            self.order.lock().push(id);
            Ok(true)
        }
        fn is_minimized(&self, _id: u64) -> Result<bool> {
            Ok(false)
        }
        fn foreground_window(&self) -> Result<Option<WindowInfo>> {
            let id = *self.foreground.lock();
            Ok(self.windows.iter().find(|w| Some(w.id) == id).cloned())
        }
    }

    #[test]
    fn test_app_switches_rotate_fairly() {
        let windows = vec![
            WindowInfo {
                id: 1,
                title: "alpha - one".into(),
                app: "alpha".into(),
            },
            WindowInfo {
                id: 2,
                title: "beta - two".into(),
                app: "beta".into(),
            },
            WindowInfo {
                id: 3,
                title: "gamma - three".into(),
                app: "gamma".into(),
            },
        ];
        let executor = Arc::new(SwitchingExecutor {
            windows,
            foreground: Mutex::new(Some(1)),
            order: Mutex::new(Vec::new()),
        });

        let sample = Arc::new(Mutex::new(DeviceSample::default()));
        let monitor = Monitor::new(
            MonitorConfig {
                idle_timeout: 1,
                poll_interval: 20,
            },
            Box::new(SharedSource(sample)),
        );
        let scheduler = Scheduler::new(monitor, executor.clone());

        let config = SchedulerConfig {
            // Every action tick is an app switch.
            app_switch_interval: 0,
            ..fast_config()
        };
        assert!(scheduler.start(config));
        std::thread::sleep(Duration::from_millis(3600));
        scheduler.stop();

        let order = executor.order.lock();
        assert!(order.len() >= 2, "expected repeated app switches, got {:?}", order);
        // Fair rotation: no window repeats before every other eligible
        // window has been visited.
        let first_round = order.iter().take(3).collect::<std::collections::HashSet<_>>();
        assert_eq!(first_round.len(), order.len().min(3), "rotation repeated early: {:?}", order);
    }
}
