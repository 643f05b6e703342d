#[cfg(test)]
mod tests {
    use anyhow::Result;
    use cadence::libs::monitor::{ActivityKind, DeviceSample, DeviceStateSource, Monitor, MonitorConfig};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Device source whose sample the test mutates to simulate input.
    struct SharedSource(Arc<Mutex<DeviceSample>>);

    impl DeviceStateSource for SharedSource {
        fn sample(&mut self) -> Result<DeviceSample> {
            Ok(self.0.lock().clone())
        }
    }

    struct Harness {
        monitor: Monitor,
        sample: Arc<Mutex<DeviceSample>>,
        activity_count: Arc<AtomicUsize>,
        idle_count: Arc<AtomicUsize>,
        last_kind: Arc<Mutex<Option<ActivityKind>>>,
    }

    fn harness(idle_timeout: u64) -> Harness {
        let sample = Arc::new(Mutex::new(DeviceSample::default()));
        let monitor = Monitor::new(
            MonitorConfig {
                idle_timeout,
                poll_interval: 20,
            },
            Box::new(SharedSource(sample.clone())),
        );

        let activity_count = Arc::new(AtomicUsize::new(0));
        let idle_count = Arc::new(AtomicUsize::new(0));
        let last_kind = Arc::new(Mutex::new(None));

        let activity = activity_count.clone();
        let kind_slot = last_kind.clone();
        monitor.set_on_activity(move |event| {
            activity.fetch_add(1, Ordering::SeqCst);
            *kind_slot.lock() = Some(event.kind);
        });
        let idle = idle_count.clone();
        monitor.set_on_idle(move || {
            idle.fetch_add(1, Ordering::SeqCst);
        });

        Harness {
            monitor,
            sample,
            activity_count,
            idle_count,
            last_kind,
        }
    }

    fn press_button(harness: &Harness) {
        harness.sample.lock().buttons.insert(rdev::Button::Left);
    }

    fn release_button(harness: &Harness) {
        harness.sample.lock().buttons.remove(&rdev::Button::Left);
    }

    #[test]
    fn test_press_edge_detected_within_polling_cadence() {
        let harness = harness(60);
        assert!(harness.monitor.start());

        std::thread::sleep(Duration::from_millis(100));
        press_button(&harness);
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(harness.activity_count.load(Ordering::SeqCst), 1);
        assert_eq!(*harness.last_kind.lock(), Some(ActivityKind::Click));
        assert!(harness.monitor.is_user_active());

        // Holding the button is not another edge.
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(harness.activity_count.load(Ordering::SeqCst), 1);

        harness.monitor.stop();
        assert!(!harness.monitor.is_running());
    }

    #[test]
    fn test_key_edge_reports_key_press_kind() {
        let harness = harness(60);
        assert!(harness.monitor.start());

        std::thread::sleep(Duration::from_millis(100));
        harness.sample.lock().keys.insert(rdev::Key::KeyA);
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(*harness.last_kind.lock(), Some(ActivityKind::KeyPress));
        harness.monitor.stop();
    }

    #[test]
    fn test_idle_fires_once_per_stretch_and_rearms_on_edge() {
        let harness = harness(1);
        assert!(harness.monitor.start());

        // No input after start: exactly one idle notification.
        std::thread::sleep(Duration::from_millis(1400));
        assert_eq!(harness.idle_count.load(Ordering::SeqCst), 1);
        std::thread::sleep(Duration::from_millis(700));
        assert_eq!(harness.idle_count.load(Ordering::SeqCst), 1, "idle must not fire twice without an edge");

        // An edge re-arms the notification.
        press_button(&harness);
        std::thread::sleep(Duration::from_millis(100));
        release_button(&harness);
        assert_eq!(harness.activity_count.load(Ordering::SeqCst), 1);

        std::thread::sleep(Duration::from_millis(1400));
        assert_eq!(harness.idle_count.load(Ordering::SeqCst), 2);

        harness.monitor.stop();
    }

    #[test]
    fn test_suppressed_input_never_triggers_activity() {
        let harness = harness(60);
        assert!(harness.monitor.start());
        std::thread::sleep(Duration::from_millis(100));

        {
            let _guard = harness.monitor.suppress();
            // A press-and-release entirely inside the suppression window.
            press_button(&harness);
            std::thread::sleep(Duration::from_millis(150));
            release_button(&harness);
            std::thread::sleep(Duration::from_millis(150));
        }
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(harness.activity_count.load(Ordering::SeqCst), 0);

        // Detection is restored after the guard drops.
        press_button(&harness);
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(harness.activity_count.load(Ordering::SeqCst), 1);

        harness.monitor.stop();
    }

    #[test]
    fn test_press_held_across_restore_is_not_an_edge() {
        let harness = harness(60);
        assert!(harness.monitor.start());
        std::thread::sleep(Duration::from_millis(100));

        {
            let _guard = harness.monitor.suppress();
            press_button(&harness);
            // Still held when suppression lifts.
            std::thread::sleep(Duration::from_millis(150));
        }
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(harness.activity_count.load(Ordering::SeqCst), 0);

        harness.monitor.stop();
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let harness = harness(60);
        assert!(harness.monitor.start());
        assert!(!harness.monitor.start(), "second start must be rejected");
        assert!(harness.monitor.is_running());

        harness.monitor.stop();
        assert!(!harness.monitor.is_running());
        // stop is safe to call again
        harness.monitor.stop();

        // The monitor restarts cleanly on the same instance.
        assert!(harness.monitor.start());
        harness.monitor.stop();
    }

    #[test]
    fn test_time_until_idle_counts_down() {
        let harness = harness(2);
        assert!(harness.monitor.start());
        std::thread::sleep(Duration::from_millis(100));

        press_button(&harness);
        std::thread::sleep(Duration::from_millis(100));
        let first = harness.monitor.time_until_idle();
        assert!(first > Duration::from_millis(1500));

        std::thread::sleep(Duration::from_millis(500));
        let second = harness.monitor.time_until_idle();
        assert!(second < first);

        harness.monitor.stop();
    }
}
