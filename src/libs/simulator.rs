//! Synthetic input generation through the `rdev` simulation API.
//!
//! [`InputSimulator`] is the production [`ActionExecutor`]: it injects
//! cursor movement, clicks, keyboard shortcuts, and wheel events. Window
//! management needs platform APIs outside this crate's scope, so the
//! window methods report [`ActionError::WindowsUnavailable`] and the
//! scheduler's failure handling keeps the cycle going; a platform-specific
//! executor can wrap this one and fill those in.
//!
//! The caller (the scheduler) is responsible for suppressing the activity
//! monitor around these calls so injected input does not pause automation.

use crate::libs::executor::{ActionError, ActionExecutor, WindowInfo};
use anyhow::Result;
use rand::Rng;
use rdev::{simulate, Button, EventType, Key};
use std::time::Duration;

/// Margin in pixels kept from screen edges for random cursor targets.
const MOVE_MARGIN: u64 = 50;

/// Distance from the top edge for safe clicks: far enough in to land on a
/// title bar or empty strip, never on content.
const SAFE_CLICK_Y: f64 = 4.0;

/// Delay between consecutive simulated events so the OS processes them in
/// order.
const EVENT_DELAY: Duration = Duration::from_millis(20);

/// Production executor injecting input events via `rdev`.
pub struct InputSimulator;

impl InputSimulator {
    pub fn new() -> Self {
        InputSimulator
    }

    fn send(&self, event: &EventType) -> Result<()> {
        simulate(event).map_err(|e| ActionError::InjectionFailed(format!("{:?}", e)))?;
        std::thread::sleep(EVENT_DELAY);
        Ok(())
    }

    fn screen_size(&self) -> Result<(u64, u64)> {
        rdev::display_size().map_err(|e| ActionError::InjectionFailed(format!("{:?}", e)).into())
    }

    /// Moves the cursor to `(x, y)` in a handful of interpolated steps so
    /// the motion reads as gradual rather than teleporting.
    fn move_smooth(&self, from: (f64, f64), to: (f64, f64)) -> Result<()> {
        const STEPS: u32 = 10;
        for step in 1..=STEPS {
            let progress = f64::from(step) / f64::from(STEPS);
            let x = from.0 + (to.0 - from.0) * progress;
            let y = from.1 + (to.1 - from.1) * progress;
            self.send(&EventType::MouseMove { x, y })?;
        }
        Ok(())
    }
}

impl Default for InputSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor for InputSimulator {
    fn move_cursor_random(&self) -> Result<(i32, i32)> {
        let (width, height) = self.screen_size()?;
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(MOVE_MARGIN..width.saturating_sub(MOVE_MARGIN).max(MOVE_MARGIN + 1));
        let y = rng.gen_range(MOVE_MARGIN..height.saturating_sub(MOVE_MARGIN).max(MOVE_MARGIN + 1));
        // Start from the screen center; the OS reports no cursor position
        // through this API.
        let from = (width as f64 / 2.0, height as f64 / 2.0);
        self.move_smooth(from, (x as f64, y as f64))?;
        Ok((x as i32, y as i32))
    }

    fn safe_click(&self) -> Result<(i32, i32)> {
        let (width, _) = self.screen_size()?;
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(MOVE_MARGIN..width.saturating_sub(MOVE_MARGIN).max(MOVE_MARGIN + 1)) as f64;
        self.send(&EventType::MouseMove { x, y: SAFE_CLICK_Y })?;
        self.send(&EventType::ButtonPress(Button::Left))?;
        self.send(&EventType::ButtonRelease(Button::Left))?;
        Ok((x as i32, SAFE_CLICK_Y as i32))
    }

    fn switch_tab(&self, app_hint: &str) -> Result<String> {
        self.send(&EventType::KeyPress(Key::ControlLeft))?;
        self.send(&EventType::KeyPress(Key::Tab))?;
        self.send(&EventType::KeyRelease(Key::Tab))?;
        self.send(&EventType::KeyRelease(Key::ControlLeft))?;
        Ok(format!("Switched tab (Ctrl+Tab) in {}", app_hint))
    }

    fn scroll_sequence(&self) -> Result<String> {
        let mut rng = rand::thread_rng();
        let down = rng.gen_bool(0.5);
        let ticks = rng.gen_range(2..=5);
        let delta = if down { -1 } else { 1 };
        for _ in 0..ticks {
            self.send(&EventType::Wheel {
                delta_x: 0,
                delta_y: delta,
            })?;
        }
        Ok(format!("Scrolled {} {} ticks", if down { "down" } else { "up" }, ticks))
    }

    fn list_visible_windows(&self) -> Result<Vec<WindowInfo>> {
        Err(ActionError::WindowsUnavailable.into())
    }

    fn switch_to_window(&self, _id: u64) -> Result<bool> {
        Err(ActionError::WindowsUnavailable.into())
    }

    fn is_minimized(&self, _id: u64) -> Result<bool> {
        Err(ActionError::WindowsUnavailable.into())
    }

    fn foreground_window(&self) -> Result<Option<WindowInfo>> {
        Ok(None)
    }
}
