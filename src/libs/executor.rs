//! Capability interface for concrete automation effects.
//!
//! The scheduler never touches the OS directly: cursor movement, clicks,
//! keyboard shortcuts, and window management all go through the
//! [`ActionExecutor`] trait. Production code plugs in a real implementation
//! (see `libs::simulator`); tests plug in scripted mocks. Errors raised by
//! an executor are caught at the call site and turned into descriptive
//! failure strings, so no implementation can break the scheduling loop.

use anyhow::Result;
use thiserror::Error;

/// A visible top-level window as reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Opaque window handle, unique among currently open windows.
    pub id: u64,
    /// Window title bar text.
    pub title: String,
    /// Application identity the window belongs to (executable or app name).
    /// Windows with equal `app` values count as windows of the same
    /// application for rotation purposes.
    pub app: String,
}

/// Typed failures an executor can report.
///
/// The display text of these variants feeds directly into the
/// `last_action` failure descriptions surfaced to observers.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("window management is not available on this executor")]
    WindowsUnavailable,
    #[error("no eligible window to switch to")]
    NoEligibleWindow,
    #[error("input injection failed: {0}")]
    InjectionFailed(String),
}

/// Applications known to expose a tab strip that Ctrl+Tab cycles through.
///
/// Matched by substring against the foreground window title, the same way
/// the capability check treats "Visual Studio Code - file.rs" as VS Code.
pub const TAB_APPS: &[&str] = &["Visual Studio Code", "Code", "VS Code", "Chrome", "Firefox", "Edge"];

/// Applications where a scroll burst is meaningful and safe.
pub const SCROLL_APPS: &[&str] = &[
    "Visual Studio Code",
    "Code",
    "VS Code",
    "Chrome",
    "Firefox",
    "Edge",
    "Notepad",
    "Word",
    "Excel",
];

/// Whether the foreground app supports in-app tab switching.
pub fn supports_tabs(app: &str) -> bool {
    TAB_APPS.iter().any(|candidate| app.contains(candidate))
}

/// Whether the foreground app is safe to scroll in.
pub fn supports_scroll(app: &str) -> bool {
    SCROLL_APPS.iter().any(|candidate| app.contains(candidate))
}

/// Performs concrete automation effects on behalf of the scheduler.
///
/// Implementations must be callable from the scheduling thread; all methods
/// take `&self` and implementations are expected to manage their own
/// interior state. Every method may fail, and failures are reported rather
/// than propagated by the caller.
pub trait ActionExecutor: Send + Sync {
    /// Moves the cursor to a random on-screen position, returning it.
    fn move_cursor_random(&self) -> Result<(i32, i32)>;

    /// Clicks at a position guaranteed not to disturb content (screen
    /// edges, away from controls), returning the click position.
    fn safe_click(&self) -> Result<(i32, i32)>;

    /// Issues an in-app tab-switch shortcut for the given foreground app.
    /// Must never switch windows; returns a description of what was done.
    fn switch_tab(&self, app_hint: &str) -> Result<String>;

    /// Performs a short scroll burst in the foreground window, returning
    /// a description of the direction and amount.
    fn scroll_sequence(&self) -> Result<String>;

    /// Enumerates currently visible top-level windows.
    fn list_visible_windows(&self) -> Result<Vec<WindowInfo>>;

    /// Brings the given window to the foreground. `Ok(false)` means the
    /// window refused focus or no longer exists.
    fn switch_to_window(&self, id: u64) -> Result<bool>;

    /// Whether the given window is currently minimized.
    fn is_minimized(&self, id: u64) -> Result<bool>;

    /// The window currently holding keyboard focus, if any.
    fn foreground_window(&self) -> Result<Option<WindowInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_support_matches_on_substring() {
        assert!(supports_tabs("Visual Studio Code - main.rs"));
        assert!(supports_tabs("Mozilla Firefox"));
        assert!(!supports_tabs("Calculator"));
    }

    #[test]
    fn scroll_support_covers_editors_and_office() {
        assert!(supports_scroll("report.docx - Word"));
        assert!(supports_scroll("Notepad"));
        assert!(!supports_scroll("Task Manager"));
    }
}
