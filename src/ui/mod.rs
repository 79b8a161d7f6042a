// UI module - toolkit-agnostic view contract and action dispatch
//
// This module contains:
// - MainView: what the tasks need from the main window
// - UiAction: every user action as a plain value
// - Controller: owns one BackgroundTask per action and dispatches UiAction values
// - HeadlessView: in-memory MainView used by tests
//
// The Slint window implementing MainView lives in `crate::gui` (feature `gui`).

pub mod controller;
pub mod headless;

pub use controller::Controller;
pub use headless::HeadlessView;

use crate::models::{AppInfo, InstallSelection, ShellKind};
use crate::runtime::{DialogHost, LogView, TweakMessage};
use camino::Utf8PathBuf;

/// Buttons a task disables while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Info,
    AppRefresh,
    Install,
    FirmwareUpdate,
    UpdaterShell,
    SenserShell,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::Info,
        Control::AppRefresh,
        Control::Install,
        Control::FirmwareUpdate,
        Control::UpdaterShell,
        Control::SenserShell,
    ];
}

/// Main window as seen by the tasks. Every method runs on the UI thread.
pub trait MainView: LogView + DialogHost {
    fn set_control_enabled(&self, control: Control, enabled: bool);

    /// Replace the installer's app list; the selection resets to "none"
    fn set_app_list(&self, apps: Vec<AppInfo>);

    /// Snapshot of the installer tab
    fn install_selection(&self) -> InstallSelection;

    /// Selected firmware image, if any
    fn firmware_file(&self) -> Option<Utf8PathBuf>;

    /// Show a short informational message (settings tab)
    fn show_notice(&self, text: &str);
}

/// A user action, dispatched through [`Controller::handle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    ShowInfo,
    RefreshApps,
    Install,
    UpdateFirmware,
    StartShell(ShellKind),
    Tweak(TweakMessage),
    SetLanguage(String),
}

/// Longest log pane text kept by a view; older lines go first
pub const MAX_LOG_BYTES: usize = 256 * 1024;

/// Drop whole lines from the front of `log` until it fits in `max_bytes`
pub fn trim_log(log: &mut String, max_bytes: usize) {
    if log.len() <= max_bytes {
        return;
    }

    let mut start = log.len() - max_bytes;
    while !log.is_char_boundary(start) {
        start += 1;
    }
    let cut = log[start..].find('\n').map_or(start, |i| start + i + 1);
    log.drain(..cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_log_under_limit_is_untouched() {
        let mut log = String::from("one\ntwo\n");
        trim_log(&mut log, 64);
        assert_eq!(log, "one\ntwo\n");
    }

    #[test]
    fn test_trim_log_drops_oldest_whole_lines() {
        let mut log = String::from("first line\nsecond\nthird\n");
        trim_log(&mut log, 12);
        assert_eq!(log, "third\n");
        assert!(log.len() <= 12);
    }

    #[test]
    fn test_trim_log_respects_char_boundaries() {
        let mut log = "应用".repeat(10);
        trim_log(&mut log, 7);
        assert_eq!(log, "应用");
    }
}
