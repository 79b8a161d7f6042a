use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a tweak as reported by the camera
pub type TweakId = u32;

/// An app from the online app list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Display name
    pub name: String,

    /// Package identifier passed to the installer
    pub package: String,
}

impl AppInfo {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
        }
    }
}

/// One editable entry of the tweak dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweakItem {
    pub id: TweakId,
    pub description: String,
    pub enabled: bool,
    /// Current value as displayed by the camera (e.g. "off", "30 min")
    pub value: String,
}

impl TweakItem {
    pub fn new(
        id: TweakId,
        description: impl Into<String>,
        enabled: bool,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            enabled,
            value: value.into(),
        }
    }

    /// Checkbox label: description over the current value
    pub fn label(&self) -> String {
        format!("{}\n{}", self.description, self.value)
    }
}

/// Where the installer takes its app from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallMode {
    /// An app picked from the online list
    #[default]
    App,
    /// A local APK file
    Apk,
}

/// Installer inputs snapshotted on the UI thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSelection {
    pub mode: InstallMode,
    pub apk_file: Option<Utf8PathBuf>,
    pub app: Option<AppInfo>,
}

/// Platform shell hosting a tweak session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellKind {
    /// Firmware updater shell (USB)
    Updater,
    /// Service ("senser") shell
    Senser,
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellKind::Updater => write!(f, "updater"),
            ShellKind::Senser => write!(f, "senser"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tweak_label() {
        let item = TweakItem::new(1, "Disable video recording limit", false, "off");
        assert_eq!(item.label(), "Disable video recording limit\noff");
    }

    #[test]
    fn test_default_install_selection() {
        let selection = InstallSelection::default();
        assert_eq!(selection.mode, InstallMode::App);
        assert!(selection.apk_file.is_none());
        assert!(selection.app.is_none());
    }

    #[test]
    fn test_shell_kind_display() {
        assert_eq!(ShellKind::Updater.to_string(), "updater");
        assert_eq!(ShellKind::Senser.to_string(), "senser");
    }
}
