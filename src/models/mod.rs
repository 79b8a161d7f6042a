//! Data models for the pmca-gui application.
//!
//! - [`Settings`]: user preferences persisted to `~/.pmca/config.json`
//! - [`AppInfo`], [`InstallSelection`], [`InstallMode`]: app installer inputs
//! - [`TweakItem`]: one row of the interactive tweak dialog
//! - [`ShellKind`]: which platform shell a tweak session talks to

pub mod device;
pub mod settings;

pub use device::{AppInfo, InstallMode, InstallSelection, ShellKind, TweakId, TweakItem};
pub use settings::Settings;
