//! Services module - collaborator contracts and the concrete device tasks.
//!
//! The USB/device protocol, firmware parsing and tweak semantics live outside
//! this crate. They are consumed through three fixed contracts:
//!
//! - [`DeviceCommands`]: long-running command entry points (info, app list,
//!   install, firmware update, platform shells)
//! - [`PlatformBackend`]: a connected platform that must be started and stopped
//! - [`TweakProvider`]: the editable tweak list shown by the interactive dialog
//!
//! [`tasks`] binds each command to the task engine ([`crate::runtime`]):
//! UI snapshots in `before`, blocking device work in `body`, UI updates in
//! `after`. [`simulated`] provides an in-memory camera implementing every
//! contract, used when no USB layer is linked in and by the tests.
//!
//! # Usage Example
//!
//! ```ignore
//! use pmca_gui::services::{DeviceCommands, SimulatedCamera};
//!
//! let camera = SimulatedCamera::new(log.clone());
//! camera.info()?;
//! for app in camera.list_apps()? {
//!     println!("{} ({})", app.name, app.package);
//! }
//! ```

pub mod simulated;
pub mod tasks;

pub use simulated::SimulatedCamera;
pub use tasks::{
    AppLoadTask, FirmwareUpdateTask, InfoTask, InstallTask, ShellTask, TweakApplyTask,
};

use crate::models::{AppInfo, ShellKind, TweakId, TweakItem};
use anyhow::Result;
use std::fs::File;
use std::sync::Arc;

/// A connected platform shell (updater or senser backend)
///
/// Owned by the worker thread for the duration of a session: `start` is called
/// once before the tweak list is read, `stop` exactly once before the worker
/// returns.
#[cfg_attr(test, mockall::automock)]
pub trait PlatformBackend: Send + Sync {
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
}

/// Editable tweak list of a running platform
///
/// Called from the dialog on the UI thread while the worker waits. Calls are
/// short device round-trips.
#[cfg_attr(test, mockall::automock)]
pub trait TweakProvider: Send + Sync {
    /// Current tweaks, re-queried on every call
    fn list_items(&self) -> Result<Vec<TweakItem>>;

    /// Stage a change; takes effect on [`apply`](Self::apply)
    fn set_enabled(&self, id: TweakId, enabled: bool) -> Result<()>;

    /// Write all staged changes to the camera
    fn apply(&self) -> Result<()>;
}

/// Handle passed to the shell completion callback once a device is connected
#[derive(Clone)]
pub struct PlatformHandle {
    pub backend: Arc<dyn PlatformBackend>,
    pub tweaks: Arc<dyn TweakProvider>,
}

/// What the installer should install
pub enum InstallSource {
    /// An app from the online list, by package identifier
    Package(String),
    /// A local APK, already opened
    Apk(File),
    /// No selection: let the camera-side installer decide
    Default,
}

/// Callback invoked by a shell command with the connected platform
pub type ShellComplete<'a> = &'a mut dyn FnMut(PlatformHandle) -> Result<()>;

/// Long-running device commands
///
/// Every method blocks until the operation finishes and reports progress as
/// text through the log sink the implementation was built with.
pub trait DeviceCommands: Send + Sync {
    /// Print camera model, firmware and capability information
    fn info(&self) -> Result<()>;

    /// Fetch the list of installable apps
    fn list_apps(&self) -> Result<Vec<AppInfo>>;

    /// Install an app on the connected camera
    fn install(&self, source: InstallSource) -> Result<()>;

    /// Flash a firmware image
    fn firmware_update(&self, firmware: File) -> Result<()>;

    /// Switch the camera into a platform shell and call `complete` with the
    /// connected platform once the device is available
    fn shell(&self, kind: ShellKind, complete: ShellComplete<'_>) -> Result<()>;
}
