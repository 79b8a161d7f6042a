// Device tasks - one Task per main-window action
//
// Each task disables its button in `before`, runs the blocking device command
// in `body` and re-enables the button in `after`. Device output reaches the log
// pane through the LogSink the commands were built with; each command-backed
// body starts with an empty line so consecutive runs stay visually separated.

use super::{DeviceCommands, InstallSource, PlatformHandle, TweakProvider};
use crate::i18n::I18n;
use crate::models::{InstallMode, InstallSelection, ShellKind};
use crate::runtime::{Dismissal, InteractiveSession, LogSink, SessionOutcome, Task};
use crate::ui::{Control, MainView};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs::File;
use std::sync::Arc;

/// Print camera information
pub struct InfoTask {
    device: Arc<dyn DeviceCommands>,
    log: LogSink,
}

impl InfoTask {
    pub fn new(device: Arc<dyn DeviceCommands>, log: LogSink) -> Self {
        Self { device, log }
    }
}

impl<U: MainView> Task<U> for InfoTask {
    type Arg = ();
    type Output = ();

    fn name(&self) -> &'static str {
        "info"
    }

    fn before(&self, ui: &U) {
        ui.set_control_enabled(Control::Info, false);
    }

    fn body(&self, _: ()) -> Result<()> {
        self.log.writeln("");
        self.device.info()
    }

    fn after(&self, ui: &U, _: Option<()>) {
        ui.set_control_enabled(Control::Info, true);
    }
}

/// Reload the installer's app list
///
/// The list is cleared up front; a failed or empty fetch leaves it empty.
pub struct AppLoadTask {
    device: Arc<dyn DeviceCommands>,
    log: LogSink,
}

impl AppLoadTask {
    pub fn new(device: Arc<dyn DeviceCommands>, log: LogSink) -> Self {
        Self { device, log }
    }
}

impl<U: MainView> Task<U> for AppLoadTask {
    type Arg = ();
    type Output = Vec<crate::models::AppInfo>;

    fn name(&self) -> &'static str {
        "app-load"
    }

    fn before(&self, ui: &U) {
        ui.set_app_list(Vec::new());
        ui.set_control_enabled(Control::AppRefresh, false);
    }

    fn body(&self, _: ()) -> Result<Self::Output> {
        self.log.writeln("");
        self.device.list_apps()
    }

    fn after(&self, ui: &U, apps: Option<Self::Output>) {
        if let Some(apps) = apps.filter(|apps| !apps.is_empty()) {
            tracing::info!("Loaded {} apps", apps.len());
            ui.set_app_list(apps);
        }
        ui.set_control_enabled(Control::AppRefresh, true);
    }
}

/// Install the selected app, the selected APK, or let the installer decide
pub struct InstallTask {
    device: Arc<dyn DeviceCommands>,
    log: LogSink,
}

impl InstallTask {
    pub fn new(device: Arc<dyn DeviceCommands>, log: LogSink) -> Self {
        Self { device, log }
    }
}

impl<U: MainView> Task<U> for InstallTask {
    type Arg = InstallSelection;
    type Output = ();

    fn name(&self) -> &'static str {
        "install"
    }

    fn before(&self, ui: &U) -> InstallSelection {
        ui.set_control_enabled(Control::Install, false);
        ui.install_selection()
    }

    fn body(&self, selection: InstallSelection) -> Result<()> {
        self.log.writeln("");

        let source = match selection {
            InstallSelection {
                mode: InstallMode::App,
                app: Some(app),
                ..
            } => InstallSource::Package(app.package),
            InstallSelection {
                mode: InstallMode::Apk,
                apk_file: Some(path),
                ..
            } if !path.as_str().is_empty() => {
                let file = File::open(&path)
                    .with_context(|| format!("Failed to open APK file: {}", path))?;
                InstallSource::Apk(file)
            }
            _ => InstallSource::Default,
        };

        self.device.install(source)
    }

    fn after(&self, ui: &U, _: Option<()>) {
        ui.set_control_enabled(Control::Install, true);
    }
}

/// Flash the selected firmware image. Does nothing when no file is selected.
pub struct FirmwareUpdateTask {
    device: Arc<dyn DeviceCommands>,
    log: LogSink,
}

impl FirmwareUpdateTask {
    pub fn new(device: Arc<dyn DeviceCommands>, log: LogSink) -> Self {
        Self { device, log }
    }
}

impl<U: MainView> Task<U> for FirmwareUpdateTask {
    type Arg = Option<Utf8PathBuf>;
    type Output = ();

    fn name(&self) -> &'static str {
        "firmware-update"
    }

    fn before(&self, ui: &U) -> Option<Utf8PathBuf> {
        ui.set_control_enabled(Control::FirmwareUpdate, false);
        ui.firmware_file()
    }

    fn body(&self, path: Option<Utf8PathBuf>) -> Result<()> {
        let Some(path) = path.filter(|p| !p.as_str().is_empty()) else {
            tracing::debug!("No firmware file selected");
            return Ok(());
        };

        self.log.writeln("");
        let file = File::open(&path)
            .with_context(|| format!("Failed to open firmware file: {}", path))?;
        self.device.firmware_update(file)
    }

    fn after(&self, ui: &U, _: Option<()>) {
        ui.set_control_enabled(Control::FirmwareUpdate, true);
    }
}

/// Open a platform shell and run an interactive tweak session inside it
///
/// Both shell buttons are disabled while either shell runs.
pub struct ShellTask<U> {
    kind: ShellKind,
    device: Arc<dyn DeviceCommands>,
    session: InteractiveSession<U>,
    log: LogSink,
    i18n: Arc<I18n>,
}

impl<U> ShellTask<U> {
    pub fn new(
        kind: ShellKind,
        device: Arc<dyn DeviceCommands>,
        session: InteractiveSession<U>,
        log: LogSink,
        i18n: Arc<I18n>,
    ) -> Self {
        Self {
            kind,
            device,
            session,
            log,
            i18n,
        }
    }
}

impl<U: MainView> Task<U> for ShellTask<U> {
    type Arg = ();
    /// `None` if the shell finished without reaching a device
    type Output = Option<SessionOutcome>;

    fn name(&self) -> &'static str {
        match self.kind {
            ShellKind::Updater => "updater-shell",
            ShellKind::Senser => "senser-shell",
        }
    }

    fn before(&self, ui: &U) {
        ui.set_control_enabled(Control::UpdaterShell, false);
        ui.set_control_enabled(Control::SenserShell, false);
    }

    fn body(&self, _: ()) -> Result<Self::Output> {
        self.log.writeln("");

        let mut outcome = None;
        self.device.shell(self.kind, &mut |handle: PlatformHandle| {
            let result = self.session.run(handle.backend.as_ref(), handle.tweaks)?;
            if result == SessionOutcome::NoContent {
                self.log.writeln(&self.i18n.tr("no_tweaks_available"));
            }
            outcome = Some(result);
            Ok(())
        })?;

        tracing::info!("{} shell finished: {:?}", self.kind, outcome);
        Ok(outcome)
    }

    fn after(&self, ui: &U, _: Option<Self::Output>) {
        ui.set_control_enabled(Control::UpdaterShell, true);
        ui.set_control_enabled(Control::SenserShell, true);
    }
}

/// Write the staged tweaks to the camera
///
/// Runs from the tweak dialog. On success the dialog closes itself, which
/// releases the waiting shell worker; on failure the controls come back so the
/// user can retry or cancel.
pub struct TweakApplyTask {
    log: LogSink,
    i18n: Arc<I18n>,
}

impl TweakApplyTask {
    pub fn new(log: LogSink, i18n: Arc<I18n>) -> Self {
        Self { log, i18n }
    }
}

impl<U: MainView> Task<U> for TweakApplyTask {
    type Arg = Option<Arc<dyn TweakProvider>>;
    /// Whether tweaks were written
    type Output = bool;

    fn name(&self) -> &'static str {
        "tweak-apply"
    }

    fn before(&self, ui: &U) -> Self::Arg {
        let dialog = ui.tweak_dialog()?;
        dialog.set_controls_enabled(false);
        Some(dialog.provider())
    }

    fn body(&self, provider: Self::Arg) -> Result<bool> {
        let Some(provider) = provider else {
            tracing::debug!("Apply requested with no tweak dialog open");
            return Ok(false);
        };

        self.log.writeln(&self.i18n.tr("applying_tweaks"));
        provider.apply().context("Failed to apply tweaks")?;
        Ok(true)
    }

    fn after(&self, ui: &U, applied: Option<bool>) {
        let Some(dialog) = ui.tweak_dialog() else {
            return;
        };

        dialog.set_controls_enabled(true);
        if applied == Some(true) {
            dialog.dismiss(Dismissal::Applied);
            ui.close_tweak_dialog();
        }
    }
}
