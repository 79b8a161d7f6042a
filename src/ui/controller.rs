// Controller - wires user actions to background tasks
//
// One BackgroundTask per action, created once and reused for every click. All
// actions arrive as UiAction values and are dispatched by a single handler on
// the UI thread, so a toolkit only has to translate its widget events into
// UiAction and call `handle`.

use super::{MainView, UiAction};
use crate::i18n::I18n;
use crate::models::ShellKind;
use crate::runtime::{
    BackgroundTask, Dismissal, InteractiveSession, LogSink, RuntimeError, Task, TaskContext,
    TweakMessage,
};
use crate::services::{
    AppLoadTask, DeviceCommands, FirmwareUpdateTask, InfoTask, InstallTask, ShellTask,
    TweakApplyTask,
};
use std::sync::Arc;

/// Dispatches [`UiAction`] values to the tasks behind them
///
/// # Example
/// ```ignore
/// let controller = Controller::new(device, TaskContext::new(scheduler, log), i18n);
/// controller.start(&view);
/// controller.handle(&view, UiAction::ShowInfo);
/// ```
pub struct Controller<U: MainView> {
    info: BackgroundTask<InfoTask, U>,
    apps: BackgroundTask<AppLoadTask, U>,
    install: BackgroundTask<InstallTask, U>,
    firmware: BackgroundTask<FirmwareUpdateTask, U>,
    updater_shell: BackgroundTask<ShellTask<U>, U>,
    senser_shell: BackgroundTask<ShellTask<U>, U>,
    tweak_apply: BackgroundTask<TweakApplyTask, U>,
    log: LogSink,
    i18n: Arc<I18n>,
}

impl<U: MainView> Controller<U> {
    pub fn new(device: Arc<dyn DeviceCommands>, ctx: TaskContext<U>, i18n: Arc<I18n>) -> Self {
        let log = ctx.log.clone();
        let session = InteractiveSession::new(&ctx);
        let shell = |kind| {
            BackgroundTask::new(
                ShellTask::new(
                    kind,
                    Arc::clone(&device),
                    session.clone(),
                    log.clone(),
                    Arc::clone(&i18n),
                ),
                ctx.clone(),
            )
        };

        let controller = Self {
            info: BackgroundTask::new(
                InfoTask::new(Arc::clone(&device), log.clone()),
                ctx.clone(),
            ),
            apps: BackgroundTask::new(
                AppLoadTask::new(Arc::clone(&device), log.clone()),
                ctx.clone(),
            ),
            install: BackgroundTask::new(
                InstallTask::new(Arc::clone(&device), log.clone()),
                ctx.clone(),
            ),
            firmware: BackgroundTask::new(
                FirmwareUpdateTask::new(Arc::clone(&device), log.clone()),
                ctx.clone(),
            ),
            updater_shell: shell(ShellKind::Updater),
            senser_shell: shell(ShellKind::Senser),
            tweak_apply: BackgroundTask::new(
                TweakApplyTask::new(log.clone(), Arc::clone(&i18n)),
                ctx.clone(),
            ),
            log: log.clone(),
            i18n: Arc::clone(&i18n),
        };

        tracing::info!("Controller initialized");
        controller
    }

    /// Initial work once the window is up: load the app list
    pub fn start(&self, ui: &U) {
        self.handle(ui, UiAction::RefreshApps);
    }

    /// Handle one user action. UI thread only.
    pub fn handle(&self, ui: &U, action: UiAction) {
        tracing::debug!("UI action: {:?}", action);

        match action {
            UiAction::ShowInfo => launch(&self.info, ui),
            UiAction::RefreshApps => launch(&self.apps, ui),
            UiAction::Install => launch(&self.install, ui),
            UiAction::UpdateFirmware => launch(&self.firmware, ui),
            UiAction::StartShell(ShellKind::Updater) => launch(&self.updater_shell, ui),
            UiAction::StartShell(ShellKind::Senser) => launch(&self.senser_shell, ui),
            UiAction::Tweak(message) => self.handle_tweak(ui, message),
            UiAction::SetLanguage(language) => self.set_language(ui, &language),
        }
    }

    fn handle_tweak(&self, ui: &U, message: TweakMessage) {
        let Some(dialog) = ui.tweak_dialog() else {
            tracing::debug!("Tweak message with no dialog open: {:?}", message);
            return;
        };

        // While an apply is in flight the dialog only waits for it
        if !dialog.controls_enabled() {
            tracing::debug!("Tweak dialog busy, ignoring {:?}", message);
            return;
        }

        match message {
            TweakMessage::Toggle { id, enabled } => dialog.toggle(id, enabled),
            TweakMessage::Apply => launch(&self.tweak_apply, ui),
            TweakMessage::Cancel => {
                dialog.dismiss(Dismissal::Cancelled);
                ui.close_tweak_dialog();
            }
        }
    }

    fn set_language(&self, ui: &U, language: &str) {
        match self.i18n.set_language(language) {
            Ok(true) => ui.show_notice(&self.i18n.tr("restart_required")),
            Ok(false) => self.log.writeln(
                &self
                    .i18n
                    .tr_with("unsupported_language", &[("language", language)]),
            ),
            Err(e) => {
                tracing::error!("Failed to change language: {:#}", e);
                self.log.writeln(&format!("{e:?}"));
            }
        }
    }
}

fn launch<T, U>(task: &BackgroundTask<T, U>, ui: &U)
where
    T: Task<U>,
    U: MainView,
{
    match task.run(ui) {
        Ok(()) => {}
        Err(RuntimeError::AlreadyRunning { task: name, state }) => {
            tracing::debug!("Ignoring click: {} already running ({:?})", name, state);
        }
        Err(e) => tracing::error!("Failed to start task: {}", e),
    }
}
