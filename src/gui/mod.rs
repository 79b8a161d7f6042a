// Slint front-end (feature `gui`)
//
// This module contains:
// - SlintView: MainView implementation over the generated windows
// - EventLoopBridge: forwards the UI scheduler queue into the Slint event loop
// - run(): builds the window, wires widget callbacks to UiAction values and
//   blocks until the window is closed

pub mod bridge;
pub mod view;

pub use bridge::EventLoopBridge;
pub use view::SlintView;

// Include the generated Slint code
slint::include_modules!();

use crate::i18n::I18n;
use crate::metrics::Metrics;
use crate::models::ShellKind;
use crate::runtime::{EventLoop, LogSink, TaskContext, TweakMessage};
use crate::services::DeviceCommands;
use crate::ui::{Controller, UiAction};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// How long shutdown waits for in-flight device commands to return
const SHUTDOWN_GRACE: Duration = Duration::from_secs(120);

/// Build the window around `device`, run it, and tear everything down
///
/// `make_device` receives the log sink so device output reaches the log pane.
pub fn run<F>(i18n: Arc<I18n>, metrics: Arc<Metrics>, make_device: F) -> Result<()>
where
    F: FnOnce(LogSink) -> Arc<dyn DeviceCommands>,
{
    let view = SlintView::new(&i18n)?;
    let event_loop = EventLoop::with_metrics(view.clone(), metrics);
    let scheduler = event_loop.scheduler();

    let log = LogSink::with_passthrough(std::io::stdout());
    log.attach(&scheduler);

    let device = make_device(log.clone());
    let ctx = TaskContext::new(scheduler.clone(), log.clone());
    let workers = Arc::clone(&ctx.workers);
    let controller = Rc::new(Controller::new(device, ctx, Arc::clone(&i18n)));

    let (installed, queue) = event_loop.into_parts();
    let bridge = EventLoopBridge::new(installed, queue, scheduler)?;

    wire_callbacks(&view, &controller, &i18n);
    controller.start(&view);

    tracing::info!("Launching main window");
    let result = view.window().run().context("Slint event loop failed");

    tracing::info!("Main window closed, shutting down");
    log.detach();
    bridge.shutdown();

    // Abandoned sessions still stop their backend; a firmware write must finish
    let active = workers.active();
    if active > 0 {
        tracing::info!("Waiting for {} running task(s) to finish", active);
    }
    let stranded = workers.join_all(SHUTDOWN_GRACE);
    if stranded > 0 {
        tracing::warn!("{} task(s) still running after {:?}", stranded, SHUTDOWN_GRACE);
    }
    result
}

/// Dispatch an action against the installed view
fn dispatch(controller: &Controller<SlintView>, action: UiAction) {
    match bridge::current_view() {
        Some(view) => controller.handle(&view, action),
        None => tracing::debug!("Ignoring {:?}: view is gone", action),
    }
}

fn wire_callbacks(view: &SlintView, controller: &Rc<Controller<SlintView>>, i18n: &Arc<I18n>) {
    let window = view.window();

    let controller_clone = Rc::clone(controller);
    window.on_show_info(move || dispatch(&controller_clone, UiAction::ShowInfo));

    let controller_clone = Rc::clone(controller);
    window.on_refresh_apps(move || dispatch(&controller_clone, UiAction::RefreshApps));

    let controller_clone = Rc::clone(controller);
    window.on_install(move || dispatch(&controller_clone, UiAction::Install));

    let controller_clone = Rc::clone(controller);
    window.on_update_firmware(move || dispatch(&controller_clone, UiAction::UpdateFirmware));

    let controller_clone = Rc::clone(controller);
    window.on_start_updater_shell(move || {
        dispatch(&controller_clone, UiAction::StartShell(ShellKind::Updater));
    });

    let controller_clone = Rc::clone(controller);
    window.on_start_senser_shell(move || {
        dispatch(&controller_clone, UiAction::StartShell(ShellKind::Senser));
    });

    // The dialog is a second top-level window; closing the main window must
    // end the event loop even while it is open
    window.window().on_close_requested(|| {
        if let Err(e) = slint::quit_event_loop() {
            tracing::warn!("Failed to quit event loop: {}", e);
        }
        slint::CloseRequestResponse::HideWindow
    });

    let controller_clone = Rc::clone(controller);
    window.on_apply_language(move |index| {
        let code = usize::try_from(index)
            .ok()
            .and_then(|i| crate::i18n::SUPPORTED_LANGUAGES.get(i))
            .map(|(code, _)| code.to_string());
        if let Some(code) = code {
            dispatch(&controller_clone, UiAction::SetLanguage(code));
        }
    });

    let ui_weak = window.as_weak();
    let apk_title = i18n.tr("select_apk");
    let apk_filters = [(i18n.tr("apk_files"), "apk"), (i18n.tr("all_files"), "*")];
    window.on_browse_apk(move || {
        if let Some(path) = show_file_picker(&apk_title, &apk_filters) {
            tracing::info!("APK selected: {}", path);
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_apk_path(path.as_str().into());
                ui.set_apk_mode(true);
            }
        }
    });

    let ui_weak = window.as_weak();
    let firmware_title = i18n.tr("firmware_file");
    let firmware_filters = [(i18n.tr("firmware_files"), "dat"), (i18n.tr("all_files"), "*")];
    window.on_browse_firmware(move || {
        if let Some(path) = show_file_picker(&firmware_title, &firmware_filters) {
            tracing::info!("Firmware file selected: {}", path);
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_firmware_path(path.as_str().into());
            }
        }
    });

    let dialog_window = view.dialog_window();

    let controller_clone = Rc::clone(controller);
    dialog_window.on_toggle(move |id, enabled| {
        if let Ok(id) = u32::try_from(id) {
            dispatch(
                &controller_clone,
                UiAction::Tweak(TweakMessage::Toggle { id, enabled }),
            );
        }
    });

    let controller_clone = Rc::clone(controller);
    dialog_window.on_apply(move || {
        dispatch(&controller_clone, UiAction::Tweak(TweakMessage::Apply));
    });

    let controller_clone = Rc::clone(controller);
    dialog_window.on_cancel(move || {
        dispatch(&controller_clone, UiAction::Tweak(TweakMessage::Cancel));
    });

    // Closing the dialog window counts as cancel; the controller decides
    // whether it actually closes
    let controller_clone = Rc::clone(controller);
    dialog_window.window().on_close_requested(move || {
        dispatch(&controller_clone, UiAction::Tweak(TweakMessage::Cancel));
        slint::CloseRequestResponse::KeepWindowShown
    });
}

/// Show a native file picker
///
/// Returns `None` if the user cancels or the path is not valid UTF-8.
fn show_file_picker(title: &str, filters: &[(String, &str)]) -> Option<Utf8PathBuf> {
    use rfd::FileDialog;

    let mut dialog = FileDialog::new().set_title(title);

    for (name, extension) in filters {
        dialog = dialog.add_filter(name.as_str(), &[*extension]);
    }

    dialog.pick_file().and_then(|path| {
        Utf8PathBuf::try_from(path)
            .map_err(|e| {
                tracing::error!("Failed to convert path to UTF-8: {}", e);
                e
            })
            .ok()
    })
}
