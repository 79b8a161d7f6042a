// SlintView - MainView over the generated Slint windows

use super::{Labels, MainWindow, TweakDialogWindow, TweakRow};
use crate::i18n::I18n;
use crate::models::{AppInfo, InstallMode, InstallSelection};
use crate::runtime::{DialogHost, Dismissal, LogView, TweakDialog};
use crate::ui::{Control, MAX_LOG_BYTES, MainView, trim_log};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use slint::{ComponentHandle, ModelRc, SharedString, VecModel};
use std::cell::RefCell;
use std::rc::Rc;

/// Main window plus tweak dialog window. Cheap to clone; UI thread only.
pub struct SlintView {
    window: MainWindow,
    dialog_window: TweakDialogWindow,
    state: Rc<ViewState>,
}

#[derive(Default)]
struct ViewState {
    apps: RefCell<Vec<AppInfo>>,
    log: RefCell<String>,
    dialog: RefCell<Option<TweakDialog>>,
}

impl Clone for SlintView {
    fn clone(&self) -> Self {
        Self {
            window: self.window.clone_strong(),
            dialog_window: self.dialog_window.clone_strong(),
            state: Rc::clone(&self.state),
        }
    }
}

impl SlintView {
    pub fn new(i18n: &I18n) -> Result<Self> {
        let window = MainWindow::new().context("Failed to create main window")?;
        let dialog_window = TweakDialogWindow::new().context("Failed to create tweak dialog")?;

        let labels = labels(i18n);
        window.set_labels(labels.clone());
        dialog_window.set_labels(labels);
        window.set_docs_url(crate::DOCS_URL.into());
        window.set_app_list_url(crate::APP_LIST_URL.into());

        let current = i18n.language();
        let languages = i18n.supported_languages();
        window.set_language_names(string_model(languages.iter().map(|(_, name)| *name)));
        window.set_language_index(
            languages
                .iter()
                .position(|(code, _)| *code == current)
                .unwrap_or(0) as i32,
        );

        let view = Self {
            window,
            dialog_window,
            state: Rc::new(ViewState::default()),
        };
        view.set_app_list(Vec::new());
        Ok(view)
    }

    pub fn window(&self) -> &MainWindow {
        &self.window
    }

    pub fn dialog_window(&self) -> &TweakDialogWindow {
        &self.dialog_window
    }

    /// Release a worker still waiting on the dialog (window closing)
    pub fn abandon_dialog(&self) {
        if let Some(dialog) = self.state.dialog.borrow_mut().take() {
            dialog.dismiss(Dismissal::Abandoned);
        }
        if let Err(e) = self.dialog_window.hide() {
            tracing::debug!("Failed to hide tweak dialog: {}", e);
        }
    }
}

impl LogView for SlintView {
    fn append_log(&self, text: &str) {
        let mut log = self.state.log.borrow_mut();
        log.push_str(text);
        trim_log(&mut log, MAX_LOG_BYTES);
        self.window.set_log_text(log.as_str().into());
    }
}

impl DialogHost for SlintView {
    fn show_tweak_dialog(&self, dialog: TweakDialog) {
        let weak = self.dialog_window.as_weak();
        dialog.set_observer(move |dialog| {
            if let Some(window) = weak.upgrade() {
                render_dialog(&window, dialog);
            }
        });

        *self.state.dialog.borrow_mut() = Some(dialog);
        if let Err(e) = self.dialog_window.show() {
            tracing::error!("Failed to show tweak dialog: {}", e);
        }
    }

    fn tweak_dialog(&self) -> Option<TweakDialog> {
        self.state.dialog.borrow().clone()
    }

    fn close_tweak_dialog(&self) {
        self.state.dialog.borrow_mut().take();
        if let Err(e) = self.dialog_window.hide() {
            tracing::debug!("Failed to hide tweak dialog: {}", e);
        }
    }
}

impl MainView for SlintView {
    fn set_control_enabled(&self, control: Control, enabled: bool) {
        let w = &self.window;
        match control {
            Control::Info => w.set_info_enabled(enabled),
            Control::AppRefresh => w.set_app_refresh_enabled(enabled),
            Control::Install => w.set_install_enabled(enabled),
            Control::FirmwareUpdate => w.set_firmware_enabled(enabled),
            Control::UpdaterShell => w.set_updater_shell_enabled(enabled),
            Control::SenserShell => w.set_senser_shell_enabled(enabled),
        }
    }

    fn set_app_list(&self, apps: Vec<AppInfo>) {
        let names = std::iter::once("").chain(apps.iter().map(|app| app.name.as_str()));
        self.window.set_app_names(string_model(names));
        self.window.set_app_index(0);
        *self.state.apps.borrow_mut() = apps;
    }

    fn install_selection(&self) -> InstallSelection {
        let apk = self.window.get_apk_path();
        let index = self.window.get_app_index();
        let app = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.state.apps.borrow().get(i).cloned());

        InstallSelection {
            mode: if self.window.get_apk_mode() {
                InstallMode::Apk
            } else {
                InstallMode::App
            },
            apk_file: (!apk.is_empty()).then(|| Utf8PathBuf::from(apk.as_str())),
            app,
        }
    }

    fn firmware_file(&self) -> Option<Utf8PathBuf> {
        let path = self.window.get_firmware_path();
        (!path.is_empty()).then(|| Utf8PathBuf::from(path.as_str()))
    }

    fn show_notice(&self, text: &str) {
        self.window.set_notice(text.into());
    }
}

fn render_dialog(window: &TweakDialogWindow, dialog: &TweakDialog) {
    let rows: Vec<TweakRow> = dialog
        .items()
        .iter()
        .map(|item| TweakRow {
            id: item.id as i32,
            label: item.label().into(),
            enabled: item.enabled,
        })
        .collect();
    window.set_items(ModelRc::new(VecModel::from(rows)));
    window.set_controls_enabled(dialog.controls_enabled());
}

fn string_model<'a>(items: impl Iterator<Item = &'a str>) -> ModelRc<SharedString> {
    let shared: Vec<SharedString> = items.map(SharedString::from).collect();
    ModelRc::new(VecModel::from(shared))
}

fn labels(i18n: &I18n) -> Labels {
    let t = |key: &str| SharedString::from(i18n.tr(key));
    Labels {
        app_title: t("app_title"),
        camera_info: t("camera_info"),
        install_app: t("install_app"),
        tweaks: t("tweaks"),
        update_firmware: t("update_firmware"),
        settings: t("settings"),
        camera_compatibility: t("camera_compatibility"),
        get_camera_info: t("get_camera_info"),
        select_app_from_list: t("select_app_from_list"),
        refresh: t("refresh"),
        source: t("source"),
        select_apk: t("select_apk"),
        open_apk: t("open_apk"),
        install_selected_app: t("install_selected_app"),
        firmware_file: t("firmware_file"),
        open: t("open"),
        start_tweaking_updater: t("start_tweaking_updater"),
        start_tweaking_service: t("start_tweaking_service"),
        apply: t("apply"),
        cancel: t("cancel"),
        language_settings: t("language_settings"),
        select_language: t("select_language"),
    }
}
