// HeadlessView - in-memory MainView
//
// Records everything the tasks do to the window so tests can assert on it.
// Every mutation checks that it happens on the thread that created the view.

use super::{Control, MainView};
use crate::models::{AppInfo, InstallSelection};
use crate::runtime::{DialogHost, LogView, TweakDialog};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::thread::{self, ThreadId};

pub struct HeadlessView {
    owner: ThreadId,
    log: RefCell<String>,
    controls: RefCell<IndexMap<Control, Vec<bool>>>,
    apps: RefCell<Vec<AppInfo>>,
    app_list_updates: Cell<usize>,
    selection: RefCell<InstallSelection>,
    firmware: RefCell<Option<Utf8PathBuf>>,
    dialog: RefCell<Option<TweakDialog>>,
    dialogs_opened: Cell<usize>,
    notices: RefCell<Vec<String>>,
}

impl HeadlessView {
    /// A view owned by the calling thread
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
            log: RefCell::new(String::new()),
            controls: RefCell::new(IndexMap::new()),
            apps: RefCell::new(Vec::new()),
            app_list_updates: Cell::new(0),
            selection: RefCell::new(InstallSelection::default()),
            firmware: RefCell::new(None),
            dialog: RefCell::new(None),
            dialogs_opened: Cell::new(0),
            notices: RefCell::new(Vec::new()),
        }
    }

    pub fn log_text(&self) -> String {
        self.log.borrow().clone()
    }

    /// Current state of a control; controls start enabled
    pub fn control_enabled(&self, control: Control) -> bool {
        self.controls
            .borrow()
            .get(&control)
            .and_then(|history| history.last().copied())
            .unwrap_or(true)
    }

    /// Every state a control was set to, in order
    pub fn control_history(&self, control: Control) -> Vec<bool> {
        self.controls
            .borrow()
            .get(&control)
            .cloned()
            .unwrap_or_default()
    }

    pub fn all_controls_enabled(&self) -> bool {
        Control::ALL.iter().all(|c| self.control_enabled(*c))
    }

    pub fn apps(&self) -> Vec<AppInfo> {
        self.apps.borrow().clone()
    }

    /// How many times the app list was replaced
    pub fn app_list_updates(&self) -> usize {
        self.app_list_updates.get()
    }

    pub fn set_install_selection(&self, selection: InstallSelection) {
        *self.selection.borrow_mut() = selection;
    }

    pub fn set_firmware_file(&self, path: Option<Utf8PathBuf>) {
        *self.firmware.borrow_mut() = path;
    }

    pub fn dialogs_opened(&self) -> usize {
        self.dialogs_opened.get()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.borrow().clone()
    }

    fn check_thread(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "view mutated off the UI thread"
        );
    }
}

impl Default for HeadlessView {
    fn default() -> Self {
        Self::new()
    }
}

impl LogView for HeadlessView {
    fn append_log(&self, text: &str) {
        self.check_thread();
        self.log.borrow_mut().push_str(text);
    }
}

impl DialogHost for HeadlessView {
    fn show_tweak_dialog(&self, dialog: TweakDialog) {
        self.check_thread();
        self.dialogs_opened.set(self.dialogs_opened.get() + 1);
        *self.dialog.borrow_mut() = Some(dialog);
    }

    fn tweak_dialog(&self) -> Option<TweakDialog> {
        self.dialog.borrow().clone()
    }

    fn close_tweak_dialog(&self) {
        self.check_thread();
        self.dialog.borrow_mut().take();
    }
}

impl MainView for HeadlessView {
    fn set_control_enabled(&self, control: Control, enabled: bool) {
        self.check_thread();
        self.controls
            .borrow_mut()
            .entry(control)
            .or_default()
            .push(enabled);
    }

    fn set_app_list(&self, apps: Vec<AppInfo>) {
        self.check_thread();
        self.app_list_updates.set(self.app_list_updates.get() + 1);
        *self.apps.borrow_mut() = apps;
        self.selection.borrow_mut().app = None;
    }

    fn install_selection(&self) -> InstallSelection {
        self.selection.borrow().clone()
    }

    fn firmware_file(&self) -> Option<Utf8PathBuf> {
        self.firmware.borrow().clone()
    }

    fn show_notice(&self, text: &str) {
        self.check_thread();
        self.notices.borrow_mut().push(text.to_string());
    }
}
