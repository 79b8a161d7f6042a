// pmca-gui - graphical front-end for the PlayMemories Camera Apps tools
//
// This is the library crate containing the task engine, the device tasks and
// the toolkit-agnostic UI layer. The binary crate (main.rs, feature `gui`)
// provides the Slint window.

pub mod config;
pub mod i18n;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod runtime;
pub mod services;
pub mod ui;

#[cfg(feature = "gui")]
pub mod gui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use i18n::I18n;
pub use metrics::Metrics;
pub use runtime::{BackgroundTask, EventLoop, LogSink, Task, TaskContext, UiScheduler};
pub use ui::{Controller, MainView, UiAction};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Documentation site, linked from the main window
pub const DOCS_URL: &str = "https://openmemories.readthedocs.io";

/// Repository hosting the online app list
pub const APP_LIST_URL: &str = "https://github.com/ma1co/OpenMemories-AppList";
