//! pmca-gui - graphical front-end for PlayMemories Camera Apps tools
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! This binary provides the Slint GUI. It initializes:
//! - Logging infrastructure (file rotation + console output)
//! - User settings (`~/.pmca/config.json`) and the translation catalogs
//! - The main window, its UI scheduler bridge and the device controller
//!
//! The application uses a simple threading model:
//! - **Main thread**: runs the Slint event loop and every widget update
//! - **Task workers**: one OS thread per running device command
//! - **UI bridge**: forwards scheduled UI callbacks into the Slint event loop
//!
//! No USB layer is linked into this build; device commands are answered by the
//! simulated camera.

use anyhow::Result;
use pmca_gui::logging::{self, LogConfig};
use pmca_gui::services::{DeviceCommands, SimulatedCamera};
use pmca_gui::{APP_NAME, ConfigManager, I18n, Metrics, VERSION};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    // Hold the guard so buffered log lines are flushed at exit
    let _log_guard = logging::setup_logging(&LogConfig::default())?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let config = ConfigManager::with_default_dir()?;
    let i18n = Arc::new(I18n::from_config(config));
    let metrics = Arc::new(Metrics::new());

    let result = pmca_gui::gui::run(Arc::clone(&i18n), Arc::clone(&metrics), |log| {
        let camera = SimulatedCamera::new(log).with_step_delay(Duration::from_millis(300));
        Arc::new(camera) as Arc<dyn DeviceCommands>
    });

    metrics.log_summary();
    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {:#}", e);
        e
    })
}
