// SimulatedCamera - in-memory implementation of every device contract
//
// Used by the GUI when no USB layer is linked in, and by the tests as a
// fixture. Output mimics the real commands: progress text is written to the
// log sink, calls optionally sleep to exercise the UI while a task runs.

use super::{
    DeviceCommands, InstallSource, PlatformBackend, PlatformHandle, ShellComplete, TweakProvider,
};
use crate::models::{AppInfo, ShellKind, TweakId, TweakItem};
use crate::runtime::LogSink;
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use std::fs::File;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// A fake camera answering every device command
pub struct SimulatedCamera {
    log: LogSink,
    apps: Vec<AppInfo>,
    backend: Arc<SimulatedBackend>,
    tweaks: Arc<SimulatedTweaks>,
    step_delay: Duration,
}

impl SimulatedCamera {
    /// A camera with a small app list and a few tweaks
    pub fn new(log: LogSink) -> Self {
        Self {
            apps: default_apps(),
            backend: Arc::new(SimulatedBackend::new(log.clone())),
            tweaks: Arc::new(SimulatedTweaks::new(default_tweaks(), log.clone())),
            step_delay: Duration::ZERO,
            log,
        }
    }

    pub fn with_apps(mut self, apps: Vec<AppInfo>) -> Self {
        self.apps = apps;
        self
    }

    pub fn with_tweaks(mut self, tweaks: Vec<TweakItem>) -> Self {
        self.tweaks = Arc::new(SimulatedTweaks::new(tweaks, self.log.clone()));
        self
    }

    /// Pause between progress steps, to make long operations visible
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn backend(&self) -> &Arc<SimulatedBackend> {
        &self.backend
    }

    pub fn tweaks(&self) -> &Arc<SimulatedTweaks> {
        &self.tweaks
    }

    fn step(&self) {
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }
    }
}

impl DeviceCommands for SimulatedCamera {
    fn info(&self) -> Result<()> {
        self.log.writeln("Looking for Sony devices");
        self.step();
        self.log.writeln("Model: ILCE-5100 (simulated)");
        self.log.writeln("Product code: 0x0123");
        self.log.writeln("Firmware version: 3.10");
        self.log.writeln("Apps installed: 2");
        Ok(())
    }

    fn list_apps(&self) -> Result<Vec<AppInfo>> {
        self.log.writeln("Loading app list");
        self.step();
        self.log.writeln(&format!("Found {} apps", self.apps.len()));
        Ok(self.apps.clone())
    }

    fn install(&self, source: InstallSource) -> Result<()> {
        match source {
            InstallSource::Package(package) => {
                if !self.apps.iter().any(|app| app.package == package) {
                    bail!("App not found in app list: {}", package);
                }
                self.log.writeln(&format!("Installing {}", package));
            }
            InstallSource::Apk(file) => {
                let size = file
                    .metadata()
                    .context("Failed to read APK metadata")?
                    .len();
                self.log.writeln(&format!("Installing local APK ({} bytes)", size));
            }
            InstallSource::Default => {
                self.log.writeln("Starting installer without an app");
            }
        }
        self.step();
        self.log.writeln("Task completed successfully");
        Ok(())
    }

    fn firmware_update(&self, firmware: File) -> Result<()> {
        let size = firmware
            .metadata()
            .context("Failed to read firmware metadata")?
            .len();
        if size == 0 {
            bail!("Firmware file is empty");
        }

        self.log.writeln("Writing firmware");
        for percent in [0, 25, 50, 75, 100] {
            self.step();
            self.log.writeln(&format!("{percent}%"));
        }
        self.log.writeln("Done! The camera will now restart.");
        Ok(())
    }

    fn shell(&self, kind: ShellKind, complete: ShellComplete<'_>) -> Result<()> {
        self.log.writeln(&format!("Switching camera to {kind} mode"));
        self.step();

        complete(PlatformHandle {
            backend: self.backend.clone(),
            tweaks: self.tweaks.clone(),
        })
    }
}

/// Platform backend counting its start/stop calls
pub struct SimulatedBackend {
    log: LogSink,
    running: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl SimulatedBackend {
    fn new(log: LogSink) -> Self {
        Self {
            log,
            running: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl PlatformBackend for SimulatedBackend {
    fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            bail!("Platform backend already running");
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.log.writeln("Platform started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.log.writeln("Platform stopped");
        Ok(())
    }
}

/// Tweak list with staged changes
///
/// `set_enabled` takes effect in the listing immediately; `apply` writes the
/// staged ids and clears them.
pub struct SimulatedTweaks {
    log: LogSink,
    items: Mutex<Vec<TweakItem>>,
    staged: Mutex<IndexMap<TweakId, bool>>,
    applied: AtomicUsize,
    fail_next_apply: AtomicBool,
}

impl SimulatedTweaks {
    fn new(items: Vec<TweakItem>, log: LogSink) -> Self {
        Self {
            log,
            items: Mutex::new(items),
            staged: Mutex::new(IndexMap::new()),
            applied: AtomicUsize::new(0),
            fail_next_apply: AtomicBool::new(false),
        }
    }

    /// Make the next `apply` fail once
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }

    /// Number of successful `apply` calls
    pub fn applied(&self) -> usize {
        self.applied.load(Ordering::SeqCst)
    }

    pub fn staged(&self) -> usize {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl TweakProvider for SimulatedTweaks {
    fn list_items(&self) -> Result<Vec<TweakItem>> {
        Ok(self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn set_enabled(&self, id: TweakId, enabled: bool) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            bail!("Unknown tweak id {}", id);
        };

        item.enabled = enabled;
        item.value = if enabled { "on" } else { "off" }.to_string();
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, enabled);
        Ok(())
    }

    fn apply(&self) -> Result<()> {
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            bail!("Camera rejected the settings write");
        }

        let mut staged = self.staged.lock().unwrap_or_else(PoisonError::into_inner);
        for (id, enabled) in staged.drain(..) {
            let state = if enabled { "on" } else { "off" };
            self.log.writeln(&format!("Tweak {}: {}", id, state));
        }
        drop(staged);
        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn default_apps() -> Vec<AppInfo> {
    vec![
        AppInfo::new("Bulb Mode", "com.github.ma1co.openmemories.bulbmode"),
        AppInfo::new("Intervalometer", "com.github.ma1co.openmemories.interval"),
        AppInfo::new("Dual Dial", "com.github.ma1co.openmemories.dualdial"),
    ]
}

fn default_tweaks() -> Vec<TweakItem> {
    vec![
        TweakItem::new(1, "Disable video recording limit", false, "off"),
        TweakItem::new(2, "Unlock all languages", false, "off"),
        TweakItem::new(3, "Disable PAL / NTSC selector warning", true, "on"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_set_enabled_updates_listing_and_stages() {
        let camera = SimulatedCamera::new(LogSink::new());
        let tweaks = camera.tweaks();

        tweaks.set_enabled(1, true).unwrap();

        let items = tweaks.list_items().unwrap();
        assert!(items[0].enabled);
        assert_eq!(items[0].value, "on");
        assert_eq!(tweaks.staged(), 1);

        tweaks.apply().unwrap();
        assert_eq!(tweaks.staged(), 0);
        assert_eq!(tweaks.applied(), 1);
    }

    #[test]
    fn test_unknown_tweak_rejected() {
        let camera = SimulatedCamera::new(LogSink::new());
        assert!(camera.tweaks().set_enabled(99, true).is_err());
    }

    #[test]
    fn test_failed_apply_keeps_staged_changes() {
        let camera = SimulatedCamera::new(LogSink::new());
        let tweaks = camera.tweaks();
        tweaks.set_enabled(2, true).unwrap();
        tweaks.fail_next_apply();

        assert!(tweaks.apply().is_err());
        assert_eq!(tweaks.staged(), 1);
        tweaks.apply().unwrap();
        assert_eq!(tweaks.staged(), 0);
    }

    #[test]
    fn test_backend_rejects_double_start() {
        let camera = SimulatedCamera::new(LogSink::new());
        let backend = camera.backend();

        backend.start().unwrap();
        assert!(backend.start().is_err());
        backend.stop().unwrap();
        assert!(!backend.is_running());
        assert_eq!((backend.starts(), backend.stops()), (1, 1));
    }

    #[test]
    fn test_install_unknown_package_fails() {
        let camera = SimulatedCamera::new(LogSink::new());
        let err = camera
            .install(InstallSource::Package("com.example.missing".into()))
            .unwrap_err();
        assert!(err.to_string().contains("com.example.missing"));
    }

    #[test]
    fn test_firmware_rejects_empty_file() {
        let camera = SimulatedCamera::new(LogSink::new());
        let empty = NamedTempFile::new().unwrap();
        assert!(camera.firmware_update(empty.reopen().unwrap()).is_err());

        let mut image = NamedTempFile::new().unwrap();
        image.write_all(b"FDAT").unwrap();
        camera.firmware_update(image.reopen().unwrap()).unwrap();
    }

    #[test]
    fn test_shell_hands_over_platform() {
        let camera = SimulatedCamera::new(LogSink::new());
        let mut seen = 0;

        camera
            .shell(ShellKind::Senser, &mut |handle: PlatformHandle| {
                seen = handle.tweaks.list_items()?.len();
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, 3);
    }
}
