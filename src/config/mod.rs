use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE: &str = "config.json";

/// Configuration manager for loading and saving user settings.
///
/// Settings live in a single JSON file, `~/.pmca/config.json` by default.
/// The directory is created lazily on the first save.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager rooted at `config_dir`.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        }
    }

    /// `~/.pmca`
    pub fn default_dir() -> Result<Utf8PathBuf> {
        let home = dirs::home_dir().context("Could not determine the home directory")?;
        let home = Utf8PathBuf::try_from(home).context("Home directory is not valid UTF-8")?;
        Ok(home.join(".pmca"))
    }

    /// A ConfigManager for the default directory
    pub fn with_default_dir() -> Result<Self> {
        Ok(Self::new(Self::default_dir()?))
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Load the settings file.
    ///
    /// A missing or unreadable file is not an error: a warning is logged and
    /// defaults are returned, so a damaged file never keeps the GUI from
    /// starting.
    pub fn load_settings(&self) -> Settings {
        if !self.settings_path.exists() {
            tracing::debug!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Settings::default();
        }

        match self.read_settings() {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", self.settings_path);
                settings
            }
            Err(e) => {
                tracing::warn!("Error loading settings, using defaults: {:#}", e);
                Settings::default()
            }
        }
    }

    fn read_settings(&self) -> Result<Settings> {
        let contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))
    }

    /// Write the whole settings file, creating the directory if needed.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir).with_context(|| {
                format!("Failed to create config directory: {}", self.config_dir)
            })?;
        }

        let json = serde_json::to_string_pretty(settings)
            .context("Failed to serialize settings to JSON")?;

        fs::write(&self.settings_path, json)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Configured UI language code
    pub fn language(&self) -> String {
        self.load_settings().language
    }

    /// Persist a new UI language, keeping every other key as it was.
    pub fn set_language(&self, language: &str) -> Result<()> {
        let mut settings = self.load_settings();
        settings.language = language.to_string();
        self.save_settings(&settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> ConfigManager {
        let dir = Utf8Path::from_path(temp.path()).unwrap().join(".pmca");
        ConfigManager::new(dir)
    }

    #[test]
    fn test_paths() {
        let config = ConfigManager::new("/tmp/pmca-test");
        assert_eq!(config.config_dir().as_str(), "/tmp/pmca-test");
        assert_eq!(config.settings_path().as_str(), "/tmp/pmca-test/config.json");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = manager(&temp);

        assert_eq!(config.load_settings(), Settings::default());
        assert_eq!(config.language(), "en");
        // Loading never creates the directory
        assert!(!config.config_dir().exists());
    }

    #[test]
    fn test_set_language_creates_directory() {
        let temp = TempDir::new().unwrap();
        let config = manager(&temp);

        config.set_language("zh-cn").unwrap();

        assert!(config.settings_path().exists());
        assert_eq!(config.language(), "zh-cn");
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = manager(&temp);
        fs::create_dir_all(config.config_dir()).unwrap();
        fs::write(config.settings_path(), "{ not json").unwrap();

        assert_eq!(config.load_settings().language, "en");
    }
}
