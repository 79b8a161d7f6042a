//! Integration tests for ConfigManager, settings files and language persistence
//!
//! These tests verify:
//! - Settings loading and saving
//! - Defaults for missing or damaged files
//! - Unknown keys surviving a rewrite
//! - Integration with the translation manager

use camino::Utf8PathBuf;
use pmca_gui::models::Settings;
use pmca_gui::{ConfigManager, I18n};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().join(".pmca")).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path);

    assert_eq!(manager.config_dir(), config_path.as_path());
    assert_eq!(manager.settings_path(), config_path.join("config.json").as_path());
}

#[test]
fn test_default_dir_is_under_home() {
    let dir = ConfigManager::default_dir().unwrap();
    assert_eq!(dir.file_name(), Some(".pmca"));
}

#[test]
fn test_save_and_load_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path);

    let mut settings = Settings::default();
    settings.language = "zh-cn".to_string();
    manager.save_settings(&settings).unwrap();

    assert_eq!(manager.load_settings(), settings);
}

#[test]
fn test_saved_file_is_pretty_json() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path);

    manager.set_language("en").unwrap();

    let contents = fs::read_to_string(manager.settings_path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(value["language"], "en");
    assert!(contents.contains('\n'), "settings should be indented");
}

#[test]
fn test_unknown_keys_preserved() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path);
    fs::create_dir_all(&config_path).unwrap();
    fs::write(
        manager.settings_path(),
        r#"{"language": "en", "window": "maximized"}"#,
    )
    .unwrap();

    manager.set_language("zh-cn").unwrap();

    let settings = manager.load_settings();
    assert_eq!(settings.language, "zh-cn");
    assert_eq!(
        settings.extra.get("window").map(String::as_str),
        Some("maximized")
    );
}

#[test]
fn test_invalid_json_falls_back_to_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path);
    fs::create_dir_all(&config_path).unwrap();
    fs::write(manager.settings_path(), "language = zh-cn").unwrap();

    assert_eq!(manager.load_settings(), Settings::default());

    // A save after a failed load replaces the damaged file
    manager.set_language("zh-cn").unwrap();
    assert_eq!(manager.language(), "zh-cn");
}

#[test]
fn test_i18n_reads_saved_language() {
    let (_temp_dir, config_path) = create_test_config_dir();
    ConfigManager::new(&config_path).set_language("zh-cn").unwrap();

    let i18n = I18n::from_config(ConfigManager::new(&config_path));

    assert_eq!(i18n.language(), "zh-cn");
    assert_eq!(i18n.tr("refresh"), "刷新");
}

#[test]
fn test_i18n_ignores_unsupported_saved_language() {
    let (_temp_dir, config_path) = create_test_config_dir();
    ConfigManager::new(&config_path).set_language("tlh").unwrap();

    let i18n = I18n::from_config(ConfigManager::new(&config_path));

    assert_eq!(i18n.language(), "en");
    assert_eq!(i18n.tr("refresh"), "Refresh");
}
