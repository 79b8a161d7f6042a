//! Translation lookup for user-visible text.
//!
//! Catalogs are embedded JSON objects mapping keys to text. Lookup falls back
//! from the current language to English, then to the key itself, so a missing
//! translation never produces an empty label.
//!
//! # Usage Example
//!
//! ```ignore
//! use pmca_gui::i18n::I18n;
//!
//! let i18n = I18n::new("zh-cn");
//! println!("{}", i18n.tr("no_tweaks_available"));
//! println!("{}", i18n.tr_with("unsupported_language", &[("language", "fr")]));
//! ```

use crate::config::ConfigManager;
use crate::models::settings::DEFAULT_LANGUAGE;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Supported language codes and their display names, in menu order
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[("en", "English"), ("zh-cn", "中文 (简体)")];

const EN_CATALOG: &str = include_str!("en.json");
const ZH_CN_CATALOG: &str = include_str!("zh-cn.json");

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

type Catalog = IndexMap<String, String>;

/// Translation manager
///
/// Holds every catalog plus the current language. Optionally bound to a
/// [`ConfigManager`] so language changes are persisted.
#[derive(Debug)]
pub struct I18n {
    catalogs: IndexMap<&'static str, Catalog>,
    current: RwLock<String>,
    config: Option<ConfigManager>,
}

impl I18n {
    /// A manager using `language`, falling back to English if unsupported
    pub fn new(language: &str) -> Self {
        let catalogs = load_catalogs();
        let current = if is_supported(language) {
            language.to_string()
        } else {
            tracing::warn!(
                "Unsupported language '{}', using '{}'",
                language,
                DEFAULT_LANGUAGE
            );
            DEFAULT_LANGUAGE.to_string()
        };

        Self {
            catalogs,
            current: RwLock::new(current),
            config: None,
        }
    }

    /// A manager initialised from, and persisting to, `config`
    pub fn from_config(config: ConfigManager) -> Self {
        let language = config.language();
        let mut i18n = Self::new(&language);
        i18n.config = Some(config);
        tracing::info!("UI language: {}", i18n.language());
        i18n
    }

    /// Current language code
    pub fn language(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn supported_languages(&self) -> &'static [(&'static str, &'static str)] {
        SUPPORTED_LANGUAGES
    }

    /// Switch language and persist it when a config is bound
    ///
    /// Returns `Ok(false)` (and changes nothing) for an unsupported code.
    /// Already-built widgets keep their text until the application restarts.
    pub fn set_language(&self, language: &str) -> Result<bool> {
        if !is_supported(language) {
            tracing::warn!("Rejected unsupported language '{}'", language);
            return Ok(false);
        }

        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = language.to_string();

        if let Some(config) = &self.config {
            config
                .set_language(language)
                .context("Failed to save language setting")?;
        }

        tracing::info!("Language set to {}", language);
        Ok(true)
    }

    /// Translated text for `key`
    pub fn tr(&self, key: &str) -> String {
        let current = self.language();
        self.catalogs
            .get(current.as_str())
            .and_then(|catalog| catalog.get(key))
            .or_else(|| {
                self.catalogs
                    .get(DEFAULT_LANGUAGE)
                    .and_then(|catalog| catalog.get(key))
            })
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Translated text with `{name}` placeholders filled from `args`
    ///
    /// Placeholders without a matching argument are left as written.
    pub fn tr_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        let text = self.tr(key);
        PLACEHOLDER
            .replace_all(&text, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                args.iter()
                    .find(|(arg, _)| *arg == name)
                    .map(|(_, value)| (*value).to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

fn is_supported(language: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(code, _)| *code == language)
}

fn load_catalogs() -> IndexMap<&'static str, Catalog> {
    let mut catalogs = IndexMap::new();
    for (code, source) in [("en", EN_CATALOG), ("zh-cn", ZH_CN_CATALOG)] {
        let catalog = match serde_json::from_str::<Catalog>(source) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("Error loading translation catalog '{}': {}", code, e);
                Catalog::new()
            }
        };
        catalogs.insert(code, catalog);
    }
    catalogs
}
