use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Language used when nothing is configured
pub const DEFAULT_LANGUAGE: &str = "en";

/// User preferences from `config.json`
///
/// The file is a flat key → string mapping. Keys this version does not know
/// are kept in `extra` so a rewrite never loses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: default_language(),
            extra: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_language() {
        assert_eq!(Settings::default().language, "en");
    }

    #[test]
    fn test_missing_language_uses_default() {
        let settings: Settings = serde_json::from_str(r#"{"theme": "dark"}"#).unwrap();
        assert_eq!(settings.language, "en");
        assert_eq!(settings.extra.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn test_unknown_keys_survive_serialization() {
        let settings: Settings =
            serde_json::from_str(r#"{"language": "zh-cn", "last_apk": "/tmp/a.apk"}"#).unwrap();
        let json = serde_json::to_string(&settings).unwrap();

        assert!(json.contains(r#""language":"zh-cn""#));
        assert!(json.contains(r#""last_apk":"/tmp/a.apk""#));
    }
}
