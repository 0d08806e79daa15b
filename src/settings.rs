//! Settings persistence shared by the GUI and the CLI.
//!
//! Settings live in a flat JSON object beside the executable. Writes are
//! read-merge-write so keys this program does not know about survive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default settings file name.
pub const SETTINGS_FILE_NAME: &str = "gui_config.json";

/// Default model API base URL shown in a fresh form.
pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Default model name shown in a fresh form.
pub const DEFAULT_MODEL: &str = "autoglm-phone";

/// Settings persistence errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings update must be a JSON object")]
    NotAnObject,
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to create settings directory {0}: {1}")]
    CreateDir(PathBuf, io::Error),
    #[error("Failed to write settings file {0}: {1}")]
    Write(PathBuf, io::Error),
}

/// Typed view over the keys the controller knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiSettings {
    /// Model API base URL
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Model API key (may be empty)
    pub api_key: String,
    /// Last successfully connected device address
    pub device_id: String,
    /// Agent language code ("", "cn" or "en")
    pub language: String,
}

impl Default for GuiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            device_id: String::new(),
            language: String::new(),
        }
    }
}

impl GuiSettings {
    /// Build the typed view from a raw mapping, falling back to defaults for
    /// missing or mistyped keys.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let get = |key: &str, fallback: String| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(fallback)
        };

        Self {
            base_url: get("base_url", defaults.base_url),
            model: get("model", defaults.model),
            api_key: get("api_key", defaults.api_key),
            device_id: get("device_id", defaults.device_id),
            language: get("language", defaults.language),
        }
    }
}

/// Reads and merges the flat JSON settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the raw mapping.
    ///
    /// A missing, unreadable or malformed file all count as "no settings".
    pub fn load(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to read settings: {}", e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "settings file is not a JSON object");
                Map::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to parse settings: {}", e);
                Map::new()
            }
        }
    }

    /// Load the typed view of the settings.
    pub fn load_settings(&self) -> GuiSettings {
        GuiSettings::from_map(&self.load())
    }

    /// Merge `partial` into the persisted mapping and write it back.
    pub fn save(&self, partial: Value) -> Result<(), SettingsError> {
        let Value::Object(partial) = partial else {
            return Err(SettingsError::NotAnObject);
        };

        let mut merged = self.load();
        merged.extend(partial);

        let content = serde_json::to_string_pretty(&Value::Object(merged))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| SettingsError::CreateDir(dir.to_path_buf(), e))?;
        }

        // Write next to the target and rename over it so a crash mid-write
        // never leaves a truncated file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| SettingsError::Write(tmp.clone(), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| SettingsError::Write(self.path.clone(), e))?;

        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> SettingsStore {
        let dir = std::env::temp_dir().join(format!("phone-agent-gui-{}", uuid::Uuid::new_v4()));
        SettingsStore::new(dir.join(SETTINGS_FILE_NAME))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let store = temp_store();
        assert!(store.load().is_empty());
        assert_eq!(store.load_settings(), GuiSettings::default());
    }

    #[test]
    fn test_save_merges_instead_of_replacing() {
        let store = temp_store();
        store.save(json!({ "a": 1 })).unwrap();
        store.save(json!({ "b": 2 })).unwrap();

        let map = store.load();
        assert_eq!(map.get("a"), Some(&json!(1)));
        assert_eq!(map.get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_partial_update_keeps_unknown_keys() {
        let store = temp_store();
        store
            .save(json!({ "window_x": 12, "base_url": "http://old/v1" }))
            .unwrap();
        store.save(json!({ "base_url": "http://new/v1" })).unwrap();

        let map = store.load();
        assert_eq!(map.get("window_x"), Some(&json!(12)));
        assert_eq!(store.load_settings().base_url, "http://new/v1");
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let store = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(store.load().is_empty());

        fs::write(store.path(), "[1, 2, 3]").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_after_malformed_file_recovers() {
        let store = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "garbage").unwrap();

        store.save(json!({ "device_id": "192.168.1.5:5555" })).unwrap();
        assert_eq!(store.load_settings().device_id, "192.168.1.5:5555");
    }

    #[test]
    fn test_save_rejects_non_object() {
        let store = temp_store();
        assert!(matches!(
            store.save(json!("just a string")),
            Err(SettingsError::NotAnObject)
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_typed_view_defaults_for_missing_keys() {
        let mut map = Map::new();
        map.insert("model".to_string(), json!("glm-4v"));
        map.insert("api_key".to_string(), json!(42));

        let settings = GuiSettings::from_map(&map);
        assert_eq!(settings.model, "glm-4v");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.api_key, "");
    }
}
