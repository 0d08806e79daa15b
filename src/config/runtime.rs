//! Runtime paths for the controller: ADB binary, entry point, settings file
//! and the ADB Keyboard APK.
//!
//! Everything is resolved once at startup and handed to the components that
//! need it, so no call site has to guess where the bundled tools live.

use std::env;
use std::path::{Path, PathBuf};

use crate::settings::SETTINGS_FILE_NAME;

/// Overrides the ADB binary.
pub const ENV_ADB_PATH: &str = "ADB_PATH";
/// Overrides the interpreter used to launch the entry point.
pub const ENV_AGENT_PYTHON: &str = "AGENT_PYTHON";
/// Overrides the entry point script.
pub const ENV_AGENT_SCRIPT: &str = "AGENT_SCRIPT";
/// Overrides the settings file location.
pub const ENV_SETTINGS_PATH: &str = "PHONE_AGENT_GUI_CONFIG";
/// Extra APK location, tried before the bundled ones.
pub const ENV_KEYBOARD_APK: &str = "ADB_KEYBOARD_APK";

/// Default interpreter for the entry point script.
pub const DEFAULT_INTERPRETER: &str = "python";
/// Default entry point script name.
pub const DEFAULT_SCRIPT: &str = "main.py";
/// File name of the ADB Keyboard package.
pub const KEYBOARD_APK_NAME: &str = "ADBKeyboard.apk";

/// Directory PyInstaller-style bundles put their payload into.
const BUNDLE_INTERNAL_DIR: &str = "_internal";

#[cfg(windows)]
const ADB_BINARY: &str = "adb.exe";
#[cfg(not(windows))]
const ADB_BINARY: &str = "adb";

/// How to launch the automation entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Interpreter to run the script with; `None` runs the script directly.
    pub interpreter: Option<String>,
    /// Script (or executable) path. Also used as argv[0] of the run request.
    pub script: String,
}

impl Default for EntryPoint {
    fn default() -> Self {
        Self {
            interpreter: Some(DEFAULT_INTERPRETER.to_string()),
            script: DEFAULT_SCRIPT.to_string(),
        }
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct GuiConfig {
    pub adb_path: PathBuf,
    pub entry_point: EntryPoint,
    pub settings_path: PathBuf,
    pub apk_candidates: Vec<PathBuf>,
}

impl GuiConfig {
    /// Resolve from the process environment.
    ///
    /// Loads `.env` from the working directory first, if there is one.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        let config = Self::resolve(exe_dir.as_deref(), |key| env::var(key).ok());
        tracing::info!(
            adb = %config.adb_path.display(),
            settings = %config.settings_path.display(),
            script = %config.entry_point.script,
            "runtime configuration resolved"
        );
        config
    }

    /// Resolve from an arbitrary variable lookup and executable directory.
    pub fn resolve(exe_dir: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let adb_path = lookup(ENV_ADB_PATH)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| bundled_adb(exe_dir));

        let interpreter = match lookup(ENV_AGENT_PYTHON) {
            Some(value) if value.trim().is_empty() || value.trim() == "none" => None,
            Some(value) => Some(value.trim().to_string()),
            None => Some(DEFAULT_INTERPRETER.to_string()),
        };

        let script = lookup(ENV_AGENT_SCRIPT)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                exe_dir
                    .map(|dir| dir.join(DEFAULT_SCRIPT))
                    .filter(|p| p.is_file())
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|| DEFAULT_SCRIPT.to_string())
            });

        let settings_path = lookup(ENV_SETTINGS_PATH)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| match exe_dir {
                Some(dir) => dir.join(SETTINGS_FILE_NAME),
                None => PathBuf::from(SETTINGS_FILE_NAME),
            });

        let mut apk_candidates = Vec::new();
        if let Some(apk) = lookup(ENV_KEYBOARD_APK).filter(|p| !p.trim().is_empty()) {
            apk_candidates.push(PathBuf::from(apk));
        }
        if let Some(dir) = exe_dir {
            apk_candidates.push(dir.join(KEYBOARD_APK_NAME));
            apk_candidates.push(dir.join(BUNDLE_INTERNAL_DIR).join(KEYBOARD_APK_NAME));
        }
        apk_candidates.push(PathBuf::from(KEYBOARD_APK_NAME));

        Self {
            adb_path,
            entry_point: EntryPoint {
                interpreter,
                script,
            },
            settings_path,
            apk_candidates,
        }
    }

    /// Optional CJK font shipped next to the executable.
    pub fn bundled_font() -> Option<Vec<u8>> {
        let exe = env::current_exe().ok()?;
        let path = exe
            .parent()?
            .join("resources")
            .join("NotoSansSC-Regular.ttf");
        std::fs::read(path).ok()
    }
}

/// Bundled ADB next to the executable, or `adb` from `PATH`.
fn bundled_adb(exe_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = exe_dir {
        let candidates = [
            dir.join("platform-tools").join(ADB_BINARY),
            dir.join(BUNDLE_INTERNAL_DIR)
                .join("platform-tools")
                .join(ADB_BINARY),
        ];
        if let Some(found) = candidates.into_iter().find(|p| p.is_file()) {
            return found;
        }
    }
    PathBuf::from("adb")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;
    use std::collections::HashMap;
    use std::fs;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_exe_dir() {
        let config = GuiConfig::resolve(None, lookup_from(&[]));
        assert_eq!(config.adb_path, PathBuf::from("adb"));
        assert_eq!(config.entry_point, EntryPoint::default());
        assert_eq!(config.settings_path, PathBuf::from(SETTINGS_FILE_NAME));
        assert_eq!(config.apk_candidates, vec![PathBuf::from(KEYBOARD_APK_NAME)]);
    }

    #[test]
    fn test_env_overrides_win() {
        let config = GuiConfig::resolve(
            None,
            lookup_from(&[
                (ENV_ADB_PATH, "/opt/sdk/adb"),
                (ENV_AGENT_PYTHON, "python3"),
                (ENV_AGENT_SCRIPT, "/srv/agent/main.py"),
                (ENV_SETTINGS_PATH, "/tmp/settings.json"),
                (ENV_KEYBOARD_APK, "/tmp/kbd.apk"),
            ]),
        );
        assert_eq!(config.adb_path, PathBuf::from("/opt/sdk/adb"));
        assert_eq!(config.entry_point.interpreter.as_deref(), Some("python3"));
        assert_eq!(config.entry_point.script, "/srv/agent/main.py");
        assert_eq!(config.settings_path, PathBuf::from("/tmp/settings.json"));
        assert_eq!(config.apk_candidates[0], PathBuf::from("/tmp/kbd.apk"));
    }

    #[test]
    fn test_interpreter_can_be_disabled() {
        let config = GuiConfig::resolve(None, lookup_from(&[(ENV_AGENT_PYTHON, "none")]));
        assert_eq!(config.entry_point.interpreter, None);

        let config = GuiConfig::resolve(None, lookup_from(&[(ENV_AGENT_PYTHON, "")]));
        assert_eq!(config.entry_point.interpreter, None);
    }

    #[test]
    fn test_bundled_layout_is_found() {
        let dir = temp_dir();
        let tools = dir.join(BUNDLE_INTERNAL_DIR).join("platform-tools");
        fs::create_dir_all(&tools).unwrap();
        fs::write(tools.join(ADB_BINARY), b"").unwrap();
        fs::write(dir.join(DEFAULT_SCRIPT), b"").unwrap();

        let config = GuiConfig::resolve(Some(&dir), lookup_from(&[]));
        assert_eq!(config.adb_path, tools.join(ADB_BINARY));
        assert_eq!(
            config.entry_point.script,
            dir.join(DEFAULT_SCRIPT).to_string_lossy()
        );
        assert_eq!(config.settings_path, dir.join(SETTINGS_FILE_NAME));
        assert_eq!(
            config.apk_candidates,
            vec![
                dir.join(KEYBOARD_APK_NAME),
                dir.join(BUNDLE_INTERNAL_DIR).join(KEYBOARD_APK_NAME),
                PathBuf::from(KEYBOARD_APK_NAME),
            ]
        );
    }
}
