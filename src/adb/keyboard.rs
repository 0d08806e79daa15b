//! ADB Keyboard provisioning.
//!
//! The automation entry point types text through the ADB Keyboard input
//! method, so after every successful connect the controller makes sure the
//! IME is installed, enabled and selected.

use std::fmt;
use std::path::{Path, PathBuf};

use super::connection::{ADBConnection, ADB_KEYBOARD_IME};

/// Progress step reported before an install starts.
pub const INSTALLING_KEYBOARD: &str = "ADB Keyboard not found. Installing...";

/// What happened to the ADB Keyboard after a connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardStatus {
    /// Already registered; enable/set were re-issued.
    Repaired,
    /// Installed from the given APK, then enabled and selected.
    Installed(PathBuf),
    /// None of the candidate APK paths exist.
    ApkMissing(Vec<PathBuf>),
    /// `adb install` exited with an error.
    InstallFailed(String),
    /// ADB itself could not be run.
    Error(String),
}

impl KeyboardStatus {
    /// Whether the keyboard is ready for use.
    pub fn is_ready(&self) -> bool {
        matches!(self, KeyboardStatus::Repaired | KeyboardStatus::Installed(_))
    }
}

impl fmt::Display for KeyboardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyboardStatus::Repaired => write!(f, "ADB Keyboard enabled"),
            KeyboardStatus::Installed(_) => write!(f, "ADB Keyboard Installed & Enabled!"),
            KeyboardStatus::ApkMissing(candidates) => {
                let tried = candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "ADBKeyboard.apk not found (tried: {})", tried)
            }
            KeyboardStatus::InstallFailed(reason) => {
                write!(f, "Failed to install ADB Keyboard: {}", reason)
            }
            KeyboardStatus::Error(reason) => write!(f, "ADB Keyboard Error: {}", reason),
        }
    }
}

/// First candidate that exists on disk.
pub fn find_apk(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|path| path.is_file())
}

/// Make sure ADB Keyboard is installed, enabled and selected.
///
/// # Arguments
/// * `adb` - Connection to the freshly connected device.
/// * `apk_candidates` - APK locations, tried in order when an install is needed.
/// * `on_progress` - Receives [`INSTALLING_KEYBOARD`] before a slow install.
pub fn ensure_adb_keyboard(
    adb: &ADBConnection,
    apk_candidates: &[PathBuf],
    on_progress: &dyn Fn(&str),
) -> KeyboardStatus {
    let installed = match adb.has_ime(ADB_KEYBOARD_IME) {
        Ok(installed) => installed,
        Err(e) => return KeyboardStatus::Error(e.to_string()),
    };

    if installed {
        return match adb.enable_and_set_ime(ADB_KEYBOARD_IME) {
            Ok(()) => KeyboardStatus::Repaired,
            Err(e) => KeyboardStatus::Error(e.to_string()),
        };
    }

    let Some(apk) = find_apk(apk_candidates) else {
        return KeyboardStatus::ApkMissing(apk_candidates.to_vec());
    };

    tracing::info!(apk = %apk.display(), "ADB Keyboard not found, installing");
    on_progress(INSTALLING_KEYBOARD);

    let output = match adb.install(apk) {
        Ok(output) => output,
        Err(e) => return KeyboardStatus::Error(e.to_string()),
    };
    if !output.success {
        let reason = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };
        return KeyboardStatus::InstallFailed(reason);
    }

    match adb.enable_and_set_ime(ADB_KEYBOARD_IME) {
        Ok(()) => KeyboardStatus::Installed(apk.to_path_buf()),
        Err(e) => KeyboardStatus::Error(e.to_string()),
    }
}
