//! Thin wrapper over the ADB client binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;

/// Component name of the ADB Keyboard input method.
pub const ADB_KEYBOARD_IME: &str = "com.android.adbkeyboard/.AdbIME";

/// ADB invocation errors.
#[derive(Error, Debug)]
pub enum AdbError {
    #[error("Failed to launch {0}: {1}")]
    Launch(String, std::io::Error),
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Captured result of one ADB invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs ADB subcommands against an explicit binary.
///
/// # Example
/// ```rust,no_run
/// use phone_agent_gui::adb::ADBConnection;
///
/// let conn = ADBConnection::with_path("platform-tools/adb");
/// let _ = conn.disconnect_all();
/// let result = conn.connect("192.168.1.100:5555");
/// ```
#[derive(Debug, Clone)]
pub struct ADBConnection {
    adb_path: PathBuf,
}

impl Default for ADBConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl ADBConnection {
    /// Use `adb` from `PATH`.
    pub fn new() -> Self {
        Self::with_path("adb")
    }

    /// Use a specific ADB binary.
    pub fn with_path(adb_path: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb_path
    }

    /// Run one subcommand and capture its output.
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput, AdbError> {
        tracing::debug!(adb = %self.adb_path.display(), ?args, "running adb");

        let mut command = Command::new(&self.adb_path);
        command.args(args);
        hide_console_window(&mut command);

        let output = command
            .output()
            .map_err(|e| AdbError::Launch(self.adb_path.display().to_string(), e))?;
        Ok(output.into())
    }

    /// Disconnect every TCP/IP device.
    pub fn disconnect_all(&self) -> Result<String, AdbError> {
        let output = self.run(&["disconnect"])?;
        Ok(output.stdout.trim().to_string())
    }

    /// Connect to a device over TCP/IP.
    ///
    /// The client reports success on stdout as `connected to <addr>` (or
    /// `already connected to <addr>`); anything else is a failure.
    pub fn connect(&self, address: &str) -> Result<String, AdbError> {
        let output = self.run(&["connect", address])?;
        let stdout = output.stdout.trim();

        if stdout.contains("connected to") {
            Ok(stdout.to_string())
        } else if stdout.is_empty() {
            Err(AdbError::Connection(output.stderr.trim().to_string()))
        } else {
            Err(AdbError::Connection(stdout.to_string()))
        }
    }

    /// Whether the given input method is registered on the device.
    pub fn has_ime(&self, component: &str) -> Result<bool, AdbError> {
        let output = self.run(&["shell", "ime", "list", "-s"])?;
        Ok(output.stdout.contains(component))
    }

    /// Install (or reinstall) an APK.
    pub fn install(&self, apk: &Path) -> Result<CommandOutput, AdbError> {
        let apk = apk.to_string_lossy();
        self.run(&["install", "-r", apk.as_ref()])
    }

    /// Enable an input method and make it the current one.
    ///
    /// Non-zero exits are logged and ignored; only a failure to launch adb
    /// is an error.
    pub fn enable_and_set_ime(&self, component: &str) -> Result<(), AdbError> {
        for action in ["enable", "set"] {
            let output = self.run(&["shell", "ime", action, component])?;
            if !output.success {
                tracing::warn!(component, "ime {} failed: {}", action, output.stderr.trim());
            }
        }
        Ok(())
    }
}

/// Keep child processes from flashing a console window on Windows.
#[cfg(windows)]
pub(crate) fn hide_console_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
pub(crate) fn hide_console_window(_command: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adb_connection_new() {
        let conn = ADBConnection::new();
        assert_eq!(conn.adb_path(), Path::new("adb"));
    }

    #[test]
    fn test_missing_binary_is_a_launch_error() {
        let conn = ADBConnection::with_path("/definitely/not/here/adb");
        assert!(matches!(conn.disconnect_all(), Err(AdbError::Launch(_, _))));
    }

    #[cfg(unix)]
    mod fake_adb {
        use super::super::*;
        use crate::test_support::write_script;

        #[test]
        fn test_connect_success_and_failure() {
            let ok = ADBConnection::with_path(write_script("adb", r#"echo "connected to $2""#));
            assert_eq!(ok.connect("10.0.0.2:5555").unwrap(), "connected to 10.0.0.2:5555");

            let refused = ADBConnection::with_path(write_script(
                "adb",
                r#"echo "failed to connect to '$2': Connection refused""#,
            ));
            let err = refused.connect("10.0.0.2:5555").unwrap_err();
            assert!(err.to_string().contains("Connection refused"));
        }

        #[test]
        fn test_has_ime() {
            let conn = ADBConnection::with_path(write_script(
                "adb",
                &format!("echo com.google.android.inputmethod.latin/.LatinIME\necho {ADB_KEYBOARD_IME}"),
            ));
            assert!(conn.has_ime(ADB_KEYBOARD_IME).unwrap());
            assert!(!conn.has_ime("com.example/.Other").unwrap());
        }

        #[test]
        fn test_rejected_ime_commands_are_not_errors() {
            let conn = ADBConnection::with_path(write_script(
                "adb",
                r#"echo "Unknown input method $4" >&2; exit 1"#,
            ));
            assert!(conn.enable_and_set_ime(ADB_KEYBOARD_IME).is_ok());
        }
    }
}
