//! Output log for the GUI.
//!
//! Holds everything the entry point printed during this session, and mirrors
//! it to a session log file on disk.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Notice severity, as written to the session log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Get display string for the log level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Append-only output buffer with optional auto-scroll.
#[derive(Debug, Clone)]
pub struct OutputLog {
    text: String,
    auto_scroll: bool,
    /// Current session log file path.
    log_file: Option<PathBuf>,
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputLog {
    /// Create a buffer that also writes a session log file.
    pub fn new() -> Self {
        Self {
            log_file: Self::create_log_file(),
            ..Self::in_memory()
        }
    }

    /// Create a buffer without a backing file.
    pub fn in_memory() -> Self {
        Self {
            text: String::new(),
            auto_scroll: true,
            log_file: None,
        }
    }

    /// Directory holding session log files.
    pub fn logs_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "moderras", "phone-agent-gui")
            .map(|dirs| dirs.data_dir().join("logs"))
    }

    /// Create a new log file for this session.
    fn create_log_file() -> Option<PathBuf> {
        let logs_dir = Self::logs_dir()?;
        fs::create_dir_all(&logs_dir).ok()?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = logs_dir.join(format!("session_{}.log", timestamp));

        File::create(&path).ok()?;
        tracing::debug!(path = %path.display(), "session log created");
        Some(path)
    }

    fn write_file(&self, content: &str) {
        if let Some(ref path) = self.log_file {
            if let Ok(mut file) = OpenOptions::new().append(true).open(path) {
                let _ = file.write_all(content.as_bytes());
            }
        }
    }

    /// Append a chunk of output.
    ///
    /// Returns `true` when the view should scroll to the end.
    pub fn append(&mut self, chunk: &str) -> bool {
        self.text.push_str(chunk);
        self.write_file(chunk);
        self.auto_scroll
    }

    /// Record a notice in the session file only.
    pub fn note(&self, level: LogLevel, message: &str) {
        self.write_file(&format!(
            "[{}] [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level.as_str(),
            message
        ));
    }

    /// Empty the buffer. The session file is left as is.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn set_auto_scroll(&mut self, enabled: bool) {
        self.auto_scroll = enabled;
    }

    /// Get the current log file path.
    pub fn log_file_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
