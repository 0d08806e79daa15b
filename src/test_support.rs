//! Helpers shared by unit tests.

use std::fs;
use std::path::PathBuf;

/// Fresh empty directory under the system temp dir.
pub(crate) fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("phone-agent-gui-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write an executable `sh` script named `name` into a fresh temp dir.
#[cfg(unix)]
pub(crate) fn write_script(name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = temp_dir().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
