//! Device connection flow: disconnect, connect, remember, provision keyboard.

use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

use super::address::{AddressError, DeviceAddress};
use super::connection::{ADBConnection, AdbError};
use super::keyboard::{ensure_adb_keyboard, KeyboardStatus};
use crate::settings::SettingsStore;

/// Connection flow errors.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("Connection Failed: {0}")]
    Failed(String),
    #[error("ADB Error: {0}")]
    Adb(#[from] AdbError),
}

/// Outcome of a successful connect.
#[derive(Debug, Clone)]
pub struct ConnectReport {
    pub address: DeviceAddress,
    /// Raw `adb connect` output.
    pub message: String,
    /// Set when the address could not be written to the settings file.
    pub save_error: Option<String>,
    pub keyboard: KeyboardStatus,
}

/// Decides whether a device field blur should start a connect.
///
/// Remembers the last accepted address so repeated blurs on an unchanged
/// field do nothing.
#[derive(Debug, Clone, Default)]
pub struct DeviceGate {
    last: String,
}

impl DeviceGate {
    #[cfg(test)]
    fn with_last(last: impl Into<String>) -> Self {
        Self { last: last.into() }
    }

    /// Feed a blur event.
    ///
    /// Returns `Ok(None)` when nothing should happen, `Ok(Some(addr))` when a
    /// connect should start, and `Err` for a malformed address. Malformed
    /// values are not remembered, so fixing the field and leaving it again
    /// retries.
    pub fn on_blur(&mut self, value: &str) -> Result<Option<DeviceAddress>, AddressError> {
        let value = value.trim();
        if value.is_empty() || value == self.last {
            self.last = value.to_string();
            return Ok(None);
        }

        let address = DeviceAddress::parse(value)?;
        self.last = value.to_string();
        Ok(Some(address))
    }
}

/// Runs the full connect flow against one ADB binary.
#[derive(Debug, Clone)]
pub struct DeviceConnector {
    adb: ADBConnection,
    apk_candidates: Vec<PathBuf>,
    store: SettingsStore,
}

impl DeviceConnector {
    pub fn new(adb: ADBConnection, apk_candidates: Vec<PathBuf>, store: SettingsStore) -> Self {
        Self {
            adb,
            apk_candidates,
            store,
        }
    }

    /// Reconnect to `address` and provision ADB Keyboard.
    ///
    /// Blocking; callers run it off the UI thread. Keyboard problems are
    /// reported in the returned [`ConnectReport`] and never fail the
    /// connection itself. `on_progress` hears about slow steps while the
    /// connect is still running.
    pub fn connect(
        &self,
        address: &DeviceAddress,
        on_progress: impl Fn(&str),
    ) -> Result<ConnectReport, ConnectError> {
        if let Err(e) = self.adb.disconnect_all() {
            tracing::debug!("adb disconnect failed (ignored): {}", e);
        }

        let message = self.adb.connect(address.as_str()).map_err(|e| match e {
            AdbError::Connection(output) => ConnectError::Failed(output),
            other => ConnectError::Adb(other),
        })?;
        tracing::info!(address = %address, "device connected");

        let save_error = self
            .store
            .save(json!({ "device_id": address.as_str() }))
            .err()
            .map(|e| {
                tracing::warn!("failed to save device id: {}", e);
                e.to_string()
            });

        let keyboard = ensure_adb_keyboard(&self.adb, &self.apk_candidates, &on_progress);
        if !keyboard.is_ready() {
            tracing::warn!("{}", keyboard);
        }

        Ok(ConnectReport {
            address: address.clone(),
            message,
            save_error,
            keyboard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_ignores_empty_and_unchanged() {
        let mut gate = DeviceGate::with_last("192.168.1.5:5555");
        assert_eq!(gate.on_blur("192.168.1.5:5555"), Ok(None));
        assert_eq!(gate.on_blur("  "), Ok(None));
    }

    #[test]
    fn test_gate_fires_once_per_change() {
        let mut gate = DeviceGate::default();
        let addr = gate.on_blur("192.168.1.5:5555").unwrap();
        assert_eq!(addr.map(|a| a.to_string()).as_deref(), Some("192.168.1.5:5555"));
        assert_eq!(gate.on_blur("192.168.1.5:5555"), Ok(None));
        assert!(gate.on_blur("192.168.1.6").unwrap().is_some());
    }

    #[test]
    fn test_gate_does_not_remember_invalid_values() {
        let mut gate = DeviceGate::default();
        assert!(gate.on_blur("not-an-ip").is_err());
        assert!(gate.on_blur("not-an-ip").is_err());
    }

    #[test]
    fn test_gate_clearing_resets_memory() {
        let mut gate = DeviceGate::with_last("10.0.0.1");
        assert_eq!(gate.on_blur(""), Ok(None));
        assert!(gate.on_blur("10.0.0.1").unwrap().is_some());
    }

    #[cfg(unix)]
    mod fake_adb {
        use super::super::*;
        use crate::adb::ADB_KEYBOARD_IME;
        use crate::settings::SETTINGS_FILE_NAME;
        use crate::test_support::{temp_dir, write_script};
        use std::fs;

        fn connector(connect_reply: &str) -> (DeviceConnector, SettingsStore, PathBuf) {
            let dir = temp_dir();
            let log = dir.join("calls.log");
            let script = format!(
                r#"echo "$*" >> "{log}"
case "$1" in
  connect) echo "{connect_reply}" ;;
  shell) [ "$3" = "list" ] && echo "{ADB_KEYBOARD_IME}" ;;
esac
exit 0"#,
                log = log.display(),
            );
            let store = SettingsStore::new(dir.join(SETTINGS_FILE_NAME));
            let connector = DeviceConnector::new(
                ADBConnection::with_path(write_script("adb", &script)),
                Vec::new(),
                store.clone(),
            );
            (connector, store, log)
        }

        #[test]
        fn test_successful_connect_persists_and_repairs_keyboard() {
            let (connector, store, log) = connector("connected to 10.0.0.2:5555");
            let address = DeviceAddress::parse("10.0.0.2:5555").unwrap();

            let report = connector.connect(&address, |_| {}).unwrap();
            assert_eq!(report.message, "connected to 10.0.0.2:5555");
            assert_eq!(report.keyboard, KeyboardStatus::Repaired);
            assert!(report.save_error.is_none());
            assert_eq!(store.load_settings().device_id, "10.0.0.2:5555");

            let calls: Vec<String> = fs::read_to_string(&log)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect();
            assert_eq!(calls[0], "disconnect");
            assert_eq!(calls[1], "connect 10.0.0.2:5555");
            assert_eq!(calls[2], "shell ime list -s");
        }

        #[test]
        fn test_failed_connect_does_not_persist() {
            let (connector, store, _log) =
                connector("failed to connect to 10.0.0.2:5555: Connection refused");
            let address = DeviceAddress::parse("10.0.0.2:5555").unwrap();

            let err = connector.connect(&address, |_| {}).unwrap_err();
            assert!(matches!(err, ConnectError::Failed(ref msg) if msg.contains("refused")));
            assert!(!store.path().exists());
        }
    }
}
