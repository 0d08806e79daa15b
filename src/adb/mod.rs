//! ADB (Android Debug Bridge) module: device addressing, connection and
//! ADB Keyboard provisioning.

mod address;
mod connection;
mod connector;
mod keyboard;

pub use address::{AddressError, DeviceAddress};
pub(crate) use connection::hide_console_window;
pub use connection::{ADBConnection, AdbError, CommandOutput, ADB_KEYBOARD_IME};
pub use connector::{ConnectError, ConnectReport, DeviceConnector, DeviceGate};
pub use keyboard::{ensure_adb_keyboard, find_apk, KeyboardStatus, INSTALLING_KEYBOARD};
