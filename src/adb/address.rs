//! Device address validation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Dotted numeric groups with an optional port. Octets are not bounded to
/// 0-255; only the port range is enforced on top of the pattern.
static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3}\.){3}\d{1,3}(:(\d{1,5}))?$").expect("valid address pattern")
});

/// Address validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid IP Format: {0}")]
    Format(String),
    #[error("Port out of range (1-65535): {0}")]
    Port(String),
}

/// A validated `IPv4[:port]` device address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    raw: String,
}

impl DeviceAddress {
    /// Validate an address string. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let raw = input.trim();
        let caps = ADDRESS_PATTERN
            .captures(raw)
            .ok_or_else(|| AddressError::Format(raw.to_string()))?;

        if let Some(port) = caps.get(3) {
            if !matches!(port.as_str().parse::<u16>(), Ok(1..)) {
                return Err(AddressError::Port(raw.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
        })
    }

    /// The address exactly as it is handed to `adb connect`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
