//! Error types for the printer library

use thiserror::Error;

use crate::encoding::CharacterProfile;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// No USB device matches the configured vendor/product id
    #[error("Printer not found: {0}")]
    DeviceNotFound(String),

    /// Device present but cannot be opened or claimed (access denied, busy)
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Text contains a character the active code page cannot represent
    #[error("Cannot encode {character:?} at position {position} as {profile}")]
    Encoding {
        character: char,
        position: usize,
        profile: CharacterProfile,
    },

    /// Document content the printer cannot render (bad barcode data, unreadable image)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PrintError {
    /// Build an IO error from a message
    pub fn io(msg: impl Into<String>) -> Self {
        PrintError::Io(std::io::Error::other(msg.into()))
    }

    /// Map a libusb error raised while opening or claiming the device
    pub(crate) fn from_usb_open(err: rusb::Error, what: &str) -> Self {
        match err {
            rusb::Error::NoDevice | rusb::Error::NotFound => {
                PrintError::DeviceNotFound(format!("{what}: {err}"))
            }
            rusb::Error::Access | rusb::Error::Busy => {
                PrintError::Permission(format!("{what}: {err}"))
            }
            other => PrintError::io(format!("{what}: {other}")),
        }
    }

    /// Map a libusb error raised during a bulk transfer
    pub(crate) fn from_usb_transfer(err: rusb::Error, what: &str) -> Self {
        match err {
            rusb::Error::Timeout => PrintError::Timeout(what.to_string()),
            other => PrintError::io(format!("{what}: {other}")),
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
