//! Error types for sidewinderd-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No supported keyboard attached, or its device node cannot be opened.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Read, write or ioctl failure on an already opened device.
    #[error("I/O error: {0}")]
    Io(String),

    /// The synthetic uinput keyboard could not be registered.
    #[error("virtual device creation failed: {0}")]
    DeviceCreation(String),

    /// Malformed or unexpected report from the hardware.
    #[error("decode error: {0}")]
    Decode(String),

    /// Macro file could not be read or written.
    #[error("macro persistence error: {0}")]
    MacroPersistence(String),

    /// Missing or invalid configuration entry.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<nix::errno::Errno> for Error {
    fn from(e: nix::errno::Errno) -> Self {
        Self::Io(e.desc().to_string())
    }
}

impl Error {
    /// Whether the event loop can drop the offending input and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::MacroPersistence(_))
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
