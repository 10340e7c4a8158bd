use std::io;

use thiserror::Error;

use crate::{sensor::SensorKind, VID};

/// Status byte at the head of every response.
///
/// Every byte value maps to exactly one status.
///
/// # Example
///
/// ```
/// use corsairlink::Status;
///
/// assert_eq!(Status::from(0x11), Status::NotConnected);
/// assert_eq!(Status::from(0x42), Status::Unknown(0x42));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    /// The device does not know the command.
    Unsupported,
    /// Bad channel or register index.
    InvalidArgument,
    /// Sensor is not connected.
    NotConnected,
    /// Channel is not under this control mode.
    WrongMode,
    Unknown(u8),
}

impl From<u8> for Status {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => Status::Success,
            0x01 => Status::Unsupported,
            0x10 => Status::InvalidArgument,
            0x11 => Status::NotConnected,
            0x12 => Status::WrongMode,
            other => Status::Unknown(other),
        }
    }
}

impl Status {
    /// Convert the status to a result, success maps to `Ok(())`.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Status::Success => Ok(()),
            Status::Unsupported => Err(Error::Unsupported),
            Status::InvalidArgument => Err(Error::InvalidArgument),
            Status::NotConnected | Status::WrongMode => Err(Error::NoData),
            Status::Unknown(byte) => {
                tracing::debug!(status = byte, "unknown device response error");
                Err(Error::UnknownDevice(byte))
            }
        }
    }
}

/// Map a raw status byte to a result.
pub fn map_status(byte: u8) -> Result<(), Error> {
    Status::from(byte).into_result()
}

/// Sensor read error.
#[derive(Debug, Error)]
pub enum Error {
    /// The device rejected the command.
    #[error("command not supported by the device")]
    Unsupported,
    /// The device rejected the channel or register index.
    #[error("invalid argument")]
    InvalidArgument,
    /// Sensor disconnected, or channel not in the right mode.
    #[error("no data")]
    NoData,
    /// Unrecognized status byte.
    #[error("unknown device response error 0x{0:02X}")]
    UnknownDevice(u8),
    #[error("no response from device")]
    Timeout,
    /// The command does not fit in one report.
    #[error("command longer than one report")]
    CommandTooLong,
    /// Transport failed to send the frame.
    #[error("transport: {0}")]
    Transport(#[from] io::Error),
    /// The channel index does not exist for this sensor kind.
    ///
    /// Raised before anything is sent to the device.
    #[error("{kind:?} has no channel {channel}")]
    InvalidChannel { kind: SensorKind, channel: u8 },
    #[cfg(feature = "tokio")]
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Power supply open error.
#[derive(Debug, Error)]
pub enum OpenError {
    /// IO error.
    #[error("{0}")]
    Io(#[from] io::Error),
    /// Invalid vendor ID.
    ///
    /// The inner value is the invalid vendor ID received.
    #[error("Invalid power supply vendor ID 0x{0:04X} (expected 0x{vid:04X})", vid = VID)]
    InvalidVendorId(u16),
    /// Invalid product ID.
    ///
    /// The inner value is the invalid product ID received.
    #[error("Invalid power supply product ID 0x{0:04X}")]
    InvalidProductId(u16),
    /// Fetching the device identity failed.
    #[error("session start: {0}")]
    Session(#[from] Error),
}
