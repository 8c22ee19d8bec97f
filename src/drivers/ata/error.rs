use strum_macros::Display;

use crate::drivers::drive::generic_drive::DriveError;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum AtaError {
    /// The status register read back as 0x00 after a command.
    AbsentDevice,
    /// Unrecognised LBA-mid/LBA-high pair, or a non-packet unit that left a
    /// non-zero signature after IDENTIFY.
    SignatureMismatch,
    /// ERR was set at a polled checkpoint.
    DeviceError,
    /// Identity word 0 disagrees with the classified device type.
    ValidationMismatch,
    /// A poll hit the configured spin limit.
    Timeout,
    /// Transfer buffer is empty or not a whole number of words.
    InvalidBuffer,
}

pub type AtaResult<T> = Result<T, AtaError>;

impl AtaError {
    pub fn to_str(&self) -> &'static str {
        match self {
            AtaError::AbsentDevice => "No device answered on this slot",
            AtaError::SignatureMismatch => "The device signature does not match a known ATA class",
            AtaError::DeviceError => "The device set the error flag",
            AtaError::ValidationMismatch => "The identity block does not match the device class",
            AtaError::Timeout => "The device did not leave the polled state in time",
            AtaError::InvalidBuffer => "Transfer buffers must hold a whole number of words",
        }
    }
}

impl From<AtaError> for DriveError {
    fn from(err: AtaError) -> Self {
        match err {
            AtaError::AbsentDevice => DriveError::NoMedium,
            AtaError::Timeout => DriveError::Timeout,
            AtaError::InvalidBuffer => DriveError::InvalidBuffer,
            AtaError::SignatureMismatch | AtaError::DeviceError | AtaError::ValidationMismatch => {
                DriveError::DeviceFault
            }
        }
    }
}
