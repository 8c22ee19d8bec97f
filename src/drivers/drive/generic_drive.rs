use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use log::info;
use spin::Mutex;
use strum_macros::Display;

use crate::drivers::ata::DeviceClass;

lazy_static! {
    pub static ref DRIVECOLLECTION: Mutex<DriveCollection> = Mutex::new(DriveCollection::new());
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DriveError {
    Unsupported,
    NotFound,
    InvalidBuffer,
    DeviceFault,
    NoMedium,
    Timeout,
}

impl DriveError {
    pub fn to_str(&self) -> &'static str {
        match self {
            DriveError::Unsupported => "The drive does not support this operation",
            DriveError::NotFound => "The drive specified could not be found",
            DriveError::InvalidBuffer => "The buffer must be non-empty and a whole number of words",
            DriveError::DeviceFault => "The device reported an error",
            DriveError::NoMedium => "The device did not answer",
            DriveError::Timeout => "The device stayed busy for too long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveInfo {
    pub name: String,
    pub class: DeviceClass,
    pub model: String,
    pub serial: String,
    pub firmware: String,
    /// Addressable sectors, preferring the 48-bit count when supported.
    pub sectors: u64,
    pub lba48: bool,
}

impl DriveInfo {
    pub fn capacity_bytes(&self) -> u64 {
        self.sectors * 512
    }

    pub fn print(&self) {
        info!("Drive: {} ({})", self.name, self.class);
        info!("Model: {}", self.model);
        info!("Serial Number: {}", self.serial);
        info!("Firmware: {}", self.firmware);
        info!("Capacity: {} bytes, LBA48: {}", self.capacity_bytes(), self.lba48);
    }
}

/// Capability every registered drive exposes to the rest of the kernel.
///
/// Reads are positioned by the last `seek`; a read never moves the position.
pub trait DriveController: Send {
    /// Reads one block at the current position into `buffer`, returning the
    /// number of bytes transferred.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, DriveError>;
    /// Moves the position used by the next `read`.
    fn seek(&mut self, block: u32) -> Result<(), DriveError>;
    fn write(&mut self, data: &[u8]) -> Result<usize, DriveError>;
}

pub struct Drive {
    pub info: DriveInfo,
    controller: Box<dyn DriveController>,
}

impl Drive {
    pub fn new(info: DriveInfo, controller: Box<dyn DriveController>) -> Self {
        Drive { info, controller }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, DriveError> {
        self.controller.read(buffer)
    }

    pub fn seek(&mut self, block: u32) -> Result<(), DriveError> {
        self.controller.seek(block)
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize, DriveError> {
        self.controller.write(data)
    }
}

pub struct DriveCollection {
    pub drives: Vec<Drive>,
}

impl DriveCollection {
    pub const fn new() -> Self {
        DriveCollection { drives: Vec::new() }
    }

    pub fn new_drive(&mut self, info: DriveInfo, controller: Box<dyn DriveController>) {
        info!("Device registered : {}", info.name);
        self.drives.push(Drive::new(info, controller));
    }

    pub fn find(&self, name: &str) -> Option<&Drive> {
        self.drives.iter().find(|drive| drive.name() == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Drive> {
        self.drives.iter_mut().find(|drive| drive.name() == name)
    }

    pub fn read(&mut self, name: &str, buffer: &mut [u8]) -> Result<usize, DriveError> {
        self.find_mut(name).ok_or(DriveError::NotFound)?.read(buffer)
    }

    pub fn seek(&mut self, name: &str, block: u32) -> Result<(), DriveError> {
        self.find_mut(name).ok_or(DriveError::NotFound)?.seek(block)
    }

    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<usize, DriveError> {
        self.find_mut(name).ok_or(DriveError::NotFound)?.write(data)
    }

    pub fn names(&self) -> Vec<&str> {
        self.drives.iter().map(Drive::name).collect()
    }

    pub fn len(&self) -> usize {
        self.drives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    pub fn print_drives(&self) {
        if self.drives.is_empty() {
            info!("No drives in the collection.");
        } else {
            for drive in &self.drives {
                drive.info.print();
            }
        }
    }
}

impl Default for DriveCollection {
    fn default() -> Self {
        Self::new()
    }
}
