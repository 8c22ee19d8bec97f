use super::atapi::read_block;
use super::device::AtaDevice;
use super::ports::PortIo;
use crate::config::AtaConfig;
use crate::drivers::drive::generic_drive::{DriveController, DriveError};

/// Registry-facing wrapper around one detected unit.
///
/// Owns the device record and the port handle used to reach it; the rest of
/// the kernel only sees the `DriveController` capability.
pub struct AtaDiskController<P: PortIo> {
    device: AtaDevice,
    io: P,
    config: AtaConfig,
}

impl<P: PortIo> AtaDiskController<P> {
    pub fn new(device: AtaDevice, io: P, config: AtaConfig) -> Self {
        AtaDiskController { device, io, config }
    }

    pub fn device(&self) -> &AtaDevice {
        &self.device
    }
}

impl<P: PortIo + Send> DriveController for AtaDiskController<P> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, DriveError> {
        let lba = self.device.cursor();
        Ok(read_block(&mut self.io, &self.device, lba, buffer, &self.config)?)
    }

    fn seek(&mut self, block: u32) -> Result<(), DriveError> {
        self.device.set_cursor(block);
        Ok(())
    }

    fn write(&mut self, _data: &[u8]) -> Result<usize, DriveError> {
        Err(DriveError::Unsupported)
    }
}
