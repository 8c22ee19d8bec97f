use alloc::boxed::Box;
use log::{info, warn};
use strum::IntoEnumIterator;

use crate::config::AtaConfig;
use crate::drivers::drive::generic_drive::DriveCollection;

pub mod ata_disk_driver;
pub mod atapi;
pub mod detect;
pub mod device;
pub mod error;
pub mod identify;
pub mod ports;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod status;

pub use ata_disk_driver::AtaDiskController;
pub use detect::detect;
pub use device::{AtaDevice, DeviceClass, Slot, Unit};
pub use error::{AtaError, AtaResult};
pub use ports::{Channel, PortIo};

/// Probes the four legacy slots in order and registers every unit that
/// passes identification as `ATA-<slot>`. A failed slot is logged and
/// skipped. Returns how many devices were registered.
pub fn install<P>(io: &P, config: &AtaConfig, drives: &mut DriveCollection) -> usize
where
    P: PortIo + Clone + Send + 'static,
{
    let mut installed = 0;
    for slot in Slot::iter() {
        let mut port_io = io.clone();
        match detect(&mut port_io, slot.channel(), slot.unit(), config) {
            Ok(device) => {
                let info = device.info(slot.device_name());
                info!("[ATA] {}: {} \"{}\", {} sectors", slot, device.class(), device.model(), device.sectors());
                drives.new_drive(info, Box::new(AtaDiskController::new(device, port_io, *config)));
                installed += 1;
            }
            Err(err) => warn!("[ATA] {}: no device registered ({})", slot, err.to_str()),
        }
    }
    info!("[ATA] Detected {} ATA device(s)", installed);
    installed
}

/// Boot entry: probes the real channels and publishes into the global
/// drive collection.
#[cfg(target_arch = "x86_64")]
pub fn ata_install() -> usize {
    use crate::drivers::drive::generic_drive::DRIVECOLLECTION;

    // SAFETY: runs once during single-threaded boot; nothing else owns the
    // legacy ATA ports.
    let io = unsafe { ports::X86PortIo::new() };
    install(&io, &AtaConfig::default(), &mut DRIVECOLLECTION.lock())
}
