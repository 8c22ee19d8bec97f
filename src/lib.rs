#![cfg_attr(not(test), no_std)]

//! Legacy ATA/ATAPI channel driver.
//!
//! Probes the four primary/secondary master/slave slots, classifies each unit
//! from its reset signature, validates its IDENTIFY block and publishes every
//! valid unit as `ATA-<slot>` in the block-device registry. Reads are single
//! block packet transfers driven by programmed I/O.

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod logger;

pub use config::AtaConfig;
pub use drivers::ata::{install, AtaError, AtaResult, DeviceClass, Slot};
#[cfg(target_arch = "x86_64")]
pub use drivers::ata::ata_install;
pub use drivers::drive::generic_drive::{DriveCollection, DriveController, DriveError, DriveInfo};
