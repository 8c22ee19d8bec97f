use alloc::string::String;
use strum_macros::{Display, EnumIter};

use super::identify::IdentifyData;
use super::ports::{Channel, PortIo, DRIVE_SELECT_REG};
use crate::drivers::drive::generic_drive::DriveInfo;

pub const ATA_CMD_IDENTIFY: u8 = 0xEC;
pub const ATA_CMD_IDENTIFY_PACKET: u8 = 0xA1;
pub const ATA_CMD_PACKET: u8 = 0xA0;

const CONTROL_SRST: u8 = 0x04;
const SELECT_BASE: u8 = 0xA0;

/// Device family, decided once from the reset signature.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Unknown,
    #[strum(serialize = "PATAPI")]
    PacketAta,
    #[strum(serialize = "SATAPI")]
    PacketSata,
    #[strum(serialize = "PATA")]
    Ata,
    #[strum(serialize = "SATA")]
    Sata,
}

impl DeviceClass {
    /// Maps the LBA-mid/LBA-high pair left by a reset to a class.
    pub fn from_signature(mid: u8, high: u8) -> Self {
        match (mid, high) {
            (0x14, 0xEB) => DeviceClass::PacketAta,
            (0x69, 0x96) => DeviceClass::PacketSata,
            (0x00, 0x00) => DeviceClass::Ata,
            (0x3C, 0xC3) => DeviceClass::Sata,
            _ => DeviceClass::Unknown,
        }
    }

    pub fn is_packet(&self) -> bool {
        matches!(self, DeviceClass::PacketAta | DeviceClass::PacketSata)
    }

    /// IDENTIFY flavour this class answers to. `None` for `Unknown`, which
    /// must never reach the command stage.
    pub fn identify_command(&self) -> Option<u8> {
        match self {
            DeviceClass::PacketAta | DeviceClass::PacketSata => Some(ATA_CMD_IDENTIFY_PACKET),
            DeviceClass::Ata | DeviceClass::Sata => Some(ATA_CMD_IDENTIFY),
            DeviceClass::Unknown => None,
        }
    }

    /// Cross-checks identity word 0 against the class. Packet devices report
    /// bit 15 and/or 14; ATA devices keep bit 15 clear.
    pub fn accepts_identity(&self, word0: u16) -> bool {
        let bit15 = word0 & (1 << 15) != 0;
        let bit14 = word0 & (1 << 14) != 0;
        match self {
            DeviceClass::PacketAta | DeviceClass::PacketSata => bit15 || bit14,
            DeviceClass::Ata | DeviceClass::Sata => !bit15,
            DeviceClass::Unknown => false,
        }
    }
}

/// Which of the two devices on a channel a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Unit {
    Master = 0x00,
    Slave = 0x10,
}

impl Unit {
    pub fn bit(&self) -> u8 {
        *self as u8
    }
}

/// The four probed positions, in registration order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Slot {
    PrimaryMaster,
    PrimarySlave,
    SecondaryMaster,
    SecondarySlave,
}

impl Slot {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn channel(&self) -> Channel {
        match self {
            Slot::PrimaryMaster | Slot::PrimarySlave => Channel::PRIMARY,
            Slot::SecondaryMaster | Slot::SecondarySlave => Channel::SECONDARY,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Slot::PrimaryMaster | Slot::SecondaryMaster => Unit::Master,
            Slot::PrimarySlave | Slot::SecondarySlave => Unit::Slave,
        }
    }

    pub fn device_name(&self) -> String {
        alloc::format!("ATA-{}", self.index())
    }
}

/// Busy-waits roughly 100ns per alternate-status read.
pub fn settle<P: PortIo>(io: &mut P, channel: &Channel, reads: u8) {
    for _ in 0..reads {
        channel.alt_status(io);
    }
}

/// Full drive select used by reset and IDENTIFY.
pub fn select<P: PortIo>(io: &mut P, channel: &Channel, unit: Unit, settle_reads: u8) {
    channel.write(io, DRIVE_SELECT_REG, SELECT_BASE | unit.bit());
    settle(io, channel, settle_reads);
}

/// Short select issued before a packet command: the unit bit only.
pub fn select_packet<P: PortIo>(io: &mut P, channel: &Channel, unit: Unit, settle_reads: u8) {
    channel.write(io, DRIVE_SELECT_REG, unit.bit());
    settle(io, channel, settle_reads);
}

/// Pulses SRST. Both units on the channel reset; wait for BSY to clear
/// before sending anything else.
pub fn software_reset<P: PortIo>(io: &mut P, channel: &Channel) {
    channel.write_control(io, CONTROL_SRST);
    channel.write_control(io, 0);
}

/// One detected and validated unit.
///
/// Only detection builds these, and only once the identity block matched
/// the class. The registration adapter owns it afterwards and is the only
/// code that moves `cursor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtaDevice {
    class: DeviceClass,
    channel: Channel,
    unit: Unit,
    supports_lba48: bool,
    lba28_sectors: u32,
    lba48_sectors: u64,
    model: String,
    serial: String,
    firmware: String,
    cursor: u32,
}

impl AtaDevice {
    pub(crate) fn from_identity(channel: Channel, unit: Unit, class: DeviceClass, identity: &IdentifyData) -> Self {
        AtaDevice {
            class,
            channel,
            unit,
            supports_lba48: identity.supports_lba48(),
            lba28_sectors: identity.lba28_sectors(),
            lba48_sectors: identity.lba48_sectors(),
            model: identity.model(),
            serial: identity.serial(),
            firmware: identity.firmware(),
            cursor: 0,
        }
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn supports_lba48(&self) -> bool {
        self.supports_lba48
    }

    pub fn lba28_sectors(&self) -> u32 {
        self.lba28_sectors
    }

    pub fn lba48_sectors(&self) -> u64 {
        self.lba48_sectors
    }

    pub fn sectors(&self) -> u64 {
        if self.supports_lba48 && self.lba48_sectors != 0 {
            self.lba48_sectors
        } else {
            self.lba28_sectors as u64
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, block: u32) {
        self.cursor = block;
    }

    pub fn info(&self, name: String) -> DriveInfo {
        DriveInfo {
            name,
            class: self.class,
            model: self.model.clone(),
            serial: self.serial.clone(),
            firmware: self.firmware.clone(),
            sectors: self.sectors(),
            lba48: self.supports_lba48,
        }
    }
}
