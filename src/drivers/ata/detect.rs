use log::{debug, warn};

use super::device::{select, software_reset, AtaDevice, DeviceClass, Unit};
use super::error::{AtaError, AtaResult};
use super::identify::{IdentifyData, IDENTIFY_WORDS};
use super::ports::{Channel, PortIo, COMMAND_REG, LBA_HI_REG, LBA_LO_REG, LBA_MID_REG, SECTOR_COUNT_REG};
use super::status::{wait_busy_clear, wait_data_or_error, StatusFlags};
use crate::config::AtaConfig;

/// Runs the full probe for one channel/unit pair.
///
/// Reset, read the signature, IDENTIFY with the opcode the signature calls
/// for, then check the identity block agrees with the signature. Any step
/// failing leaves the slot empty; the error says which step it was.
pub fn detect<P: PortIo>(io: &mut P, channel: Channel, unit: Unit, config: &AtaConfig) -> AtaResult<AtaDevice> {
    software_reset(io, &channel);
    let status = wait_busy_clear(io, &channel, config.spin_limit)?;
    if !status.contains(StatusFlags::RDY) {
        // Some devices still answer IDENTIFY without RDY after a reset.
        warn!("[ATA] Device not ready. Status : {:#04x}", status.bits());
    }

    select(io, &channel, unit, config.select_settle_reads);
    let class = read_signature(io, &channel);
    if class == DeviceClass::Unknown {
        return Err(AtaError::SignatureMismatch);
    }
    if class.is_packet() {
        debug!("[ATA] Packet device found.");
    }

    let identity = identify(io, &channel, unit, class, config)?;
    if !class.accepts_identity(identity.general_config()) {
        warn!(
            "[ATA] Invalid {} device: identity word 0 is {:#06x}",
            class,
            identity.general_config()
        );
        return Err(AtaError::ValidationMismatch);
    }

    Ok(AtaDevice::from_identity(channel, unit, class, &identity))
}

/// Classifies the selected unit from the signature a reset leaves in
/// LBA-mid/LBA-high. No command is issued.
pub fn read_signature<P: PortIo>(io: &mut P, channel: &Channel) -> DeviceClass {
    let mid = channel.read(io, LBA_MID_REG);
    let high = channel.read(io, LBA_HI_REG);
    let class = DeviceClass::from_signature(mid, high);
    if class == DeviceClass::Unknown {
        debug!("[ATA] Unknown signature {:#04x}/{:#04x}", mid, high);
    }
    class
}

/// Sends IDENTIFY (or IDENTIFY PACKET DEVICE) and reads back the 256-word
/// identity block.
pub fn identify<P: PortIo>(
    io: &mut P,
    channel: &Channel,
    unit: Unit,
    class: DeviceClass,
    config: &AtaConfig,
) -> AtaResult<IdentifyData> {
    let command = class.identify_command().ok_or(AtaError::SignatureMismatch)?;

    select(io, channel, unit, config.select_settle_reads);
    channel.write(io, SECTOR_COUNT_REG, 0);
    channel.write(io, LBA_LO_REG, 0);
    channel.write(io, LBA_MID_REG, 0);
    channel.write(io, LBA_HI_REG, 0);
    channel.write(io, COMMAND_REG, command);

    let status = wait_busy_clear(io, channel, config.spin_limit)?;
    if status.is_absent() {
        return Err(AtaError::AbsentDevice);
    }
    if status.contains(StatusFlags::ERR) {
        warn!("[ATA] Error after sending IDENTIFY. Status : {:#04x}", status.bits());
        return Err(AtaError::DeviceError);
    }

    if !class.is_packet() {
        let mid = channel.read(io, LBA_MID_REG);
        let high = channel.read(io, LBA_HI_REG);
        if mid != 0 || high != 0 {
            warn!("[ATA] No ATA device");
            return Err(AtaError::SignatureMismatch);
        }
    }

    let status = wait_data_or_error(io, channel, config.spin_limit)?;
    if status.contains(StatusFlags::ERR) {
        warn!("[ATA] Error while waiting for IDENTIFY data");
        return Err(AtaError::DeviceError);
    }

    let mut words = [0u16; IDENTIFY_WORDS];
    channel.read_data(io, &mut words);
    Ok(IdentifyData::new(words))
}
