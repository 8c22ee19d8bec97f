use log::warn;

use super::device::{select_packet, AtaDevice, ATA_CMD_PACKET};
use super::error::{AtaError, AtaResult};
use super::ports::{Channel, PortIo, COMMAND_REG, FEATURES_REG, LBA_HI_REG, LBA_MID_REG};
use super::status::{wait_busy_clear, wait_data_or_error, wait_drained, StatusFlags};
use crate::config::AtaConfig;

pub const ATAPI_CMD_READ_12: u8 = 0xA8;
pub const PACKET_SIZE: usize = 12;

/// Largest even byte count the LBA-mid/LBA-high pair can carry.
const MAX_BYTE_COUNT: usize = 0xFFFE;

/// Words moved per batched data-register read.
const TRANSFER_CHUNK_WORDS: usize = 256;

/// READ(12) for exactly one block at `lba`.
pub fn read12_packet(lba: u32) -> [u8; PACKET_SIZE] {
    let mut packet = [0u8; PACKET_SIZE];
    packet[0] = ATAPI_CMD_READ_12;
    packet[2..6].copy_from_slice(&lba.to_be_bytes());
    packet[9] = 1;
    packet
}

/// The packet as the six data-register writes that carry it.
pub fn packet_words(packet: &[u8; PACKET_SIZE]) -> [u16; PACKET_SIZE / 2] {
    let mut words = [0u16; PACKET_SIZE / 2];
    for (word, pair) in words.iter_mut().zip(packet.chunks_exact(2)) {
        *word = u16::from_le_bytes([pair[0], pair[1]]);
    }
    words
}

/// Reads the block at `lba` into `buffer` with a PACKET command.
///
/// `buffer.len()` is the byte-count limit given to the device. Returns the
/// number of bytes stored. There is no retry: ERR before the data phase
/// fails the call without touching the data register.
pub fn read_block<P: PortIo>(
    io: &mut P,
    device: &AtaDevice,
    lba: u32,
    buffer: &mut [u8],
    config: &AtaConfig,
) -> AtaResult<usize> {
    if buffer.is_empty() || buffer.len() % 2 != 0 {
        return Err(AtaError::InvalidBuffer);
    }
    let channel = device.channel();
    let limit = buffer.len().min(MAX_BYTE_COUNT) as u16;

    select_packet(io, &channel, device.unit(), config.packet_settle_reads);
    channel.write(io, FEATURES_REG, 0); // PIO
    channel.write(io, LBA_MID_REG, (limit & 0xFF) as u8);
    channel.write(io, LBA_HI_REG, (limit >> 8) as u8);
    channel.write(io, COMMAND_REG, ATA_CMD_PACKET);

    wait_busy_clear(io, &channel, config.spin_limit)?;
    let status = wait_data_or_error(io, &channel, config.spin_limit)?;
    if status.contains(StatusFlags::ERR) {
        warn!("[ATA] PACKET rejected on {:#x} for block {}", channel.base, lba);
        return Err(AtaError::DeviceError);
    }

    channel.write_data(io, &packet_words(&read12_packet(lba)));

    let size = ((channel.read(io, LBA_HI_REG) as usize) << 8) | channel.read(io, LBA_MID_REG) as usize;
    let stored = read_into(io, &channel, size / 2, buffer);

    // Drain errors are ignored; a stuck DRQ keeps what was already stored.
    if wait_drained(io, &channel, config.spin_limit).is_err() {
        warn!("[ATA] DRQ still set on {:#x} after block {}", channel.base, lba);
    }
    Ok(stored)
}

/// Reads `words` words from the data register into `buffer`, through a
/// small stack chunk so the batched data-port path is kept. Everything the
/// device offered is read so DRQ drops; only what fits is kept.
fn read_into<P: PortIo>(io: &mut P, channel: &Channel, words: usize, buffer: &mut [u8]) -> usize {
    let mut chunk = [0u16; TRANSFER_CHUNK_WORDS];
    let mut offset = 0;
    let mut remaining = words;
    while remaining > 0 {
        let count = remaining.min(TRANSFER_CHUNK_WORDS);
        channel.read_data(io, &mut chunk[..count]);
        for word in &chunk[..count] {
            if let Some(pair) = buffer.get_mut(offset..offset + 2) {
                pair.copy_from_slice(&word.to_le_bytes());
            }
            offset += 2;
        }
        remaining -= count;
    }
    offset.min(buffer.len())
}
