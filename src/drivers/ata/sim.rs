//! Simulated legacy ATA register file.
//!
//! `SimulatedBus` implements [`PortIo`] over both legacy channels so the
//! detection and transfer protocols can run without hardware, in the kernel
//! self-tests and in host unit tests. Each slot can hold a [`SimDisk`]
//! describing how that unit answers: its reset signature, identity block,
//! block contents, and any injected busy cycles, errors or hangs.
//!
//! The model follows the register-level behaviour the driver relies on:
//!
//! * SRST pulses on the control port reset both units, select the master
//!   and leave each unit's signature in LBA-mid/LBA-high.
//! * Taskfile registers are per unit and follow the drive-select register.
//! * IDENTIFY and IDENTIFY PACKET DEVICE answer only on the matching
//!   interface; the other opcode aborts with ERR.
//! * PACKET takes six data-register writes, then offers one block (clamped
//!   to the byte-count limit) and reports its size in LBA-mid/LBA-high.
//!
//! The bus also records what the driver did (commands, packets, data words
//! read) so tests can assert on the exact protocol.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use spin::Mutex;

use super::atapi::{ATAPI_CMD_READ_12, PACKET_SIZE};
use super::device::{Slot, ATA_CMD_IDENTIFY, ATA_CMD_IDENTIFY_PACKET, ATA_CMD_PACKET};
use super::identify::IDENTIFY_WORDS;
use super::ports::{
    Channel, PortIo, COMMAND_REG, DATA_REG, DRIVE_SELECT_REG, ERROR_REG, LBA_HI_REG, LBA_LO_REG, LBA_MID_REG,
    SECTOR_COUNT_REG, STATUS_REG,
};
use super::status::StatusFlags;

const RDY: u8 = StatusFlags::RDY.bits();
const DRQ: u8 = StatusFlags::DRQ.bits();
const ERR: u8 = StatusFlags::ERR.bits();
const BSY: u8 = StatusFlags::BSY.bits();

const ERROR_ABRT: u8 = 0x04;
const CONTROL_SRST: u8 = 0x04;
const FLOATING_BUS: u8 = 0xFF;

/// How one simulated unit behaves.
#[derive(Debug, Clone)]
pub struct SimDisk {
    /// LBA-mid/LBA-high after reset.
    pub signature: (u8, u8),
    /// Answers IDENTIFY PACKET DEVICE instead of IDENTIFY.
    pub packet_interface: bool,
    pub identity: [u16; IDENTIFY_WORDS],
    /// LBA-mid/LBA-high after a successful IDENTIFY.
    pub post_identify_signature: (u8, u8),
    pub ready_after_reset: bool,
    pub fail_identify: bool,
    /// IDENTIFY is accepted with a clean status, then ERR comes up where DRQ
    /// should.
    pub fail_identify_data: bool,
    pub fail_packet: bool,
    /// DRQ stays up after a packet transfer has been read out.
    pub stuck_drq: bool,
    /// Status reads reporting BSY after every reset or command.
    pub busy_reads: u32,
    /// BSY never clears.
    pub hang: bool,
    pub block_size: usize,
    pub blocks: BTreeMap<u32, Vec<u8>>,
}

impl SimDisk {
    fn new(signature: (u8, u8), packet_interface: bool, word0: u16, block_size: usize) -> Self {
        let mut identity = [0u16; IDENTIFY_WORDS];
        identity[0] = word0;
        SimDisk {
            signature,
            packet_interface,
            identity,
            post_identify_signature: (0, 0),
            ready_after_reset: true,
            fail_identify: false,
            fail_identify_data: false,
            fail_packet: false,
            stuck_drq: false,
            busy_reads: 0,
            hang: false,
            block_size,
            blocks: BTreeMap::new(),
        }
    }

    pub fn ata() -> Self {
        SimDisk::new((0x00, 0x00), false, 0x0040, 512)
    }

    pub fn sata() -> Self {
        SimDisk::new((0x3C, 0xC3), false, 0x0040, 512)
    }

    pub fn packet_ata() -> Self {
        SimDisk::new((0x14, 0xEB), true, 0x85C0, 2048)
    }

    pub fn packet_sata() -> Self {
        SimDisk::new((0x69, 0x96), true, 0x85C0, 2048)
    }

    pub fn with_signature(mut self, mid: u8, high: u8) -> Self {
        self.signature = (mid, high);
        self
    }

    pub fn with_word0(mut self, word0: u16) -> Self {
        self.identity[0] = word0;
        self
    }

    pub fn with_identity(mut self, identity: [u16; IDENTIFY_WORDS]) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_post_identify_signature(mut self, mid: u8, high: u8) -> Self {
        self.post_identify_signature = (mid, high);
        self
    }

    pub fn with_block(mut self, lba: u32, data: &[u8]) -> Self {
        self.blocks.insert(lba, data.to_vec());
        self
    }

    pub fn with_busy_reads(mut self, reads: u32) -> Self {
        self.busy_reads = reads;
        self
    }

    pub fn not_ready_after_reset(mut self) -> Self {
        self.ready_after_reset = false;
        self
    }

    pub fn failing_identify(mut self) -> Self {
        self.fail_identify = true;
        self
    }

    pub fn failing_identify_data(mut self) -> Self {
        self.fail_identify_data = true;
        self
    }

    pub fn failing_packet(mut self) -> Self {
        self.fail_packet = true;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    fn block(&self, lba: u32) -> Vec<u8> {
        let mut data = self.blocks.get(&lba).cloned().unwrap_or_default();
        data.resize(self.block_size, 0);
        data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitPacket,
    DataIn,
    PacketIn,
}

#[derive(Debug)]
struct UnitState {
    disk: Option<SimDisk>,
    status: u8,
    busy: u32,
    error: u8,
    sector_count: u8,
    lba_lo: u8,
    lba_mid: u8,
    lba_hi: u8,
    phase: Phase,
    /// ERR to raise after the next settled status read.
    error_pending: bool,
    fifo: VecDeque<u16>,
    packet: Vec<u16>,
}

impl UnitState {
    fn empty() -> Self {
        UnitState {
            disk: None,
            status: 0,
            busy: 0,
            error: 0,
            sector_count: 0,
            lba_lo: 0,
            lba_mid: 0,
            lba_hi: 0,
            phase: Phase::Idle,
            error_pending: false,
            fifo: VecDeque::new(),
            packet: Vec::new(),
        }
    }

    fn status(&mut self, consume: bool) -> u8 {
        let Some(disk) = &self.disk else {
            return 0;
        };
        if disk.hang {
            return BSY;
        }
        if self.busy > 0 {
            if consume {
                self.busy -= 1;
            }
            return BSY;
        }
        let status = self.status;
        if consume && self.error_pending {
            self.error_pending = false;
            self.abort();
        }
        status
    }

    fn reset(&mut self) {
        let Some(disk) = &self.disk else {
            return;
        };
        self.status = if disk.ready_after_reset { RDY } else { 0 };
        self.busy = disk.busy_reads;
        self.error = 0;
        self.error_pending = false;
        (self.lba_mid, self.lba_hi) = disk.signature;
        self.phase = Phase::Idle;
        self.fifo.clear();
        self.packet.clear();
    }

    fn abort(&mut self) {
        self.status = RDY | ERR;
        self.error = ERROR_ABRT;
        self.phase = Phase::Idle;
        self.fifo.clear();
    }

    fn command(&mut self, command: u8) {
        let Some(disk) = &self.disk else {
            return;
        };
        self.busy = disk.busy_reads;
        self.error = 0;
        self.error_pending = false;
        match command {
            ATA_CMD_IDENTIFY | ATA_CMD_IDENTIFY_PACKET => {
                let wants_packet = command == ATA_CMD_IDENTIFY_PACKET;
                if disk.fail_identify || wants_packet != disk.packet_interface {
                    (self.lba_mid, self.lba_hi) = disk.signature;
                    self.abort();
                } else if disk.fail_identify_data {
                    (self.lba_mid, self.lba_hi) = disk.post_identify_signature;
                    self.status = RDY;
                    self.error_pending = true;
                } else {
                    (self.lba_mid, self.lba_hi) = disk.post_identify_signature;
                    self.fifo = disk.identity.iter().copied().collect();
                    self.phase = Phase::DataIn;
                    self.status = RDY | DRQ;
                }
            }
            ATA_CMD_PACKET => {
                if disk.fail_packet {
                    self.abort();
                } else {
                    self.phase = Phase::AwaitPacket;
                    self.packet.clear();
                    self.status = RDY | DRQ;
                }
            }
            _ => self.abort(),
        }
    }

    /// Consumes a complete command packet, returning it for the bus log.
    fn finish_packet(&mut self) -> [u8; PACKET_SIZE] {
        let mut packet = [0u8; PACKET_SIZE];
        for (pair, word) in packet.chunks_exact_mut(2).zip(self.packet.drain(..)) {
            pair.copy_from_slice(&word.to_le_bytes());
        }
        let Some(disk) = &self.disk else {
            return packet;
        };
        if packet[0] != ATAPI_CMD_READ_12 {
            self.abort();
            return packet;
        }

        let lba = u32::from_be_bytes([packet[2], packet[3], packet[4], packet[5]]);
        let data = disk.block(lba);
        let limit = ((self.lba_hi as usize) << 8) | self.lba_mid as usize;
        let count = limit.min(data.len()) & !1;

        self.busy = disk.busy_reads;
        self.lba_mid = (count & 0xFF) as u8;
        self.lba_hi = (count >> 8) as u8;
        self.fifo = data[..count]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if self.fifo.is_empty() {
            self.phase = Phase::Idle;
            self.status = RDY;
        } else {
            self.phase = Phase::PacketIn;
            self.status = RDY | DRQ;
        }
        packet
    }

    fn read_data(&mut self) -> u16 {
        let word = self.fifo.pop_front().unwrap_or(0);
        if self.fifo.is_empty() {
            let stuck = self.phase == Phase::PacketIn
                && self.disk.as_ref().is_some_and(|disk| disk.stuck_drq);
            if matches!(self.phase, Phase::DataIn | Phase::PacketIn) && !stuck {
                self.phase = Phase::Idle;
                self.status = RDY;
            }
        }
        word
    }
}

#[derive(Debug)]
struct ChannelState {
    channel: Channel,
    units: [UnitState; 2],
    selected: usize,
    srst: bool,
}

impl ChannelState {
    fn new(channel: Channel) -> Self {
        ChannelState {
            channel,
            units: [UnitState::empty(), UnitState::empty()],
            selected: 0,
            srst: false,
        }
    }

    fn unit(&mut self) -> &mut UnitState {
        &mut self.units[self.selected]
    }
}

#[derive(Debug)]
struct BusState {
    channels: [ChannelState; 2],
    commands: Vec<(u16, u8)>,
    packets: Vec<[u8; PACKET_SIZE]>,
    data_words_read: usize,
}

enum Target {
    Register(usize, u16),
    Control(usize),
    Nothing,
}

impl BusState {
    fn target(&self, port: u16) -> Target {
        for (index, state) in self.channels.iter().enumerate() {
            let channel = state.channel;
            if (channel.base..channel.base + 8).contains(&port) {
                return Target::Register(index, port - channel.base);
            }
            if port == channel.control {
                return Target::Control(index);
            }
        }
        Target::Nothing
    }

    fn read_u8(&mut self, port: u16) -> u8 {
        match self.target(port) {
            Target::Register(index, reg) => {
                let channel = &mut self.channels[index];
                let selected = channel.selected as u8;
                let unit = channel.unit();
                if unit.disk.is_none() {
                    return 0;
                }
                match reg {
                    ERROR_REG => unit.error,
                    SECTOR_COUNT_REG => unit.sector_count,
                    LBA_LO_REG => unit.lba_lo,
                    LBA_MID_REG => unit.lba_mid,
                    LBA_HI_REG => unit.lba_hi,
                    DRIVE_SELECT_REG => 0xA0 | (selected << 4),
                    STATUS_REG => unit.status(true),
                    _ => 0,
                }
            }
            Target::Control(index) => self.channels[index].unit().status(false),
            Target::Nothing => FLOATING_BUS,
        }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        match self.target(port) {
            Target::Register(index, reg) => {
                let channel = &mut self.channels[index];
                match reg {
                    DRIVE_SELECT_REG => channel.selected = ((value >> 4) & 1) as usize,
                    SECTOR_COUNT_REG => channel.unit().sector_count = value,
                    LBA_LO_REG => channel.unit().lba_lo = value,
                    LBA_MID_REG => channel.unit().lba_mid = value,
                    LBA_HI_REG => channel.unit().lba_hi = value,
                    COMMAND_REG => {
                        let base = channel.channel.base;
                        channel.unit().command(value);
                        self.commands.push((base, value));
                    }
                    _ => {}
                }
            }
            Target::Control(index) => {
                let channel = &mut self.channels[index];
                if value & CONTROL_SRST != 0 {
                    channel.srst = true;
                } else if channel.srst {
                    channel.srst = false;
                    channel.selected = 0;
                    for unit in channel.units.iter_mut() {
                        unit.reset();
                    }
                }
            }
            Target::Nothing => {}
        }
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        match self.target(port) {
            Target::Register(index, DATA_REG) => {
                self.data_words_read += 1;
                self.channels[index].unit().read_data()
            }
            _ => 0xFFFF,
        }
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        if let Target::Register(index, DATA_REG) = self.target(port) {
            let unit = self.channels[index].unit();
            if unit.phase != Phase::AwaitPacket {
                return;
            }
            unit.packet.push(value);
            if unit.packet.len() == PACKET_SIZE / 2 {
                let packet = unit.finish_packet();
                self.packets.push(packet);
            }
        }
    }
}

/// Handle to a simulated pair of legacy channels. Clones share state, so a
/// test can keep one handle while the driver owns others.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    state: Arc<Mutex<BusState>>,
}

impl SimulatedBus {
    /// Both legacy channels, nothing attached.
    pub fn new() -> Self {
        SimulatedBus {
            state: Arc::new(Mutex::new(BusState {
                channels: [ChannelState::new(Channel::PRIMARY), ChannelState::new(Channel::SECONDARY)],
                commands: Vec::new(),
                packets: Vec::new(),
                data_words_read: 0,
            })),
        }
    }

    pub fn with(self, slot: Slot, disk: SimDisk) -> Self {
        self.attach(slot, disk);
        self
    }

    pub fn attach(&self, slot: Slot, disk: SimDisk) {
        let mut state = self.state.lock();
        let unit = &mut state.channels[slot.index() / 2].units[slot.index() % 2];
        unit.disk = Some(disk);
        unit.reset();
    }

    /// Edits an attached disk in place, e.g. to inject a failure after
    /// detection has already succeeded.
    pub fn update<F: FnOnce(&mut SimDisk)>(&self, slot: Slot, edit: F) -> bool {
        let mut state = self.state.lock();
        match state.channels[slot.index() / 2].units[slot.index() % 2].disk.as_mut() {
            Some(disk) => {
                edit(disk);
                true
            }
            None => false,
        }
    }

    /// Every command byte written, with the channel base it went to.
    pub fn commands(&self) -> Vec<(u16, u8)> {
        self.state.lock().commands.clone()
    }

    /// Every complete command packet received, oldest first.
    pub fn packets(&self) -> Vec<[u8; PACKET_SIZE]> {
        self.state.lock().packets.clone()
    }

    pub fn data_words_read(&self) -> usize {
        self.state.lock().data_words_read
    }

    pub fn block(&self, slot: Slot, lba: u32) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state.channels[slot.index() / 2].units[slot.index() % 2]
            .disk
            .as_ref()
            .map(|disk| disk.block(lba))
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PortIo for SimulatedBus {
    fn read_u8(&mut self, port: u16) -> u8 {
        self.state.lock().read_u8(port)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        self.state.lock().write_u8(port, value)
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        self.state.lock().read_u16(port)
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        self.state.lock().write_u16(port, value)
    }
}

/// A block filled with a recognisable pattern: byte `i` is `lba + i`.
pub fn pattern_block(lba: u32, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = (lba as usize + i) as u8;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_exposes_signature_of_selected_unit() {
        let mut bus = SimulatedBus::new()
            .with(Slot::PrimaryMaster, SimDisk::ata())
            .with(Slot::PrimarySlave, SimDisk::packet_ata());
        let channel = Channel::PRIMARY;

        channel.write_control(&mut bus, CONTROL_SRST);
        channel.write_control(&mut bus, 0);
        assert_eq!(channel.read(&mut bus, STATUS_REG), RDY);
        assert_eq!((channel.read(&mut bus, LBA_MID_REG), channel.read(&mut bus, LBA_HI_REG)), (0, 0));

        channel.write(&mut bus, DRIVE_SELECT_REG, 0xB0);
        assert_eq!((channel.read(&mut bus, LBA_MID_REG), channel.read(&mut bus, LBA_HI_REG)), (0x14, 0xEB));
    }

    #[test]
    fn empty_slot_reads_as_zero_and_unmapped_ports_float() {
        let mut bus = SimulatedBus::new();
        assert_eq!(Channel::SECONDARY.read(&mut bus, STATUS_REG), 0);
        assert_eq!(bus.read_u8(0x80), FLOATING_BUS);
    }

    #[test]
    fn wrong_identify_flavour_aborts() {
        let mut bus = SimulatedBus::new().with(Slot::PrimaryMaster, SimDisk::packet_ata());
        let channel = Channel::PRIMARY;
        channel.write(&mut bus, COMMAND_REG, ATA_CMD_IDENTIFY);
        assert_eq!(channel.read(&mut bus, STATUS_REG), RDY | ERR);
        assert_eq!(channel.read(&mut bus, ERROR_REG), ERROR_ABRT);
        assert_eq!(bus.commands(), [(0x1F0, ATA_CMD_IDENTIFY)]);
    }

    #[test]
    fn busy_cycles_are_consumed_by_status_reads_only() {
        let mut bus = SimulatedBus::new().with(Slot::PrimaryMaster, SimDisk::ata().with_busy_reads(2));
        let channel = Channel::PRIMARY;
        assert_eq!(channel.alt_status(&mut bus), BSY);
        assert_eq!(channel.read(&mut bus, STATUS_REG), BSY);
        assert_eq!(channel.alt_status(&mut bus), BSY);
        assert_eq!(channel.read(&mut bus, STATUS_REG), BSY);
        assert_eq!(channel.read(&mut bus, STATUS_REG), RDY);
    }

    #[test]
    fn identify_data_failure_raises_err_after_clean_status() {
        let mut bus = SimulatedBus::new().with(Slot::PrimaryMaster, SimDisk::ata().failing_identify_data());
        let channel = Channel::PRIMARY;
        channel.write(&mut bus, COMMAND_REG, ATA_CMD_IDENTIFY);
        assert_eq!(channel.read(&mut bus, STATUS_REG), RDY);
        assert_eq!(channel.read(&mut bus, STATUS_REG), RDY | ERR);
        assert_eq!(bus.data_words_read(), 0);
    }

    #[test]
    fn pattern_wraps_bytes() {
        assert_eq!(pattern_block(0xFE, 4), [0xFE, 0xFF, 0x00, 0x01]);
    }
}
