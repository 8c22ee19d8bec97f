#[cfg(target_arch = "x86_64")]
use x86_64::instructions::port::Port;

// Register offsets from a channel's command block base.
pub const DATA_REG: u16 = 0;
pub const ERROR_REG: u16 = 1; // Same as FEATURES_REG for writing
pub const FEATURES_REG: u16 = 1;
pub const SECTOR_COUNT_REG: u16 = 2;
pub const LBA_LO_REG: u16 = 3;
pub const LBA_MID_REG: u16 = 4;
pub const LBA_HI_REG: u16 = 5;
pub const DRIVE_SELECT_REG: u16 = 6;
pub const STATUS_REG: u16 = 7; // Same as COMMAND_REG for writing
pub const COMMAND_REG: u16 = 7;

pub const PRIMARY_CMD_BASE: u16 = 0x1F0;
pub const PRIMARY_CTRL_BASE: u16 = 0x3F6;
pub const SECONDARY_CMD_BASE: u16 = 0x170;
pub const SECONDARY_CTRL_BASE: u16 = 0x376;

/// Raw access to the I/O address space.
///
/// Implementations perform the access and nothing else: there is no failure
/// path, and ordering is entirely up to the caller.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn write_u8(&mut self, port: u16, value: u8);
    fn read_u16(&mut self, port: u16) -> u16;
    fn write_u16(&mut self, port: u16, value: u16);

    /// `insw`: fills `words` from consecutive reads of `port`.
    fn read_words(&mut self, port: u16, words: &mut [u16]) {
        for word in words.iter_mut() {
            *word = self.read_u16(port);
        }
    }

    /// `outsw`: writes `words` to `port` in order.
    fn write_words(&mut self, port: u16, words: &[u16]) {
        for &word in words {
            self.write_u16(port, word);
        }
    }
}

/// Port I/O through the `in`/`out` instructions.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy)]
pub struct X86PortIo(());

#[cfg(target_arch = "x86_64")]
impl X86PortIo {
    /// # Safety
    /// The caller must own the ATA channel ports it will touch through this
    /// handle; nothing else may drive them concurrently.
    pub const unsafe fn new() -> Self {
        X86PortIo(())
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for X86PortIo {
    fn read_u8(&mut self, port: u16) -> u8 {
        unsafe { Port::<u8>::new(port).read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        unsafe { Port::<u8>::new(port).write(value) }
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        unsafe { Port::<u16>::new(port).read() }
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        unsafe { Port::<u16>::new(port).write(value) }
    }

    fn read_words(&mut self, port: u16, words: &mut [u16]) {
        let mut data_port = Port::<u16>::new(port);
        for word in words.iter_mut() {
            *word = unsafe { data_port.read() };
        }
    }

    fn write_words(&mut self, port: u16, words: &[u16]) {
        let mut data_port = Port::<u16>::new(port);
        for &word in words {
            unsafe { data_port.write(word) };
        }
    }
}

/// Command block base and control port of one ATA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub base: u16,
    pub control: u16,
}

impl Channel {
    pub const PRIMARY: Channel = Channel::new(PRIMARY_CMD_BASE, PRIMARY_CTRL_BASE);
    pub const SECONDARY: Channel = Channel::new(SECONDARY_CMD_BASE, SECONDARY_CTRL_BASE);

    pub const fn new(base: u16, control: u16) -> Self {
        Channel { base, control }
    }

    pub fn read<P: PortIo>(&self, io: &mut P, reg: u16) -> u8 {
        io.read_u8(self.base + reg)
    }

    pub fn write<P: PortIo>(&self, io: &mut P, reg: u16, value: u8) {
        io.write_u8(self.base + reg, value)
    }

    pub fn read_data<P: PortIo>(&self, io: &mut P, words: &mut [u16]) {
        io.read_words(self.base + DATA_REG, words)
    }

    pub fn write_data<P: PortIo>(&self, io: &mut P, words: &[u16]) {
        io.write_words(self.base + DATA_REG, words)
    }

    /// Alternate status: same bits as STATUS_REG, without side effects.
    pub fn alt_status<P: PortIo>(&self, io: &mut P) -> u8 {
        io.read_u8(self.control)
    }

    pub fn write_control<P: PortIo>(&self, io: &mut P, value: u8) {
        io.write_u8(self.control, value)
    }
}
