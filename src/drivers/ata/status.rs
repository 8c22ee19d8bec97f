use bitflags::bitflags;

use super::error::{AtaError, AtaResult};
use super::ports::{Channel, PortIo, STATUS_REG};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const ERR = 0x01;
        const IDX = 0x02;
        const CORR = 0x04;
        const DRQ = 0x08;
        const SRV = 0x10;
        const DF = 0x20;
        const RDY = 0x40;
        const BSY = 0x80;
    }
}

impl StatusFlags {
    /// Nothing drove the bus: no device behind this select.
    pub fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

pub fn read_status<P: PortIo>(io: &mut P, channel: &Channel) -> StatusFlags {
    StatusFlags::from_bits_retain(channel.read(io, STATUS_REG))
}

/// Reads the status register until `done` accepts it. `spin_limit` caps the
/// number of reads; `None` spins for as long as the device takes.
fn poll<P, F>(io: &mut P, channel: &Channel, spin_limit: Option<u32>, done: F) -> AtaResult<StatusFlags>
where
    P: PortIo,
    F: Fn(StatusFlags) -> bool,
{
    let mut reads: u32 = 0;
    loop {
        let status = read_status(io, channel);
        if done(status) {
            return Ok(status);
        }
        reads = reads.saturating_add(1);
        if spin_limit.is_some_and(|limit| reads >= limit) {
            return Err(AtaError::Timeout);
        }
        core::hint::spin_loop();
    }
}

/// Spins until BSY clears and returns the status that ended the wait.
pub fn wait_busy_clear<P: PortIo>(io: &mut P, channel: &Channel, spin_limit: Option<u32>) -> AtaResult<StatusFlags> {
    poll(io, channel, spin_limit, |status| !status.contains(StatusFlags::BSY))
}

/// Spins until DRQ or ERR is set. The caller decides what ERR means.
pub fn wait_data_or_error<P: PortIo>(io: &mut P, channel: &Channel, spin_limit: Option<u32>) -> AtaResult<StatusFlags> {
    poll(io, channel, spin_limit, |status| {
        status.intersects(StatusFlags::DRQ | StatusFlags::ERR)
    })
}

/// Spins until neither BSY nor DRQ is set; ERR is ignored.
pub fn wait_drained<P: PortIo>(io: &mut P, channel: &Channel, spin_limit: Option<u32>) -> AtaResult<StatusFlags> {
    poll(io, channel, spin_limit, |status| {
        !status.intersects(StatusFlags::BSY | StatusFlags::DRQ)
    })
}
