use alloc::string::String;
use alloc::vec::Vec;

pub const IDENTIFY_WORDS: usize = 256;

// Word offsets into the identity block.
const IDENT_GENERAL_CONFIG: usize = 0;
const IDENT_SERIAL: core::ops::Range<usize> = 10..20;
const IDENT_FIRMWARE: core::ops::Range<usize> = 23..27;
const IDENT_MODEL: core::ops::Range<usize> = 27..47;
const IDENT_LBA28_SECTORS: usize = 60;
const IDENT_COMMAND_SET_2: usize = 83;
const IDENT_LBA48_SECTORS: usize = 100;

const COMMAND_SET_2_LBA48: u16 = 1 << 10;

/// The 256-word block returned by IDENTIFY / IDENTIFY PACKET DEVICE.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentifyData {
    words: [u16; IDENTIFY_WORDS],
}

impl IdentifyData {
    pub fn new(words: [u16; IDENTIFY_WORDS]) -> Self {
        IdentifyData { words }
    }

    pub fn general_config(&self) -> u16 {
        self.words[IDENT_GENERAL_CONFIG]
    }

    pub fn lba28_sectors(&self) -> u32 {
        let lo = self.words[IDENT_LBA28_SECTORS] as u32;
        let hi = self.words[IDENT_LBA28_SECTORS + 1] as u32;
        lo | (hi << 16)
    }

    pub fn supports_lba48(&self) -> bool {
        self.words[IDENT_COMMAND_SET_2] & COMMAND_SET_2_LBA48 != 0
    }

    pub fn lba48_sectors(&self) -> u64 {
        self.words[IDENT_LBA48_SECTORS..IDENT_LBA48_SECTORS + 4]
            .iter()
            .rev()
            .fold(0u64, |acc, &word| (acc << 16) | word as u64)
    }

    pub fn serial(&self) -> String {
        id_string(&self.words[IDENT_SERIAL])
    }

    pub fn firmware(&self) -> String {
        id_string(&self.words[IDENT_FIRMWARE])
    }

    pub fn model(&self) -> String {
        id_string(&self.words[IDENT_MODEL])
    }
}

impl core::fmt::Debug for IdentifyData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentifyData")
            .field("general_config", &format_args!("{:#06x}", self.general_config()))
            .field("model", &self.model())
            .field("lba28_sectors", &self.lba28_sectors())
            .field("lba48", &self.supports_lba48())
            .finish()
    }
}

/// ATA strings store two characters per word, high byte first.
fn id_string(words: &[u16]) -> String {
    let bytes: Vec<u8> = words
        .iter()
        .flat_map(|&word| [(word >> 8) as u8, (word & 0xFF) as u8])
        .collect();
    String::from_utf8_lossy(&bytes)
        .trim_matches(|c: char| c == '\0' || c == ' ')
        .into()
}
