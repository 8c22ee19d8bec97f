/// Default number of status reads before a poll gives up.
pub const DEFAULT_SPIN_LIMIT: u32 = 1_000_000;

/// Tunables for the ATA driver. Every poll, settle delay and probe reads from
/// here; there is no global copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtaConfig {
    /// Maximum status reads per poll. `None` spins forever, which is how the
    /// hardware protocol is written; a stuck device then halts the caller.
    pub spin_limit: Option<u32>,
    /// Alternate-status reads after a full drive select (~100ns each).
    pub select_settle_reads: u8,
    /// Alternate-status reads after the short select used by packet reads.
    pub packet_settle_reads: u8,
}

impl AtaConfig {
    pub const DEFAULT: AtaConfig = AtaConfig {
        spin_limit: Some(DEFAULT_SPIN_LIMIT),
        select_settle_reads: 5,
        packet_settle_reads: 4,
    };

    /// Polls never time out.
    pub const fn unbounded() -> Self {
        AtaConfig {
            spin_limit: None,
            ..Self::DEFAULT
        }
    }

    pub const fn with_spin_limit(mut self, limit: u32) -> Self {
        self.spin_limit = Some(limit);
        self
    }
}

impl Default for AtaConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_bounded() {
        let config = AtaConfig::default();
        assert_eq!(config.spin_limit, Some(DEFAULT_SPIN_LIMIT));
        assert_eq!(config.select_settle_reads, 5);
        assert_eq!(config.packet_settle_reads, 4);
    }

    #[test]
    fn unbounded_keeps_settle_delays() {
        let config = AtaConfig::unbounded();
        assert_eq!(config.spin_limit, None);
        assert_eq!(config.select_settle_reads, AtaConfig::DEFAULT.select_settle_reads);
        assert_eq!(AtaConfig::unbounded().with_spin_limit(8).spin_limit, Some(8));
    }
}
