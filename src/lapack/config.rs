//! Block size configuration for the blocked drivers
//!
//! Each blocked driver takes a [`BlockConfig`] and must be paired with the
//! same configuration at workspace-query time, so forcing tiny blocks (e.g.
//! to exercise the blocked path on a small matrix) keeps the sizing oracle
//! exact.

/// Panel width and algorithm-selection threshold for one blocked driver
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockConfig {
    /// Panel width of the blocked loop
    pub block_size: usize,
    /// Problems with `min(rows, cols) <= switch_size` (reflector count for
    /// the apply drivers) take the unblocked path
    pub switch_size: usize,
}

impl BlockConfig {
    /// Default configuration for the blocked LU driver
    pub const GETRF: Self = Self {
        block_size: 64,
        switch_size: 64,
    };

    /// Default configuration for the blocked QR driver
    pub const GEQRF: Self = Self {
        block_size: 64,
        switch_size: 128,
    };

    /// Default configuration for the blocked LQ driver
    pub const GELQF: Self = Self {
        block_size: 64,
        switch_size: 128,
    };

    /// Default configuration for the blocked QR-factor application
    pub const ORMQR: Self = Self {
        block_size: 32,
        switch_size: 32,
    };

    /// Default configuration for the blocked LQ-factor application
    pub const ORMLQ: Self = Self {
        block_size: 32,
        switch_size: 32,
    };

    /// Custom configuration
    pub const fn new(block_size: usize, switch_size: usize) -> Self {
        Self {
            block_size,
            switch_size,
        }
    }
}
