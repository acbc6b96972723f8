//! Module: config
//!
//! Purpose: Decoder configuration. Timing thresholds, edge polarity and data
//! line sense are runtime values; the protocol shape itself is fixed.
//!
//! Safety: Safe. Copy types only, validated once at attach time.

use crate::error::ConfigError;

/// Bits per word (LSB first on the wire).
pub const WORD_BITS: u8 = 24;

/// Words per frame (lower, upper).
pub const FRAME_WORDS: usize = 2;

/// Data line reads taken per clock edge.
pub const OVERSAMPLE_COUNT: u8 = 4;

/// A bit is set only when strictly more than this many reads are active.
pub const MAJORITY_THRESHOLD: u8 = 2;

/// Device counts per inch in the `upper` word.
pub const COUNTS_PER_INCH: f32 = 20480.0;

/// Millimeters per inch.
pub const MM_PER_INCH: f32 = 25.4;

/// Clock edge that paces sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgePolarity {
    /// Low-to-high transition.
    Rising,
    /// High-to-low transition.
    Falling,
}

impl Default for EdgePolarity {
    fn default() -> Self {
        EdgePolarity::Rising
    }
}

/// Decoder configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Clock edge the handler is registered on.
    pub edge_polarity: EdgePolarity,

    /// Data line reads low for a 1 bit.
    ///
    /// The common level-shifted caliper interface inverts the signal, so
    /// this defaults to `true`.
    pub data_active_low: bool,

    /// Enable the internal pull-up on the clock line.
    pub clock_pull_up: bool,

    /// Busy-wait iterations between oversampled reads (0 = back-to-back).
    pub oversample_spin: u32,

    /// Inter-edge gap (ms) that forces resynchronization.
    pub resync_gap_ms: u32,

    /// Edge silence (ms) after which the caliper is considered off.
    pub liveness_timeout_ms: u32,

    /// Time after attach (ms) during which the caliper is always reported live.
    pub startup_grace_ms: u32,
}

impl DecoderConfig {
    /// Defaults matching the stock 24+24 bit caliper protocol.
    pub const DEFAULT: Self = Self {
        edge_polarity: EdgePolarity::Rising,
        data_active_low: true,
        clock_pull_up: true,
        oversample_spin: 0,
        resync_gap_ms: 5,
        liveness_timeout_ms: 500,
        startup_grace_ms: 3000,
    };

    pub const fn with_edge_polarity(mut self, polarity: EdgePolarity) -> Self {
        self.edge_polarity = polarity;
        self
    }

    pub const fn with_data_active_low(mut self, active_low: bool) -> Self {
        self.data_active_low = active_low;
        self
    }

    pub const fn with_clock_pull_up(mut self, pull_up: bool) -> Self {
        self.clock_pull_up = pull_up;
        self
    }

    pub const fn with_oversample_spin(mut self, spin: u32) -> Self {
        self.oversample_spin = spin;
        self
    }

    pub const fn with_resync_gap_ms(mut self, gap_ms: u32) -> Self {
        self.resync_gap_ms = gap_ms;
        self
    }

    pub const fn with_liveness_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.liveness_timeout_ms = timeout_ms;
        self
    }

    pub const fn with_startup_grace_ms(mut self, grace_ms: u32) -> Self {
        self.startup_grace_ms = grace_ms;
        self
    }

    /// Check the timing thresholds are usable.
    ///
    /// A liveness timeout at or below the resync gap would report the
    /// caliper off during its normal inter-frame pause.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resync_gap_ms == 0 {
            return Err(ConfigError::ZeroResyncGap);
        }
        if self.liveness_timeout_ms <= self.resync_gap_ms {
            return Err(ConfigError::LivenessBelowResync);
        }
        Ok(())
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
