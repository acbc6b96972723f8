//! Edge-triggered frame assembler.
//!
//! Runs inside the clock interrupt. Pure logic over an `InputPin`, no
//! hardware dependencies, fully testable on host.
//!
//! # Protocol
//!
//! ```text
//! clock  ─┐_┌─┐_┌─ ... ─┐_┌────── >5ms ──────┐_┌─┐_┌─ ...
//! data    b0  b1   ...   b47                   b0  b1
//!        └──── lower (24) ── upper (24) ──┘
//! ```
//!
//! The pause between transmissions is the only framing signal: any gap
//! longer than `resync_gap_ms` restarts accumulation at bit 0 of word 0.
//!
//! # Rules
//!
//! - No allocation, no blocking, no formatted output
//! - Bounded work per edge: one gap check, four reads, one bit set

use embedded_hal::digital::InputPin;

use crate::config::{
    DecoderConfig, FRAME_WORDS, MAJORITY_THRESHOLD, OVERSAMPLE_COUNT, WORD_BITS,
};
use crate::diag::DiagEvent;
use crate::frame::RawFrame;
use crate::link::CaliperLink;

/// Assembly phase, derived from the indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Reset, waiting for bit 0 of the lower word.
    Syncing,
    /// Filling the lower word.
    AccumulatingLower,
    /// Filling the upper word.
    AccumulatingUpper,
    /// Both words complete; further edges are dropped until the next gap.
    FrameReady,
}

/// What a single edge did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// A bit was stored; the word is not yet complete.
    BitStored,
    /// The lower word completed; switched to the upper word.
    WordComplete,
    /// The upper word completed; frame published.
    FrameComplete,
    /// Frame already full; edge ignored.
    Dropped,
}

/// Producer half of a [`CaliperLink`].
///
/// Owned by the interrupt handler. Nothing else touches the accumulator.
pub struct EdgeDecoder<'a> {
    link: &'a CaliperLink,
    config: DecoderConfig,

    /// Next bit position within the current word.
    bit_idx: u8,

    /// Word being filled (0 = lower, 1 = upper).
    word_idx: u8,

    /// Words under construction.
    accum: [u32; FRAME_WORDS],

    /// Timestamp of the previous accepted edge.
    last_edge_ms: u32,
}

impl<'a> EdgeDecoder<'a> {
    pub(crate) fn new(link: &'a CaliperLink, config: DecoderConfig, now_ms: u32) -> Self {
        Self {
            link,
            config,
            bit_idx: 0,
            word_idx: 0,
            accum: [0; FRAME_WORDS],
            last_edge_ms: now_ms,
        }
    }

    /// Handle one qualifying clock edge.
    ///
    /// `data` is read [`OVERSAMPLE_COUNT`] times; the bit is set only on a
    /// strict majority, so a 2-of-4 tie reads as 0.
    ///
    /// # Timing
    ///
    /// O(1), no allocation, never blocks. Safe to call from an ISR.
    #[inline]
    pub fn on_edge<P: InputPin>(&mut self, now_ms: u32, data: &mut P) -> EdgeOutcome {
        let gap = now_ms.wrapping_sub(self.last_edge_ms);
        if gap > self.config.resync_gap_ms {
            self.resync();
        }

        let outcome = if self.bit_idx < WORD_BITS {
            if self.sample_bit(data) {
                self.accum[self.word_idx as usize] |= 1 << self.bit_idx;
            }
            self.bit_idx += 1;
            self.advance()
        } else {
            self.link.stats().record(DiagEvent::FrameOverrun);
            EdgeOutcome::Dropped
        };

        self.last_edge_ms = now_ms;
        self.link.touch(now_ms);
        outcome
    }

    /// Current assembly phase.
    pub fn state(&self) -> SyncState {
        match (self.word_idx, self.bit_idx) {
            (0, 0) => SyncState::Syncing,
            (0, _) => SyncState::AccumulatingLower,
            (_, WORD_BITS) => SyncState::FrameReady,
            _ => SyncState::AccumulatingUpper,
        }
    }

    /// Position of the next bit within the current word.
    #[inline]
    pub fn bit_index(&self) -> u8 {
        self.bit_idx
    }

    /// Word being filled (0 = lower, 1 = upper).
    #[inline]
    pub fn word_index(&self) -> u8 {
        self.word_idx
    }

    /// Words accumulated so far, including a partial one.
    #[inline]
    pub fn partial(&self) -> RawFrame {
        RawFrame {
            lower: self.accum[0],
            upper: self.accum[1],
        }
    }

    /// Reset after a timing gap.
    fn resync(&mut self) {
        let discarded = self.state() != SyncState::Syncing
            && self.state() != SyncState::FrameReady;
        self.link.stats().record_resync(discarded);

        self.bit_idx = 0;
        self.word_idx = 0;
        self.accum = [0; FRAME_WORDS];
        self.link.clear_ready();
    }

    /// Handle a word boundary after a bit was stored.
    fn advance(&mut self) -> EdgeOutcome {
        if self.bit_idx < WORD_BITS {
            return EdgeOutcome::BitStored;
        }

        if self.word_idx == 0 {
            self.word_idx = 1;
            self.bit_idx = 0;
            EdgeOutcome::WordComplete
        } else {
            // Indices stay at the end until the next gap
            self.link.publish(self.partial());
            EdgeOutcome::FrameComplete
        }
    }

    /// Oversample the data line and take a strict majority.
    #[inline]
    fn sample_bit<P: InputPin>(&self, data: &mut P) -> bool {
        let mut active = 0u8;
        for i in 0..OVERSAMPLE_COUNT {
            if i > 0 {
                for _ in 0..self.config.oversample_spin {
                    core::hint::spin_loop();
                }
            }
            if self.read_active(data) {
                active += 1;
            }
        }
        active > MAJORITY_THRESHOLD
    }

    /// A failed read counts as inactive.
    #[inline]
    fn read_active<P: InputPin>(&self, data: &mut P) -> bool {
        let level = if self.config.data_active_low {
            data.is_low()
        } else {
            data.is_high()
        };
        level.unwrap_or(false)
    }
}
