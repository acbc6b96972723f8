//! Module: trace
//!
//! Purpose: Signal traces for the decoder. Renders a [`RawFrame`] into the
//! clock-edge/data-level sequence a caliper puts on the wire, parses edges
//! from logic-analyzer captures, and replays either into an [`EdgeDecoder`].
//!
//! Used for host tests, the host build of the binary, and for checking a
//! configuration (polarity, data sense) against a real capture.
//!
//! Safety: Safe. No allocation; traces are iterators.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin};

use crate::config::WORD_BITS;
use crate::decoder::{EdgeDecoder, EdgeOutcome};
use crate::frame::RawFrame;

/// One qualifying clock edge and the data level present at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEdge {
    /// Edge time in microseconds.
    pub at_us: u64,
    /// Physical data line level (true = high).
    pub level: bool,
}

impl TraceEdge {
    /// Edge time on the decoder's millisecond clock.
    #[inline]
    pub fn at_ms(&self) -> u32 {
        (self.at_us / 1000) as u32
    }

    /// Parse a capture line: `<time_us>,<0|1>`.
    ///
    /// Blank lines and lines starting with `#` yield `None`, as do
    /// malformed ones.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (time, level) = line.split_once(',')?;
        let at_us = time.trim().parse().ok()?;
        let level = match level.trim() {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        Some(Self { at_us, level })
    }
}

/// Transmission timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceTiming {
    /// Spacing between qualifying clock edges within a word.
    pub bit_period_us: u32,
    /// Extra pause between the lower and upper word.
    pub word_gap_us: u32,
    /// Start-to-start distance between frames.
    pub frame_interval_us: u32,
}

impl TraceTiming {
    /// Typical caliper: ~13 µs bits, back-to-back words, ~9 frames/s.
    pub const TYPICAL: Self = Self {
        bit_period_us: 13,
        word_gap_us: 0,
        frame_interval_us: 110_000,
    };
}

impl Default for TraceTiming {
    fn default() -> Self {
        Self::TYPICAL
    }
}

/// Edges of one frame, 24 lower bits then 24 upper bits, LSB first.
#[derive(Clone, Debug)]
pub struct FrameTrace {
    frame: RawFrame,
    start_us: u64,
    timing: TraceTiming,
    active_low: bool,
    next: u8,
}

impl FrameTrace {
    /// Render `frame` starting at `start_us`.
    ///
    /// `active_low` must match the decoder's `data_active_low`.
    pub fn new(frame: RawFrame, start_us: u64, timing: TraceTiming, active_low: bool) -> Self {
        Self {
            frame,
            start_us,
            timing,
            active_low,
            next: 0,
        }
    }

    /// Time at which the following frame starts.
    pub fn next_start_us(&self) -> u64 {
        self.start_us + self.timing.frame_interval_us as u64
    }
}

impl Iterator for FrameTrace {
    type Item = TraceEdge;

    fn next(&mut self) -> Option<TraceEdge> {
        if self.next >= 2 * WORD_BITS {
            return None;
        }

        let word = (self.next / WORD_BITS) as usize;
        let bit = self.next % WORD_BITS;
        self.next += 1;

        let at_us = self.start_us
            + (word as u64 * WORD_BITS as u64 + bit as u64) * self.timing.bit_period_us as u64
            + word as u64 * self.timing.word_gap_us as u64;
        let set = self.frame.word(word) & (1 << bit) != 0;

        Some(TraceEdge {
            at_us,
            level: set != self.active_low,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (2 * WORD_BITS - self.next.min(2 * WORD_BITS)) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for FrameTrace {}

/// Data pin that reads a fixed level; stands in for the line during replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelPin(pub bool);

impl ErrorType for LevelPin {
    type Error = Infallible;
}

impl InputPin for LevelPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0)
    }
}

/// Tally of a replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub edges: u32,
    pub words: u32,
    pub frames: u32,
    pub dropped: u32,
}

/// Feed edges into the decoder as if they came from the clock interrupt.
pub fn replay<I>(decoder: &mut EdgeDecoder<'_>, edges: I) -> ReplaySummary
where
    I: IntoIterator<Item = TraceEdge>,
{
    let mut summary = ReplaySummary::default();
    for edge in edges {
        let mut pin = LevelPin(edge.level);
        summary.edges += 1;
        match decoder.on_edge(edge.at_ms(), &mut pin) {
            EdgeOutcome::BitStored => {}
            EdgeOutcome::WordComplete => summary.words += 1,
            EdgeOutcome::FrameComplete => {
                summary.words += 1;
                summary.frames += 1;
            }
            EdgeOutcome::Dropped => summary.dropped += 1,
        }
    }
    summary
}
