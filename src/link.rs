//! Shared state between the edge handler and the polling consumer.
//!
//! # Architecture
//!
//! ```text
//! Clock ISR               CaliperLink              Poll loop
//! ─────────               ───────────              ─────────
//!
//! EdgeDecoder ──publish──▶ [seq][lower][upper] ──read──▶ Calipers
//!  (owns accum)            frame_ready                  (owns snapshot)
//!                          last_edge_ms
//!                          stats
//! ```
//!
//! # Rules
//!
//! - Only atomic operations for synchronization, no locks, no interrupt masking
//! - Exactly one producer and one consumer, handed out once by [`CaliperLink::split`]
//! - The producer never waits; the consumer retries a torn read
//!
//! # Memory Ordering
//!
//! The published frame is a sequence lock over two `AtomicU32` words:
//! - Producer: `seq` to odd, `Release` fence, words, `seq` to even with `Release`
//! - Consumer: `seq` with `Acquire`, words, `Acquire` fence, `seq` again;
//!   retry if odd or changed
//!
//! `frame_ready` is stored with `Release` after the even `seq` store, so a
//! consumer that observes it with `Acquire` also observes the whole frame.
//! A 64-bit atomic would avoid the lock but is missing on the ESP32 family.

use core::sync::atomic::{fence, AtomicBool, AtomicU32, Ordering};

use crate::calipers::Calipers;
use crate::config::DecoderConfig;
use crate::decoder::EdgeDecoder;
use crate::diag::DecoderStats;
use crate::error::InitError;
use crate::frame::RawFrame;

/// Producer/consumer rendezvous for one caliper.
///
/// Const-constructible so firmware can place it in a `static`.
pub struct CaliperLink {
    /// Sequence counter: odd while the producer is writing.
    seq: AtomicU32,

    /// Last published frame, `[lower, upper]`.
    words: [AtomicU32; 2],

    /// Set on publish, cleared by the consumer's read and by resync.
    frame_ready: AtomicBool,

    /// Timestamp of the most recent accepted edge.
    last_edge_ms: AtomicU32,

    /// Set once `split()` has handed out the two halves.
    attached: AtomicBool,

    /// Diagnostic counters.
    stats: DecoderStats,
}

impl CaliperLink {
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            words: [AtomicU32::new(0), AtomicU32::new(0)],
            frame_ready: AtomicBool::new(false),
            last_edge_ms: AtomicU32::new(0),
            attached: AtomicBool::new(false),
            stats: DecoderStats::new(),
        }
    }

    /// Hand out the producer and consumer halves.
    ///
    /// `now_ms` marks the start of the startup grace period and seeds the
    /// last-edge timestamp. Succeeds once per link.
    pub fn split(
        &self,
        config: DecoderConfig,
        now_ms: u32,
    ) -> Result<(EdgeDecoder<'_>, Calipers<'_>), InitError> {
        config.validate()?;

        if self.attached.swap(true, Ordering::AcqRel) {
            return Err(InitError::AlreadyAttached);
        }

        self.frame_ready.store(false, Ordering::Release);
        self.last_edge_ms.store(now_ms, Ordering::Release);

        Ok((
            EdgeDecoder::new(self, config, now_ms),
            Calipers::new(self, config, now_ms),
        ))
    }

    /// Check whether `split()` has already been called.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Diagnostic counters.
    #[inline]
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Timestamp of the most recent accepted edge.
    #[inline]
    pub fn last_edge_ms(&self) -> u32 {
        self.last_edge_ms.load(Ordering::Acquire)
    }

    // --- producer side ---

    /// Publish a completed frame and raise `frame_ready`.
    #[inline]
    pub(crate) fn publish(&self, frame: RawFrame) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.words[0].store(frame.lower, Ordering::Relaxed);
        self.words[1].store(frame.upper, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
        self.frame_ready.store(true, Ordering::Release);
        self.stats.record_frame();
    }

    /// Drop a pending frame after a resync.
    #[inline]
    pub(crate) fn clear_ready(&self) {
        self.frame_ready.store(false, Ordering::Release);
    }

    #[inline]
    pub(crate) fn touch(&self, now_ms: u32) {
        self.last_edge_ms.store(now_ms, Ordering::Release);
    }

    // --- consumer side ---

    /// Claim the pending frame, if any. Clears `frame_ready`.
    #[inline]
    pub(crate) fn take_ready(&self) -> bool {
        self.frame_ready.swap(false, Ordering::AcqRel)
    }

    /// Copy the last published frame as a consistent pair.
    pub(crate) fn read_frame(&self) -> RawFrame {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 != 0 {
                core::hint::spin_loop();
                continue;
            }

            let lower = self.words[0].load(Ordering::Relaxed);
            let upper = self.words[1].load(Ordering::Relaxed);

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return RawFrame { lower, upper };
            }
        }
    }
}

impl Default for CaliperLink {
    fn default() -> Self {
        Self::new()
    }
}
