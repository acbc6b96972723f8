//! Decoder diagnostics.
//!
//! A caliper decoder never stops: noisy or missing signal is absorbed by
//! dropping edges and resynchronizing. What it does instead is count, so
//! the host can tell a flaky cable from a switched-off caliper.

use core::sync::atomic::{AtomicU32, Ordering};

/// Diagnostic event classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DiagEvent {
    /// Timing gap reset a partially accumulated frame.
    SyncLoss = 1,

    /// Edge arrived after the frame was already complete; dropped.
    FrameOverrun = 2,

    /// No edges for longer than the liveness window.
    LivenessTimeout = 3,
}

impl DiagEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagEvent::SyncLoss => "sync loss",
            DiagEvent::FrameOverrun => "frame overrun",
            DiagEvent::LivenessTimeout => "liveness timeout",
        }
    }
}

/// Lock-free decoder counters.
///
/// Written from the edge handler (and, for liveness, the polling loop),
/// read from anywhere. All counters wrap and are never cleared.
pub struct DecoderStats {
    /// Gap-triggered resets, including the normal inter-frame pause.
    resyncs: AtomicU32,

    /// Resets that discarded a partial frame.
    sync_losses: AtomicU32,

    /// Edges dropped because the frame was already full.
    overruns: AtomicU32,

    /// Frames completed and published.
    frames: AtomicU32,

    /// Live-to-lost transitions seen by the consumer.
    liveness_timeouts: AtomicU32,
}

impl DecoderStats {
    pub const fn new() -> Self {
        Self {
            resyncs: AtomicU32::new(0),
            sync_losses: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
            frames: AtomicU32::new(0),
            liveness_timeouts: AtomicU32::new(0),
        }
    }

    /// Record a gap reset. `discarded` is true when bits were thrown away.
    #[inline]
    pub fn record_resync(&self, discarded: bool) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
        if discarded {
            self.record(DiagEvent::SyncLoss);
        }
    }

    #[inline]
    pub fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Bump the counter for an event class.
    #[inline]
    pub fn record(&self, event: DiagEvent) {
        let counter = match event {
            DiagEvent::SyncLoss => &self.sync_losses,
            DiagEvent::FrameOverrun => &self.overruns,
            DiagEvent::LivenessTimeout => &self.liveness_timeouts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count(&self, event: DiagEvent) -> u32 {
        match event {
            DiagEvent::SyncLoss => self.sync_losses.load(Ordering::Relaxed),
            DiagEvent::FrameOverrun => self.overruns.load(Ordering::Relaxed),
            DiagEvent::LivenessTimeout => self.liveness_timeouts.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub fn resyncs(&self) -> u32 {
        self.resyncs.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn frames(&self) -> u32 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters.
    ///
    /// Counters are read individually; the snapshot is not a consistent cut.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            resyncs: self.resyncs(),
            sync_losses: self.count(DiagEvent::SyncLoss),
            overruns: self.count(DiagEvent::FrameOverrun),
            frames: self.frames(),
            liveness_timeouts: self.count(DiagEvent::LivenessTimeout),
        }
    }
}

impl Default for DecoderStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub resyncs: u32,
    pub sync_losses: u32,
    pub overruns: u32,
    pub frames: u32,
    pub liveness_timeouts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = DecoderStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_resync_only_counts_loss_when_discarding() {
        let stats = DecoderStats::new();

        stats.record_resync(false);
        stats.record_resync(true);
        stats.record_resync(false);

        assert_eq!(stats.resyncs(), 3);
        assert_eq!(stats.count(DiagEvent::SyncLoss), 1);
    }

    #[test]
    fn test_events_accumulate() {
        let stats = DecoderStats::new();

        stats.record(DiagEvent::FrameOverrun);
        stats.record(DiagEvent::FrameOverrun);
        stats.record(DiagEvent::LivenessTimeout);
        stats.record_frame();

        let snap = stats.snapshot();
        assert_eq!(snap.overruns, 2);
        assert_eq!(snap.liveness_timeouts, 1);
        assert_eq!(snap.frames, 1);
        assert_eq!(snap.sync_losses, 0);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(DiagEvent::SyncLoss.as_str(), "sync loss");
        assert_eq!(DiagEvent::FrameOverrun.as_str(), "frame overrun");
        assert_eq!(DiagEvent::LivenessTimeout.as_str(), "liveness timeout");
    }
}
