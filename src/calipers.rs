//! Polling consumer.
//!
//! The host loop owns a [`Calipers`] and calls
//! [`poll_and_check_changed`](Calipers::poll_and_check_changed) at its own
//! cadence (a few to tens of milliseconds). Value accessors read the
//! snapshot taken by the last successful poll, never the live accumulator.
//!
//! # Example
//!
//! ```ignore
//! static LINK: CaliperLink = CaliperLink::new();
//!
//! let (decoder, mut calipers) = LINK.split(DecoderConfig::DEFAULT, now_ms())?;
//! attach_isr(decoder);
//!
//! loop {
//!     if !calipers.is_live(now_ms()) {
//!         enter_sleep();
//!     }
//!     if calipers.poll_and_check_changed() {
//!         send(calipers.value_millimeters());
//!     }
//!     delay_ms(4);
//! }
//! ```

use core::cell::Cell;
use core::fmt;

use crate::config::DecoderConfig;
use crate::diag::{DiagEvent, StatsSnapshot};
use crate::frame::{RawFrame, Unit};
use crate::link::CaliperLink;
use crate::log_globals::DECODER_LOG;
use crate::logging::LogStream;

/// Presence transition reported by [`Calipers::update_presence`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// Still live (or still inside the startup grace period).
    Live,
    /// Still silent.
    Absent,
    /// Just went silent: powered off or unplugged.
    Lost,
    /// Edges are back after being lost.
    Recovered,
}

/// Consumer half of a [`CaliperLink`].
pub struct Calipers<'a> {
    link: &'a CaliperLink,
    config: DecoderConfig,
    log: &'a LogStream,

    /// When the link was split; start of the grace period.
    started_ms: u32,

    /// Set once the grace period has been observed to end.
    grace_over: Cell<bool>,

    /// Frame copied by the last successful poll.
    snapshot: RawFrame,

    /// `lower` word of the previous poll; `None` before the first frame.
    previous_lower: Option<u32>,

    /// Liveness as of the last `update_presence()`.
    live: bool,
}

impl<'a> Calipers<'a> {
    pub(crate) fn new(link: &'a CaliperLink, config: DecoderConfig, now_ms: u32) -> Self {
        Self {
            link,
            config,
            log: &DECODER_LOG,
            started_ms: now_ms,
            grace_over: Cell::new(false),
            snapshot: RawFrame::EMPTY,
            previous_lower: None,
            live: true,
        }
    }

    /// Send this consumer's log lines to `log` instead of the global stream.
    pub fn with_log(mut self, log: &'a LogStream) -> Self {
        self.log = log;
        self
    }

    /// Take the latest completed frame, if any, and report whether it
    /// carries a new value.
    ///
    /// - No frame ready: returns `false`, no side effects
    /// - Frame ready: snapshot both words, clear ready, compare `lower`
    ///   against the previous frame
    ///
    /// Identical consecutive frames return `false`. The first frame after
    /// attach always counts as changed.
    pub fn poll_and_check_changed(&mut self) -> bool {
        if !self.link.take_ready() {
            return false;
        }

        let frame = self.link.read_frame();
        self.snapshot = frame;

        let changed = self.previous_lower != Some(frame.lower);
        self.previous_lower = Some(frame.lower);

        if changed {
            crate::caliper_debug!(
                self.log,
                self.link.last_edge_ms(),
                "frame lower={:06X} upper={:06X} ({:.2} mm)",
                frame.lower,
                frame.upper,
                frame.millimeters()
            );
        }
        changed
    }

    /// Whether the caliper is powered and clocking.
    ///
    /// Always `true` during the startup grace period. Afterwards `true` iff
    /// an edge was accepted less than `liveness_timeout_ms` ago.
    pub fn is_live(&self, now_ms: u32) -> bool {
        if !self.grace_over.get() {
            // Latched so the window does not reopen when the clock wraps
            if now_ms.wrapping_sub(self.started_ms) < self.config.startup_grace_ms {
                return true;
            }
            self.grace_over.set(true);
        }

        let last = self.link.last_edge_ms();

        // The ISR may stamp an edge shortly after `now_ms` was read
        if last.wrapping_sub(now_ms) <= self.config.resync_gap_ms {
            return true;
        }
        now_ms.wrapping_sub(last) < self.config.liveness_timeout_ms
    }

    /// Track liveness transitions, logging and counting each loss.
    pub fn update_presence(&mut self, now_ms: u32) -> Presence {
        let live = self.is_live(now_ms);
        let presence = match (self.live, live) {
            (true, true) => Presence::Live,
            (false, false) => Presence::Absent,
            (true, false) => {
                self.link.stats().record(DiagEvent::LivenessTimeout);
                crate::caliper_warn!(
                    self.log,
                    now_ms,
                    "caliper silent for {} ms",
                    now_ms.wrapping_sub(self.link.last_edge_ms())
                );
                Presence::Lost
            }
            (false, true) => {
                crate::caliper_info!(self.log, now_ms, "caliper clock resumed");
                Presence::Recovered
            }
        };
        self.live = live;
        presence
    }

    /// Snapshot from the last successful poll.
    #[inline]
    pub fn raw(&self) -> RawFrame {
        self.snapshot
    }

    #[inline]
    pub fn value_inches(&self) -> f32 {
        self.snapshot.inches()
    }

    #[inline]
    pub fn value_millimeters(&self) -> f32 {
        self.snapshot.millimeters()
    }

    #[inline]
    pub fn value(&self, unit: Unit) -> f32 {
        self.snapshot.value(unit)
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.link.stats().snapshot()
    }

    /// Write the snapshot's bit pattern and decoded values.
    ///
    /// `<bits> - lower <dec> , upper <dec> - <inches>`
    pub fn debug_dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        let frame = self.snapshot;
        write!(
            out,
            "{} - lower {} , upper {} - {:.6}",
            frame,
            frame.lower,
            frame.upper,
            frame.inches()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn test_poll_without_frame_is_noop() {
        let link = CaliperLink::new();
        let (_dec, mut cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();

        assert!(!cal.poll_and_check_changed());
        assert!(!cal.poll_and_check_changed());
        assert_eq!(cal.raw(), RawFrame::EMPTY);
    }

    #[test]
    fn test_first_frame_always_changed() {
        let link = CaliperLink::new();
        let (_dec, mut cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();

        link.publish(RawFrame::new(0, 0));
        assert!(cal.poll_and_check_changed());
        assert!(!cal.poll_and_check_changed());
    }

    #[test]
    fn test_change_detection_on_lower_word() {
        let link = CaliperLink::new();
        let (_dec, mut cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();

        link.publish(RawFrame::new(0x100, 0x20));
        assert!(cal.poll_and_check_changed());

        // Same lower, different upper: not reported
        link.publish(RawFrame::new(0x100, 0x21));
        assert!(!cal.poll_and_check_changed());
        // ...but the snapshot still moved
        assert_eq!(cal.raw().upper, 0x21);

        link.publish(RawFrame::new(0x101, 0x21));
        assert!(cal.poll_and_check_changed());
    }

    #[test]
    fn test_presence_transitions_logged() {
        static LOG: LogStream = LogStream::new();

        let link = CaliperLink::new();
        let (_dec, cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();
        let mut cal = cal.with_log(&LOG);

        assert_eq!(cal.update_presence(1000), Presence::Live);
        assert_eq!(cal.update_presence(3000), Presence::Lost);
        assert_eq!(cal.update_presence(3100), Presence::Absent);
        assert_eq!(cal.stats().liveness_timeouts, 1);

        link.touch(3200);
        assert_eq!(cal.update_presence(3250), Presence::Recovered);
        assert_eq!(cal.update_presence(3300), Presence::Live);

        let lost = LOG.drain().unwrap();
        assert_eq!(lost.level, LogLevel::Warn);
        assert_eq!(lost.message(), "caliper silent for 3000 ms");
        assert_eq!(LOG.drain().unwrap().message(), "caliper clock resumed");
    }

    #[test]
    fn test_debug_dump() {
        let link = CaliperLink::new();
        let (_dec, mut cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();

        link.publish(RawFrame::new(0x000003, 0x000001));
        cal.poll_and_check_changed();

        let mut out = String::new();
        cal.debug_dump(&mut out).unwrap();
        assert_eq!(
            out,
            "11000000 00000000 00000000  --- 10000000 00000000 00000000  ---  - lower 3 , upper 1 - 0.000049"
        );
    }
}
