//! Consumer polling, change detection and value conversion tests

use rust_caliper_decoder::trace::{replay, FrameTrace, TraceTiming};
use rust_caliper_decoder::{CaliperLink, DecoderConfig, EdgeDecoder, RawFrame, Unit};

const CFG: DecoderConfig = DecoderConfig::DEFAULT;

/// Send one frame per entry, each after a normal inter-frame pause.
struct Sender {
    next_us: u64,
}

impl Sender {
    fn new() -> Self {
        Self { next_us: 10_000 }
    }

    fn send(&mut self, dec: &mut EdgeDecoder<'_>, frame: RawFrame) {
        let trace = FrameTrace::new(frame, self.next_us, TraceTiming::TYPICAL, CFG.data_active_low);
        self.next_us = trace.next_start_us();
        assert_eq!(replay(dec, trace).frames, 1);
    }
}

#[test]
fn test_poll_twice_without_frame() {
    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(CFG, 0).unwrap();
    let mut tx = Sender::new();

    assert!(!cal.poll_and_check_changed());
    assert!(!cal.poll_and_check_changed());

    tx.send(&mut dec, RawFrame::new(5, 5));
    assert!(cal.poll_and_check_changed());
    assert!(!cal.poll_and_check_changed());
    assert!(!cal.poll_and_check_changed());
}

#[test]
fn test_identical_frames_not_reported() {
    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(CFG, 0).unwrap();
    let mut tx = Sender::new();

    tx.send(&mut dec, RawFrame::new(0x0004D2, 0x0004D2));
    assert!(cal.poll_and_check_changed());

    // Full retransmission of the same reading
    tx.send(&mut dec, RawFrame::new(0x0004D2, 0x0004D2));
    assert!(!cal.poll_and_check_changed());

    tx.send(&mut dec, RawFrame::new(0x0004D3, 0x0004D3));
    assert!(cal.poll_and_check_changed());
}

#[test]
fn test_single_count_values() {
    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(CFG, 0).unwrap();
    let mut tx = Sender::new();

    tx.send(&mut dec, RawFrame::new(1, 0x000001));
    cal.poll_and_check_changed();
    assert!((cal.value_inches() - 0.0000488).abs() < 1e-7);
    assert!((cal.value_millimeters() - 0.0000488 * 25.4).abs() < 1e-6);

    tx.send(&mut dec, RawFrame::new(2, 0xFFFFFF));
    cal.poll_and_check_changed();
    assert!((cal.value_inches() + 0.0000488).abs() < 1e-7);
    assert!(cal.value_millimeters() < 0.0);
}

#[test]
fn test_realistic_readings() {
    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(CFG, 0).unwrap();
    let mut tx = Sender::new();

    // 25.40 mm
    tx.send(&mut dec, RawFrame::new(1, 20480));
    cal.poll_and_check_changed();
    assert!((cal.value(Unit::Millimeters) - 25.4).abs() < 1e-3);
    assert!((cal.value(Unit::Inches) - 1.0).abs() < 1e-6);

    // -150.00 mm ≈ -120945 counts
    let counts = (-150.0f32 / 25.4 * 20480.0).round() as i32;
    tx.send(&mut dec, RawFrame::new(2, counts as u32));
    cal.poll_and_check_changed();
    assert!((cal.value_millimeters() + 150.0).abs() < 0.01);
}

#[test]
fn test_values_stable_between_polls() {
    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(CFG, 0).unwrap();
    let mut tx = Sender::new();

    tx.send(&mut dec, RawFrame::new(1, 2048));
    cal.poll_and_check_changed();
    let before = cal.value_millimeters();

    // New frame arrives but nobody polls: accessors keep the old snapshot
    tx.send(&mut dec, RawFrame::new(2, 4096));
    assert_eq!(cal.value_millimeters(), before);

    cal.poll_and_check_changed();
    assert!((cal.value_millimeters() - 2.0 * before).abs() < 1e-4);
}
