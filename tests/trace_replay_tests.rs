//! Capture parsing and replay tests

use rust_caliper_decoder::trace::{replay, FrameTrace, TraceEdge, TraceTiming};
use rust_caliper_decoder::{CaliperLink, DecoderConfig, DiagEvent, RawFrame};

/// Render a frame as capture text, the way a logic analyzer export looks.
fn capture_text(frame: RawFrame, start_us: u64, active_low: bool) -> String {
    let mut text = String::from("# time_us,data\n");
    for edge in FrameTrace::new(frame, start_us, TraceTiming::TYPICAL, active_low) {
        text.push_str(&format!("{},{}\n", edge.at_us, edge.level as u8));
    }
    text
}

#[test]
fn test_replay_parsed_capture() {
    let frame = RawFrame::new(0x00A0A0, 0x0027F6);
    let text = capture_text(frame, 250_000, true);

    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();

    let summary = replay(&mut dec, text.lines().filter_map(TraceEdge::parse));
    assert_eq!(summary.edges, 48);
    assert_eq!(summary.words, 2);
    assert_eq!(summary.frames, 1);

    assert!(cal.poll_and_check_changed());
    assert_eq!(cal.raw(), frame);
    // 0x27F6 = 10230 counts ≈ 12.69 mm
    assert!((cal.value_millimeters() - 12.687).abs() < 0.01);
}

#[test]
fn test_wrong_data_sense_inverts_bits() {
    // Captured from an active-high interface, decoded with the default active-low
    let frame = RawFrame::new(0x000000, 0x000001);
    let text = capture_text(frame, 20_000, false);

    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();
    replay(&mut dec, text.lines().filter_map(TraceEdge::parse));

    assert!(cal.poll_and_check_changed());
    assert_eq!(cal.raw(), RawFrame::new(0xFFFFFF, 0xFFFFFE));
}

#[test]
fn test_replay_with_slow_word_gap() {
    // 3 ms between words stays under the 5 ms resync gap
    let timing = TraceTiming {
        bit_period_us: 100,
        word_gap_us: 3_000,
        frame_interval_us: 120_000,
    };
    let frame = RawFrame::new(0x111111, 0x000222);

    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();
    let summary = replay(&mut dec, FrameTrace::new(frame, 50_000, timing, true));

    assert_eq!(summary.frames, 1);
    assert!(cal.poll_and_check_changed());
    assert_eq!(cal.raw(), frame);
}

#[test]
fn test_word_gap_beyond_threshold_splits_frame() {
    let timing = TraceTiming {
        bit_period_us: 100,
        word_gap_us: 8_000,
        frame_interval_us: 120_000,
    };

    let link = CaliperLink::new();
    let (mut dec, mut cal) = link.split(DecoderConfig::DEFAULT, 0).unwrap();
    let summary = replay(&mut dec, FrameTrace::new(RawFrame::new(1, 2), 50_000, timing, true));

    // Upper word is taken as a fresh lower word; nothing completes
    assert_eq!(summary.frames, 0);
    assert_eq!(summary.words, 2);
    assert!(!cal.poll_and_check_changed());
    assert_eq!(link.stats().count(DiagEvent::SyncLoss), 1);
}
