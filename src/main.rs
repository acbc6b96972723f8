//! RustCaliperDecoder - Main entry point
//!
//! On ESP-IDF:
//! 1. Attach the decoder to the caliper's clock and data pins
//! 2. Poll every 4 ms, log changed readings and presence changes
//! 3. Drain the decoder log to the console
//!
//! On host: replay a synthetic caliper trace through the same decoder.

use rust_caliper_decoder::{CaliperLink, DecoderConfig};

#[cfg(target_os = "espidf")]
fn main() {
    use core::fmt::Write;

    use rust_caliper_decoder::hal::{self, CaliperPins};
    use rust_caliper_decoder::{caliper_error, caliper_info, Presence, DECODER_LOG};

    use esp_idf_svc::hal::delay::FreeRtos;

    static LINK: CaliperLink = CaliperLink::new();

    const PINS: CaliperPins = CaliperPins { data: 0, clock: 1 };
    const POLL_INTERVAL_MS: u32 = 4;

    /// Console sink for the log drain.
    struct Stdout;

    impl Write for Stdout {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            print!("{}", s);
            Ok(())
        }
    }

    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    println!("{}", env!("VERSION_STRING"));

    let mut calipers = match hal::attach(&LINK, PINS, DecoderConfig::DEFAULT) {
        Ok(calipers) => calipers,
        Err(e) => {
            caliper_error!(DECODER_LOG, hal::now_ms(), "attach failed: {}", e);
            let _ = DECODER_LOG.drain_to(&mut Stdout);
            return;
        }
    };

    loop {
        let now = hal::now_ms();

        // Power management belongs to the host application; just report
        if calipers.update_presence(now) == Presence::Lost {
            let stats = calipers.stats();
            caliper_info!(
                DECODER_LOG,
                now,
                "frames={} resyncs={} sync_losses={} overruns={}",
                stats.frames,
                stats.resyncs,
                stats.sync_losses,
                stats.overruns
            );
        }

        if calipers.poll_and_check_changed() {
            caliper_info!(DECODER_LOG, now, "{:.2} mm", calipers.value_millimeters());
        }

        let _ = DECODER_LOG.drain_to(&mut Stdout);
        FreeRtos::delay_ms(POLL_INTERVAL_MS);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use rust_caliper_decoder::logging::LogStream;
    use rust_caliper_decoder::trace::{replay, FrameTrace, TraceTiming};
    use rust_caliper_decoder::{DiagEvent, RawFrame, Unit};

    static LINK: CaliperLink = CaliperLink::new();
    static LOG: LogStream = LogStream::new();

    println!("{} (host trace replay)", env!("VERSION_STRING"));

    let config = DecoderConfig::DEFAULT;
    let (mut decoder, calipers) = match LINK.split(config, 0) {
        Ok(halves) => halves,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let mut calipers = calipers.with_log(&LOG);

    // 12.70 mm, -3.81 mm, then 12.70 mm again
    let readings: [i32; 3] = [10240, -3072, 10240];
    let mut start_us = 10_000;

    for (i, counts) in readings.iter().enumerate() {
        let frame = RawFrame::new(i as u32, *counts as u32);
        let trace = FrameTrace::new(frame, start_us, TraceTiming::TYPICAL, config.data_active_low);
        start_us = trace.next_start_us();

        replay(&mut decoder, trace);
        if calipers.poll_and_check_changed() {
            for unit in [Unit::Millimeters, Unit::Inches] {
                print!("{:>9.4} {}", calipers.value(unit), unit.suffix());
            }
            println!();
        }
    }

    let mut dump = String::new();
    if calipers.debug_dump(&mut dump).is_ok() {
        println!("{}", dump);
    }
    let mut lines = String::new();
    let _ = LOG.drain_to(&mut lines);
    print!("{}", lines);
    for event in [DiagEvent::SyncLoss, DiagEvent::FrameOverrun, DiagEvent::LivenessTimeout] {
        println!("{}: {}", event.as_str(), LINK.stats().count(event));
    }
    println!("{:?}", calipers.stats());
}
