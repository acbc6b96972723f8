//! Hardware Abstraction Layer for RustCaliperDecoder.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Decoding logic stays in core modules, HAL is just I/O.

pub mod gpio;

pub use gpio::{attach, now_ms, CaliperPins};
