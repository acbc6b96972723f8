//! # RustCaliperDecoder
//!
//! Decoder for the two-wire clock/data protocol of low-cost digital calipers.
//!
//! ## Architecture
//!
//! All data flows one way through a [`CaliperLink`]:
//! - [`EdgeDecoder`] runs in the clock interrupt, assembles 2 × 24 bits, publishes
//! - [`Calipers`] runs in the host loop, snapshots, compares, converts
//! - No callbacks into user code, no locks, no interrupt masking
//!
//! Everything except [`hal`] is pure logic and testable on host.

#![cfg_attr(not(test), no_std)]

pub mod calipers;
pub mod config;
pub mod decoder;
pub mod diag;
pub mod error;
pub mod frame;
pub mod link;
pub mod log_globals;
pub mod logging;
pub mod trace;

#[cfg(target_os = "espidf")]
pub mod hal;

pub use calipers::{Calipers, Presence};
pub use config::{DecoderConfig, EdgePolarity};
pub use decoder::{EdgeDecoder, EdgeOutcome, SyncState};
pub use diag::{DecoderStats, DiagEvent, StatsSnapshot};
pub use error::{ConfigError, InitError};
pub use frame::{RawFrame, Unit};
pub use link::CaliperLink;
pub use log_globals::DECODER_LOG;
