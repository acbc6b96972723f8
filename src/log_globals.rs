//! Global log stream instance.
//!
//! The edge handler never logs, so a single stream serves the firmware:
//! producers are the polling side, the consumer is the console drain.

use crate::logging::LogStream;

/// Decoder log stream, drained by the host loop.
pub static DECODER_LOG: LogStream = LogStream::new();
