//! Module: frame
//!
//! Purpose: The 48-bit caliper measurement frame and its conversion to
//! engineering units.
//!
//! Wire layout (per word, LSB first):
//! ```text
//! lower: [b0 .. b23]   device-internal, not interpreted
//! upper: [b0 .. b23]   signed 24-bit two's complement, 20480 counts/inch
//! ```
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

use core::fmt;

use crate::config::{COUNTS_PER_INCH, MM_PER_INCH, WORD_BITS};

/// Mask for the 24 significant bits of a word.
pub const WORD_MASK: u32 = (1 << WORD_BITS) - 1;

const SIGN_BIT: u32 = 1 << (WORD_BITS - 1);

/// Measurement unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Millimeters,
    Inches,
}

impl Unit {
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Millimeters => "mm",
            Unit::Inches => "in",
        }
    }
}

/// One complete transmission: two 24-bit words.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawFrame {
    /// First word on the wire.
    pub lower: u32,
    /// Second word on the wire: the signed position.
    pub upper: u32,
}

impl RawFrame {
    pub const EMPTY: Self = Self { lower: 0, upper: 0 };

    /// Build a frame, discarding anything above bit 23.
    pub const fn new(lower: u32, upper: u32) -> Self {
        Self {
            lower: lower & WORD_MASK,
            upper: upper & WORD_MASK,
        }
    }

    /// Word by wire order (0 = lower, 1 = upper).
    #[inline]
    pub const fn word(&self, index: usize) -> u32 {
        if index == 0 {
            self.lower
        } else {
            self.upper
        }
    }

    /// Position in device counts, sign-extended from bit 23.
    #[inline]
    pub const fn counts(&self) -> i32 {
        sign_extend_24(self.upper)
    }

    /// Position in inches.
    #[inline]
    pub fn inches(&self) -> f32 {
        self.counts() as f32 / COUNTS_PER_INCH
    }

    /// Position in millimeters.
    #[inline]
    pub fn millimeters(&self) -> f32 {
        self.inches() * MM_PER_INCH
    }

    /// Position in the requested unit.
    #[inline]
    pub fn value(&self, unit: Unit) -> f32 {
        match unit {
            Unit::Millimeters => self.millimeters(),
            Unit::Inches => self.inches(),
        }
    }
}

/// Sign-extend a 24-bit two's-complement word.
///
/// Bit 23 set forces bits 24..31 to one.
#[inline]
pub const fn sign_extend_24(word: u32) -> i32 {
    let word = word & WORD_MASK;
    if word & SIGN_BIT != 0 {
        (word | !WORD_MASK) as i32
    } else {
        word as i32
    }
}

/// Bit pattern as transmitted: three octets per word, LSB first.
///
/// `00000000 00000000 00000000  --- 10000000 00000000 00000000  --- `
impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..2 {
            let word = self.word(index);
            for octet in 0..3 {
                for bit in 0..8 {
                    let set = word & (1 << (octet * 8 + bit)) != 0;
                    f.write_str(if set { "1" } else { "0" })?;
                }
                f.write_str(" ")?;
            }
            f.write_str(" --- ")?;
        }
        Ok(())
    }
}
