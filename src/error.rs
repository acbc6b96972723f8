//! Error types.
//!
//! Only setup can fail. Signal anomalies at runtime are counted in
//! [`DecoderStats`](crate::diag::DecoderStats), never returned.

/// Invalid decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// C01: Resync gap of zero would reset on every edge
    ZeroResyncGap,
    /// C02: Liveness timeout not above the resync gap
    LivenessBelowResync,
}

impl ConfigError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroResyncGap => "C01",
            Self::LivenessBelowResync => "C02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::ZeroResyncGap => "resync gap must be non-zero",
            Self::LivenessBelowResync => "liveness timeout must exceed resync gap",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Attach failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// I01: The link already has its producer and consumer
    AlreadyAttached,
    /// I02: Configuration rejected
    InvalidConfig(ConfigError),
    /// I03: ESP-IDF GPIO call failed (raw `esp_err_t`)
    Gpio(i32),
}

impl InitError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyAttached => "I01",
            Self::InvalidConfig(_) => "I02",
            Self::Gpio(_) => "I03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::AlreadyAttached => "decoder already attached",
            Self::InvalidConfig(_) => "invalid configuration",
            Self::Gpio(_) => "GPIO setup failed",
        }
    }
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        InitError::InvalidConfig(e)
    }
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidConfig(inner) => write!(f, "{}: {} ({})", self.code(), self.message(), inner),
            Self::Gpio(err) => write!(f, "{}: {} (esp_err {})", self.code(), self.message(), err),
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}
