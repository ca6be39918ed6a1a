//! Error types for the T.31 engine.
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: command and parameter failures
//! - [`ProtocolError`]: operations invalid for the current engine mode
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by fallible engine methods. Line-level trouble (bad FCS, duplicate
//! signal-end fields, DTE buffer overrun) is deliberately absorbed and
//! logged instead of surfaced here; the DTE learns about it through
//! result codes on the serial side.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Command and parameter errors.
///
/// These occur when the AT interpreter or host asks for something the
/// engine cannot set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A Class 1 carrier code outside the T.31 table
    UnsupportedClass1Code,
    /// An AT+FTH/+FRH rate other than 3 (300 bps V.21)
    UnsupportedHdlcRate,
    /// Bit rate not valid for the selected modulation
    InvalidBitRate,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::UnsupportedClass1Code => "unsupported Class 1 carrier code",
            ConfigError::UnsupportedHdlcRate => "unsupported HDLC rate",
            ConfigError::InvalidBitRate => "bit rate invalid for modulation",
        }
    }
}

// =============================================================================
// Protocol Errors
// =============================================================================

/// Operations invalid for the current engine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// A T.38 entry point was called while the engine runs the analog path
    T38Disabled,
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProtocolError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProtocolError::T38Disabled => "engine is not in T.38 mode",
        }
    }
}

// =============================================================================
// Unified Error
// =============================================================================

/// Unified error type wrapping all domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Command or parameter error
    Config(ConfigError),
    /// Mode error
    Protocol(ProtocolError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => e.fmt(f),
            Error::Protocol(e) => e.fmt(f),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
