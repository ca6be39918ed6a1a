//! T.31 Class 1 FAX Modem Engine
//!
//! A `no_std`, no-alloc implementation of the protocol core of a T.31
//! Class 1 FAX modem: the component between a DTE speaking the Class 1
//! "AT" dialect and either an analog audio path carrying V.21, V.17,
//! V.27ter and V.29 modulated FAX signals, or a packetized T.38 gateway
//! carrying typed indicators and data fields.
//!
//! # Architecture
//!
//! The crate is organized around one engine and two capability boundaries:
//!
//! 1. **Engine** ([`T31Modem`]): modem lifecycle, DTE byte framing, bit
//!    pumps, adaptive early reception, T.38 pacing and reception
//! 2. **DSP boundary** ([`ModemBank`]): the modulators, demodulators, tone
//!    and silence generators the engine steers but does not implement
//! 3. **Host boundary** ([`T31Host`]): bytes to the DTE, control
//!    operations, and the T.38 wire codec
//!
//! The engine is single-threaded and cooperative: all progress is driven
//! by the host calling the entry points, and all timing is counted in
//! 8 kHz samples rather than wall clock.
//!
//! # Features
//!
//! - `defmt`: enable defmt formatting and diagnostics
//! - `critical-section`: enable the ISR-safe [`sync::SharedT31`] wrapper
//!
//! # Example
//!
//! ```ignore
//! use ph_t31_fax::{T31Modem, T31Config, Class1Direction, Class1Operation};
//!
//! let mut t31 = T31Modem::new(bank, host, T31Config::new());
//!
//! // The AT interpreter decoded AT+FRM=96:
//! t31.process_class1_cmd(Class1Direction::Receive, Class1Operation::Modulation, 96)?;
//!
//! // Per audio block:
//! t31.rx(&incoming);
//! let produced = t31.tx(&mut outgoing);
//! ```

#![no_std]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
// Clippy lint levels live here; thresholds and config are in clippy.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::module_name_repetitions,
    clippy::items_after_statements
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod dte;
pub mod modem;
pub mod t38;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub(crate) mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::class1::{Class1Direction, Class1Operation};
pub use driver::config::{SignalPath, T31Config, T38Pacing};
pub use driver::error::{ConfigError, Error, ProtocolError, Result};
pub use driver::t31::T31Modem;
pub use driver::{CallEvent, ModemControl, T31Host};
pub use dte::{DteRxMode, ResponseCode};
pub use modem::{
    FastModem, FastRxEvent, ModemBank, ModemRole, ToneKind, TxBit, V21RxEvent, V21TxEvent,
};
pub use t38::types::{DataField, DataType, FieldType, Indicator};

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::SharedT31;

/// Shared protocol constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on engine types and integration points.
pub mod constants {
    pub use crate::internal::constants::{
        // Buffer sizing and flow control
        DTE_RX_FLUSH_AT,
        HDLC_RX_BODY_MAX,
        HDLC_TX_BUF_LEN,
        TX_BUF_HIGH_WATER,
        TX_BUF_LEN,
        TX_BUF_RELEASE,
        // T.38 pacing
        DATA_END_TX_COUNT,
        DATA_TX_COUNT,
        INDICATOR_TX_COUNT,
        MAX_OCTETS_PER_UNPACED_CHUNK,
        MID_RX_TIMEOUT_MS,
        MS_PER_TX_CHUNK,
        // Line supervision
        DEFAULT_DTE_TIMEOUT_MS,
        DEFAULT_S7_WAIT_S,
        SAMPLE_RATE,
        SILENCE_THRESHOLD_DBM0,
        // Helpers
        ms_to_samples,
    };
}
