//! Core T.31 engine driver.
//!
//! This module contains the main [`T31Modem`](t31::T31Modem) structure and
//! the host-facing contracts:
//!
//! - [`T31Host`]: the callback surface every deployment provides
//! - [`ModemControl`]: control operations flowing in both directions
//! - [`config`]: builder-style engine configuration
//! - [`error`]: domain-split error types
//! - [`class1`]: the AT Class 1 command dispatcher

pub mod class1;
pub mod config;
pub mod error;
pub mod t31;

use crate::modem::ModemRole;
use crate::t38::types::{DataField, DataType, Indicator};

/// Control operations exchanged between the engine and its host.
///
/// The host sends call-progress and restart operations into
/// [`t31::T31Modem::modem_control`]; the engine intercepts what it owns and
/// forwards the rest to [`T31Host::modem_control`], alongside operations it
/// originates itself (CTS flow control, hangup requests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemControl {
    /// An incoming call was answered
    Answer,
    /// An outgoing call is being placed
    Call,
    /// The line went on hook
    Onhook,
    /// Restart the modem in the given role
    Restart(ModemRole),
    /// Arm (`Some(ms)`) or disarm (`None`) the DTE data deadline
    DteTimeout(Option<u32>),
    /// Assert (`true`) or deassert (`false`) clear-to-send toward the DTE
    Cts(bool),
    /// Drop the call
    Hangup,
}

/// Call progress events from the host's call control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallEvent {
    /// The far end is being alerted
    Alerting,
    /// The call was answered
    Answered,
    /// The call is established
    Connected,
    /// The call ended
    Hangup,
}

/// The callback surface a deployment provides to the engine.
///
/// All methods are synchronous; the engine calls them from within its own
/// entry points, never from another context. Hosts that only run the analog
/// path can leave the T.38 methods empty.
pub trait T31Host {
    /// Bytes toward the DTE: result codes and DLE-stuffed received data.
    fn at_tx(&mut self, data: &[u8]);

    /// Bytes from the DTE while in command mode, for the external AT
    /// command interpreter. The interpreter reacts by calling back into the
    /// engine (`process_class1_cmd`, `modem_control`, ...) after this
    /// delivery returns; it must not re-enter the engine from inside it.
    fn at_command(&mut self, data: &[u8]);

    /// Control operations originated or forwarded by the engine.
    fn modem_control(&mut self, op: ModemControl);

    /// Send one T.38 indicator packet, `count` copies.
    fn t38_indicator(&mut self, indicator: Indicator, count: u8);

    /// Send one T.38 data packet holding `fields`, `count` copies.
    fn t38_data(&mut self, data_type: DataType, fields: &[DataField<'_>], count: u8);
}
