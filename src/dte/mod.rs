//! The DTE side: result codes, delivery modes and the serial uplink.
//!
//! Everything the DTE sees travels through here: V.25ter result codes,
//! DLE-stuffed data streams and queued response frames. The byte framers
//! for the opposite direction live in [`framer`].

pub mod framer;
pub(crate) mod queue;

use crate::driver::t31::Core;
use crate::driver::T31Host;
use crate::internal::constants::{DTE_RX_FLUSH_AT, ms_to_samples};

/// DLE: the escape byte of the Class 1 serial protocol.
pub const DLE: u8 = 0x10;
/// ETX: with DLE, terminates a frame or data stream.
pub const ETX: u8 = 0x03;
/// SUB: with DLE, stands for two literal DLE bytes.
pub const SUB: u8 = 0x1A;

/// What the engine does with bytes arriving from the DTE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DteRxMode {
    /// On hook; bytes belong to the AT command interpreter
    #[default]
    OnhookCommand,
    /// Off hook; bytes belong to the AT command interpreter
    OffhookCommand,
    /// DLE-stuffed HDLC frames for transmission
    Hdlc,
    /// DLE-stuffed non-ECM image data for transmission
    Stuffed,
    /// Engine is delivering received data; any DTE byte cancels
    Delivery,
}

/// V.25ter / T.31 result codes the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResponseCode {
    /// Command or transmission completed
    Ok = 0,
    /// Carrier negotiated, data follows
    Connect = 1,
    /// Carrier lost
    NoCarrier = 2,
    /// Command failed or DTE timed out
    Error = 3,
    /// A different carrier was detected than requested
    FcError = 4,
    /// Adaptive reception fell back to V.21 HDLC
    Frh3 = 5,
}

impl ResponseCode {
    /// The verbose result text, without line termination.
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            ResponseCode::Ok => "OK",
            ResponseCode::Connect => "CONNECT",
            ResponseCode::NoCarrier => "NO CARRIER",
            ResponseCode::Error => "ERROR",
            ResponseCode::FcError => "+FCERROR",
            ResponseCode::Frh3 => "+FRH:3",
        }
    }

    /// Recover a code from its queue tag byte.
    #[must_use]
    pub(crate) const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(ResponseCode::Ok),
            1 => Some(ResponseCode::Connect),
            2 => Some(ResponseCode::NoCarrier),
            3 => Some(ResponseCode::Error),
            4 => Some(ResponseCode::FcError),
            5 => Some(ResponseCode::Frh3),
            _ => None,
        }
    }
}

/// Serial-side state shared between the engine and the external AT
/// command interpreter.
#[derive(Debug)]
pub(crate) struct AtLink {
    /// Staging buffer for DLE-stuffed bytes on their way to the DTE
    pub(crate) rx_data: [u8; crate::internal::constants::DTE_RX_BUF_LEN],
    /// Bytes currently staged
    pub(crate) rx_data_bytes: usize,
    /// Current disposition of DTE input
    pub(crate) rx_mode: DteRxMode,
    /// The transmit side of the line is active
    pub(crate) transmit: bool,
    /// The DTE issued a receive command and is waiting for a result
    pub(crate) dte_is_waiting: bool,
    /// OK for the final frame is held back until the carrier drops
    pub(crate) ok_is_pending: bool,
    /// A receive carrier is (or was) present; the uplink stream is open
    pub(crate) rx_signal_present: bool,
    /// The receiving modem has trained
    pub(crate) rx_trained: bool,
    /// Hang up once the current transmission has flushed
    pub(crate) do_hangup: bool,
}

impl AtLink {
    pub(crate) const fn new() -> Self {
        Self {
            rx_data: [0; crate::internal::constants::DTE_RX_BUF_LEN],
            rx_data_bytes: 0,
            rx_mode: DteRxMode::OnhookCommand,
            transmit: true,
            dte_is_waiting: false,
            ok_is_pending: false,
            rx_signal_present: false,
            rx_trained: false,
            do_hangup: false,
        }
    }
}

// =============================================================================
// Uplink helpers
// =============================================================================

impl<H: T31Host> Core<H> {
    /// Issue a result code to the DTE.
    pub(crate) fn put_response(&mut self, code: ResponseCode) {
        let text = code.text();
        let mut line = [0u8; 16];
        line[0] = b'\r';
        line[1] = b'\n';
        line[2..2 + text.len()].copy_from_slice(text.as_bytes());
        line[2 + text.len()] = b'\r';
        line[3 + text.len()] = b'\n';
        self.host.at_tx(&line[..4 + text.len()]);
    }

    /// Change the disposition of DTE input.
    ///
    /// Data-bearing modes arm the DTE inactivity deadline; every other mode
    /// disarms it.
    pub(crate) fn set_rx_mode(&mut self, mode: DteRxMode) {
        self.at.rx_mode = mode;
        self.dte_data_timeout = match mode {
            DteRxMode::Hdlc | DteRxMode::Stuffed => {
                self.call_samples + ms_to_samples(self.config.dte_timeout_ms)
            }
            _ => 0,
        };
    }

    /// Stage one raw byte for the DTE, flushing first if the buffer is full.
    pub(crate) fn uplink_push(&mut self, b: u8) {
        if self.at.rx_data_bytes >= self.at.rx_data.len() {
            self.uplink_flush();
        }
        self.at.rx_data[self.at.rx_data_bytes] = b;
        self.at.rx_data_bytes += 1;
    }

    /// Stage one payload byte, doubling DLE.
    pub(crate) fn uplink_push_stuffed(&mut self, b: u8) {
        if b == DLE {
            self.uplink_push(DLE);
        }
        self.uplink_push(b);
    }

    /// Stage one received stream byte and flush opportunistically.
    pub(crate) fn uplink_put_data_byte(&mut self, b: u8) {
        self.uplink_push_stuffed(b);
        if self.at.rx_data_bytes >= DTE_RX_FLUSH_AT {
            self.uplink_flush();
        }
    }

    /// Hand everything staged to the DTE.
    pub(crate) fn uplink_flush(&mut self) {
        if self.at.rx_data_bytes > 0 {
            self.host.at_tx(&self.at.rx_data[..self.at.rx_data_bytes]);
            self.at.rx_data_bytes = 0;
        }
    }

    /// Terminate the uplink stream with DLE ETX and flush.
    pub(crate) fn uplink_terminate(&mut self) {
        self.uplink_push(DLE);
        self.uplink_push(ETX);
        self.uplink_flush();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
