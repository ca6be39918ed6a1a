//! Testing utilities and mock implementations
//!
//! Mock modem bank and host for exercising the engine on the host without
//! any DSP or wire codec attached.
//!
//! Only available when running `cargo test`.

#![allow(missing_docs)]

extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use crate::driver::config::{SignalPath, T31Config};
use crate::driver::t31::T31Modem;
use crate::driver::{ModemControl, T31Host};
use crate::dte::DLE;
use crate::modem::{
    FastModem, FastRxEvent, ModemBank, ToneKind, TxBit, V21RxEvent, V21TxEvent,
};
use crate::t38::types::{DataField, DataType, FieldType, Indicator};

// =============================================================================
// Mock Host
// =============================================================================

/// A captured outbound T.38 packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum T38Packet {
    Indicator {
        indicator: Indicator,
        count: u8,
    },
    Data {
        data_type: DataType,
        fields: Vec<(FieldType, Vec<u8>)>,
        count: u8,
    },
}

/// Host double recording everything the engine emits.
#[derive(Debug, Default)]
pub struct MockHost {
    /// Each `at_tx` call as one chunk
    pub chunks: Vec<Vec<u8>>,
    /// Bytes forwarded to the AT command interpreter
    pub command_bytes: Vec<u8>,
    /// Control operations, in order
    pub controls: Vec<ModemControl>,
    /// T.38 packets, in order
    pub packets: Vec<T38Packet>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.command_bytes.clear();
        self.controls.clear();
        self.packets.clear();
    }

    /// The result codes issued so far, in order.
    pub fn responses(&self) -> Vec<&'static str> {
        self.chunks
            .iter()
            .filter_map(|c| match c.as_slice() {
                b"\r\nOK\r\n" => Some("OK"),
                b"\r\nCONNECT\r\n" => Some("CONNECT"),
                b"\r\nNO CARRIER\r\n" => Some("NO CARRIER"),
                b"\r\nERROR\r\n" => Some("ERROR"),
                b"\r\n+FCERROR\r\n" => Some("+FCERROR"),
                b"\r\n+FRH:3\r\n" => Some("+FRH:3"),
                _ => None,
            })
            .collect()
    }

    /// Everything that was not a result code, concatenated: the DLE-stuffed
    /// data stream toward the DTE.
    pub fn data_bytes(&self) -> Vec<u8> {
        self.chunks
            .iter()
            .filter(|c| {
                !matches!(
                    c.as_slice(),
                    b"\r\nOK\r\n"
                        | b"\r\nCONNECT\r\n"
                        | b"\r\nNO CARRIER\r\n"
                        | b"\r\nERROR\r\n"
                        | b"\r\n+FCERROR\r\n"
                        | b"\r\n+FRH:3\r\n"
                )
            })
            .flat_map(|c| c.iter().copied())
            .collect()
    }

    /// Indicators sent so far, ignoring data packets.
    pub fn indicators(&self) -> Vec<Indicator> {
        self.packets
            .iter()
            .filter_map(|p| match p {
                T38Packet::Indicator { indicator, .. } => Some(*indicator),
                T38Packet::Data { .. } => None,
            })
            .collect()
    }

    /// Field types of data packets sent so far, flattened.
    pub fn data_fields(&self) -> Vec<FieldType> {
        self.packets
            .iter()
            .filter_map(|p| match p {
                T38Packet::Data { fields, .. } => Some(fields.iter().map(|f| f.0)),
                T38Packet::Indicator { .. } => None,
            })
            .flatten()
            .collect()
    }
}

impl T31Host for MockHost {
    fn at_tx(&mut self, data: &[u8]) {
        self.chunks.push(data.to_vec());
    }

    fn at_command(&mut self, data: &[u8]) {
        self.command_bytes.extend_from_slice(data);
    }

    fn modem_control(&mut self, op: ModemControl) {
        self.controls.push(op);
    }

    fn t38_indicator(&mut self, indicator: Indicator, count: u8) {
        self.packets.push(T38Packet::Indicator { indicator, count });
    }

    fn t38_data(&mut self, data_type: DataType, fields: &[DataField<'_>], count: u8) {
        self.packets.push(T38Packet::Data {
            data_type,
            fields: fields
                .iter()
                .map(|f| (f.field_type, f.data.to_vec()))
                .collect(),
            count,
        });
    }
}

// =============================================================================
// Mock Modem Bank
// =============================================================================

/// Owned version of [`V21RxEvent`] for scripting.
#[derive(Debug, Clone)]
pub enum MockV21Event {
    Frame { frame: Vec<u8>, ok: bool },
    FramingOk,
    CarrierUp,
    CarrierDown,
}

/// Modem bank double.
///
/// Receive paths replay events scripted by the test; transmit paths model
/// sample production just faithfully enough for the harness: silence and
/// CED run dry, CNG repeats forever, V.21 idles on flags between frames
/// and reports underflow after each queued frame, the fast modems consume
/// one bit per sample until the bit source ends the stream.
#[derive(Debug, Default)]
pub struct MockBank {
    // Scripts
    pub v21_events: VecDeque<MockV21Event>,
    pub fast_events: VecDeque<FastRxEvent>,
    // Records
    pub v21_frames: Vec<Vec<u8>>,
    pub v21_restarts: usize,
    pub v21_tx_restarts: usize,
    pub fast_rx_restarts: Vec<(FastModem, u16, bool)>,
    pub fast_tx_restarts: Vec<(FastModem, u16, bool)>,
    pub tones: Vec<ToneKind>,
    pub fast_tx_bits: Vec<u8>,
    pub v21_rx_samples: usize,
    pub fast_rx_samples: usize,
    /// Last value handed to `silence_set`
    pub silence_programmed: u32,
    /// Reported fast receive power
    pub signal_power: f32,
    // Generator state
    silence_remaining: u32,
    tone_remaining: Option<u32>,
    tone_infinite: bool,
    v21_pending: u32,
    v21_frame_outstanding: bool,
    v21_shutdown_queued: bool,
    v21_done: bool,
    fast_tx_done: bool,
}

impl MockBank {
    pub fn new() -> Self {
        Self {
            signal_power: -12.3,
            ..Self::default()
        }
    }

    pub fn script_v21(&mut self, ev: MockV21Event) {
        self.v21_events.push_back(ev);
    }

    pub fn script_fast(&mut self, ev: FastRxEvent) {
        self.fast_events.push_back(ev);
    }

    /// The bytes the fast modulator would have put on the wire, rebuilt
    /// LSB first from the drawn bits. Trailing partial bytes are dropped.
    pub fn fast_tx_bytes(&self) -> Vec<u8> {
        self.fast_tx_bits
            .chunks_exact(8)
            .map(|bits| {
                bits.iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, &b)| acc | ((b & 1) << i))
            })
            .collect()
    }
}

impl ModemBank for MockBank {
    fn v21_rx_restart(&mut self) {
        self.v21_restarts += 1;
    }

    fn v21_rx(&mut self, amp: &[i16], events: &mut dyn FnMut(V21RxEvent<'_>)) {
        self.v21_rx_samples += amp.len();
        while let Some(ev) = self.v21_events.pop_front() {
            match ev {
                MockV21Event::Frame { frame, ok } => events(V21RxEvent::Frame {
                    frame: &frame,
                    ok,
                }),
                MockV21Event::FramingOk => events(V21RxEvent::FramingOk),
                MockV21Event::CarrierUp => events(V21RxEvent::CarrierUp),
                MockV21Event::CarrierDown => events(V21RxEvent::CarrierDown),
            }
        }
    }

    fn v21_tx_restart(&mut self, preamble_flags: u8) {
        self.v21_tx_restarts += 1;
        // One flag octet is 8 bits at 300 bps, about 27 samples per bit.
        self.v21_pending = u32::from(preamble_flags) * 8 * 27;
        self.v21_frame_outstanding = false;
        self.v21_shutdown_queued = false;
        self.v21_done = false;
    }

    fn v21_tx_frame(&mut self, frame: &[u8]) {
        self.v21_frames.push(frame.to_vec());
        self.v21_pending += frame.len() as u32 * 27;
        self.v21_frame_outstanding = true;
    }

    fn v21_tx_shutdown(&mut self) {
        self.v21_shutdown_queued = true;
    }

    fn v21_tx(&mut self, amp: &mut [i16], events: &mut dyn FnMut(V21TxEvent)) -> usize {
        if self.v21_done {
            return 0;
        }
        amp.fill(0);
        self.v21_pending = self.v21_pending.saturating_sub(amp.len() as u32);
        if self.v21_pending == 0 {
            if self.v21_frame_outstanding {
                self.v21_frame_outstanding = false;
                events(V21TxEvent::Underflow);
            } else if self.v21_shutdown_queued {
                // Closing flags fill this block; dry afterwards.
                self.v21_shutdown_queued = false;
                self.v21_done = true;
            }
        }
        amp.len()
    }

    fn fast_rx_restart(&mut self, modem: FastModem, bit_rate: u16, short_train: bool) {
        self.fast_rx_restarts.push((modem, bit_rate, short_train));
    }

    fn fast_rx(&mut self, _modem: FastModem, amp: &[i16], events: &mut dyn FnMut(FastRxEvent)) {
        self.fast_rx_samples += amp.len();
        while let Some(ev) = self.fast_events.pop_front() {
            events(ev);
        }
    }

    fn fast_rx_signal_power(&self, _modem: FastModem) -> f32 {
        self.signal_power
    }

    fn fast_tx_restart(&mut self, modem: FastModem, bit_rate: u16, short_train: bool) {
        self.fast_tx_restarts.push((modem, bit_rate, short_train));
        self.fast_tx_done = false;
    }

    fn fast_tx(
        &mut self,
        _modem: FastModem,
        amp: &mut [i16],
        bits: &mut dyn FnMut() -> TxBit,
    ) -> usize {
        if self.fast_tx_done {
            return 0;
        }
        for (n, slot) in amp.iter_mut().enumerate() {
            match bits() {
                TxBit::Bit(b) => {
                    self.fast_tx_bits.push(b);
                    *slot = 0;
                }
                TxBit::EndOfData => {
                    // Collapse the modem shutdown sequence to this block.
                    self.fast_tx_done = true;
                    return n;
                }
            }
        }
        amp.len()
    }

    fn tone_start(&mut self, tone: ToneKind) {
        self.tones.push(tone);
        match tone {
            ToneKind::Ced => {
                // 2600 ms of tone plus the 75 ms trailing pause.
                self.tone_remaining = Some(2675 * 8);
                self.tone_infinite = false;
            }
            ToneKind::Cng => {
                self.tone_remaining = None;
                self.tone_infinite = true;
            }
        }
    }

    fn tone_tx(&mut self, amp: &mut [i16]) -> usize {
        if self.tone_infinite {
            amp.fill(0);
            return amp.len();
        }
        let remaining = self.tone_remaining.unwrap_or(0);
        let n = (remaining as usize).min(amp.len());
        amp[..n].fill(0);
        self.tone_remaining = Some(remaining - n as u32);
        n
    }

    fn silence_set(&mut self, samples: u32) {
        self.silence_programmed = samples;
        self.silence_remaining = samples;
    }

    fn silence_tx(&mut self, amp: &mut [i16]) -> usize {
        let n = (self.silence_remaining as usize).min(amp.len());
        amp[..n].fill(0);
        self.silence_remaining -= n as u32;
        n
    }
}

// =============================================================================
// Engine construction and wire helpers
// =============================================================================

/// An engine on the analog path with mock collaborators.
pub fn analog_engine() -> T31Modem<MockBank, MockHost> {
    T31Modem::new(MockBank::new(), MockHost::new(), T31Config::new())
}

/// An engine on the analog path with a custom configuration.
pub fn analog_engine_with(config: T31Config) -> T31Modem<MockBank, MockHost> {
    T31Modem::new(MockBank::new(), MockHost::new(), config)
}

/// An engine on the T.38 path with mock collaborators.
pub fn t38_engine() -> T31Modem<MockBank, MockHost> {
    T31Modem::new(
        MockBank::new(),
        MockHost::new(),
        T31Config::new().with_signal_path(SignalPath::T38),
    )
}

/// DLE-stuff a payload the way a DTE would.
pub fn stuff(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    for &b in payload {
        if b == DLE {
            out.push(DLE);
        }
        out.push(b);
    }
    out
}
