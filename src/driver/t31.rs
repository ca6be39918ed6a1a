//! The T.31 Class 1 engine.
//!
//! This module contains the main [`T31Modem`] structure and core
//! operations:
//!
//! - Modem lifecycle: one role at a time, changed through the restart path
//! - The per-block sample harness (`rx` / `tx`)
//! - DTE input dispatch (`at_rx`) across command, HDLC, stuffed and
//!   delivery modes
//! - Control operation interception (`modem_control`)
//!
//! The engine is single-threaded and cooperative. All progress is driven
//! by the host calling the entry points; timing is counted in 8 kHz
//! samples presented per tick, never wall clock.
//!
//! Internally the engine splits into the modem bank `B` and the protocol
//! core. Demodulator events are dispatched to the core through closures
//! while the bank is borrowed, which is why the two live side by side in
//! one structure instead of referencing each other.

use super::config::{SignalPath, T31Config, T38Pacing};
use super::error::{ConfigError, Result};
use super::{CallEvent, ModemControl, T31Host};
use crate::dte::queue::ResponseQueue;
use crate::dte::{AtLink, DteRxMode, ResponseCode};
use crate::internal::constants::{
    HDLC_RX_BUF_LEN, HDLC_TX_BUF_LEN, MAX_SILENCE_AWAIT_SAMPLES, TX_BUF_LEN, ms_to_samples,
};
use crate::modem::power::{PowerMeter, power_threshold_dbm0};
use crate::modem::{
    FastModem, ModemBank, ModemRole, RxHandler, ToneKind, TxHandler, V21TxEvent,
};
use crate::t38::types::{fast_data_type, training_indicator, DataType, Indicator};
use crate::t38::{T38Link, TimedStep};

// =============================================================================
// Protocol core
// =============================================================================

/// Everything the engine tracks besides the modem bank itself.
///
/// Kept separate from the bank so event closures can mutate protocol state
/// while a bank method runs.
pub(crate) struct Core<H> {
    /// Host callback surface
    pub(crate) host: H,
    /// Engine configuration
    pub(crate) config: T31Config,

    /// Current role; `None` while quiescent
    pub(crate) modem: Option<ModemRole>,
    /// Packetized (T.38) rather than analog signal path
    pub(crate) t38_mode: bool,
    /// Bit rate for the fast modems
    pub(crate) bit_rate: u16,
    /// Short-train variant selected (V.17 only)
    pub(crate) short_train: bool,

    /// Receive routine for incoming sample blocks
    pub(crate) rx_handler: RxHandler,
    /// Transmit routine for outgoing sample blocks
    pub(crate) tx_handler: TxHandler,
    /// One-deep queued successor for the transmit routine
    pub(crate) next_tx_handler: Option<TxHandler>,

    /// Non-ECM image data from the DTE awaiting modulation
    pub(crate) tx_data: [u8; TX_BUF_LEN],
    /// Fill level of `tx_data`
    pub(crate) tx_in_bytes: usize,
    /// Drain position in `tx_data`
    pub(crate) tx_out_bytes: usize,
    /// CTS is currently deasserted toward the DTE
    pub(crate) tx_holding: bool,
    /// Real data octets have started flowing to the modem
    pub(crate) tx_data_started: bool,
    /// The DTE ended the stuffed stream with DLE ETX
    pub(crate) data_final: bool,

    /// Outbound HDLC frame being collected or transmitted
    pub(crate) hdlc_tx_buf: [u8; HDLC_TX_BUF_LEN],
    /// Length of the collected frame
    pub(crate) hdlc_tx_len: usize,
    /// Transmit progress through the collected frame
    pub(crate) hdlc_tx_ptr: usize,
    /// The collected frame carried the final-frame bit
    pub(crate) hdlc_final: bool,

    /// Inbound HDLC frame reassembly (T.38 path)
    pub(crate) hdlc_rx_buf: [u8; HDLC_RX_BUF_LEN],
    /// Octets reassembled so far
    pub(crate) hdlc_rx_len: usize,
    /// Octets are known to be missing from the reassembly
    pub(crate) missing_data: bool,

    /// One-byte lookahead state of the DTE byte framers
    pub(crate) dled: bool,
    /// Bit position of the serial/byte accumulators
    pub(crate) bit_no: u8,
    /// Byte being assembled or disassembled bit by bit
    pub(crate) current_byte: u8,

    /// Sample clock driving the T.38 timed sender
    pub(crate) samples: u64,
    /// Sample clock since the start of the call
    pub(crate) call_samples: u64,
    /// Deadline of the next timed transmission step
    pub(crate) next_tx_samples: u64,
    /// Mid-burst receive backstop; 0 when disarmed
    pub(crate) timeout_rx_samples: u64,
    /// DTE inactivity deadline; 0 when disarmed
    pub(crate) dte_data_timeout: u64,

    /// Current timed transmission step
    pub(crate) timed_step: TimedStep,
    /// T.38 link state
    pub(crate) t38: T38Link,
    /// A non-ECM receive burst is in progress on the T.38 path
    pub(crate) rx_signal_present: bool,
    /// A V.21 message has been received in the current reception
    pub(crate) rx_message_received: bool,

    /// Response frames parked until the DTE asks for them
    pub(crate) rx_queue: ResponseQueue,

    /// Received power estimator for silence detection
    pub(crate) rx_power: PowerMeter,
    /// Previous sample, for DC restoration
    pub(crate) last_sample: i16,
    /// Silence threshold on the power meter scale
    pub(crate) silence_threshold_power: i64,
    /// Consecutive silent samples heard, saturating
    pub(crate) silence_heard: u32,
    /// Silence period the DTE asked to wait for; 0 when none
    pub(crate) silence_awaited: u32,

    /// Serial-side state
    pub(crate) at: AtLink,
}

impl<H: T31Host> Core<H> {
    const fn new(host: H, config: T31Config) -> Self {
        let mut t38 = T38Link::new();
        t38.indicator_tx_count = config.t38_pacing.indicator_tx_count();
        t38.data_end_tx_count = config.t38_pacing.data_end_tx_count();
        t38.ms_per_tx_chunk = config.t38_pacing.ms_per_tx_chunk();
        t38.merge_tx_fields = config.t38_merge_fields;
        Self {
            host,
            config,
            modem: None,
            t38_mode: matches!(config.signal_path, SignalPath::T38),
            bit_rate: 0,
            short_train: false,
            rx_handler: RxHandler::Dummy,
            tx_handler: TxHandler::Silence,
            next_tx_handler: None,
            tx_data: [0; TX_BUF_LEN],
            tx_in_bytes: 0,
            tx_out_bytes: 0,
            tx_holding: false,
            tx_data_started: false,
            data_final: false,
            hdlc_tx_buf: [0; HDLC_TX_BUF_LEN],
            hdlc_tx_len: 0,
            hdlc_tx_ptr: 0,
            hdlc_final: false,
            hdlc_rx_buf: [0; HDLC_RX_BUF_LEN],
            hdlc_rx_len: 0,
            missing_data: false,
            dled: false,
            bit_no: 0,
            current_byte: 0,
            samples: 0,
            call_samples: 0,
            next_tx_samples: 0,
            timeout_rx_samples: 0,
            dte_data_timeout: 0,
            timed_step: TimedStep::Idle,
            t38,
            rx_signal_present: false,
            rx_message_received: false,
            rx_queue: ResponseQueue::new(),
            rx_power: PowerMeter::new(),
            last_sample: 0,
            silence_threshold_power: power_threshold_dbm0(config.silence_threshold_dbm0),
            silence_heard: 0,
            silence_awaited: 0,
            at: AtLink::new(),
        }
    }

    /// Track received power and the running silence count, and advance the
    /// call clock.
    fn update_line_monitor(&mut self, amp: &[i16]) {
        for &s in amp {
            // Clean up any DC influence before measuring.
            let diff = i32::from(s) - i32::from(self.last_sample);
            self.last_sample = s;
            let power = self.rx_power.update(diff);
            if power > self.silence_threshold_power {
                self.silence_heard = 0;
            } else if self.silence_heard <= MAX_SILENCE_AWAIT_SAMPLES {
                self.silence_heard += 1;
            }
        }
        self.call_samples += amp.len() as u64;
    }

    /// Complete an AT+FRS wait once enough silence has accumulated.
    fn silence_rx(&mut self) {
        if self.silence_awaited != 0 && self.silence_heard >= self.silence_awaited {
            self.put_response(ResponseCode::Ok);
            self.set_rx_mode(DteRxMode::OffhookCommand);
            self.silence_heard = 0;
            self.silence_awaited = 0;
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// A T.31 Class 1 FAX modem engine.
///
/// One instance serves one call at a time and is re-entered across many
/// calls. The engine mediates between a DTE speaking the Class 1 "AT"
/// dialect on one side and, on the other, either an analog audio path
/// driven through a [`ModemBank`] or a packetized T.38 gateway driven
/// through the host's typed packet callbacks.
///
/// # Entry points
///
/// - [`rx`](Self::rx) / [`tx`](Self::tx): analog sample blocks
/// - [`at_rx`](Self::at_rx): bytes from the DTE
/// - [`process_class1_cmd`](Self::process_class1_cmd): decoded Class 1
///   commands from the external AT interpreter
/// - [`t38_send_timeout`](Self::t38_send_timeout) and the `t38_rx_*`
///   handlers: the packetized path
///
/// Callers must not re-enter one instance concurrently; distinct instances
/// are independent.
pub struct T31Modem<B, H> {
    pub(crate) bank: B,
    pub(crate) core: Core<H>,
}

impl<B: ModemBank, H: T31Host> T31Modem<B, H> {
    /// Create an engine over a modem bank and a host callback surface.
    ///
    /// This is a const function suitable for static initialization.
    pub const fn new(bank: B, host: H, config: T31Config) -> Self {
        Self {
            bank,
            core: Core::new(host, config),
        }
    }

    // =========================================================================
    // State Accessors
    // =========================================================================

    /// The role currently active on the line, if any.
    #[inline(always)]
    pub fn modem(&self) -> Option<ModemRole> {
        self.core.modem
    }

    /// The current disposition of DTE input.
    #[inline(always)]
    pub fn dte_rx_mode(&self) -> DteRxMode {
        self.core.at.rx_mode
    }

    /// The configured fast-modem bit rate.
    #[inline(always)]
    pub fn bit_rate(&self) -> u16 {
        self.core.bit_rate
    }

    /// Whether the short-train variant is selected.
    #[inline(always)]
    pub fn short_train(&self) -> bool {
        self.core.short_train
    }

    /// Borrow the host callback surface.
    #[inline(always)]
    pub fn host(&self) -> &H {
        &self.core.host
    }

    /// Mutably borrow the host callback surface.
    #[inline(always)]
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.core.host
    }

    /// Borrow the modem bank.
    #[inline(always)]
    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Mutably borrow the modem bank.
    #[inline(always)]
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    // =========================================================================
    // Runtime configuration
    // =========================================================================

    /// Zero-fill transmit blocks when there is nothing to send.
    pub fn set_transmit_on_idle(&mut self, on: bool) {
        self.core.config.transmit_on_idle = on;
    }

    /// Account for a terminal equipment period ahead of training.
    pub fn set_tep_mode(&mut self, use_tep: bool) {
        self.core.config.use_tep = use_tep;
    }

    /// Switch between the analog and T.38 signal paths.
    pub fn set_t38_mode(&mut self, enabled: bool) {
        self.core.t38_mode = enabled;
    }

    /// Reconfigure T.38 transmit pacing.
    pub fn set_t38_pacing(&mut self, pacing: T38Pacing) {
        self.core.config.t38_pacing = pacing;
        self.core.t38.indicator_tx_count = pacing.indicator_tx_count();
        self.core.t38.data_end_tx_count = pacing.data_end_tx_count();
        self.core.t38.ms_per_tx_chunk = pacing.ms_per_tx_chunk();
    }

    // =========================================================================
    // Call control
    // =========================================================================

    /// Tell the engine about call progress. Answer and connection restart
    /// the call clock that S7 supervision counts from.
    pub fn call_event(&mut self, event: CallEvent) {
        #[cfg(feature = "defmt")]
        defmt::debug!("call event {}", event);
        if matches!(event, CallEvent::Answered | CallEvent::Connected) {
            self.core.call_samples = 0;
        }
    }

    /// Apply a control operation.
    ///
    /// Call progress, restart and DTE-deadline operations are handled here;
    /// everything else, plus the call-progress operations once handled, is
    /// forwarded to the host.
    pub fn modem_control(&mut self, op: ModemControl) -> Result<()> {
        match op {
            ModemControl::Answer | ModemControl::Call => {
                self.core.call_samples = 0;
                self.core.host.modem_control(op);
            }
            ModemControl::Onhook => {
                if self.core.tx_holding {
                    self.core.tx_holding = false;
                    // Release any flow-controlled data the DTE is sitting on.
                    self.core.host.modem_control(ModemControl::Cts(true));
                }
                if self.core.at.rx_signal_present {
                    self.core.uplink_terminate();
                }
                self.restart_modem(ModemRole::SilenceTx);
                self.core.host.modem_control(op);
            }
            ModemControl::Restart(role) => {
                self.restart(role)?;
            }
            ModemControl::DteTimeout(ms) => {
                self.core.dte_data_timeout = match ms {
                    Some(ms) => self.core.call_samples + ms_to_samples(ms),
                    None => 0,
                };
            }
            other => self.core.host.modem_control(other),
        }
        Ok(())
    }

    // =========================================================================
    // Modem lifecycle
    // =========================================================================

    /// Restart the modem in a new role.
    ///
    /// # Errors
    /// - `InvalidBitRate` - a fast-modem role was requested while the
    ///   configured bit rate does not belong to that modulation
    pub fn restart(&mut self, role: ModemRole) -> Result<()> {
        if let Some(fm) = role.fast_tx().or(role.fast_rx()) {
            let valid = match fm {
                FastModem::V17 => matches!(self.core.bit_rate, 7200 | 9600 | 12000 | 14400),
                FastModem::V29 => matches!(self.core.bit_rate, 7200 | 9600),
                FastModem::V27ter => matches!(self.core.bit_rate, 2400 | 4800),
            };
            if !valid {
                return Err(ConfigError::InvalidBitRate.into());
            }
        }
        self.restart_modem(role);
        Ok(())
    }

    /// Install the handlers and signal sources for `new_modem`.
    ///
    /// A request for the role already active is a no-op.
    pub(crate) fn restart_modem(&mut self, new_modem: ModemRole) {
        #[cfg(feature = "defmt")]
        defmt::debug!("restart modem {}", new_modem);
        if self.core.modem == Some(new_modem) {
            return;
        }
        self.core.rx_queue.clear();
        self.core.modem = Some(new_modem);
        self.core.data_final = false;
        self.core.at.rx_signal_present = false;
        self.core.at.rx_trained = false;
        self.core.rx_message_received = false;
        self.core.rx_handler = RxHandler::Dummy;
        match new_modem {
            ModemRole::CngTone => {
                if self.core.t38_mode {
                    self.core.t38_start_timed(TimedStep::CngSilence);
                } else {
                    // CNG is special: V.21 HDLC reception runs while the tone
                    // is sent. Everything else in FAX processing sends only
                    // one way at a time. The tone continues until a valid
                    // preamble arrives.
                    self.bank.tone_start(ToneKind::Cng);
                    self.core.rx_handler = RxHandler::Cng;
                    self.prime_v21_rx();
                    self.core.tx_handler = TxHandler::Tone;
                    self.core.next_tx_handler = None;
                }
                self.core.at.transmit = true;
            }
            ModemRole::NocngTone => {
                if !self.core.t38_mode {
                    self.core.rx_handler = RxHandler::Cng;
                    self.prime_v21_rx();
                    self.bank.silence_set(0);
                    self.core.tx_handler = TxHandler::Silence;
                }
                self.core.at.transmit = false;
            }
            ModemRole::CedTone => {
                if self.core.t38_mode {
                    self.core.t38_start_timed(TimedStep::CedSilence);
                } else {
                    // 200 ms of silence, then the answer tone.
                    self.bank.silence_set(ms_to_samples(200) as u32);
                    self.bank.tone_start(ToneKind::Ced);
                    self.core.tx_handler = TxHandler::Silence;
                    self.core.next_tx_handler = Some(TxHandler::Tone);
                }
                self.core.at.transmit = true;
            }
            ModemRole::V21Tx => {
                if self.core.t38_mode {
                    self.core.t38.next_tx_indicator = Indicator::V21Preamble;
                    self.core.t38.current_tx_data_type = DataType::V21;
                    self.core.t38.octets_per_data_packet = self.core.chunk_octets(300);
                    self.core.t38_start_timed(TimedStep::HdlcStart);
                } else {
                    // The spec wants 1 s +-15 % of preamble, so 32 flag
                    // octets minimum.
                    self.bank.v21_tx_restart(32);
                    self.core.tx_handler = TxHandler::V21;
                    self.core.next_tx_handler = None;
                }
                self.core.hdlc_final = false;
                self.core.hdlc_tx_len = 0;
                self.core.hdlc_tx_ptr = 0;
                self.core.dled = false;
                self.core.at.transmit = true;
            }
            ModemRole::V21Rx => {
                if !self.core.t38_mode {
                    self.core.rx_handler = RxHandler::V21;
                    self.prime_v21_rx();
                }
                // In T.38 mode reception is driven by incoming packets.
            }
            ModemRole::V17Tx | ModemRole::V27terTx | ModemRole::V29Tx => {
                let fm = match new_modem {
                    ModemRole::V17Tx => FastModem::V17,
                    ModemRole::V27terTx => FastModem::V27ter,
                    _ => FastModem::V29,
                };
                if self.core.t38_mode {
                    self.core.t38.next_tx_indicator =
                        training_indicator(fm, self.core.bit_rate, self.core.short_train);
                    self.core.t38.current_tx_data_type = fast_data_type(fm, self.core.bit_rate);
                    self.core.t38.octets_per_data_packet =
                        self.core.chunk_octets(self.core.bit_rate);
                    self.core.t38_start_timed(TimedStep::NonEcmStart);
                } else {
                    self.bank
                        .fast_tx_restart(fm, self.core.bit_rate, self.core.short_train);
                    self.core.tx_handler = TxHandler::Fast(fm);
                    self.core.next_tx_handler = None;
                }
                self.core.tx_data_started = false;
                self.core.at.transmit = true;
            }
            ModemRole::V17Rx | ModemRole::V27terRx | ModemRole::V29Rx => {
                if !self.core.t38_mode {
                    let fm = match new_modem {
                        ModemRole::V17Rx => FastModem::V17,
                        ModemRole::V27terRx => FastModem::V27ter,
                        _ => FastModem::V29,
                    };
                    self.core.rx_handler = RxHandler::Early(fm);
                    self.bank
                        .fast_rx_restart(fm, self.core.bit_rate, self.core.short_train);
                    // Keep V.21 primed for the +FCERROR / +FRH:3 fallback.
                    self.prime_v21_rx();
                }
                self.core.at.transmit = false;
            }
            ModemRole::SilenceTx => {
                if self.core.t38_mode {
                    self.core.t38_send_indicator(Indicator::NoSignal);
                } else {
                    self.bank.silence_set(0);
                    self.core.tx_handler = TxHandler::Silence;
                    self.core.next_tx_handler = None;
                }
                self.core.at.transmit = false;
            }
            ModemRole::SilenceRx => {
                if !self.core.t38_mode {
                    self.core.rx_handler = RxHandler::Silence;
                    self.bank.silence_set(0);
                    self.core.tx_handler = TxHandler::Silence;
                    self.core.next_tx_handler = None;
                }
                self.core.at.transmit = false;
            }
            ModemRole::Flush => {
                // Push the last audio out with 200 ms of silence.
                if self.core.t38_mode {
                    self.core.t38_send_indicator(Indicator::NoSignal);
                } else {
                    self.core.modem = Some(ModemRole::SilenceTx);
                    self.bank.silence_set(ms_to_samples(200) as u32);
                    self.core.tx_handler = TxHandler::Silence;
                    self.core.next_tx_handler = None;
                    self.core.at.transmit = true;
                }
            }
        }
        self.core.bit_no = 0;
        self.core.current_byte = 0xFF;
        self.core.tx_in_bytes = 0;
        self.core.tx_out_bytes = 0;
    }

    /// Reset the V.21 receive path and the transmit-side framer state that
    /// shares its buffers.
    fn prime_v21_rx(&mut self) {
        self.bank.v21_rx_restart();
        self.core.at.ok_is_pending = false;
        self.core.hdlc_final = false;
        self.core.hdlc_tx_len = 0;
        self.core.hdlc_tx_ptr = 0;
        self.core.dled = false;
        self.core.at.transmit = true;
    }

    // =========================================================================
    // Sample harness
    // =========================================================================

    /// Feed one block of received audio samples.
    pub fn rx(&mut self, amp: &[i16]) {
        self.core.update_line_monitor(amp);

        // In HDLC or stuffed transmit mode, prolonged DTE silence is an
        // error: report it and return to command mode.
        if self.core.dte_data_timeout != 0 && self.core.call_samples > self.core.dte_data_timeout {
            self.core.set_rx_mode(DteRxMode::OffhookCommand);
            self.core.put_response(ResponseCode::Error);
            self.restart_modem(ModemRole::SilenceTx);
        }

        if !self.core.at.transmit || self.core.modem == Some(ModemRole::CngTone) {
            self.rx_dispatch(amp);
        }
    }

    fn rx_dispatch(&mut self, amp: &[i16]) {
        if matches!(self.core.rx_handler, RxHandler::Cng)
            && matches!(
                self.core.modem,
                Some(ModemRole::CngTone | ModemRole::NocngTone)
            )
            && self.core.call_samples > ms_to_samples(u32::from(self.core.config.s7_wait_s) * 1000)
        {
            // S7 elapsed after calling with no carrier found.
            self.core.put_response(ResponseCode::NoCarrier);
            self.restart_modem(ModemRole::SilenceTx);
            self.core.host.modem_control(ModemControl::Hangup);
            self.core.set_rx_mode(DteRxMode::OnhookCommand);
            return;
        }
        let handler = self.core.rx_handler;
        if let RxHandler::Early(fm) = handler {
            self.early_fast_rx(fm, amp);
            return;
        }
        let Self { bank, core } = self;
        match handler {
            RxHandler::Dummy | RxHandler::Early(_) => {}
            RxHandler::Silence => core.silence_rx(),
            RxHandler::Cng | RxHandler::V21 => {
                bank.v21_rx(amp, &mut |ev| core.v21_rx_event(ev));
            }
            RxHandler::Fast(fm) => {
                bank.fast_rx(fm, amp, &mut |ev| core.non_ecm_put_bit(ev));
            }
        }
    }

    /// Produce one block of transmit audio samples.
    ///
    /// Returns how many samples were written. A full block means the
    /// transmitter is still busy; anything less means the current signal ran
    /// dry and the engine moved on.
    pub fn tx(&mut self, amp: &mut [i16]) -> usize {
        let max_len = amp.len();
        let mut len = 0;
        if self.core.at.transmit {
            len = self.tx_fill(amp);
            if len < max_len {
                // Allow for one change of transmit source within a block.
                self.set_next_tx_type();
                len += self.tx_fill(&mut amp[len..]);
                if len < max_len {
                    self.tx_run_dry();
                }
            }
        }
        if self.core.config.transmit_on_idle {
            // Pad to the requested length with silence.
            amp[len..].fill(0);
            len = max_len;
        }
        len
    }

    fn tx_fill(&mut self, amp: &mut [i16]) -> usize {
        let Self { bank, core } = self;
        match core.tx_handler {
            TxHandler::Silence => bank.silence_tx(amp),
            TxHandler::Tone => bank.tone_tx(amp),
            TxHandler::V21 => {
                let mut underflow = false;
                let n = bank.v21_tx(amp, &mut |ev| {
                    if ev == V21TxEvent::Underflow {
                        underflow = true;
                    }
                });
                if underflow {
                    if core.hdlc_final {
                        core.hdlc_final = false;
                        // Schedule an orderly shutdown of the modem.
                        bank.v21_tx_shutdown();
                    } else {
                        // Invite the next frame from the DTE.
                        core.put_response(ResponseCode::Connect);
                    }
                }
                n
            }
            TxHandler::Fast(fm) => bank.fast_tx(fm, amp, &mut || core.non_ecm_get_bit()),
        }
    }

    /// Promote the queued transmit source, or fall back to zero-length
    /// silence when there is nothing queued.
    fn set_next_tx_type(&mut self) -> bool {
        if let Some(next) = self.core.next_tx_handler.take() {
            self.core.tx_handler = next;
            true
        } else {
            self.bank.silence_set(0);
            self.core.tx_handler = TxHandler::Silence;
            false
        }
    }

    /// The transmitter ran dry with nothing queued: close out the current
    /// role.
    fn tx_run_dry(&mut self) {
        match self.core.modem {
            Some(ModemRole::SilenceTx) => {
                self.core.modem = None;
                self.core.put_response(ResponseCode::Ok);
                if self.core.at.do_hangup {
                    self.core.host.modem_control(ModemControl::Hangup);
                    self.core.set_rx_mode(DteRxMode::OnhookCommand);
                    self.core.at.do_hangup = false;
                } else {
                    self.core.set_rx_mode(DteRxMode::OffhookCommand);
                }
            }
            Some(ModemRole::CedTone) => {
                // Go directly to V.21 HDLC transmit.
                self.core.modem = None;
                self.restart_modem(ModemRole::V21Tx);
                self.core.set_rx_mode(DteRxMode::Hdlc);
            }
            Some(
                ModemRole::V21Tx | ModemRole::V17Tx | ModemRole::V27terTx | ModemRole::V29Tx,
            ) => {
                self.core.modem = None;
                self.core.put_response(ResponseCode::Ok);
                self.core.set_rx_mode(DteRxMode::OffhookCommand);
                self.restart_modem(ModemRole::SilenceTx);
            }
            _ => {}
        }
    }

    // =========================================================================
    // DTE input
    // =========================================================================

    /// Feed bytes arriving from the DTE.
    ///
    /// Command-mode bytes are handed to the host's AT interpreter; data
    /// modes run the DLE framers; any byte during delivery cancels the
    /// reception in progress.
    pub fn at_rx(&mut self, data: &[u8]) {
        if self.core.dte_data_timeout != 0 {
            self.core.dte_data_timeout =
                self.core.call_samples + ms_to_samples(self.core.config.dte_timeout_ms);
        }
        match self.core.at.rx_mode {
            DteRxMode::OnhookCommand | DteRxMode::OffhookCommand => {
                self.core.host.at_command(data);
            }
            DteRxMode::Delivery => {
                // Data from the DTE in this state returns us to command mode.
                if !data.is_empty() {
                    if self.core.at.rx_signal_present {
                        self.core.uplink_terminate();
                    }
                    self.core.at.rx_data_bytes = 0;
                    self.core.at.transmit = false;
                    self.core.modem = Some(ModemRole::SilenceTx);
                    self.core.set_rx_mode(DteRxMode::OffhookCommand);
                    self.core.put_response(ResponseCode::Ok);
                }
            }
            DteRxMode::Hdlc => self.dle_unstuff_hdlc(data),
            DteRxMode::Stuffed => {
                if self.core.tx_out_bytes > 0 {
                    // Make room for new data in the existing buffer.
                    let (out_b, in_b) = (self.core.tx_out_bytes, self.core.tx_in_bytes);
                    self.core.tx_data.copy_within(out_b..in_b, 0);
                    self.core.tx_in_bytes = in_b - out_b;
                    self.core.tx_out_bytes = 0;
                }
                self.core.dle_unstuff(data);
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
