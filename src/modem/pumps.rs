//! Bit pumps bridging the modem bit clocks to the DTE byte stream.
//!
//! Downlink: `non_ecm_get_bit` feeds the fast modulators from the buffered
//! DTE data, filling with 0xFF or 0x00 when the DTE falls behind. Uplink:
//! `non_ecm_put_bit` assembles demodulated bits into DLE-stuffed bytes, and
//! `v21_rx_event` turns deframed HDLC traffic into DTE deliveries, queued
//! responses and carrier supervision.

use crate::driver::t31::Core;
use crate::driver::{ModemControl, T31Host};
use crate::dte::{DteRxMode, ResponseCode};
use crate::internal::constants::{RESPONSE_MSG_MAX, TX_BUF_RELEASE};
use crate::modem::{FastRxEvent, ModemRole, TxBit, V21RxEvent};

impl<H: T31Host> Core<H> {
    // =========================================================================
    // Downlink: DTE buffer to modem bits
    // =========================================================================

    /// Draw the next octet for the fast modulator.
    ///
    /// `None` ends the stream: the DTE finished and the modem should run
    /// its shutdown sequence.
    pub(crate) fn non_ecm_get_byte(&mut self) -> Option<u8> {
        if self.tx_out_bytes != self.tx_in_bytes {
            // Real data is available to send.
            let b = self.tx_data[self.tx_out_bytes];
            self.tx_out_bytes += 1;
            if self.tx_holding && self.tx_out_bytes > TX_BUF_RELEASE {
                // The buffer is draining; release flow control.
                self.tx_holding = false;
                self.host.modem_control(ModemControl::Cts(true));
            }
            self.tx_data_started = true;
            Some(b)
        } else if self.data_final {
            self.data_final = false;
            // The modem now runs its shutdown sequence; OK follows once it
            // has finished.
            None
        } else {
            // Fill with 0xFF before transmission has started, 0x00 in the
            // middle of transmission. This follows T.31 and T.30 practice.
            Some(if self.tx_data_started { 0x00 } else { 0xFF })
        }
    }

    /// Draw the next transmit bit, LSB first.
    pub(crate) fn non_ecm_get_bit(&mut self) -> TxBit {
        if self.bit_no == 0 {
            match self.non_ecm_get_byte() {
                Some(b) => {
                    self.current_byte = b;
                    self.bit_no = 8;
                }
                None => return TxBit::EndOfData,
            }
        }
        self.bit_no -= 1;
        let bit = self.current_byte & 1;
        self.current_byte >>= 1;
        TxBit::Bit(bit)
    }

    /// Fill `buf` with transmit octets for a T.38 data packet.
    ///
    /// Returns the octets written and whether the stream ended inside this
    /// chunk.
    pub(crate) fn non_ecm_get_chunk(&mut self, buf: &mut [u8]) -> (usize, bool) {
        for i in 0..buf.len() {
            match self.non_ecm_get_byte() {
                Some(b) => buf[i] = b,
                None => return (i, true),
            }
        }
        (buf.len(), false)
    }

    // =========================================================================
    // Uplink: modem bits to the DTE
    // =========================================================================

    /// Handle one fast-modem receive event.
    pub(crate) fn non_ecm_put_bit(&mut self, ev: FastRxEvent) {
        match ev {
            FastRxEvent::TrainingFailed => self.at.rx_trained = false,
            FastRxEvent::TrainingSucceeded => {
                // The modem is now trained.
                self.put_response(ResponseCode::Connect);
                self.at.rx_signal_present = true;
                self.at.rx_trained = true;
            }
            FastRxEvent::CarrierUp => {}
            FastRxEvent::CarrierDown => {
                if self.at.rx_signal_present {
                    self.uplink_terminate();
                    self.put_response(ResponseCode::NoCarrier);
                    self.set_rx_mode(DteRxMode::OffhookCommand);
                }
                self.at.rx_signal_present = false;
                self.at.rx_trained = false;
            }
            FastRxEvent::Bit(bit) => {
                self.current_byte = (self.current_byte >> 1) | ((bit & 1) << 7);
                self.bit_no += 1;
                if self.bit_no >= 8 {
                    self.uplink_put_data_byte(self.current_byte);
                    self.bit_no = 0;
                    self.current_byte = 0;
                }
            }
        }
    }

    /// Handle one event from the V.21 receive path.
    pub(crate) fn v21_rx_event(&mut self, ev: V21RxEvent<'_>) {
        match ev {
            V21RxEvent::Frame { frame, ok } => self.hdlc_accept_frame(frame, ok),
            V21RxEvent::CarrierUp => {
                if matches!(
                    self.modem,
                    Some(ModemRole::CngTone | ModemRole::NocngTone | ModemRole::V21Rx)
                ) {
                    self.at.rx_signal_present = true;
                    self.rx_message_received = false;
                }
            }
            V21RxEvent::CarrierDown => {
                if self.rx_message_received {
                    if self.at.dte_is_waiting {
                        if self.at.ok_is_pending {
                            self.put_response(ResponseCode::Ok);
                            self.at.ok_is_pending = false;
                        } else {
                            self.put_response(ResponseCode::NoCarrier);
                        }
                        self.at.dte_is_waiting = false;
                        self.set_rx_mode(DteRxMode::OffhookCommand);
                    } else {
                        self.queue_response(&[ResponseCode::NoCarrier as u8]);
                    }
                }
                self.at.rx_signal_present = false;
                self.at.rx_trained = false;
            }
            V21RxEvent::FramingOk => {
                if matches!(self.modem, Some(ModemRole::CngTone | ModemRole::NocngTone)) {
                    // Once any valid HDLC framing arrives the CNG tone stops
                    // and we drop to the V.21 receive modem on its own.
                    self.modem = Some(ModemRole::V21Rx);
                    self.at.transmit = false;
                }
                if matches!(
                    self.modem,
                    Some(ModemRole::V17Rx | ModemRole::V27terRx | ModemRole::V29Rx)
                ) {
                    // V.21 detected while expecting a different carrier.
                    // +FAR=0 reports +FCERROR and returns to command mode;
                    // +FAR=1 reports +FRH:3 and CONNECT, switching to V.21
                    // receive mode.
                    if self.config.adaptive_receive {
                        self.at.rx_signal_present = true;
                        self.rx_message_received = true;
                        self.modem = Some(ModemRole::V21Rx);
                        self.at.transmit = false;
                        self.at.dte_is_waiting = true;
                        self.put_response(ResponseCode::Frh3);
                        self.put_response(ResponseCode::Connect);
                    } else {
                        self.modem = Some(ModemRole::SilenceTx);
                        self.set_rx_mode(DteRxMode::OffhookCommand);
                        self.rx_message_received = false;
                        self.put_response(ResponseCode::FcError);
                    }
                } else if !self.rx_message_received {
                    if self.at.dte_is_waiting {
                        // Report CONNECT as soon as possible to avoid a
                        // timeout at the DTE.
                        self.put_response(ResponseCode::Connect);
                        self.rx_message_received = true;
                    } else {
                        self.queue_response(&[ResponseCode::Connect as u8]);
                    }
                }
            }
            V21RxEvent::Abort => {}
        }
    }

    /// Deliver one received HDLC frame (body plus two FCS octets) to the
    /// DTE, directly or through the response queue.
    pub(crate) fn hdlc_accept_frame(&mut self, frame: &[u8], ok: bool) {
        if !self.rx_message_received {
            if self.at.dte_is_waiting {
                // Report CONNECT as soon as possible to avoid a timeout.
                self.put_response(ResponseCode::Connect);
                self.rx_message_received = true;
            } else {
                self.queue_response(&[ResponseCode::Connect as u8]);
            }
        }
        // While OK is pending, whatever else comes in is ignored.
        if !self.at.ok_is_pending {
            if self.at.dte_is_waiting {
                for &b in frame {
                    self.uplink_push_stuffed(b);
                }
                self.uplink_terminate();
                if ok && frame.len() >= 2 && frame[1] == 0x13 {
                    // This is the last frame. OK is not sent until the
                    // carrier drops, to avoid redetecting the carrier later.
                    self.at.ok_is_pending = true;
                } else {
                    self.put_response(if ok {
                        ResponseCode::Ok
                    } else {
                        ResponseCode::Error
                    });
                    self.at.dte_is_waiting = false;
                    self.rx_message_received = false;
                }
            } else {
                // Park it for the next AT+FRH=3.
                let mut msg = [0u8; RESPONSE_MSG_MAX];
                msg[0] = if ok {
                    ResponseCode::Ok as u8
                } else {
                    ResponseCode::Error as u8
                };
                let len = frame.len().min(RESPONSE_MSG_MAX - 1);
                msg[1..1 + len].copy_from_slice(&frame[..len]);
                self.queue_response(&msg[..1 + len]);
            }
        }
        self.set_rx_mode(DteRxMode::OffhookCommand);
    }

    /// Park a response message, logging if the queue refuses it.
    pub(crate) fn queue_response(&mut self, msg: &[u8]) {
        if !self.rx_queue.write(msg) {
            #[cfg(feature = "defmt")]
            defmt::warn!("response queue full, dropping {} bytes", msg.len());
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
