//! T.38 receive handling: indicators, data fields and gap reports.
//!
//! The receive side is tolerant by design. Far ends repeat indicators,
//! send empty frame-boundary fields, restart HDLC without an indicator,
//! and occasionally confuse the HDLC and non-ECM signal-end fields; all of
//! that is absorbed here and only meaningful transitions reach the DTE.

use crate::driver::error::{ProtocolError, Result};
use crate::driver::t31::{Core, T31Modem};
use crate::driver::T31Host;
use crate::internal::bitrev::bit_reverse;
use crate::internal::constants::{
    HDLC_RX_BODY_MAX, HDLC_RX_BUF_LEN, MID_RX_TIMEOUT_MS, ms_to_samples,
};
use crate::internal::crc::append_fcs;
use crate::modem::{FastRxEvent, ModemBank, ModemRole, V21RxEvent};
use crate::t38::types::{DataType, FieldType, Indicator};

impl<B: ModemBank, H: T31Host> T31Modem<B, H> {
    /// A T.38 indicator arrived from the far end.
    ///
    /// # Errors
    /// - `T38Disabled` - the engine runs the analog path
    pub fn t38_rx_indicator(&mut self, indicator: Indicator) -> Result<()> {
        if !self.core.t38_mode {
            return Err(ProtocolError::T38Disabled.into());
        }
        self.core.process_rx_indicator(indicator);
        Ok(())
    }

    /// A T.38 data field arrived from the far end.
    ///
    /// # Errors
    /// - `T38Disabled` - the engine runs the analog path
    pub fn t38_rx_data(
        &mut self,
        data_type: DataType,
        field_type: FieldType,
        buf: &[u8],
    ) -> Result<()> {
        if !self.core.t38_mode {
            return Err(ProtocolError::T38Disabled.into());
        }
        self.core.process_rx_data(data_type, field_type, buf);
        Ok(())
    }

    /// The wire codec detected missing packets between `expected_seq_no`
    /// and `rx_seq_no`.
    ///
    /// # Errors
    /// - `T38Disabled` - the engine runs the analog path
    pub fn t38_rx_missing(&mut self, rx_seq_no: u16, expected_seq_no: u16) -> Result<()> {
        if !self.core.t38_mode {
            return Err(ProtocolError::T38Disabled.into());
        }
        #[cfg(feature = "defmt")]
        defmt::debug!("packets missing: expected {}, got {}", expected_seq_no, rx_seq_no);
        let _ = (rx_seq_no, expected_seq_no);
        self.core.missing_data = true;
        Ok(())
    }
}

impl<H: T31Host> Core<H> {
    pub(crate) fn process_rx_indicator(&mut self, indicator: Indicator) {
        if self.t38.current_rx_indicator == Some(indicator) {
            // Probably the far end repeating itself. Harmless; ignore it.
            return;
        }
        match indicator {
            Indicator::NoSignal => {
                if self.t38.current_rx_indicator == Some(Indicator::V21Preamble)
                    && matches!(self.modem, Some(ModemRole::V21Rx | ModemRole::CngTone))
                {
                    self.v21_rx_event(V21RxEvent::CarrierDown);
                }
                self.timeout_rx_samples = 0;
            }
            ind if ind.is_training() => {
                // Some implementations pop preamble indicators between HDLC
                // frames; arm the backstop rather than treating this as a
                // new session.
                self.timeout_rx_samples = self.samples + ms_to_samples(MID_RX_TIMEOUT_MS);
            }
            _ => {}
        }
        self.hdlc_rx_len = 0;
        self.missing_data = false;
        self.t38.current_rx_indicator = Some(indicator);
        self.t38.current_rx_data_type = None;
        self.t38.current_rx_field_type = None;
    }

    pub(crate) fn process_rx_data(&mut self, data_type: DataType, field_type: FieldType, buf: &[u8]) {
        match field_type {
            FieldType::HdlcData => {
                if self.timeout_rx_samples == 0 {
                    // HDLC can start without any signal indicator on some
                    // platforms, even with zero packet loss; accept a sudden
                    // start. Every real FAX HDLC message begins with 0xFF,
                    // so anything else means octets were missed first.
                    self.timeout_rx_samples = self.samples + ms_to_samples(MID_RX_TIMEOUT_MS);
                    if buf.first().copied() != Some(0xFF) {
                        self.missing_data = true;
                    }
                }
                if self.hdlc_rx_len + buf.len() <= HDLC_RX_BODY_MAX {
                    for (i, &b) in buf.iter().enumerate() {
                        self.hdlc_rx_buf[self.hdlc_rx_len + i] = bit_reverse(b);
                    }
                    self.hdlc_rx_len += buf.len();
                }
                self.timeout_rx_samples = self.samples + ms_to_samples(MID_RX_TIMEOUT_MS);
            }
            FieldType::HdlcFcsOk => {
                #[cfg(feature = "defmt")]
                if !buf.is_empty() {
                    defmt::warn!("data inside an HDLC FCS-OK field");
                }
                // Zero length frames are not delivered: some T.38
                // implementations send multiple FCS-OK fields for one frame.
                if self.modem == Some(ModemRole::V21Rx)
                    && self.hdlc_rx_len > 0
                    && !self.missing_data
                {
                    self.deliver_reassembled_frame(true);
                }
                self.hdlc_rx_len = 0;
                self.missing_data = false;
            }
            FieldType::HdlcFcsBad => {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "received frame with bad FCS ({})",
                    if self.missing_data { "missing octets" } else { "clean" }
                );
                self.hdlc_rx_len = 0;
                self.missing_data = false;
            }
            FieldType::HdlcFcsOkSigEnd => {
                if self.modem == Some(ModemRole::V21Rx) {
                    if self.hdlc_rx_len > 0 && !self.missing_data {
                        self.deliver_reassembled_frame(true);
                    }
                    self.v21_rx_event(V21RxEvent::CarrierDown);
                }
                self.hdlc_rx_len = 0;
                self.missing_data = false;
            }
            FieldType::HdlcFcsBadSigEnd | FieldType::HdlcSigEnd => {
                // Either the deferred end of a frame already reported with
                // FCS-OK, or the HDLC signal dropping unexpectedly.
                if self.modem == Some(ModemRole::V21Rx) {
                    self.v21_rx_event(V21RxEvent::CarrierDown);
                }
                self.hdlc_rx_len = 0;
                self.missing_data = false;
            }
            FieldType::T4NonEcmData => {
                if !self.rx_signal_present {
                    self.rx_signal_present = true;
                    self.non_ecm_put_bit(FastRxEvent::TrainingSucceeded);
                }
                for &b in buf {
                    self.uplink_put_data_byte(bit_reverse(b));
                }
                self.timeout_rx_samples = self.samples + ms_to_samples(MID_RX_TIMEOUT_MS);
            }
            FieldType::T4NonEcmSigEnd => {
                // Some implementations repeat their signal-end field in
                // packets with incrementing sequence numbers. Filter the
                // repeats here, in a context sensitive way.
                if self.t38.current_rx_data_type != Some(data_type)
                    || self.t38.current_rx_field_type != Some(field_type)
                {
                    if !buf.is_empty() {
                        if !self.rx_signal_present {
                            self.rx_signal_present = true;
                            self.non_ecm_put_bit(FastRxEvent::TrainingSucceeded);
                        }
                        for &b in buf {
                            self.uplink_put_data_byte(bit_reverse(b));
                        }
                    }
                    // Some boxes send HDLC signal-end where they mean
                    // non-ECM signal-end (and possibly the opposite), so
                    // report the generic completion rather than a carrier-
                    // specific one.
                    self.non_ecm_put_bit(FastRxEvent::CarrierDown);
                }
                self.rx_signal_present = false;
                self.timeout_rx_samples = 0;
            }
            FieldType::CmMessage
            | FieldType::JmMessage
            | FieldType::CiMessage
            | FieldType::V34Rate => {}
        }
        self.t38.current_rx_data_type = Some(data_type);
        self.t38.current_rx_field_type = Some(field_type);
    }

    /// Close out a stalled or completed reception, whatever kind it was.
    pub(crate) fn rx_burst_complete(&mut self) {
        if matches!(
            self.modem,
            Some(ModemRole::V21Rx | ModemRole::CngTone | ModemRole::NocngTone)
        ) {
            self.v21_rx_event(V21RxEvent::CarrierDown);
        } else {
            self.non_ecm_put_bit(FastRxEvent::CarrierDown);
        }
        self.rx_signal_present = false;
    }

    /// Hand the reassembled frame up with freshly computed FCS octets.
    fn deliver_reassembled_frame(&mut self, ok: bool) {
        let len = self.hdlc_rx_len;
        let mut frame = [0u8; HDLC_RX_BUF_LEN];
        frame[..len].copy_from_slice(&self.hdlc_rx_buf[..len]);
        append_fcs(&mut frame, len);
        self.hdlc_accept_frame(&frame[..len + 2], ok);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::dte::{DLE, ETX};
    use crate::internal::crc::crc_itu16;
    use crate::test_utils::{analog_engine, t38_engine};
    use crate::{Class1Direction, Class1Operation, DteRxMode, ModemRole};

    fn on_the_wire(frame: &[u8]) -> Vec<u8> {
        frame.iter().map(|b| b.reverse_bits()).collect()
    }

    #[test]
    fn analog_engine_rejects_t38_input() {
        let mut engine = analog_engine();
        assert!(engine.t38_rx_indicator(Indicator::Cng).is_err());
        assert!(engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &[0xFF])
            .is_err());
        assert!(engine.t38_rx_missing(4, 2).is_err());
    }

    #[test]
    fn hdlc_frame_reassembles_and_reaches_the_dte() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        assert!(engine.core.at.dte_is_waiting);

        engine.t38_rx_indicator(Indicator::V21Preamble).unwrap();
        assert_ne!(engine.core.timeout_rx_samples, 0);

        // A non-final frame, split across two data fields.
        let body = [0xFF, 0x03, 0x42, 0x99];
        let wire = on_the_wire(&body);
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &wire[..2])
            .unwrap();
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &wire[2..])
            .unwrap();
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcFcsOk, &[])
            .unwrap();

        // CONNECT, then body plus computed FCS, DLE ETX, and OK.
        assert_eq!(engine.host().responses(), ["CONNECT", "OK"]);
        let fcs = crc_itu16(&body);
        let mut delivered = body.to_vec();
        delivered.push((fcs & 0xFF) as u8);
        delivered.push((fcs >> 8) as u8);
        let mut expected = crate::test_utils::stuff(&delivered);
        expected.extend_from_slice(&[DLE, ETX]);
        assert_eq!(engine.host().data_bytes(), expected);
        assert_eq!(engine.dte_rx_mode(), DteRxMode::OffhookCommand);
    }

    #[test]
    fn final_frame_defers_ok_until_carrier_drop() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V21Preamble).unwrap();

        // A final frame (control octet 0x13).
        let wire = on_the_wire(&[0xFF, 0x13, 0x00]);
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &wire)
            .unwrap();
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcFcsOk, &[])
            .unwrap();
        // The frame went up but OK is held back.
        assert_eq!(engine.host().responses(), ["CONNECT"]);
        assert!(engine.core.at.ok_is_pending);

        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcSigEnd, &[])
            .unwrap();
        assert_eq!(engine.host().responses(), ["CONNECT", "OK"]);
    }

    #[test]
    fn fcs_ok_and_sig_end_in_one_field() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V21Preamble).unwrap();
        let wire = on_the_wire(&[0xFF, 0x13, 0x00]);
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &wire)
            .unwrap();
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcFcsOkSigEnd, &[])
            .unwrap();
        // Delivery and the held-back OK in one step.
        assert_eq!(engine.host().responses(), ["CONNECT", "OK"]);
        assert_eq!(engine.core.hdlc_rx_len, 0);
    }

    #[test]
    fn bad_fcs_drops_the_frame_silently() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V21Preamble).unwrap();
        let wire = on_the_wire(&[0xFF, 0x03, 0x42]);
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &wire)
            .unwrap();
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcFcsBad, &[])
            .unwrap();
        assert!(engine.host().responses().is_empty());
        assert!(engine.host().data_bytes().is_empty());
        assert_eq!(engine.core.hdlc_rx_len, 0);
    }

    #[test]
    fn repeated_indicator_is_ignored() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V29Training9600).unwrap();
        let armed = engine.core.timeout_rx_samples;
        engine.t38_send_timeout(800);
        engine.t38_rx_indicator(Indicator::V29Training9600).unwrap();
        // The repeat neither re-armed the timeout nor cleared state.
        assert_eq!(engine.core.timeout_rx_samples, armed);
    }

    #[test]
    fn hdlc_without_leading_ff_marks_missing_octets() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        // No indicator first, and the first octet is not 0xFF: a frame
        // that lost its head. It must not be delivered as good.
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &[0x00, 0x11])
            .unwrap();
        assert!(engine.core.missing_data);
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcFcsOk, &[])
            .unwrap();
        assert!(engine.host().data_bytes().is_empty());
        // The carrier report still goes out once the signal ends.
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcSigEnd, &[])
            .unwrap();
        assert!(engine.host().responses().is_empty());
    }

    #[test]
    fn oversize_reassembly_is_not_appended() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V21Preamble).unwrap();
        let chunk = [0xFFu8; 100];
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &chunk)
            .unwrap();
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &chunk)
            .unwrap();
        assert_eq!(engine.core.hdlc_rx_len, 200);
        // A third chunk would exceed the frame cap and is dropped whole.
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &chunk)
            .unwrap();
        assert_eq!(engine.core.hdlc_rx_len, 200);
    }

    #[test]
    fn non_ecm_stream_reaches_the_dte() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Modulation, 96)
            .unwrap();
        assert_eq!(engine.modem(), Some(ModemRole::V29Rx));

        engine.t38_rx_indicator(Indicator::V29Training9600).unwrap();
        engine
            .t38_rx_data(DataType::V29At9600, FieldType::T4NonEcmData, &[0x80, 0x80])
            .unwrap();
        // First data reports training succeeded.
        assert_eq!(engine.host().responses(), ["CONNECT"]);

        engine
            .t38_rx_data(DataType::V29At9600, FieldType::T4NonEcmSigEnd, &[])
            .unwrap();
        assert_eq!(engine.host().responses(), ["CONNECT", "NO CARRIER"]);
        // Bit-reversed data, then the stream terminator.
        assert_eq!(engine.host().data_bytes(), [0x01, 0x01, DLE, ETX]);
        assert_eq!(engine.dte_rx_mode(), DteRxMode::OffhookCommand);
    }

    #[test]
    fn repeated_non_ecm_sig_end_is_filtered() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Modulation, 96)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V29Training9600).unwrap();
        engine
            .t38_rx_data(DataType::V29At9600, FieldType::T4NonEcmData, &[0x80])
            .unwrap();
        engine
            .t38_rx_data(DataType::V29At9600, FieldType::T4NonEcmSigEnd, &[])
            .unwrap();
        let after_first = engine.host().chunks.len();
        engine
            .t38_rx_data(DataType::V29At9600, FieldType::T4NonEcmSigEnd, &[])
            .unwrap();
        assert_eq!(engine.host().chunks.len(), after_first);
    }

    #[test]
    fn mid_burst_timeout_reports_completion() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Modulation, 96)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V29Training9600).unwrap();
        engine
            .t38_rx_data(DataType::V29At9600, FieldType::T4NonEcmData, &[0x80])
            .unwrap();
        assert_ne!(engine.core.timeout_rx_samples, 0);

        // Fifteen seconds pass without another packet.
        for _ in 0..130 {
            engine.t38_send_timeout(1000);
        }
        assert_eq!(engine.core.timeout_rx_samples, 0);
        assert_eq!(engine.host().responses(), ["CONNECT", "NO CARRIER"]);
        assert!(engine.host().data_bytes().ends_with(&[DLE, ETX]));
    }

    #[test]
    fn missing_packets_poison_the_next_frame() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V21Preamble).unwrap();
        let wire = on_the_wire(&[0xFF, 0x03, 0x42]);
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &wire)
            .unwrap();
        engine.t38_rx_missing(7, 5).unwrap();
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcFcsOk, &[])
            .unwrap();
        // With octets known missing, a "good" FCS means nothing.
        assert!(engine.host().data_bytes().is_empty());
        assert!(!engine.core.missing_data);
    }

    #[test]
    fn no_signal_after_preamble_reports_carrier_down() {
        let mut engine = t38_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        engine.t38_rx_indicator(Indicator::V21Preamble).unwrap();
        // A final frame leaves OK held back until the carrier drops.
        let wire = on_the_wire(&[0xFF, 0x13, 0x00]);
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcData, &wire)
            .unwrap();
        engine
            .t38_rx_data(DataType::V21, FieldType::HdlcFcsOk, &[])
            .unwrap();
        assert!(engine.core.at.ok_is_pending);
        // The carrier drop arrives as a no-signal indicator rather than an
        // HDLC signal-end field.
        engine.t38_rx_indicator(Indicator::NoSignal).unwrap();
        assert_eq!(engine.host().responses(), ["CONNECT", "OK"]);
        assert_eq!(engine.core.timeout_rx_samples, 0);
    }
}
