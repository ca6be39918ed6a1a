//! DTE byte-stream framers.
//!
//! Both data modes of the Class 1 serial protocol escape payload with DLE:
//! a doubled DLE is one literal DLE, DLE ETX ends the frame or stream, and
//! (HDLC mode only) DLE SUB stands for two literal DLE bytes. The one-byte
//! lookahead state survives across calls, since the DTE is free to split a
//! sequence anywhere.

use crate::driver::t31::{Core, T31Modem};
use crate::driver::{ModemControl, T31Host};
use crate::dte::{DteRxMode, DLE, ETX, SUB};
use crate::internal::constants::{HDLC_TX_BUF_LEN, TX_BUF_HIGH_WATER, TX_BUF_LEN};
use crate::modem::ModemBank;

impl<H: T31Host> Core<H> {
    /// Unstuff non-ECM image data into the transmit buffer.
    ///
    /// DLE ETX marks the end of the stream and returns the DTE to command
    /// mode. When the buffer fills, further bytes are dropped rather than
    /// ever blocking the DTE path; CTS back-pressure keeps a well-behaved
    /// DTE from getting there.
    pub(crate) fn dle_unstuff(&mut self, stuffed: &[u8]) {
        for &b in stuffed {
            if self.dled {
                self.dled = false;
                if b == ETX {
                    self.data_final = true;
                    self.set_rx_mode(DteRxMode::OffhookCommand);
                    return;
                }
            } else if b == DLE {
                self.dled = true;
                continue;
            }
            if self.tx_in_bytes >= TX_BUF_LEN {
                // No room for new data. Give up and lose it.
                #[cfg(feature = "defmt")]
                defmt::warn!("transmit buffer full, dropping DTE data");
                return;
            }
            self.tx_data[self.tx_in_bytes] = b;
            self.tx_in_bytes += 1;
        }
        if !self.tx_holding && self.tx_in_bytes > TX_BUF_LEN - TX_BUF_HIGH_WATER {
            // The buffer is approaching full; hold the DTE off.
            self.tx_holding = true;
            self.host.modem_control(ModemControl::Cts(false));
        }
    }

    /// Append one octet to the outbound HDLC frame, dropping on overflow.
    fn hdlc_collect(&mut self, b: u8) {
        if self.hdlc_tx_len >= HDLC_TX_BUF_LEN {
            #[cfg(feature = "defmt")]
            defmt::warn!("outbound HDLC frame too long, dropping an octet");
            return;
        }
        self.hdlc_tx_buf[self.hdlc_tx_len] = b;
        self.hdlc_tx_len += 1;
    }
}

impl<B: ModemBank, H: T31Host> T31Modem<B, H> {
    /// Unstuff HDLC frame bytes, handing each completed frame to the
    /// transmitter.
    ///
    /// The frame's control octet decides `hdlc_final`: bit 0x10 is the
    /// final-frame mark of T.30. On the analog path the frame goes straight
    /// to the V.21 framer; on the T.38 path it stays buffered for the timed
    /// sender.
    pub(crate) fn dle_unstuff_hdlc(&mut self, stuffed: &[u8]) {
        for &b in stuffed {
            if self.core.dled {
                self.core.dled = false;
                if b == ETX {
                    let len = self.core.hdlc_tx_len;
                    self.core.hdlc_final =
                        len >= 2 && (self.core.hdlc_tx_buf[1] & 0x10) != 0;
                    if self.core.t38_mode {
                        // Leave the frame queued for the timed sender.
                        self.core.hdlc_tx_ptr = 0;
                    } else {
                        self.bank.v21_tx_frame(&self.core.hdlc_tx_buf[..len]);
                        self.core.hdlc_tx_len = 0;
                    }
                } else if b == SUB {
                    self.core.hdlc_collect(DLE);
                    self.core.hdlc_collect(DLE);
                } else {
                    self.core.hdlc_collect(b);
                }
            } else if b == DLE {
                self.core.dled = true;
            } else {
                self.core.hdlc_collect(b);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use crate::dte::{DLE, ETX, SUB};
    use crate::test_utils::{analog_engine, stuff};
    use crate::{Class1Direction, Class1Operation, DteRxMode};

    /// Any byte stream survives stuffing and unstuffing untouched.
    #[test]
    fn dle_round_trip() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Transmit, Class1Operation::Modulation, 96)
            .unwrap();
        assert_eq!(engine.dte_rx_mode(), DteRxMode::Stuffed);

        let payload: Vec<u8> = (0u8..=255).chain([DLE, DLE, ETX, DLE]).collect();
        let mut wire = stuff(&payload);
        wire.extend_from_slice(&[DLE, ETX]);
        engine.at_rx(&wire);

        assert_eq!(engine.core.tx_in_bytes, payload.len());
        assert_eq!(&engine.core.tx_data[..payload.len()], &payload[..]);
        assert!(engine.core.data_final);
        assert_eq!(engine.dte_rx_mode(), DteRxMode::OffhookCommand);
    }

    #[test]
    fn unstuffing_survives_split_escapes() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Transmit, Class1Operation::Modulation, 96)
            .unwrap();

        // DLE DLE split across two deliveries is still one literal DLE.
        engine.at_rx(&[0x55, DLE]);
        engine.at_rx(&[DLE, 0xAA, DLE]);
        engine.at_rx(&[ETX]);

        assert_eq!(&engine.core.tx_data[..3], &[0x55, DLE, 0xAA]);
        assert!(engine.core.data_final);
    }

    #[test]
    fn hdlc_frame_collects_and_final_bit_sets() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Transmit, Class1Operation::Hdlc, 3)
            .unwrap();
        engine.host_mut().clear();

        // An MCF-style final frame: FF 13 8C.
        engine.at_rx(&[0xFF, 0x13, 0x8C, DLE, ETX]);
        assert!(engine.core.hdlc_final);
        assert_eq!(engine.bank().v21_frames.len(), 1);
        assert_eq!(engine.bank().v21_frames[0], [0xFF, 0x13, 0x8C]);
        assert_eq!(engine.core.hdlc_tx_len, 0);

        // A non-final frame: FF 03 ...
        engine.at_rx(&[0xFF, 0x03, 0x42, DLE, ETX]);
        assert!(!engine.core.hdlc_final);
        assert_eq!(engine.bank().v21_frames.len(), 2);
    }

    #[test]
    fn hdlc_dle_sub_expands_to_two_dles() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Transmit, Class1Operation::Hdlc, 3)
            .unwrap();

        engine.at_rx(&[0xFF, 0x03, DLE, SUB, DLE, ETX]);
        assert_eq!(engine.bank().v21_frames[0], [0xFF, 0x03, DLE, DLE]);
    }

    #[test]
    fn stuffed_overflow_drops_without_blocking() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Transmit, Class1Operation::Modulation, 96)
            .unwrap();

        let chunk = [0u8; 4096];
        for _ in 0..5 {
            engine.at_rx(&chunk);
        }
        // The buffer capped out; nothing panicked, nothing grew past it.
        assert_eq!(engine.core.tx_in_bytes, crate::constants::TX_BUF_LEN);
        // CTS was deasserted on the way there.
        assert!(engine.core.tx_holding);
        assert!(engine
            .host()
            .controls
            .contains(&crate::ModemControl::Cts(false)));
    }
}
