//! The AT Class 1 command dispatcher.
//!
//! The external AT interpreter parses +FTS/+FRS, +FTH/+FRH and +FTM/+FRM
//! and hands the decoded operation here. The numeric carrier codes map to
//! (modulation, bit rate, short train) per the T.31 table.

use super::error::{ConfigError, Result};
use super::t31::T31Modem;
use super::T31Host;
use crate::dte::{DteRxMode, ResponseCode};
use crate::internal::constants::RESPONSE_MSG_MAX;
use crate::modem::{FastModem, ModemBank, ModemRole};

/// Which way a Class 1 command points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Class1Direction {
    /// +FRS / +FRH / +FRM: receive
    Receive,
    /// +FTS / +FTH / +FTM: transmit
    Transmit,
}

/// The operation family of a Class 1 command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Class1Operation {
    /// +FTS / +FRS: send or await silence, in 10 ms units
    Silence,
    /// +FTH / +FRH: HDLC at the given rate (only 3, V.21 ch 2, exists)
    Hdlc,
    /// +FTM / +FRM: a numeric carrier code from the T.31 table
    Modulation,
}

/// Decode a numeric carrier code into (modulation, bit rate, short train).
const fn carrier_code(val: u16) -> Option<(FastModem, u16, bool)> {
    match val {
        24 => Some((FastModem::V27ter, 2400, false)),
        48 => Some((FastModem::V27ter, 4800, false)),
        72 => Some((FastModem::V29, 7200, false)),
        96 => Some((FastModem::V29, 9600, false)),
        73 => Some((FastModem::V17, 7200, false)),
        74 => Some((FastModem::V17, 7200, true)),
        97 => Some((FastModem::V17, 9600, false)),
        98 => Some((FastModem::V17, 9600, true)),
        121 => Some((FastModem::V17, 12000, false)),
        122 => Some((FastModem::V17, 12000, true)),
        145 => Some((FastModem::V17, 14400, false)),
        146 => Some((FastModem::V17, 14400, true)),
        _ => None,
    }
}

impl<B: ModemBank, H: T31Host> T31Modem<B, H> {
    /// Execute a decoded Class 1 command.
    ///
    /// Returns `Ok(true)` when the AT interpreter should issue its own
    /// immediate result code, `Ok(false)` when the response will come later
    /// from the transmit or receive pipeline.
    ///
    /// # Errors
    /// - `UnsupportedClass1Code` - a carrier code outside the T.31 table
    /// - `UnsupportedHdlcRate` - an HDLC rate other than 3
    pub fn process_class1_cmd(
        &mut self,
        direction: Class1Direction,
        operation: Class1Operation,
        val: u16,
    ) -> Result<bool> {
        let transmit = direction == Class1Direction::Transmit;
        match operation {
            Class1Operation::Silence => {
                #[cfg(feature = "defmt")]
                defmt::debug!("silence {} ms", val * 10);
                self.core.at.transmit = transmit;
                if transmit {
                    // Send a specified period of silence, to space
                    // transmissions.
                    self.restart_modem(ModemRole::SilenceTx);
                    self.bank.silence_set(u32::from(val) * 80);
                    self.core.at.transmit = true;
                } else {
                    // Wait until the specified period of silence has been
                    // received.
                    self.core.rx_queue.clear();
                    self.core.silence_awaited = u32::from(val) * 80;
                    self.core.set_rx_mode(DteRxMode::Delivery);
                    self.restart_modem(ModemRole::SilenceRx);
                }
                Ok(false)
            }
            Class1Operation::Hdlc => {
                if val != 3 {
                    return Err(ConfigError::UnsupportedHdlcRate.into());
                }
                let new_modem = if transmit {
                    ModemRole::V21Tx
                } else {
                    ModemRole::V21Rx
                };
                self.core.short_train = false;
                self.core.bit_rate = 300;
                if self.core.modem != Some(new_modem) {
                    self.restart_modem(new_modem);
                }
                self.core.at.transmit = transmit;
                if transmit {
                    self.core.set_rx_mode(DteRxMode::Hdlc);
                    self.core.put_response(ResponseCode::Connect);
                } else {
                    // Deliver straight away if something is already queued.
                    self.core.set_rx_mode(DteRxMode::Delivery);
                    self.core.rx_message_received = false;
                    self.drain_response_queue();
                }
                Ok(false)
            }
            Class1Operation::Modulation => {
                let Some((fm, bit_rate, short_train)) = carrier_code(val) else {
                    return Err(ConfigError::UnsupportedClass1Code.into());
                };
                #[cfg(feature = "defmt")]
                defmt::debug!("short train {}, bit rate {}", short_train, bit_rate);
                let new_modem = match (fm, transmit) {
                    (FastModem::V27ter, true) => ModemRole::V27terTx,
                    (FastModem::V27ter, false) => ModemRole::V27terRx,
                    (FastModem::V29, true) => ModemRole::V29Tx,
                    (FastModem::V29, false) => ModemRole::V29Rx,
                    (FastModem::V17, true) => ModemRole::V17Tx,
                    (FastModem::V17, false) => ModemRole::V17Rx,
                };
                self.core.short_train = short_train;
                self.core.bit_rate = bit_rate;
                if transmit {
                    self.core.set_rx_mode(DteRxMode::Stuffed);
                    self.core.put_response(ResponseCode::Connect);
                } else {
                    self.core.set_rx_mode(DteRxMode::Delivery);
                }
                self.restart_modem(new_modem);
                Ok(false)
            }
        }
    }

    /// Drain queued response frames to a DTE that just entered delivery
    /// mode, stopping after the first non-CONNECT code. If nothing is
    /// queued, the DTE is left waiting for the next event.
    fn drain_response_queue(&mut self) {
        let mut msg = [0u8; RESPONSE_MSG_MAX];
        loop {
            let Some(len) = self.core.rx_queue.read(&mut msg) else {
                self.core.at.dte_is_waiting = true;
                break;
            };
            if len == 0 {
                break;
            }
            let code = ResponseCode::from_u8(msg[0]);
            if len > 1 {
                // A queued frame: re-announce the carrier, then the body.
                if code == Some(ResponseCode::Ok) {
                    self.core.put_response(ResponseCode::Connect);
                }
                for &b in &msg[1..len] {
                    self.core.uplink_push_stuffed(b);
                }
                self.core.uplink_terminate();
            }
            let Some(code) = code else {
                break;
            };
            self.core.put_response(code);
            if code != ResponseCode::Connect {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::driver::error::Error;
    use crate::test_utils::analog_engine;

    #[test]
    fn carrier_code_table_is_complete() {
        assert_eq!(carrier_code(24), Some((FastModem::V27ter, 2400, false)));
        assert_eq!(carrier_code(48), Some((FastModem::V27ter, 4800, false)));
        assert_eq!(carrier_code(72), Some((FastModem::V29, 7200, false)));
        assert_eq!(carrier_code(96), Some((FastModem::V29, 9600, false)));
        assert_eq!(carrier_code(73), Some((FastModem::V17, 7200, false)));
        assert_eq!(carrier_code(74), Some((FastModem::V17, 7200, true)));
        assert_eq!(carrier_code(97), Some((FastModem::V17, 9600, false)));
        assert_eq!(carrier_code(98), Some((FastModem::V17, 9600, true)));
        assert_eq!(carrier_code(121), Some((FastModem::V17, 12000, false)));
        assert_eq!(carrier_code(122), Some((FastModem::V17, 12000, true)));
        assert_eq!(carrier_code(145), Some((FastModem::V17, 14400, false)));
        assert_eq!(carrier_code(146), Some((FastModem::V17, 14400, true)));
        assert_eq!(carrier_code(99), None);
        assert_eq!(carrier_code(0), None);
    }

    #[test]
    fn unknown_code_is_an_error() {
        let mut engine = analog_engine();
        let err = engine
            .process_class1_cmd(Class1Direction::Transmit, Class1Operation::Modulation, 99)
            .unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::UnsupportedClass1Code));
        let err = engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 4)
            .unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::UnsupportedHdlcRate));
    }

    #[test]
    fn transmit_modulation_selects_modem_and_connects() {
        let mut engine = analog_engine();
        let immediate = engine
            .process_class1_cmd(Class1Direction::Transmit, Class1Operation::Modulation, 146)
            .unwrap();
        assert!(!immediate);
        assert_eq!(engine.modem(), Some(ModemRole::V17Tx));
        assert_eq!(engine.bit_rate(), 14400);
        assert!(engine.short_train());
        assert_eq!(engine.dte_rx_mode(), DteRxMode::Stuffed);
        assert_eq!(engine.host().responses(), ["CONNECT"]);
    }

    #[test]
    fn receive_modulation_enters_delivery_without_response() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Modulation, 24)
            .unwrap();
        assert_eq!(engine.modem(), Some(ModemRole::V27terRx));
        assert_eq!(engine.bit_rate(), 2400);
        assert_eq!(engine.dte_rx_mode(), DteRxMode::Delivery);
        assert!(engine.host().responses().is_empty());
    }

    #[test]
    fn transmit_silence_programs_the_generator() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Transmit, Class1Operation::Silence, 50)
            .unwrap();
        assert_eq!(engine.modem(), Some(ModemRole::SilenceTx));
        // 50 x 10 ms at 8 kHz.
        assert_eq!(engine.bank().silence_programmed, 4000);
        assert!(engine.core.at.transmit);
    }

    #[test]
    fn receive_silence_waits_in_delivery_mode() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Silence, 10)
            .unwrap();
        assert_eq!(engine.modem(), Some(ModemRole::SilenceRx));
        assert_eq!(engine.dte_rx_mode(), DteRxMode::Delivery);
        assert_eq!(engine.core.silence_awaited, 800);
    }

    #[test]
    fn hdlc_receive_with_empty_queue_leaves_dte_waiting() {
        let mut engine = analog_engine();
        engine
            .process_class1_cmd(Class1Direction::Receive, Class1Operation::Hdlc, 3)
            .unwrap();
        assert_eq!(engine.modem(), Some(ModemRole::V21Rx));
        assert_eq!(engine.dte_rx_mode(), DteRxMode::Delivery);
        assert!(engine.core.at.dte_is_waiting);
    }
}
