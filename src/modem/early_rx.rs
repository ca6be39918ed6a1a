//! Adaptive early reception.
//!
//! When a fast carrier is expected, the far end may nevertheless come back
//! with V.21 HDLC (a repeated DIS, say). Until one of them proves itself,
//! every received block is fed to both the fast demodulator and V.21; the
//! first to train or deliver wins and the loser is dropped.

use crate::driver::t31::T31Modem;
use crate::driver::T31Host;
use crate::modem::{FastModem, ModemBank, RxHandler};

impl<B: ModemBank, H: T31Host> T31Modem<B, H> {
    /// Run the fast demodulator and V.21 in parallel over one block.
    pub(crate) fn early_fast_rx(&mut self, fm: FastModem, amp: &[i16]) {
        let Self { bank, core } = self;
        bank.fast_rx(fm, amp, &mut |ev| core.non_ecm_put_bit(ev));
        if core.at.rx_trained {
            // The fast modem has trained, so the slow one no longer needs
            // to run in parallel.
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "early rx: {} trained ({=f32} dBm0), dropping V.21",
                fm,
                bank.fast_rx_signal_power(fm)
            );
            core.rx_handler = RxHandler::Fast(fm);
        } else {
            bank.v21_rx(amp, &mut |ev| core.v21_rx_event(ev));
            if core.rx_message_received {
                // Something valid arrived and the fast modem has not
                // trained. This must be V.21.
                #[cfg(feature = "defmt")]
                defmt::debug!("early rx: {} untrained, dropping to V.21", fm);
                core.rx_handler = RxHandler::V21;
            }
        }
    }
}
