//! Modem roles and the DSP capability boundary.
//!
//! The engine steers a bank of modulators and demodulators it does not
//! implement itself: V.21 FSK with its HDLC framer, the fast image-carrier
//! modems, tone generation and programmable silence. The [`ModemBank`]
//! trait is that boundary. Sample-feed methods report demodulator events
//! through a closure sink; sample-produce methods draw transmit bits
//! through a closure source, so the protocol core can react while the
//! bank is borrowed.

pub mod early_rx;
pub mod power;
pub(crate) mod pumps;

/// One of the fast image-carrier modulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FastModem {
    /// V.17, 7200 to 14400 bps
    V17,
    /// V.27ter, 2400 or 4800 bps
    V27ter,
    /// V.29, 7200 or 9600 bps
    V29,
}

/// The role the engine is currently playing on the line.
///
/// Exactly one role is active at a time; the engine is quiescent between
/// roles. Roles change only through the restart path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemRole {
    /// Push 200 ms of silence out to flush the last audio
    Flush,
    /// Transmit silence
    SilenceTx,
    /// Wait for a period of received silence
    SilenceRx,
    /// Send the 2100 Hz answer tone
    CedTone,
    /// Send the 1100 Hz calling tone while listening for V.21
    CngTone,
    /// Listen for V.21 without sending CNG
    NocngTone,
    /// Transmit V.21 HDLC
    V21Tx,
    /// Transmit V.17 image data
    V17Tx,
    /// Transmit V.27ter image data
    V27terTx,
    /// Transmit V.29 image data
    V29Tx,
    /// Receive V.21 HDLC
    V21Rx,
    /// Receive V.17 image data
    V17Rx,
    /// Receive V.27ter image data
    V27terRx,
    /// Receive V.29 image data
    V29Rx,
}

impl ModemRole {
    /// The fast modulation this role transmits with, if any.
    #[must_use]
    pub const fn fast_tx(self) -> Option<FastModem> {
        match self {
            ModemRole::V17Tx => Some(FastModem::V17),
            ModemRole::V27terTx => Some(FastModem::V27ter),
            ModemRole::V29Tx => Some(FastModem::V29),
            _ => None,
        }
    }

    /// The fast modulation this role receives with, if any.
    #[must_use]
    pub const fn fast_rx(self) -> Option<FastModem> {
        match self {
            ModemRole::V17Rx => Some(FastModem::V17),
            ModemRole::V27terRx => Some(FastModem::V27ter),
            ModemRole::V29Rx => Some(FastModem::V29),
            _ => None,
        }
    }
}

/// Which receive routine handles incoming sample blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum RxHandler {
    /// Discard samples
    Dummy,
    /// Watch for a requested period of silence
    Silence,
    /// V.21 reception while the CNG tone plays, with S7 supervision
    Cng,
    /// Plain V.21 reception
    V21,
    /// A fast modem and V.21 run in parallel until one wins
    Early(FastModem),
    /// The fast modem alone, after it trained
    Fast(FastModem),
}

/// Which transmit routine fills outgoing sample blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum TxHandler {
    /// The silence generator
    Silence,
    /// The tone generator
    Tone,
    /// V.21 HDLC transmission
    V21,
    /// Fast modem image transmission
    Fast(FastModem),
}

/// Tones the engine asks the bank to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ToneKind {
    /// 2100 Hz for 2600 ms with a 75 ms trailing pause
    Ced,
    /// 0.5 s of 1100 Hz followed by 3 s of silence, repeating
    Cng,
}

/// One transmit bit drawn from the protocol core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxBit {
    /// A data bit, 0 or 1
    Bit(u8),
    /// The DTE finished; the modem should run its shutdown sequence
    EndOfData,
}

/// Events from the V.21 receive path (FSK demodulator plus HDLC deframer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V21RxEvent<'a> {
    /// A deframed HDLC frame. `frame` carries the body followed by its two
    /// FCS octets; `ok` reports the FCS check.
    Frame {
        /// Frame body plus two trailing FCS octets
        frame: &'a [u8],
        /// FCS checked good
        ok: bool,
    },
    /// Valid preamble flag sequence seen
    FramingOk,
    /// Carrier detected
    CarrierUp,
    /// Carrier lost
    CarrierDown,
    /// An aborted frame; harmless
    Abort,
}

/// Events from a fast modem receive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FastRxEvent {
    /// One demodulated data bit
    Bit(u8),
    /// Training completed
    TrainingSucceeded,
    /// Training did not complete
    TrainingFailed,
    /// Carrier detected
    CarrierUp,
    /// Carrier lost
    CarrierDown,
}

/// Events from the V.21 transmit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum V21TxEvent {
    /// A queued frame finished and no successor is queued. Not reported
    /// while only preamble flags have played.
    Underflow,
}

/// The DSP bank the engine drives.
///
/// Implementations wrap real modulators and demodulators (or mocks in
/// tests). All methods are synchronous and bounded per sample block; the
/// engine calls them from its own entry points only.
///
/// Sample counts: `feed` style methods consume the whole block; `produce`
/// style methods return how many samples they wrote, and a short return
/// means the current signal has run dry.
pub trait ModemBank {
    // =========================================================================
    // V.21 receive path
    // =========================================================================

    /// Reset the V.21 demodulator and its HDLC deframer.
    fn v21_rx_restart(&mut self);

    /// Feed samples to the V.21 receive path, reporting events to `events`.
    fn v21_rx(&mut self, amp: &[i16], events: &mut dyn FnMut(V21RxEvent<'_>));

    // =========================================================================
    // V.21 transmit path
    // =========================================================================

    /// Reset the HDLC framer and FSK modulator, with `preamble_flags`
    /// leading flag octets. The spec wants 1 s +-15 % of preamble, so the
    /// minimum is 32 octets.
    fn v21_tx_restart(&mut self, preamble_flags: u8);

    /// Queue one HDLC frame body for transmission. The framer adds the FCS.
    fn v21_tx_frame(&mut self, frame: &[u8]);

    /// Queue the closing flag sequence; transmission runs dry afterwards.
    fn v21_tx_shutdown(&mut self);

    /// Produce V.21 transmit samples, reporting events to `events`.
    fn v21_tx(&mut self, amp: &mut [i16], events: &mut dyn FnMut(V21TxEvent)) -> usize;

    // =========================================================================
    // Fast modems
    // =========================================================================

    /// Restart a fast demodulator for the given rate and training mode.
    fn fast_rx_restart(&mut self, modem: FastModem, bit_rate: u16, short_train: bool);

    /// Feed samples to a fast demodulator, reporting events to `events`.
    fn fast_rx(&mut self, modem: FastModem, amp: &[i16], events: &mut dyn FnMut(FastRxEvent));

    /// Received signal power of a fast demodulator, in dBm0.
    fn fast_rx_signal_power(&self, modem: FastModem) -> f32;

    /// Restart a fast modulator for the given rate and training mode.
    fn fast_tx_restart(&mut self, modem: FastModem, bit_rate: u16, short_train: bool);

    /// Produce fast modem transmit samples, drawing bits from `bits`.
    fn fast_tx(
        &mut self,
        modem: FastModem,
        amp: &mut [i16],
        bits: &mut dyn FnMut() -> TxBit,
    ) -> usize;

    // =========================================================================
    // Tones and silence
    // =========================================================================

    /// Start a tone sequence.
    fn tone_start(&mut self, tone: ToneKind);

    /// Produce tone samples. CED runs dry after its trailing pause; CNG
    /// repeats indefinitely.
    fn tone_tx(&mut self, amp: &mut [i16]) -> usize;

    /// Program the silence generator for `samples` samples; 0 leaves
    /// nothing to send.
    fn silence_set(&mut self, samples: u32);

    /// Produce silence samples until the programmed period is spent.
    fn silence_tx(&mut self, amp: &mut [i16]) -> usize;
}
