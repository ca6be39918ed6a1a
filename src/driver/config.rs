//! Configuration types for the T.31 engine.

use crate::internal::constants::{
    DATA_END_TX_COUNT, DEFAULT_DTE_TIMEOUT_MS, DEFAULT_S7_WAIT_S, INDICATOR_TX_COUNT,
    MS_PER_TX_CHUNK, SILENCE_THRESHOLD_DBM0,
};

/// Which transport the engine speaks on the network side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalPath {
    /// Analog audio: samples flow through [`crate::ModemBank`]
    #[default]
    Analog,
    /// Packetized T.38: typed indicators and data fields flow through the host
    T38,
}

/// T.38 transmit pacing.
///
/// UDP transports need paced, repeated packets; TPKT over TCP streams
/// continuously with single copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum T38Pacing {
    /// Paced streaming mode, as used for UDP transports
    #[default]
    Paced,
    /// Continuous streaming mode, as used for TPKT over TCP transport
    Unpaced,
}

impl T38Pacing {
    /// Indicator packet repeat count for this pacing mode.
    #[must_use]
    pub const fn indicator_tx_count(self) -> u8 {
        match self {
            T38Pacing::Paced => INDICATOR_TX_COUNT,
            T38Pacing::Unpaced => 0,
        }
    }

    /// End-of-data packet repeat count for this pacing mode.
    #[must_use]
    pub const fn data_end_tx_count(self) -> u8 {
        match self {
            T38Pacing::Paced => DATA_END_TX_COUNT,
            T38Pacing::Unpaced => 1,
        }
    }

    /// Milliseconds of signal carried per data packet; 0 means unpaced.
    #[must_use]
    pub const fn ms_per_tx_chunk(self) -> u32 {
        match self {
            T38Pacing::Paced => MS_PER_TX_CHUNK,
            T38Pacing::Unpaced => 0,
        }
    }
}

/// Engine configuration.
///
/// Built with the `with_*` methods and passed to [`crate::T31Modem::new`].
///
/// # Example
/// ```ignore
/// let config = T31Config::new()
///     .with_signal_path(SignalPath::T38)
///     .with_tep(true)
///     .with_adaptive_receive(true);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct T31Config {
    /// Analog audio or packetized T.38
    pub signal_path: SignalPath,
    /// T.38 transmit pacing
    pub t38_pacing: T38Pacing,
    /// Merge the final HDLC data field and its FCS field into one packet
    pub t38_merge_fields: bool,
    /// Account for a terminal equipment period ahead of training
    pub use_tep: bool,
    /// Adaptive reception (+FAR): report +FRH:3 instead of +FCERROR when
    /// V.21 is detected while a fast carrier was expected
    pub adaptive_receive: bool,
    /// Zero-fill transmit blocks when there is nothing to send
    pub transmit_on_idle: bool,
    /// Received-silence threshold in dBm0
    pub silence_threshold_dbm0: i16,
    /// S7: seconds to wait for a carrier after calling
    pub s7_wait_s: u16,
    /// DTE inactivity timeout during HDLC/stuffed transmission, in ms
    pub dte_timeout_ms: u32,
}

impl T31Config {
    /// Create a configuration with protocol defaults.
    ///
    /// This is a const function suitable for static initialization.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            signal_path: SignalPath::Analog,
            t38_pacing: T38Pacing::Paced,
            t38_merge_fields: false,
            use_tep: false,
            adaptive_receive: false,
            transmit_on_idle: false,
            silence_threshold_dbm0: SILENCE_THRESHOLD_DBM0,
            s7_wait_s: DEFAULT_S7_WAIT_S,
            dte_timeout_ms: DEFAULT_DTE_TIMEOUT_MS,
        }
    }

    /// Select the analog or T.38 signal path.
    #[must_use]
    pub const fn with_signal_path(mut self, path: SignalPath) -> Self {
        self.signal_path = path;
        self
    }

    /// Select T.38 transmit pacing.
    #[must_use]
    pub const fn with_t38_pacing(mut self, pacing: T38Pacing) -> Self {
        self.t38_pacing = pacing;
        self
    }

    /// Merge final HDLC data and FCS fields into a single packet.
    #[must_use]
    pub const fn with_t38_merge_fields(mut self, merge: bool) -> Self {
        self.t38_merge_fields = merge;
        self
    }

    /// Account for a terminal equipment period ahead of training.
    #[must_use]
    pub const fn with_tep(mut self, use_tep: bool) -> Self {
        self.use_tep = use_tep;
        self
    }

    /// Enable or disable adaptive reception (+FAR).
    #[must_use]
    pub const fn with_adaptive_receive(mut self, adaptive: bool) -> Self {
        self.adaptive_receive = adaptive;
        self
    }

    /// Zero-fill transmit blocks when idle.
    #[must_use]
    pub const fn with_transmit_on_idle(mut self, on: bool) -> Self {
        self.transmit_on_idle = on;
        self
    }

    /// Set the received-silence threshold in dBm0.
    #[must_use]
    pub const fn with_silence_threshold_dbm0(mut self, dbm0: i16) -> Self {
        self.silence_threshold_dbm0 = dbm0;
        self
    }

    /// Set S7, the wait-for-carrier time in seconds.
    #[must_use]
    pub const fn with_s7_wait(mut self, seconds: u16) -> Self {
        self.s7_wait_s = seconds;
        self
    }

    /// Set the DTE inactivity timeout in milliseconds.
    #[must_use]
    pub const fn with_dte_timeout_ms(mut self, ms: u32) -> Self {
        self.dte_timeout_ms = ms;
        self
    }
}

impl Default for T31Config {
    fn default() -> Self {
        Self::new()
    }
}
