//! Shared protocol constants.
//!
//! All timing in this crate is expressed in counts of 8 kHz audio samples,
//! never wall clock. The caller's sample clock drives every deadline.

/// Audio sample rate the engine is clocked from, in Hz.
pub const SAMPLE_RATE: u32 = 8000;

/// Convert a duration in milliseconds to a sample count.
pub const fn ms_to_samples(ms: u32) -> u64 {
    (ms as u64) * (SAMPLE_RATE as u64) / 1000
}

// =============================================================================
// DTE side
// =============================================================================

/// Size of the non-ECM transmit buffer fed by the DTE.
pub const TX_BUF_LEN: usize = 16384;

/// When the transmit buffer fills beyond `TX_BUF_LEN - TX_BUF_HIGH_WATER`,
/// CTS is deasserted to hold the DTE off.
pub const TX_BUF_HIGH_WATER: usize = 1024;

/// Once this many octets have drained while holding, CTS is asserted again.
pub const TX_BUF_RELEASE: usize = 1024;

/// Outbound HDLC frame buffer. A T.30 frame body is at most 260 octets once
/// DLE SUB expansions are accounted for.
pub const HDLC_TX_BUF_LEN: usize = 266;

/// Longest HDLC frame body accepted during T.38 reassembly.
pub const HDLC_RX_BODY_MAX: usize = 254;

/// Reassembly buffer: body plus the two FCS octets appended at delivery.
pub const HDLC_RX_BUF_LEN: usize = HDLC_RX_BODY_MAX + 4;

/// Staging buffer for DLE-stuffed bytes on their way to the DTE.
pub const DTE_RX_BUF_LEN: usize = 256;

/// Flush the staging buffer to the DTE once it holds this many bytes.
pub const DTE_RX_FLUSH_AT: usize = 250;

/// Storage for queued response frames awaiting an AT+FRH=3.
pub const RESPONSE_QUEUE_LEN: usize = 4096;

/// Largest single queued response message: code byte plus frame plus FCS.
pub const RESPONSE_MSG_MAX: usize = 1 + HDLC_RX_BUF_LEN;

/// DTE inactivity timeout during HDLC or stuffed transmission, in ms.
pub const DEFAULT_DTE_TIMEOUT_MS: u32 = 5000;

// =============================================================================
// T.38 pacing
// =============================================================================

/// Settings suitable for paced transmission over a UDP transport.
pub const MS_PER_TX_CHUNK: u32 = 30;
/// Repeat count for indicator packets in paced mode.
pub const INDICATOR_TX_COUNT: u8 = 3;
/// Repeat count for ordinary data packets.
pub const DATA_TX_COUNT: u8 = 1;
/// Repeat count for end-of-data packets in paced mode.
pub const DATA_END_TX_COUNT: u8 = 3;

/// Settings suitable for unpaced transmission over a TCP transport.
pub const MAX_OCTETS_PER_UNPACED_CHUNK: usize = 300;

/// Backstop timeout if reception of packets stops in the middle of a burst.
pub const MID_RX_TIMEOUT_MS: u32 = 15000;

/// Scratch sizing for chunk assembly in the timed sender.
pub const TX_CHUNK_SCRATCH: usize = MAX_OCTETS_PER_UNPACED_CHUNK + 50;

// =============================================================================
// Line supervision
// =============================================================================

/// Default received-silence threshold in dBm0.
pub const SILENCE_THRESHOLD_DBM0: i16 = -36;

/// Longest silence period the DTE can ask for is AT+FRS=255, i.e. 255 x 10 ms.
pub const MAX_SILENCE_AWAIT_SAMPLES: u32 = ms_to_samples(255 * 10) as u32;

/// Default S7 wait-for-carrier time in seconds.
pub const DEFAULT_S7_WAIT_S: u16 = 60;
