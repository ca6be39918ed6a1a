//! The packetized signal path: typed T.38 emission and reception.
//!
//! In T.38 mode the modem bank is bypassed entirely. Outbound signals
//! become indicator and data packets handed to the host's wire codec,
//! paced by the timed sender in [`scheduler`]; inbound packets arrive
//! through the handlers in [`receive`].

pub(crate) mod receive;
pub(crate) mod scheduler;
pub mod types;

use crate::driver::t31::Core;
use crate::driver::T31Host;
use crate::internal::constants::{
    DATA_END_TX_COUNT, INDICATOR_TX_COUNT, MAX_OCTETS_PER_UNPACED_CHUNK, MS_PER_TX_CHUNK,
};
use types::{DataField, DataType, FieldType, Indicator};

pub(crate) use scheduler::TimedStep;

/// Link-level T.38 state: pacing parameters, the indicator and data type
/// tags currently on the wire in each direction, and duplicate filtering
/// for the receive side.
#[derive(Debug)]
pub(crate) struct T38Link {
    /// Indicator packet repeat count
    pub(crate) indicator_tx_count: u8,
    /// End-of-data packet repeat count
    pub(crate) data_end_tx_count: u8,
    /// Milliseconds of signal per data packet; 0 means unpaced
    pub(crate) ms_per_tx_chunk: u32,
    /// Octets per outbound data packet at the current bit rate
    pub(crate) octets_per_data_packet: usize,
    /// Merge the final HDLC data field with its FCS field
    pub(crate) merge_tx_fields: bool,
    /// Last indicator we sent
    pub(crate) current_tx_indicator: Option<Indicator>,
    /// Last indicator the far end sent
    pub(crate) current_rx_indicator: Option<Indicator>,
    /// Data type of the last received data packet
    pub(crate) current_rx_data_type: Option<DataType>,
    /// Field type of the last received data packet
    pub(crate) current_rx_field_type: Option<FieldType>,
    /// Data type tag for outbound data packets
    pub(crate) current_tx_data_type: DataType,
    /// Training indicator the timed sender announces next
    pub(crate) next_tx_indicator: Indicator,
    /// Zero padding still owed after the end of non-ECM image data
    pub(crate) trailer_bytes: i32,
}

impl T38Link {
    pub(crate) const fn new() -> Self {
        Self {
            indicator_tx_count: INDICATOR_TX_COUNT,
            data_end_tx_count: DATA_END_TX_COUNT,
            ms_per_tx_chunk: MS_PER_TX_CHUNK,
            octets_per_data_packet: MAX_OCTETS_PER_UNPACED_CHUNK,
            merge_tx_fields: false,
            current_tx_indicator: None,
            current_rx_indicator: None,
            current_rx_data_type: None,
            current_rx_field_type: None,
            current_tx_data_type: DataType::V21,
            next_tx_indicator: Indicator::NoSignal,
            trailer_bytes: 0,
        }
    }
}

// =============================================================================
// Emission helpers
// =============================================================================

impl<H: T31Host> Core<H> {
    /// Send an indicator and remember it as the one on the wire.
    pub(crate) fn t38_send_indicator(&mut self, indicator: Indicator) {
        let count = self.t38.indicator_tx_count;
        self.host.t38_indicator(indicator, count);
        self.t38.current_tx_indicator = Some(indicator);
    }

    /// Send a single-field data packet with the current data type tag.
    pub(crate) fn t38_send_data(&mut self, field_type: FieldType, data: &[u8], count: u8) {
        let field = [DataField { field_type, data }];
        self.host.t38_data(self.t38.current_tx_data_type, &field, count);
    }

    /// Send a multi-field data packet with the current data type tag.
    pub(crate) fn t38_send_fields(&mut self, fields: &[DataField<'_>], count: u8) {
        self.host.t38_data(self.t38.current_tx_data_type, fields, count);
    }

    /// Start a timed transmission sequence, due immediately.
    pub(crate) fn t38_start_timed(&mut self, step: TimedStep) {
        self.timed_step = step;
        self.next_tx_samples = self.samples;
    }

    /// Octets per data packet carrying `ms_per_tx_chunk` milliseconds of
    /// signal at `bit_rate`; the unpaced ceiling when pacing is off.
    pub(crate) fn chunk_octets(&self, bit_rate: u16) -> usize {
        if self.t38.ms_per_tx_chunk == 0 {
            MAX_OCTETS_PER_UNPACED_CHUNK
        } else {
            let octets = self.t38.ms_per_tx_chunk as usize * bit_rate as usize / 8000;
            octets.max(1)
        }
    }
}
