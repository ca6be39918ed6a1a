//! The timed T.38 sender.
//!
//! Outbound signals on the packetized path are paced against the sample
//! clock: each transmission sequence is a linear chain of steps, and every
//! step emits at most one indicator or data packet before setting the
//! deadline for the next. Training budgets come from the indicator table
//! in [`super::types`]; chunk pacing from the configured pacing mode.

use crate::driver::t31::T31Modem;
use crate::driver::T31Host;
use crate::dte::{DteRxMode, ResponseCode};
use crate::internal::constants::{DATA_TX_COUNT, TX_CHUNK_SCRATCH, ms_to_samples};
use crate::internal::bitrev::bit_reverse_in_place;
use crate::modem::ModemBank;
use crate::modem::ModemRole;
use crate::t38::types::{training_time, DataField, FieldType, Indicator};

/// Where a timed transmission sequence currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum TimedStep {
    /// Nothing scheduled
    #[default]
    Idle,
    /// Non-ECM: open with a no-signal gap
    NonEcmStart,
    /// Non-ECM: announce training
    NonEcmTrain,
    /// Non-ECM: stream image data chunks
    NonEcmData,
    /// Non-ECM: pad out with zeros after the image data ends
    NonEcmTrailer,
    /// Non-ECM: closing no-signal and completion report
    NonEcmShutdown,
    /// HDLC: announce the preamble
    HdlcStart,
    /// HDLC: stream frame chunks
    HdlcData,
    /// HDLC: frame boundary field
    HdlcFrameEnd,
    /// HDLC: closing no-signal and completion report
    HdlcShutdown,
    /// CED: leading 200 ms of silence
    CedSilence,
    /// CED: the tone indicator itself
    CedIndicator,
    /// CNG: leading 200 ms of silence
    CngSilence,
    /// CNG: the tone indicator itself
    CngIndicator,
    /// A fixed pause before the sequence completes
    Pause,
}

impl<B: ModemBank, H: T31Host> T31Modem<B, H> {
    /// Advance the T.38 sample clock by `samples` and run the timed sender.
    ///
    /// Call once per tick in T.38 mode, with however many 8 kHz samples the
    /// tick represents. Also supervises the mid-burst receive backstop.
    pub fn t38_send_timeout(&mut self, samples: usize) {
        self.core.samples += samples as u64;
        if self.core.timeout_rx_samples != 0 && self.core.samples > self.core.timeout_rx_samples {
            // Reception stalled in the middle of a burst; report the
            // reception complete rather than hanging forever.
            #[cfg(feature = "defmt")]
            defmt::warn!("timeout mid-receive");
            self.core.timeout_rx_samples = 0;
            self.core.rx_burst_complete();
        }
        if self.core.timed_step == TimedStep::Idle {
            return;
        }
        if self.core.samples < self.core.next_tx_samples {
            return;
        }
        // Time to send something.
        match self.core.timed_step {
            TimedStep::Idle => {}
            TimedStep::NonEcmStart => self.non_ecm_start(),
            TimedStep::NonEcmTrain => self.non_ecm_train(),
            TimedStep::NonEcmData => self.non_ecm_data(),
            TimedStep::NonEcmTrailer => self.non_ecm_trailer(),
            TimedStep::NonEcmShutdown => self.non_ecm_shutdown(),
            TimedStep::HdlcStart => self.hdlc_start(),
            TimedStep::HdlcData => self.hdlc_data(),
            TimedStep::HdlcFrameEnd => self.hdlc_frame_end(),
            TimedStep::HdlcShutdown => self.hdlc_shutdown(),
            TimedStep::CedSilence => {
                // Common practice opens with a no-signal indicator; the
                // 200 ms of silence itself is a specification requirement.
                self.core.timed_step = TimedStep::CedIndicator;
                self.core.next_tx_samples = self.core.samples + ms_to_samples(200);
                self.core.t38_send_indicator(Indicator::NoSignal);
            }
            TimedStep::CedIndicator => {
                self.core.next_tx_samples = self.core.samples + ms_to_samples(3000);
                self.core.timed_step = TimedStep::Pause;
                self.core.t38_send_indicator(Indicator::Ced);
            }
            TimedStep::CngSilence => {
                self.core.timed_step = TimedStep::CngIndicator;
                self.core.next_tx_samples = self.core.samples + ms_to_samples(200);
                self.core.t38_send_indicator(Indicator::NoSignal);
            }
            TimedStep::CngIndicator => {
                self.core.timed_step = TimedStep::Idle;
                self.core.t38_send_indicator(Indicator::Cng);
            }
            TimedStep::Pause => {
                // The answer tone has played out; continue straight into
                // V.21 HDLC transmission, mirroring the analog path.
                self.core.timed_step = TimedStep::Idle;
                self.core.modem = None;
                self.restart_modem(ModemRole::V21Tx);
                self.core.set_rx_mode(DteRxMode::Hdlc);
            }
        }
    }

    // =========================================================================
    // Non-ECM image transmission
    // =========================================================================

    fn non_ecm_start(&mut self) {
        // Create a 75 ms gap of no signal.
        if self.core.t38.current_tx_indicator != Some(Indicator::NoSignal) {
            self.core.t38_send_indicator(Indicator::NoSignal);
        }
        self.core.timed_step = TimedStep::NonEcmTrain;
        self.core.next_tx_samples += ms_to_samples(75);
    }

    fn non_ecm_train(&mut self) {
        // Switch on the fast modem and give the training time to complete.
        let ind = self.core.t38.next_tx_indicator;
        self.core.t38_send_indicator(ind);
        self.core.timed_step = TimedStep::NonEcmData;
        self.core.next_tx_samples +=
            ms_to_samples(training_time(ind, self.core.config.use_tep, false));
    }

    fn non_ecm_data(&mut self) {
        let opdp = self.core.t38.octets_per_data_packet;
        let mut buf = [0u8; TX_CHUNK_SCRATCH];
        let (len, ended) = self.core.non_ecm_get_chunk(&mut buf[..opdp]);
        bit_reverse_in_place(&mut buf[..len]);
        let mut send_len = len;
        if ended {
            // The end of the image data: pad this chunk out and schedule
            // the zero trailer.
            buf[len..opdp].fill(0);
            self.core.t38.trailer_bytes = (3 * opdp + len) as i32;
            send_len = opdp;
            self.core.timed_step = TimedStep::NonEcmTrailer;
        }
        self.core
            .t38_send_data(FieldType::T4NonEcmData, &buf[..send_len], DATA_TX_COUNT);
        self.core.next_tx_samples += ms_to_samples(self.core.t38.ms_per_tx_chunk);
    }

    fn non_ecm_trailer(&mut self) {
        // Pad the end of the data with zeros. Stopping abruptly at the end
        // of the EOLs makes some ATAs shut their modem down early and
        // corrupt the last rows of the image; delaying the no-signal alone
        // is often ignored.
        let opdp = self.core.t38.octets_per_data_packet;
        let buf = [0u8; TX_CHUNK_SCRATCH];
        self.core.t38.trailer_bytes -= opdp as i32;
        if self.core.t38.trailer_bytes <= 0 {
            let len = (opdp as i32 + self.core.t38.trailer_bytes).max(0) as usize;
            let count = self.core.t38.data_end_tx_count;
            self.core
                .t38_send_data(FieldType::T4NonEcmSigEnd, &buf[..len], count);
            self.core.timed_step = TimedStep::NonEcmShutdown;
            self.core.next_tx_samples += ms_to_samples(60);
            return;
        }
        self.core
            .t38_send_data(FieldType::T4NonEcmData, &buf[..opdp], DATA_TX_COUNT);
        self.core.next_tx_samples += ms_to_samples(self.core.t38.ms_per_tx_chunk);
    }

    fn non_ecm_shutdown(&mut self) {
        // The signal-end field above already marks the end, but a trailing
        // no-signal indicator improves compatibility with quirky
        // implementations.
        self.core.t38_send_indicator(Indicator::NoSignal);
        self.core.timed_step = TimedStep::Idle;
        self.core.modem = None;
        self.core.at.transmit = false;
        self.core.put_response(ResponseCode::Ok);
        self.core.set_rx_mode(DteRxMode::OffhookCommand);
    }

    // =========================================================================
    // HDLC transmission
    // =========================================================================

    fn hdlc_start(&mut self) {
        // Send the preamble and let it play out.
        let ind = self.core.t38.next_tx_indicator;
        self.core.t38_send_indicator(ind);
        self.core.next_tx_samples +=
            ms_to_samples(training_time(ind, self.core.config.use_tep, true));
        self.core.timed_step = TimedStep::HdlcData;
    }

    fn hdlc_data(&mut self) {
        let chunk_ms = self.core.t38.ms_per_tx_chunk;
        if self.core.hdlc_tx_len == 0 {
            // The preamble is running but the DTE has not supplied a frame
            // yet; look again after a chunk interval.
            self.core.next_tx_samples += ms_to_samples(chunk_ms.max(1));
            return;
        }
        let opdp = self.core.t38.octets_per_data_packet;
        let remaining = self.core.hdlc_tx_len - self.core.hdlc_tx_ptr;
        let ptr = self.core.hdlc_tx_ptr;
        let mut buf = [0u8; TX_CHUNK_SCRATCH];
        if opdp >= remaining {
            // The last part of the HDLC frame.
            buf[..remaining].copy_from_slice(&self.core.hdlc_tx_buf[ptr..ptr + remaining]);
            if self.core.t38.merge_tx_fields {
                // Ship the final data and the frame boundary as one packet,
                // picking the terminator by whether this was the last frame.
                let final_frame = self.core.hdlc_final;
                let fields = [
                    DataField {
                        field_type: FieldType::HdlcData,
                        data: &buf[..remaining],
                    },
                    DataField {
                        field_type: if final_frame {
                            FieldType::HdlcFcsOkSigEnd
                        } else {
                            FieldType::HdlcFcsOk
                        },
                        data: &[],
                    },
                ];
                self.core.t38_send_fields(&fields, DATA_TX_COUNT);
                self.core.hdlc_tx_ptr = 0;
                self.core.hdlc_tx_len = 0;
                if final_frame {
                    self.core.hdlc_final = false;
                    self.core.timed_step = TimedStep::HdlcShutdown;
                    self.core.next_tx_samples += ms_to_samples(100);
                } else {
                    // Invite the next frame from the DTE.
                    self.core.put_response(ResponseCode::Connect);
                    self.core.next_tx_samples += ms_to_samples(chunk_ms);
                }
            } else {
                self.core
                    .t38_send_data(FieldType::HdlcData, &buf[..remaining], DATA_TX_COUNT);
                self.core.timed_step = TimedStep::HdlcFrameEnd;
                self.core.next_tx_samples += ms_to_samples(chunk_ms);
            }
            return;
        }
        buf[..opdp].copy_from_slice(&self.core.hdlc_tx_buf[ptr..ptr + opdp]);
        self.core
            .t38_send_data(FieldType::HdlcData, &buf[..opdp], DATA_TX_COUNT);
        self.core.hdlc_tx_ptr += opdp;
        self.core.next_tx_samples += ms_to_samples(chunk_ms);
    }

    fn hdlc_frame_end(&mut self) {
        let final_frame = self.core.hdlc_final;
        self.core.hdlc_tx_ptr = 0;
        self.core.hdlc_tx_len = 0;
        if final_frame {
            self.core.hdlc_final = false;
            let count = self.core.t38.data_end_tx_count;
            self.core
                .t38_send_data(FieldType::HdlcFcsOkSigEnd, &[], count);
            self.core.timed_step = TimedStep::HdlcShutdown;
            self.core.next_tx_samples += ms_to_samples(100);
            return;
        }
        self.core
            .t38_send_data(FieldType::HdlcFcsOk, &[], DATA_TX_COUNT);
        // Invite the next frame from the DTE.
        self.core.put_response(ResponseCode::Connect);
        self.core.timed_step = TimedStep::HdlcData;
        self.core.next_tx_samples += ms_to_samples(self.core.t38.ms_per_tx_chunk);
    }

    fn hdlc_shutdown(&mut self) {
        // Some boxes dislike an HDLC signal-end field here; a no-signal
        // indicator is always acceptable.
        self.core.t38_send_indicator(Indicator::NoSignal);
        self.core.hdlc_tx_len = 0;
        self.core.hdlc_tx_ptr = 0;
        self.core.timed_step = TimedStep::Idle;
        self.core.modem = None;
        self.core.at.transmit = false;
        self.core.put_response(ResponseCode::Ok);
        self.core.set_rx_mode(DteRxMode::OffhookCommand);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
