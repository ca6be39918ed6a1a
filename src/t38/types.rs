//! T.38 wire vocabulary: indicators, data types and field types.
//!
//! These mirror the IFP packet taxonomy of ITU-T T.38. The engine never
//! encodes packets itself; it hands typed values to the host's wire codec
//! and receives typed values back.

use crate::modem::FastModem;

/// A T.38 indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    /// No signal on the line
    NoSignal,
    /// 1100 Hz calling tone
    Cng,
    /// 2100 Hz called-terminal tone
    Ced,
    /// V.21 channel 2 HDLC preamble flags
    V21Preamble,
    /// V.27ter training at 2400 bps
    V27terTraining2400,
    /// V.27ter training at 4800 bps
    V27terTraining4800,
    /// V.29 training at 7200 bps
    V29Training7200,
    /// V.29 training at 9600 bps
    V29Training9600,
    /// V.17 short training at 7200 bps
    V17ShortTraining7200,
    /// V.17 long training at 7200 bps
    V17LongTraining7200,
    /// V.17 short training at 9600 bps
    V17ShortTraining9600,
    /// V.17 long training at 9600 bps
    V17LongTraining9600,
    /// V.17 short training at 12000 bps
    V17ShortTraining12000,
    /// V.17 long training at 12000 bps
    V17LongTraining12000,
    /// V.17 short training at 14400 bps
    V17ShortTraining14400,
    /// V.17 long training at 14400 bps
    V17LongTraining14400,
    /// V.8 ANSam tone
    V8Ansam,
    /// V.8 signal
    V8Signal,
    /// V.34 control channel at 1200 bps
    V34CntlChannel1200,
    /// V.34 primary channel
    V34PriChannel,
    /// V.34 control channel retrain
    V34CcRetrain,
    /// V.33 training at 12000 bps
    V33Training12000,
    /// V.33 training at 14400 bps
    V33Training14400,
}

impl Indicator {
    /// Whether this indicator announces a training or preamble phase, so a
    /// mid-burst receive timeout should be armed while it is outstanding.
    #[must_use]
    pub const fn is_training(self) -> bool {
        matches!(
            self,
            Indicator::V21Preamble
                | Indicator::V27terTraining2400
                | Indicator::V27terTraining4800
                | Indicator::V29Training7200
                | Indicator::V29Training9600
                | Indicator::V17ShortTraining7200
                | Indicator::V17LongTraining7200
                | Indicator::V17ShortTraining9600
                | Indicator::V17LongTraining9600
                | Indicator::V17ShortTraining12000
                | Indicator::V17LongTraining12000
                | Indicator::V17ShortTraining14400
                | Indicator::V17LongTraining14400
                | Indicator::V33Training12000
                | Indicator::V33Training14400
        )
    }
}

/// A T.38 data type: the carrier a data field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataType {
    /// V.21 (300 bps) HDLC signalling
    V21,
    /// V.27ter at 2400 bps
    V27terAt2400,
    /// V.27ter at 4800 bps
    V27terAt4800,
    /// V.29 at 7200 bps
    V29At7200,
    /// V.29 at 9600 bps
    V29At9600,
    /// V.17 at 7200 bps
    V17At7200,
    /// V.17 at 9600 bps
    V17At9600,
    /// V.17 at 12000 bps
    V17At12000,
    /// V.17 at 14400 bps
    V17At14400,
    /// V.8 signalling
    V8,
    /// V.34 primary rate data
    V34PriRate,
    /// V.34 control channel at 1200 bps
    V34Cc1200,
    /// V.34 primary channel
    V34PriCh,
    /// V.33 at 12000 bps
    V33At12000,
    /// V.33 at 14400 bps
    V33At14400,
}

/// A T.38 data field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldType {
    /// A run of HDLC octets
    HdlcData,
    /// HDLC carrier dropped
    HdlcSigEnd,
    /// HDLC frame boundary, FCS checked good
    HdlcFcsOk,
    /// HDLC frame boundary, FCS checked bad
    HdlcFcsBad,
    /// Good frame boundary and carrier drop in one field
    HdlcFcsOkSigEnd,
    /// Bad frame boundary and carrier drop in one field
    HdlcFcsBadSigEnd,
    /// A run of T.4 non-ECM image octets
    T4NonEcmData,
    /// Non-ECM carrier dropped, possibly with trailing octets
    T4NonEcmSigEnd,
    /// V.8 CM message
    CmMessage,
    /// V.8 JM message
    JmMessage,
    /// V.8 CI message
    CiMessage,
    /// V.34 rate signal
    V34Rate,
}

/// One field of an outbound T.38 data packet.
///
/// Most packets carry a single field; the final chunk of an HDLC frame may
/// merge the data field and its FCS field into one packet.
#[derive(Debug, Clone, Copy)]
pub struct DataField<'a> {
    /// Field type
    pub field_type: FieldType,
    /// Field payload; empty for pure boundary fields
    pub data: &'a [u8],
}

// =============================================================================
// Carrier selection tables
// =============================================================================

/// The training indicator announcing `modem` at `bit_rate`.
///
/// Rates outside the modulation's table fall back to its top rate, the same
/// way a misprogrammed rate register would.
#[must_use]
pub const fn training_indicator(modem: FastModem, bit_rate: u16, short_train: bool) -> Indicator {
    match modem {
        FastModem::V27ter => match bit_rate {
            2400 => Indicator::V27terTraining2400,
            _ => Indicator::V27terTraining4800,
        },
        FastModem::V29 => match bit_rate {
            7200 => Indicator::V29Training7200,
            _ => Indicator::V29Training9600,
        },
        FastModem::V17 => match (bit_rate, short_train) {
            (7200, true) => Indicator::V17ShortTraining7200,
            (7200, false) => Indicator::V17LongTraining7200,
            (9600, true) => Indicator::V17ShortTraining9600,
            (9600, false) => Indicator::V17LongTraining9600,
            (12000, true) => Indicator::V17ShortTraining12000,
            (12000, false) => Indicator::V17LongTraining12000,
            (_, true) => Indicator::V17ShortTraining14400,
            (_, false) => Indicator::V17LongTraining14400,
        },
    }
}

/// The data type tag for image data from `modem` at `bit_rate`.
#[must_use]
pub const fn fast_data_type(modem: FastModem, bit_rate: u16) -> DataType {
    match modem {
        FastModem::V27ter => match bit_rate {
            2400 => DataType::V27terAt2400,
            _ => DataType::V27terAt4800,
        },
        FastModem::V29 => match bit_rate {
            7200 => DataType::V29At7200,
            _ => DataType::V29At9600,
        },
        FastModem::V17 => match bit_rate {
            7200 => DataType::V17At7200,
            9600 => DataType::V17At9600,
            12000 => DataType::V17At12000,
            _ => DataType::V17At14400,
        },
    }
}

/// Training budget in milliseconds for each indicator we announce.
///
/// Four columns: with and without TEP, with and without HDLC preamble flags.
/// The V.21 preamble is 1 s +-15 %; the fast modems preamble 200 ms +100 ms.
/// 850 ms ought to be enough for the V.21 column but upsets some ATAs.
#[must_use]
pub const fn training_time(ind: Indicator, use_tep: bool, with_flags: bool) -> u32 {
    let row: [u32; 4] = match ind {
        Indicator::V21Preamble => [0, 0, 1000, 1000],
        Indicator::V27terTraining2400 => [943, 1158, 1143, 1158],
        Indicator::V27terTraining4800 => [708, 923, 908, 1123],
        Indicator::V29Training7200 | Indicator::V29Training9600 => [234, 454, 434, 654],
        Indicator::V17ShortTraining7200
        | Indicator::V17ShortTraining9600
        | Indicator::V17ShortTraining14400 => [142, 367, 342, 567],
        Indicator::V17ShortTraining12000 => [142, 367, 342, 367],
        Indicator::V17LongTraining7200
        | Indicator::V17LongTraining9600
        | Indicator::V17LongTraining12000
        | Indicator::V17LongTraining14400 => [1393, 1618, 1593, 1818],
        _ => [0, 0, 0, 0],
    };
    match (use_tep, with_flags) {
        (false, false) => row[0],
        (true, false) => row[1],
        (false, true) => row[2],
        (true, true) => row[3],
    }
}
