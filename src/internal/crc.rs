//! HDLC frame check sequence support.
//!
//! Frames reassembled from T.38 HDLC data fields arrive without their FCS
//! octets. The Class 1 DTE protocol delivers every frame followed by two FCS
//! bytes, so the engine computes them here before handing the frame up.

use crc16::{State, X_25};

/// Compute the 16 bit FCS over `data`.
///
/// CRC-16/X-25: 0xFFFF preset, reflected 0x1021 polynomial, final
/// complement.
pub(crate) fn crc_itu16(data: &[u8]) -> u16 {
    State::<X_25>::calculate(data)
}

/// Append the FCS for `frame[..len]` at `frame[len]` and `frame[len + 1]`,
/// low octet first as it appears on the wire.
pub(crate) fn append_fcs(frame: &mut [u8], len: usize) {
    let fcs = crc_itu16(&frame[..len]);
    frame[len] = (fcs & 0xFF) as u8;
    frame[len + 1] = (fcs >> 8) as u8;
}
