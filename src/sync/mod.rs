//! ISR-safe engine wrapper using critical sections.
//!
//! A common deployment drives [`crate::T31Modem::rx`] and
//! [`crate::T31Modem::tx`] from a codec interrupt while AT traffic arrives
//! on a main loop. [`SharedT31`] serializes those contexts with
//! `critical_section::with()`.

mod shared;

pub use shared::SharedT31;
