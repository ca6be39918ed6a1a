//! ISR-safe engine wrapper using critical sections.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::driver::t31::T31Modem;

/// ISR-safe engine wrapper.
///
/// All access goes through `critical_section::with()`, disabling interrupts
/// for the duration of the closure. One context can drive the sample
/// harness from an interrupt while another feeds AT traffic from a main
/// loop; the critical section keeps the two entry points from interleaving
/// on the same engine.
///
/// # Example
///
/// ```ignore
/// static ENGINE: SharedT31<MyBank, MyHost> =
///     SharedT31::new(T31Modem::new(MyBank::new(), MyHost::new(), T31Config::new()));
///
/// // From the codec ISR:
/// ENGINE.with(|t31| {
///     t31.rx(&block);
///     t31.tx(&mut out);
/// });
///
/// // From the main loop:
/// ENGINE.with(|t31| t31.at_rx(serial_bytes));
/// ```
pub struct SharedT31<B, H> {
    engine: Mutex<RefCell<T31Modem<B, H>>>,
}

impl<B, H> SharedT31<B, H> {
    /// Wrap an engine (const, suitable for static initialization).
    pub const fn new(engine: T31Modem<B, H>) -> Self {
        Self {
            engine: Mutex::new(RefCell::new(engine)),
        }
    }

    /// Execute a closure with exclusive access to the engine.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T31Modem<B, H>) -> R,
    {
        critical_section::with(|cs| {
            let mut engine = self.engine.borrow_ref_mut(cs);
            f(&mut engine)
        })
    }

    /// Try to execute a closure, returning `None` if the engine is already
    /// borrowed in this context.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T31Modem<B, H>) -> R,
    {
        critical_section::with(|cs| {
            self.engine
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut engine| f(&mut engine))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::analog_engine;

    #[test]
    fn shared_engine_grants_exclusive_access() {
        let shared = SharedT31::new(analog_engine());
        shared.with(|t31| {
            assert_eq!(t31.modem(), None);
        });
        assert!(shared.try_with(|t31| t31.bit_rate()).is_some());
    }

    #[test]
    fn with_passes_results_through() {
        let shared = SharedT31::new(analog_engine());
        let rate = shared.with(|t31| {
            t31.core.bit_rate = 9600;
            t31.bit_rate()
        });
        assert_eq!(rate, 9600);
        assert_eq!(shared.try_with(|t31| t31.bit_rate()), Some(9600));
    }
}
