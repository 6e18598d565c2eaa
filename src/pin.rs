//! Host capability contracts for the data line and the microsecond clock.

use embedded_hal::digital::{InputPin, OutputPin};

/// The sensor data line.
///
/// embedded-hal has no trait for switching a pin between input and output at
/// runtime, which the half-duplex protocol requires: the host drives the line
/// for the start signal, then releases it and listens while the sensor
/// transmits. Implementations add that switch on top of the usual
/// `InputPin`/`OutputPin` pair.
///
/// Input mode must enable an internal pull-up so the idle line reads high.
/// The pin is used by a single caller at a time; no reentrancy is required.
pub trait DataPin: InputPin + OutputPin {
    /// Switch the line to push-pull output mode.
    fn set_output(&mut self) -> Result<(), Self::Error>;

    /// Switch the line to input mode with the internal pull-up enabled.
    fn set_input_pullup(&mut self) -> Result<(), Self::Error>;
}

/// Monotonic microsecond clock used to measure pulse widths.
///
/// The counter wraps at `u32::MAX`; elapsed time is computed with
/// `wrapping_sub`, so wrap-around mid-measurement is harmless as long as no
/// single measured interval exceeds ~71 minutes. Best-effort microsecond
/// resolution is enough: the protocol discriminates ~28 us from ~70 us
/// pulses.
pub trait MicrosTimer {
    /// Current counter value in microseconds.
    fn now_us(&mut self) -> u32;
}
