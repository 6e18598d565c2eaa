//! The protocol engine: one bit-banged transaction on the data line.

use critical_section::with;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use crate::error::{Error, Stage};
use crate::frame::{RawFrame, Reading};
use crate::pin::{DataPin, MicrosTimer};

/// Calibration constants for one sensor transaction.
///
/// The defaults follow the AM2302 datasheet with the conservative margins
/// commonly seen in field code. Sensor batches and host GPIO latency vary, so
/// every threshold is tunable rather than baked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Start-signal low hold in milliseconds. The datasheet requires at
    /// least 1 ms; 18 ms works across all DHT variants.
    pub start_low_ms: u32,
    /// Start-signal high release in microseconds before listening (20-40 us).
    pub start_high_us: u32,
    /// Window for each of the three acknowledgement transitions, in
    /// microseconds. The ack pulses themselves are ~80 us each.
    pub ack_timeout_us: u32,
    /// Window for a bit's ~50 us low guard pulse to end, in microseconds.
    pub bit_start_timeout_us: u32,
    /// Window for a bit's high pulse (~28 us or ~70 us) to end, in
    /// microseconds.
    pub bit_end_timeout_us: u32,
    /// High-pulse duration above which a bit reads as 1, in microseconds.
    /// A pulse of exactly this width reads as 0.
    pub threshold_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_low_ms: 18,
            start_high_us: 30,
            ack_timeout_us: 1000,
            bit_start_timeout_us: 100,
            bit_end_timeout_us: 100,
            threshold_us: 40,
        }
    }
}

/// Bounded wait failure, mapped to a stage-specific [`Error`] at each call
/// site.
#[derive(Debug)]
enum WaitError<E> {
    TimedOut,
    Pin(E),
}

impl<E> WaitError<E> {
    fn into_error(self, on_timeout: Error<E>) -> Error<E> {
        match self {
            WaitError::TimedOut => on_timeout,
            WaitError::Pin(e) => Error::Pin(e),
        }
    }
}

/// Splits a high-pulse width into a bit value. Widths at or below the
/// threshold decode as 0.
fn bit_from_width(width_us: u32, threshold_us: u32) -> bool {
    width_us > threshold_us
}

/// Driver for one AM2302/DHT22 sensor on one data line.
///
/// Owns the pin, the delay, and the microsecond clock for the duration of its
/// life; `&mut self` on [`acquire`](Am2302::acquire) is what guarantees at
/// most one in-flight transaction per sensor.
pub struct Am2302<P, D, C> {
    pin: P,
    delay: D,
    clock: C,
    config: Config,
}

impl<P, D, C> Am2302<P, D, C>
where
    P: DataPin,
    D: DelayNs,
    C: MicrosTimer,
{
    /// Creates a driver with the default [`Config`].
    pub fn new(pin: P, delay: D, clock: C) -> Self {
        Self::with_config(pin, delay, clock, Config::default())
    }

    /// Creates a driver with explicit calibration constants.
    pub fn with_config(pin: P, delay: D, clock: C, config: Config) -> Self {
        Self {
            pin,
            delay,
            clock,
            config,
        }
    }

    /// The calibration constants in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Releases the pin, delay, and clock.
    pub fn free(self) -> (P, D, C) {
        (self.pin, self.delay, self.clock)
    }

    /// Runs one full transaction and decodes the result.
    ///
    /// Blocks for the whole transaction: ~18 ms of start signal plus a few
    /// milliseconds of sampling on success, or up to the sum of the stage
    /// timeouts on failure. The wire protocol has no abort signal, so a
    /// supervisor that wants to bound latency must stop waiting for the
    /// result rather than interrupt the pin sequence.
    ///
    /// The sensor needs at least 2 s between transactions; pacing is the
    /// caller's job (or [`crate::Sampler`]'s).
    pub fn acquire(&mut self) -> Result<Reading, Error<P::Error>> {
        self.acquire_raw().map(|frame| frame.decode())
    }

    /// Runs one full transaction and returns the validated raw frame.
    pub fn acquire_raw(&mut self) -> Result<RawFrame, Error<P::Error>> {
        let frame = RawFrame::from_bytes(self.transact()?);
        if frame.checksum_ok() {
            Ok(frame)
        } else {
            Err(Error::ChecksumMismatch)
        }
    }

    /// Drives the line through start signal, handshake, and bit sampling,
    /// then restores the idle state.
    ///
    /// Interrupts are masked for the whole exchange; a pre-empted poll would
    /// mis-measure a pulse and corrupt a bit near the threshold.
    fn transact(&mut self) -> Result<[u8; 5], Error<P::Error>> {
        let outcome = with(|_cs| {
            self.send_start_signal()?;
            self.await_ack()?;
            self.sample_bits()
        });
        // Drive the line high in output mode so the bus idles cleanly for
        // the next transaction. If the exchange itself failed, that error
        // wins over a restore error.
        let restore = self.pin.set_output().and_then(|()| self.pin.set_high());
        let bytes = outcome?;
        restore?;
        Ok(bytes)
    }

    /// Wakes the sensor: hold low, release high, then listen with pull-up.
    fn send_start_signal(&mut self) -> Result<(), Error<P::Error>> {
        self.pin.set_output()?;
        self.pin.set_low()?;
        self.delay.delay_ms(self.config.start_low_ms);
        self.pin.set_high()?;
        self.delay.delay_us(self.config.start_high_us);
        self.pin.set_input_pullup()?;
        Ok(())
    }

    /// Waits out the sensor's 80 us low / 80 us high acknowledgement pair.
    ///
    /// A sensor that never pulls the line down at all is [`Error::NoResponse`]
    /// (wiring or power); a pulse that starts but never ends is a stage
    /// timeout.
    fn await_ack(&mut self) -> Result<(), Error<P::Error>> {
        let timeout = self.config.ack_timeout_us;
        self.wait_for_level(PinState::Low, timeout)
            .map_err(|e| e.into_error(Error::NoResponse))?;
        self.wait_for_level(PinState::High, timeout)
            .map_err(|e| e.into_error(Error::Timeout(Stage::AckLow)))?;
        self.wait_for_level(PinState::Low, timeout)
            .map_err(|e| e.into_error(Error::Timeout(Stage::AckHigh)))?;
        Ok(())
    }

    /// Samples the 40 data bits, most significant bit first within each
    /// byte. Bit value is the measured width of the high pulse that follows
    /// each ~50 us low guard pulse.
    fn sample_bits(&mut self) -> Result<[u8; 5], Error<P::Error>> {
        let mut bytes = [0u8; 5];
        for i in 0..40 {
            self.wait_for_level(PinState::High, self.config.bit_start_timeout_us)
                .map_err(|e| e.into_error(Error::Timeout(Stage::BitStart)))?;
            let width = self
                .wait_for_level(PinState::Low, self.config.bit_end_timeout_us)
                .map_err(|e| e.into_error(Error::Timeout(Stage::BitEnd)))?;
            bytes[i / 8] <<= 1;
            if bit_from_width(width, self.config.threshold_us) {
                bytes[i / 8] |= 1;
            }
        }
        Ok(bytes)
    }

    /// Polls until the line reads `state`, returning the elapsed time in
    /// microseconds. Never waits past `timeout_us`.
    fn wait_for_level(
        &mut self,
        state: PinState,
        timeout_us: u32,
    ) -> Result<u32, WaitError<P::Error>> {
        let start = self.clock.now_us();
        loop {
            let high = self.pin.is_high().map_err(WaitError::Pin)?;
            if (state == PinState::High) == high {
                return Ok(self.clock.now_us().wrapping_sub(start));
            }
            if self.clock.now_us().wrapping_sub(start) > timeout_us {
                return Err(WaitError::TimedOut);
            }
        }
    }

    pub(crate) fn timestamp_us(&mut self) -> u32 {
        self.clock.now_us()
    }

    pub(crate) fn pause_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State, Transaction as PinTransaction,
    };

    /// PinMock cannot model direction switching, so the mode methods are
    /// no-ops here; level traffic is still checked transaction by
    /// transaction.
    struct ModePin(PinMock);

    impl ErrorType for ModePin {
        type Error = <PinMock as ErrorType>::Error;
    }

    impl InputPin for ModePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.0.is_high()
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.0.is_low()
        }
    }

    impl OutputPin for ModePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.set_low()
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.set_high()
        }
    }

    impl DataPin for ModePin {
        fn set_output(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_input_pullup(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    /// Deterministic clock: every `now_us` call advances by `step`.
    struct TickClock {
        now: u32,
        step: u32,
    }

    impl MicrosTimer for TickClock {
        fn now_us(&mut self) -> u32 {
            let t = self.now;
            self.now = self.now.wrapping_add(self.step);
            t
        }
    }

    fn driver(
        expectations: &[PinTransaction],
        step: u32,
    ) -> Am2302<ModePin, NoopDelay, TickClock> {
        Am2302::new(
            ModePin(PinMock::new(expectations)),
            NoopDelay::new(),
            TickClock { now: 0, step },
        )
    }

    #[test]
    fn start_signal_drives_low_then_high() {
        let expectations = [
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];
        let mut dht = driver(&expectations, 1);

        dht.send_start_signal().unwrap();

        let (mut pin, _, _) = dht.free();
        pin.0.done();
    }

    #[test]
    fn wait_for_level_returns_elapsed() {
        // Two polls at the wrong level, then the edge. The clock ticks 10 us
        // per reading: start at 0, success reads 30.
        let expectations = [
            PinTransaction::get(State::Low),
            PinTransaction::get(State::Low),
            PinTransaction::get(State::High),
        ];
        let mut dht = driver(&expectations, 10);

        let elapsed = dht.wait_for_level(PinState::High, 950).unwrap();
        assert_eq!(elapsed, 30);

        let (mut pin, _, _) = dht.free();
        pin.0.done();
    }

    #[test]
    fn wait_for_level_gives_up_within_bound() {
        // Elapsed grows by 10 us per poll; with a 95 us window the tenth
        // poll is the last one before the wait reports a timeout.
        let expectations = vec![PinTransaction::get(State::High); 10];
        let mut dht = driver(&expectations, 10);

        let result = dht.wait_for_level(PinState::Low, 95);
        assert!(matches!(result, Err(WaitError::TimedOut)));

        let (mut pin, _, _) = dht.free();
        pin.0.done();
    }

    #[test]
    fn threshold_width_decodes_as_zero() {
        assert!(!bit_from_width(26, 40));
        assert!(!bit_from_width(40, 40));
        assert!(bit_from_width(41, 40));
        assert!(bit_from_width(70, 40));
    }
}
