//! Failure taxonomy for one sensor transaction.

/// Protocol stage in which an expected line transition did not occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// The acknowledgement low pulse never ended.
    AckLow,
    /// The acknowledgement high pulse never ended.
    AckHigh,
    /// A data bit's low guard pulse never gave way to the high pulse.
    BitStart,
    /// A data bit's high pulse never returned low.
    BitEnd,
}

/// Everything that can go wrong during one transaction.
///
/// `NoResponse` and `Timeout` point at wiring, power, or electrical noise;
/// `ChecksumMismatch` at a bit sampled near the 0/1 threshold. All three are
/// transient and worth retrying (see [`crate::Sampler`]). `Pin` wraps the
/// host GPIO error and usually means the pin subsystem itself is broken,
/// which no retry will fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The sensor never pulled the line low after the start signal.
    NoResponse,
    /// A specific expected transition did not occur within its window.
    Timeout(Stage),
    /// A full frame arrived but its checksum byte does not match.
    ChecksumMismatch,
    /// Reading or driving the line failed in the host GPIO layer.
    Pin(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Pin(e)
    }
}
