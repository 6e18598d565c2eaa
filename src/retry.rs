//! Bounded retries and inter-transaction pacing on top of [`Am2302`].

use embedded_hal::delay::DelayNs;

use crate::am2302::Am2302;
use crate::error::Error;
use crate::frame::Reading;
use crate::pin::{DataPin, MicrosTimer};

/// How [`Sampler`] retries a failed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Transactions attempted per [`Sampler::sample`] call before giving up.
    pub attempts: u8,
    /// Settling delay after a failed attempt, in milliseconds.
    ///
    /// Runs before the spacing top-up, so it only lengthens the gap between
    /// attempts when it exceeds `min_spacing_ms`; with the defaults the
    /// 2000 ms spacing already covers it.
    pub settle_ms: u32,
    /// Minimum spacing between two transactions, in milliseconds. The
    /// sensor's conversion cycle needs at least 2000 ms regardless of
    /// whether the previous transaction succeeded.
    pub min_spacing_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            settle_ms: 500,
            min_spacing_ms: 2000,
        }
    }
}

/// The retry budget ran out without a valid frame.
///
/// Surfaced once per [`Sampler::sample`] call as the aggregate
/// sensor-unreachable status; the last per-attempt failure is kept for
/// diagnosis. Not fatal: the next `sample` call starts a fresh budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorUnreachable<E> {
    /// How many transactions were attempted.
    pub attempts: u8,
    /// The failure of the final attempt.
    pub last: Error<E>,
}

/// Wraps a driver with the caller-level retry policy: bounded attempts,
/// settling delays, and the mandatory spacing between transactions.
///
/// Construction counts as a transaction for spacing purposes, which also
/// covers the sensor's power-up stabilization before the first read.
pub struct Sampler<P, D, C> {
    dht: Am2302<P, D, C>,
    policy: RetryPolicy,
    last_done_us: u32,
}

impl<P, D, C> Sampler<P, D, C>
where
    P: DataPin,
    D: DelayNs,
    C: MicrosTimer,
{
    /// Wraps `dht` with `policy`.
    pub fn new(mut dht: Am2302<P, D, C>, policy: RetryPolicy) -> Self {
        let last_done_us = dht.timestamp_us();
        Self {
            dht,
            policy,
            last_done_us,
        }
    }

    /// The wrapped driver and policy.
    pub fn free(self) -> (Am2302<P, D, C>, RetryPolicy) {
        (self.dht, self.policy)
    }

    /// Acquires one reading, retrying transient failures up to the policy's
    /// attempt budget.
    ///
    /// Blocks through spacing and settling delays, so a call can take
    /// several seconds when the sensor is misbehaving. Pin-subsystem errors
    /// are retried like any other failure; a broken GPIO layer simply
    /// exhausts the budget and shows up in `last`.
    pub fn sample(&mut self) -> Result<Reading, SensorUnreachable<P::Error>> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            self.pace();
            let outcome = self.dht.acquire();
            self.last_done_us = self.dht.timestamp_us();
            match outcome {
                Ok(reading) => return Ok(reading),
                Err(last) if attempt == attempts => {
                    return Err(SensorUnreachable { attempts, last });
                }
                Err(_) => {
                    self.dht.pause_us(self.policy.settle_ms.saturating_mul(1000));
                    attempt += 1;
                }
            }
        }
    }

    /// Sleeps until the minimum inter-transaction spacing has passed since
    /// the previous transaction ended.
    fn pace(&mut self) {
        let spacing_us = self.policy.min_spacing_ms.saturating_mul(1000);
        let since = self.dht.timestamp_us().wrapping_sub(self.last_done_us);
        if since < spacing_us {
            self.dht.pause_us(spacing_us - since);
        }
    }
}
