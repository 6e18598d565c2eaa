//! Bit-banged driver for the AM2302/DHT22 single-wire temperature and
//! humidity sensor.
//!
//! The sensor family uses one half-duplex data line: the host pulls the line
//! low to request a measurement, the sensor answers with an acknowledgement
//! pulse pair and then clocks out 40 pulse-width-encoded bits (humidity high,
//! humidity low, temperature high, temperature low, checksum). This crate
//! owns that transaction: start signal, handshake, bit sampling, checksum
//! validation, and a bounded retry layer. Everything platform-specific is
//! supplied by the host through small capability traits.
//!
//! The caller provides:
//! - a data-line pin implementing [`DataPin`] (embedded-hal `InputPin` +
//!   `OutputPin` plus direction switching with an input pull-up),
//! - a blocking delay implementing `embedded_hal::delay::DelayNs`,
//! - a monotonic microsecond clock implementing [`MicrosTimer`].
//!
//! Timing-critical sections run inside `critical_section::with`, so a
//! [`critical-section`](https://crates.io/crates/critical-section)
//! implementation must be present in the final binary.
//!
//! # Example
//!
//! ```ignore
//! use am2302_driver::{Am2302, RetryPolicy, Sampler};
//!
//! let pin = /* host pin implementing DataPin */;
//! let delay = /* host delay implementing DelayNs */;
//! let clock = /* host clock implementing MicrosTimer */;
//!
//! // One-shot transaction:
//! let mut dht = Am2302::new(pin, delay, clock);
//! match dht.acquire() {
//!     Ok(reading) => defmt::info!(
//!         "humidity {} %RH, temperature {} C",
//!         reading.humidity(),
//!         reading.temperature(),
//!     ),
//!     Err(e) => defmt::warn!("sensor read failed: {:?}", e),
//! }
//!
//! // Or with retries and the mandatory 2 s inter-transaction spacing:
//! let mut sampler = Sampler::new(dht, RetryPolicy::default());
//! let reading = sampler.sample()?;
//! ```
//!
//! The sensor needs at least two seconds between transactions for its
//! conversion cycle; [`Sampler`] enforces that, a bare [`Am2302`] does not.

#![cfg_attr(not(test), no_std)]

mod am2302;
mod error;
mod frame;
mod pin;
mod retry;

pub use am2302::{Am2302, Config};
pub use error::{Error, Stage};
pub use frame::{RawFrame, Reading};
pub use pin::{DataPin, MicrosTimer};
pub use retry::{RetryPolicy, Sampler, SensorUnreachable};
