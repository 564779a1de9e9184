//! Device transports.
//!
//! The [`Transport`] trait is the only thing a session needs from the
//! physical link: send one serialized APDU, block until the device answers,
//! and return the raw answer (data followed by the status word).
//!
//! Transports shipped with this crate:
//!
//! - [`HidTransport`] (feature `hid`): USB HID through `hidapi`
//!
//! Anything else (BLE, the Speculos simulator, a test double) only has to
//! implement the trait.

#[cfg(feature = "hid")]
pub mod hid;

#[cfg(feature = "hid")]
pub use hid::HidTransport;

use crate::error::Result;

/// A synchronous request/response link to a Ledger device.
///
/// Exchanges may block for as long as the device waits for the user to
/// confirm; implementations must not impose their own deadline on them.
pub trait Transport {
    /// Sends a serialized APDU and returns the raw response.
    ///
    /// # Arguments
    ///
    /// * `command` - The serialized command (`CLA INS P1 P2 Lc data`)
    ///
    /// # Returns
    ///
    /// The response data followed by the two status word bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be delivered or the answer
    /// could not be read.
    fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>>;

    /// Releases the underlying device connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection could not be released cleanly.
    fn close(&mut self) -> Result<()>;
}
