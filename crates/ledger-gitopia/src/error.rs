//! Error types for the Ledger Gitopia driver.
//!
//! This module provides a single error type [`enum@Error`] covering every
//! failure mode of a session with the Gitopia user app: opening the
//! transport, decoding device responses, validating caller input, and
//! statuses reported by the device itself.
//!
//! # Error Categories
//!
//! - **Transport errors**: device discovery and I/O failures during an exchange
//! - **Response errors**: responses that do not match the expected layout
//! - **Input errors**: invalid address prefixes and derivation paths
//! - **Device errors**: refusals and raw status words reported by the app
//!
//! # Example
//!
//! ```
//! use ledger_gitopia::Error;
//!
//! let err = Error::InvalidPrefix(84);
//! assert_eq!(err.to_string(), "address prefix is 84 bytes long, at most 83 are allowed");
//! ```

use core::result::Result as CoreResult;

use thiserror::Error;

use crate::apdu::StatusWord;
use crate::version::VersionInfo;

/// The main error type for the Ledger Gitopia driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The transport could not be opened or no device was found.
    #[error("ledger device unavailable: {0}")]
    TransportUnavailable(String),

    /// The transport failed while exchanging a command.
    #[error("exchange with ledger device failed: {0}")]
    Exchange(String),

    // =========================================================================
    // Response Errors
    // =========================================================================
    /// The app name response did not start with the expected format marker.
    #[error("response format ID not recognized")]
    UnrecognizedResponseFormat,

    /// A response was shorter than its layout requires.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// The bech32 human-readable prefix exceeds the maximum length.
    #[error("address prefix is {0} bytes long, at most 83 are allowed")]
    InvalidPrefix(usize),

    /// The bech32 human-readable prefix contains a byte outside `[33, 126]`.
    #[error("all characters in the address prefix must be in the [33, 126] range")]
    InvalidPrefixCharset,

    /// The derivation path does not fit the encoding used by the app.
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    /// The command data does not fit in a single short APDU.
    #[error("command data is {0} bytes long, at most 255 fit in one APDU")]
    CommandTooLong(usize),

    // =========================================================================
    // Device and App Errors
    // =========================================================================
    /// No path encoding or version policy is known for the running app.
    #[error("app {0:?} is not supported")]
    UnsupportedApp(String),

    /// The device reported that the command class is unknown, which means
    /// a different app (or the dashboard) is in the foreground.
    #[error("are you sure the Gitopia or Cosmos app is open?")]
    AppNotOpen,

    /// The app rejected the request and explained why.
    #[error("{0}")]
    DeviceRejected(String),

    /// The app answered with a non-success status word.
    #[error("{0}")]
    Status(StatusWord),

    /// The app version does not satisfy the compatibility policy.
    #[error("app version {found} is not supported, at least {required} is required")]
    VersionUnsupported {
        /// The minimum version accepted by the policy.
        required: VersionInfo,
        /// The version reported by the device.
        found: VersionInfo,
    },
}

/// A specialized [`Result`] type for Ledger Gitopia operations.
pub type Result<T> = CoreResult<T, Error>;
