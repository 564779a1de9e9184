//! BIP32 derivation path encoding.
//!
//! The byte layout of a derivation path depends on the app running on the
//! device. Encoders are looked up by app name in a small registry, so
//! supporting another app means adding one entry to [`PATH_ENCODERS`].
//!
//! # Example
//!
//! ```
//! use ledger_gitopia::path::encoder_for;
//!
//! let encode = encoder_for("Gitopia").unwrap();
//! let bytes = encode(&[44, 118, 0, 0, 0], 3).unwrap();
//! assert_eq!(bytes.len(), 20);
//! assert_eq!(&bytes[..4], &[0x2C, 0x00, 0x00, 0x80]);
//! ```

use crate::constants::{GITOPIA_APP_NAME, HARDENED_COUNT};
use crate::error::{Error, Result};

/// Bit marking a hardened derivation index.
pub const HARDENED: u32 = 0x8000_0000;

/// Encodes a derivation path for one app.
///
/// `hardened_count` is a hint; an encoder whose app fixes the number of
/// hardened levels ignores it.
pub type PathEncoder = fn(path: &[u32], hardened_count: usize) -> Result<Vec<u8>>;

/// Path encoders keyed by the app name advertised by the device.
pub const PATH_ENCODERS: &[(&str, PathEncoder)] = &[(GITOPIA_APP_NAME, encode_gitopia)];

/// Returns the path encoder registered for `app_name`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedApp`] if no encoder is registered.
pub fn encoder_for(app_name: &str) -> Result<PathEncoder> {
    PATH_ENCODERS
        .iter()
        .find(|(name, _)| *name == app_name)
        .map(|(_, encoder)| *encoder)
        .ok_or_else(|| Error::UnsupportedApp(app_name.to_string()))
}

/// Number of elements in a fixed-depth path (`purpose/coin/account/change/index`).
const FIXED_DEPTH: usize = 5;

/// Gitopia always hardens `purpose/coin/account`.
fn encode_gitopia(path: &[u32], _hardened_count: usize) -> Result<Vec<u8>> {
    encode_fixed_depth(path, HARDENED_COUNT)
}

/// Encodes a five element path as little-endian `u32`s.
fn encode_fixed_depth(path: &[u32], hardened_count: usize) -> Result<Vec<u8>> {
    if path.len() != FIXED_DEPTH {
        return Err(Error::InvalidPath(format!(
            "path should contain {FIXED_DEPTH} elements, got {}",
            path.len()
        )));
    }

    let mut bytes = Vec::with_capacity(FIXED_DEPTH * 4);
    for (index, element) in path.iter().enumerate() {
        let value = if index < hardened_count {
            element | HARDENED
        } else {
            *element
        };
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    Ok(bytes)
}
