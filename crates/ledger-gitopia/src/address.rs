//! Public key and bech32 address retrieval.
//!
//! The app derives the secp256k1 key for a path and renders its bech32
//! address with the prefix supplied by the host. The host only checks the
//! prefix against the BIP-173 rules and splits the response.
//!
//! # Response Layout
//!
//! ```text
//! | Compressed pubkey | Address (ASCII) |
//! |-------------------|-----------------|
//! | 33B               | Var             |
//! ```

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{MAX_HRP_LEN, PUBKEY_LEN};
use crate::error::{Error, Result};

/// Checks that `hrp` is a valid bech32 human-readable part.
///
/// # Errors
///
/// - [`Error::InvalidPrefix`] if `hrp` is longer than 83 bytes
/// - [`Error::InvalidPrefixCharset`] if any byte is outside `[33, 126]`
///
/// # Example
///
/// ```
/// use ledger_gitopia::address::validate_hrp;
///
/// assert!(validate_hrp("cosmos").is_ok());
/// assert!(validate_hrp("has space").is_err());
/// ```
pub fn validate_hrp(hrp: &str) -> Result<()> {
    if hrp.len() > MAX_HRP_LEN {
        return Err(Error::InvalidPrefix(hrp.len()));
    }

    // https://github.com/bitcoin/bips/blob/master/bip-0173.mediawiki
    if !hrp.bytes().all(|b| (33..=126).contains(&b)) {
        return Err(Error::InvalidPrefixCharset);
    }

    Ok(())
}

/// Builds the command data: prefix length, prefix, encoded path.
pub(crate) fn request_data(hrp: &str, path_bytes: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(1 + hrp.len() + path_bytes.len());
    // At most MAX_HRP_LEN once validated.
    data.push(hrp.len() as u8);
    data.extend_from_slice(hrp.as_bytes());
    data.extend_from_slice(path_bytes);
    data
}

/// A public key and the address derived from it on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressResult {
    /// Compressed secp256k1 public key.
    #[serde(with = "hex_pubkey")]
    pub pubkey: [u8; PUBKEY_LEN],

    /// Bech32 address rendered by the app.
    pub address: String,
}

impl AddressResult {
    /// Splits an address response requested with a prefix of `hrp_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the response is shorter than
    /// `35 + hrp_len` bytes.
    pub fn from_response(response: &[u8], hrp_len: usize) -> Result<Self> {
        let min_len = PUBKEY_LEN + 2 + hrp_len;
        if response.len() < min_len {
            return Err(Error::InvalidResponse(format!(
                "address response is {} bytes long, expected at least {min_len}",
                response.len()
            )));
        }

        let (pubkey, address) = response.split_at(PUBKEY_LEN);
        let mut key = [0u8; PUBKEY_LEN];
        key.copy_from_slice(pubkey);

        let address = String::from_utf8(address.to_vec())
            .map_err(|e| Error::InvalidResponse(format!("address is not valid UTF-8: {e}")))?;

        Ok(Self {
            pubkey: key,
            address,
        })
    }
}

impl fmt::Display for AddressResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, hex::encode(self.pubkey))
    }
}

mod hex_pubkey {
    use super::{Deserialize, Deserializer, PUBKEY_LEN, Serializer};

    pub(super) fn serialize<S: Serializer>(
        pubkey: &[u8; PUBKEY_LEN],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(pubkey))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; PUBKEY_LEN], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let mut pubkey = [0u8; PUBKEY_LEN];
        hex::decode_to_slice(encoded, &mut pubkey).map_err(serde::de::Error::custom)?;
        Ok(pubkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hrp_length_limit() {
        assert!(validate_hrp(&"a".repeat(83)).is_ok());
        assert!(matches!(
            validate_hrp(&"a".repeat(84)),
            Err(Error::InvalidPrefix(84))
        ));
    }

    #[test]
    fn hrp_charset_bounds() {
        assert!(validate_hrp("!~").is_ok());
        assert!(matches!(validate_hrp("a b"), Err(Error::InvalidPrefixCharset)));
        assert!(matches!(validate_hrp("a\x7f"), Err(Error::InvalidPrefixCharset)));
        assert!(matches!(validate_hrp("gitopiaé"), Err(Error::InvalidPrefixCharset)));
    }

    #[test]
    fn empty_hrp_is_accepted() {
        assert!(validate_hrp("").is_ok());
    }

    #[test]
    fn length_is_checked_before_charset() {
        assert!(matches!(
            validate_hrp(&" ".repeat(84)),
            Err(Error::InvalidPrefix(84))
        ));
    }

    #[test]
    fn request_data_layout() {
        let data = request_data("cosmos", &[0xAA, 0xBB]);
        assert_eq!(data, b"\x06cosmos\xAA\xBB");
    }

    #[test]
    fn from_response_splits_key_and_address() {
        let mut response = vec![0x02; PUBKEY_LEN];
        response.extend_from_slice(b"cosmos1abc");

        let result = AddressResult::from_response(&response, 6).unwrap();
        assert_eq!(result.pubkey, [0x02; PUBKEY_LEN]);
        assert_eq!(result.address, "cosmos1abc");
    }

    #[test]
    fn from_response_rejects_invalid_utf8_address() {
        let mut response = vec![0x02; PUBKEY_LEN];
        response.extend_from_slice(b"cosmos1\xffabc");

        assert!(matches!(
            AddressResult::from_response(&response, 6),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn from_response_minimum_length() {
        let response = vec![0x03; PUBKEY_LEN + 2 + 6];
        assert!(AddressResult::from_response(&response, 6).is_ok());
        assert!(matches!(
            AddressResult::from_response(&response[..response.len() - 1], 6),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn serializes_pubkey_as_hex() {
        let result = AddressResult {
            pubkey: [0x02; PUBKEY_LEN],
            address: "gitopia1xyz".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pubkey"], "02".repeat(PUBKEY_LEN));

        let back: AddressResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
