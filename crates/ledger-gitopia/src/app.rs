//! Session with the Gitopia user app.
//!
//! This module provides the [`UserApp`] type, which owns a [`Transport`] and
//! drives every command the app understands:
//!
//! - App identification and version retrieval (on open)
//! - Public key and bech32 address derivation
//! - Multi-packet transaction signing
//!
//! # Example
//!
//! ```ignore
//! use ledger_gitopia::UserApp;
//!
//! let transport: Box<dyn Transport> = /* obtain transport */;
//! let mut app = UserApp::open(transport)?;
//!
//! let path = [44, 118, 0, 0, 0];
//! let address = app.get_address_pubkey(&path, "gitopia")?;
//! let signature = app.sign_secp256k1(&path, tx_json.as_bytes())?;
//! app.close()?;
//! ```

use std::fmt;

use tracing::{debug, trace, warn};

use crate::address::{self, AddressResult};
use crate::apdu::{Apdu, ApduResponse, StatusWord};
use crate::constants::{
    APP_INFO_CLA, APP_NAME_FORMAT_ID, DEFAULT_HRP, HARDENED_COUNT, INS_GET_ADDR_SECP256K1,
    INS_GET_APP_NAME, INS_GET_VERSION, PUBKEY_LEN, USER_CLA,
};
use crate::error::{Error, Result};
use crate::path;
use crate::sign::SignPackets;
use crate::transport::Transport;
use crate::version::{AcceptAll, CompatibilityPolicy, VersionInfo};

/// An open session with the Gitopia (or Cosmos) user app.
///
/// The app name and version are read once in [`UserApp::open`] and never
/// change afterwards. Operations take `&mut self`: the device handles one
/// exchange at a time, so callers sharing a session must serialize access.
pub struct UserApp {
    /// The underlying transport, `None` once closed.
    transport: Option<Box<dyn Transport>>,

    /// Name advertised by the running app.
    app_name: String,

    /// Version reported by the running app.
    version: VersionInfo,
}

impl fmt::Debug for UserApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserApp")
            .field("app_name", &self.app_name)
            .field("version", &self.version)
            .field("open", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl UserApp {
    /// Opens a session over `transport`, accepting any app version.
    ///
    /// # Errors
    ///
    /// - [`Error::AppNotOpen`] if the device does not run a user app
    /// - [`Error::UnrecognizedResponseFormat`] if the app name response is unknown
    /// - [`Error::InvalidResponse`] if a response is truncated
    ///
    /// The transport is closed before any error is returned.
    pub fn open(transport: Box<dyn Transport>) -> Result<Self> {
        Self::open_with_policy(transport, &AcceptAll)
    }

    /// Opens a session over `transport` and checks the app against `policy`.
    ///
    /// # Errors
    ///
    /// Same as [`UserApp::open`], plus whatever `policy` rejects. The
    /// transport is closed before any error is returned.
    pub fn open_with_policy(
        mut transport: Box<dyn Transport>,
        policy: &dyn CompatibilityPolicy,
    ) -> Result<Self> {
        match Self::identify(transport.as_mut(), policy) {
            Ok((app_name, version)) => {
                debug!(app = %app_name, %version, app_mode = version.app_mode, "ledger session opened");
                Ok(Self {
                    transport: Some(transport),
                    app_name,
                    version,
                })
            }
            Err(err) => {
                if let Err(close_err) = transport.close() {
                    warn!(error = %close_err, "failed to close transport after open failure");
                }
                Err(err)
            }
        }
    }

    fn identify(
        transport: &mut dyn Transport,
        policy: &dyn CompatibilityPolicy,
    ) -> Result<(String, VersionInfo)> {
        let app_name = load_app_name(transport).map_err(app_not_open)?;
        let version = load_version(transport).map_err(app_not_open)?;
        policy.check(&app_name, &version)?;
        Ok((app_name, version))
    }

    /// Returns the name advertised by the running app.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the version reported by the running app.
    #[must_use]
    pub const fn version(&self) -> VersionInfo {
        self.version
    }

    /// Encodes `path` the way the running app expects it.
    ///
    /// The Gitopia encoding always hardens the first three levels, whatever
    /// `hardened_count` says.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedApp`] if the running app has no known encoding
    /// - [`Error::InvalidPath`] if the path does not fit the encoding
    pub fn encode_path(&self, path: &[u32], hardened_count: usize) -> Result<Vec<u8>> {
        let encode = path::encoder_for(&self.app_name)?;
        encode(path, hardened_count)
    }

    /// Returns the compressed public key for `path`.
    ///
    /// This command does not ask for confirmation on the device.
    ///
    /// # Errors
    ///
    /// See [`UserApp::derive_address`].
    pub fn get_public_key(&mut self, path: &[u32]) -> Result<[u8; PUBKEY_LEN]> {
        self.derive_address(path, DEFAULT_HRP, false)
            .map(|result| result.pubkey)
    }

    /// Returns the public key and address for `path`, rendered with `hrp`.
    ///
    /// The device shows the address and waits for the user to confirm it.
    ///
    /// # Errors
    ///
    /// See [`UserApp::derive_address`].
    pub fn get_address_pubkey(&mut self, path: &[u32], hrp: &str) -> Result<AddressResult> {
        self.derive_address(path, hrp, true)
    }

    /// Derives the public key and bech32 address for `path`.
    ///
    /// When `require_confirmation` is set the call blocks until the user
    /// approves or rejects the address on the device.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPrefix`] or [`Error::InvalidPrefixCharset`] if `hrp`
    ///   is not a valid bech32 prefix (nothing is sent to the device)
    /// - [`Error::UnsupportedApp`] or [`Error::InvalidPath`] if the path
    ///   cannot be encoded
    /// - [`Error::InvalidResponse`] if the response is truncated
    pub fn derive_address(
        &mut self,
        path: &[u32],
        hrp: &str,
        require_confirmation: bool,
    ) -> Result<AddressResult> {
        address::validate_hrp(hrp)?;
        let path_bytes = self.encode_path(path, HARDENED_COUNT)?;

        let apdu = Apdu::new(
            USER_CLA,
            INS_GET_ADDR_SECP256K1,
            u8::from(require_confirmation),
            0,
            address::request_data(hrp, &path_bytes),
        )?;

        let response = self.exchange(&apdu)?;
        AddressResult::from_response(&response, hrp.len())
    }

    /// Signs `transaction` with the key at `path`.
    ///
    /// The transaction is streamed to the device in 250 byte chunks after a
    /// first packet carrying the path; the device asks the user to review
    /// it and returns the signature in answer to the last chunk.
    ///
    /// An empty transaction sends only the path packet and returns whatever
    /// the device answers to it.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedApp`] or [`Error::InvalidPath`] if the path
    ///   cannot be encoded
    /// - [`Error::DeviceRejected`] if the app refuses the transaction
    /// - [`Error::Status`] for any other failure reported by the device
    pub fn sign(&mut self, path: &[u32], transaction: &[u8]) -> Result<Vec<u8>> {
        let path_bytes = self.encode_path(path, HARDENED_COUNT)?;
        let packets = SignPackets::new(&path_bytes, transaction);
        let total = packets.total();

        if transaction.is_empty() {
            warn!("signing an empty transaction, only the path packet is sent");
        }
        debug!(tx_len = transaction.len(), packets = total, "signing transaction");

        let mut signature = Vec::new();
        for (index, packet) in packets.enumerate() {
            signature = self.exchange(&packet?)?;
            trace!(packet = index + 1, of = total, "signing packet accepted");
        }

        Ok(signature)
    }

    /// Signs `transaction` with the secp256k1 key at `path`.
    ///
    /// Same as [`UserApp::sign`].
    pub fn sign_secp256k1(&mut self, path: &[u32], transaction: &[u8]) -> Result<Vec<u8>> {
        self.sign(path, transaction)
    }

    /// Closes the session and releases the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to close.
    pub fn close(mut self) -> Result<()> {
        match self.transport.take() {
            Some(mut transport) => transport.close(),
            None => Ok(()),
        }
    }

    fn exchange(&mut self, apdu: &Apdu) -> Result<Vec<u8>> {
        let transport = self
            .transport
            .as_deref_mut()
            .ok_or_else(|| Error::Exchange("session is closed".to_string()))?;
        exchange(transport, apdu)
    }
}

impl Drop for UserApp {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take()
            && let Err(err) = transport.close()
        {
            warn!(error = %err, "failed to close transport");
        }
    }
}

/// Sends one command and classifies the device answer.
fn exchange(transport: &mut dyn Transport, apdu: &Apdu) -> Result<Vec<u8>> {
    trace!(
        cla = apdu.cla(),
        ins = apdu.ins(),
        p1 = apdu.p1(),
        lc = apdu.data().len(),
        "sending apdu"
    );

    let raw = transport.exchange(&apdu.to_bytes())?;
    let response = ApduResponse::from_bytes(&raw)?;
    trace!(status = %response.status(), len = response.data().len(), "received response");

    response.into_result()
}

/// Translates "class not supported" into a hint that the app is not open.
fn app_not_open(err: Error) -> Error {
    match err {
        Error::Status(StatusWord::CLA_NOT_SUPPORTED) => Error::AppNotOpen,
        other => other,
    }
}

/// Reads the name of the running app.
fn load_app_name(transport: &mut dyn Transport) -> Result<String> {
    let apdu = Apdu::new(APP_INFO_CLA, INS_GET_APP_NAME, 0, 0, Vec::new())?;
    let response = exchange(transport, &apdu)?;
    parse_app_name(&response)
}

/// Reads the version of the running app.
fn load_version(transport: &mut dyn Transport) -> Result<VersionInfo> {
    let apdu = Apdu::new(USER_CLA, INS_GET_VERSION, 0, 0, Vec::new())?;
    let response = exchange(transport, &apdu)?;
    VersionInfo::from_response(&response)
}

/// Decodes `format_id || name_len || name` from the app name response.
fn parse_app_name(response: &[u8]) -> Result<String> {
    let [format_id, rest @ ..] = response else {
        return Err(Error::InvalidResponse("empty app name response".to_string()));
    };
    if *format_id != APP_NAME_FORMAT_ID {
        return Err(Error::UnrecognizedResponseFormat);
    }

    let name = rest
        .split_first()
        .and_then(|(len, tail)| tail.get(..usize::from(*len)))
        .ok_or_else(|| Error::InvalidResponse("truncated app name".to_string()))?;

    String::from_utf8(name.to_vec())
        .map_err(|e| Error::InvalidResponse(format!("app name is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_app_name_reads_length_prefix() {
        let response = b"\x01\x07Gitopia\x05\x010.1.0";
        assert_eq!(parse_app_name(response).unwrap(), "Gitopia");
    }

    #[test]
    fn parse_app_name_rejects_unknown_format() {
        assert!(matches!(
            parse_app_name(b"\x02\x07Gitopia"),
            Err(Error::UnrecognizedResponseFormat)
        ));
    }

    #[test]
    fn parse_app_name_rejects_truncated_name() {
        assert!(matches!(
            parse_app_name(b"\x01\x09Gitopia"),
            Err(Error::InvalidResponse(_))
        ));
        assert!(matches!(parse_app_name(b"\x01"), Err(Error::InvalidResponse(_))));
        assert!(matches!(parse_app_name(b""), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn parse_app_name_rejects_invalid_utf8() {
        assert!(matches!(
            parse_app_name(b"\x01\x03G\xffa"),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn parse_app_name_allows_empty_name() {
        assert_eq!(parse_app_name(b"\x01\x00").unwrap(), "");
    }

    #[test]
    fn class_not_supported_means_app_not_open() {
        let err = app_not_open(Error::Status(StatusWord::CLA_NOT_SUPPORTED));
        assert!(matches!(err, Error::AppNotOpen));

        let err = app_not_open(Error::Status(StatusWord::INS_NOT_SUPPORTED));
        assert!(matches!(err, Error::Status(StatusWord::INS_NOT_SUPPORTED)));
    }
}
