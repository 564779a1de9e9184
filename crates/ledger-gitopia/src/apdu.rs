//! APDU command and response types for Ledger apps.
//!
//! Ledger apps speak a simplified ISO 7816-4 dialect: every command carries
//! a five byte header, even when it has no data, and every response ends in
//! a two byte status word.
//!
//! # APDU Command Structure
//!
//! ```text
//! | CLA | INS | P1 | P2 | Lc | Data  |
//! |-----|-----|----|----|----|-------|
//! | 1B  | 1B  | 1B | 1B | 1B | 0-255 |
//! ```
//!
//! # APDU Response Structure
//!
//! ```text
//! | Data | SW1 | SW2 |
//! |------|-----|-----|
//! | Var  | 1B  | 1B  |
//! ```
//!
//! # Example
//!
//! ```
//! use ledger_gitopia::apdu::{Apdu, ApduResponse};
//!
//! let apdu = Apdu::new(0x55, 0x00, 0x00, 0x00, vec![]).unwrap();
//! assert_eq!(apdu.to_bytes(), vec![0x55, 0x00, 0x00, 0x00, 0x00]);
//!
//! let response = ApduResponse::from_bytes(&[0x00, 0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();
//! assert!(response.is_success());
//! ```

use core::fmt;

use crate::error::{Error, Result};

/// An APDU command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    /// Class byte.
    cla: u8,

    /// Instruction byte.
    ins: u8,

    /// Parameter 1.
    p1: u8,

    /// Parameter 2.
    p2: u8,

    /// Command data.
    data: Vec<u8>,
}

impl Apdu {
    /// Size of the command header (`CLA INS P1 P2 Lc`).
    pub const HEADER_LEN: usize = 5;

    /// Maximum data length of a short APDU.
    pub const MAX_DATA: usize = 255;

    /// Creates a new APDU command.
    ///
    /// The `Lc` byte is derived from `data` when the command is serialized,
    /// so callers assemble the full payload first and never patch lengths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandTooLong`] if `data` exceeds [`Apdu::MAX_DATA`].
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Result<Self> {
        if data.len() > Self::MAX_DATA {
            return Err(Error::CommandTooLong(data.len()));
        }

        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
        })
    }

    /// Returns the class byte.
    #[must_use]
    pub const fn cla(&self) -> u8 {
        self.cla
    }

    /// Returns the instruction byte.
    #[must_use]
    pub const fn ins(&self) -> u8 {
        self.ins
    }

    /// Returns parameter 1.
    #[must_use]
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Returns parameter 2.
    #[must_use]
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Returns the command data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serializes the command to the bytes handed to the transport.
    ///
    /// # Example
    ///
    /// ```
    /// use ledger_gitopia::apdu::Apdu;
    ///
    /// let apdu = Apdu::new(0x55, 0x02, 0x01, 0x00, vec![0xAA, 0xBB]).unwrap();
    /// assert_eq!(apdu.to_bytes(), vec![0x55, 0x02, 0x01, 0x00, 0x02, 0xAA, 0xBB]);
    /// ```
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::HEADER_LEN + self.data.len());

        bytes.push(self.cla);
        bytes.push(self.ins);
        bytes.push(self.p1);
        bytes.push(self.p2);
        // Bounded by MAX_DATA in the constructor.
        bytes.push(self.data.len() as u8);
        bytes.extend_from_slice(&self.data);

        bytes
    }
}

/// A two byte status word closing every Ledger response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// No errors.
    pub const OK: Self = Self(0x9000);
    /// Execution error.
    pub const EXECUTION_ERROR: Self = Self(0x6400);
    /// Wrong length.
    pub const WRONG_LENGTH: Self = Self(0x6700);
    /// Empty buffer.
    pub const EMPTY_BUFFER: Self = Self(0x6982);
    /// Output buffer too small.
    pub const OUTPUT_BUFFER_TOO_SMALL: Self = Self(0x6983);
    /// Referenced data invalidated; the app may attach a message.
    pub const DATA_INVALID: Self = Self(0x6984);
    /// Conditions of use not satisfied.
    pub const CONDITIONS_NOT_SATISFIED: Self = Self(0x6985);
    /// Command not allowed, also used when the user rejects on device.
    pub const COMMAND_NOT_ALLOWED: Self = Self(0x6986);
    /// Parameters in the data field are incorrect; the app may attach a message.
    pub const BAD_KEY_HANDLE: Self = Self(0x6A80);
    /// Invalid P1 or P2.
    pub const INVALID_P1P2: Self = Self(0x6B00);
    /// Instruction not supported.
    pub const INS_NOT_SUPPORTED: Self = Self(0x6D00);
    /// Class not supported, i.e. the expected app is not running.
    pub const CLA_NOT_SUPPORTED: Self = Self(0x6E00);
    /// Unknown error.
    pub const UNKNOWN: Self = Self(0x6F00);
    /// Sign or verify error.
    pub const SIGN_VERIFY_ERROR: Self = Self(0x6F01);

    /// Returns the symbolic name and description of a known status word.
    #[must_use]
    pub const fn describe(self) -> Option<(&'static str, &'static str)> {
        let described = match self.0 {
            0x9000 => ("APDU_CODE_OK", "No errors"),
            0x6400 => ("APDU_CODE_EXECUTION_ERROR", "Execution Error"),
            0x6700 => ("APDU_CODE_WRONG_LENGTH", "Wrong length"),
            0x6982 => ("APDU_CODE_EMPTY_BUFFER", "Empty buffer"),
            0x6983 => ("APDU_CODE_OUTPUT_BUFFER_TOO_SMALL", "Output buffer too small"),
            0x6984 => (
                "APDU_CODE_DATA_INVALID",
                "Referenced data reversibly blocked (invalidated)",
            ),
            0x6985 => (
                "APDU_CODE_CONDITIONS_NOT_SATISFIED",
                "Conditions of use not satisfied",
            ),
            0x6986 => (
                "APDU_CODE_COMMAND_NOT_ALLOWED",
                "Command not allowed (no current EF)",
            ),
            0x6A80 => (
                "APDU_CODE_BAD_KEY_HANDLE",
                "The parameters in the data field are incorrect",
            ),
            0x6B00 => ("APDU_CODE_INVALID_P1P2", "Invalid P1/P2"),
            0x6D00 => ("APDU_CODE_INS_NOT_SUPPORTED", "Instruction not supported"),
            0x6E00 => ("APDU_CODE_CLA_NOT_SUPPORTED", "Class not supported"),
            0x6F00 => ("APDU_CODE_UNKNOWN", "Unknown error"),
            0x6F01 => ("APDU_CODE_SIGN_VERIFY_ERROR", "Sign/verify error"),
            _ => return None,
        };
        Some(described)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.describe() {
            Some((name, description)) => write!(f, "[{name}] {description}"),
            None => write!(f, "unknown status word {:#06x}", self.0),
        }
    }
}

/// An APDU response from a Ledger app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response data.
    data: Vec<u8>,

    /// Trailing status word.
    status: StatusWord,
}

impl ApduResponse {
    /// Parses a raw response (`data || SW1 || SW2`) returned by a transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if fewer than two bytes were returned.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some((data, sw)) = bytes.split_last_chunk::<2>() else {
            return Err(Error::InvalidResponse(format!(
                "expected a status word, got {} bytes",
                bytes.len()
            )));
        };

        Ok(Self {
            data: data.to_vec(),
            status: StatusWord(u16::from_be_bytes(*sw)),
        })
    }

    /// Returns the response data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the status word.
    #[must_use]
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Checks if the response indicates success (`SW = 0x9000`).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.0 == StatusWord::OK.0
    }

    /// Consumes the response, returning its data on success or the
    /// classified error otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceRejected`] if the app refused the data and attached a
    ///   diagnostic message
    /// - [`Error::Status`] for any other non-success status word
    pub fn into_result(self) -> Result<Vec<u8>> {
        if self.is_success() {
            return Ok(self.data);
        }

        Err(self.into_error())
    }

    fn into_error(self) -> Error {
        if self.data.is_empty() {
            return Error::Status(self.status);
        }

        let message = String::from_utf8_lossy(&self.data);
        match self.status {
            StatusWord::BAD_KEY_HANDLE => {
                Error::DeviceRejected(parser_error_message(&message).to_string())
            }
            StatusWord::DATA_INVALID => Error::DeviceRejected(message.into_owned()),
            status => Error::Status(status),
        }
    }
}

/// Maps the transaction parser diagnostics of the app to readable messages.
fn parser_error_message(message: &str) -> &str {
    match message {
        "ERROR: JSMN_ERROR_NOMEM" => "Not enough tokens were provided",
        "PARSER ERROR: JSMN_ERROR_INVAL" => "Unexpected character in JSON string",
        "PARSER ERROR: JSMN_ERROR_PART" => "The JSON string is not a complete.",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apdu_new() {
        let apdu = Apdu::new(0x55, 0x04, 0x01, 0x00, vec![0xA0, 0x00]).unwrap();

        assert_eq!(apdu.cla(), 0x55);
        assert_eq!(apdu.ins(), 0x04);
        assert_eq!(apdu.p1(), 0x01);
        assert_eq!(apdu.p2(), 0x00);
        assert_eq!(apdu.data(), &[0xA0, 0x00]);
    }

    #[test]
    fn apdu_to_bytes_no_data_keeps_lc() {
        let apdu = Apdu::new(0xB0, 0x01, 0x00, 0x00, vec![]).unwrap();

        assert_eq!(apdu.to_bytes(), vec![0xB0, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn apdu_to_bytes_max_data() {
        let apdu = Apdu::new(0x55, 0x02, 0x02, 0x00, vec![0x11; 255]).unwrap();
        let bytes = apdu.to_bytes();

        assert_eq!(bytes.len(), 260);
        assert_eq!(bytes[4], 0xFF);
    }

    #[test]
    fn apdu_rejects_oversized_data() {
        let err = Apdu::new(0x55, 0x02, 0x01, 0x00, vec![0; 256]).unwrap_err();
        assert!(matches!(err, Error::CommandTooLong(256)));
    }

    #[test]
    fn response_from_bytes() {
        let response = ApduResponse::from_bytes(&[0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();

        assert_eq!(response.data(), &[0x01, 0x02, 0x03]);
        assert_eq!(response.status(), StatusWord::OK);
        assert!(response.is_success());
    }

    #[test]
    fn response_too_short() {
        let err = ApduResponse::from_bytes(&[0x90]).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn into_result_success() {
        let response = ApduResponse::from_bytes(&[0xAB, 0x90, 0x00]).unwrap();
        assert_eq!(response.into_result().unwrap(), vec![0xAB]);
    }

    #[test]
    fn into_result_raw_status() {
        let response = ApduResponse::from_bytes(&[0x6E, 0x00]).unwrap();
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, Error::Status(StatusWord::CLA_NOT_SUPPORTED)));
    }

    #[test]
    fn into_result_bad_key_handle_without_message() {
        let response = ApduResponse::from_bytes(&[0x6A, 0x80]).unwrap();
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, Error::Status(StatusWord::BAD_KEY_HANDLE)));
    }

    #[test]
    fn into_result_maps_parser_errors() {
        let mut raw = b"PARSER ERROR: JSMN_ERROR_INVAL".to_vec();
        raw.extend_from_slice(&[0x6A, 0x80]);

        let err = ApduResponse::from_bytes(&raw).unwrap().into_result().unwrap_err();
        assert_eq!(err.to_string(), "Unexpected character in JSON string");
    }

    #[test]
    fn into_result_surfaces_unknown_messages() {
        let mut raw = b"Unexpected field".to_vec();
        raw.extend_from_slice(&[0x6A, 0x80]);

        let err = ApduResponse::from_bytes(&raw).unwrap().into_result().unwrap_err();
        assert!(matches!(err, Error::DeviceRejected(ref msg) if msg == "Unexpected field"));
    }

    #[test]
    fn into_result_data_invalid_message() {
        let mut raw = b"Invalid chain ID".to_vec();
        raw.extend_from_slice(&[0x69, 0x84]);

        let err = ApduResponse::from_bytes(&raw).unwrap().into_result().unwrap_err();
        assert_eq!(err.to_string(), "Invalid chain ID");
    }

    #[test]
    fn status_word_display() {
        assert_eq!(
            StatusWord::BAD_KEY_HANDLE.to_string(),
            "[APDU_CODE_BAD_KEY_HANDLE] The parameters in the data field are incorrect"
        );
        assert_eq!(StatusWord(0x6A82).to_string(), "unknown status word 0x6a82");
    }
}
