//! USB HID transport for Ledger devices.
//!
//! This module provides a [`Transport`] implementation on top of `hidapi`,
//! which works on macOS, Linux, and Windows.
//!
//! # HID Framing
//!
//! APDUs are split into 64 byte reports. Every report starts with a
//! five byte header; the first report of a message also carries the total
//! message length:
//!
//! ```text
//! | Channel | Tag  | Sequence | Length (seq 0 only) | Data |
//! |---------|------|----------|---------------------|------|
//! | 2B      | 0x05 | 2B (BE)  | 2B (BE)             | Var  |
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ledger_gitopia::{UserApp, transport::HidTransport};
//!
//! let transport = HidTransport::open()?;
//! let app = UserApp::open(Box::new(transport))?;
//! ```

use std::fmt;

use hidapi::{DeviceInfo, HidApi, HidDevice};
use tracing::debug;

use super::Transport;
use crate::error::{Error, Result};

/// Ledger USB vendor ID.
const LEDGER_VENDOR_ID: u16 = 0x2C97;

/// HID usage page of the Ledger APDU interface.
const LEDGER_USAGE_PAGE: u16 = 0xFFA0;

/// Channel used for every exchange.
const LEDGER_CHANNEL: u16 = 0x0101;

/// Tag marking an APDU report.
const TAG_APDU: u8 = 0x05;

/// Size of one HID report.
const PACKET_SIZE: usize = 64;

/// Size of the per-report header (channel, tag, sequence).
const HEADER_LEN: usize = 5;

/// A USB HID transport for communicating with a Ledger device.
pub struct HidTransport {
    /// The open device, `None` once closed.
    device: Option<HidDevice>,
}

impl fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidTransport")
            .field("open", &self.device.is_some())
            .finish_non_exhaustive()
    }
}

/// Matches the APDU interface of a Ledger device.
fn is_ledger(info: &DeviceInfo) -> bool {
    is_ledger_interface(info.vendor_id(), info.usage_page(), info.interface_number())
}

// Some platforms report no usage page, so interface 0 counts as well.
const fn is_ledger_interface(vendor_id: u16, usage_page: u16, interface_number: i32) -> bool {
    vendor_id == LEDGER_VENDOR_ID && (usage_page == LEDGER_USAGE_PAGE || interface_number == 0)
}

impl HidTransport {
    /// Opens the first Ledger device found on the system.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportUnavailable`] if HID cannot be initialized,
    /// no Ledger is connected, or the device cannot be opened.
    pub fn open() -> Result<Self> {
        let api = HidApi::new()
            .map_err(|e| Error::TransportUnavailable(format!("failed to initialize HID: {e}")))?;

        let info = api
            .device_list()
            .find(|info| is_ledger(info))
            .ok_or_else(|| Error::TransportUnavailable("no Ledger device found".to_string()))?;

        debug!(
            product = info.product_string().unwrap_or_default(),
            product_id = info.product_id(),
            "opening Ledger device"
        );

        let device = info
            .open_device(&api)
            .map_err(|e| Error::TransportUnavailable(format!("failed to open device: {e}")))?;

        Ok(Self {
            device: Some(device),
        })
    }

    /// Lists the product names of all connected Ledger devices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportUnavailable`] if HID cannot be initialized.
    pub fn list_devices() -> Result<Vec<String>> {
        let api = HidApi::new()
            .map_err(|e| Error::TransportUnavailable(format!("failed to initialize HID: {e}")))?;

        Ok(api
            .device_list()
            .filter(|info| is_ledger(info))
            .map(|info| info.product_string().unwrap_or("Ledger").to_string())
            .collect())
    }

    fn device(&self) -> Result<&HidDevice> {
        self.device
            .as_ref()
            .ok_or_else(|| Error::Exchange("transport is closed".to_string()))
    }

    fn write_message(&self, command: &[u8]) -> Result<()> {
        let device = self.device()?;

        for report in frame_message(command)? {
            // hidapi expects the report ID in front of the payload.
            let mut buffer = Vec::with_capacity(PACKET_SIZE + 1);
            buffer.push(0x00);
            buffer.extend_from_slice(&report);

            let written = device
                .write(&buffer)
                .map_err(|e| Error::Exchange(format!("HID write failed: {e}")))?;
            if written < buffer.len() {
                return Err(Error::Exchange(format!(
                    "HID write truncated: {written} of {} bytes",
                    buffer.len()
                )));
            }
        }

        Ok(())
    }

    fn read_message(&self) -> Result<Vec<u8>> {
        let device = self.device()?;
        let mut reassembly = Reassembly::default();

        loop {
            let mut report = [0u8; PACKET_SIZE];
            let read = device
                .read(&mut report)
                .map_err(|e| Error::Exchange(format!("HID read failed: {e}")))?;

            if let Some(message) = reassembly.push(&report[..read])? {
                return Ok(message);
            }
        }
    }
}

impl Transport for HidTransport {
    fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        self.write_message(command)?;
        self.read_message()
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the handle closes the device.
        self.device.take();
        Ok(())
    }
}

/// Splits a serialized APDU into zero-padded HID reports.
fn frame_message(command: &[u8]) -> Result<Vec<[u8; PACKET_SIZE]>> {
    let total = u16::try_from(command.len())
        .map_err(|_| Error::CommandTooLong(command.len()))?;

    let mut message = Vec::with_capacity(command.len() + 2);
    message.extend_from_slice(&total.to_be_bytes());
    message.extend_from_slice(command);

    message
        .chunks(PACKET_SIZE - HEADER_LEN)
        .enumerate()
        .map(|(sequence, chunk)| {
            let sequence = u16::try_from(sequence)
                .map_err(|_| Error::CommandTooLong(command.len()))?;

            let mut report = [0u8; PACKET_SIZE];
            report[..2].copy_from_slice(&LEDGER_CHANNEL.to_be_bytes());
            report[2] = TAG_APDU;
            report[3..5].copy_from_slice(&sequence.to_be_bytes());
            report[HEADER_LEN..HEADER_LEN + chunk.len()].copy_from_slice(chunk);
            Ok(report)
        })
        .collect()
}

/// Reassembles a response from HID reports.
#[derive(Debug, Default)]
struct Reassembly {
    expected_len: Option<usize>,
    sequence: u16,
    data: Vec<u8>,
}

impl Reassembly {
    /// Adds one report, returning the full message once it is complete.
    fn push(&mut self, report: &[u8]) -> Result<Option<Vec<u8>>> {
        if report.len() < HEADER_LEN {
            return Err(Error::Exchange(format!(
                "HID report too short: {} bytes",
                report.len()
            )));
        }

        let channel = u16::from_be_bytes([report[0], report[1]]);
        let sequence = u16::from_be_bytes([report[3], report[4]]);
        if channel != LEDGER_CHANNEL || report[2] != TAG_APDU {
            return Err(Error::Exchange(format!(
                "unexpected HID report header: channel {channel:#06x}, tag {:#04x}",
                report[2]
            )));
        }
        if sequence != self.sequence {
            return Err(Error::Exchange(format!(
                "HID report out of order: expected {}, got {sequence}",
                self.sequence
            )));
        }

        let mut body = &report[HEADER_LEN..];
        let expected_len = match self.expected_len {
            Some(len) => len,
            None => {
                let [hi, lo, rest @ ..] = body else {
                    return Err(Error::Exchange("HID report missing length".to_string()));
                };
                let len = usize::from(u16::from_be_bytes([*hi, *lo]));
                body = rest;
                self.expected_len = Some(len);
                len
            }
        };

        let take = body.len().min(expected_len - self.data.len());
        self.data.extend_from_slice(&body[..take]);
        self.sequence = self.sequence.wrapping_add(1);

        if self.data.len() == expected_len {
            return Ok(Some(std::mem::take(&mut self.data)));
        }

        Ok(None)
    }
}
