//! Ledger Gitopia Driver
//!
//! This crate talks to the Gitopia (and Cosmos) user app running on a Ledger
//! hardware wallet. The device holds the keys and performs every
//! cryptographic operation; the host builds APDU commands, streams
//! transactions in chunks, and decodes the answers.
//!
//! # Overview
//!
//! This library provides:
//!
//! - **Session Setup**: app identification, version retrieval, and an
//!   optional compatibility policy
//! - **Address Derivation**: compressed secp256k1 public keys and bech32
//!   addresses for BIP32 paths
//! - **Transaction Signing**: multi-packet signing of arbitrary payloads
//! - **Transport Abstraction**: any link implementing [`Transport`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 UserApp (session, commands)                 │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌────────────────┐  │
//! │  │  Path   │  │ Address │  │  Sign   │  │    Version     │  │
//! │  │ Encode  │  │  Parse  │  │ Packets │  │    Policy      │  │
//! │  └─────────┘  └─────────┘  └─────────┘  └────────────────┘  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 APDU encoding / status words                │
//! ├─────────────────────────────────────────────────────────────┤
//! │              Transport (USB HID / simulator / mock)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use ledger_gitopia::{UserApp, transport::HidTransport};
//!
//! let transport = HidTransport::open()?;
//! let mut app = UserApp::open(Box::new(transport))?;
//! println!("{} {}", app.app_name(), app.version());
//!
//! let path = [44, 118, 0, 0, 0];
//! let address = app.get_address_pubkey(&path, "gitopia")?;
//! println!("Address: {}", address.address);
//!
//! let signature = app.sign_secp256k1(&path, tx_json.as_bytes())?;
//! ```
//!
//! # Feature Flags
//!
//! - `hid` -- USB HID transport for real Ledger devices (via `hidapi`)
//!
//! # Logging
//!
//! Session events are emitted through [`tracing`]; install a subscriber to
//! see them. Transaction contents are never logged.

// Modules
pub mod address;
pub mod apdu;
pub mod app;
pub mod constants;
pub mod error;
pub mod path;
pub mod sign;
pub mod transport;
pub mod version;

// Re-exports for convenience
pub use address::AddressResult;
pub use app::UserApp;
pub use error::{Error, Result};
pub use transport::Transport;
pub use version::{AcceptAll, CompatibilityPolicy, MinimumVersion, VersionInfo};
