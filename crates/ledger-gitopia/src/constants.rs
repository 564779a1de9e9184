//! Protocol constants for the Gitopia user app.

/// Class byte of every user app command.
pub const USER_CLA: u8 = 0x55;

/// Instruction returning the app version.
pub const INS_GET_VERSION: u8 = 0x00;

/// Instruction signing a transaction with the secp256k1 key.
pub const INS_SIGN_SECP256K1: u8 = 0x02;

/// Instruction returning the compressed secp256k1 public key and address.
pub const INS_GET_ADDR_SECP256K1: u8 = 0x04;

/// Class byte of the dashboard command returning the running app name.
pub const APP_INFO_CLA: u8 = 0xB0;

/// Instruction returning the running app name.
pub const INS_GET_APP_NAME: u8 = 0x01;

/// Format marker expected in the first byte of the app name response.
pub const APP_NAME_FORMAT_ID: u8 = 1;

/// Maximum transaction bytes carried by one signing packet.
pub const MESSAGE_CHUNK_SIZE: usize = 250;

/// Signing packet markers carried in P1.
pub mod payload {
    /// First packet, carrying the derivation path.
    pub const INIT: u8 = 0;
    /// More transaction bytes follow this packet.
    pub const ADD: u8 = 1;
    /// Last packet of the transaction.
    pub const LAST: u8 = 2;
}

/// Length of a compressed secp256k1 public key.
pub const PUBKEY_LEN: usize = 33;

/// Maximum length of a bech32 human-readable part (BIP-173).
pub const MAX_HRP_LEN: usize = 83;

/// Address prefix used when only the public key is requested.
pub const DEFAULT_HRP: &str = "gitopia";

/// Number of leading path elements that are hardened.
pub const HARDENED_COUNT: usize = 3;

/// Name advertised by the Gitopia user app.
pub const GITOPIA_APP_NAME: &str = "Gitopia";

/// Name advertised by the Cosmos user app.
pub const COSMOS_APP_NAME: &str = "Cosmos";
