//! Packet planning for multi-packet signing.
//!
//! A transaction of `L` bytes is sent as `1 + ceil(L / 250)` packets:
//!
//! ```text
//! | Packet    | P1 | Data                         |
//! |-----------|----|------------------------------|
//! | 1         | 0  | encoded derivation path      |
//! | 2..n-1    | 1  | next 250 transaction bytes   |
//! | n         | 2  | remaining 1..=250 bytes      |
//! ```
//!
//! [`SignPackets`] walks the transaction with a cursor and yields the
//! commands in order; the session exchanges them and keeps the last response.

use crate::apdu::Apdu;
use crate::constants::{INS_SIGN_SECP256K1, MESSAGE_CHUNK_SIZE, USER_CLA, payload};
use crate::error::Result;

/// Number of packets needed to sign a transaction of `tx_len` bytes.
#[must_use]
pub const fn packet_count(tx_len: usize) -> usize {
    1 + tx_len.div_ceil(MESSAGE_CHUNK_SIZE)
}

/// Iterator over the signing commands for one transaction.
#[derive(Debug, Clone)]
pub struct SignPackets<'a> {
    path_bytes: &'a [u8],
    transaction: &'a [u8],
    /// Offset of the first transaction byte not yet emitted.
    cursor: usize,
    /// 1-based index of the next packet.
    next_index: usize,
    count: usize,
}

impl<'a> SignPackets<'a> {
    /// Plans the packets for `transaction`, signed with the key at `path_bytes`.
    #[must_use]
    pub const fn new(path_bytes: &'a [u8], transaction: &'a [u8]) -> Self {
        Self {
            path_bytes,
            transaction,
            cursor: 0,
            next_index: 1,
            count: packet_count(transaction.len()),
        }
    }

    /// Total number of packets, including the path packet.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.count
    }

    fn build(&mut self, index: usize) -> Result<Apdu> {
        if index == 1 {
            return Apdu::new(
                USER_CLA,
                INS_SIGN_SECP256K1,
                payload::INIT,
                0,
                self.path_bytes.to_vec(),
            );
        }

        let remaining = &self.transaction[self.cursor..];
        let chunk = &remaining[..remaining.len().min(MESSAGE_CHUNK_SIZE)];
        let marker = if index == self.count {
            payload::LAST
        } else {
            payload::ADD
        };

        let apdu = Apdu::new(USER_CLA, INS_SIGN_SECP256K1, marker, 0, chunk.to_vec())?;
        self.cursor += chunk.len();
        Ok(apdu)
    }
}

impl Iterator for SignPackets<'_> {
    type Item = Result<Apdu>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index > self.count {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;
        Some(self.build(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count + 1 - self.next_index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SignPackets<'_> {}
