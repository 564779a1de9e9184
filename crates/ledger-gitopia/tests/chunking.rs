//! Property tests for transaction chunking during signing.

// Silence unused crate dependency warnings for test binary
#[cfg(feature = "hid")]
use hidapi as _;
use hex as _;
use serde as _;
use serde_json as _;
use thiserror as _;
use tracing as _;
use tracing_subscriber as _;

mod common;

use common::{MockTransport, PATH, gitopia_open, ok, path_bytes};
use ledger_gitopia::UserApp;
use proptest::prelude::*;

const CHUNK: usize = 250;

/// Signs `tx` against a device that accepts every packet and returns the
/// commands it received after the session was opened.
fn signed_commands(tx: &[u8]) -> (Vec<u8>, Vec<Vec<u8>>) {
    let (transport, recorder) = MockTransport::new(gitopia_open());
    let transport = transport.with_fallback(ok(b"signature").unwrap());
    let mut app = UserApp::open(Box::new(transport)).unwrap();

    let signature = app.sign(&PATH, tx).unwrap();
    let commands = recorder.borrow().commands[2..].to_vec();
    (signature, commands)
}

proptest! {
    #[test]
    fn packet_count_matches_chunking(tx in prop::collection::vec(any::<u8>(), 0..1600)) {
        let (_, commands) = signed_commands(&tx);

        prop_assert_eq!(commands.len(), 1 + tx.len().div_ceil(CHUNK));
    }

    #[test]
    fn chunks_reconstruct_transaction(tx in prop::collection::vec(any::<u8>(), 0..1600)) {
        let (_, commands) = signed_commands(&tx);

        let mut priming = vec![0x55, 0x02, 0x00, 0x00, 20];
        priming.extend_from_slice(&path_bytes());
        prop_assert_eq!(&commands[0], &priming);

        let rebuilt: Vec<u8> = commands[1..]
            .iter()
            .flat_map(|command| {
                assert_eq!(usize::from(command[4]), command.len() - 5);
                command[5..].to_vec()
            })
            .collect();
        prop_assert_eq!(rebuilt, tx);
    }

    #[test]
    fn only_the_final_packet_is_marked_last(tx in prop::collection::vec(any::<u8>(), 1..1600)) {
        let (signature, commands) = signed_commands(&tx);
        let (last, middle) = commands[1..].split_last().unwrap();

        prop_assert_eq!(last[2], 0x02);
        prop_assert!(last.len() - 5 <= CHUNK && last.len() > 5);
        for command in middle {
            prop_assert_eq!(command[2], 0x01);
            prop_assert_eq!(command.len() - 5, CHUNK);
        }
        prop_assert_eq!(signature, b"signature".to_vec());
    }
}
