//! Gitopia Ledger CLI Example
//!
//! This example shows how to use the driver with the native USB HID
//! transport on macOS, Linux, and Windows.
//!
//! # Prerequisites
//!
//! - A Ledger Nano S/S+/X with the Gitopia app installed
//! - The device unlocked and the Gitopia app open
//! - On Linux, the Ledger udev rules installed for non-root access
//!
//! # Usage
//!
//! ```bash
//! cargo run --example gitopia-ledger-cli --features hid -- info
//! cargo run --example gitopia-ledger-cli --features hid -- address
//! cargo run --example gitopia-ledger-cli --features hid -- sign '{"chain_id":"gitopia"}'
//! ```
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `list` | List connected Ledger devices |
//! | `info` | Show the running app name and version |
//! | `pubkey [account]` | Print the compressed public key |
//! | `address [account]` | Show the address on the device and print it |
//! | `sign <json>` | Sign a transaction (review on the device) |
//!
//! Set `RUST_LOG=ledger_gitopia=trace` to see every APDU exchanged.

#![expect(unused_crate_dependencies, reason = "needed for CLI example")]

use std::env;

use ledger_gitopia::transport::HidTransport;
use ledger_gitopia::{MinimumVersion, UserApp};
use tracing_subscriber::EnvFilter;

/// Cosmos SDK coin type used by Gitopia.
const COIN_TYPE: u32 = 118;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "list" => cmd_list(),
        "info" => cmd_info(),
        "pubkey" => cmd_pubkey(&args[2..]),
        "address" => cmd_address(&args[2..]),
        "sign" => cmd_sign(&args[2..]),
        "--help" | "-h" | "help" => print_help(),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_help();
        }
    }
}

fn print_help() {
    println!(
        r#"Gitopia Ledger CLI

USAGE:
    gitopia-ledger-cli <COMMAND>

COMMANDS:
    list               List connected Ledger devices
    info               Show the running app name and version
    pubkey [account]   Print the compressed public key
    address [account]  Show the address on the device and print it
    sign <json>        Sign a transaction (review on the device)
    help               Show this help message
"#
    );
}

fn connect() -> Option<UserApp> {
    let transport = match HidTransport::open() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to connect: {e}");
            return None;
        }
    };

    match UserApp::open_with_policy(Box::new(transport), &MinimumVersion::recommended()) {
        Ok(app) => Some(app),
        Err(e) => {
            eprintln!("Failed to open app: {e}");
            None
        }
    }
}

fn path_for(args: &[String]) -> Option<[u32; 5]> {
    let account = match args.first() {
        Some(arg) => match arg.parse() {
            Ok(account) => account,
            Err(e) => {
                eprintln!("Invalid account {arg:?}: {e}");
                return None;
            }
        },
        None => 0,
    };

    Some([44, COIN_TYPE, account, 0, 0])
}

fn cmd_list() {
    match HidTransport::list_devices() {
        Ok(devices) if devices.is_empty() => {
            println!("No Ledger devices found.");
            println!("\nMake sure the device is plugged in and unlocked.");
        }
        Ok(devices) => {
            println!("Found {} Ledger device(s):\n", devices.len());
            for (i, device) in devices.iter().enumerate() {
                println!("  [{}] {}", i + 1, device);
            }
        }
        Err(e) => eprintln!("Error listing devices: {e}"),
    }
}

fn cmd_info() {
    let Some(app) = connect() else { return };

    println!("App:     {}", app.app_name());
    println!("Version: {}", app.version());
    println!("Mode:    {}", app.version().app_mode);

    if let Err(e) = app.close() {
        eprintln!("Failed to close device: {e}");
    }
}

fn cmd_pubkey(args: &[String]) {
    let Some(path) = path_for(args) else { return };
    let Some(mut app) = connect() else { return };

    match app.get_public_key(&path) {
        Ok(pubkey) => println!("{}", hex::encode(pubkey)),
        Err(e) => eprintln!("Failed to get public key: {e}"),
    }
}

fn cmd_address(args: &[String]) {
    let Some(path) = path_for(args) else { return };
    let Some(mut app) = connect() else { return };

    println!("Confirm the address on your Ledger...");

    match app.get_address_pubkey(&path, "gitopia") {
        Ok(result) => {
            println!();
            println!("Public Key (compressed):");
            println!("  {}", hex::encode(result.pubkey));
            println!();
            println!("Address:");
            println!("  {}", result.address);
        }
        Err(e) => eprintln!("Failed to get address: {e}"),
    }
}

fn cmd_sign(args: &[String]) {
    let Some(tx) = args.first() else {
        eprintln!("Usage: sign <json>");
        return;
    };
    let Some(mut app) = connect() else { return };

    println!("Review the transaction on your Ledger...");

    match app.sign(&[44, COIN_TYPE, 0, 0, 0], tx.as_bytes()) {
        Ok(signature) => {
            println!();
            println!("Signature (DER):");
            println!("  {}", hex::encode(signature));
        }
        Err(e) => eprintln!("Signing failed: {e}"),
    }
}
