//! Cycle server demo - publishes a synchro and signals it twice a second.
//!
//! Run this first, then the `client` example in another terminal:
//! ```bash
//! cargo run --example server
//! cargo run --example client
//! ```

use std::thread;
use std::time::Duration;
use synchro_core::{NamingMode, PlatformSynchro, Synchro};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mode = NamingMode::from_env();
    let mut synchro = PlatformSynchro::default();
    synchro.allocate("demo_client", "demo_server", mode, 0)?;
    println!("Published {}", synchro.name().unwrap_or_default());
    println!("Signaling every 500ms. Press Ctrl+C to exit...");

    loop {
        thread::sleep(Duration::from_millis(500));
        synchro.signal()?;
    }
}
