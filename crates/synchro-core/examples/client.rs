//! Cycle client demo - attaches to the server's synchro and waits for cycles.
//!
//! Run the `server` example first.

use std::thread;
use std::time::Duration;
use synchro_core::{Error, NamingMode, PlatformSynchro, Synchro};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mode = NamingMode::from_env();
    let mut synchro = PlatformSynchro::default();

    loop {
        match synchro.connect("demo_client", "demo_server", mode) {
            Ok(()) => break,
            Err(e) => {
                println!("Waiting for server: {}", e);
                thread::sleep(Duration::from_millis(500));
            }
        }
    }
    println!("Attached to {}", synchro.name().unwrap_or_default());

    let mut cycles = 0u64;
    loop {
        match synchro.timed_wait(2_000_000) {
            Ok(()) => {
                cycles += 1;
                println!("cycle {}", cycles);
            }
            Err(Error::Timeout) => println!("no cycle within 2s, still waiting"),
            Err(e) => return Err(e.into()),
        }
    }
}
