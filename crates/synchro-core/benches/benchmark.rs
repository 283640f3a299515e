//! Performance benchmarks for synchro
//!
//! Run with: cargo bench --package synchro-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::SystemTime;
use synchro_core::{NamingMode, PlatformSynchro, Synchro};

fn unique_client() -> String {
    let ts = SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("bench_{}", ts)
}

fn bench_signal_then_wait(c: &mut Criterion) {
    let client = unique_client();
    let mut synchro = PlatformSynchro::default();
    synchro
        .allocate(&client, "bench", NamingMode::UserScoped, 0)
        .unwrap();

    c.bench_function("signal_then_wait", |b| {
        b.iter(|| {
            synchro.signal().unwrap();
            black_box(synchro.wait().unwrap());
        });
    });

    synchro.destroy();
}

fn bench_signal_already_pending(c: &mut Criterion) {
    let client = unique_client();
    let mut synchro = PlatformSynchro::default();
    synchro
        .allocate(&client, "bench", NamingMode::UserScoped, 0)
        .unwrap();
    synchro.signal().unwrap();

    // the pending signal is never consumed, so every iteration takes the
    // syscall-free path
    c.bench_function("signal_already_pending", |b| {
        b.iter(|| black_box(synchro.signal().unwrap()));
    });

    synchro.destroy();
}

criterion_group!(benches, bench_signal_then_wait, bench_signal_already_pending);
criterion_main!(benches);
