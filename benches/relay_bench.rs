//! Benchmarks for the relay core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ecg_hub::websocket::broadcast::forward;
use ecg_hub::websocket::{Command, ConnectionId, Registry};
use tokio::sync::mpsc;

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let payloads = [
        ("publish", r#"{"publish": 72.5}"#),
        ("subscribe", r#"{"subscribe": "9b2f6a2e-8f63-4f4e-9a53-6f7c2d1e0b11"}"#),
        ("name", r#"{"name": "HeartbeatSensor42"}"#),
        ("unrecognized", r#"{"register": "legacy"}"#),
    ];

    for (label, payload) in payloads {
        group.bench_function(label, |b| b.iter(|| Command::decode(black_box(payload))));
    }

    group.finish();
}

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");

    for size in [1usize, 10, 100] {
        let mut registry = Registry::new();
        let source = ConnectionId::new(0);
        let (tx, _source_rx) = mpsc::unbounded_channel();
        let source_uuid = registry.add(source, tx);

        let mut receivers = Vec::with_capacity(size);
        for i in 1..=size as u64 {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.add(ConnectionId::new(i), tx);
            registry.add_listener(&source_uuid, ConnectionId::new(i));
            receivers.push(rx);
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("listeners_{}", size), |b| {
            b.iter(|| {
                let listeners = registry.listeners_of(source).unwrap_or_default();
                let delivery = forward(black_box(&listeners), r#"{"publish":72.5}"#);
                for rx in receivers.iter_mut() {
                    while rx.try_recv().is_ok() {}
                }
                delivery
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_forward);
criterion_main!(benches);
