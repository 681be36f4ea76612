use axum::extract::ws::Message;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use device_relay::registry::{Device, DeviceRegistry};
use device_relay::relay::envelope::Envelope;
use device_relay::relay::websocket::{RelayState, OUTBOUND_QUEUE_CAPACITY};
use std::hint::black_box;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

fn setup_registry() -> (TempDir, DeviceRegistry) {
    let temp_dir = TempDir::new().unwrap();
    let registry = DeviceRegistry::load(temp_dir.path().join("bench-devices.json")).unwrap();
    (temp_dir, registry)
}

fn bench_device_add(c: &mut Criterion) {
    c.bench_function("device_add", |b| {
        b.iter(|| {
            let (_temp_dir, mut registry) = setup_registry();
            registry.add(Device::new("bench-device")).unwrap();
        });
    });
}

fn bench_status_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_update");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let (_temp_dir, mut registry) = setup_registry();
                for i in 0..size {
                    registry.add(Device::new(format!("device-{}", i))).unwrap();
                }

                let target = format!("device-{}", size / 2);
                black_box(registry.update_status(&target, "online").unwrap());
            });
        });
    }

    group.finish();
}

fn bench_envelope_parse(c: &mut Criterion) {
    let frame = r#"{"type":"status","device":"sensor-42","status":"online","command":"blink"}"#;

    c.bench_function("envelope_parse", |b| {
        b.iter(|| {
            black_box(Envelope::parse(black_box(frame)).unwrap());
        });
    });
}

fn bench_broadcast(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("broadcast");

    for peers in [2usize, 16, 64].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(peers), peers, |b, &peers| {
            b.to_async(&rt).iter(|| async move {
                let relay = RelayState::new();
                let mut receivers = Vec::with_capacity(peers);
                for _ in 0..peers {
                    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
                    relay.register(tx).await;
                    receivers.push(rx);
                }

                relay
                    .broadcast(Message::Text(r#"{"hello":"fleet"}"#.to_string()))
                    .await;
                black_box(&receivers);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_device_add,
    bench_status_update,
    bench_envelope_parse,
    bench_broadcast
);
criterion_main!(benches);
