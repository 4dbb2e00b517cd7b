//! Obfuscation engine benchmarks.
//!
//! Measures cell codec throughput, fragmentation cost, and classifier
//! prediction latency.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use bytes::Bytes;
use disguise::classifier::HmmClassifier;
use disguise::framing::{Cell, Framer};
use disguise::profile::Profile;

fn bench_cell_encode(c: &mut Criterion) {
    let payload = Bytes::from(vec![0xa5u8; 1000]);
    let padding = Bytes::from(vec![0x5au8; 300]);
    let cell = Cell::data(42, 7, payload, padding, 150);

    let mut group = c.benchmark_group("cell_encode");
    group.throughput(Throughput::Bytes(cell.wire_size() as u64));

    group.bench_function("1300_byte_content", |b| {
        b.iter(|| black_box(cell.encode().unwrap()))
    });

    group.finish();
}

fn bench_cell_decode(c: &mut Criterion) {
    let payload = Bytes::from(vec![0xa5u8; 1000]);
    let padding = Bytes::from(vec![0x5au8; 300]);
    let encoded = Cell::data(42, 7, payload, padding, 150).encode().unwrap();

    let mut group = c.benchmark_group("cell_decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));

    group.bench_function("1300_byte_content", |b| {
        b.iter(|| black_box(Cell::decode(encoded.clone()).unwrap()))
    });

    group.finish();
}

fn bench_fragment(c: &mut Criterion) {
    let data = vec![0x42u8; 64 * 1024];

    let mut group = c.benchmark_group("fragment");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("64_kib_web_profile", |b| {
        b.iter(|| {
            let mut framer = Framer::new(Profile::web_browsing());
            black_box(framer.fragment(&data))
        })
    });

    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let classifier = HmmClassifier::new();
    let observations: Vec<usize> = (0..256).map(|step| step % 3).collect();

    c.bench_function("viterbi_predict_256_observations", |b| {
        b.iter(|| black_box(classifier.predict(&observations).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_cell_encode,
    bench_cell_decode,
    bench_fragment,
    bench_predict
);
criterion_main!(benches);
