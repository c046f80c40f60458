//! Encode/decode throughput of representative registry entries.
//!
//! Run with: `cargo bench -p ephc_codecs`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ephc_codecs::algorithm_by_name;
use ephc_core::{AnySignal, Dtype, Shape, Signal};

const ALGORITHMS: &[&str] = &["raw", "zstd", "ans", "ans-delta", "ans-lpc8", "ans-lpc8-lossy-tol4"];

/// int16 multi-channel trace: shared slow oscillation, per-channel phase, LCG noise.
fn generate_trace(rows: usize, cols: usize) -> AnySignal {
    let mut rng = 0x5EED_u64;
    let data = (0..rows * cols)
        .map(|i| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let (t, ch) = (i / cols, i % cols);
            let wave = ((t as f64 * 0.02 + ch as f64 * 0.3).sin() * 1500.0) as i16;
            wave + ((rng >> 33) % 31) as i16 - 15
        })
        .collect();
    Signal::new(data, Shape::new(rows, cols))
        .expect("generated buffer matches its shape")
        .into()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for rows in [4_096, 32_768] {
        let signal = generate_trace(rows, 32);
        group.throughput(Throughput::Bytes(signal.nbytes() as u64));
        for &name in ALGORITHMS {
            let alg = algorithm_by_name(name).expect("registered algorithm");
            group.bench_with_input(BenchmarkId::new(name, rows), &signal, |b, s| {
                b.iter(|| alg.encode(black_box(s)).expect("encode"))
            });
        }
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for rows in [4_096, 32_768] {
        let signal = generate_trace(rows, 32);
        let shape = signal.shape();
        group.throughput(Throughput::Bytes(signal.nbytes() as u64));
        for &name in ALGORITHMS {
            let alg = algorithm_by_name(name).expect("registered algorithm");
            let bytes = alg.encode(&signal).expect("encode");
            group.bench_with_input(BenchmarkId::new(name, rows), &bytes, |b, bytes| {
                b.iter(|| alg.decode(black_box(bytes), Dtype::I16, shape).expect("decode"))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
