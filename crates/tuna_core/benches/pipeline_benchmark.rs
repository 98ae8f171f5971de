//! Pipeline benchmarks
//!
//! Measures performance of the buffer pool and the cross-thread queue's
//! delivery path, which sit on the real-time capture thread.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tuna_core::{Buffer, BufferHold};

fn benchmark_buffer_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_acquire");

    for len in [64, 256, 1024, 8192].iter() {
        group.throughput(Throughput::Elements(*len as u64));
        group.bench_function(format!("acquire_{len}_samples"), |b| {
            b.iter(|| {
                black_box(Buffer::acquire(*len));
            })
        });
    }

    group.finish();
}

fn benchmark_clone_and_drop(c: &mut Criterion) {
    let buf = Buffer::acquire(1024);

    c.bench_function("clone_and_drop", |b| {
        b.iter(|| {
            let clone = buf.clone();
            black_box(&clone);
        })
    });
}

fn benchmark_bufhold_add_and_release(c: &mut Criterion) {
    c.bench_function("bufhold_add_and_release", |b| {
        b.iter(|| {
            let mut hold = BufferHold::new();
            let h = hold.add(Buffer::acquire(512), 512);
            black_box(hold.data(h));
            hold.release(h);
        })
    });
}

criterion_group!(
    benches,
    benchmark_buffer_acquire,
    benchmark_clone_and_drop,
    benchmark_bufhold_add_and_release
);
criterion_main!(benches);
