//! End-to-end analysis-stage throughput, with I/O removed from the loop by
//! driving the stage straight into a [`NullSink`].

use criterion::{criterion_group, criterion_main, Criterion};
use tuna_core::{Buffer, Consumer, TimeSlice, Timestamp};
use tuna_platform::NullSink;

fn time_slice_throughput(c: &mut Criterion) {
    let mut stage = TimeSlice::new(Box::new(NullSink));
    stage.start(8192, Timestamp::ZERO).unwrap();

    c.bench_function("time_slice_write_4096_samples", |b| {
        b.iter(|| {
            let buf = Buffer::acquire(4096);
            stage.write(buf, 4096).unwrap();
        })
    });
}

criterion_group!(benches, time_slice_throughput);
criterion_main!(benches);
