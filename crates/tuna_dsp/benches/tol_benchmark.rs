use criterion::{criterion_group, criterion_main, Criterion};
use tuna_dsp::{Spectrum, TolBank};

fn tol_calculate_benchmark(c: &mut Criterion) {
    let bank = TolBank::new(48000, 8192, 0.4, 3);
    let data = vec![0.5f32; 4096];
    let mut results = vec![0.0f32; bank.num_levels()];

    c.bench_function("tol_calculate_8192", |b| {
        b.iter(|| {
            results.iter_mut().for_each(|r| *r = 0.0);
            bank.calculate(&data, &mut results);
        })
    });
}

fn fft_transform_benchmark(c: &mut Criterion) {
    let mut spectrum = Spectrum::new();
    spectrum.set_length(8192).unwrap();

    c.bench_function("fft_transform_8192", |b| {
        b.iter(|| {
            let buf = spectrum.open().unwrap();
            for (i, x) in buf.iter_mut().enumerate() {
                *x = (i as f32 * 0.01).sin();
            }
            spectrum.transform().unwrap();
        })
    });
}

criterion_group!(benches, tol_calculate_benchmark, fft_transform_benchmark);
criterion_main!(benches);
