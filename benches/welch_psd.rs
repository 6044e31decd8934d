use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use eegrest::{band_power, connectivity, BandSet, ConnMethod, OverlapPolicy, Recording, SubjectMeta};
use eegrest::spectrum::welch_epochs;
use ndarray::Array3;

const SFREQ: f64 = 500.0;

/// 30 epochs × 32 channels × 2 s of deterministic pseudo-noise plus a 10 Hz tone.
fn recording() -> Recording {
    let (n_e, n_c, n_t) = (30, 32, 1000);
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let data = Array3::from_shape_fn((n_e, n_c, n_t), |(_, c, t)| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let noise = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
        (2.0 * std::f64::consts::PI * 10.0 * t as f64 / SFREQ + c as f64).sin() + noise
    });
    let names = (1..=n_c).map(|i| i.to_string()).collect();
    Recording::new(data, SFREQ, names, SubjectMeta::new("bench", "wt", "bench.safetensors")).unwrap()
}

fn bench_welch(c: &mut Criterion) {
    let rec = recording();
    c.bench_function("welch_epochs [30×32×1000], 1 s window", |b| {
        b.iter(|| {
            let psd = welch_epochs(black_box(rec.data()), SFREQ, 500, 250).unwrap();
            black_box(psd.psd.len())
        })
    });
}

fn bench_band_power(c: &mut Criterion) {
    let rec = recording();
    let bands = BandSet::default();
    c.bench_function("band_power [30×32×1000]", |b| {
        b.iter(|| {
            let p = band_power(black_box(&rec), 1.0, &bands, OverlapPolicy::LastMatch).unwrap();
            black_box(p.by_freq.len())
        })
    });
}

fn bench_connectivity(c: &mut Criterion) {
    let rec = recording();
    let bands = BandSet::default();
    c.bench_function("connectivity wpli2_debiased [32×32]", |b| {
        b.iter(|| {
            let out = connectivity(black_box(&rec), &[ConnMethod::Wpli2Debiased], &bands).unwrap();
            black_box(out.rows.len())
        })
    });
}

criterion_group!(benches, bench_welch, bench_band_power, bench_connectivity);
criterion_main!(benches);
