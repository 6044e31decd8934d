/// Shared helpers: deterministic synthetic recordings and on-disk fixtures.
use eegrest::{io::write_recording, Recording, SubjectMeta};
use ndarray::Array3;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

/// xorshift64* noise in [-0.5, 0.5), reproducible across runs.
pub struct Noise(u64);

impl Noise {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn sample(&mut self) -> f64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        let v = self.0.wrapping_mul(0x2545_f491_4f6c_dd1d);
        (v >> 11) as f64 / (1u64 << 53) as f64 - 0.5
    }
}

#[allow(unused)]
/// Sum of sines at `freqs` Hz (one phase offset per channel and epoch) plus
/// a little noise, so every bin has non-zero power.
pub fn tones(n_e: usize, n_c: usize, n_t: usize, sfreq: f64, freqs: &[f64], seed: u64) -> Array3<f64> {
    let mut noise = Noise::new(seed);
    Array3::from_shape_fn((n_e, n_c, n_t), |(e, c, t)| {
        let tt = t as f64 / sfreq;
        let s: f64 = freqs
            .iter()
            .map(|f| (2.0 * PI * f * tt + 0.7 * c as f64 + 1.3 * e as f64).sin())
            .sum();
        s + 0.2 * noise.sample()
    })
}

#[allow(unused)]
/// Channel 1 lags channel 0 by a quarter cycle of `freq`; further channels are noise.
pub fn lagged_pair(n_e: usize, n_c: usize, n_t: usize, sfreq: f64, freq: f64, seed: u64) -> Array3<f64> {
    let mut noise = Noise::new(seed);
    Array3::from_shape_fn((n_e, n_c, n_t), |(e, c, t)| {
        let ph = 2.0 * PI * freq * t as f64 / sfreq + 0.9 * e as f64;
        let n = 0.05 * noise.sample();
        match c {
            0 => ph.sin() + n,
            1 => (ph - PI / 2.0).sin() + n,
            _ => 4.0 * n,
        }
    })
}

#[allow(unused)]
pub fn names(n_c: usize) -> Vec<String> {
    (1..=n_c).map(|i| i.to_string()).collect()
}

#[allow(unused)]
pub fn recording(data: Array3<f64>, sfreq: f64, eegid: &str) -> Recording {
    let n_c = data.dim().1;
    Recording::new(data, sfreq, names(n_c), SubjectMeta::new(eegid, "wt", format!("{eegid}.safetensors")))
        .unwrap()
}

#[allow(unused)]
/// Write each `(eegid, group, data)` as `<eegid>.safetensors` plus a
/// `subjects.csv` log into `dir`.  Returns (log path, recording paths).
pub fn write_fixture(dir: &Path, subjects: &[(&str, &str, Array3<f64>)], sfreq: f64) -> (PathBuf, Vec<PathBuf>) {
    let mut csv = String::from("filename,eegid,group\n");
    let mut files = Vec::new();
    for (eegid, group, data) in subjects {
        let file = format!("{eegid}.safetensors");
        let n_c = data.dim().1;
        let rec = Recording::new(data.clone(), sfreq, names(n_c), SubjectMeta::new(*eegid, *group, file.clone()))
            .unwrap();
        let path = dir.join(&file);
        write_recording(&rec, &path).unwrap();
        csv.push_str(&format!("{file},{eegid},{group}\n"));
        files.push(path);
    }
    let log = dir.join("subjects.csv");
    std::fs::write(&log, csv).unwrap();
    (log, files)
}
