//! Safetensors I/O for recordings and intermediate arrays.
//!
//! Reader: parses the per-subject `.safetensors` files written by the
//! external export script.  Expected keys:
//!
//! ```text
//! data      F32 | F64   [E, C, T] epoched, or [C, T] continuous
//! sfreq     F32 | F64   [1]
//! ch_names  U8          newline-separated channel names (optional)
//! ```
//!
//! Continuous data is cut into non-overlapping epochs on load.
use anyhow::{bail, Context, Result};
use ndarray::{Array2, Array3};
use std::collections::HashMap;
use std::path::Path;

use crate::config::seconds_to_samples;
use crate::epoch::epoch;
use crate::recording::{Recording, SubjectMeta};

// ── Low-level safetensors parser (raw bytes → Vec<f64>, no dependency on the
//    `safetensors` crate's tensor types). ───────────────────────────────────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    let Some((len, rest)) = bytes.split_first_chunk::<8>() else {
        bail!("safetensors file too small");
    };
    let n = usize::try_from(u64::from_le_bytes(*len)).context("safetensors header length does not fit in memory")?;
    let Some(json) = rest.get(..n) else {
        bail!("safetensors header length {n} exceeds file size {}", bytes.len());
    };
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(json).context("failed to parse safetensors header")?;
    Ok((header, 8 + n))
}

fn tensor_bytes<'a>(bytes: &'a [u8], data_start: usize, entry: &serde_json::Value) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"].as_array().context("missing 'data_offsets'")?;
    let (s, e) = match (offsets.first().and_then(|v| v.as_u64()), offsets.get(1).and_then(|v| v.as_u64())) {
        (Some(s), Some(e)) if s <= e => (s, e),
        _ => bail!("malformed 'data_offsets'"),
    };
    let absolute = |off: u64| usize::try_from(off).ok().and_then(|o| data_start.checked_add(o));
    let (Some(start), Some(end)) = (absolute(s), absolute(e)) else {
        bail!("tensor data offsets [{s}, {e}] overflow");
    };
    bytes.get(start..end).context("tensor data out of bounds")
}

/// Read a float tensor (F32 or F64) as `f64`.
fn read_float_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    match entry["dtype"].as_str() {
        Some("F32") => Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect()),
        Some("F64") => Ok(raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect()),
        other => bail!("unsupported dtype {other:?} (expected F32 or F64)"),
    }
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("missing 'shape'")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect()
}

// ── Recording loader ──────────────────────────────────────────────────────────

/// Load one subject's recording.
///
/// `epoch_seconds` is only used for continuous `[C, T]` data, which is cut
/// into `floor(epoch_seconds × sfreq)`-sample epochs; trailing samples that
/// do not fill an epoch are discarded.
pub fn load_recording(path: &Path, meta: SubjectMeta, epoch_seconds: f64) -> Result<Recording> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes).with_context(|| format!("parsing {}", path.display()))?;

    let sfreq_entry = header.get("sfreq").context("missing 'sfreq' key")?;
    let sfreq = *read_float_tensor(&bytes, data_start, sfreq_entry)?
        .first()
        .context("empty 'sfreq' tensor")?;

    let data_entry = header.get("data").context("missing 'data' key")?;
    let shape = shape_of(data_entry)?;
    let values = read_float_tensor(&bytes, data_start, data_entry)?;

    let data: Array3<f64> = match shape.as_slice() {
        &[e, c, t] => Array3::from_shape_vec((e, c, t), values)?,
        &[c, t] => {
            let epoch_samples = seconds_to_samples(epoch_seconds, sfreq);
            if epoch_samples == 0 {
                bail!("{}: continuous data needs a non-zero epoch length", path.display());
            }
            let continuous = Array2::from_shape_vec((c, t), values)?;
            epoch(&continuous, epoch_samples)
        }
        other => bail!("{}: 'data' must be [E, C, T] or [C, T], got {other:?}", path.display()),
    };

    // Channel names are optional.
    let ch_names: Vec<String> = if let Some(e) = header.get("ch_names") {
        let raw = tensor_bytes(&bytes, data_start, e)?;
        std::str::from_utf8(raw)?
            .split('\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    } else {
        (1..=data.dim().1).map(|i| i.to_string()).collect()
    };

    log::debug!(
        "{}: loaded {:?} @ {sfreq} Hz, {} channel names",
        path.display(),
        data.dim(),
        ch_names.len()
    );

    Recording::new(data, sfreq, ch_names, meta).with_context(|| format!("loading {}", path.display()))
}

// ── Safetensors writer ────────────────────────────────────────────────────────

struct Tensor {
    name: String,
    dtype: &'static str,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

/// Collects named little-endian tensors and writes them as one safetensors
/// file, in insertion order.  Float arrays are stored as `F32`/`F64`, counts
/// as `I32`, and string lists as a single `U8` blob.
///
/// ```rust,no_run
/// use eegrest::io::StWriter;
/// use ndarray::Array3;
/// use std::path::Path;
///
/// // A two-epoch, two-channel recording in the layout `load_recording` reads.
/// let mut w = StWriter::new();
/// w.add_f64_arr3("data", &Array3::zeros((2, 2, 500)));
/// w.add_f64("sfreq", &[250.0], &[1]);
/// w.add_names("ch_names", &["Fz".to_string(), "Cz".to_string()]);
/// w.write(Path::new("s01.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    tensors: Vec<Tensor>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: &str, dtype: &'static str, shape: &[usize], bytes: Vec<u8>) {
        self.tensors.push(Tensor { name: name.to_string(), dtype, shape: shape.to_vec(), bytes });
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        self.push(name, "F32", shape, data.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        self.push(name, "F64", shape, data.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        self.push(name, "I32", shape, data.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    /// Stored in logical (row-major) order, whatever the array's memory layout.
    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        self.push(name, "F64", arr.shape(), arr.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    pub fn add_f64_arr3(&mut self, name: &str, arr: &Array3<f64>) {
        self.push(name, "F64", arr.shape(), arr.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    pub fn add_names(&mut self, name: &str, names: &[String]) {
        let joined = names.join("\n").into_bytes();
        let len = joined.len();
        self.push(name, "U8", &[len], joined);
    }

    /// JSON header padded with spaces to a multiple of 8 bytes.
    fn header(&self) -> Result<Vec<u8>> {
        let mut map = serde_json::Map::with_capacity(self.tensors.len());
        let mut offset = 0usize;
        for t in &self.tensors {
            let end = offset + t.bytes.len();
            map.insert(
                t.name.clone(),
                serde_json::json!({ "dtype": t.dtype, "shape": t.shape, "data_offsets": [offset, end] }),
            );
            offset = end;
        }
        let mut json = serde_json::to_vec(&map)?;
        json.resize(json.len().next_multiple_of(8), b' ');
        Ok(json)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let header = self.header()?;
        let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        out.write_all(&(header.len() as u64).to_le_bytes())?;
        out.write_all(&header)?;
        for t in &self.tensors {
            out.write_all(&t.bytes)?;
        }
        out.flush().with_context(|| format!("writing {}", path.display()))
    }
}

/// Write `rec`'s signal in the layout [`load_recording`] reads.
pub fn write_recording(rec: &Recording, path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64_arr3("data", rec.data());
    w.add_f64("sfreq", &[rec.sfreq()], &[1]);
    w.add_names("ch_names", rec.ch_names());
    w.write(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> SubjectMeta {
        SubjectMeta::new("s1", "ko", "s1.safetensors")
    }

    #[test]
    fn epoched_f32_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.safetensors");
        let vals: Vec<f32> = (0..2 * 3 * 5).map(|i| i as f32 * 0.5).collect();
        let mut w = StWriter::new();
        w.add_f32("data", &vals, &[2, 3, 5]);
        w.add_f32("sfreq", &[500.0], &[1]);
        w.add_names("ch_names", &["A1".into(), "A2".into(), "B1".into()]);
        w.write(&path).unwrap();

        let rec = load_recording(&path, meta(), 2.0).unwrap();
        assert_eq!(rec.data().dim(), (2, 3, 5));
        assert_eq!(rec.sfreq(), 500.0);
        assert_eq!(rec.ch_names(), &["A1", "A2", "B1"]);
        assert_eq!(rec.data()[[1, 2, 4]], 14.5);
    }

    #[test]
    fn continuous_data_is_epoched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.safetensors");
        let vals: Vec<f64> = (0..2 * 250).map(|i| i as f64).collect();
        let mut w = StWriter::new();
        w.add_f64("data", &vals, &[2, 250]);
        w.add_f64("sfreq", &[100.0], &[1]);
        w.write(&path).unwrap();

        let rec = load_recording(&path, meta(), 1.0).unwrap();
        assert_eq!(rec.data().dim(), (2, 2, 100));
        // Default names when none are stored.
        assert_eq!(rec.ch_names(), &["1", "2"]);
        assert_eq!(rec.data()[[1, 0, 0]], 100.0);
    }

    #[test]
    fn header_lists_tensors_back_to_back() {
        let mut w = StWriter::new();
        w.add_i32("n_epochs", &[7], &[1]);
        w.add_f64_arr2("psd_mean", &Array2::from_elem((2, 3), 1.5));
        w.add_names("ch_names", &["Fz".into(), "Cz".into()]);
        let header = w.header().unwrap();
        assert_eq!(header.len() % 8, 0);

        let (parsed, data_start) = parse_header(&[&(header.len() as u64).to_le_bytes()[..], &header[..]].concat()).unwrap();
        assert_eq!(data_start, 8 + header.len());
        assert_eq!(parsed["n_epochs"]["dtype"], "I32");
        assert_eq!(parsed["n_epochs"]["data_offsets"], serde_json::json!([0, 4]));
        assert_eq!(parsed["psd_mean"]["shape"], serde_json::json!([2, 3]));
        assert_eq!(parsed["psd_mean"]["data_offsets"], serde_json::json!([4, 52]));
        assert_eq!(parsed["ch_names"]["dtype"], "U8");
        assert_eq!(parsed["ch_names"]["data_offsets"], serde_json::json!([52, 57]));
    }

    #[test]
    fn oversized_header_length_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.safetensors");
        let mut bytes = (u64::MAX - 3).to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        std::fs::write(&path, bytes).unwrap();

        let err = load_recording(&path, meta(), 2.0).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("corrupt.safetensors"), "{msg}");
        assert!(msg.contains("header length"), "{msg}");
    }

    #[test]
    fn overflowing_data_offsets_are_rejected() {
        let header = br#"{"x":{"dtype":"F64","shape":[1],"data_offsets":[18446744073709551608,18446744073709551615]}}"#;
        let bytes = [&(header.len() as u64).to_le_bytes()[..], &header[..]].concat();
        let (parsed, data_start) = parse_header(&bytes).unwrap();
        let err = tensor_bytes(&bytes, data_start, &parsed["x"]).unwrap_err();
        assert!(err.to_string().contains("overflow"), "{err}");
    }

    #[test]
    fn missing_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.safetensors");
        let mut w = StWriter::new();
        w.add_f32("data", &[0.0; 4], &[1, 1, 4]);
        w.write(&path).unwrap();
        let err = load_recording(&path, meta(), 2.0).unwrap_err();
        assert!(format!("{err:#}").contains("sfreq"));
    }
}
