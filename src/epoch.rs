//! Fixed-length epoching of continuous recordings.
//!
//! Splits continuous [C, T] data into non-overlapping windows of
//! `epoch_samples` samples, dropping any trailing incomplete window.
//! No baseline correction: the spectral estimators remove each segment's
//! mean themselves.
use ndarray::{s, Array2, Array3};

/// Epoch `data` ([C, T]) into a 3-D array [E, C, epoch_samples].
/// Trailing samples that don't fill a complete epoch are discarded.
pub fn epoch(data: &Array2<f64>, epoch_samples: usize) -> Array3<f64> {
    let (n_ch, n_t) = data.dim();
    let n_epochs = if epoch_samples == 0 { 0 } else { n_t / epoch_samples };

    let mut out = Array3::<f64>::zeros((n_epochs, n_ch, epoch_samples));
    for e in 0..n_epochs {
        let start = e * epoch_samples;
        out.slice_mut(s![e, .., ..])
           .assign(&data.slice(s![.., start..start + epoch_samples]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn epoch_count_and_shape() {
        let data = Array2::from_elem((12, 3840), 1.0_f64);
        let epochs = epoch(&data, 1280);
        assert_eq!(epochs.shape(), &[3, 12, 1280]);
    }

    #[test]
    fn trailing_samples_dropped() {
        // 1300 samples with epoch_size=1280 → 1 epoch (20 trailing samples dropped).
        let data = Array2::from_elem((4, 1300), 0.5_f64);
        let epochs = epoch(&data, 1280);
        assert_eq!(epochs.shape()[0], 1);
    }

    #[test]
    fn samples_keep_their_order() {
        let data = Array2::from_shape_fn((2, 10), |(c, t)| (c * 100 + t) as f64);
        let epochs = epoch(&data, 4);
        assert_eq!(epochs.shape(), &[2, 2, 4]);
        assert_eq!(epochs[[1, 1, 0]], 104.0);
        assert_eq!(epochs[[0, 0, 3]], 3.0);
    }

    #[test]
    fn shorter_than_one_epoch_gives_none() {
        let data = Array2::<f64>::zeros((3, 50));
        assert_eq!(epoch(&data, 100).shape()[0], 0);
        assert_eq!(epoch(&data, 0).shape()[0], 0);
    }
}
