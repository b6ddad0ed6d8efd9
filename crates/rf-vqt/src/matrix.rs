//! Transform output

use ndarray::{Array2, Axis};
use num_complex::Complex64;

use crate::error::{VqtError, VqtResult};
use crate::freq::FrequencyBins;

/// Complex VQT coefficients, `(n_bins, n_frames)`, row 0 = lowest bin
#[derive(Debug, Clone)]
pub struct VqtMatrix {
    data: Array2<Complex64>,
    bins: FrequencyBins,
    sample_rate: f64,
    hop_length: usize,
}

impl VqtMatrix {
    pub(crate) fn new(
        data: Array2<Complex64>,
        bins: FrequencyBins,
        sample_rate: f64,
        hop_length: usize,
    ) -> Self {
        Self {
            data,
            bins,
            sample_rate,
            hop_length,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.data.ncols()
    }

    pub fn data(&self) -> &Array2<Complex64> {
        &self.data
    }

    pub fn into_inner(self) -> Array2<Complex64> {
        self.data
    }

    /// Center frequency of every row
    pub fn frequencies(&self) -> &FrequencyBins {
        &self.bins
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn magnitudes(&self) -> Array2<f64> {
        self.data.mapv(|c| c.norm())
    }

    pub fn power(&self) -> Array2<f64> {
        self.data.mapv(|c| c.norm_sqr())
    }

    /// Magnitudes in dB relative to `reference`.
    ///
    /// Values are floored at `amin` before taking the log. With `top_db`
    /// the output is clipped to `max - top_db`.
    pub fn amplitude_to_db(
        &self,
        reference: f64,
        amin: f64,
        top_db: Option<f64>,
    ) -> VqtResult<Array2<f64>> {
        if !(amin.is_finite() && amin > 0.0) {
            return Err(VqtError::InvalidConfig(format!("amin must be positive, got {amin}")));
        }
        if let Some(top) = top_db {
            if top < 0.0 {
                return Err(VqtError::InvalidConfig(format!(
                    "top_db must be non-negative, got {top}"
                )));
            }
        }

        let ref_db = 20.0 * reference.abs().max(amin).log10();
        let mut db = self.data.mapv(|c| 20.0 * c.norm().max(amin).log10() - ref_db);

        if let Some(top) = top_db {
            let floor = db.iter().copied().fold(f64::NEG_INFINITY, f64::max) - top;
            db.mapv_inplace(|v| v.max(floor));
        }

        Ok(db)
    }

    /// Center time of every frame (seconds)
    pub fn frame_times(&self) -> Vec<f64> {
        (0..self.n_frames())
            .map(|t| (t * self.hop_length) as f64 / self.sample_rate)
            .collect()
    }

    /// Row with the largest magnitude in `frame`
    pub fn peak_bin(&self, frame: usize) -> Option<usize> {
        if frame >= self.n_frames() {
            return None;
        }

        self.data
            .index_axis(Axis(1), frame)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(bin, _)| bin)
    }
}
