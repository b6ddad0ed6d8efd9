//! Frequency-domain filter bank
//!
//! Each wavelet row is scaled by `length / n_fft` and transformed with a
//! full complex FFT. Only the non-negative half `[0, n_fft / 2]` is kept,
//! matching the bins of a real FFT of the same size.

use ndarray::{Array2, Axis};
use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::error::{VqtError, VqtResult};
use crate::wavelet::{WaveletBasis, WaveletLengths};

/// Filter bank ready to be applied to a short-time spectrum
#[derive(Debug, Clone)]
pub struct FilterBankSpectrum {
    /// `(n_filters, n_fft / 2 + 1)` complex responses
    pub spectrum: Array2<Complex64>,
    /// FFT size the spectrum was computed with
    pub n_fft: usize,
    /// Per-bin wavelet parameters
    pub lengths: WaveletLengths,
}

impl FilterBankSpectrum {
    /// Transform a time-domain basis into its half spectrum
    pub fn from_basis(basis: WaveletBasis) -> VqtResult<Self> {
        let n_fft = basis.padded_len();
        if n_fft == 0 {
            return Err(VqtError::InvalidConfig("empty wavelet basis".into()));
        }

        let fft = FftPlanner::<f64>::new().plan_fft_forward(n_fft);
        let n_bins = n_fft / 2 + 1;

        let WaveletBasis { filters, lengths } = basis;
        let mut spectrum = Array2::<Complex64>::zeros((filters.nrows(), n_bins));
        let mut buffer = vec![Complex64::new(0.0, 0.0); n_fft];

        for ((row, params), mut out) in filters
            .axis_iter(Axis(0))
            .zip(&lengths.params)
            .zip(spectrum.axis_iter_mut(Axis(0)))
        {
            let gain = params.length / n_fft as f64;
            for (dst, src) in buffer.iter_mut().zip(row.iter()) {
                *dst = *src * gain;
            }

            fft.process(&mut buffer);

            for (dst, src) in out.iter_mut().zip(&buffer) {
                *dst = *src;
            }
        }

        Ok(Self {
            spectrum,
            n_fft,
            lengths,
        })
    }

    pub fn n_filters(&self) -> usize {
        self.spectrum.nrows()
    }

    /// Multiply every coefficient by `factor`
    pub fn scale(&mut self, factor: f64) {
        self.spectrum.mapv_inplace(|c| c * factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freq::{relative_bandwidth, FrequencyBins};
    use crate::wavelet::{build_basis, FilterDesign};
    use crate::window::WindowFunction;

    fn bank(sample_rate: f64) -> FilterBankSpectrum {
        let freqs = FrequencyBins::geometric(220.0, 12, 12).unwrap();
        let design = FilterDesign {
            window: WindowFunction::Hann,
            filter_scale: 1.0,
            norm: 1.0,
            gamma: None,
            fallback_alpha: relative_bandwidth(12.0),
        };
        let basis = build_basis(freqs.as_slice(), sample_rate, &design, true).unwrap();
        FilterBankSpectrum::from_basis(basis).unwrap()
    }

    #[test]
    fn test_half_spectrum_shape() {
        let bank = bank(22050.0);
        assert!(bank.n_fft.is_power_of_two());
        assert_eq!(bank.spectrum.dim(), (12, bank.n_fft / 2 + 1));
    }

    #[test]
    fn test_filter_peaks_near_center_frequency() {
        let sr = 22050.0;
        let bank = bank(sr);
        let freqs = FrequencyBins::geometric(220.0, 12, 12).unwrap();

        for (row, &freq) in bank.spectrum.axis_iter(Axis(0)).zip(freqs.as_slice()) {
            let peak = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
                .map(|(k, _)| k)
                .unwrap();
            let peak_hz = peak as f64 * sr / bank.n_fft as f64;
            let bin_hz = sr / bank.n_fft as f64;
            assert!((peak_hz - freq).abs() <= bin_hz, "{peak_hz} vs {freq}");
        }
    }

    #[test]
    fn test_scale() {
        let mut bank = bank(22050.0);
        let before = bank.spectrum[[3, 10]];
        bank.scale(2.0);
        assert_eq!(bank.spectrum[[3, 10]], before * 2.0);
    }
}
