//! Wavelet filter design
//!
//! Per-bin quality factor, bandwidth offset and filter length, and the
//! time-domain basis of windowed complex sinusoids built from them.
//!
//! ## References
//!
//! - Schörkhuber, Klapuri (2010): "Constant-Q transform toolbox for music processing"
//! - Glasberg, Moore (1990): "Derivation of auditory filter shapes from notched-noise data"

use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{VqtError, VqtResult};
use crate::window::WindowFunction;

/// ERB bandwidth offset coefficient, `24.7 / 0.108`
pub const ERB_GAMMA_COEFFICIENT: f64 = 24.7 / 0.108;

/// Filter parameters of a single frequency bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveletParameters {
    /// Fractional bandwidth to the neighbouring bins
    pub alpha: f64,
    /// Bandwidth offset (Hz)
    pub gamma: f64,
    /// `filter_scale / alpha`
    pub q_factor: f64,
    /// Filter length in samples (fractional)
    pub length: f64,
}

/// Output of [`compute_lengths`]
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletLengths {
    /// One entry per input frequency
    pub params: Vec<WaveletParameters>,
    /// Highest frequency any filter reaches (Hz)
    pub cutoff: f64,
}

impl WaveletLengths {
    /// Filter lengths in bin order
    pub fn lengths(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.length).collect()
    }

    /// Longest filter
    pub fn max_length(&self) -> f64 {
        self.params.iter().map(|p| p.length).fold(0.0, f64::max)
    }
}

/// Everything about filter shape that stays fixed across octaves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterDesign {
    pub window: WindowFunction,
    pub filter_scale: f64,
    /// Lp norm order used to normalize each filter
    pub norm: f64,
    /// Explicit bandwidth offset; `None` derives it from alpha (ERB scale)
    pub gamma: Option<f64>,
    /// Alpha used when a slice holds fewer than two frequencies
    pub fallback_alpha: f64,
}

/// Compute per-bin wavelet parameters and the overall cutoff frequency.
///
/// `freqs` must be positive and strictly ascending, `filter_scale` and
/// `fallback_alpha` positive. A negative `gamma` that drives any filter
/// length to zero or below fails with `InvalidConfig`.
pub fn compute_lengths(
    freqs: &[f64],
    sample_rate: f64,
    window: WindowFunction,
    gamma: Option<f64>,
    fallback_alpha: f64,
    filter_scale: f64,
) -> VqtResult<WaveletLengths> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(VqtError::InvalidRate(sample_rate));
    }
    if freqs.is_empty() {
        return Err(VqtError::InvalidConfig("no frequencies to design filters for".into()));
    }
    if freqs[0] <= 0.0 || freqs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(VqtError::InvalidConfig(
            "frequencies must be positive and strictly ascending".into(),
        ));
    }

    if !(filter_scale.is_finite() && filter_scale > 0.0) {
        return Err(VqtError::InvalidConfig(format!(
            "filter scale must be positive, got {filter_scale}"
        )));
    }
    if !(fallback_alpha.is_finite() && fallback_alpha > 0.0) {
        return Err(VqtError::InvalidConfig(format!(
            "fallback alpha must be positive, got {fallback_alpha}"
        )));
    }

    let alphas = local_alphas(freqs, fallback_alpha);
    let bandwidth = window.bandwidth();

    let mut cutoff = f64::NEG_INFINITY;
    let mut params = Vec::with_capacity(freqs.len());

    for (&freq, &alpha) in freqs.iter().zip(&alphas) {
        let gamma = gamma.unwrap_or(ERB_GAMMA_COEFFICIENT * alpha);
        let q_factor = filter_scale / alpha;
        let length = q_factor * sample_rate / (freq + gamma / alpha);

        if !(length.is_finite() && length > 0.0) {
            return Err(VqtError::InvalidConfig(format!(
                "filter at {freq:.3} Hz has non-positive length {length} (gamma {gamma})"
            )));
        }

        cutoff = cutoff.max(freq * (1.0 + 0.5 * bandwidth / q_factor) + 0.5 * gamma);

        params.push(WaveletParameters {
            alpha,
            gamma,
            q_factor,
            length,
        });
    }

    Ok(WaveletLengths { params, cutoff })
}

/// Alpha per bin from the local octave resolution of `log2(freq)`
fn local_alphas(freqs: &[f64], fallback_alpha: f64) -> Vec<f64> {
    let n = freqs.len();
    if n < 2 {
        return vec![fallback_alpha; n];
    }

    let log_freqs: Vec<f64> = freqs.iter().map(|f| f.log2()).collect();

    (0..n)
        .map(|i| {
            let bpo = if i == 0 {
                1.0 / (log_freqs[1] - log_freqs[0])
            } else if i == n - 1 {
                1.0 / (log_freqs[n - 1] - log_freqs[n - 2])
            } else {
                2.0 / (log_freqs[i + 1] - log_freqs[i - 1])
            };
            crate::freq::relative_bandwidth(bpo)
        })
        .collect()
}

/// Normalize `data` in place to unit Lp norm.
///
/// `norm == 0` divides by the plain sum of magnitudes and `norm == inf` by
/// the largest magnitude. Data whose norm is below the smallest normal
/// `f64` is left as is. Negative or NaN orders fail with `InvalidNorm`.
pub fn lp_normalize(data: &mut [Complex64], norm: f64) -> VqtResult<()> {
    if norm.is_nan() || norm < 0.0 {
        return Err(VqtError::InvalidNorm(norm));
    }

    let magnitudes = data.iter().map(|c| c.norm());
    let length = if norm == 0.0 {
        // Sum of magnitudes, not a non-zero count
        magnitudes.sum::<f64>()
    } else if norm.is_infinite() {
        magnitudes.fold(0.0, f64::max)
    } else {
        magnitudes.map(|m| m.powf(norm)).sum::<f64>().powf(1.0 / norm)
    };

    let length = if length < f64::MIN_POSITIVE { 1.0 } else { length };

    for c in data.iter_mut() {
        *c /= length;
    }

    Ok(())
}

/// Center `data` in a zero buffer of `size` elements.
///
/// The left pad is `floor((size - len) / 2)`.
pub fn pad_center<T: Copy + Default>(data: &[T], size: usize) -> VqtResult<Vec<T>> {
    let len = data.len();
    if size < len {
        return Err(VqtError::TargetTooSmall { target: size, len });
    }

    let lpad = (size - len) / 2;
    let mut out = vec![T::default(); size];
    out[lpad..lpad + len].copy_from_slice(data);
    Ok(out)
}

/// Time-domain filter bank for one slice of frequencies
#[derive(Debug, Clone)]
pub struct WaveletBasis {
    /// `(n_filters, padded_len)` complex filters
    pub filters: Array2<Complex64>,
    /// Parameters the filters were built from
    pub lengths: WaveletLengths,
}

impl WaveletBasis {
    pub fn n_filters(&self) -> usize {
        self.filters.nrows()
    }

    /// Common padded row length
    pub fn padded_len(&self) -> usize {
        self.filters.ncols()
    }
}

/// Build a single windowed complex sinusoid of fractional length `length`
pub fn wavelet_filter(
    freq: f64,
    length: f64,
    sample_rate: f64,
    window: WindowFunction,
    norm: f64,
) -> VqtResult<Vec<Complex64>> {
    let size = length.ceil() as usize;
    let first = (-length / 2.0).floor();
    let omega = 2.0 * PI * freq / sample_rate;
    let taper = window.float_window(length);

    let mut sig: Vec<Complex64> = taper
        .iter()
        .enumerate()
        .take(size)
        .map(|(j, &w)| Complex64::from_polar(w, (first + j as f64) * omega))
        .collect();

    lp_normalize(&mut sig, norm)?;
    Ok(sig)
}

/// Construct the wavelet basis for `freqs` at `sample_rate`.
///
/// Rows are center-padded to the next power of two of the longest filter
/// when `pad_fft` is set, otherwise to its ceiling.
pub fn build_basis(
    freqs: &[f64],
    sample_rate: f64,
    design: &FilterDesign,
    pad_fft: bool,
) -> VqtResult<WaveletBasis> {
    let lengths = compute_lengths(
        freqs,
        sample_rate,
        design.window,
        design.gamma,
        design.fallback_alpha,
        design.filter_scale,
    )?;

    let max_len = lengths.max_length().ceil() as usize;
    let padded_len = if pad_fft { max_len.next_power_of_two() } else { max_len };

    let mut filters = Array2::<Complex64>::zeros((freqs.len(), padded_len));
    for ((&freq, params), mut row) in freqs
        .iter()
        .zip(&lengths.params)
        .zip(filters.rows_mut())
    {
        let sig = wavelet_filter(freq, params.length, sample_rate, design.window, design.norm)?;
        let padded = pad_center(&sig, padded_len)?;
        for (dst, src) in row.iter_mut().zip(padded) {
            *dst = src;
        }
    }

    log::trace!(
        "Wavelet basis: {} filters, padded to {} samples at {:.1} Hz",
        freqs.len(),
        padded_len,
        sample_rate
    );

    Ok(WaveletBasis { filters, lengths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freq::{relative_bandwidth, FrequencyBins};

    fn octave(fmin: f64) -> Vec<f64> {
        FrequencyBins::geometric(fmin, 12, 12).unwrap().as_slice().to_vec()
    }

    fn design(norm: f64) -> FilterDesign {
        FilterDesign {
            window: WindowFunction::Hann,
            filter_scale: 1.0,
            norm,
            gamma: None,
            fallback_alpha: relative_bandwidth(12.0),
        }
    }

    #[test]
    fn test_lengths_scale_with_sample_rate() {
        let freqs = octave(110.0);
        let alpha = relative_bandwidth(12.0);
        let a = compute_lengths(&freqs, 22050.0, WindowFunction::Hann, None, alpha, 1.0).unwrap();
        let b = compute_lengths(&freqs, 44100.0, WindowFunction::Hann, None, alpha, 1.0).unwrap();

        for (pa, pb) in a.params.iter().zip(&b.params) {
            assert!((pb.length / pa.length - 2.0).abs() < 1e-12);
        }
        // Cutoff does not depend on sample rate
        assert_eq!(a.cutoff, b.cutoff);
    }

    #[test]
    fn test_uniform_spacing_matches_fallback_alpha() {
        let freqs = octave(110.0);
        let alpha = relative_bandwidth(12.0);
        let lengths =
            compute_lengths(&freqs, 22050.0, WindowFunction::Hann, None, 0.5, 1.0).unwrap();

        for p in &lengths.params {
            assert!((p.alpha - alpha).abs() < 1e-9);
            assert!((p.gamma - ERB_GAMMA_COEFFICIENT * p.alpha).abs() < 1e-9);
            assert!((p.q_factor - 1.0 / p.alpha).abs() < 1e-9);
        }
    }

    #[test]
    fn test_explicit_gamma_and_cutoff() {
        let freqs = octave(220.0);
        let lengths =
            compute_lengths(&freqs, 22050.0, WindowFunction::Rectangular, Some(0.0), 0.5, 1.0)
                .unwrap();

        let top = freqs[11];
        let q = lengths.params[11].q_factor;
        assert!((lengths.cutoff - top * (1.0 + 0.5 / q)).abs() < 1e-9);
        assert!((lengths.params[0].length - q * 22050.0 / freqs[0]).abs() < 1e-6);
    }

    #[test]
    fn test_single_frequency_uses_fallback() {
        let lengths =
            compute_lengths(&[440.0], 22050.0, WindowFunction::Hann, None, 0.1, 1.0).unwrap();
        assert_eq!(lengths.params.len(), 1);
        assert_eq!(lengths.params[0].alpha, 0.1);
        assert!((lengths.params[0].q_factor - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_lengths_reject_bad_input() {
        let alpha = relative_bandwidth(12.0);
        assert!(matches!(
            compute_lengths(&[440.0, 220.0], 22050.0, WindowFunction::Hann, None, alpha, 1.0),
            Err(VqtError::InvalidConfig(_))
        ));
        assert_eq!(
            compute_lengths(&[440.0], 0.0, WindowFunction::Hann, None, alpha, 1.0).unwrap_err(),
            VqtError::InvalidRate(0.0)
        );
    }

    #[test]
    fn test_lengths_must_be_positive() {
        // Negative offset large enough to flip the sign of the denominator
        let err = compute_lengths(&[440.0], 22050.0, WindowFunction::Hann, Some(-1000.0), 0.1, 1.0)
            .unwrap_err();
        assert!(matches!(err, VqtError::InvalidConfig(_)), "{err:?}");

        let alpha = relative_bandwidth(12.0);
        for filter_scale in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                compute_lengths(&[440.0], 22050.0, WindowFunction::Hann, None, alpha, filter_scale),
                Err(VqtError::InvalidConfig(_))
            ));
        }
        for fallback in [0.0, -0.1, f64::INFINITY] {
            assert!(matches!(
                compute_lengths(&[440.0], 22050.0, WindowFunction::Hann, None, fallback, 1.0),
                Err(VqtError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_basis_rejects_non_positive_lengths() {
        let design = FilterDesign {
            gamma: Some(-1000.0),
            fallback_alpha: 0.1,
            ..design(1.0)
        };
        assert!(matches!(
            build_basis(&[440.0], 22050.0, &design, true),
            Err(VqtError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_lp_normalize_l2() {
        let mut data = vec![Complex64::new(3.0, 0.0), Complex64::new(0.0, 4.0)];
        lp_normalize(&mut data, 2.0).unwrap();
        assert!((data[0].re - 0.6).abs() < 1e-12);
        assert!((data[1].im - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_lp_normalize_zero_norm_sums_magnitudes() {
        let mut data = vec![Complex64::new(3.0, 0.0), Complex64::new(0.0, 4.0)];
        lp_normalize(&mut data, 0.0).unwrap();
        assert!((data[0].re - 3.0 / 7.0).abs() < 1e-12);
        assert!((data[1].im - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_lp_normalize_inf_and_errors() {
        let mut data = vec![Complex64::new(-2.0, 0.0), Complex64::new(1.0, 0.0)];
        lp_normalize(&mut data, f64::INFINITY).unwrap();
        assert_eq!(data[0].re, -1.0);

        assert_eq!(lp_normalize(&mut data, -1.0).unwrap_err(), VqtError::InvalidNorm(-1.0));
        assert!(lp_normalize(&mut data, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_lp_normalize_tiny_left_alone() {
        let tiny = f64::MIN_POSITIVE / 4.0;
        let mut data = vec![Complex64::new(tiny, 0.0)];
        lp_normalize(&mut data, 2.0).unwrap();
        assert_eq!(data[0].re, tiny);

        let mut zeros = vec![Complex64::new(0.0, 0.0); 4];
        lp_normalize(&mut zeros, 1.0).unwrap();
        assert!(zeros.iter().all(|c| c.norm() == 0.0));
    }

    #[test]
    fn test_pad_center() {
        assert_eq!(pad_center(&[1, 2, 3], 7).unwrap(), vec![0, 0, 1, 2, 3, 0, 0]);
        assert_eq!(pad_center(&[1, 2, 3], 6).unwrap(), vec![0, 1, 2, 3, 0, 0]);
        assert_eq!(pad_center(&[1, 2], 2).unwrap(), vec![1, 2]);
        assert_eq!(
            pad_center(&[1, 2, 3], 2).unwrap_err(),
            VqtError::TargetTooSmall { target: 2, len: 3 }
        );
    }

    #[test]
    fn test_wavelet_filter_shape() {
        let sig = wavelet_filter(440.0, 100.4, 22050.0, WindowFunction::Hann, 1.0).unwrap();
        assert_eq!(sig.len(), 101);
        // Beyond floor(length) the window is exactly zero
        assert_eq!(sig[100], Complex64::new(0.0, 0.0));
        let l1: f64 = sig.iter().map(|c| c.norm()).sum();
        assert!((l1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_basis_rows_have_unit_l2_norm() {
        let freqs = octave(110.0);
        let basis = build_basis(&freqs, 22050.0, &design(2.0), true).unwrap();

        assert_eq!(basis.n_filters(), 12);
        assert!(basis.padded_len().is_power_of_two());
        assert!(basis.padded_len() as f64 >= basis.lengths.max_length());

        for row in basis.filters.rows() {
            let energy: f64 = row.iter().map(|c| c.norm_sqr()).sum();
            assert!((energy.sqrt() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_basis_without_fft_padding() {
        let freqs = octave(110.0);
        let basis = build_basis(&freqs, 22050.0, &design(1.0), false).unwrap();
        assert_eq!(basis.padded_len(), basis.lengths.max_length().ceil() as usize);
    }

    #[test]
    fn test_basis_rows_are_centered() {
        let freqs = octave(440.0);
        let basis = build_basis(&freqs, 22050.0, &design(1.0), true).unwrap();
        let n = basis.padded_len();

        // The shortest filter (top bin) sits in the middle with zeros on both sides
        let row = basis.filters.row(11);
        let len = basis.lengths.params[11].length.ceil() as usize;
        let lpad = (n - len) / 2;
        assert!(row.iter().take(lpad).all(|c| c.norm() == 0.0));
        assert!(row.iter().skip(lpad + len).all(|c| c.norm() == 0.0));
        assert!(row[n / 2].norm() > 0.0);
    }
}
