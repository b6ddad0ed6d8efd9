//! Short-time spectrum and filter bank response
//!
//! The signal is zero-padded by `n_fft / 2` on both sides so that frame `t`
//! is centered on sample `t * hop`. Frames are not windowed: the wavelets
//! carry their own taper.

use ndarray::Array2;
use num_complex::Complex64;
use realfft::RealFftPlanner;

use crate::error::{VqtError, VqtResult};
use crate::filterbank::FilterBankSpectrum;

/// Number of centered frames for a signal of `len` samples
pub fn num_frames(len: usize, hop_length: usize) -> usize {
    1 + len / hop_length
}

/// Centered, unwindowed short-time spectrum.
///
/// Returns `(n_fft / 2 + 1, num_frames(len, hop))` coefficients.
pub fn short_time_spectrum(
    signal: &[f64],
    n_fft: usize,
    hop_length: usize,
) -> VqtResult<Array2<Complex64>> {
    if n_fft == 0 {
        return Err(VqtError::InvalidConfig("FFT size must be positive".into()));
    }
    if hop_length == 0 {
        return Err(VqtError::InvalidConfig("hop length must be positive".into()));
    }

    let pad = n_fft / 2;
    let mut padded = vec![0.0; signal.len() + 2 * pad];
    padded[pad..pad + signal.len()].copy_from_slice(signal);

    let n_frames = num_frames(signal.len(), hop_length);
    let n_bins = n_fft / 2 + 1;

    let fft = RealFftPlanner::<f64>::new().plan_fft_forward(n_fft);
    let mut input = fft.make_input_vec();
    let mut output = fft.make_output_vec();

    let mut spectrum = Array2::<Complex64>::zeros((n_bins, n_frames));

    for frame in 0..n_frames {
        let start = frame * hop_length;
        let available = padded.len().saturating_sub(start).min(n_fft);
        input[..available].copy_from_slice(&padded[start..start + available]);
        input[available..].fill(0.0);

        fft.process(&mut input, &mut output)
            .map_err(|e| VqtError::FftError(e.to_string()))?;

        for (k, &c) in output.iter().enumerate() {
            spectrum[[k, frame]] = c;
        }
    }

    Ok(spectrum)
}

/// Apply a filter bank to a signal: `bank.spectrum · STFT(signal)`.
///
/// Output shape is `(n_filters, num_frames(len, hop))`.
pub fn response(
    signal: &[f64],
    hop_length: usize,
    bank: &FilterBankSpectrum,
) -> VqtResult<Array2<Complex64>> {
    let spectrum = short_time_spectrum(signal, bank.n_fft, hop_length)?;
    Ok(bank.spectrum.dot(&spectrum))
}
