//! Band-limited resampling
//!
//! Polyphase sinc interpolation over a precomputed kernel, used both for
//! arbitrary-ratio resampling and for the octave-halving steps of the VQT.
//!
//! For each output sample the fractional time register `t / ratio` selects
//! a kernel phase; the left and right wings are summed until either the
//! kernel or the input runs out, interpolating linearly between kernel taps.

mod kernel;

pub use kernel::{kernel, InterpolationKernel};

use serde::{Deserialize, Serialize};

use crate::error::{VqtError, VqtResult};

/// Resampling kernel preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleQuality {
    /// 16 zero crossings, passband to 85% of Nyquist
    Fast,
    /// 64 zero crossings, passband to ~94.8% of Nyquist
    Best,
}

impl ResampleQuality {
    /// Nominal passband edge as a fraction of Nyquist
    pub fn passband(&self) -> f64 {
        match self {
            Self::Fast => 0.85,
            Self::Best => 0.9475937167399596,
        }
    }
}

impl Default for ResampleQuality {
    fn default() -> Self {
        Self::Best
    }
}

/// Resample a mono signal from `source_rate` to `target_rate`.
///
/// The output holds exactly `ceil(len * target_rate / source_rate)` samples.
/// With `rescale` every sample is divided by `sqrt(ratio)` to preserve energy.
pub fn resample(
    signal: &[f64],
    source_rate: f64,
    target_rate: f64,
    quality: ResampleQuality,
    rescale: bool,
) -> VqtResult<Vec<f64>> {
    let mut channels =
        resample_channels(&[signal], source_rate, target_rate, quality, rescale)?;
    Ok(channels.pop().unwrap_or_default())
}

/// Resample planar multi-channel audio; all channels must share a length.
pub fn resample_channels(
    channels: &[&[f64]],
    source_rate: f64,
    target_rate: f64,
    quality: ResampleQuality,
    rescale: bool,
) -> VqtResult<Vec<Vec<f64>>> {
    validate_rate(source_rate)?;
    validate_rate(target_rate)?;

    let len = channels.first().map_or(0, |c| c.len());
    if channels.iter().any(|c| c.len() != len) {
        return Err(VqtError::InvalidConfig(
            "all channels must have the same length".into(),
        ));
    }

    let ratio = target_rate / source_rate;
    let buffer_len = (len as f64 * ratio) as usize;
    if buffer_len < 1 {
        return Err(VqtError::SignalTooShort {
            len,
            reason: format!("cannot resample from {source_rate} Hz to {target_rate} Hz"),
        });
    }

    let kernel = kernel(quality);
    let mut outputs = vec![vec![0.0; buffer_len]; channels.len()];
    interpolate(channels, &mut outputs, ratio, kernel)?;

    let out_len = (len as f64 * ratio).ceil() as usize;
    let norm = ratio.sqrt();

    Ok(outputs
        .into_iter()
        .map(|channel| {
            let mut channel = fix_length(&channel, out_len);
            if rescale {
                channel.iter_mut().for_each(|s| *s /= norm);
            }
            channel
        })
        .collect())
}

/// Trim or zero-pad `data` to exactly `size` samples
pub fn fix_length(data: &[f64], size: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&data[..data.len().min(size)]);
    out.resize(size, 0.0);
    out
}

fn validate_rate(rate: f64) -> VqtResult<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(VqtError::InvalidRate(rate))
    }
}

/// Accumulate the interpolated output of every channel into `outputs`
fn interpolate(
    inputs: &[&[f64]],
    outputs: &mut [Vec<f64>],
    ratio: f64,
    kernel: &InterpolationKernel,
) -> VqtResult<()> {
    let window = kernel.window();
    let deltas = kernel.deltas();
    let precision = kernel.precision() as f64;

    // Lowering the rate stretches the kernel and scales its gain
    let scale = ratio.min(1.0);
    let time_increment = 1.0 / ratio;
    let index_step = (scale * precision) as usize;
    if index_step == 0 {
        return Err(VqtError::InvalidConfig(format!(
            "resample ratio {ratio} is below the kernel resolution"
        )));
    }

    let n_win = window.len();
    let n_orig = inputs.first().map_or(0, |c| c.len());
    let n_out = outputs.first().map_or(0, |c| c.len());

    let mut time_register = 0.0_f64;

    for t in 0..n_out {
        let n = time_register as usize;

        // Left wing
        let frac = scale * (time_register - n as f64);
        let index_frac = frac * precision;
        let offset = index_frac as usize;
        let eta = index_frac - offset as f64;

        let i_max = (n + 1).min((n_win - offset) / index_step);
        for i in 0..i_max {
            let tap = offset + i * index_step;
            let weight = scale * (window[tap] + eta * deltas[tap]);
            for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
                output[t] += weight * input[n - i];
            }
        }

        // Right wing
        let frac = scale - frac;
        let index_frac = frac * precision;
        let offset = index_frac as usize;
        let eta = index_frac - offset as f64;

        let k_max = (n_orig - n - 1).min((n_win - offset) / index_step);
        for k in 0..k_max {
            let tap = offset + k * index_step;
            let weight = scale * (window[tap] + eta * deltas[tap]);
            for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
                output[t] += weight * input[n + k + 1];
            }
        }

        time_register += time_increment;
    }

    Ok(())
}
