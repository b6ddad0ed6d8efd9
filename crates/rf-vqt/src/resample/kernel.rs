//! Interpolation kernel presets
//!
//! Right wing of a Kaiser-windowed sinc, sampled at `2^9` points per zero
//! crossing. Built once per process and shared read-only afterwards.

use std::f64::consts::PI;
use std::sync::OnceLock;

use super::ResampleQuality;

/// Samples per zero crossing, as a power of two
const PRECISION_BITS: u32 = 9;

/// Precomputed half-window with first-difference table
#[derive(Debug, Clone)]
pub struct InterpolationKernel {
    /// Right wing of the windowed sinc, `num_zeros * precision + 1` taps
    window: Vec<f64>,
    /// `window[i + 1] - window[i]`, last entry zero
    deltas: Vec<f64>,
    /// Taps per zero crossing
    precision: usize,
    /// Passband edge as a fraction of Nyquist
    rolloff: f64,
}

impl InterpolationKernel {
    fn design(num_zeros: usize, beta: f64, rolloff: f64) -> Self {
        let precision = 1usize << PRECISION_BITS;
        let n = precision * num_zeros;
        let i0_beta = bessel_i0(beta);

        let window: Vec<f64> = (0..=n)
            .map(|k| {
                let x = k as f64 / precision as f64;
                let sinc = rolloff * sinc(rolloff * x);

                let r = k as f64 / n as f64;
                let taper = bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / i0_beta;

                sinc * taper
            })
            .collect();

        let mut deltas = vec![0.0; window.len()];
        for (d, pair) in deltas.iter_mut().zip(window.windows(2)) {
            *d = pair[1] - pair[0];
        }

        Self {
            window,
            deltas,
            precision,
            rolloff,
        }
    }

    pub fn window(&self) -> &[f64] {
        &self.window
    }

    pub fn deltas(&self) -> &[f64] {
        &self.deltas
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn rolloff(&self) -> f64 {
        self.rolloff
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Shared kernel for a quality preset
pub fn kernel(quality: ResampleQuality) -> &'static InterpolationKernel {
    static FAST: OnceLock<InterpolationKernel> = OnceLock::new();
    static BEST: OnceLock<InterpolationKernel> = OnceLock::new();

    match quality {
        ResampleQuality::Fast => {
            FAST.get_or_init(|| InterpolationKernel::design(16, 8.555504641634386, 0.85))
        }
        ResampleQuality::Best => BEST.get_or_init(|| {
            InterpolationKernel::design(64, 14.769656459379492, 0.9475937167399596)
        }),
    }
}

/// Normalized sinc, `sin(pi x) / (pi x)`
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Modified Bessel function I0 (power series)
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;

    for k in 1..200 {
        term *= (x / (2.0 * k as f64)).powi(2);
        sum += term;
        if term < sum * 1e-17 {
            break;
        }
    }

    sum
}
