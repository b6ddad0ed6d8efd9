//! Analysis window functions
//!
//! Windows applied to the wavelet filters, together with their equivalent
//! noise bandwidths (in FFT bins). The bandwidth feeds the cutoff frequency
//! estimate that decides resampling quality and the Nyquist check.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VqtError, VqtResult};

/// Window function type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
    Nuttall,
    FlatTop,
    Bartlett,
    Triangular,
    BartlettHann,
    Bohman,
    Cosine,
    Parzen,
    /// Boxcar / "ones" window
    Rectangular,
}

impl Default for WindowFunction {
    fn default() -> Self {
        Self::Hann
    }
}

/// Accepted names and aliases
const WINDOW_NAMES: &[(&str, WindowFunction)] = &[
    ("bart", WindowFunction::Bartlett),
    ("bartlett", WindowFunction::Bartlett),
    ("brt", WindowFunction::Bartlett),
    ("barthann", WindowFunction::BartlettHann),
    ("brthan", WindowFunction::BartlettHann),
    ("bth", WindowFunction::BartlettHann),
    ("bkh", WindowFunction::BlackmanHarris),
    ("blackharr", WindowFunction::BlackmanHarris),
    ("blackmanharris", WindowFunction::BlackmanHarris),
    ("black", WindowFunction::Blackman),
    ("blackman", WindowFunction::Blackman),
    ("blk", WindowFunction::Blackman),
    ("bman", WindowFunction::Bohman),
    ("bmn", WindowFunction::Bohman),
    ("bohman", WindowFunction::Bohman),
    ("box", WindowFunction::Rectangular),
    ("boxcar", WindowFunction::Rectangular),
    ("ones", WindowFunction::Rectangular),
    ("rect", WindowFunction::Rectangular),
    ("rectangular", WindowFunction::Rectangular),
    ("cosine", WindowFunction::Cosine),
    ("halfcosine", WindowFunction::Cosine),
    ("flat", WindowFunction::FlatTop),
    ("flattop", WindowFunction::FlatTop),
    ("flt", WindowFunction::FlatTop),
    ("ham", WindowFunction::Hamming),
    ("hamm", WindowFunction::Hamming),
    ("hamming", WindowFunction::Hamming),
    ("han", WindowFunction::Hann),
    ("hann", WindowFunction::Hann),
    ("hanning", WindowFunction::Hann),
    ("nut", WindowFunction::Nuttall),
    ("nutl", WindowFunction::Nuttall),
    ("nuttall", WindowFunction::Nuttall),
    ("par", WindowFunction::Parzen),
    ("parz", WindowFunction::Parzen),
    ("parzen", WindowFunction::Parzen),
    ("tri", WindowFunction::Triangular),
    ("triang", WindowFunction::Triangular),
    ("triangle", WindowFunction::Triangular),
];

impl WindowFunction {
    /// Look up a window by name (case-insensitive, aliases accepted)
    pub fn from_name(name: &str) -> VqtResult<Self> {
        let key = name.trim().to_ascii_lowercase();
        WINDOW_NAMES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|&(_, window)| window)
            .ok_or_else(|| VqtError::UnknownWindow(name.to_string()))
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hann => "hann",
            Self::Hamming => "hamming",
            Self::Blackman => "blackman",
            Self::BlackmanHarris => "blackmanharris",
            Self::Nuttall => "nuttall",
            Self::FlatTop => "flattop",
            Self::Bartlett => "bartlett",
            Self::Triangular => "triang",
            Self::BartlettHann => "barthann",
            Self::Bohman => "bohman",
            Self::Cosine => "cosine",
            Self::Parzen => "parzen",
            Self::Rectangular => "boxcar",
        }
    }

    /// Equivalent noise bandwidth in FFT bins
    pub fn bandwidth(&self) -> f64 {
        match self {
            Self::Hann => 1.50018310546875,
            Self::Hamming => 1.3629455320350348,
            Self::Blackman => 1.7269681554262326,
            Self::BlackmanHarris => 2.0045975283585014,
            Self::Nuttall => 1.9763500280946082,
            Self::FlatTop => 2.7762255046484143,
            Self::Bartlett => 1.3334961334912805,
            Self::Triangular => 1.3331706523555851,
            Self::BartlettHann => 1.4560255965133932,
            Self::Bohman => 1.7859588613860062,
            Self::Cosine => 1.2337005350199792,
            Self::Parzen => 1.9174603174603191,
            Self::Rectangular => 1.0,
        }
    }

    /// Generate `length` window samples.
    ///
    /// `symmetric == false` yields the periodic variant used for spectral
    /// analysis: `length + 1` symmetric samples with the last one dropped.
    pub fn generate(&self, length: usize, symmetric: bool) -> Vec<f64> {
        if length <= 1 {
            return vec![1.0; length];
        }

        if symmetric {
            self.symmetric(length)
        } else {
            let mut window = self.symmetric(length + 1);
            window.truncate(length);
            window
        }
    }

    /// Periodic window for a fractional length.
    ///
    /// `floor(length)` samples, zero-padded to `ceil(length)`.
    pub fn float_window(&self, length: f64) -> Vec<f64> {
        let length = length.max(0.0);
        let n_min = length.floor() as usize;
        let n_max = length.ceil() as usize;

        let mut window = self.generate(n_min, false);
        window.resize(n_max, 0.0);
        window
    }

    fn symmetric(&self, m: usize) -> Vec<f64> {
        match self {
            Self::Hann => general_cosine(m, &[0.5, 0.5]),
            Self::Hamming => general_cosine(m, &[0.54, 0.46]),
            Self::Blackman => general_cosine(m, &[0.42, 0.50, 0.08]),
            Self::BlackmanHarris => general_cosine(m, &[0.35875, 0.48829, 0.14128, 0.01168]),
            Self::Nuttall => general_cosine(m, &[0.3635819, 0.4891775, 0.1365995, 0.0106411]),
            Self::FlatTop => general_cosine(
                m,
                &[0.21557895, 0.41663158, 0.277263158, 0.083578947, 0.006947368],
            ),
            Self::Bartlett => {
                let half = (m - 1) as f64 / 2.0;
                (0..m)
                    .map(|n| {
                        let n = n as f64;
                        if n <= half { n / half } else { 2.0 - n / half }
                    })
                    .collect()
            }
            Self::Triangular => triangular(m),
            Self::BartlettHann => {
                let denom = (m - 1) as f64;
                (0..m)
                    .map(|n| {
                        let fac = (n as f64 / denom - 0.5).abs();
                        0.62 - 0.48 * fac + 0.38 * (2.0 * PI * fac).cos()
                    })
                    .collect()
            }
            Self::Bohman => {
                let denom = (m - 1) as f64;
                (0..m)
                    .map(|n| {
                        if n == 0 || n == m - 1 {
                            return 0.0;
                        }
                        let fac = (2.0 * n as f64 / denom - 1.0).abs();
                        (1.0 - fac) * (PI * fac).cos() + (PI * fac).sin() / PI
                    })
                    .collect()
            }
            Self::Cosine => (0..m)
                .map(|n| (PI * (n as f64 + 0.5) / m as f64).sin())
                .collect(),
            Self::Parzen => {
                let center = (m - 1) as f64 / 2.0;
                let half_len = m as f64 / 2.0;
                (0..m)
                    .map(|n| {
                        let a = (n as f64 - center).abs();
                        if a <= center / 2.0 {
                            let r = a / half_len;
                            1.0 - 6.0 * r * r + 6.0 * r * r * r
                        } else {
                            2.0 * (1.0 - a / half_len).powi(3)
                        }
                    })
                    .collect()
            }
            Self::Rectangular => vec![1.0; m],
        }
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowFunction {
    type Err = VqtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Sum of cosines with alternating signs over `[-pi, pi]`
fn general_cosine(m: usize, coeffs: &[f64]) -> Vec<f64> {
    let step = 2.0 * PI / (m - 1) as f64;
    (0..m)
        .map(|n| {
            let fac = -PI + step * n as f64;
            coeffs
                .iter()
                .enumerate()
                .map(|(k, a)| a * (k as f64 * fac).cos())
                .sum()
        })
        .collect()
}

fn triangular(m: usize) -> Vec<f64> {
    let half = (m + 1) / 2;
    let rising: Vec<f64> = if m % 2 == 0 {
        (1..=half).map(|n| (2 * n - 1) as f64 / m as f64).collect()
    } else {
        (1..=half).map(|n| 2.0 * n as f64 / (m + 1) as f64).collect()
    };

    let mut window = rising.clone();
    if m % 2 == 0 {
        window.extend(rising.iter().rev());
    } else {
        window.extend(rising.iter().rev().skip(1));
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lookup() {
        assert_eq!(WindowFunction::from_name("hann").unwrap(), WindowFunction::Hann);
        assert_eq!(WindowFunction::from_name("Hanning").unwrap(), WindowFunction::Hann);
        assert_eq!(WindowFunction::from_name("ones").unwrap(), WindowFunction::Rectangular);
        assert_eq!("bkh".parse::<WindowFunction>().unwrap(), WindowFunction::BlackmanHarris);
    }

    #[test]
    fn test_unknown_window() {
        let err = WindowFunction::from_name("gaussian").unwrap_err();
        assert_eq!(err, VqtError::UnknownWindow("gaussian".to_string()));
    }

    #[test]
    fn test_every_alias_resolves_to_its_bandwidth() {
        for (alias, window) in WINDOW_NAMES {
            let resolved = WindowFunction::from_name(alias).unwrap();
            assert_eq!(resolved, *window);
            assert!(resolved.bandwidth() >= 1.0);
        }
        assert_eq!(WindowFunction::Rectangular.bandwidth(), 1.0);
        assert!((WindowFunction::Hann.bandwidth() - 1.5002).abs() < 1e-3);
    }

    #[test]
    fn test_periodic_hann() {
        let win = WindowFunction::Hann.generate(8, false);
        assert_eq!(win.len(), 8);
        assert!(win[0].abs() < 1e-12);
        assert!((win[4] - 1.0).abs() < 1e-12);
        // Periodic: w[k] == w[n - k]
        assert!((win[1] - win[7]).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_hann() {
        let win = WindowFunction::Hann.generate(9, true);
        assert!(win[0].abs() < 1e-12);
        assert!(win[8].abs() < 1e-12);
        assert!((win[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_lengths() {
        assert!(WindowFunction::Hann.generate(0, false).is_empty());
        assert_eq!(WindowFunction::Blackman.generate(1, false), vec![1.0]);
    }

    #[test]
    fn test_triangular_shapes() {
        assert_eq!(triangular(4), vec![0.25, 0.75, 0.75, 0.25]);
        assert_eq!(triangular(5), vec![1.0 / 3.0, 2.0 / 3.0, 1.0, 2.0 / 3.0, 1.0 / 3.0]);
    }

    #[test]
    fn test_float_window_zero_tail() {
        let win = WindowFunction::Hann.float_window(10.4);
        assert_eq!(win.len(), 11);
        assert_eq!(win[10], 0.0);
        assert_eq!(&win[..10], WindowFunction::Hann.generate(10, false).as_slice());
    }

    #[test]
    fn test_windows_are_bounded() {
        for (_, window) in WINDOW_NAMES {
            for w in window.generate(64, false) {
                assert!(w.is_finite());
                assert!(w <= 1.0 + 1e-6, "{} exceeds unity", window);
                assert!(w >= -0.1, "{} too negative", window);
            }
        }
    }
}
