//! Transform configuration

use serde::{Deserialize, Serialize};

use crate::error::{VqtError, VqtResult};
use crate::freq::{midi_to_hz, relative_bandwidth, FrequencyBins, C1_HZ};
use crate::wavelet::FilterDesign;
use crate::window::WindowFunction;

/// Variable-Q transform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VqtConfig {
    /// Center frequency of the lowest bin (Hz)
    pub min_freq: f64,

    /// Total number of frequency bins
    pub n_bins: usize,

    /// Frequency resolution
    pub bins_per_octave: usize,

    /// Samples between successive frames
    pub hop_length: usize,

    /// Bandwidth offset (Hz). `None` derives it from the ERB scale,
    /// `Some(0.0)` gives the constant-Q transform.
    pub gamma: Option<f64>,

    /// Wavelet taper
    pub window: WindowFunction,

    /// Filter length multiplier
    pub filter_scale: f64,

    /// Lp order for per-filter normalization
    pub norm: f64,

    /// Process octaves on the rayon pool
    pub parallel: bool,
}

impl Default for VqtConfig {
    fn default() -> Self {
        Self {
            min_freq: C1_HZ,
            n_bins: 168,
            bins_per_octave: 24,
            hop_length: 512,
            gamma: None,
            window: WindowFunction::Hann,
            filter_scale: 1.0,
            norm: 1.0,
            parallel: false,
        }
    }
}

impl VqtConfig {
    /// Constant-Q transform (no bandwidth offset)
    pub fn cqt() -> Self {
        Self {
            gamma: Some(0.0),
            ..Default::default()
        }
    }

    /// 88 piano keys, A0 to C8, one bin per semitone
    pub fn piano() -> Self {
        Self {
            min_freq: midi_to_hz(21.0),
            n_bins: 88,
            bins_per_octave: 12,
            ..Default::default()
        }
    }

    /// Set bin count and resolution
    pub fn with_bins(mut self, n_bins: usize, bins_per_octave: usize) -> Self {
        self.n_bins = n_bins;
        self.bins_per_octave = bins_per_octave;
        self
    }

    pub fn with_min_freq(mut self, min_freq: f64) -> Self {
        self.min_freq = min_freq;
        self
    }

    pub fn with_hop_length(mut self, hop_length: usize) -> Self {
        self.hop_length = hop_length;
        self
    }

    pub fn with_gamma(mut self, gamma: Option<f64>) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    pub fn with_filter_scale(mut self, filter_scale: f64) -> Self {
        self.filter_scale = filter_scale;
        self
    }

    pub fn with_norm(mut self, norm: f64) -> Self {
        self.norm = norm;
        self
    }

    /// Enable or disable per-octave parallelism
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check every parameter that does not depend on the signal
    pub fn validate(&self) -> VqtResult<()> {
        if !(self.min_freq.is_finite() && self.min_freq > 0.0) {
            return Err(VqtError::InvalidConfig(format!(
                "minimum frequency must be positive, got {}",
                self.min_freq
            )));
        }
        if self.n_bins == 0 {
            return Err(VqtError::InvalidConfig("number of bins must be positive".into()));
        }
        if self.bins_per_octave == 0 {
            return Err(VqtError::InvalidConfig("bins per octave must be positive".into()));
        }
        if self.hop_length == 0 {
            return Err(VqtError::InvalidConfig("hop length must be positive".into()));
        }
        if !(self.filter_scale.is_finite() && self.filter_scale > 0.0) {
            return Err(VqtError::InvalidConfig(format!(
                "filter scale must be positive, got {}",
                self.filter_scale
            )));
        }
        if let Some(gamma) = self.gamma {
            if !(gamma.is_finite() && gamma >= 0.0) {
                return Err(VqtError::InvalidConfig(format!(
                    "gamma must be non-negative, got {gamma}"
                )));
            }
        }
        if self.norm.is_nan() || self.norm < 0.0 {
            return Err(VqtError::InvalidNorm(self.norm));
        }
        Ok(())
    }

    /// Center frequencies of all bins
    pub fn frequency_bins(&self) -> VqtResult<FrequencyBins> {
        FrequencyBins::geometric(self.min_freq, self.n_bins, self.bins_per_octave)
    }

    /// Filter shape shared by all octaves
    pub fn filter_design(&self) -> FilterDesign {
        FilterDesign {
            window: self.window,
            filter_scale: self.filter_scale,
            norm: self.norm,
            gamma: self.gamma,
            fallback_alpha: relative_bandwidth(self.bins_per_octave as f64),
        }
    }
}
