//! Frequency bin layout
//!
//! Geometric center frequencies, octave slicing and the small musical
//! helpers the transform needs. Tuning is fixed at A4 = 440 Hz.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{VqtError, VqtResult};

/// Concert pitch reference
pub const A4_HZ: f64 = 440.0;

/// C1 at A440 tuning, the default minimum frequency
pub const C1_HZ: f64 = 32.703195662574829;

/// Convert MIDI note number to frequency
pub fn midi_to_hz(midi: f64) -> f64 {
    A4_HZ * 2.0_f64.powf((midi - 69.0) / 12.0)
}

/// Convert frequency to (fractional) MIDI note number
pub fn hz_to_midi(freq: f64) -> f64 {
    69.0 + 12.0 * (freq / A4_HZ).log2()
}

/// Relative bandwidth between adjacent bins at a given octave resolution.
///
/// Used as the fallback alpha when a slice has fewer than two frequencies.
pub fn relative_bandwidth(bins_per_octave: f64) -> f64 {
    let r2 = 2.0_f64.powf(2.0 / bins_per_octave);
    (r2 - 1.0) / (r2 + 1.0)
}

/// Number of octaves needed to hold `n_bins`
pub fn num_octaves(n_bins: usize, bins_per_octave: usize) -> usize {
    n_bins.div_ceil(bins_per_octave)
}

/// Number of times `x` divides evenly by two (0 for `x == 0`)
pub fn num_two_factors(x: usize) -> u32 {
    if x == 0 { 0 } else { x.trailing_zeros() }
}

/// Strictly ascending set of center frequencies, one per output bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrequencyBins")]
pub struct FrequencyBins {
    freqs: Vec<f64>,
    bins_per_octave: usize,
}

/// Unchecked serialized form of [`FrequencyBins`]
#[derive(Deserialize)]
struct RawFrequencyBins {
    freqs: Vec<f64>,
    bins_per_octave: usize,
}

impl TryFrom<RawFrequencyBins> for FrequencyBins {
    type Error = VqtError;

    fn try_from(raw: RawFrequencyBins) -> VqtResult<Self> {
        if raw.freqs.is_empty() {
            return Err(VqtError::InvalidConfig("number of bins must be positive".into()));
        }
        if raw.bins_per_octave == 0 {
            return Err(VqtError::InvalidConfig("bins per octave must be positive".into()));
        }
        let positive = raw.freqs.iter().all(|f| f.is_finite() && *f > 0.0);
        if !positive || raw.freqs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(VqtError::InvalidConfig(
                "frequencies must be positive and strictly ascending".into(),
            ));
        }

        Ok(Self {
            freqs: raw.freqs,
            bins_per_octave: raw.bins_per_octave,
        })
    }
}

impl FrequencyBins {
    /// `freq[i] = fmin * 2^(i / bins_per_octave)`
    pub fn geometric(fmin: f64, n_bins: usize, bins_per_octave: usize) -> VqtResult<Self> {
        if !(fmin.is_finite() && fmin > 0.0) {
            return Err(VqtError::InvalidConfig(format!(
                "minimum frequency must be positive, got {fmin}"
            )));
        }
        if n_bins == 0 {
            return Err(VqtError::InvalidConfig("number of bins must be positive".into()));
        }
        if bins_per_octave == 0 {
            return Err(VqtError::InvalidConfig("bins per octave must be positive".into()));
        }

        let freqs = (0..n_bins)
            .map(|i| fmin * 2.0_f64.powf(i as f64 / bins_per_octave as f64))
            .collect();

        Ok(Self { freqs, bins_per_octave })
    }

    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    pub fn bins_per_octave(&self) -> usize {
        self.bins_per_octave
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.freqs
    }

    pub fn min(&self) -> f64 {
        self.freqs[0]
    }

    pub fn max(&self) -> f64 {
        self.freqs[self.freqs.len() - 1]
    }

    /// Number of filters per octave slice
    pub fn filters_per_octave(&self) -> usize {
        self.bins_per_octave.min(self.freqs.len())
    }

    /// Number of octave slices
    pub fn num_octaves(&self) -> usize {
        num_octaves(self.freqs.len(), self.bins_per_octave)
    }

    /// Bin index range of octave `octave`, counted from the top.
    ///
    /// Octave 0 holds the highest `filters_per_octave` bins. The lowest
    /// octave is clamped at bin 0 and may hold fewer filters.
    pub fn octave_range(&self, octave: usize) -> Range<usize> {
        let n = self.freqs.len();
        let per = self.filters_per_octave();
        let end = n.saturating_sub(per * octave);
        let start = end.saturating_sub(per);
        start..end
    }

    /// Frequencies of octave `octave`, counted from the top
    pub fn octave_slice(&self, octave: usize) -> &[f64] {
        &self.freqs[self.octave_range(octave)]
    }

    /// Index of the bin closest to `freq` on a log scale
    pub fn nearest_bin(&self, freq: f64) -> usize {
        let target = freq.log2();
        self.freqs
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.log2() - target).abs().total_cmp(&(b.log2() - target).abs())
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometric_bins() {
        let bins = FrequencyBins::geometric(C1_HZ, 84, 12).unwrap();
        assert_eq!(bins.len(), 84);
        assert_eq!(bins.min(), C1_HZ);
        // One octave up doubles
        assert!((bins.as_slice()[12] / bins.as_slice()[0] - 2.0).abs() < 1e-12);
        assert!(bins.as_slice().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_geometric_rejects_bad_params() {
        assert!(FrequencyBins::geometric(0.0, 12, 12).is_err());
        assert!(FrequencyBins::geometric(32.7, 0, 12).is_err());
        assert!(FrequencyBins::geometric(32.7, 12, 0).is_err());
    }

    #[test]
    fn test_midi_conversion() {
        assert!((midi_to_hz(69.0) - 440.0).abs() < 1e-9);
        assert!((midi_to_hz(24.0) - C1_HZ).abs() < 1e-9);
        assert!((hz_to_midi(261.6255653005986) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_relative_bandwidth() {
        let alpha = relative_bandwidth(12.0);
        let r = 2.0_f64.powf(1.0 / 12.0);
        assert!((alpha - (r * r - 1.0) / (r * r + 1.0)).abs() < 1e-15);
        assert!(relative_bandwidth(24.0) < alpha);
    }

    #[test]
    fn test_octave_helpers() {
        assert_eq!(num_octaves(84, 12), 7);
        assert_eq!(num_octaves(85, 12), 8);
        assert_eq!(num_two_factors(512), 9);
        assert_eq!(num_two_factors(384), 7);
        assert_eq!(num_two_factors(7), 0);
        assert_eq!(num_two_factors(0), 0);
    }

    #[test]
    fn test_octave_slices_cover_all_bins() {
        let bins = FrequencyBins::geometric(55.0, 30, 12).unwrap();
        assert_eq!(bins.num_octaves(), 3);
        assert_eq!(bins.octave_range(0), 18..30);
        assert_eq!(bins.octave_range(1), 6..18);
        // Partial lowest octave
        assert_eq!(bins.octave_range(2), 0..6);
        assert_eq!(bins.octave_slice(0).len(), 12);
    }

    #[test]
    fn test_filters_per_octave_small_bin_count() {
        let bins = FrequencyBins::geometric(55.0, 5, 12).unwrap();
        assert_eq!(bins.filters_per_octave(), 5);
        assert_eq!(bins.num_octaves(), 1);
        assert_eq!(bins.octave_range(0), 0..5);
    }

    #[test]
    fn test_deserialize_validates() {
        let bins = FrequencyBins::geometric(55.0, 24, 12).unwrap();
        let json = serde_json::to_string(&bins).unwrap();
        let back: FrequencyBins = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bins);

        for bad in [
            r#"{"freqs": [], "bins_per_octave": 12}"#,
            r#"{"freqs": [220.0, 110.0], "bins_per_octave": 12}"#,
            r#"{"freqs": [110.0, 110.0], "bins_per_octave": 12}"#,
            r#"{"freqs": [-1.0, 110.0], "bins_per_octave": 12}"#,
            r#"{"freqs": [110.0], "bins_per_octave": 0}"#,
        ] {
            assert!(serde_json::from_str::<FrequencyBins>(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_nearest_bin() {
        let bins = FrequencyBins::geometric(55.0, 36, 12).unwrap();
        assert_eq!(bins.nearest_bin(110.0), 12);
        assert_eq!(bins.nearest_bin(112.0), 12);
        assert_eq!(bins.nearest_bin(1.0), 0);
    }
}
