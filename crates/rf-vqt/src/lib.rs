//! # rf-vqt
//!
//! Variable-Q Transform engine: a time-frequency analysis with logarithmically
//! spaced bins whose bandwidth follows an ERB-style offset, with the
//! Constant-Q Transform as the `gamma = 0` special case.
//!
//! ## Features
//!
//! - **Octave recursion**: each octave is analyzed at half the rate of the one above
//! - **Band-limited resampler**: Kaiser-windowed sinc kernels, fast and best presets
//! - **Wavelet filter banks**: per-bin Q and length, Lp-normalized complex filters
//! - **Parallel octaves**: optional rayon fan-out with deterministic assembly
//!
//! ## Example
//!
//! ```rust,ignore
//! use rf_vqt::{VariableQTransform, VqtConfig};
//!
//! let vqt = VariableQTransform::new(VqtConfig::piano().with_hop_length(256))?;
//! let out = vqt.transform(&samples, 22050.0)?;
//!
//! for frame in 0..out.n_frames() {
//!     if let Some(bin) = out.peak_bin(frame) {
//!         println!("{:.2}s: {:.1} Hz", out.frame_times()[frame], out.frequencies().as_slice()[bin]);
//!     }
//! }
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod filterbank;
pub mod freq;
pub mod matrix;
pub mod resample;
pub mod stft;
pub mod transform;
pub mod wavelet;
pub mod window;

pub use config::VqtConfig;
pub use error::{VqtError, VqtResult};
pub use filterbank::FilterBankSpectrum;
pub use freq::{midi_to_hz, relative_bandwidth, FrequencyBins, C1_HZ};
pub use matrix::VqtMatrix;
pub use resample::{resample, ResampleQuality};
pub use transform::{cqt, vqt, PipelineStage, VariableQTransform, VqtProgress};
pub use wavelet::{
    build_basis, compute_lengths, lp_normalize, pad_center, FilterDesign, WaveletBasis,
    WaveletLengths, WaveletParameters,
};
pub use window::WindowFunction;
