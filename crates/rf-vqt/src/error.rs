//! Error types for the VQT engine

use thiserror::Error;

/// VQT engine errors
///
/// Every variant is a deterministic function of the input parameters.
/// Retrying with the same inputs always fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VqtError {
    /// Sample rate is zero, negative or not finite
    #[error("Invalid sample rate: {0} Hz")]
    InvalidRate(f64),

    /// Lp norm order is negative or NaN
    #[error("Unsupported norm: {0}")]
    InvalidNorm(f64),

    /// Window name not present in the bandwidth table
    #[error("Unknown window function: {0}")]
    UnknownWindow(String),

    /// Center padding target is smaller than the data
    #[error("Target size ({target}) must be at least input size ({len})")]
    TargetTooSmall { target: usize, len: usize },

    /// Not enough samples for a resample or downsample step
    #[error("Input signal of {len} samples is too short: {reason}")]
    SignalTooShort { len: usize, reason: String },

    /// Highest filter would reach past the Nyquist frequency
    #[error(
        "Wavelet basis with cutoff {cutoff:.3} Hz would exceed the Nyquist frequency {nyquist:.3} Hz; \
         reduce the number of bins or raise the minimum frequency"
    )]
    NyquistExceeded { cutoff: f64, nyquist: f64 },

    /// Structural configuration problem
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// FFT buffer mismatch
    #[error("FFT error: {0}")]
    FftError(String),
}

/// Result type for VQT operations
pub type VqtResult<T> = Result<T, VqtError>;
