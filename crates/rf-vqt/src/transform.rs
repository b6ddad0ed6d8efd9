//! Octave-recursive Variable-Q Transform
//!
//! ```text
//! Init → EarlyDownsample → TopOctaveDirect? → OctaveLoop → Assemble → Rescale → Done
//! ```
//!
//! The working signal is halved once per octave (while the hop length stays
//! even), so each octave's filters are short relative to their own rate.
//! The downsampling chain is materialized up front; octave jobs then only
//! read shared `Arc<[f64]>` buffers and can run on the rayon pool.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assemble::{rescale_rows, trim_stack};
use crate::config::VqtConfig;
use crate::error::{VqtError, VqtResult};
use crate::filterbank::FilterBankSpectrum;
use crate::freq::{num_two_factors, FrequencyBins};
use crate::matrix::VqtMatrix;
use crate::resample::{resample, ResampleQuality};
use crate::stft::response;
use crate::wavelet::{build_basis, compute_lengths, FilterDesign, WaveletLengths};

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Init,
    EarlyDownsample,
    TopOctaveDirect,
    OctaveLoop,
    Assemble,
    Rescale,
    Done,
}

/// Progress report passed to [`VariableQTransform::transform_with_progress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VqtProgress {
    pub stage: PipelineStage,
    /// Octave responses computed so far
    pub octaves_done: usize,
    pub total_octaves: usize,
}

impl VqtProgress {
    /// Fraction of octaves completed, 0.0 - 1.0
    pub fn fraction(&self) -> f64 {
        if self.total_octaves == 0 {
            1.0
        } else {
            self.octaves_done as f64 / self.total_octaves as f64
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WORKING STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Signal at one stage of the downsampling chain
#[derive(Debug, Clone)]
struct WorkingSignal {
    samples: Arc<[f64]>,
    sample_rate: f64,
    hop_length: usize,
}

impl WorkingSignal {
    /// Next stage: half the rate and hop, when the hop is even
    fn halved(&self) -> VqtResult<Option<Self>> {
        if self.hop_length % 2 != 0 {
            return Ok(None);
        }

        let samples = resample(&self.samples, 2.0, 1.0, ResampleQuality::Fast, true)?;
        Ok(Some(Self {
            samples: samples.into(),
            sample_rate: self.sample_rate / 2.0,
            hop_length: self.hop_length / 2,
        }))
    }
}

/// One octave's worth of work, independent of every other job
#[derive(Debug, Clone)]
struct OctaveJob {
    stage: PipelineStage,
    bins: Range<usize>,
    signal: WorkingSignal,
    /// Filter bank gain compensating for the downsampling so far
    gain: f64,
}

/// Ordered octave jobs plus the rate the final lengths are computed at
#[derive(Debug)]
struct OctavePlan {
    jobs: Vec<OctaveJob>,
    sample_rate: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM
// ═══════════════════════════════════════════════════════════════════════════════

/// Variable-Q transform with a fixed configuration
#[derive(Debug, Clone)]
pub struct VariableQTransform {
    config: VqtConfig,
    bins: FrequencyBins,
    design: FilterDesign,
}

impl VariableQTransform {
    /// Validate `config` and precompute the bin layout
    pub fn new(config: VqtConfig) -> VqtResult<Self> {
        config.validate()?;
        let bins = config.frequency_bins()?;
        let design = config.filter_design();

        Ok(Self {
            config,
            bins,
            design,
        })
    }

    pub fn config(&self) -> &VqtConfig {
        &self.config
    }

    pub fn frequencies(&self) -> &FrequencyBins {
        &self.bins
    }

    /// Wavelet parameters of every bin at `sample_rate`
    pub fn wavelet_lengths(&self, sample_rate: f64) -> VqtResult<WaveletLengths> {
        compute_lengths(
            self.bins.as_slice(),
            sample_rate,
            self.design.window,
            self.design.gamma,
            self.design.fallback_alpha,
            self.design.filter_scale,
        )
    }

    /// Transform a mono signal
    pub fn transform(&self, signal: &[f64], sample_rate: f64) -> VqtResult<VqtMatrix> {
        self.transform_with_progress(signal, sample_rate, &|_| {})
    }

    /// Transform a mono signal, reporting each completed octave.
    ///
    /// With `parallel` enabled the callback fires from worker threads, in
    /// completion order.
    pub fn transform_with_progress(
        &self,
        signal: &[f64],
        sample_rate: f64,
        progress: &(dyn Fn(VqtProgress) + Sync),
    ) -> VqtResult<VqtMatrix> {
        validate_signal(signal, sample_rate)?;

        let total_octaves = self.bins.num_octaves();
        let report = |stage, octaves_done| {
            progress(VqtProgress {
                stage,
                octaves_done,
                total_octaves,
            })
        };
        report(PipelineStage::Init, 0);

        let plan = self.plan(signal, sample_rate, &report)?;

        let done = AtomicUsize::new(0);
        let run = |job: &OctaveJob| -> VqtResult<Array2<Complex64>> {
            let resp = self.octave_response(job)?;
            report(job.stage, done.fetch_add(1, Ordering::Relaxed) + 1);
            Ok(resp)
        };

        let responses: Vec<Array2<Complex64>> = if self.config.parallel {
            plan.jobs.par_iter().map(run).collect::<VqtResult<_>>()?
        } else {
            plan.jobs.iter().map(run).collect::<VqtResult<_>>()?
        };

        report(PipelineStage::Assemble, total_octaves);
        let mut data = trim_stack(&responses, self.bins.len())?;

        report(PipelineStage::Rescale, total_octaves);
        let lengths = self.wavelet_lengths(plan.sample_rate)?;
        rescale_rows(&mut data, &lengths.lengths())?;

        log::debug!(
            "VQT: {} bins x {} frames from {} samples at {:.1} Hz",
            data.nrows(),
            data.ncols(),
            signal.len(),
            sample_rate
        );
        report(PipelineStage::Done, total_octaves);

        Ok(VqtMatrix::new(
            data,
            self.bins.clone(),
            sample_rate,
            self.config.hop_length,
        ))
    }

    /// Run the early downsample and materialize the per-octave chain.
    ///
    /// The chain halves after every octave while the hop is even. Once the
    /// hop turns odd, all remaining octaves reuse the same signal, rate and
    /// hop. No downsample follows the last octave, so an input that reaches
    /// it with a single sample still succeeds.
    fn plan(
        &self,
        signal: &[f64],
        sample_rate: f64,
        report: &dyn Fn(PipelineStage, usize),
    ) -> VqtResult<OctavePlan> {
        let n_octaves = self.bins.num_octaves();

        let cutoff = self.wavelet_lengths(sample_rate)?.cutoff;
        let nyquist = sample_rate / 2.0;
        if cutoff > nyquist {
            return Err(VqtError::NyquistExceeded { cutoff, nyquist });
        }

        let mut quality = if cutoff < ResampleQuality::Fast.passband() * nyquist {
            ResampleQuality::Fast
        } else {
            ResampleQuality::Best
        };

        log::debug!(
            "VQT: {} octaves, cutoff {:.1} Hz of {:.1} Hz Nyquist, {:?} quality",
            n_octaves,
            cutoff,
            nyquist,
            quality
        );

        let mut working = WorkingSignal {
            samples: Arc::from(signal),
            sample_rate,
            hop_length: self.config.hop_length,
        };

        let count = early_downsample_count(nyquist, cutoff, working.hop_length, n_octaves);
        if quality == ResampleQuality::Fast && count > 0 {
            working = early_downsample(&working, count)?;
            log::debug!(
                "VQT: early downsample by {}, working at {:.1} Hz hop {}",
                1usize << count,
                working.sample_rate,
                working.hop_length
            );
            report(PipelineStage::EarlyDownsample, 0);
        }

        let base_rate = working.sample_rate;
        let mut jobs = Vec::with_capacity(n_octaves);
        let mut first = 0;

        if quality != ResampleQuality::Fast {
            jobs.push(OctaveJob {
                stage: PipelineStage::TopOctaveDirect,
                bins: self.bins.octave_range(0),
                signal: working.clone(),
                gain: 1.0,
            });
            quality = ResampleQuality::Fast;
            first = 1;
        }
        log::trace!("VQT: octave loop from {first} with {quality:?} halving");

        for octave in first..n_octaves {
            jobs.push(OctaveJob {
                stage: PipelineStage::OctaveLoop,
                bins: self.bins.octave_range(octave),
                signal: working.clone(),
                gain: (base_rate / working.sample_rate).sqrt(),
            });

            // The last octave's downsampled signal would never be read
            if octave + 1 < n_octaves {
                if let Some(next) = working.halved()? {
                    working = next;
                }
            }
        }

        Ok(OctavePlan {
            jobs,
            sample_rate: base_rate,
        })
    }

    /// Basis build, FFT and short-time response for one octave
    fn octave_response(&self, job: &OctaveJob) -> VqtResult<Array2<Complex64>> {
        let freqs = &self.bins.as_slice()[job.bins.clone()];
        let basis = build_basis(freqs, job.signal.sample_rate, &self.design, true)?;

        let mut bank = FilterBankSpectrum::from_basis(basis)?;
        if job.gain != 1.0 {
            bank.scale(job.gain);
        }

        log::trace!(
            "VQT octave bins {:?}: {:.1} Hz, hop {}, n_fft {}",
            job.bins,
            job.signal.sample_rate,
            job.signal.hop_length,
            bank.n_fft
        );

        response(&job.signal.samples, job.signal.hop_length, &bank)
    }
}

/// Number of halvings applied before the octave loop
fn early_downsample_count(nyquist: f64, cutoff: f64, hop_length: usize, n_octaves: usize) -> u32 {
    let by_cutoff = ((ResampleQuality::Fast.passband() * nyquist / cutoff).log2().ceil() - 2.0)
        .max(0.0) as i64;
    let by_hop = (num_two_factors(hop_length) as i64 - n_octaves as i64 + 1).max(0);

    by_cutoff.min(by_hop) as u32
}

fn early_downsample(working: &WorkingSignal, count: u32) -> VqtResult<WorkingSignal> {
    let factor = 1usize << count;
    if working.samples.len() < factor {
        return Err(VqtError::SignalTooShort {
            len: working.samples.len(),
            reason: format!("early downsampling by a factor of {factor}"),
        });
    }

    let samples = resample(
        &working.samples,
        factor as f64,
        1.0,
        ResampleQuality::Fast,
        true,
    )?;

    Ok(WorkingSignal {
        samples: samples.into(),
        sample_rate: working.sample_rate / factor as f64,
        hop_length: working.hop_length / factor,
    })
}

fn validate_signal(signal: &[f64], sample_rate: f64) -> VqtResult<()> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(VqtError::InvalidRate(sample_rate));
    }
    if signal.is_empty() {
        return Err(VqtError::InvalidConfig("input signal is empty".into()));
    }
    if let Some(pos) = signal.iter().position(|s| !s.is_finite()) {
        return Err(VqtError::InvalidConfig(format!(
            "input signal is not finite at sample {pos}"
        )));
    }
    Ok(())
}

/// Variable-Q transform of `signal` with `config`
pub fn vqt(signal: &[f64], sample_rate: f64, config: &VqtConfig) -> VqtResult<VqtMatrix> {
    VariableQTransform::new(config.clone())?.transform(signal, sample_rate)
}

/// Constant-Q transform: [`vqt`] with the bandwidth offset forced to zero
pub fn cqt(signal: &[f64], sample_rate: f64, config: &VqtConfig) -> VqtResult<VqtMatrix> {
    let config = config.clone().with_gamma(Some(0.0));
    VariableQTransform::new(config)?.transform(signal, sample_rate)
}
