//! Linear convolution and cross-correlation.
//!
//! Convolution always produces the full `nx + nh - 1` samples first; the
//! [`ConvolveShift`] mode then decides how the result is indexed or
//! truncated. Every result carries `[i1, i2]`, the range over which the
//! kernel was fully immersed in the input. Samples outside it are partial
//! sums.
//!
//! Correlation is convolution with the kernel reversed. The four
//! [`Normalization`] modes are evaluated in the same pass as the sums, with
//! output indices processed in parallel using Rayon.

use crate::error::{DspError, DspResult};
use crate::fft::FftEngine;
use lib_types::units::{Hertz, Seconds};
use rayon::prelude::*;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Above this many multiply-adds the unnormalized paths switch to FFT convolution.
const FFT_THRESHOLD: usize = 1 << 20;

/// Post-processing applied to the full convolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConvolveShift {
    /// Raw convolution, index 0 is `x[0]·h[0]`.
    #[default]
    None,
    /// Full length, indexed by lag `index − nh + 1`.
    Centered,
    /// Truncated to `nx` samples starting at `nh/2`, aligned with the input.
    Truncated,
}

impl TryFrom<i32> for ConvolveShift {
    type Error = DspError;

    fn try_from(value: i32) -> DspResult<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Centered),
            2 => Ok(Self::Truncated),
            other => Err(DspError::invalid("shift", format!("expected 0, 1 or 2, got {}", other))),
        }
    }
}

/// Correlation normalization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Normalization {
    /// Raw dot-product sums.
    #[default]
    None,
    /// Divide by the product of the global vector norms.
    Gncc,
    /// Divide each index by the norms of the samples summed at that index.
    Ncc,
    /// Zero-mean, unit-variance correlation of the overlapping segments.
    Zncc,
}

impl FromStr for Normalization {
    type Err = DspError;

    fn from_str(s: &str) -> DspResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" | "" => Ok(Self::None),
            "GNCC" => Ok(Self::Gncc),
            "NCC" => Ok(Self::Ncc),
            "ZNCC" => Ok(Self::Zncc),
            other => Err(DspError::invalid(
                "norm",
                format!("unsupported normalization `{}`", other),
            )),
        }
    }
}

/// A convolution result with its full-immersion bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct Convolution {
    pub samples: Vec<f64>,
    /// First index where the kernel is fully immersed.
    pub i1: usize,
    /// Last index where the kernel is fully immersed.
    pub i2: usize,
    pub shift: ConvolveShift,
    pub kernel_len: usize,
}

impl Convolution {
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Indices holding fully formed samples, or `None` if the kernel is
    /// longer than the input and never fully immersed.
    pub fn full_range(&self) -> Option<RangeInclusive<usize>> {
        (self.i1 <= self.i2 && self.i2 < self.samples.len()).then(|| self.i1..=self.i2)
    }

    /// Whether the sample at `index` is a complete sum.
    pub fn is_reliable(&self, index: usize) -> bool {
        self.full_range().map_or(false, |r| r.contains(&index))
    }

    /// Signed lag of `index` in samples.
    pub fn lag(&self, index: usize) -> isize {
        match self.shift {
            ConvolveShift::Centered => index as isize - (self.kernel_len as isize - 1),
            ConvolveShift::None | ConvolveShift::Truncated => index as isize,
        }
    }

    /// Index and value of the maximum sample (first one on ties).
    pub fn peak(&self) -> Option<(usize, f64)> {
        self.samples
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best: Option<(usize, f64)>, p| match best {
                Some(b) if b.1 >= p.1 => Some(b),
                _ => Some(p),
            })
    }
}

/// A cross-correlation result.
#[derive(Clone, Debug, PartialEq)]
pub struct Correlation {
    pub convolution: Convolution,
    pub norm: Normalization,
}

/// The maximum of a correlation expressed as a lag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CorrelationPeak {
    pub index: usize,
    /// `index − nh + 1`.
    pub lag: isize,
    pub value: f64,
}

impl CorrelationPeak {
    /// The lag in seconds, when a sampling frequency is known.
    pub fn lag_seconds(&self, fs: Hertz) -> Option<Seconds> {
        fs.is_set().then(|| Seconds(self.lag as f64 / fs.0))
    }
}

impl Correlation {
    pub fn values(&self) -> &[f64] {
        &self.convolution.samples
    }

    pub fn peak(&self) -> Option<CorrelationPeak> {
        self.convolution.peak().map(|(index, value)| CorrelationPeak {
            index,
            lag: self.convolution.lag(index),
            value,
        })
    }
}

/// Direct time-domain convolution (for small kernels or verification).
pub fn direct_convolve(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    let output_len = signal.len() + kernel.len() - 1;
    let mut output = vec![0.0; output_len];

    for (i, &s) in signal.iter().enumerate() {
        for (j, &k) in kernel.iter().enumerate() {
            output[i + j] += s * k;
        }
    }

    output
}

/// Convolution through the real FFT, zero-padded to the next power of two.
pub fn fft_convolve(signal: &[f64], kernel: &[f64]) -> DspResult<Vec<f64>> {
    if signal.is_empty() || kernel.is_empty() {
        return Ok(Vec::new());
    }
    let len = signal.len() + kernel.len() - 1;
    let size = len.next_power_of_two();
    let padded = |x: &[f64]| {
        let mut v = x.to_vec();
        v.resize(size, 0.0);
        v
    };

    let mut fft = FftEngine::new();
    let mut product = fft.rfft(&padded(signal))?;
    let kernel_bins = fft.rfft(&padded(kernel))?;
    product.iter_mut().zip(&kernel_bins).for_each(|(s, k)| *s *= *k);

    let mut out = fft.irfft(&product, size)?;
    out.truncate(len);
    Ok(out)
}

fn check_inputs(signal: &[f64], kernel: &[f64]) -> DspResult<()> {
    if signal.is_empty() {
        return Err(DspError::missing("no input data loaded"));
    }
    if kernel.is_empty() {
        return Err(DspError::missing("no waveform/kernel loaded"));
    }
    Ok(())
}

fn full_convolve(signal: &[f64], kernel: &[f64]) -> DspResult<Vec<f64>> {
    if signal.len() * kernel.len() > FFT_THRESHOLD {
        tracing::debug!(
            "convolution via FFT: nx={}, nh={}",
            signal.len(),
            kernel.len()
        );
        fft_convolve(signal, kernel)
    } else {
        Ok(direct_convolve(signal, kernel))
    }
}

/// Apply the shift mode to a full-length result.
fn finish(full: Vec<f64>, nx: usize, nh: usize, shift: ConvolveShift) -> Convolution {
    let i1 = nh - 1;
    let i2 = nx - 1;
    match shift {
        ConvolveShift::None | ConvolveShift::Centered => Convolution {
            samples: full,
            i1,
            i2,
            shift,
            kernel_len: nh,
        },
        ConvolveShift::Truncated => {
            let offset = nh / 2;
            let samples = full[offset..offset + nx].to_vec();
            Convolution {
                samples,
                i1: i1 - offset,
                i2: i2.saturating_sub(offset),
                shift,
                kernel_len: nh,
            }
        }
    }
}

/// Full linear convolution `x * h` with the requested shift mode.
pub fn convolve(signal: &[f64], kernel: &[f64], shift: ConvolveShift) -> DspResult<Convolution> {
    check_inputs(signal, kernel)?;
    let full = full_convolve(signal, kernel)?;
    Ok(finish(full, signal.len(), kernel.len(), shift))
}

#[derive(Default)]
struct Overlap {
    n: usize,
    xh: f64,
    xx: f64,
    hh: f64,
    x: f64,
    h: f64,
}

impl Overlap {
    fn zncc(&self) -> f64 {
        let n = self.n as f64;
        let (mx, mh) = (self.x / n, self.h / n);
        let var_x = self.xx / n - mx * mx;
        let var_h = self.hh / n - mh * mh;
        if var_x <= 0.0 || var_h <= 0.0 {
            return 0.0;
        }
        (self.xh / n - mx * mh) / (var_x.sqrt() * var_h.sqrt())
    }

    fn ncc(&self) -> f64 {
        let denom = (self.xx * self.hh).sqrt();
        if denom > 0.0 {
            self.xh / denom
        } else {
            0.0
        }
    }
}

/// Cross-correlation of `signal` with `kernel`, indexed by lag.
///
/// Index `k` of the result corresponds to lag `k − nh + 1`; a signal
/// correlated with itself peaks at lag 0.
pub fn correlate(signal: &[f64], kernel: &[f64], norm: Normalization) -> DspResult<Correlation> {
    check_inputs(signal, kernel)?;
    let nx = signal.len();
    let nh = kernel.len();
    let reversed: Vec<f64> = kernel.iter().rev().copied().collect();

    let full = match norm {
        Normalization::None | Normalization::Gncc => {
            let mut full = full_convolve(signal, &reversed)?;
            if norm == Normalization::Gncc {
                let ex: f64 = signal.iter().map(|v| v * v).sum();
                let eh: f64 = kernel.iter().map(|v| v * v).sum();
                let denom = (ex * eh).sqrt();
                if denom > 0.0 {
                    full.iter_mut().for_each(|v| *v /= denom);
                } else {
                    tracing::warn!("GNCC normalization skipped: zero-energy input or kernel");
                }
            }
            full
        }
        Normalization::Ncc | Normalization::Zncc => (0..nx + nh - 1)
            .into_par_iter()
            .map(|k| {
                let lo = k.saturating_sub(nh - 1);
                let hi = k.min(nx - 1);
                let mut acc = Overlap::default();
                for i in lo..=hi {
                    let xv = signal[i];
                    let hv = reversed[k - i];
                    acc.n += 1;
                    acc.xh += xv * hv;
                    acc.xx += xv * xv;
                    acc.hh += hv * hv;
                    acc.x += xv;
                    acc.h += hv;
                }
                if norm == Normalization::Ncc {
                    acc.ncc()
                } else {
                    acc.zncc()
                }
            })
            .collect(),
    };

    Ok(Correlation {
        convolution: finish(full, nx, nh, ConvolveShift::Centered),
        norm,
    })
}
