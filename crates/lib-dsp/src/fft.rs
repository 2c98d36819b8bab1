//! Planned FFTs of arbitrary length.
//!
//! [`FftEngine`] caches rustfft/realfft plans so repeated transforms of the
//! same size (the common case inside the engine) plan once. Lengths need not
//! be powers of two.

use crate::error::{DspError, DspResult};
use num_complex::Complex64;
use realfft::RealFftPlanner;
use rustfft::FftPlanner;

/// Output scaling applied after a complex transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Norm {
    /// Raw sums.
    None,
    /// Divide by `N` (textbook inverse).
    ByLength,
    /// Divide by `sqrt(N)`; forward and inverse are then exact mirrors.
    Unitary,
}

impl Norm {
    fn factor(self, n: usize) -> Option<f64> {
        match self {
            Self::None => None,
            Self::ByLength => Some((n as f64).recip()),
            Self::Unitary => Some((n as f64).sqrt().recip()),
        }
    }
}

/// FFT engine with cached planners.
pub struct FftEngine {
    complex: FftPlanner<f64>,
    real: RealFftPlanner<f64>,
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FftEngine {
    pub fn new() -> Self {
        Self {
            complex: FftPlanner::new(),
            real: RealFftPlanner::new(),
        }
    }

    /// In-place complex DFT in either direction.
    pub fn transform(&mut self, data: &mut [Complex64], inverse: bool, norm: Norm) -> DspResult<()> {
        let n = require_len(data.len())?;
        let plan = if inverse {
            self.complex.plan_fft_inverse(n)
        } else {
            self.complex.plan_fft_forward(n)
        };
        plan.process(data);
        if let Some(k) = norm.factor(n) {
            data.iter_mut().for_each(|c| *c *= k);
        }
        Ok(())
    }

    /// Unscaled forward transform.
    pub fn fft_inplace(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        self.transform(data, false, Norm::None)
    }

    /// Inverse transform scaled by `1/N`, undoing [`FftEngine::fft_inplace`].
    pub fn ifft_inplace(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        self.transform(data, true, Norm::ByLength)
    }

    pub fn forward_unitary(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        self.transform(data, false, Norm::Unitary)
    }

    pub fn inverse_unitary(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        self.transform(data, true, Norm::Unitary)
    }

    /// Unscaled real-input transform; returns the `N/2 + 1` non-negative
    /// frequency bins.
    pub fn rfft(&mut self, data: &[f64]) -> DspResult<Vec<Complex64>> {
        let n = require_len(data.len())?;
        let plan = self.real.plan_fft_forward(n);
        let mut scratch = data.to_vec();
        let mut bins = plan.make_output_vec();
        plan.process(&mut scratch, &mut bins)
            .map_err(|e| DspError::NumericDomain(e.to_string()))?;
        Ok(bins)
    }

    /// Real-output inverse of `n` samples from `n/2 + 1` bins, scaled by `1/n`.
    ///
    /// Imaginary parts that a real signal cannot carry (DC, and Nyquist for
    /// even `n`) are dropped instead of rejected.
    pub fn irfft(&mut self, bins: &[Complex64], n: usize) -> DspResult<Vec<f64>> {
        let n = require_len(n)?;
        let expected = n / 2 + 1;
        if bins.len() != expected {
            return Err(DspError::LengthMismatch { expected, actual: bins.len() });
        }

        let mut spectrum = bins.to_vec();
        spectrum[0].im = 0.0;
        if n % 2 == 0 {
            spectrum[n / 2].im = 0.0;
        }
        let plan = self.real.plan_fft_inverse(n);
        let mut out = plan.make_output_vec();
        plan.process(&mut spectrum, &mut out)
            .map_err(|e| DspError::NumericDomain(e.to_string()))?;

        let k = (n as f64).recip();
        out.iter_mut().for_each(|x| *x *= k);
        Ok(out)
    }
}

fn require_len(n: usize) -> DspResult<usize> {
    match n {
        0 => Err(DspError::InsufficientData { needed: 1, got: 0 }),
        n => Ok(n),
    }
}

/// Smallest power of two that is at least `len` and at least `min`.
pub fn padded_pow2(len: usize, min: usize) -> usize {
    len.max(min).next_power_of_two()
}

/// `signal` in the middle of a zero buffer of length `new_len`.
///
/// Signals at least `new_len` long come back unchanged.
pub fn zero_pad_centered(signal: &[f64], new_len: usize) -> Vec<f64> {
    if new_len <= signal.len() {
        return signal.to_vec();
    }
    let start = (new_len - signal.len()) / 2;
    let mut padded = vec![0.0; new_len];
    padded[start..start + signal.len()].copy_from_slice(signal);
    padded
}
