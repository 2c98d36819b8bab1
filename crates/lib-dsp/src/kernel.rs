//! Windowed-sinc FIR kernel synthesis.
//!
//! All cutoff frequencies are fractions of the sampling frequency and must
//! lie strictly inside `(0, 0.5)`. Kernels are returned as owned vectors;
//! nothing here touches engine state.
//!
//! The tap count `n` sets the sharpness of the filter: the transition band
//! between pass and stop is roughly `4/n` wide (see [`transition_bandwidth`]).

use crate::convolution::direct_convolve;
use crate::error::{DspError, DspResult};
use crate::window::{generate_window, WindowType};
use std::f64::consts::PI;

/// Approximate width of the transition band, as a fraction of the sampling
/// rate, for an `n`-tap windowed-sinc kernel.
pub fn transition_bandwidth(n: usize) -> f64 {
    4.0 / n as f64
}

/// Tap count needed for a transition band of `bandwidth` (fraction of the
/// sampling rate). The result is always odd.
pub fn taps_for_transition(bandwidth: f64) -> DspResult<usize> {
    if !(bandwidth > 0.0 && bandwidth < 0.5) {
        return Err(DspError::invalid(
            "bandwidth",
            format!("must lie in (0, 0.5), got {}", bandwidth),
        ));
    }
    let n = (4.0 / bandwidth).ceil() as usize;
    Ok(n | 1)
}

/// One entry of a multi-band specification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Band {
    LowPass { fcut: f64 },
    HighPass { fcut: f64 },
    BandPass { f1: f64, f2: f64 },
    BandReject { f1: f64, f2: f64 },
}

impl Band {
    /// Decode a signed `(lo, hi)` pair.
    ///
    /// Both positive is a band-pass, both negative a band-reject between the
    /// magnitudes (in either order), `lo < 0 < hi` a low-pass at `hi` and
    /// `lo > 0 > hi` a high-pass at `lo`. A pair with a zero bound is not a
    /// band.
    pub fn from_pair(lo: f64, hi: f64) -> Option<Self> {
        if lo == 0.0 || hi == 0.0 {
            return None;
        }
        let band = match (lo > 0.0, hi > 0.0) {
            (true, true) => Self::BandPass { f1: lo, f2: hi },
            (false, false) => {
                let (a, b) = (lo.abs(), hi.abs());
                Self::BandReject { f1: a.min(b), f2: a.max(b) }
            }
            (false, true) => Self::LowPass { fcut: hi },
            (true, false) => Self::HighPass { fcut: lo },
        };
        Some(band)
    }
}

/// Parse a flat `[lo0, hi0, lo1, hi1, ...]` list into bands, skipping
/// pairs with a zero bound.
pub fn bands_from_pairs(freqs: &[f64]) -> DspResult<Vec<Band>> {
    if freqs.len() % 2 != 0 {
        return Err(DspError::invalid(
            "bands",
            format!("expected (lo, hi) pairs, got {} values", freqs.len()),
        ));
    }
    let bands: Vec<Band> = freqs
        .chunks_exact(2)
        .filter_map(|pair| Band::from_pair(pair[0], pair[1]))
        .collect();
    if bands.is_empty() {
        return Err(DspError::invalid("bands", "no effective band specified"));
    }
    Ok(bands)
}

/// Windowed-sinc kernel designer.
#[derive(Clone, Copy, Debug)]
pub struct KernelDesigner {
    window: WindowType,
    adapt_length: bool,
}

impl Default for KernelDesigner {
    fn default() -> Self {
        Self {
            window: WindowType::Blackman,
            adapt_length: true,
        }
    }
}

impl KernelDesigner {
    /// Blackman window, even tap counts bumped to the next odd value.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    /// Whether an even `n` is incremented so the kernel has a center tap.
    pub fn adapt_length(mut self, adapt: bool) -> Self {
        self.adapt_length = adapt;
        self
    }

    /// Tap count actually produced for a requested `n`.
    pub fn effective_taps(&self, n: usize) -> usize {
        if self.adapt_length && n % 2 == 0 {
            n + 1
        } else {
            n
        }
    }

    /// `n` taps of `1/n`.
    pub fn moving_average(&self, n: usize) -> DspResult<Vec<f64>> {
        check_taps(n)?;
        Ok(vec![1.0 / n as f64; n])
    }

    /// Low-pass kernel normalized to unit DC gain.
    pub fn low_pass(&self, fcut: f64, n: usize) -> DspResult<Vec<f64>> {
        check_fraction("fcut", fcut)?;
        check_taps(n)?;
        let n = self.effective_taps(n);
        Ok(self.sinc(fcut, n))
    }

    /// High-pass kernel by spectral inversion of the low-pass at `fcut`.
    pub fn high_pass(&self, fcut: f64, n: usize) -> DspResult<Vec<f64>> {
        let mut h = self.low_pass(fcut, n)?;
        spectral_invert(&mut h);
        Ok(h)
    }

    /// Low-pass at `f1` plus high-pass at `f2`.
    pub fn band_reject(&self, f1: f64, f2: f64, n: usize) -> DspResult<Vec<f64>> {
        check_band(f1, f2)?;
        let low = self.low_pass(f1, n)?;
        let high = self.high_pass(f2, n)?;
        Ok(low.iter().zip(high.iter()).map(|(l, h)| l + h).collect())
    }

    /// Spectral inversion of the band-reject kernel for `[f1, f2]`.
    pub fn band_pass(&self, f1: f64, f2: f64, n: usize) -> DspResult<Vec<f64>> {
        let mut h = self.band_reject(f1, f2, n)?;
        spectral_invert(&mut h);
        Ok(h)
    }

    /// Kernel for a single band.
    pub fn band(&self, band: Band, n: usize) -> DspResult<Vec<f64>> {
        match band {
            Band::LowPass { fcut } => self.low_pass(fcut, n),
            Band::HighPass { fcut } => self.high_pass(fcut, n),
            Band::BandPass { f1, f2 } => self.band_pass(f1, f2, n),
            Band::BandReject { f1, f2 } => self.band_reject(f1, f2, n),
        }
    }

    /// Iterated convolution of the per-band kernels.
    ///
    /// Each band filters the output of the previous ones, so the result has
    /// `k·(n−1)+1` taps for `k` bands of `n` taps each.
    pub fn multi_band(&self, bands: &[Band], n: usize) -> DspResult<Vec<f64>> {
        let Some((first, rest)) = bands.split_first() else {
            return Err(DspError::invalid("bands", "no effective band specified"));
        };
        let mut h = self.band(*first, n)?;
        for band in rest {
            let hj = self.band(*band, n)?;
            h = direct_convolve(&h, &hj);
        }
        tracing::debug!(
            "multi-band kernel: {} bands, {} taps each, {} taps total",
            bands.len(),
            self.effective_taps(n),
            h.len()
        );
        Ok(h)
    }

    fn sinc(&self, fcut: f64, n: usize) -> Vec<f64> {
        let m = (n - 1) as f64;
        let omega = 2.0 * PI * fcut;
        let window = generate_window(self.window, n);
        let mut h: Vec<f64> = window
            .iter()
            .enumerate()
            .map(|(i, w)| {
                if 2 * i == n - 1 {
                    return omega;
                }
                let x = i as f64 - m / 2.0;
                (omega * x).sin() / x * w
            })
            .collect();

        let sum: f64 = h.iter().sum();
        for v in h.iter_mut() {
            *v /= sum;
        }
        tracing::debug!("low-pass kernel: fcut={}, {} taps", fcut, n);
        h
    }
}

/// Negate every tap and add 1 to the center tap.
fn spectral_invert(h: &mut [f64]) {
    let center = h.len() / 2;
    for v in h.iter_mut() {
        *v = -*v;
    }
    h[center] += 1.0;
}

fn check_taps(n: usize) -> DspResult<()> {
    if n < 1 {
        return Err(DspError::invalid("n", "kernel needs at least one tap"));
    }
    Ok(())
}

fn check_fraction(name: &'static str, f: f64) -> DspResult<()> {
    if !(f > 0.0 && f < 0.5) {
        return Err(DspError::invalid(name, format!("must lie in (0, 0.5), got {}", f)));
    }
    Ok(())
}

fn check_band(f1: f64, f2: f64) -> DspResult<()> {
    check_fraction("f1", f1)?;
    check_fraction("f2", f2)?;
    if f2 <= f1 {
        return Err(DspError::invalid(
            "f2",
            format!("must exceed f1 ({}), got {}", f1, f2),
        ));
    }
    Ok(())
}
