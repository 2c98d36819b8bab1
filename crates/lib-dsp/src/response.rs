//! Frequency response of FIR kernels and filtered sequences.

use crate::error::{DspError, DspResult};
use crate::fft::{padded_pow2, zero_pad_centered};
use crate::transform::{FourierMode, TransformEngine};
use lib_types::curve::Curve;
use lib_types::selector::{AxisDomain, ValueKind};
use lib_types::units::Hertz;

/// Smallest zero-padded length used for a response preview.
pub const MIN_RESPONSE_LEN: usize = 1024;

/// How a response is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseOptions {
    /// [`AxisDomain::Fraction`] or [`AxisDomain::Hertz`].
    pub axis: AxisDomain,
    /// Amplitude in dB instead of linear gain.
    pub decibel: bool,
    /// Rescale so the peak is 1 (or 0 dB); used for kernels.
    pub normalize: bool,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            axis: AxisDomain::Fraction,
            decibel: true,
            normalize: true,
        }
    }
}

impl ResponseOptions {
    pub fn linear(mut self) -> Self {
        self.decibel = false;
        self
    }
}

/// Gain versus frequency over `[0, fs/2]`.
///
/// The sequence is centered in a zero buffer of at least
/// [`MIN_RESPONSE_LEN`] samples (and always longer than the sequence) to
/// interpolate the spectrum between the natural DFT bins.
pub fn frequency_response(
    transforms: &mut TransformEngine,
    h: &[f64],
    options: ResponseOptions,
    fs: Hertz,
) -> DspResult<Curve> {
    if h.is_empty() {
        return Err(DspError::missing("no kernel to analyse"));
    }
    match options.axis {
        AxisDomain::Fraction => {}
        AxisDomain::Hertz if fs.is_set() => {}
        AxisDomain::Hertz => {
            return Err(DspError::missing("Hz axis requested without a sampling frequency"))
        }
        other => {
            return Err(DspError::invalid(
                "axis",
                format!("frequency response needs a frequency axis, got {:?}", other),
            ))
        }
    }

    let size = padded_pow2(h.len() + 1, MIN_RESPONSE_LEN);
    let padded = zero_pad_centered(h, size);
    let spectrum = transforms.fourier(&padded, &[], FourierMode::R2C)?;
    tracing::debug!("frequency response: {} taps padded to {}", h.len(), size);

    // Undo the unitary scaling so a unit-sum kernel has unit DC gain
    let gain = (size as f64).sqrt();
    let value = if options.decibel { ValueKind::Decibel } else { ValueKind::Amplitude };
    let mut curve = Curve::with_capacity(options.axis, value, size / 2 + 1);
    for k in 0..=size / 2 {
        let fraction = k as f64 / size as f64;
        let x = match options.axis {
            AxisDomain::Hertz => fraction * fs.0,
            _ => fraction,
        };
        let y = value.evaluate(spectrum.re[k] * gain, spectrum.im[k] * gain);
        curve.push(x, y);
    }
    if options.normalize {
        curve.normalize_peak();
    }
    Ok(curve)
}
