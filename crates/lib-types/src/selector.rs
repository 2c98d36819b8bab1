//! Closed selector types for reading engine buffers and rendering results.
//!
//! Every buffer read and every rendered curve is described by one of these
//! enumerations, so an unsupported combination is a compile error rather
//! than a silently ignored option string.

use serde::{Deserialize, Serialize};

/// Which pair of buffers a derived quantity is computed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The primary input (real, imaginary) buffers.
    Input,
    /// The most recent transform output (real, imaginary) buffers.
    Output,
}

/// Buffer selection for `GetData`-style reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSelector {
    RealIn,
    ImagIn,
    RealOut,
    ImagOut,
    /// The y values of the most recently rendered curve.
    Binned,
    /// The waveform/kernel buffer.
    Waveform,
    /// `sqrt(re² + im²)` of the chosen side.
    Amplitude(Side),
    /// `atan2(im, re)` of the chosen side, in radians.
    PhaseRad(Side),
    /// `atan2(im, re)` of the chosen side, in degrees.
    PhaseDeg(Side),
}

/// Buffer whose length is reported by `GetN`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    Input,
    Waveform,
}

/// The x axis of a rendered curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisDomain {
    /// Frequency index `k`.
    #[default]
    Index,
    /// Frequency as a fraction of the sampling rate.
    Fraction,
    /// Frequency in Hz (needs a sampling frequency).
    Hertz,
    /// Time-domain sample number `n`.
    SampleNumber,
    /// Time in seconds (needs a sampling frequency).
    Seconds,
}

impl AxisDomain {
    /// Whether the axis describes the frequency domain.
    pub fn is_frequency(self) -> bool {
        matches!(self, Self::Index | Self::Fraction | Self::Hertz)
    }

    /// Whether the axis needs a physical sampling frequency.
    pub fn needs_sampling_frequency(self) -> bool {
        matches!(self, Self::Hertz | Self::Seconds)
    }

    /// Column label used by text and CSV writers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Index => "k",
            Self::Fraction => "f",
            Self::Hertz => "Hz",
            Self::SampleNumber => "n",
            Self::Seconds => "t",
        }
    }
}

/// The y value of a rendered curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Re,
    Im,
    #[default]
    Amplitude,
    /// `20·log10(amplitude)`.
    Decibel,
    PhaseRad,
    PhaseDeg,
    /// `re² + im²`, or a normalized power such as a periodogram's.
    Power,
}

impl ValueKind {
    /// Evaluate this kind for one complex sample.
    pub fn evaluate(self, re: f64, im: f64) -> f64 {
        match self {
            Self::Re => re,
            Self::Im => im,
            Self::Amplitude => re.hypot(im),
            Self::Decibel => 20.0 * re.hypot(im).log10(),
            Self::PhaseRad => im.atan2(re),
            Self::PhaseDeg => im.atan2(re).to_degrees(),
            Self::Power => re * re + im * im,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Re => "re",
            Self::Im => "im",
            Self::Amplitude => "amp",
            Self::Decibel => "dB",
            Self::PhaseRad => "phi_rad",
            Self::PhaseDeg => "phi_deg",
            Self::Power => "power",
        }
    }
}

/// Axis domain × value kind, plus whether a frequency axis spans all `N`
/// bins instead of `N/2 + 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotSelection {
    pub axis: AxisDomain,
    pub value: ValueKind,
    #[serde(default)]
    pub full_range: bool,
}

impl PlotSelection {
    pub fn new(axis: AxisDomain, value: ValueKind) -> Self {
        Self { axis, value, full_range: false }
    }

    /// Request the full `[0, N)` frequency range.
    pub fn full_range(mut self) -> Self {
        self.full_range = true;
        self
    }
}
