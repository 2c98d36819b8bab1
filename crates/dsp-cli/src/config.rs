//! Pipeline configuration loading and validation.

use anyhow::{Context, Result};
use lib_dsp::conversion::{Converter, LogBase, RangeSpec, Scale};
use lib_dsp::convolution::Convolution;
use lib_dsp::engine::{DspEngine, MovingAverageMode};
use lib_dsp::kernel::{bands_from_pairs, KernelDesigner};
use lib_dsp::window::WindowType;
use lib_dsp::DspResult;
use lib_types::units::{Hertz, Volts};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sampling frequency in Hz; 0 leaves it unset.
    #[serde(default)]
    pub sampling_frequency_hz: f64,

    /// Filter applied by `filter` and designed by `kernel`.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Kernel synthesis options.
    #[serde(default)]
    pub kernel: KernelConfig,

    /// ADC/DAC model used by `convert`.
    #[serde(default)]
    pub converter: ConverterConfig,
}

impl PipelineConfig {
    pub fn sampling_frequency(&self) -> Option<Hertz> {
        let fs = Hertz(self.sampling_frequency_hz);
        fs.is_set().then_some(fs)
    }
}

/// Filter description.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    MovingAverage {
        n: usize,
        #[serde(default)]
        mode: AveragingMode,
    },
    LowPass {
        fcut: f64,
        #[serde(default = "default_taps")]
        taps: usize,
    },
    HighPass {
        fcut: f64,
        #[serde(default = "default_taps")]
        taps: usize,
    },
    BandPass {
        f1: f64,
        f2: f64,
        #[serde(default = "default_taps")]
        taps: usize,
    },
    BandReject {
        f1: f64,
        f2: f64,
        #[serde(default = "default_taps")]
        taps: usize,
    },
    /// Consecutive `(lo, hi)` pairs; see [`bands_from_pairs`].
    MultiBand {
        frequencies: Vec<f64>,
        #[serde(default = "default_taps")]
        taps: usize,
    },
}

fn default_taps() -> usize { 101 }
fn default_fcut() -> f64 { 0.1 }

impl Default for FilterConfig {
    fn default() -> Self {
        Self::LowPass { fcut: default_fcut(), taps: default_taps() }
    }
}

impl FilterConfig {
    /// Synthesize the kernel.
    pub fn kernel(&self, designer: &KernelDesigner) -> DspResult<Vec<f64>> {
        match self {
            Self::MovingAverage { n, .. } => designer.moving_average(*n),
            Self::LowPass { fcut, taps } => designer.low_pass(*fcut, *taps),
            Self::HighPass { fcut, taps } => designer.high_pass(*fcut, *taps),
            Self::BandPass { f1, f2, taps } => designer.band_pass(*f1, *f2, *taps),
            Self::BandReject { f1, f2, taps } => designer.band_reject(*f1, *f2, *taps),
            Self::MultiBand { frequencies, taps } => {
                designer.multi_band(&bands_from_pairs(frequencies)?, *taps)
            }
        }
    }

    /// Filter the engine's input buffer.
    pub fn apply(&self, engine: &mut DspEngine) -> DspResult<Convolution> {
        match self {
            Self::MovingAverage { n, mode } => engine.filter_moving_average(*n, (*mode).into()),
            Self::LowPass { fcut, taps } => engine.filter_low_pass(*fcut, *taps),
            Self::HighPass { fcut, taps } => engine.filter_high_pass(*fcut, *taps),
            Self::BandPass { f1, f2, taps } => engine.filter_band_pass(*f1, *f2, *taps),
            Self::BandReject { f1, f2, taps } => engine.filter_band_reject(*f1, *f2, *taps),
            Self::MultiBand { frequencies, taps } => {
                engine.filter_multi_band(&bands_from_pairs(frequencies)?, *taps)
            }
        }
    }
}

/// Moving-average strategy.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AveragingMode {
    #[default]
    Conv,
    Rec,
}

impl From<AveragingMode> for MovingAverageMode {
    fn from(mode: AveragingMode) -> Self {
        match mode {
            AveragingMode::Conv => MovingAverageMode::Convolution,
            AveragingMode::Rec => MovingAverageMode::Recursion,
        }
    }
}

/// Kernel synthesis options.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub window: WindowName,

    /// Bump even tap counts to the next odd value.
    #[serde(default = "default_true")]
    pub adapt_length: bool,
}

fn default_true() -> bool { true }

impl Default for KernelConfig {
    fn default() -> Self {
        Self { window: WindowName::default(), adapt_length: default_true() }
    }
}

impl KernelConfig {
    pub fn designer(&self) -> KernelDesigner {
        KernelDesigner::new()
            .with_window(self.window.into())
            .adapt_length(self.adapt_length)
    }
}

/// Window selection.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowName {
    Rectangular,
    Hann,
    Hamming,
    #[default]
    Blackman,
}

impl From<WindowName> for WindowType {
    fn from(name: WindowName) -> Self {
        match name {
            WindowName::Rectangular => WindowType::Rectangular,
            WindowName::Hann => WindowType::Hann,
            WindowName::Hamming => WindowType::Hamming,
            WindowName::Blackman => WindowType::Blackman,
        }
    }
}

/// Converter settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "default_bits")]
    pub bits: u32,

    #[serde(default)]
    pub range: RangeConfig,

    /// Offset added to analog inputs before conversion.
    #[serde(default)]
    pub bias_volts: f64,

    #[serde(default)]
    pub scale: ScaleConfig,
}

fn default_bits() -> u32 { 8 }

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            bits: default_bits(),
            range: RangeConfig::default(),
            bias_volts: 0.0,
            scale: ScaleConfig::default(),
        }
    }
}

impl ConverterConfig {
    pub fn converter(&self) -> DspResult<Converter> {
        Converter::new(self.bits, self.range.into(), Volts(self.bias_volts), self.scale.into())
    }
}

/// Analog range, as full-scale or reference voltage.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeConfig {
    FullScale { volts: f64 },
    Reference { volts: f64 },
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self::FullScale { volts: 1.0 }
    }
}

impl From<RangeConfig> for RangeSpec {
    fn from(range: RangeConfig) -> Self {
        match range {
            RangeConfig::FullScale { volts } => RangeSpec::FullScale(Volts(volts)),
            RangeConfig::Reference { volts } => RangeSpec::Reference(Volts(volts)),
        }
    }
}

/// Transfer characteristic.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScaleConfig {
    #[default]
    Linear,
    /// `base` absent means the natural logarithm.
    Logarithmic {
        #[serde(default)]
        base: Option<f64>,
        efficiency: f64,
    },
}

impl From<ScaleConfig> for Scale {
    fn from(scale: ScaleConfig) -> Self {
        match scale {
            ScaleConfig::Linear => Scale::Linear,
            ScaleConfig::Logarithmic { base, efficiency } => Scale::Logarithmic {
                base: base.map_or(LogBase::Natural, LogBase::Base),
                efficiency,
            },
        }
    }
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: PipelineConfig = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content)?
    } else {
        // Assume TOML
        toml::from_str(&content)
            .with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Validate configuration.
///
/// Parameter ranges are checked here as well, so a bad file fails before
/// any samples are read.
pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    if !(config.sampling_frequency_hz >= 0.0 && config.sampling_frequency_hz.is_finite()) {
        anyhow::bail!(
            "Sampling frequency must be a finite non-negative number (got {})",
            config.sampling_frequency_hz
        );
    }

    config
        .filter
        .kernel(&config.kernel.designer())
        .with_context(|| format!("Invalid filter {:?}", config.filter))?;

    config
        .converter
        .converter()
        .with_context(|| format!("Invalid converter {:?}", config.converter))?;

    Ok(())
}
