//! Analog-to-digital and digital-to-analog conversion models.
//!
//! A [`Converter`] has `N = 2^nbits` levels. Its range is given either as
//! the full-scale voltage `Vfs` (the level of code `N-1`) or as the
//! reference voltage `Vref` (the level of the hypothetical code `N`).
//!
//! Linear conversion uses a constant LSB. Logarithmic conversion spreads
//! the codes evenly over `C` decades (for base 10, or `C` e-folds for the
//! natural base) below `Vref`:
//!
//! ```text
//! code = (N/C) · (log_B(Vin/Vref) + C)
//! ```
//!
//! Analog inputs are offset by the bias before conversion; the code of the
//! bias alone is the pedestal.

use crate::error::{DspError, DspResult};
use lib_types::units::Volts;
use std::fmt;

/// Largest supported resolution; codes must stay exact in an `f64`.
pub const MAX_BITS: u32 = 60;

/// How the analog range is specified.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RangeSpec {
    /// Voltage of the highest code `N-1`.
    FullScale(Volts),
    /// Voltage of the hypothetical code `N`.
    Reference(Volts),
}

impl RangeSpec {
    fn volts(self) -> Volts {
        match self {
            Self::FullScale(v) | Self::Reference(v) => v,
        }
    }
}

/// Logarithm base of a logarithmic converter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogBase {
    Natural,
    Base(f64),
}

impl LogBase {
    fn ln(self) -> f64 {
        match self {
            Self::Natural => 1.0,
            Self::Base(b) => b.ln(),
        }
    }
}

/// Transfer characteristic.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Scale {
    #[default]
    Linear,
    /// `efficiency` is the number of base-`B` decades covered by the codes.
    Logarithmic { base: LogBase, efficiency: f64 },
}

/// Derived converter characteristics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConverterSpec {
    pub nbits: u32,
    /// Number of levels `N = 2^nbits`.
    pub levels: f64,
    pub vref: Volts,
    pub vfs: Volts,
    /// Step between codes 0 and 1.
    pub lsb: Volts,
    /// `20·log10(Vfs/LSB)`.
    pub dynamic_range_db: f64,
    /// Code produced by the bias alone.
    pub pedestal: i64,
}

impl fmt::Display for ConverterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resolution:    {} bits ({} levels)", self.nbits, self.levels)?;
        writeln!(f, "Vref:          {:.6e} V", self.vref.0)?;
        writeln!(f, "Vfs:           {:.6e} V", self.vfs.0)?;
        writeln!(f, "LSB:           {:.6e} V", self.lsb.0)?;
        writeln!(f, "Dynamic range: {:.2} dB", self.dynamic_range_db)?;
        write!(f, "Pedestal:      {}", self.pedestal)
    }
}

/// A validated ADC/DAC model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Converter {
    range: RangeSpec,
    bias: Volts,
    scale: Scale,
    spec: ConverterSpec,
}

impl Converter {
    pub fn new(nbits: u32, range: RangeSpec, bias: Volts, scale: Scale) -> DspResult<Self> {
        if !(1..=MAX_BITS).contains(&nbits) {
            return Err(DspError::invalid(
                "nbits",
                format!("must lie in [1, {}], got {}", MAX_BITS, nbits),
            ));
        }
        let r = range.volts().0;
        if !(r > 0.0 && r.is_finite()) {
            return Err(DspError::invalid("range", format!("must be positive, got {}", r)));
        }
        if !bias.0.is_finite() || bias.0.abs() > r {
            return Err(DspError::invalid(
                "bias",
                format!("|bias| must not exceed the range {}, got {}", r, bias.0),
            ));
        }
        if let Scale::Logarithmic { base, efficiency } = scale {
            if !(efficiency > 0.0 && efficiency.is_finite()) {
                return Err(DspError::invalid(
                    "efficiency",
                    format!("must be positive, got {}", efficiency),
                ));
            }
            if let LogBase::Base(b) = base {
                if !(b > 0.0 && b.is_finite()) || b == 1.0 {
                    return Err(DspError::invalid(
                        "base",
                        format!("must be positive and not 1, got {}", b),
                    ));
                }
            }
        }

        let levels = (1u64 << nbits) as f64;
        let (vref, vfs, lsb) = match scale {
            Scale::Linear => match range {
                RangeSpec::FullScale(vfs) => {
                    let lsb = vfs.0 / (levels - 1.0);
                    (vfs.0 + lsb, vfs.0, lsb)
                }
                RangeSpec::Reference(vref) => {
                    let lsb = vref.0 / levels;
                    (vref.0, vref.0 - lsb, lsb)
                }
            },
            Scale::Logarithmic { base, efficiency } => {
                let step = base.ln() * efficiency / levels;
                let (vref, vfs) = match range {
                    RangeSpec::FullScale(vfs) => (vfs.0 * step.exp(), vfs.0),
                    RangeSpec::Reference(vref) => (vref.0, vref.0 * (-step).exp()),
                };
                let lsb = vref * (-base.ln() * efficiency).exp() * step.exp_m1();
                (vref, vfs, lsb)
            }
        };

        let mut converter = Self {
            range,
            bias,
            scale,
            spec: ConverterSpec {
                nbits,
                levels,
                vref: Volts(vref),
                vfs: Volts(vfs),
                lsb: Volts(lsb),
                dynamic_range_db: Volts(vfs).db_over(Volts(lsb)),
                pedestal: 0,
            },
        };
        converter.spec.pedestal = converter.pedestal_code();
        Ok(converter)
    }

    /// Linear converter with full-scale voltage `vfs` and no bias.
    pub fn linear(nbits: u32, vfs: f64) -> DspResult<Self> {
        Self::new(nbits, RangeSpec::FullScale(Volts(vfs)), Volts::ZERO, Scale::Linear)
    }

    pub fn spec(&self) -> &ConverterSpec {
        &self.spec
    }

    pub fn range(&self) -> RangeSpec {
        self.range
    }

    pub fn bias(&self) -> Volts {
        self.bias
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    fn max_code(&self) -> f64 {
        self.spec.levels - 1.0
    }

    /// Unclamped, unrounded code position of an already biased level.
    fn raw_code(&self, vin: f64) -> f64 {
        match self.scale {
            Scale::Linear => match self.range {
                // Codes per volt taken straight from the range keeps exact
                // midpoints exact (0.5 V on an 8-bit 1 V range is 127.5).
                RangeSpec::FullScale(vfs) => vin * self.max_code() / vfs.0,
                RangeSpec::Reference(vref) => vin * self.spec.levels / vref.0,
            },
            Scale::Logarithmic { base, efficiency } => {
                let log = (vin / self.spec.vref.0).ln() / base.ln();
                (self.spec.levels / efficiency) * (log + efficiency)
            }
        }
    }

    /// Round and clamp to `[0, N-1]`. The clamp is done on integers since
    /// `2^nbits - 1` is not representable in `f64` for large `nbits`.
    fn clamp_code(&self, raw: f64) -> i64 {
        let top = (1i64 << self.spec.nbits) - 1;
        (raw.round() as i64).clamp(0, top)
    }

    fn pedestal_code(&self) -> i64 {
        match self.scale {
            Scale::Logarithmic { .. } if self.bias.0 <= 0.0 => 0,
            _ => self.clamp_code(self.raw_code(self.bias.0)),
        }
    }

    fn report(&self) {
        tracing::info!(
            nbits = self.spec.nbits,
            vref = self.spec.vref.0,
            vfs = self.spec.vfs.0,
            lsb = self.spec.lsb.0,
            dynamic_range_db = self.spec.dynamic_range_db,
            pedestal = self.spec.pedestal,
            "converter specification"
        );
    }

    /// Digitize analog samples.
    ///
    /// Without input the single pedestal code is returned and the converter
    /// specification is logged.
    pub fn adc(&self, analog: &[f64]) -> DspResult<Vec<i64>> {
        if analog.is_empty() {
            self.report();
            return Ok(vec![self.spec.pedestal]);
        }
        analog
            .iter()
            .map(|&v| {
                let vin = self.bias.0 + v;
                if !vin.is_finite() {
                    return Err(DspError::NumericDomain(format!("non-finite input {}", v)));
                }
                if matches!(self.scale, Scale::Logarithmic { .. }) && vin <= 0.0 {
                    return Err(DspError::NumericDomain(format!(
                        "logarithmic conversion needs a positive level, got {}",
                        vin
                    )));
                }
                Ok(self.clamp_code(self.raw_code(vin)))
            })
            .collect()
    }

    /// Reconstruct analog levels from codes.
    ///
    /// In linear mode, per-sample `pedestals` are subtracted from the codes
    /// and the bias is then not subtracted again. Logarithmic mode ignores
    /// pedestals. Without codes the pedestal code is returned as a value.
    pub fn dac(&self, codes: &[i64], pedestals: Option<&[i64]>) -> DspResult<Vec<f64>> {
        if codes.is_empty() {
            self.report();
            return Ok(vec![self.spec.pedestal as f64]);
        }
        if let Some(peds) = pedestals {
            if peds.len() < codes.len() {
                return Err(DspError::LengthMismatch {
                    expected: codes.len(),
                    actual: peds.len(),
                });
            }
        }
        let max = self.max_code();
        codes
            .iter()
            .enumerate()
            .map(|(j, &code)| {
                if code < 0 || code as f64 > max {
                    return Err(DspError::invalid(
                        "codes",
                        format!("code {} at index {} outside [0, {}]", code, j, max),
                    ));
                }
                let c = code as f64;
                let v = match (self.scale, pedestals) {
                    (Scale::Linear, Some(peds)) => (c - peds[j] as f64) * self.spec.lsb.0,
                    (Scale::Linear, None) => c * self.spec.lsb.0 - self.bias.0,
                    (Scale::Logarithmic { base, efficiency }, _) => {
                        let exponent = base.ln() * efficiency * (c / self.spec.levels - 1.0);
                        self.spec.vref.0 * exponent.exp() - self.bias.0
                    }
                };
                Ok(v)
            })
            .collect()
    }

    /// ADC followed by DAC: the analog signal as seen through this converter.
    pub fn transmit(&self, analog: &[f64], pedestals: Option<&[i64]>) -> DspResult<Vec<f64>> {
        if analog.is_empty() {
            return self.dac(&[], None);
        }
        let codes = self.adc(analog)?;
        self.dac(&codes, pedestals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_adc_midscale_rounds_up() {
        let adc = Converter::linear(8, 1.0).unwrap();
        assert_eq!(adc.adc(&[0.5]).unwrap(), vec![128]);
        assert_eq!(adc.adc(&[0.0, 1.0, 2.0, -1.0]).unwrap(), vec![0, 255, 255, 0]);
    }

    #[test]
    fn test_saturated_code_at_max_bits() {
        let adc = Converter::linear(MAX_BITS, 1.0).unwrap();
        let top = (1i64 << MAX_BITS) - 1;
        assert_eq!(adc.adc(&[2.0, 1.0, -1.0]).unwrap(), vec![top, top, 0]);
    }

    #[test]
    fn test_linear_spec() {
        let adc = Converter::linear(8, 1.0).unwrap();
        let spec = adc.spec();
        assert_eq!(spec.levels, 256.0);
        assert!((spec.lsb.0 - 1.0 / 255.0).abs() < 1e-15);
        assert!((spec.vref.0 - 256.0 / 255.0).abs() < 1e-15);
        assert!((spec.dynamic_range_db - 20.0 * 255f64.log10()).abs() < 1e-9);

        let by_ref = Converter::new(
            8,
            RangeSpec::Reference(Volts(1.0)),
            Volts::ZERO,
            Scale::Linear,
        )
        .unwrap();
        assert!((by_ref.spec().lsb.0 - 1.0 / 256.0).abs() < 1e-15);
        assert!((by_ref.spec().vfs.0 - 255.0 / 256.0).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_parameters() {
        let cases = [
            Converter::new(0, RangeSpec::FullScale(Volts(1.0)), Volts::ZERO, Scale::Linear),
            Converter::new(61, RangeSpec::FullScale(Volts(1.0)), Volts::ZERO, Scale::Linear),
            Converter::new(8, RangeSpec::FullScale(Volts(0.0)), Volts::ZERO, Scale::Linear),
            Converter::new(8, RangeSpec::Reference(Volts(-1.0)), Volts::ZERO, Scale::Linear),
            Converter::new(8, RangeSpec::FullScale(Volts(1.0)), Volts(1.5), Scale::Linear),
            Converter::new(
                8,
                RangeSpec::FullScale(Volts(1.0)),
                Volts::ZERO,
                Scale::Logarithmic { base: LogBase::Base(10.0), efficiency: 0.0 },
            ),
            Converter::new(
                8,
                RangeSpec::FullScale(Volts(1.0)),
                Volts::ZERO,
                Scale::Logarithmic { base: LogBase::Base(1.0), efficiency: 3.0 },
            ),
        ];
        for (i, case) in cases.iter().enumerate() {
            let err = case.as_ref().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "case {}", i);
        }
    }

    #[test]
    fn test_what_if_returns_pedestal() {
        let adc = Converter::new(
            10,
            RangeSpec::FullScale(Volts(2.0)),
            Volts(0.5),
            Scale::Linear,
        )
        .unwrap();
        let expected = (0.5f64 * 1023.0 / 2.0).round() as i64;
        assert_eq!(adc.adc(&[]).unwrap(), vec![expected]);
        assert_eq!(adc.transmit(&[], None).unwrap(), vec![expected as f64]);
    }

    #[test]
    fn test_transmit_within_one_lsb() {
        let adc = Converter::linear(40, 10.0).unwrap();
        let lsb = adc.spec().lsb.0;
        let input: Vec<f64> = (0..200).map(|i| i as f64 * 0.05).collect();
        let output = adc.transmit(&input, None).unwrap();
        for (i, (a, b)) in input.iter().zip(output.iter()).enumerate() {
            assert!((a - b).abs() <= lsb, "Mismatch at index {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_bias_and_pedestals() {
        let adc = Converter::new(
            12,
            RangeSpec::FullScale(Volts(2.0)),
            Volts(1.0),
            Scale::Linear,
        )
        .unwrap();
        let lsb = adc.spec().lsb.0;
        let input = [-0.75, 0.0, 0.6];
        let codes = adc.adc(&input).unwrap();

        let plain = adc.dac(&codes, None).unwrap();
        for (a, b) in input.iter().zip(plain.iter()) {
            assert!((a - b).abs() <= lsb);
        }

        let peds = vec![adc.spec().pedestal; 3];
        let with_peds = adc.dac(&codes, Some(&peds)).unwrap();
        for (a, b) in input.iter().zip(with_peds.iter()) {
            assert!((a - b).abs() <= 1.5 * lsb);
        }

        let err = adc.dac(&codes, Some(&peds[..2])).unwrap_err();
        assert!(matches!(err, DspError::LengthMismatch { expected: 3, actual: 2 }));
        assert!(adc.dac(&[5000], None).is_err());
    }

    #[test]
    fn test_logarithmic_conversion() {
        let adc = Converter::new(
            16,
            RangeSpec::Reference(Volts(1.0)),
            Volts::ZERO,
            Scale::Logarithmic { base: LogBase::Base(10.0), efficiency: 6.0 },
        )
        .unwrap();
        let spec = *adc.spec();

        // Vref·B^-C maps to code 0 and Vfs to the top code
        assert_eq!(adc.adc(&[1e-6]).unwrap(), vec![0]);
        assert_eq!(adc.adc(&[spec.vfs.0]).unwrap(), vec![65535]);

        let input = [1e-5, 3.3e-4, 0.02, 0.5, 0.9];
        let output = adc.transmit(&input, None).unwrap();
        let relative_step = (10f64.ln() * 6.0 / 65536.0).exp() - 1.0;
        for (a, b) in input.iter().zip(output.iter()) {
            assert!(((a - b) / a).abs() <= relative_step, "{} vs {}", a, b);
        }

        let err = adc.adc(&[0.1, -0.2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NumericDomain);
    }

    #[test]
    fn test_natural_log_full_scale_relation() {
        let adc = Converter::new(
            8,
            RangeSpec::FullScale(Volts(1.0)),
            Volts::ZERO,
            Scale::Logarithmic { base: LogBase::Natural, efficiency: 4.0 },
        )
        .unwrap();
        let spec = adc.spec();
        // Vfs = Vref·B^-C·B^((N-1)C/N)
        let vfs = spec.vref.0 * (-4.0f64).exp() * (255.0 * 4.0 / 256.0f64).exp();
        assert!((vfs - 1.0).abs() < 1e-12);
        assert_eq!(adc.adc(&[1.0]).unwrap(), vec![255]);
    }
}
