//! Generalized Lomb-Scargle periodogram for unevenly sampled series.
//!
//! At each trial frequency `f` the model
//!
//! ```text
//! y(t) = a·Z(t)·cos(2πft) + b·Z(t)·sin(2πft) + c
//! ```
//!
//! is fitted by weighted least squares in closed form, following
//! Zechmeister & Kürster (2009, A&A 496, 577). `Z(t)` is an optional
//! amplitude modulation (1 by default). The normalized power `P ∈ [0, 1]`
//! is the fraction of the weighted variance explained by the fit.
//!
//! Frequencies are independent, so the scan runs in parallel with Rayon.

use crate::error::{DspError, DspResult};
use lib_types::curve::Curve;
use lib_types::selector::{AxisDomain, ValueKind};
use lib_types::units::Seconds;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::str::FromStr;

/// Unit of the time stamps; frequencies come out in cycles per unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Days,
    Hours,
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
    Picoseconds,
}

impl TimeUnit {
    /// Length of one unit.
    pub fn duration(self) -> Seconds {
        match self {
            Self::Days => Seconds::from_days(1.0),
            Self::Hours => Seconds::from_hours(1.0),
            Self::Seconds => Seconds(1.0),
            Self::Milliseconds => Seconds::from_ms(1.0),
            Self::Microseconds => Seconds::from_us(1.0),
            Self::Nanoseconds => Seconds::from_ns(1.0),
            Self::Picoseconds => Seconds::from_ps(1.0),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = DspError;

    fn from_str(s: &str) -> DspResult<Self> {
        match s.trim() {
            "d" => Ok(Self::Days),
            "h" => Ok(Self::Hours),
            "s" => Ok(Self::Seconds),
            "ms" => Ok(Self::Milliseconds),
            "us" => Ok(Self::Microseconds),
            "ns" => Ok(Self::Nanoseconds),
            "ps" => Ok(Self::Picoseconds),
            other => Err(DspError::invalid("unit", format!("unsupported time unit `{}`", other))),
        }
    }
}

/// Frequency scan definition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanConfig {
    pub unit: TimeUnit,
    /// Shortest period; sets `fmax = 1/t_min`.
    pub t_min: f64,
    /// Longest period; sets `fmin = 1/t_max`, or 0 when absent.
    pub t_max: Option<f64>,
    /// Number of frequency steps; the scan has `steps + 1` points.
    pub steps: usize,
}

impl ScanConfig {
    pub fn new(unit: TimeUnit, t_min: f64, t_max: Option<f64>, steps: usize) -> Self {
        Self { unit, t_min, t_max, steps }
    }

    fn validate(&self) -> DspResult<()> {
        if !(self.t_min > 0.0 && self.t_min.is_finite()) {
            return Err(DspError::invalid("t_min", format!("must be positive, got {}", self.t_min)));
        }
        if let Some(t_max) = self.t_max {
            if !(t_max > self.t_min && t_max.is_finite()) {
                return Err(DspError::invalid(
                    "t_max",
                    format!("must exceed t_min ({}), got {}", self.t_min, t_max),
                ));
            }
        }
        if self.steps < 1 {
            return Err(DspError::invalid("steps", "need at least one frequency step"));
        }
        Ok(())
    }

    /// `(fmin, fmax)` in cycles per unit.
    pub fn band(&self) -> (f64, f64) {
        (self.t_max.map_or(0.0, |t| 1.0 / t), 1.0 / self.t_min)
    }

    /// Frequency step in cycles per unit.
    pub fn resolution(&self) -> f64 {
        let (fmin, fmax) = self.band();
        (fmax - fmin) / self.steps as f64
    }

    pub fn frequencies(&self) -> impl Iterator<Item = f64> {
        let (fmin, _) = self.band();
        let df = self.resolution();
        (0..=self.steps).map(move |k| fmin + k as f64 * df)
    }
}

/// Fit result at one frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodogramPoint {
    /// Cycles per time unit.
    pub frequency: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub power: f64,
}

/// A complete scan.
#[derive(Clone, Debug, PartialEq)]
pub struct Periodogram {
    pub unit: TimeUnit,
    pub points: Vec<PeriodogramPoint>,
}

impl Periodogram {
    /// The point of maximum power (first one on ties).
    pub fn peak(&self) -> Option<&PeriodogramPoint> {
        self.points.iter().fold(None, |best: Option<&PeriodogramPoint>, p| match best {
            Some(b) if b.power >= p.power => Some(b),
            _ => Some(p),
        })
    }

    pub fn frequencies_hz(&self) -> Vec<f64> {
        let unit = self.unit.duration().0;
        self.points.iter().map(|p| p.frequency / unit).collect()
    }

    /// Power versus frequency in Hz.
    pub fn curve(&self) -> Curve {
        let mut curve = Curve::with_capacity(AxisDomain::Hertz, ValueKind::Power, self.points.len());
        for (f, p) in self.frequencies_hz().into_iter().zip(&self.points) {
            curve.push(f, p.power);
        }
        curve
    }
}

struct Sample {
    t: f64,
    y: f64,
    w: f64,
}

fn prepare(t: &[f64], y: &[f64], dy: Option<&[f64]>) -> DspResult<Vec<Sample>> {
    if t.is_empty() {
        return Err(DspError::invalid("t", "no data points"));
    }
    if y.len() != t.len() {
        return Err(DspError::LengthMismatch { expected: t.len(), actual: y.len() });
    }
    if let Some(dy) = dy {
        if dy.len() != t.len() {
            return Err(DspError::LengthMismatch { expected: t.len(), actual: dy.len() });
        }
    }

    let mut samples: Vec<Sample> = Vec::with_capacity(t.len());
    for i in 0..t.len() {
        let w = match dy {
            Some(dy) if dy[i] > 0.0 => 1.0 / (dy[i] * dy[i]),
            Some(_) => continue,
            None => 1.0,
        };
        samples.push(Sample { t: t[i], y: y[i], w });
    }
    let skipped = t.len() - samples.len();
    if skipped > 0 {
        tracing::warn!("periodogram: skipped {} points with non-positive uncertainty", skipped);
    }
    if samples.is_empty() {
        return Err(DspError::invalid("dy", "no point has a positive uncertainty"));
    }

    let total: f64 = samples.iter().map(|s| s.w).sum();
    samples.iter_mut().for_each(|s| s.w /= total);
    Ok(samples)
}

fn fit<Z: Fn(f64) -> f64>(samples: &[Sample], mean_y: f64, yy: f64, frequency: f64, z: &Z) -> PeriodogramPoint {
    let omega = 2.0 * PI * frequency;
    let (mut c, mut s, mut yc, mut ys, mut cc, mut ss, mut cs) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for p in samples {
        let m = z(p.t);
        let (sin, cos) = (omega * p.t).sin_cos();
        let (ci, si) = (m * cos, m * sin);
        c += p.w * ci;
        s += p.w * si;
        yc += p.w * p.y * ci;
        ys += p.w * p.y * si;
        cc += p.w * ci * ci;
        ss += p.w * si * si;
        cs += p.w * ci * si;
    }
    let yc = yc - mean_y * c;
    let ys = ys - mean_y * s;
    let cc = cc - c * c;
    let ss = ss - s * s;
    let cs = cs - c * s;
    let d = cc * ss - cs * cs;

    if d <= 0.0 || yy <= 0.0 {
        return PeriodogramPoint { frequency, a: 0.0, b: 0.0, c: mean_y, power: 0.0 };
    }

    let a = (yc * ss - ys * cs) / d;
    let b = (ys * cc - yc * cs) / d;
    let power = (ss * yc * yc + cc * ys * ys - 2.0 * cs * yc * ys) / (yy * d);
    PeriodogramPoint {
        frequency,
        a,
        b,
        c: mean_y - a * c - b * s,
        power,
    }
}

/// Periodogram of `(t, y[, dy])` with an amplitude modulation `Z(t)`.
///
/// Points whose uncertainty is not positive are skipped. All arguments are
/// validated before the frequency loop starts.
pub fn periodogram_modulated<Z>(
    config: &ScanConfig,
    t: &[f64],
    y: &[f64],
    dy: Option<&[f64]>,
    z: Z,
) -> DspResult<Periodogram>
where
    Z: Fn(f64) -> f64 + Sync,
{
    config.validate()?;
    let samples = prepare(t, y, dy)?;

    let mean_y: f64 = samples.iter().map(|s| s.w * s.y).sum();
    let yy: f64 = samples.iter().map(|s| s.w * s.y * s.y).sum::<f64>() - mean_y * mean_y;

    let (fmin, fmax) = config.band();
    tracing::debug!(
        "periodogram: {} points, f in [{}, {}] per {:?}, {} steps",
        samples.len(),
        fmin,
        fmax,
        config.unit,
        config.steps
    );

    let frequencies: Vec<f64> = config.frequencies().collect();
    let points = frequencies
        .par_iter()
        .map(|&f| fit(&samples, mean_y, yy, f, &z))
        .collect();

    Ok(Periodogram { unit: config.unit, points })
}

/// Periodogram of `(t, y[, dy])` without amplitude modulation.
pub fn periodogram(
    config: &ScanConfig,
    t: &[f64],
    y: &[f64],
    dy: Option<&[f64]>,
) -> DspResult<Periodogram> {
    periodogram_modulated(config, t, y, dy, |_| 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Slightly jittered sampling, 50 points per period of a 1 Hz tone.
    fn uneven_times(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.02 + 0.004 * (i as f64 * 1.7).sin()).collect()
    }

    #[test]
    fn test_recovers_tone_frequency() {
        let t = uneven_times(500);
        let y: Vec<f64> = t.iter().map(|&t| (2.0 * PI * 1.0 * t).sin()).collect();
        let config = ScanConfig::new(TimeUnit::Seconds, 0.2, Some(5.0), 480);

        let result = periodogram(&config, &t, &y, None).unwrap();
        assert_eq!(result.points.len(), 481);
        let peak = result.peak().unwrap();
        assert!(
            (peak.frequency - 1.0).abs() <= config.resolution() + 1e-12,
            "peak at {}",
            peak.frequency
        );
        assert!(peak.power > 0.99);
        assert!(result.points.iter().all(|p| (-1e-9..=1.0 + 1e-9).contains(&p.power)));
    }

    #[test]
    fn test_fit_coefficients() {
        let t = uneven_times(400);
        let y: Vec<f64> = t
            .iter()
            .map(|&t| 2.0 * (2.0 * PI * 1.5 * t).cos() + 3.0 * (2.0 * PI * 1.5 * t).sin() + 1.0)
            .collect();
        let dy = vec![0.1; t.len()];
        // Grid 0.5, 0.75, ..., 1.5 hits the tone exactly
        let config = ScanConfig::new(TimeUnit::Seconds, 1.0 / 1.5, Some(2.0), 4);
        let result = periodogram(&config, &t, &y, Some(&dy)).unwrap();
        let last = result.points.last().unwrap();
        assert!((last.frequency - 1.5).abs() < 1e-12);
        assert!((last.a - 2.0).abs() < 1e-9);
        assert!((last.b - 3.0).abs() < 1e-9);
        assert!((last.c - 1.0).abs() < 1e-9);
        assert!((last.power - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_modulation_and_zero_frequency() {
        let t = uneven_times(300);
        let z = |t: f64| (-0.1 * t).exp();
        let y: Vec<f64> = t.iter().map(|&t| z(t) * (2.0 * PI * 2.0 * t).cos()).collect();
        let config = ScanConfig::new(TimeUnit::Seconds, 0.25, None, 400);
        let result = periodogram_modulated(&config, &t, &y, None, z).unwrap();

        // No t_max: the scan starts at DC, where nothing can be fitted
        assert_eq!(result.points[0].frequency, 0.0);
        assert_eq!(result.points[0].power, 0.0);
        let peak = result.peak().unwrap();
        assert!((peak.frequency - 2.0).abs() <= config.resolution() + 1e-12);
        assert!(peak.power > 0.99);
    }

    #[test]
    fn test_non_positive_uncertainties_skipped() {
        let t = uneven_times(200);
        let y: Vec<f64> = t.iter().map(|&t| (2.0 * PI * t).sin()).collect();
        let dy: Vec<f64> = (0..200).map(|i| if i % 10 == 0 { 0.0 } else { 0.5 }).collect();
        let config = ScanConfig::new(TimeUnit::Seconds, 0.5, Some(4.0), 70);
        let result = periodogram(&config, &t, &y, Some(&dy)).unwrap();
        let peak = result.peak().unwrap();
        assert!((peak.frequency - 1.0).abs() <= config.resolution() + 1e-12);
    }

    #[test]
    fn test_units_and_curve() {
        assert_eq!("d".parse::<TimeUnit>().unwrap(), TimeUnit::Days);
        let err = "fortnight".parse::<TimeUnit>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let t: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = t.iter().map(|&t| (2.0 * PI * 0.5 * t).sin()).collect();
        let config = ScanConfig::new(TimeUnit::Days, 1.0, Some(4.0), 10);
        let result = periodogram(&config, &t, &y, None).unwrap();
        let curve = result.curve();
        assert_eq!(curve.domain, AxisDomain::Hertz);
        assert_eq!(curve.len(), 11);
        assert!((curve.x[10] - 1.0 / 86_400.0).abs() < 1e-18);
    }

    #[test]
    fn test_invalid_inputs() {
        let t = [0.0, 1.0, 2.0];
        let y = [1.0, 0.0, 1.0];
        let ok = ScanConfig::new(TimeUnit::Seconds, 0.5, Some(2.0), 10);

        let bad_configs = [
            ScanConfig::new(TimeUnit::Seconds, 0.0, None, 10),
            ScanConfig::new(TimeUnit::Seconds, 1.0, Some(0.5), 10),
            ScanConfig::new(TimeUnit::Seconds, 1.0, None, 0),
        ];
        for config in &bad_configs {
            let err = periodogram(config, &t, &y, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }

        assert!(periodogram(&ok, &[], &[], None).is_err());
        assert!(periodogram(&ok, &t, &y[..2], None).is_err());
        assert!(periodogram(&ok, &t, &y, Some(&[1.0])).is_err());
        assert!(periodogram(&ok, &t, &y, Some(&[0.0, -1.0, 0.0])).is_err());
    }
}
