//! Sample-and-Hold and Sample-and-Sum decimation.
//!
//! Both operators partition their source into consecutive intervals. Hold
//! records one point value per interval; Sum records the integral (for a
//! function) or the sum (for stored samples) over each interval, like a
//! charge-integrating sampler.

use crate::error::{DspError, DspResult};
use std::ops::RangeInclusive;

/// Subintervals used by Simpson's rule for each Sample-and-Sum interval.
const SIMPSON_STEPS: usize = 64;

/// Where in each interval Sample-and-Hold reads the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HoldPoint {
    #[default]
    Start,
    Center,
    End,
}

impl HoldPoint {
    /// `< 0` start, `0` center, `> 0` end.
    pub fn from_sign(loc: i32) -> Self {
        match loc {
            l if l < 0 => Self::Start,
            0 => Self::Center,
            _ => Self::End,
        }
    }
}

/// Whole intervals `[lo, lo + step]` starting at `vmin`. A partial interval
/// left over at `vmax` is dropped.
fn intervals(step: f64, vmin: f64, vmax: f64) -> DspResult<Vec<(f64, f64)>> {
    if !(step > 0.0 && step.is_finite()) {
        return Err(DspError::invalid("step", format!("must be positive, got {}", step)));
    }
    if !(vmin.is_finite() && vmax.is_finite() && vmax > vmin) {
        return Err(DspError::invalid(
            "range",
            format!("need vmin < vmax, got [{}, {}]", vmin, vmax),
        ));
    }
    let span = (vmax - vmin) / step;
    let count = (span + 1e-9).floor() as usize;
    if count == 0 {
        return Err(DspError::invalid(
            "step",
            format!("{} exceeds the range [{}, {}]", step, vmin, vmax),
        ));
    }
    Ok((0..count)
        .map(|i| {
            let lo = vmin + i as f64 * step;
            (lo, (lo + step).min(vmax))
        })
        .collect())
}

/// Sample `f` once per interval of `[vmin, vmax]`. Returns `(x, f(x))` pairs.
pub fn sample_and_hold_fn<F>(
    f: F,
    step: f64,
    vmin: f64,
    vmax: f64,
    at: HoldPoint,
) -> DspResult<Vec<(f64, f64)>>
where
    F: Fn(f64) -> f64,
{
    let points = intervals(step, vmin, vmax)?
        .into_iter()
        .map(|(lo, hi)| {
            let x = match at {
                HoldPoint::Start => lo,
                HoldPoint::Center => 0.5 * (lo + hi),
                HoldPoint::End => hi,
            };
            (x, f(x))
        })
        .collect();
    Ok(points)
}

/// Integrate `f` over each interval of `[vmin, vmax]`. Returns
/// `(interval start, integral)` pairs.
pub fn sample_and_sum_fn<F>(f: F, step: f64, vmin: f64, vmax: f64) -> DspResult<Vec<(f64, f64)>>
where
    F: Fn(f64) -> f64,
{
    let points = intervals(step, vmin, vmax)?
        .into_iter()
        .map(|(lo, hi)| (lo, simpson(&f, lo, hi)))
        .collect();
    Ok(points)
}

fn simpson<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> f64 {
    let h = (b - a) / SIMPSON_STEPS as f64;
    let inner: f64 = (1..SIMPSON_STEPS)
        .map(|i| {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            weight * f(a + i as f64 * h)
        })
        .sum();
    (f(a) + inner + f(b)) * h / 3.0
}

fn window(samples: &[f64], n: usize, window: Option<RangeInclusive<usize>>) -> DspResult<(usize, usize)> {
    if samples.is_empty() {
        return Err(DspError::missing("no waveform loaded"));
    }
    if n < 1 {
        return Err(DspError::invalid("n", "interval needs at least one sample"));
    }
    let (jmin, jmax) = match window {
        Some(r) => (*r.start(), *r.end()),
        None => (0, samples.len() - 1),
    };
    if jmin > jmax || jmax >= samples.len() {
        return Err(DspError::invalid(
            "window",
            format!("[{}, {}] is not inside [0, {}]", jmin, jmax, samples.len() - 1),
        ));
    }
    Ok((jmin, jmax))
}

/// One value per `n`-sample interval of `samples[jmin..=jmax]`.
///
/// The read position is clamped to `jmax`, so the end of a partial final
/// interval is its last sample.
pub fn sample_and_hold(
    samples: &[f64],
    n: usize,
    at: HoldPoint,
    range: Option<RangeInclusive<usize>>,
) -> DspResult<Vec<f64>> {
    let (jmin, jmax) = window(samples, n, range)?;
    let values = (jmin..=jmax)
        .step_by(n)
        .map(|j| {
            let index = match at {
                HoldPoint::Start => j,
                HoldPoint::Center => j + n / 2,
                HoldPoint::End => j + n,
            };
            samples[index.min(jmax)]
        })
        .collect();
    Ok(values)
}

/// Sum of each `n`-sample interval of `samples[jmin..=jmax]`.
pub fn sample_and_sum(
    samples: &[f64],
    n: usize,
    range: Option<RangeInclusive<usize>>,
) -> DspResult<Vec<f64>> {
    let (jmin, jmax) = window(samples, n, range)?;
    let values = (jmin..=jmax)
        .step_by(n)
        .map(|j| samples[j..=(j + n - 1).min(jmax)].iter().sum())
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_hold_function_drops_partial_interval() {
        let start = sample_and_hold_fn(|x| x * 10.0, 1.0, 0.0, 3.5, HoldPoint::Start).unwrap();
        assert_eq!(start, vec![(0.0, 0.0), (1.0, 10.0), (2.0, 20.0)]);

        let end = sample_and_hold_fn(|x| x, 1.0, 0.0, 3.5, HoldPoint::End).unwrap();
        assert_eq!(end.last(), Some(&(3.0, 3.0)));

        let exact = sample_and_hold_fn(|x| x, 0.5, 0.0, 2.0, HoldPoint::Start).unwrap();
        assert_eq!(exact.len(), 4);
        assert!(sample_and_hold_fn(|x| x, 3.0, 0.0, 2.0, HoldPoint::Start).is_err());

        let center = sample_and_hold_fn(|x| x, 1.0, 0.0, 2.0, HoldPoint::Center).unwrap();
        assert_eq!(center, vec![(0.5, 0.5), (1.5, 1.5)]);
    }

    #[test]
    fn test_sum_function_integrates() {
        let sums = sample_and_sum_fn(|x| x * x, 1.0, 0.0, 2.5).unwrap();
        let expected = [1.0 / 3.0, 7.0 / 3.0];
        assert_eq!(sums.len(), 2);
        for ((_, got), want) in sums.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_hold_stored_sequence() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(
            sample_and_hold(&x, 3, HoldPoint::Start, None).unwrap(),
            vec![0.0, 3.0, 6.0, 9.0]
        );
        assert_eq!(
            sample_and_hold(&x, 3, HoldPoint::End, None).unwrap(),
            vec![3.0, 6.0, 9.0, 9.0]
        );
        assert_eq!(
            sample_and_hold(&x, 4, HoldPoint::Center, Some(2..=7)).unwrap(),
            vec![4.0, 7.0]
        );
    }

    #[test]
    fn test_sum_stored_sequence() {
        let x = vec![1.0; 10];
        assert_eq!(sample_and_sum(&x, 4, None).unwrap(), vec![4.0, 4.0, 2.0]);
        assert_eq!(sample_and_sum(&x, 3, Some(1..=6)).unwrap(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(sample_and_hold_fn(|x| x, 0.0, 0.0, 1.0, HoldPoint::Start).is_err());
        assert!(sample_and_sum_fn(|x| x, 1.0, 2.0, 1.0).is_err());
        assert!(sample_and_hold(&[1.0, 2.0], 0, HoldPoint::Start, None).is_err());
        assert!(sample_and_sum(&[1.0, 2.0], 1, Some(1..=5)).is_err());
        let err = sample_and_sum(&[], 1, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingData);
    }

    #[test]
    fn test_hold_point_from_sign() {
        assert_eq!(HoldPoint::from_sign(-3), HoldPoint::Start);
        assert_eq!(HoldPoint::from_sign(0), HoldPoint::Center);
        assert_eq!(HoldPoint::from_sign(2), HoldPoint::End);
    }
}
