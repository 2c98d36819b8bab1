//! Rendered `(x, y)` curves.

use crate::selector::{AxisDomain, ValueKind};
use serde::{Deserialize, Serialize};

/// A sequence of `(x, y)` pairs in a documented axis domain.
///
/// This is what every transform, filter and kernel hands back for display.
/// How it is drawn or stored is up to the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub domain: AxisDomain,
    pub value: ValueKind,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Curve {
    pub fn new(domain: AxisDomain, value: ValueKind) -> Self {
        Self { domain, value, x: Vec::new(), y: Vec::new() }
    }

    pub fn with_capacity(domain: AxisDomain, value: ValueKind, capacity: usize) -> Self {
        Self {
            domain,
            value,
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Iterate over `(x, y)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// The point with the largest y value (first one on ties). NaN values are skipped.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.points()
            .filter(|(_, y)| !y.is_nan())
            .fold(None, |best: Option<(f64, f64)>, p| match best {
                Some(b) if b.1 >= p.1 => Some(b),
                _ => Some(p),
            })
    }

    /// Scale every y value so the peak becomes 1 (linear) or 0 dB.
    pub fn normalize_peak(&mut self) {
        let Some((_, peak)) = self.peak() else { return };
        match self.value {
            ValueKind::Decibel => self.y.iter_mut().for_each(|y| *y -= peak),
            _ if peak != 0.0 => self.y.iter_mut().for_each(|y| *y /= peak),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_first_on_ties() {
        let mut curve = Curve::new(AxisDomain::Index, ValueKind::Re);
        curve.push(0.0, 1.0);
        curve.push(1.0, 3.0);
        curve.push(2.0, 3.0);
        assert_eq!(curve.peak(), Some((1.0, 3.0)));
    }

    #[test]
    fn test_normalize_linear_and_db() {
        let mut lin = Curve::new(AxisDomain::Fraction, ValueKind::Amplitude);
        lin.push(0.0, 2.0);
        lin.push(0.5, 0.5);
        lin.normalize_peak();
        assert_eq!(lin.y, vec![1.0, 0.25]);

        let mut db = Curve::new(AxisDomain::Fraction, ValueKind::Decibel);
        db.push(0.0, 6.0);
        db.push(0.5, -14.0);
        db.normalize_peak();
        assert_eq!(db.y, vec![0.0, -20.0]);
    }

    #[test]
    fn test_empty_curve_has_no_peak() {
        let curve = Curve::default();
        assert!(curve.is_empty());
        assert_eq!(curve.peak(), None);
    }
}
