//! Normalized Fourier, Hartley, Cosine, Sine and Hilbert transforms.
//!
//! Every transform is scaled so that applying it and then its inverse
//! returns the input to rounding error:
//!
//! | family        | forward scale        | inverse          |
//! |---------------|----------------------|------------------|
//! | Fourier       | `1/sqrt(N)`          | matching inverse |
//! | Hartley       | `1/sqrt(N)`          | itself           |
//! | Cosine I      | `1/sqrt(2(N-1))`     | itself           |
//! | Cosine II/III | `1/sqrt(2N)`         | each other       |
//! | Cosine IV     | `1/sqrt(2N)`         | itself           |
//! | Sine I        | `1/sqrt(2(N+1))`     | itself           |
//! | Sine II/III   | `1/sqrt(2N)`         | each other       |
//! | Sine IV       | `1/sqrt(2N)`         | itself           |
//!
//! The cosine and sine families are evaluated as a complex FFT over an
//! even or odd symmetric extension of the input.

use crate::error::{DspError, DspResult};
use crate::fft::FftEngine;
use num_complex::Complex64;
use std::str::FromStr;

/// Fourier transform direction and input layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FourierMode {
    /// Real time-domain input, full Hermitian spectrum out.
    R2C,
    /// Frequency-domain input (first `N/2+1` bins used), real output.
    C2R,
    /// Forward complex transform.
    C2C,
    /// Inverse complex transform.
    C2CI,
}

impl FourierMode {
    pub fn is_inverse(self) -> bool {
        matches!(self, Self::C2R | Self::C2CI)
    }
}

impl FromStr for FourierMode {
    type Err = DspError;

    fn from_str(s: &str) -> DspResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R2C" => Ok(Self::R2C),
            "C2R" => Ok(Self::C2R),
            "C2C" => Ok(Self::C2C),
            "C2CI" => Ok(Self::C2CI),
            other => Err(DspError::invalid("mode", format!("unsupported Fourier mode `{}`", other))),
        }
    }
}

/// Direction of a Hartley, Hilbert, cosine or sine transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Forward,
    Inverse,
}

impl TryFrom<i32> for Direction {
    type Error = DspError;

    fn try_from(value: i32) -> DspResult<Self> {
        match value {
            v if v > 0 => Ok(Self::Forward),
            v if v < 0 => Ok(Self::Inverse),
            _ => Err(DspError::invalid("mode", "direction must be non-zero")),
        }
    }
}

impl Direction {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }
}

/// DCT/DST type I to IV.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrigType {
    I,
    II,
    III,
    IV,
}

impl TrigType {
    /// The type whose transform undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::II => Self::III,
            Self::III => Self::II,
            other => other,
        }
    }

    /// Position of this type in 1..=4.
    pub fn number(self) -> u8 {
        match self {
            Self::I => 1,
            Self::II => 2,
            Self::III => 3,
            Self::IV => 4,
        }
    }

    /// Decode a signed type number: the magnitude picks the type and a
    /// negative sign its inverse.
    pub fn from_signed(value: i32) -> DspResult<(Self, Direction)> {
        let ty = Self::try_from(value.checked_abs().unwrap_or(0))?;
        let direction = if value < 0 { Direction::Inverse } else { Direction::Forward };
        Ok((ty, direction))
    }

    /// The type actually evaluated when this type is run in `direction`.
    pub fn evaluated(self, direction: Direction) -> Self {
        match direction {
            Direction::Forward => self,
            Direction::Inverse => self.inverse(),
        }
    }
}

impl TryFrom<i32> for TrigType {
    type Error = DspError;

    /// Type number 1..=4. Use [`TrigType::from_signed`] for signed numbers.
    fn try_from(value: i32) -> DspResult<Self> {
        match value {
            1 => Ok(Self::I),
            2 => Ok(Self::II),
            3 => Ok(Self::III),
            4 => Ok(Self::IV),
            _ => Err(DspError::invalid(
                "type",
                format!("expected 1..4, got {}", value),
            )),
        }
    }
}

/// Which trigonometric family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrigFamily {
    Cosine,
    Sine,
}

/// A pair of real and imaginary sequences.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spectrum {
    pub re: Vec<f64>,
    pub im: Vec<f64>,
}

impl Spectrum {
    pub fn real(re: Vec<f64>) -> Self {
        let im = vec![0.0; re.len()];
        Self { re, im }
    }

    fn from_complex(data: &[Complex64]) -> Self {
        Self {
            re: data.iter().map(|c| c.re).collect(),
            im: data.iter().map(|c| c.im).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.re.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    /// Instantaneous amplitude `sqrt(re² + im²)`.
    pub fn amplitude(&self) -> Vec<f64> {
        self.re.iter().zip(&self.im).map(|(r, i)| r.hypot(*i)).collect()
    }

    /// Phase `atan2(im, re)` in radians.
    pub fn phase(&self) -> Vec<f64> {
        self.re.iter().zip(&self.im).map(|(r, i)| i.atan2(*r)).collect()
    }
}

fn to_complex(re: &[f64], im: &[f64]) -> DspResult<Vec<Complex64>> {
    if !im.is_empty() && im.len() != re.len() {
        return Err(DspError::LengthMismatch {
            expected: re.len(),
            actual: im.len(),
        });
    }
    Ok(re
        .iter()
        .enumerate()
        .map(|(i, &r)| Complex64::new(r, im.get(i).copied().unwrap_or(0.0)))
        .collect())
}

/// Stateless transform evaluator holding cached FFT plans.
#[derive(Default)]
pub struct TransformEngine {
    fft: FftEngine,
}

impl TransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized DFT. `im` may be empty, meaning all zeros.
    ///
    /// The output always has `N` entries; for `R2C` the negative-frequency
    /// half is filled from Hermitian symmetry, and `C2R` returns a zero
    /// imaginary part.
    pub fn fourier(&mut self, re: &[f64], im: &[f64], mode: FourierMode) -> DspResult<Spectrum> {
        let n = re.len();
        if n == 0 {
            return Ok(Spectrum::default());
        }
        tracing::debug!("Fourier {:?}: N={}", mode, n);
        let scale = 1.0 / (n as f64).sqrt();

        match mode {
            FourierMode::R2C => {
                let half = self.fft.rfft(re)?;
                let mut full = vec![Complex64::new(0.0, 0.0); n];
                for (k, c) in half.iter().enumerate() {
                    full[k] = *c * scale;
                    if k > 0 {
                        full[n - k] = full[k].conj();
                    }
                }
                Ok(Spectrum::from_complex(&full))
            }
            FourierMode::C2R => {
                let data = to_complex(re, im)?;
                let half = &data[..n / 2 + 1];
                let mut out = self.fft.irfft(half, n)?;
                // irfft divides by N; the unitary inverse divides by sqrt(N)
                let rescale = (n as f64).sqrt();
                out.iter_mut().for_each(|v| *v *= rescale);
                Ok(Spectrum::real(out))
            }
            FourierMode::C2C => {
                let mut data = to_complex(re, im)?;
                self.fft.forward_unitary(&mut data)?;
                Ok(Spectrum::from_complex(&data))
            }
            FourierMode::C2CI => {
                let mut data = to_complex(re, im)?;
                self.fft.inverse_unitary(&mut data)?;
                Ok(Spectrum::from_complex(&data))
            }
        }
    }

    /// Normalized discrete Hartley transform; both directions are the same map.
    pub fn hartley(&mut self, x: &[f64], _direction: Direction) -> DspResult<Vec<f64>> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let mut data = to_complex(x, &[])?;
        self.fft.forward_unitary(&mut data)?;
        Ok(data.iter().map(|c| c.re - c.im).collect())
    }

    /// Normalized DCT of the given type.
    pub fn cosine(&mut self, x: &[f64], ty: TrigType) -> DspResult<Vec<f64>> {
        self.trig(x, TrigFamily::Cosine, ty)
    }

    /// Normalized DST of the given type.
    pub fn sine(&mut self, x: &[f64], ty: TrigType) -> DspResult<Vec<f64>> {
        self.trig(x, TrigFamily::Sine, ty)
    }

    pub fn trig(&mut self, x: &[f64], family: TrigFamily, ty: TrigType) -> DspResult<Vec<f64>> {
        let n = x.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        if family == TrigFamily::Cosine && ty == TrigType::I && n < 2 {
            return Err(DspError::InsufficientData { needed: 2, got: n });
        }
        tracing::debug!("{:?}-{} transform: N={}", family, ty.number(), n);

        let zero = Complex64::new(0.0, 0.0);
        let sign = match family {
            TrigFamily::Cosine => 1.0,
            TrigFamily::Sine => -1.0,
        };

        // Symmetric extension, the FFT bin `stride·k + offset` holding
        // output `k`, and the normalization divisor.
        let (mut ext, (stride, offset), norm) = match (family, ty) {
            (TrigFamily::Cosine, TrigType::I) => {
                let m = 2 * (n - 1);
                let mut ext = vec![zero; m];
                for (j, &v) in x.iter().enumerate() {
                    ext[j] = v.into();
                    if j > 0 && j < n - 1 {
                        ext[m - j] = v.into();
                    }
                }
                (ext, (1, 0), (2.0 * (n - 1) as f64).sqrt())
            }
            (TrigFamily::Sine, TrigType::I) => {
                let m = 2 * (n + 1);
                let mut ext = vec![zero; m];
                for (j, &v) in x.iter().enumerate() {
                    ext[j + 1] = v.into();
                    ext[m - j - 1] = (-v).into();
                }
                (ext, (1, 1), (2.0 * (n + 1) as f64).sqrt())
            }
            (_, TrigType::II) => {
                let m = 4 * n;
                let mut ext = vec![zero; m];
                for (j, &v) in x.iter().enumerate() {
                    ext[2 * j + 1] = v.into();
                    ext[m - 2 * j - 1] = (sign * v).into();
                }
                let offset = match family {
                    TrigFamily::Cosine => 0,
                    TrigFamily::Sine => 1,
                };
                (ext, (1, offset), (2.0 * n as f64).sqrt())
            }
            (TrigFamily::Cosine, TrigType::III) => {
                let m = 4 * n;
                let mut ext = vec![zero; m];
                for (j, &v) in x.iter().enumerate() {
                    ext[j] = v.into();
                    if j > 0 {
                        ext[m - j] = v.into();
                    }
                }
                (ext, (2, 1), (2.0 * n as f64).sqrt())
            }
            (TrigFamily::Sine, TrigType::III) => {
                let m = 4 * n;
                let mut ext = vec![zero; m];
                for (j, &v) in x.iter().enumerate() {
                    // The last term enters with half weight
                    let a = if j == n - 1 { 0.5 * v } else { v };
                    ext[j + 1] = a.into();
                    ext[m - j - 1] = (-a).into();
                }
                (ext, (2, 1), (2.0 * n as f64).sqrt())
            }
            (_, TrigType::IV) => {
                let m = 8 * n;
                let mut ext = vec![zero; m];
                for (j, &v) in x.iter().enumerate() {
                    ext[2 * j + 1] = v.into();
                    ext[m - 2 * j - 1] = (sign * v).into();
                }
                (ext, (2, 1), (2.0 * n as f64).sqrt())
            }
        };

        self.fft.fft_inplace(&mut ext)?;
        let out = (0..n)
            .map(|k| {
                let c = ext[stride * k + offset];
                let v = match family {
                    TrigFamily::Cosine => c.re,
                    TrigFamily::Sine => -c.im,
                };
                v / norm
            })
            .collect();
        Ok(out)
    }

    /// Analytic-signal Hilbert transform.
    ///
    /// Forward: `re` is the input and `im` its Hilbert transform. Inverse:
    /// the input is taken as a Hilbert-transformed sequence `y`, `re` is the
    /// reconstructed `-HT(y)` and `im` is `y`. DC and Nyquist content cannot
    /// be carried through the transform and is lost.
    pub fn hilbert(&mut self, x: &[f64], direction: Direction) -> DspResult<Spectrum> {
        let n = x.len();
        if n == 0 {
            return Ok(Spectrum::default());
        }
        let mut data = to_complex(x, &[])?;
        self.fft.forward_unitary(&mut data)?;

        let minus_i = Complex64::new(0.0, -1.0);
        let plus_i = Complex64::new(0.0, 1.0);
        for (k, c) in data.iter_mut().enumerate() {
            if k == 0 || 2 * k == n {
                *c = Complex64::new(0.0, 0.0);
            } else if 2 * k < n {
                *c *= minus_i;
            } else {
                *c *= plus_i;
            }
        }
        self.fft.inverse_unitary(&mut data)?;
        let ht: Vec<f64> = data.iter().map(|c| c.re).collect();

        Ok(match direction {
            Direction::Forward => Spectrum { re: x.to_vec(), im: ht },
            Direction::Inverse => Spectrum {
                re: ht.iter().map(|v| -v).collect(),
                im: x.to_vec(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn random_signal(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    fn assert_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < tol, "Mismatch at index {}: {} vs {}", i, x, y);
        }
    }

    /// Unnormalized textbook definitions.
    fn reference(x: &[f64], family: TrigFamily, ty: TrigType) -> Vec<f64> {
        let n = x.len();
        let nf = n as f64;
        (0..n)
            .map(|k| {
                let kf = k as f64;
                match (family, ty) {
                    (TrigFamily::Cosine, TrigType::I) => {
                        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                        x[0] + sign * x[n - 1]
                            + 2.0
                                * (1..n - 1)
                                    .map(|j| x[j] * (PI * j as f64 * kf / (nf - 1.0)).cos())
                                    .sum::<f64>()
                    }
                    (TrigFamily::Cosine, TrigType::II) => {
                        2.0 * (0..n)
                            .map(|j| x[j] * (PI * (j as f64 + 0.5) * kf / nf).cos())
                            .sum::<f64>()
                    }
                    (TrigFamily::Cosine, TrigType::III) => {
                        x[0] + 2.0
                            * (1..n)
                                .map(|j| x[j] * (PI * j as f64 * (kf + 0.5) / nf).cos())
                                .sum::<f64>()
                    }
                    (TrigFamily::Cosine, TrigType::IV) => {
                        2.0 * (0..n)
                            .map(|j| x[j] * (PI * (j as f64 + 0.5) * (kf + 0.5) / nf).cos())
                            .sum::<f64>()
                    }
                    (TrigFamily::Sine, TrigType::I) => {
                        2.0 * (0..n)
                            .map(|j| x[j] * (PI * (j as f64 + 1.0) * (kf + 1.0) / (nf + 1.0)).sin())
                            .sum::<f64>()
                    }
                    (TrigFamily::Sine, TrigType::II) => {
                        2.0 * (0..n)
                            .map(|j| x[j] * (PI * (j as f64 + 0.5) * (kf + 1.0) / nf).sin())
                            .sum::<f64>()
                    }
                    (TrigFamily::Sine, TrigType::III) => {
                        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                        sign * x[n - 1]
                            + 2.0
                                * (0..n - 1)
                                    .map(|j| x[j] * (PI * (j as f64 + 1.0) * (kf + 0.5) / nf).sin())
                                    .sum::<f64>()
                    }
                    (TrigFamily::Sine, TrigType::IV) => {
                        2.0 * (0..n)
                            .map(|j| x[j] * (PI * (j as f64 + 0.5) * (kf + 0.5) / nf).sin())
                            .sum::<f64>()
                    }
                }
            })
            .collect()
    }

    #[test]
    fn test_fourier_r2c_c2r_roundtrip() {
        let mut engine = TransformEngine::new();
        for n in [2, 7, 64, 100] {
            let x = random_signal(n, n as u64);
            let spec = engine.fourier(&x, &[], FourierMode::R2C).unwrap();
            assert_eq!(spec.len(), n);
            let back = engine.fourier(&spec.re, &spec.im, FourierMode::C2R).unwrap();
            assert_close(&back.re, &x, 1e-9);
            assert!(back.im.iter().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn test_fourier_r2c_hermitian_and_scaled() {
        let mut engine = TransformEngine::new();
        let x = random_signal(9, 3);
        let spec = engine.fourier(&x, &[], FourierMode::R2C).unwrap();
        let dc: f64 = x.iter().sum::<f64>() / 3.0;
        assert!((spec.re[0] - dc).abs() < 1e-12);
        for k in 1..9 {
            assert!((spec.re[k] - spec.re[9 - k]).abs() < 1e-12);
            assert!((spec.im[k] + spec.im[9 - k]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fourier_complex_roundtrip() {
        let mut engine = TransformEngine::new();
        let re = random_signal(30, 1);
        let im = random_signal(30, 2);
        let spec = engine.fourier(&re, &im, FourierMode::C2C).unwrap();
        let back = engine.fourier(&spec.re, &spec.im, FourierMode::C2CI).unwrap();
        assert_close(&back.re, &re, 1e-12);
        assert_close(&back.im, &im, 1e-12);
    }

    #[test]
    fn test_fourier_parse_and_empty() {
        assert_eq!("c2ci".parse::<FourierMode>().unwrap(), FourierMode::C2CI);
        assert!("R2R".parse::<FourierMode>().is_err());
        let mut engine = TransformEngine::new();
        assert!(engine.fourier(&[], &[], FourierMode::R2C).unwrap().is_empty());
    }

    #[test]
    fn test_hartley_self_inverse() {
        let mut engine = TransformEngine::new();
        let x = random_signal(33, 4);
        let h = engine.hartley(&x, Direction::Forward).unwrap();
        let back = engine.hartley(&h, Direction::Inverse).unwrap();
        assert_close(&back, &x, 1e-12);
    }

    #[test]
    fn test_trig_types_match_definitions() {
        let mut engine = TransformEngine::new();
        let x = random_signal(11, 5);
        let n = x.len() as f64;
        for family in [TrigFamily::Cosine, TrigFamily::Sine] {
            for ty in [TrigType::I, TrigType::II, TrigType::III, TrigType::IV] {
                let norm = match (family, ty) {
                    (TrigFamily::Cosine, TrigType::I) => (2.0 * (n - 1.0)).sqrt(),
                    (TrigFamily::Sine, TrigType::I) => (2.0 * (n + 1.0)).sqrt(),
                    _ => (2.0 * n).sqrt(),
                };
                let expected: Vec<f64> =
                    reference(&x, family, ty).iter().map(|v| v / norm).collect();
                let got = engine.trig(&x, family, ty).unwrap();
                assert_close(&got, &expected, 1e-10);
            }
        }
    }

    #[test]
    fn test_trig_inverse_pairs() {
        let mut engine = TransformEngine::new();
        let x = random_signal(16, 6);
        for family in [TrigFamily::Cosine, TrigFamily::Sine] {
            for number in 1..=4 {
                let (ty, forward) = TrigType::from_signed(number).unwrap();
                let (same, inverse) = TrigType::from_signed(-number).unwrap();
                assert_eq!(ty, same);
                let y = engine.trig(&x, family, ty.evaluated(forward)).unwrap();
                let back = engine.trig(&y, family, ty.evaluated(inverse)).unwrap();
                assert_close(&back, &x, 1e-9);
            }
        }
    }

    #[test]
    fn test_trig_type_parsing() {
        assert_eq!(
            TrigType::from_signed(-2).unwrap(),
            (TrigType::II, Direction::Inverse)
        );
        assert_eq!(TrigType::II.evaluated(Direction::Inverse), TrigType::III);
        assert_eq!(TrigType::III.evaluated(Direction::Inverse), TrigType::II);
        assert_eq!(TrigType::IV.evaluated(Direction::Inverse), TrigType::IV);
        assert_eq!(
            TrigType::from_signed(3).unwrap(),
            (TrigType::III, Direction::Forward)
        );
        assert!(TrigType::try_from(-2).is_err());
        assert!(TrigType::from_signed(5).is_err());
        assert!(TrigType::from_signed(0).is_err());
    }

    #[test]
    fn test_cosine_type_one_needs_two_samples() {
        let mut engine = TransformEngine::new();
        let err = engine.cosine(&[1.0], TrigType::I).unwrap_err();
        assert!(matches!(err, DspError::InsufficientData { needed: 2, got: 1 }));
        assert_eq!(engine.sine(&[2.0], TrigType::I).unwrap().len(), 1);
    }

    #[test]
    fn test_hilbert_of_cosine_is_sine() {
        let mut engine = TransformEngine::new();
        let n = 128;
        let x: Vec<f64> = (0..n).map(|i| (2.0 * PI * 5.0 * i as f64 / n as f64).cos()).collect();
        let expected: Vec<f64> =
            (0..n).map(|i| (2.0 * PI * 5.0 * i as f64 / n as f64).sin()).collect();

        let analytic = engine.hilbert(&x, Direction::Forward).unwrap();
        assert_close(&analytic.re, &x, 1e-12);
        assert_close(&analytic.im, &expected, 1e-10);
        assert!(analytic.amplitude().iter().all(|a| (a - 1.0).abs() < 1e-10));

        let restored = engine.hilbert(&analytic.im, Direction::Inverse).unwrap();
        assert_close(&restored.re, &x, 1e-10);
    }
}
