//! Tapering windows for windowed-sinc kernel synthesis.
//!
//! A truncated sinc has large sidelobes; multiplying it by a window that
//! falls smoothly to zero at both ends trades a wider transition band for
//! much better stop-band attenuation.

use std::f64::consts::PI;

/// Window function types for kernel synthesis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WindowType {
    /// No windowing (rectangular window).
    Rectangular,

    /// Hann (raised cosine) window.
    Hann,

    /// Hamming window - slightly better first sidelobe than Hann.
    Hamming,

    /// Blackman window - about -74 dB stop band, the kernel designer default.
    #[default]
    Blackman,
}

impl WindowType {
    /// Window value at relative position `x ∈ [0, 1]` (0 and 1 are the end taps).
    #[inline]
    pub fn value(self, x: f64) -> f64 {
        match self {
            Self::Rectangular => 1.0,
            Self::Hann => 0.5 * (1.0 - (2.0 * PI * x).cos()),
            Self::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
            Self::Blackman => 0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos(),
        }
    }
}

/// Generate window coefficients for a given window type and length.
///
/// The window is symmetric; a single-point window is `[1.0]`.
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    match length {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let m = (length - 1) as f64;
            (0..length).map(|i| window_type.value(i as f64 / m)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_window() {
        let window = generate_window(WindowType::Rectangular, 10);
        assert_eq!(window.len(), 10);
        assert!(window.iter().all(|&w| (w - 1.0).abs() < 1e-10));
    }

    #[test]
    fn test_hann_window() {
        let window = generate_window(WindowType::Hann, 65);

        // Hann window starts and ends at 0
        assert!(window[0].abs() < 1e-10);
        assert!(window[64].abs() < 1e-10);
        assert!((window[32] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_blackman_endpoints_and_center() {
        let window = generate_window(WindowType::Blackman, 101);
        assert!(window[0].abs() < 1e-12);
        assert!(window[100].abs() < 1e-12);
        assert!((window[50] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_symmetry() {
        for kind in [WindowType::Hann, WindowType::Hamming, WindowType::Blackman] {
            let window = generate_window(kind, 64);
            for i in 0..32 {
                assert!(
                    (window[i] - window[63 - i]).abs() < 1e-10,
                    "Asymmetry in {:?} at index {}: {} vs {}",
                    kind,
                    i,
                    window[i],
                    window[63 - i]
                );
            }
        }
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(generate_window(WindowType::Blackman, 0).is_empty());
        assert_eq!(generate_window(WindowType::Blackman, 1), vec![1.0]);
    }
}
