//! # lib-dsp
//!
//! Signal processing engine for sampled real and complex sequences.
//!
//! This crate provides the numerical core:
//!
//! - **Transforms**: unitary Fourier (R2C, C2R, C2C), Hartley, cosine and
//!   sine types I–IV, and the Hilbert transform / analytic signal
//! - **Filtering**: windowed-sinc FIR kernel synthesis, convolution and
//!   normalized cross-correlation, moving averages
//! - **Conversion**: linear and logarithmic ADC/DAC models
//! - **Sampling**: Sample-and-Hold and Sample-and-Sum decimation
//! - **Spectral analysis**: generalized Lomb-Scargle periodogram for
//!   uneven samples, and kernel frequency responses
//!
//! [`DspEngine`] ties these together as a stateful session over input,
//! waveform and output buffers. Every module is also usable on its own.

pub mod conversion;
pub mod convolution;
pub mod engine;
pub mod error;
pub mod fft;
pub mod kernel;
pub mod periodogram;
pub mod response;
pub mod sampling;
pub mod transform;
pub mod window;

pub use conversion::{Converter, ConverterSpec, RangeSpec, Scale};
pub use convolution::{ConvolveShift, Convolution, Correlation, Normalization};
pub use engine::{DspEngine, MovingAverageMode, ScopedBuffers};
pub use error::{DspError, DspResult, ErrorKind};
pub use fft::FftEngine;
pub use kernel::{Band, KernelDesigner};
pub use periodogram::{periodogram, Periodogram, ScanConfig, TimeUnit};
pub use transform::{Direction, FourierMode, Spectrum, TransformEngine, TrigFamily, TrigType};
