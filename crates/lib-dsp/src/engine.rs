//! Stateful DSP session.
//!
//! A [`DspEngine`] owns three buffer sets: the primary input (real and
//! optional imaginary parts), the waveform/kernel, and the output of the
//! most recent transform. All data is copied in and out; the caller never
//! shares storage with the engine.
//!
//! # Threading
//!
//! One engine serves one sample stream. It is `Send` but all operations
//! take `&mut self`, so a single instance is never used concurrently.
//! Independent streams should each get their own engine.
//!
//! # Nested use
//!
//! Operations built from other operations (every filter is "set the kernel
//! as waveform, then convolve") run inside a [`ScopedBuffers`] guard. The
//! guard snapshots all caller-visible state and restores it when dropped,
//! so nested calls never disturb what the caller loaded, even on early
//! return through `?`.

use crate::conversion::Converter;
use crate::convolution::{self, ConvolveShift, Convolution, Correlation, CorrelationPeak, Normalization};
use crate::error::{DspError, DspResult};
use crate::kernel::{Band, KernelDesigner};
use crate::response::{self, ResponseOptions};
use crate::sampling::{self, HoldPoint};
use crate::transform::{Direction, FourierMode, Spectrum, TransformEngine, TrigFamily, TrigType};
use lib_types::curve::Curve;
use lib_types::selector::{AxisDomain, BufferKind, DataSelector, PlotSelection, Side};
use lib_types::units::{Hertz, Seconds};
use std::ops::{Deref, DerefMut, RangeInclusive};
use std::str::FromStr;

/// Moving-average evaluation strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MovingAverageMode {
    /// Convolve with `n` taps of `1/n`, truncated to the input length.
    #[default]
    Convolution,
    /// Running sum over the `nx - n + 1` fully immersed positions.
    Recursion,
}

impl FromStr for MovingAverageMode {
    type Err = DspError;

    fn from_str(s: &str) -> DspResult<Self> {
        match s.trim() {
            "conv" => Ok(Self::Convolution),
            "rec" => Ok(Self::Recursion),
            other => Err(DspError::invalid("mode", format!("expected `conv` or `rec`, got `{}`", other))),
        }
    }
}

/// The transform that produced the current output buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformKind {
    Fourier(FourierMode),
    Hartley(Direction),
    /// Requested type and direction; an inverse evaluates the inverse type.
    Trig(TrigFamily, TrigType, Direction),
    Hilbert(Direction),
}

impl TransformKind {
    /// Whether the input buffers hold the frequency-domain side.
    fn input_is_spectrum(self) -> bool {
        match self {
            Self::Fourier(mode) => mode.is_inverse(),
            Self::Hartley(direction) | Self::Trig(_, _, direction) => direction == Direction::Inverse,
            Self::Hilbert(_) => false,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Buffers {
    fs: Hertz,
    re_in: Vec<f64>,
    im_in: Vec<f64>,
    waveform: Vec<f64>,
    re_out: Vec<f64>,
    im_out: Vec<f64>,
    binned: Vec<f64>,
    last: Option<TransformKind>,
}

impl Buffers {
    fn clear_output(&mut self) {
        self.re_out.clear();
        self.im_out.clear();
        self.last = None;
    }
}

/// A single-stream DSP session.
#[derive(Default)]
pub struct DspEngine {
    buffers: Buffers,
    transforms: TransformEngine,
    designer: KernelDesigner,
}

impl DspEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a non-default kernel designer for the filter entry points.
    pub fn with_designer(mut self, designer: KernelDesigner) -> Self {
        self.designer = designer;
        self
    }

    pub fn designer(&self) -> &KernelDesigner {
        &self.designer
    }

    pub fn set_sampling_frequency(&mut self, fs: Hertz) {
        self.buffers.fs = fs;
    }

    pub fn sampling_frequency(&self) -> Hertz {
        self.buffers.fs
    }

    fn update_fs(&mut self, fs: Option<Hertz>) {
        if let Some(fs) = fs {
            self.buffers.fs = fs;
        }
    }

    /// Replace the input buffers and clear all transform output.
    ///
    /// With an imaginary part, the shorter of the two lengths is used.
    pub fn load(&mut self, re: &[f64], im: Option<&[f64]>, fs: Option<Hertz>) {
        self.load_with(re, im, fs, false);
    }

    /// Like [`DspEngine::load`], optionally keeping the transform output.
    pub fn load_with(&mut self, re: &[f64], im: Option<&[f64]>, fs: Option<Hertz>, keep_output: bool) {
        let im = im.filter(|im| !im.is_empty());
        let n = im.map_or(re.len(), |im| re.len().min(im.len()));
        self.buffers.re_in = re[..n].to_vec();
        self.buffers.im_in = im.map_or_else(Vec::new, |im| im[..n].to_vec());
        self.update_fs(fs);
        if !keep_output {
            self.buffers.clear_output();
        }
        tracing::debug!("loaded {} input samples", n);
    }

    /// Replace the waveform/kernel buffer and clear all transform output.
    pub fn set_waveform(&mut self, h: &[f64], fs: Option<Hertz>) {
        self.buffers.waveform = h.to_vec();
        self.update_fs(fs);
        self.buffers.clear_output();
    }

    /// Move the transform output into the input buffers.
    pub fn load_result(&mut self) {
        let b = &mut self.buffers;
        b.re_in = std::mem::take(&mut b.re_out);
        b.im_in = std::mem::take(&mut b.im_out);
        b.last = None;
    }

    /// Drop all buffers. The sampling frequency is kept.
    pub fn reset(&mut self) {
        let fs = self.buffers.fs;
        self.buffers = Buffers { fs, ..Buffers::default() };
    }

    /// Length of the input or waveform buffer.
    pub fn len(&self, kind: BufferKind) -> usize {
        match kind {
            BufferKind::Input => self.buffers.re_in.len(),
            BufferKind::Waveform => self.buffers.waveform.len(),
        }
    }

    /// Copy of one buffer or a quantity derived from a buffer pair.
    pub fn data(&self, selector: DataSelector) -> Vec<f64> {
        let b = &self.buffers;
        match selector {
            DataSelector::RealIn => b.re_in.clone(),
            DataSelector::ImagIn => b.im_in.clone(),
            DataSelector::RealOut => b.re_out.clone(),
            DataSelector::ImagOut => b.im_out.clone(),
            DataSelector::Binned => b.binned.clone(),
            DataSelector::Waveform => b.waveform.clone(),
            DataSelector::Amplitude(side) => self.derived(side, |re, im| re.hypot(im)),
            DataSelector::PhaseRad(side) => self.derived(side, |re, im| im.atan2(re)),
            DataSelector::PhaseDeg(side) => self.derived(side, |re, im| im.atan2(re).to_degrees()),
        }
    }

    fn side(&self, side: Side) -> (&[f64], &[f64]) {
        match side {
            Side::Input => (&self.buffers.re_in, &self.buffers.im_in),
            Side::Output => (&self.buffers.re_out, &self.buffers.im_out),
        }
    }

    fn derived(&self, side: Side, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
        let (re, im) = self.side(side);
        re.iter()
            .enumerate()
            .map(|(i, &r)| f(r, im.get(i).copied().unwrap_or(0.0)))
            .collect()
    }

    /// The transform that produced the current output, if any.
    pub fn last_transform(&self) -> Option<TransformKind> {
        self.buffers.last
    }

    fn store(&mut self, kind: TransformKind, out: Spectrum) {
        let b = &mut self.buffers;
        if out.is_empty() {
            b.clear_output();
            return;
        }
        b.re_out = out.re;
        b.im_out = out.im;
        b.last = Some(kind);
    }

    pub fn fourier(&mut self, mode: FourierMode) -> DspResult<()> {
        let out = self
            .transforms
            .fourier(&self.buffers.re_in, &self.buffers.im_in, mode)?;
        self.store(TransformKind::Fourier(mode), out);
        Ok(())
    }

    pub fn hartley(&mut self, direction: Direction) -> DspResult<()> {
        let out = self.transforms.hartley(&self.buffers.re_in, direction)?;
        self.store(TransformKind::Hartley(direction), Spectrum::real(out));
        Ok(())
    }

    /// DCT of type `ty`; the inverse direction evaluates the type that
    /// undoes it and treats the input as the spectrum.
    pub fn cosine(&mut self, ty: TrigType, direction: Direction) -> DspResult<()> {
        self.trig(TrigFamily::Cosine, ty, direction)
    }

    pub fn sine(&mut self, ty: TrigType, direction: Direction) -> DspResult<()> {
        self.trig(TrigFamily::Sine, ty, direction)
    }

    fn trig(&mut self, family: TrigFamily, ty: TrigType, direction: Direction) -> DspResult<()> {
        let out = self
            .transforms
            .trig(&self.buffers.re_in, family, ty.evaluated(direction))?;
        self.store(TransformKind::Trig(family, ty, direction), Spectrum::real(out));
        Ok(())
    }

    /// Analytic signal (forward) or reconstruction from a Hilbert transform (inverse).
    pub fn hilbert(&mut self, direction: Direction) -> DspResult<()> {
        let out = self.transforms.hilbert(&self.buffers.re_in, direction)?;
        self.store(TransformKind::Hilbert(direction), out);
        Ok(())
    }

    /// Render the last transform as a curve and keep its y values as the
    /// binned result.
    pub fn render(&mut self, selection: PlotSelection) -> DspResult<Curve> {
        let kind = self
            .buffers
            .last
            .ok_or_else(|| DspError::missing("no transform result to render"))?;
        let fs = self.buffers.fs;
        if selection.axis.needs_sampling_frequency() && !fs.is_set() {
            return Err(DspError::missing(format!(
                "{:?} axis requested without a sampling frequency",
                selection.axis
            )));
        }

        let frequency = selection.axis.is_frequency();
        if frequency && matches!(kind, TransformKind::Hilbert(_)) {
            return Err(DspError::invalid(
                "axis",
                "a Hilbert transform has no frequency-domain side",
            ));
        }
        let side = match kind {
            TransformKind::Hilbert(_) => Side::Output,
            _ if frequency == kind.input_is_spectrum() => Side::Input,
            _ => Side::Output,
        };
        let (re, im) = self.side(side);
        let n = re.len();

        let count = match kind {
            TransformKind::Fourier(_) | TransformKind::Hartley(_) | TransformKind::Trig(..)
                if frequency && !selection.full_range => n / 2 + 1,
            _ => n,
        };

        let axis = |k: usize| -> f64 {
            let fraction = match kind {
                TransformKind::Trig(family, requested, direction) => {
                    let ty = requested.evaluated(direction);
                    let bins = match (family, ty) {
                        (TrigFamily::Cosine, TrigType::I) => n.saturating_sub(1),
                        (TrigFamily::Sine, TrigType::I) => n + 1,
                        _ => n,
                    };
                    let offset = match ty {
                        TrigType::III | TrigType::IV => 0.5,
                        _ => 0.0,
                    };
                    (k as f64 + offset) / (2.0 * bins.max(1) as f64)
                }
                _ => k as f64 / n as f64,
            };
            match selection.axis {
                AxisDomain::Index | AxisDomain::SampleNumber => k as f64,
                AxisDomain::Fraction => fraction,
                AxisDomain::Hertz => fraction * fs.0,
                AxisDomain::Seconds => k as f64 / fs.0,
            }
        };

        let mut curve = Curve::with_capacity(selection.axis, selection.value, count);
        for k in 0..count {
            let y = selection.value.evaluate(re[k], im.get(k).copied().unwrap_or(0.0));
            curve.push(axis(k), y);
        }
        self.buffers.binned = curve.y.clone();
        Ok(curve)
    }

    /// Convolve the input with the waveform.
    pub fn convolve(&mut self, shift: ConvolveShift) -> DspResult<Convolution> {
        convolution::convolve(&self.buffers.re_in, &self.buffers.waveform, shift)
    }

    /// Correlate the input with the waveform.
    pub fn correlate(&mut self, norm: Normalization) -> DspResult<Correlation> {
        convolution::correlate(&self.buffers.re_in, &self.buffers.waveform, norm)
    }

    /// Lag of maximum correlation, with the lag in seconds when the
    /// sampling frequency is known.
    pub fn correlation_peak(
        &mut self,
        norm: Normalization,
    ) -> DspResult<Option<(CorrelationPeak, Option<Seconds>)>> {
        let fs = self.buffers.fs;
        let c = self.correlate(norm)?;
        Ok(c.peak().map(|p| (p, p.lag_seconds(fs))))
    }

    /// Snapshot all caller-visible buffers; they are restored when the
    /// returned guard is dropped.
    pub fn scoped(&mut self) -> ScopedBuffers<'_> {
        ScopedBuffers {
            saved: Some(self.buffers.clone()),
            engine: self,
        }
    }

    /// Convolve the input with `kernel` without disturbing engine state.
    pub fn filter_with(&mut self, kernel: &[f64]) -> DspResult<Convolution> {
        if self.buffers.re_in.is_empty() {
            return Err(DspError::missing("no input data loaded"));
        }
        let mut scope = self.scoped();
        scope.set_waveform(kernel, None);
        scope.convolve(ConvolveShift::Truncated)
    }

    pub fn filter_moving_average(&mut self, n: usize, mode: MovingAverageMode) -> DspResult<Convolution> {
        let x = &self.buffers.re_in;
        if x.is_empty() {
            return Err(DspError::missing("no input data loaded"));
        }
        if n < 1 || n > x.len() {
            return Err(DspError::invalid(
                "n",
                format!("must lie in [1, {}], got {}", x.len(), n),
            ));
        }
        match mode {
            MovingAverageMode::Convolution => {
                let kernel = self.designer.moving_average(n)?;
                self.filter_with(&kernel)
            }
            MovingAverageMode::Recursion => {
                let scale = 1.0 / n as f64;
                let mut samples = Vec::with_capacity(x.len() - n + 1);
                let mut y: f64 = x[..n].iter().sum::<f64>() * scale;
                samples.push(y);
                for k in 1..=x.len() - n {
                    y += (x[k + n - 1] - x[k - 1]) * scale;
                    samples.push(y);
                }
                Ok(Convolution {
                    i1: 0,
                    i2: samples.len() - 1,
                    samples,
                    shift: ConvolveShift::None,
                    kernel_len: n,
                })
            }
        }
    }

    pub fn filter_low_pass(&mut self, fcut: f64, n: usize) -> DspResult<Convolution> {
        let kernel = self.designer.low_pass(fcut, n)?;
        self.filter_with(&kernel)
    }

    pub fn filter_high_pass(&mut self, fcut: f64, n: usize) -> DspResult<Convolution> {
        let kernel = self.designer.high_pass(fcut, n)?;
        self.filter_with(&kernel)
    }

    pub fn filter_band_pass(&mut self, f1: f64, f2: f64, n: usize) -> DspResult<Convolution> {
        let kernel = self.designer.band_pass(f1, f2, n)?;
        self.filter_with(&kernel)
    }

    pub fn filter_band_reject(&mut self, f1: f64, f2: f64, n: usize) -> DspResult<Convolution> {
        let kernel = self.designer.band_reject(f1, f2, n)?;
        self.filter_with(&kernel)
    }

    pub fn filter_multi_band(&mut self, bands: &[Band], n: usize) -> DspResult<Convolution> {
        let kernel = self.designer.multi_band(bands, n)?;
        self.filter_with(&kernel)
    }

    /// Frequency response of `h` using this engine's sampling frequency.
    pub fn response(&mut self, h: &[f64], options: ResponseOptions) -> DspResult<Curve> {
        let fs = self.buffers.fs;
        let curve = response::frequency_response(&mut self.transforms, h, options, fs)?;
        self.buffers.binned = curve.y.clone();
        Ok(curve)
    }

    /// Digitize the waveform buffer.
    pub fn adc(&self, converter: &Converter) -> DspResult<Vec<i64>> {
        converter.adc(&self.buffers.waveform)
    }

    /// Pass the waveform buffer through ADC and DAC.
    pub fn transmit(&self, converter: &Converter, pedestals: Option<&[i64]>) -> DspResult<Vec<f64>> {
        converter.transmit(&self.buffers.waveform, pedestals)
    }

    /// Sample-and-Hold over the waveform buffer.
    pub fn sample_and_hold(
        &self,
        n: usize,
        at: HoldPoint,
        range: Option<RangeInclusive<usize>>,
    ) -> DspResult<Vec<f64>> {
        sampling::sample_and_hold(&self.buffers.waveform, n, at, range)
    }

    /// Sample-and-Sum over the waveform buffer.
    pub fn sample_and_sum(&self, n: usize, range: Option<RangeInclusive<usize>>) -> DspResult<Vec<f64>> {
        sampling::sample_and_sum(&self.buffers.waveform, n, range)
    }
}

/// Restores the engine's buffers on drop.
pub struct ScopedBuffers<'a> {
    engine: &'a mut DspEngine,
    saved: Option<Buffers>,
}

impl Deref for ScopedBuffers<'_> {
    type Target = DspEngine;

    fn deref(&self) -> &DspEngine {
        self.engine
    }
}

impl DerefMut for ScopedBuffers<'_> {
    fn deref_mut(&mut self) -> &mut DspEngine {
        self.engine
    }
}

impl Drop for ScopedBuffers<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.engine.buffers = saved;
        }
    }
}
