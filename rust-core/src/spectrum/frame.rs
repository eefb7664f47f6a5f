//! Spectral frame model
//!
//! A frame is the polar-form half spectrum of one analysis instant plus a
//! frame counter that downstream stages compare to skip stale work.

use num_complex::Complex;
use std::f64::consts::{PI, TAU};
use std::ops::{Mul, MulAssign};

/// Wrap a phase into (−π, π]
#[inline]
pub fn wrap_phase(phase: f64) -> f64 {
    let wrapped = (phase + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// One spectral bin: amplitude and frequency
///
/// Stored as a complex pair (re = amplitude, im = frequency). The frequency
/// field holds Hz after analysis, and radians while a bin is in transit to
/// or from the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpecData {
    bin: Complex<f64>,
}

impl SpecData {
    pub fn new(amp: f64, freq: f64) -> Self {
        Self {
            bin: Complex::new(amp, freq),
        }
    }

    /// Rectangular to polar: amplitude = |c|, frequency field = arg(c)
    pub fn from_rect(c: Complex<f64>) -> Self {
        Self::new(c.norm(), c.arg())
    }

    /// Polar to rectangular, reading the frequency field as a phase
    pub fn to_rect(&self) -> Complex<f64> {
        Complex::from_polar(self.bin.re, self.bin.im)
    }

    #[inline]
    pub fn amp(&self) -> f64 {
        self.bin.re
    }

    #[inline]
    pub fn freq(&self) -> f64 {
        self.bin.im
    }

    #[inline]
    pub fn set_amp(&mut self, amp: f64) {
        self.bin.re = amp;
    }

    #[inline]
    pub fn set_freq(&mut self, freq: f64) {
        self.bin.im = freq;
    }

    /// Phase difference
    ///
    /// Replaces the stored phase by its wrapped difference from
    /// `previous_phase` and returns the phase that was stored.
    pub fn diff(&mut self, previous_phase: f64) -> f64 {
        let phase = self.bin.im;
        self.bin.im = wrap_phase(phase - previous_phase);
        phase
    }

    /// Phase integration
    ///
    /// Adds `phase` to the stored increment, wraps, and returns the result.
    pub fn integrate(&mut self, phase: f64) -> f64 {
        self.bin.im = wrap_phase(phase + self.bin.im);
        self.bin.im
    }

    /// Radians-per-hop deviation to Hz
    ///
    /// * `center` - bin centre frequency in Hz
    /// * `fac` - sample_rate / (2π·hop_size)
    #[inline]
    pub fn to_hz(&self, center: f64, fac: f64) -> f64 {
        center + self.bin.im * fac
    }

    /// Hz to radians-per-hop deviation
    ///
    /// * `center` - bin centre frequency in Hz
    /// * `fac` - 2π·hop_size / sample_rate
    #[inline]
    pub fn from_hz(&self, center: f64, fac: f64) -> f64 {
        (self.bin.im - center) * fac
    }
}

impl MulAssign<f64> for SpecData {
    fn mul_assign(&mut self, scale: f64) {
        self.bin.re *= scale;
    }
}

impl Mul<f64> for SpecData {
    type Output = SpecData;

    fn mul(mut self, scale: f64) -> SpecData {
        self *= scale;
        self
    }
}

impl Mul<SpecData> for f64 {
    type Output = SpecData;

    fn mul(self, bin: SpecData) -> SpecData {
        bin * self
    }
}

/// Half spectrum (N/2 + 1 bins) with a frame counter
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    bins: Vec<SpecData>,
    count: u64,
}

impl SpectralFrame {
    /// Silent frame for a transform of `window_size` samples
    pub fn new(window_size: usize) -> Self {
        Self {
            bins: vec![SpecData::default(); window_size / 2 + 1],
            count: 0,
        }
    }

    /// Frame built from existing bins, counter at zero
    pub fn from_bins(bins: Vec<SpecData>) -> Self {
        Self { bins, count: 0 }
    }

    /// Transform size this frame describes
    pub fn size(&self) -> usize {
        self.bins.len().saturating_sub(1) * 2
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn bins(&self) -> &[SpecData] {
        &self.bins
    }

    pub fn bins_mut(&mut self) -> &mut [SpecData] {
        &mut self.bins
    }

    /// Number of frames produced into this buffer so far
    pub fn frame_count(&self) -> u64 {
        self.count
    }

    pub(crate) fn advance(&mut self) {
        self.count += 1;
    }

    /// Zero every bin, keeping the counter
    pub fn clear(&mut self) {
        self.bins.fill(SpecData::default());
    }

    /// Amplitude of every bin
    pub fn amplitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.bins.iter().map(SpecData::amp)
    }
}

impl AsRef<[SpecData]> for SpectralFrame {
    fn as_ref(&self) -> &[SpecData] {
        &self.bins
    }
}

/// Last frame counter a consumer acted on
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameWatch {
    last_seen: Option<u64>,
}

impl FrameWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `frame` carries a counter this watch has not seen yet.
    /// Marks it as seen.
    pub fn observe(&mut self, frame: &SpectralFrame) -> bool {
        let count = frame.frame_count();
        let fresh = match self.last_seen {
            Some(last) => count > last,
            None => count > 0,
        };
        if fresh {
            self.last_seen = Some(count);
        }
        fresh
    }

    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }

    pub fn reset(&mut self) {
        self.last_seen = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_phase_range() {
        assert!((wrap_phase(PI) - PI).abs() < 1e-12);
        assert!((wrap_phase(-PI) - PI).abs() < 1e-12);
        assert!((wrap_phase(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_phase(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_phase(0.25) - 0.25).abs() < 1e-12);

        for i in -100..100 {
            let w = wrap_phase(i as f64 * 0.37);
            assert!(w > -PI && w <= PI);
        }
    }

    #[test]
    fn test_amp_scaling_leaves_frequency() {
        let bin = SpecData::new(2.0, 440.0);
        let scaled = 0.5 * bin;
        assert_eq!(scaled.amp(), 1.0);
        assert_eq!(scaled.freq(), 440.0);

        let mut b = bin;
        b *= 3.0;
        assert_eq!(b.amp(), 6.0);
        assert_eq!(b.freq(), 440.0);
    }

    #[test]
    fn test_polar_round_trip() {
        let c = Complex::new(-0.3, 0.4);
        let bin = SpecData::from_rect(c);
        assert!((bin.amp() - 0.5).abs() < 1e-12);
        assert!((bin.to_rect() - c).norm() < 1e-12);
    }

    #[test]
    fn test_diff_and_integrate() {
        let mut bin = SpecData::new(1.0, 3.0);
        let old = bin.diff(-3.0);
        assert_eq!(old, 3.0);
        // 6 rad wraps to 6 - 2π
        assert!((bin.freq() - (6.0 - TAU)).abs() < 1e-12);

        let mut inc = SpecData::new(1.0, 0.5);
        let ph = inc.integrate(PI - 0.25);
        assert!((ph - (0.25 - PI)).abs() < 1e-12);
    }

    #[test]
    fn test_hz_conversion_inverse() {
        let fs = 44100.0;
        let hop = 256.0;
        let to = fs / (TAU * hop);
        let from = TAU * hop / fs;

        let bin = SpecData::new(1.0, 0.7);
        let hz = bin.to_hz(430.0, to);
        let back = SpecData::new(1.0, hz).from_hz(430.0, from);
        assert!((back - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_frame_dimensions() {
        let frame = SpectralFrame::new(1024);
        assert_eq!(frame.num_bins(), 513);
        assert_eq!(frame.size(), 1024);
        assert_eq!(frame.frame_count(), 0);
    }

    #[test]
    fn test_frame_watch() {
        let mut frame = SpectralFrame::new(16);
        let mut watch = FrameWatch::new();

        assert!(!watch.observe(&frame));
        frame.advance();
        assert!(watch.observe(&frame));
        assert!(!watch.observe(&frame));
        frame.advance();
        frame.advance();
        assert!(watch.observe(&frame));
        assert_eq!(watch.last_seen(), Some(3));
    }
}
