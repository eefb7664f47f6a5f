//! Cepstral spectral envelope
//!
//! The log-magnitude half spectrum is mirrored into an even sequence,
//! transformed to the cepstral domain, truncated to its low-quefrency
//! coefficients, transformed back and exponentiated.

use super::fft::{FftEngine, Normalization};
use super::frame::{FrameWatch, SpecData, SpectralFrame};
use crate::error::{validate_window, Result};
use num_complex::Complex;

/// Spectral envelope extractor
pub struct CepstralEnvelope {
    fft: FftEngine,

    /// Even-extended log spectrum, reused as liftered output
    log_spectrum: Vec<f64>,

    /// Cepstral coefficients
    cepstrum: Vec<Complex<f64>>,

    envelope: Vec<f64>,
    watch: FrameWatch,
}

impl CepstralEnvelope {
    /// Create an extractor for frames of a `window_size`-point transform
    pub fn new(window_size: usize) -> Result<Self> {
        validate_window(window_size)?;
        let fft = FftEngine::new(window_size, Normalization::Forward)?;
        let size = fft.size();
        let num_bins = fft.num_bins();

        Ok(Self {
            fft,
            log_spectrum: vec![0.0; size],
            cepstrum: vec![Complex::new(0.0, 0.0); num_bins],
            envelope: vec![0.0; num_bins],
            watch: FrameWatch::new(),
        })
    }

    /// Extract the smoothed magnitude envelope of `bins`
    ///
    /// # Arguments
    /// * `bins` - N/2 + 1 spectral bins; missing bins count as silent
    /// * `coefficients` - number of cepstral coefficients kept; higher orders
    ///   carry harmonic detail and are discarded
    ///
    /// # Returns
    /// Non-negative envelope, one value per bin. Valid until the next call.
    pub fn extract(&mut self, bins: &[SpecData], coefficients: usize) -> &[f64] {
        let size = self.fft.size();
        let half = size / 2;

        for k in 0..=half {
            let amp = bins.get(k).map(SpecData::amp).unwrap_or(0.0);
            // Non-positive amplitudes only arise from rounding; treat as unity
            let log_amp = if amp > 0.0 { amp.ln() } else { 0.0 };
            self.log_spectrum[k] = log_amp;
            if k > 0 && k < half {
                self.log_spectrum[size - k] = log_amp;
            }
        }

        let keep = coefficients.min(self.cepstrum.len());
        let cepstrum = self.fft.forward_real(&self.log_spectrum);
        self.cepstrum[..keep].copy_from_slice(&cepstrum[..keep]);
        self.cepstrum[keep..].fill(Complex::new(0.0, 0.0));

        let smoothed = self.fft.inverse_real(&self.cepstrum);
        for (e, &s) in self.envelope.iter_mut().zip(smoothed.iter()) {
            *e = s.exp();
        }

        &self.envelope
    }

    /// Extract only when `frame` is newer than the last frame seen here;
    /// otherwise return the cached envelope
    pub fn extract_frame(&mut self, frame: &SpectralFrame, coefficients: usize) -> &[f64] {
        if self.watch.observe(frame) {
            self.extract(frame.bins(), coefficients);
        }
        &self.envelope
    }

    /// Most recently extracted envelope
    pub fn envelope(&self) -> &[f64] {
        &self.envelope
    }

    pub fn window_size(&self) -> usize {
        self.fft.size()
    }
}
