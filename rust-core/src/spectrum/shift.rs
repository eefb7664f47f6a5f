//! Spectral pitch/frequency shifting with optional formant preservation
//!
//! Bins are remapped by index: source bin n lands on
//! round(pitch_scale·n + shift_bins) and keeps its amplitude. With formant
//! processing the amplitude is flattened by the source envelope and reshaped
//! by the envelope read at the formant-remapped index.

use super::envelope::CepstralEnvelope;
use super::frame::{FrameWatch, SpecData, SpectralFrame};
use crate::error::{validate_sample_rate, validate_window, Result};

/// Cepstral coefficients kept for formant envelopes
pub const DEFAULT_ENVELOPE_COEFFICIENTS: usize = 30;

/// Parameters of one spectral shift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftParams {
    /// Frequency scale factor (pitch ratio), > 0
    pub pitch_scale: f64,

    /// Linear frequency shift in Hz
    pub shift_hz: f64,

    /// Envelope scale factor; 1 leaves formants moving with the pitch
    pub formant_scale: f64,

    /// Envelope shift in Hz
    pub formant_shift_hz: f64,

    /// Hold formants in place: overrides the formant scale/shift with the
    /// inverse of the pitch scale/shift
    pub lock_formants: bool,
}

impl Default for ShiftParams {
    fn default() -> Self {
        Self {
            pitch_scale: 1.0,
            shift_hz: 0.0,
            formant_scale: 1.0,
            formant_shift_hz: 0.0,
            lock_formants: false,
        }
    }
}

impl ShiftParams {
    /// Pure pitch scaling
    pub fn pitch(scale: f64) -> Self {
        Self {
            pitch_scale: scale,
            ..Self::default()
        }
    }

    /// Pitch scaling by a number of equal-tempered semitones
    pub fn semitones(semitones: f64) -> Self {
        Self::pitch(2f64.powf(semitones / 12.0))
    }

    pub fn with_shift(mut self, shift_hz: f64) -> Self {
        self.shift_hz = shift_hz;
        self
    }

    pub fn with_formants(mut self, scale: f64, shift_hz: f64) -> Self {
        self.formant_scale = scale;
        self.formant_shift_hz = shift_hz;
        self
    }

    pub fn locked(mut self, lock: bool) -> Self {
        self.lock_formants = lock;
        self
    }
}

/// Spectral frame transformer
pub struct SpectralShifter {
    output: SpectralFrame,
    envelope: CepstralEnvelope,
    coefficients: usize,
    window_size: usize,
    sample_rate: f64,
    watch: FrameWatch,
}

impl SpectralShifter {
    /// Create a shifter for frames of a `window_size`-point transform
    pub fn new(window_size: usize, sample_rate: f64) -> Result<Self> {
        validate_window(window_size)?;
        validate_sample_rate(sample_rate)?;

        let shifter = Self {
            output: SpectralFrame::new(window_size),
            envelope: CepstralEnvelope::new(window_size)?,
            coefficients: Self::clamp_coefficients(DEFAULT_ENVELOPE_COEFFICIENTS, window_size),
            window_size,
            sample_rate,
            watch: FrameWatch::new(),
        };

        log::debug!(
            "spectral shifter: window={} sr={} envelope coefficients={}",
            window_size,
            sample_rate,
            shifter.coefficients
        );

        Ok(shifter)
    }

    fn clamp_coefficients(coefficients: usize, window_size: usize) -> usize {
        let max = (window_size / 4).saturating_sub(1).max(1);
        coefficients.clamp(1, max)
    }

    /// Set the cepstral order of the formant envelope (kept below window/4)
    pub fn set_envelope_coefficients(&mut self, coefficients: usize) {
        self.coefficients = Self::clamp_coefficients(coefficients, self.window_size);
    }

    pub fn envelope_coefficients(&self) -> usize {
        self.coefficients
    }

    /// Transform `source` only when it is newer than the last frame this
    /// shifter processed; otherwise return the previous output
    pub fn process(&mut self, source: &SpectralFrame, params: &ShiftParams) -> &SpectralFrame {
        if self.watch.observe(source) {
            self.transform(source.bins(), params);
        }
        &self.output
    }

    /// Remap `bins` into a fresh, zero-filled output frame
    ///
    /// Destination indices outside 0..=N/2 are dropped. When two source bins
    /// land on the same destination, the higher source bin overwrites the
    /// lower one; amplitudes are not summed.
    pub fn transform(&mut self, bins: &[SpecData], params: &ShiftParams) -> &SpectralFrame {
        let last = self.output.num_bins() - 1;
        self.output.clear();

        let (formant_scale, formant_shift_hz) = if params.lock_formants {
            (1.0 / params.pitch_scale, -params.shift_hz)
        } else {
            (params.formant_scale, params.formant_shift_hz)
        };

        let bin_width = self.sample_rate / self.window_size as f64;
        let shift_bins = params.shift_hz / bin_width;
        let formant_shift_bins = formant_shift_hz / bin_width;
        let preserve = formant_scale != 1.0 || formant_shift_bins != 0.0;

        let envelope = if preserve {
            Some(self.envelope.extract(bins, self.coefficients))
        } else {
            None
        };

        let out = self.output.bins_mut();
        for (n, bin) in bins.iter().take(last + 1).enumerate() {
            let k = (params.pitch_scale * n as f64 + shift_bins).round();
            if !(k >= 0.0 && k <= last as f64) {
                continue;
            }

            let mut amp = bin.amp();
            if let Some(env) = envelope {
                let j = (n as f64 / formant_scale - formant_shift_bins).round();
                if j >= 0.0 && j <= last as f64 && env[n] > 0.0 {
                    let target = env[j as usize];
                    if target.is_finite() {
                        amp = amp / env[n] * target;
                    }
                }
            }

            out[k as usize] = SpecData::new(amp, bin.freq() * params.pitch_scale + params.shift_hz);
        }

        self.output.advance();
        &self.output
    }

    /// Most recent output frame
    pub fn frame(&self) -> &SpectralFrame {
        &self.output
    }

    /// Re-derive the bin width for a new sample rate
    pub fn reset(&mut self, sample_rate: f64) {
        if let Err(e) = validate_sample_rate(sample_rate) {
            log::warn!("spectral shifter reset ignored: {}", e);
            return;
        }
        self.sample_rate = sample_rate;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}
