//! Streaming short-time Fourier analysis
//!
//! Accepts sample chunks of any length and emits one spectral frame per hop.
//! Each bin carries its amplitude and its instantaneous frequency in Hz,
//! estimated from the hop-to-hop phase change.

use super::fft::{FftEngine, Normalization};
use super::frame::{SpecData, SpectralFrame};
use crate::error::{validate_sample_rate, validate_stream, Result};
use std::f64::consts::TAU;

/// Streaming spectral analyzer
///
/// The input is held as `window_size / hop_size` hop buffers written in
/// rotation. When a hop completes, the buffers are windowed with a rotating
/// offset so the newest hop lines up with the tail of the window. The
/// resulting spectrum is circularly shifted by a multiple of the hop, which
/// makes the phase of a bin-centred partial constant from frame to frame:
/// the phase difference is the deviation from the bin centre directly.
pub struct StreamAnalyzer {
    window: Vec<f64>,
    hop_size: usize,

    /// Number of hop buffers (window_size / hop_size)
    overlap: usize,

    /// Hop buffers, one per window phase
    hops: Vec<Vec<f64>>,

    /// Buffer currently being written
    hop_index: usize,

    /// Write position inside the current buffer
    position: usize,

    /// Windowed transform input
    windowed: Vec<f64>,

    /// Phase of every bin in the previous frame
    previous_phase: Vec<f64>,

    fft: FftEngine,
    frame: SpectralFrame,

    sample_rate: f64,

    /// sample_rate / (2π·hop_size)
    hz_per_radian: f64,

    /// sample_rate / window_size
    bin_width: f64,
}

impl StreamAnalyzer {
    /// Create new streaming analyzer
    ///
    /// # Arguments
    /// * `window` - Analysis window; its length is the transform size and
    ///   must be a power of two
    /// * `hop_size` - Samples between frames, must divide the window length
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(window: &[f64], hop_size: usize, sample_rate: f64) -> Result<Self> {
        let window_size = window.len();
        validate_stream(window_size, hop_size, sample_rate)?;

        let overlap = window_size / hop_size;
        let fft = FftEngine::new(window_size, Normalization::Forward)?;
        let num_bins = fft.num_bins();

        log::debug!(
            "stream analyzer: window={} hop={} overlap={} sr={}",
            window_size,
            hop_size,
            overlap,
            sample_rate
        );

        Ok(Self {
            window: window.to_vec(),
            hop_size,
            overlap,
            hops: vec![vec![0.0; hop_size]; overlap],
            hop_index: 0,
            position: 0,
            windowed: vec![0.0; window_size],
            previous_phase: vec![0.0; num_bins],
            fft,
            frame: SpectralFrame::new(window_size),
            sample_rate,
            hz_per_radian: sample_rate / (TAU * hop_size as f64),
            bin_width: sample_rate / window_size as f64,
        })
    }

    /// Feed samples and return the current frame
    ///
    /// Every completed hop produces a new frame, so one call may advance the
    /// frame counter several times or not at all. The returned frame is the
    /// most recent one and is overwritten by the next call.
    pub fn analyze(&mut self, input: &[f64]) -> &SpectralFrame {
        let mut remaining = input;

        while !remaining.is_empty() {
            let take = (self.hop_size - self.position).min(remaining.len());
            let start = self.position;
            self.hops[self.hop_index][start..start + take].copy_from_slice(&remaining[..take]);
            self.position += take;
            remaining = &remaining[take..];

            if self.position == self.hop_size {
                self.process_hop();
                self.position = 0;
                self.hop_index = (self.hop_index + 1) % self.overlap;
            }
        }

        &self.frame
    }

    fn process_hop(&mut self) {
        let n = self.window.len();
        let h = self.hop_size;
        let offset = h * (self.overlap - self.hop_index - 1);

        for (i, w) in self.windowed.iter_mut().enumerate() {
            *w = self.hops[i / h][i % h] * self.window[(i + offset) % n];
        }

        let spectrum = self.fft.forward_real(&self.windowed);
        let last = spectrum.len() - 1;

        for (k, (bin, phase)) in self
            .frame
            .bins_mut()
            .iter_mut()
            .zip(self.previous_phase.iter_mut())
            .enumerate()
        {
            let center = k as f64 * self.bin_width;
            let c = spectrum[k];

            if k == 0 || k == last {
                // DC and Nyquist are real; no phase to track
                *bin = SpecData::new(c.re, center);
                continue;
            }

            *bin = SpecData::from_rect(c);
            *phase = bin.diff(*phase);
            let hz = bin.to_hz(center, self.hz_per_radian);
            bin.set_freq(hz);
        }

        self.frame.advance();
        log::trace!("analysis frame {}", self.frame.frame_count());
    }

    /// Current frame (unchanged since the last completed hop)
    pub fn frame(&self) -> &SpectralFrame {
        &self.frame
    }

    /// Re-derive the rate-dependent constants; buffers are untouched
    pub fn reset(&mut self, sample_rate: f64) {
        if let Err(e) = validate_sample_rate(sample_rate) {
            log::warn!("stream analyzer reset ignored: {}", e);
            return;
        }
        self.sample_rate = sample_rate;
        self.hz_per_radian = sample_rate / (TAU * self.hop_size as f64);
        self.bin_width = sample_rate / self.window.len() as f64;
    }

    /// Drop all buffered input and phase memory; the frame counter keeps
    /// running so downstream watches still see the next frame as new
    pub fn flush(&mut self) {
        for hop in &mut self.hops {
            hop.fill(0.0);
        }
        self.hop_index = 0;
        self.position = 0;
        self.previous_phase.fill(0.0);
        self.frame.clear();
    }

    /// Samples still needed to complete the current hop
    pub fn samples_to_next_hop(&self) -> usize {
        self.hop_size - self.position
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get frequency bins in Hz
    pub fn frequency_bins_hz(&self) -> Vec<f64> {
        (0..self.frame.num_bins())
            .map(|k| self.fft.bin_frequency(k, self.sample_rate))
            .collect()
    }
}
