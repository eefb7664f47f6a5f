//! Streaming overlap-add resynthesis
//!
//! Mirror of [`StreamAnalyzer`](super::analysis::StreamAnalyzer): frequencies
//! are turned back into per-hop phase increments, integrated, inverse
//! transformed, unrotated, windowed and overlap-added.

use super::fft::{FftEngine, Normalization};
use super::frame::{SpecData, SpectralFrame};
use crate::error::{validate_sample_rate, validate_stream, Result, SpectralError};
use num_complex::Complex;
use std::f64::consts::TAU;

/// Streaming spectral resynthesizer
///
/// Holds `window_size / hop_size` output buffers, each one windowed segment
/// long. Their read counters are staggered by one hop; whenever a counter
/// runs off the end of its buffer, that buffer is refilled from the current
/// frame. Frames fed to the analyzer and then here come out exactly one
/// window length later.
pub struct StreamSynthesizer {
    window: Vec<f64>,
    hop_size: usize,
    overlap: usize,

    /// Windowed segments, one per window phase
    buffers: Vec<Vec<f64>>,

    /// Read position inside each buffer
    counters: Vec<usize>,

    /// Running phase per bin
    phases: Vec<f64>,

    spectrum: Vec<Complex<f64>>,
    fft: FftEngine,

    output: Vec<f64>,

    sample_rate: f64,

    /// 2π·hop_size / sample_rate
    radians_per_hz: f64,

    /// sample_rate / window_size
    bin_width: f64,
}

impl StreamSynthesizer {
    /// Create new streaming resynthesizer
    ///
    /// # Arguments
    /// * `window` - Synthesis window; its length is the transform size
    /// * `hop_size` - Samples between frames, must divide the window length
    /// * `sample_rate` - Sample rate in Hz
    /// * `block_size` - Samples produced by each [`synthesize`] call
    ///
    /// [`synthesize`]: StreamSynthesizer::synthesize
    pub fn new(window: &[f64], hop_size: usize, sample_rate: f64, block_size: usize) -> Result<Self> {
        let window_size = window.len();
        validate_stream(window_size, hop_size, sample_rate)?;
        if block_size == 0 {
            return Err(SpectralError::ZeroBlockSize);
        }

        let overlap = window_size / hop_size;
        let fft = FftEngine::new(window_size, Normalization::Forward)?;
        let num_bins = fft.num_bins();

        log::debug!(
            "stream synthesizer: window={} hop={} overlap={} sr={} block={}",
            window_size,
            hop_size,
            overlap,
            sample_rate,
            block_size
        );

        Ok(Self {
            window: window.to_vec(),
            hop_size,
            overlap,
            buffers: vec![vec![0.0; window_size]; overlap],
            counters: Self::initial_counters(window_size, hop_size, overlap),
            phases: vec![0.0; num_bins],
            spectrum: vec![Complex::new(0.0, 0.0); num_bins],
            fft,
            output: vec![0.0; block_size],
            sample_rate,
            radians_per_hz: TAU * hop_size as f64 / sample_rate,
            bin_width: sample_rate / window_size as f64,
        })
    }

    fn initial_counters(window_size: usize, hop_size: usize, overlap: usize) -> Vec<usize> {
        (0..overlap).map(|i| window_size - (i + 1) * hop_size).collect()
    }

    /// Produce one output block from `frame`
    ///
    /// The frame is only read when a buffer falls due for a refill, which
    /// happens once per hop.
    pub fn synthesize(&mut self, frame: &SpectralFrame) -> &[f64] {
        let mut output = std::mem::take(&mut self.output);
        self.synthesize_into(frame.bins(), &mut output);
        self.output = output;
        &self.output
    }

    /// Fill `out` with resynthesized samples, refilling from `bins`
    ///
    /// `bins` should hold window_size/2 + 1 entries; missing bins are silent.
    pub fn synthesize_into(&mut self, bins: &[SpecData], out: &mut [f64]) {
        let n = self.window.len();

        for sample in out.iter_mut() {
            let mut sum = 0.0;
            for (buffer, counter) in self.buffers.iter().zip(self.counters.iter_mut()) {
                sum += buffer[*counter];
                *counter += 1;
            }
            *sample = sum;

            for i in 0..self.overlap {
                if self.counters[i] == n {
                    self.refill(i, bins);
                    self.counters[i] = 0;
                }
            }
        }
    }

    fn refill(&mut self, index: usize, bins: &[SpecData]) {
        let n = self.window.len();
        let last = self.spectrum.len() - 1;

        for (k, (slot, phase)) in self
            .spectrum
            .iter_mut()
            .zip(self.phases.iter_mut())
            .enumerate()
        {
            let mut bin = bins.get(k).copied().unwrap_or_default();

            if k == 0 || k == last {
                *slot = Complex::new(bin.amp(), 0.0);
                continue;
            }

            let increment = bin.from_hz(k as f64 * self.bin_width, self.radians_per_hz);
            bin.set_freq(increment);
            *phase = bin.integrate(*phase);
            *slot = bin.to_rect();
        }

        // Undo the analysis rotation for this window phase
        let rotation = (self.hop_size * (index + 1)) % n;
        let segment = self.fft.inverse_real(&self.spectrum);
        let buffer = &mut self.buffers[index];
        for (t, b) in buffer.iter_mut().enumerate() {
            *b = segment[(t + rotation) % n] * self.window[t];
        }
        log::trace!("synthesis refill of buffer {}", index);
    }

    /// Zero the running phases
    pub fn clear_phases(&mut self) {
        self.phases.fill(0.0);
    }

    /// Re-derive rate-dependent constants; buffers and phases are kept
    pub fn reset(&mut self, sample_rate: f64) {
        if let Err(e) = validate_sample_rate(sample_rate) {
            log::warn!("stream synthesizer reset ignored: {}", e);
            return;
        }
        self.sample_rate = sample_rate;
        self.radians_per_hz = TAU * self.hop_size as f64 / sample_rate;
        self.bin_width = sample_rate / self.window.len() as f64;
    }

    /// Silence all buffers and restart the overlap schedule
    pub fn flush(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        self.counters = Self::initial_counters(self.window.len(), self.hop_size, self.overlap);
        self.clear_phases();
        self.output.fill(0.0);
    }

    /// Samples between an input sample entering the analyzer and leaving here
    pub fn latency(&self) -> usize {
        self.window.len()
    }

    /// Last block returned by [`synthesize`](StreamSynthesizer::synthesize)
    pub fn output(&self) -> &[f64] {
        &self.output
    }

    /// Running phase of every bin
    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn block_size(&self) -> usize {
        self.output.len()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::analysis::StreamAnalyzer;
    use crate::spectrum::frame::wrap_phase;
    use crate::spectrum::windowing::{generate_window, scale_for_overlap_add, WindowType};
    use std::f64::consts::PI;

    const SR: f64 = 44100.0;

    /// Wrapped phase advance per hop of a partial at `freq` Hz
    fn phase_advance(freq: f64, hop_size: usize, sample_rate: f64) -> f64 {
        wrap_phase(TAU * freq * hop_size as f64 / sample_rate)
    }

    fn test_signal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| {
                let t = n as f64 / SR;
                0.5 * (2.0 * PI * 440.0 * t).sin() + 0.25 * (2.0 * PI * 1234.5 * t + 0.3).cos()
            })
            .collect()
    }

    #[test]
    fn test_rejects_zero_block() {
        let window = generate_window(WindowType::Hann, 64);
        assert!(matches!(
            StreamSynthesizer::new(&window, 16, SR, 0),
            Err(SpectralError::ZeroBlockSize)
        ));
    }

    #[test]
    fn test_silent_frames_give_silence() {
        let window = generate_window(WindowType::Hann, 64);
        let mut synth = StreamSynthesizer::new(&window, 16, SR, 16).unwrap();
        let frame = SpectralFrame::new(64);
        for _ in 0..10 {
            assert!(synth.synthesize(&frame).iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_analysis_resynthesis_round_trip() {
        let n = 256;
        let hop = 64;
        let window = scale_for_overlap_add(&generate_window(WindowType::Hann, n), hop);
        let mut analyzer = StreamAnalyzer::new(&window, hop, SR).unwrap();
        let mut synth = StreamSynthesizer::new(&window, hop, SR, hop).unwrap();

        let input = test_signal(hop * 40);
        let mut output = Vec::new();
        for chunk in input.chunks(hop) {
            let frame = analyzer.analyze(chunk);
            output.extend_from_slice(synth.synthesize(frame));
        }

        assert_eq!(synth.latency(), n);
        for t in n..output.len() {
            assert!(
                (output[t] - input[t - n]).abs() < 1e-9,
                "sample {}: {} vs {}",
                t,
                output[t],
                input[t - n]
            );
        }
        // Nothing leaks out before the first window has passed
        assert!(output[..hop].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_rectangular_single_hop_is_delay() {
        let n = 16;
        let window = generate_window(WindowType::Rectangular, n);
        let mut analyzer = StreamAnalyzer::new(&window, n, SR).unwrap();
        let mut synth = StreamSynthesizer::new(&window, n, SR, n).unwrap();

        let input: Vec<f64> = (0..n * 4).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
        let mut output = Vec::new();
        for chunk in input.chunks(n) {
            let frame = analyzer.analyze(chunk);
            output.extend_from_slice(synth.synthesize(frame));
        }

        for t in n..output.len() {
            assert!((output[t] - input[t - n]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_phase_integration_tracks_frequency() {
        let n = 64;
        let hop = 16;
        let window = generate_window(WindowType::Hann, n);
        let mut synth = StreamSynthesizer::new(&window, hop, SR, hop).unwrap();

        // Quarter of a bin above bin 4
        let freq = 4.25 * SR / n as f64;
        let mut frame = SpectralFrame::new(n);
        frame.bins_mut()[4] = SpecData::new(1.0, freq);

        synth.synthesize(&frame);
        let step = phase_advance(freq - 4.0 * SR / n as f64, hop, SR);
        assert!((synth.phases()[4] - step).abs() < 1e-12);

        synth.synthesize(&frame);
        assert!((synth.phases()[4] - wrap_phase(2.0 * step)).abs() < 1e-12);

        synth.clear_phases();
        assert!(synth.phases().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_reset_rederives_rate_constants() {
        let n = 64;
        let hop = 16;
        let window = generate_window(WindowType::Hann, n);
        let mut synth = StreamSynthesizer::new(&window, hop, SR, hop).unwrap();

        let rate = 22050.0;
        synth.reset(rate);
        assert_eq!(synth.sample_rate(), rate);
        synth.reset(0.0);
        assert_eq!(synth.sample_rate(), rate);

        // Quarter of a bin above bin 4 at the new rate
        let mut frame = SpectralFrame::new(n);
        frame.bins_mut()[4] = SpecData::new(1.0, 4.25 * rate / n as f64);
        synth.synthesize(&frame);

        let step = phase_advance(0.25 * rate / n as f64, hop, rate);
        assert!((step - PI / 8.0).abs() < 1e-12);
        assert!((synth.phases()[4] - step).abs() < 1e-12);
    }

    #[test]
    fn test_flush_silences_output() {
        let window = generate_window(WindowType::Hann, 64);
        let mut synth = StreamSynthesizer::new(&window, 16, SR, 16).unwrap();
        let mut frame = SpectralFrame::new(64);
        frame.bins_mut()[3] = SpecData::new(1.0, 3.0 * SR / 64.0);

        for _ in 0..8 {
            synth.synthesize(&frame);
        }
        assert!(synth.output().iter().any(|&s| s != 0.0));

        synth.flush();
        let silent = SpectralFrame::new(64);
        assert!(synth.synthesize(&silent).iter().all(|&s| s == 0.0));
    }
}
