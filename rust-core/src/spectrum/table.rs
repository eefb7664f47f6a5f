//! Spectral tables and table playback
//!
//! A [`SpecTable`] stores the analysis of a whole recording, one frame per
//! hop. A [`SpecPlayer`] reads it back at any speed and pitch, looping over a
//! region of the table.

use super::analysis::StreamAnalyzer;
use super::frame::SpectralFrame;
use super::shift::{ShiftParams, SpectralShifter};
use crate::error::{Result, SpectralError};

/// Base frequency of an unpitched table: middle C
pub const DEFAULT_BASE_FREQ: f64 = 261.0;

/// Analysed recording
#[derive(Debug, Clone)]
pub struct SpecTable {
    frames: Vec<SpectralFrame>,
    window_size: usize,
    hop_size: usize,
    sample_rate: f64,
}

impl SpecTable {
    /// Analyse `signal` hop by hop
    ///
    /// A trailing partial hop is zero-padded and stored as the last frame, so
    /// the table holds ceil(len / hop_size) frames.
    pub fn analyze(window: &[f64], hop_size: usize, sample_rate: f64, signal: &[f64]) -> Result<Self> {
        let mut analyzer = StreamAnalyzer::new(window, hop_size, sample_rate)?;
        let mut frames = Vec::with_capacity((signal.len() + hop_size - 1) / hop_size);
        let mut hop = vec![0.0; hop_size];

        for chunk in signal.chunks(hop_size) {
            hop[..chunk.len()].copy_from_slice(chunk);
            hop[chunk.len()..].fill(0.0);
            frames.push(analyzer.analyze(&hop).clone());
        }

        log::debug!(
            "spectral table: {} samples -> {} frames (window={} hop={})",
            signal.len(),
            frames.len(),
            window.len(),
            hop_size
        );

        Ok(Self {
            frames,
            window_size: window.len(),
            hop_size,
            sample_rate,
        })
    }

    pub fn frames(&self) -> &[SpectralFrame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&SpectralFrame> {
        self.frames.get(index)
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Playback duration in seconds at the analysis rate
    pub fn duration(&self) -> f64 {
        (self.frames.len() * self.hop_size) as f64 / self.sample_rate
    }

    /// Mean amplitude of every bin over the whole table
    pub fn average_amplitudes(&self) -> Vec<f64> {
        let mut average = vec![0.0; self.window_size / 2 + 1];
        if self.frames.is_empty() {
            return average;
        }
        let count = self.frames.len() as f64;
        for frame in &self.frames {
            for (avg, amp) in average.iter_mut().zip(frame.amplitudes()) {
                *avg += amp / count;
            }
        }
        average
    }

    /// Drop every frame
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Pitch- and time-scaling table player
pub struct SpecPlayer {
    shifter: SpectralShifter,
    silence: SpectralFrame,
    window_size: usize,

    /// Fractional read position in frames
    position: f64,

    shift_hz: f64,
    formant_scale: f64,
    base_freq: f64,
    fine_tune: f64,
    time_scale: f64,

    /// Loop points and start point, as fractions of the table
    loop_begin: f64,
    loop_end: f64,
    start: f64,

    keep_formants: bool,
}

impl SpecPlayer {
    pub fn new(window_size: usize, sample_rate: f64) -> Result<Self> {
        Ok(Self {
            shifter: SpectralShifter::new(window_size, sample_rate)?,
            silence: SpectralFrame::new(window_size),
            window_size,
            position: 0.0,
            shift_hz: 0.0,
            formant_scale: 1.0,
            base_freq: DEFAULT_BASE_FREQ,
            fine_tune: 1.0,
            time_scale: 1.0,
            loop_begin: 0.0,
            loop_end: 1.0,
            start: 0.0,
            keep_formants: false,
        })
    }

    /// Check that `table` was analysed with this player's window size
    pub fn check_table(&self, table: &SpecTable) -> Result<()> {
        if table.window_size() != self.window_size {
            return Err(SpectralError::WindowSizeMismatch {
                expected: self.window_size,
                got: table.window_size(),
            });
        }
        Ok(())
    }

    /// Produce the next frame of `table` played at `cps` Hz
    ///
    /// The table's recorded pitch is taken to be the base frequency. An empty
    /// or mismatched table yields a silent frame.
    pub fn play(&mut self, table: &SpecTable, cps: f64) -> &SpectralFrame {
        if let Err(e) = self.check_table(table) {
            log::warn!("spectral player: {}", e);
            return &self.silence;
        }
        let size = table.len();
        if size == 0 {
            return &self.silence;
        }

        let index = (self.position.max(0.0) as usize).min(size - 1);
        let params = ShiftParams {
            pitch_scale: cps * self.fine_tune / self.base_freq,
            shift_hz: self.shift_hz,
            formant_scale: self.formant_scale,
            formant_shift_hz: 0.0,
            lock_formants: self.keep_formants,
        };
        self.shifter.transform(table.frames[index].bins(), &params);

        self.advance(size as f64);
        self.shifter.frame()
    }

    fn advance(&mut self, size: f64) {
        self.position += self.time_scale;
        if self.loop_end <= self.loop_begin {
            self.loop_begin = self.loop_end;
        }

        let begin = self.loop_begin * size;
        let end = self.loop_end * size;
        let loop_last = (end - 1.0).max(0.0);

        if !self.position.is_finite() {
            self.position = if self.time_scale >= 0.0 { begin } else { loop_last };
            return;
        }

        if self.time_scale >= 0.0 {
            if self.position >= end {
                self.position = begin;
            }
        } else {
            if self.position < 0.0 {
                self.position = self.position.rem_euclid(size);
            }
            if self.position <= begin {
                self.position = loop_last;
            }
        }
    }

    /// Restart playback from the start point
    pub fn onset(&mut self, table: &SpecTable) {
        self.position = self.start.min(self.loop_end) * table.len() as f64;
    }

    pub fn reset(&mut self, sample_rate: f64) {
        self.shifter.reset(sample_rate);
        self.position = 0.0;
    }

    /// Current read position in frames
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn set_frequency_shift(&mut self, shift_hz: f64) {
        self.shift_hz = shift_hz;
    }

    pub fn set_formant_scale(&mut self, scale: f64) {
        self.formant_scale = scale;
    }

    /// Pitch the table was recorded at, in Hz
    pub fn set_base_frequency(&mut self, freq: f64) {
        self.base_freq = freq;
    }

    pub fn set_fine_tune(&mut self, factor: f64) {
        self.fine_tune = factor;
    }

    /// Frames advanced per call; negative plays backwards
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale;
    }

    pub fn set_loop_begin(&mut self, fraction: f64) {
        self.loop_begin = fraction.clamp(0.0, 1.0);
    }

    pub fn set_loop_end(&mut self, fraction: f64) {
        self.loop_end = fraction.clamp(0.0, 1.0);
    }

    pub fn set_start(&mut self, fraction: f64) {
        self.start = fraction.clamp(0.0, 1.0);
    }

    pub fn set_keep_formants(&mut self, keep: bool) {
        self.keep_formants = keep;
    }

    /// Transformer used for playback, e.g. to tune its envelope order
    pub fn shifter_mut(&mut self) -> &mut SpectralShifter {
        &mut self.shifter
    }
}
