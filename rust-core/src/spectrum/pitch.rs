//! Fundamental frequency estimation from spectral peaks
//!
//! Picks local amplitude maxima above a threshold, then searches for the
//! subharmonic of the lowest peak that explains every peak as a harmonic
//! with the least inharmonicity.

use super::frame::{FrameWatch, SpecData, SpectralFrame};

/// Default peak budget, a quarter of the default window
pub const DEFAULT_MAX_PEAKS: usize = 256;

/// Spectral pitch tracker
pub struct PitchTracker {
    /// Peak frequencies of the current frame
    peaks: Vec<f64>,

    /// Inharmonicity score per candidate divisor
    scores: Vec<f64>,

    max_peaks: usize,

    /// Latest estimate in Hz, 0 until something was found
    cps: f64,

    watch: FrameWatch,
}

impl PitchTracker {
    pub fn new(max_peaks: usize) -> Self {
        let max_peaks = max_peaks.max(1);
        Self {
            peaks: Vec::with_capacity(max_peaks),
            scores: vec![0.0; max_peaks],
            max_peaks,
            cps: 0.0,
            watch: FrameWatch::new(),
        }
    }

    /// Estimate the fundamental of `bins`
    ///
    /// # Arguments
    /// * `bins` - analysed half spectrum (frequency field in Hz)
    /// * `threshold` - minimum peak amplitude
    ///
    /// # Returns
    /// The new estimate, or the previous one when no peak clears the threshold
    pub fn estimate(&mut self, bins: &[SpecData], threshold: f64) -> f64 {
        self.find_peaks(bins, threshold);
        let Some(&lowest) = self.peaks.first() else {
            return self.cps;
        };

        let max_divisor = lowest / 20.0;
        let mut best = 0usize;
        let mut pending = false;

        for divisor in 1..=self.max_peaks {
            if divisor as f64 > max_divisor {
                break;
            }
            let fc = lowest / divisor as f64;

            let mut score = 0.0;
            let mut adjacent = false;
            let mut previous = lowest;
            for &peak in &self.peaks {
                let ratio = peak / fc;
                let frac = ratio - ratio.trunc();
                score += frac.min(1.0 - frac) / peak;

                let (t1, t2) = ((previous / fc).round(), (peak / fc).round());
                if t1 != t2 && t2 - t1 < 3.0 {
                    adjacent = true;
                }
                previous = peak;
            }
            self.scores[divisor - 1] = score;

            if divisor == 1 {
                best = 1;
            } else if score < self.scores[best - 1] || (adjacent && pending) {
                if adjacent {
                    best = divisor;
                    pending = false;
                } else {
                    pending = true;
                }
            }
        }

        if best == 0 {
            return self.cps;
        }

        let fc = lowest / best as f64;
        let sum: f64 = self
            .peaks
            .iter()
            .map(|&peak| peak / (peak / fc).round().max(1.0))
            .sum();
        self.cps = sum / self.peaks.len() as f64;

        log::trace!("pitch estimate {:.2} Hz from {} peaks", self.cps, self.peaks.len());
        self.cps
    }

    /// Estimate only when `frame` is new; otherwise return the last estimate
    pub fn track(&mut self, frame: &SpectralFrame, threshold: f64) -> f64 {
        if self.watch.observe(frame) {
            self.estimate(frame.bins(), threshold);
        }
        self.cps
    }

    fn find_peaks(&mut self, bins: &[SpecData], threshold: f64) {
        self.peaks.clear();
        if bins.len() < 3 {
            return;
        }

        let last = bins.len() - 1;
        let mut n = 1;
        while n < last {
            let amp = bins[n].amp();
            if amp > threshold && bins[n - 1].amp() < amp && bins[n + 1].amp() < amp {
                self.peaks.push(bins[n].freq());
                if self.peaks.len() == self.max_peaks {
                    break;
                }
                // A peak's neighbour cannot be a peak
                n += 1;
            }
            n += 1;
        }
    }

    /// Latest estimate in Hz
    pub fn cps(&self) -> f64 {
        self.cps
    }

    /// Peak frequencies found in the last estimated frame
    pub fn peaks(&self) -> &[f64] {
        &self.peaks
    }
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PEAKS)
    }
}
