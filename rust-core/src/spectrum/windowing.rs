//! Window functions for short-time analysis and resynthesis
//!
//! Windows are DFT-periodic (denominator M rather than M-1) so that hop-shifted
//! copies tile exactly.

use std::f64::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Hann window: w[n] = 0.5 - 0.5*cos(2πn/M)
    /// Overlap-adds to a constant at any hop of M/2 or finer
    #[default]
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/M)
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/M) + 0.08*cos(4πn/M)
    Blackman,

    /// Rectangular window (no windowing)
    Rectangular,
}

/// Generate window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (M)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..M-1
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    let m = length as f64;

    match window_type {
        WindowType::Hann => (0..length)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / m).cos())
            .collect(),

        WindowType::Hamming => (0..length)
            .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f64 / m).cos())
            .collect(),

        WindowType::Blackman => (0..length)
            .map(|n| {
                let angle = 2.0 * PI * n as f64 / m;
                0.42 - 0.5 * angle.cos() + 0.08 * (2.0 * angle).cos()
            })
            .collect(),

        WindowType::Rectangular => vec![1.0; length],
    }
}

/// Per-sample overlap-add gain over one hop
///
/// Entry t is Σ_m analysis[t + m·hop] · synthesis[t + m·hop].
pub fn overlap_add_profile(analysis: &[f64], synthesis: &[f64], hop: usize) -> Vec<f64> {
    let len = analysis.len().min(synthesis.len());
    if hop == 0 {
        return Vec::new();
    }

    (0..hop.min(len))
        .map(|t| {
            (t..len)
                .step_by(hop)
                .map(|n| analysis[n] * synthesis[n])
                .sum()
        })
        .collect()
}

/// Mean overlap-add gain of an analysis/synthesis window pair
pub fn overlap_add_gain(analysis: &[f64], synthesis: &[f64], hop: usize) -> f64 {
    let profile = overlap_add_profile(analysis, synthesis, hop);
    if profile.is_empty() {
        return 0.0;
    }
    profile.iter().sum::<f64>() / profile.len() as f64
}

/// Scale a window so that, used for both analysis and synthesis at `hop`,
/// it overlap-adds to unity gain
pub fn scale_for_overlap_add(window: &[f64], hop: usize) -> Vec<f64> {
    let gain = overlap_add_gain(window, window, hop);
    if gain <= 0.0 {
        return window.to_vec();
    }
    let scale = 1.0 / gain.sqrt();
    window.iter().map(|&w| w * scale).collect()
}

/// Amplitude correction factor
///
/// A sinusoid of amplitude A analysed through `window` shows a peak bin
/// amplitude of A / factor.
pub fn window_correction_factor(window: &[f64]) -> f64 {
    let sum: f64 = window.iter().sum();
    window.len() as f64 / sum
}
