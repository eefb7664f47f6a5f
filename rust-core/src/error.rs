//! Error types for spectral stream construction
//!
//! Streaming operations themselves never fail; every contract is checked
//! once, when a component is built.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectralError {
    #[error("Transform size must be greater than zero")]
    ZeroTransformSize,

    #[error("Window size must be a power of two (got {0})")]
    WindowNotPowerOfTwo(usize),

    #[error("Window size must be at least 4 samples (got {0})")]
    WindowTooShort(usize),

    #[error("Hop size must be greater than zero")]
    ZeroHopSize,

    #[error("Hop size {hop} does not evenly divide window size {window}")]
    HopDoesNotDivideWindow { window: usize, hop: usize },

    #[error("Sample rate must be positive and finite (got {0})")]
    InvalidSampleRate(f64),

    #[error("Output block size must be greater than zero")]
    ZeroBlockSize,

    #[error("Expected a window of {expected} samples, got {got}")]
    WindowSizeMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, SpectralError>;

/// Checks the window/hop/rate triple shared by every streaming component.
pub(crate) fn validate_stream(window_size: usize, hop_size: usize, sample_rate: f64) -> Result<()> {
    validate_window(window_size)?;
    if hop_size == 0 {
        return Err(SpectralError::ZeroHopSize);
    }
    if window_size % hop_size != 0 {
        return Err(SpectralError::HopDoesNotDivideWindow {
            window: window_size,
            hop: hop_size,
        });
    }
    validate_sample_rate(sample_rate)
}

pub(crate) fn validate_window(window_size: usize) -> Result<()> {
    if window_size < 4 {
        return Err(SpectralError::WindowTooShort(window_size));
    }
    if !window_size.is_power_of_two() {
        return Err(SpectralError::WindowNotPowerOfTwo(window_size));
    }
    Ok(())
}

pub(crate) fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(SpectralError::InvalidSampleRate(sample_rate))
    }
}
