//! Spectral Vocoder - Streaming Phase Vocoder Core
//!
//! Short-time Fourier analysis/resynthesis with instantaneous frequency
//! tracking, cepstral envelopes and formant-preserving pitch shifting.
//! Optional Python bindings behind the `python` feature.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![allow(non_local_definitions)]

pub mod error;
pub mod processor;
pub mod spectrum;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use error::{Result, SpectralError};
pub use processor::{PhaseVocoder, VocoderConfig};
pub use spectrum::{
    CepstralEnvelope, PitchTracker, ShiftParams, SpecData, SpecPlayer, SpecTable, SpectralFrame,
    SpectralShifter, StreamAnalyzer, StreamSynthesizer, WindowType,
};
