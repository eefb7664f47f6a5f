//! Streaming spectral analysis, transformation and resynthesis

pub mod fft;
pub mod frame;
pub mod windowing;
pub mod analysis;
pub mod envelope;
pub mod shift;
pub mod synthesis;
pub mod table;
pub mod pitch;

pub use fft::{FftEngine, Normalization};
pub use frame::{wrap_phase, FrameWatch, SpecData, SpectralFrame};
pub use windowing::{generate_window, scale_for_overlap_add, WindowType};
pub use analysis::StreamAnalyzer;
pub use envelope::CepstralEnvelope;
pub use shift::{ShiftParams, SpectralShifter};
pub use synthesis::StreamSynthesizer;
pub use table::{SpecPlayer, SpecTable};
pub use pitch::PitchTracker;
