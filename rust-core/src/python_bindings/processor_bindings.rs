//! Python bindings for the phase vocoder pipeline

use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::prelude::*;

use super::spectrum_bindings::PyWindowType;
use crate::processor::{PhaseVocoder, VocoderConfig};
use crate::spectrum::ShiftParams;

/// Phase vocoder exposed to Python
///
/// The whole analysis/shift/resynthesis loop runs in Rust; Python passes
/// numpy blocks in and gets numpy blocks back.
#[pyclass(name = "PhaseVocoder")]
pub struct PyPhaseVocoder {
    vocoder: PhaseVocoder,
}

#[pymethods]
impl PyPhaseVocoder {
    /// Create a new phase vocoder
    ///
    /// Args:
    ///     window_size: Transform size (power of two)
    ///     hop_size: Samples between frames (must divide window_size)
    ///     sample_rate: Sample rate in Hz
    ///     block_size: Internal processing block size
    ///     window_type: Analysis/synthesis window shape
    #[new]
    #[pyo3(signature = (window_size=1024, hop_size=256, sample_rate=44100.0, block_size=64, window_type=PyWindowType::Hann))]
    fn new(
        window_size: usize,
        hop_size: usize,
        sample_rate: f64,
        block_size: usize,
        window_type: PyWindowType,
    ) -> PyResult<Self> {
        let config = VocoderConfig {
            window_size,
            hop_size,
            sample_rate,
            block_size,
            window_type: window_type.into(),
        };

        Ok(Self {
            vocoder: PhaseVocoder::new(config)?,
        })
    }

    /// Shift a block of samples
    ///
    /// Args:
    ///     signal: Input samples as numpy array, any length
    ///     pitch_scale: Frequency scale factor
    ///     shift_hz: Linear frequency shift in Hz
    ///     formant_scale: Spectral envelope scale factor
    ///     lock_formants: Keep formants in place while shifting
    ///
    /// Returns:
    ///     Output samples, same length as the input
    #[pyo3(signature = (signal, pitch_scale=1.0, shift_hz=0.0, formant_scale=1.0, lock_formants=false))]
    fn process<'py>(
        &mut self,
        py: Python<'py>,
        signal: PyReadonlyArray1<f64>,
        pitch_scale: f64,
        shift_hz: f64,
        formant_scale: f64,
        lock_formants: bool,
    ) -> PyResult<&'py PyArray1<f64>> {
        let params = ShiftParams {
            pitch_scale,
            shift_hz,
            formant_scale,
            formant_shift_hz: 0.0,
            lock_formants,
        };
        let output = self.vocoder.process_buffer(signal.as_slice()?, &params);

        Ok(PyArray1::from_vec(py, output))
    }

    /// Delay between input and output in samples
    fn latency(&self) -> usize {
        self.vocoder.latency()
    }

    /// Change the sample rate
    fn reset(&mut self, sample_rate: f64) {
        self.vocoder.reset(sample_rate);
    }

    /// Drop buffered audio
    fn flush(&mut self) {
        self.vocoder.flush();
    }

    fn get_sample_rate(&self) -> f64 {
        self.vocoder.config().sample_rate
    }
}
