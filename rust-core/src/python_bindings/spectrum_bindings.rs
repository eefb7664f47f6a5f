//! Python bindings for streaming spectral analysis

use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::prelude::*;

use crate::spectrum::{generate_window, StreamAnalyzer, WindowType};

/// Window type enum exposed to Python
#[pyclass(name = "WindowType")]
#[derive(Clone)]
pub enum PyWindowType {
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl From<PyWindowType> for WindowType {
    fn from(py_win: PyWindowType) -> Self {
        match py_win {
            PyWindowType::Hann => WindowType::Hann,
            PyWindowType::Hamming => WindowType::Hamming,
            PyWindowType::Blackman => WindowType::Blackman,
            PyWindowType::Rectangular => WindowType::Rectangular,
        }
    }
}

/// Streaming analyzer exposed to Python
#[pyclass(name = "StreamAnalyzer")]
pub struct PyStreamAnalyzer {
    analyzer: StreamAnalyzer,
}

#[pymethods]
impl PyStreamAnalyzer {
    /// Create a new streaming analyzer
    ///
    /// Args:
    ///     window_size: Transform size (power of two)
    ///     hop_size: Samples between frames (must divide window_size)
    ///     sample_rate: Sample rate in Hz
    ///     window_type: Analysis window shape
    #[new]
    #[pyo3(signature = (window_size=1024, hop_size=256, sample_rate=44100.0, window_type=PyWindowType::Hann))]
    fn new(
        window_size: usize,
        hop_size: usize,
        sample_rate: f64,
        window_type: PyWindowType,
    ) -> PyResult<Self> {
        let window = generate_window(window_type.into(), window_size);
        Ok(Self {
            analyzer: StreamAnalyzer::new(&window, hop_size, sample_rate)?,
        })
    }

    /// Feed samples and return the latest frame
    ///
    /// Args:
    ///     signal: Input samples as numpy array, any length
    ///
    /// Returns:
    ///     Tuple of (amplitudes, frequencies_hz) numpy arrays
    fn analyze<'py>(
        &mut self,
        py: Python<'py>,
        signal: PyReadonlyArray1<f64>,
    ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let frame = self.analyzer.analyze(signal.as_slice()?);
        let amps: Vec<f64> = frame.bins().iter().map(|b| b.amp()).collect();
        let freqs: Vec<f64> = frame.bins().iter().map(|b| b.freq()).collect();

        Ok((PyArray1::from_vec(py, amps), PyArray1::from_vec(py, freqs)))
    }

    /// Number of frames produced so far
    fn frame_count(&self) -> u64 {
        self.analyzer.frame().frame_count()
    }

    /// Get bin centre frequencies in Hz
    fn frequency_bins_hz<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray1<f64>> {
        Ok(PyArray1::from_vec(py, self.analyzer.frequency_bins_hz()))
    }

    /// Change the sample rate
    fn reset(&mut self, sample_rate: f64) {
        self.analyzer.reset(sample_rate);
    }

    fn get_sample_rate(&self) -> f64 {
        self.analyzer.sample_rate()
    }

    fn get_window_size(&self) -> usize {
        self.analyzer.window_size()
    }
}
