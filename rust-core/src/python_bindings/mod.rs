//! PyO3 bindings for Python integration

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::error::SpectralError;

mod processor_bindings;
mod spectrum_bindings;

impl From<SpectralError> for PyErr {
    fn from(err: SpectralError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}

/// Python module definition
#[pymodule]
fn spectral_vocoder(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<spectrum_bindings::PyStreamAnalyzer>()?;
    m.add_class::<processor_bindings::PyPhaseVocoder>()?;

    m.add_class::<spectrum_bindings::PyWindowType>()?;

    Ok(())
}
