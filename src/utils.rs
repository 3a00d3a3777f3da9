//! utils — conversion helpers for the Python bindings.
//!
//! Everything here is compiled only with `python-bindings` and turns
//! Python array-likes into the owned `ndarray` values the core expects.
#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray1, PyReadonlyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

/// Copy a 2-D array-like of `f64` into an owned matrix.
///
/// Accepts a `numpy.ndarray`, anything with a `to_numpy()` method (pandas
/// `DataFrame`), or a rectangular sequence of float sequences.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw_data: &Bound<'py, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }

    if let Ok(obj) = raw_data.call_method0("to_numpy") {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(frame_ro.as_array().to_owned());
        }
    }

    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 2-D numpy.ndarray, pandas.DataFrame, or nested sequence of float64")
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err("data rows must all have the same length"));
    }
    let nrows = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Copy a 1-D array-like of integer epoch labels.
#[cfg(feature = "python-bindings")]
pub fn extract_labels<'py>(raw_labels: &Bound<'py, PyAny>) -> PyResult<Vec<i64>> {
    if let Ok(arr_ro) = raw_labels.extract::<PyReadonlyArray1<i64>>() {
        return Ok(arr_ro.as_array().to_vec());
    }
    raw_labels
        .extract::<Vec<i64>>()
        .map_err(|_| PyTypeError::new_err("labels must be a 1-D sequence of integers"))
}

/// Row-major nested vectors, the shape returned to Python.
#[cfg(feature = "python-bindings")]
pub fn matrix_to_rows(m: &Array2<f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|r| r.to_vec()).collect()
}
