//! rust_ssa — Stationary Subspace Analysis for multivariate time series.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the SSA solver to Python via the `_rust_ssa` extension module.
//! SSA splits an `n`-channel series into `d` sources whose epoch means and
//! covariances stay constant and `n − d` sources whose moments change.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules: `linalg` (injected linear-algebra
//!   provider), `moments` (epoching and moment estimation), `optimization`
//!   (objective and manifold conjugate gradient), `ssa` (orchestration and
//!   results) and `logging` (progress sinks).
//! - With `python-bindings`, define the `SSA`, `SSAResult` and `StopToken`
//!   classes and register them under `rust_ssa.ssa`.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in the inner modules; this file
//!   performs only FFI glue, input conversion and error mapping.
//! - Data passed from Python is channels × time unless `time_major=True`.
//!
//! Downstream usage
//! ----------------
//! - Rust callers typically use `ssa::prelude::*`:
//!   `Ssa::new().seed(..).optimize(&params, &series, &EpochScheme::Heuristic)`.
//! - The Python packaging layer imports `_rust_ssa` and re-exports its
//!   classes from the `rust_ssa` package.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_ssa_pipeline.rs`; the PyO3 layer is exercised from
//!   Python.

pub mod linalg;
pub mod logging;
pub mod moments;
pub mod optimization;
pub mod ssa;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    moments::{epochs::EpochScheme, series::TimeSeries},
    ssa::{
        cancel::CancellationToken,
        errors::SsaError,
        params::{PrimaryTarget, SsaParameters},
        results::{Decomposition, SolveMethod},
        solver::Ssa,
    },
    utils::{extract_f64_matrix, extract_labels, matrix_to_rows},
};

/// SSA — Python-facing wrapper around [`Ssa`].
///
/// Purpose
/// -------
/// Hold validated parameters and a seeded solver between calls so Python
/// users can fit repeatedly and inspect the latest decomposition.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `SSA(d, restarts=5, use_mean=True, use_covariance=True,
/// ignore_determinacy=False, non_stationary_target=False, seed=None)`.
///
/// Notes
/// -----
/// - `fit` releases the GIL; a `StopToken` obtained beforehand can stop it
///   from another thread between restarts.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_ssa.ssa")]
pub struct SSA {
    inner: Ssa,
    params: SsaParameters,
    last: Option<Decomposition>,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl SSA {
    #[new]
    #[pyo3(
        signature = (
            d,
            restarts = 5,
            use_mean = true,
            use_covariance = true,
            ignore_determinacy = false,
            non_stationary_target = false,
            seed = None,
        ),
        text_signature = "(d, /, restarts=5, use_mean=True, use_covariance=True, \
                          ignore_determinacy=False, non_stationary_target=False, seed=None)"
    )]
    pub fn new(
        d: usize, restarts: usize, use_mean: bool, use_covariance: bool, ignore_determinacy: bool,
        non_stationary_target: bool, seed: Option<u64>,
    ) -> PyResult<Self> {
        let target = if non_stationary_target { PrimaryTarget::NonStationary } else { PrimaryTarget::Stationary };
        let params = SsaParameters::new(d)?
            .with_restarts(restarts)?
            .with_moments(use_mean, use_covariance)?
            .with_ignore_determinacy(ignore_determinacy)
            .with_target(target);
        let mut inner = Ssa::new();
        if let Some(seed) = seed {
            inner.set_seed(seed);
        }
        Ok(SSA { inner, params, last: None })
    }

    /// Fit to `data`; `epochs` and `labels` are mutually exclusive and the
    /// heuristic epoch count is used when both are `None`.
    #[pyo3(
        signature = (data, epochs = None, labels = None, time_major = false),
        text_signature = "(self, data, /, epochs=None, labels=None, time_major=False)"
    )]
    pub fn fit<'py>(
        &mut self, py: Python<'py>, data: &Bound<'py, PyAny>, epochs: Option<usize>,
        labels: Option<&Bound<'py, PyAny>>, time_major: bool,
    ) -> PyResult<SSAResult> {
        let matrix = extract_f64_matrix(data)?;
        let series = match time_major {
            true => TimeSeries::from_time_major(matrix),
            false => TimeSeries::new(matrix),
        }
        .map_err(SsaError::from)?;
        let scheme = match (epochs, labels) {
            (Some(_), Some(_)) => {
                return Err(PyValueError::new_err("pass either epochs or labels, not both"));
            }
            (Some(count), None) => EpochScheme::Equal(count),
            (None, Some(raw)) => EpochScheme::Custom(extract_labels(raw)?),
            (None, None) => EpochScheme::Heuristic,
        };

        let params = self.params;
        let inner = &mut self.inner;
        let decomposition = py.allow_threads(|| inner.optimize(&params, &series, &scheme))?;
        self.last = Some(decomposition.clone());
        Ok(SSAResult { inner: decomposition })
    }

    /// Token whose `cancel()` stops a running `fit` after its current restart.
    pub fn stop_token(&self) -> StopToken {
        StopToken { inner: self.inner.stop_token() }
    }

    pub fn seed(&mut self, seed: u64) {
        self.inner.set_seed(seed);
    }

    #[getter]
    pub fn result(&self) -> PyResult<SSAResult> {
        match &self.last {
            Some(dec) => Ok(SSAResult { inner: dec.clone() }),
            None => Err(PyValueError::new_err("SSA has not been fitted")),
        }
    }
}

/// StopToken — shareable stop request for a running `SSA.fit`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_ssa.ssa")]
#[derive(Clone)]
pub struct StopToken {
    inner: CancellationToken,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl StopToken {
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    #[getter]
    pub fn cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

/// SSAResult — read-only view of a [`Decomposition`].
///
/// Matrices are returned as row-major nested lists. Phase diagnostics are
/// `None` for a phase that did not run.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_ssa.ssa")]
pub struct SSAResult {
    inner: Decomposition,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl SSAResult {
    #[getter]
    pub fn ps(&self) -> Vec<Vec<f64>> {
        matrix_to_rows(&self.inner.ps)
    }

    #[getter]
    pub fn pn(&self) -> Vec<Vec<f64>> {
        matrix_to_rows(&self.inner.pn)
    }

    #[getter]
    pub fn bs(&self) -> Vec<Vec<f64>> {
        matrix_to_rows(&self.inner.bs)
    }

    #[getter]
    pub fn bn(&self) -> Vec<Vec<f64>> {
        matrix_to_rows(&self.inner.bn)
    }

    #[getter]
    pub fn loss_s(&self) -> Option<f64> {
        self.inner.stationary.map(|p| p.loss)
    }

    #[getter]
    pub fn loss_n(&self) -> Option<f64> {
        self.inner.non_stationary.map(|p| p.loss)
    }

    #[getter]
    pub fn iterations_s(&self) -> Option<usize> {
        self.inner.stationary.map(|p| p.iterations)
    }

    #[getter]
    pub fn iterations_n(&self) -> Option<usize> {
        self.inner.non_stationary.map(|p| p.iterations)
    }

    /// χ² p-value of the stationary phase's raw loss.
    #[getter]
    pub fn pvalue_s(&self) -> PyResult<Option<f64>> {
        match self.inner.stationary {
            Some(p) => Ok(Some(p.p_value().map_err(SsaError::from)?)),
            None => Ok(None),
        }
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.stationary.iter().chain(self.inner.non_stationary.iter()).all(|p| p.converged)
    }

    #[getter]
    pub fn cancelled(&self) -> bool {
        self.inner.cancelled
    }

    #[getter]
    pub fn epochs(&self) -> usize {
        self.inner.epochs.count
    }

    #[getter]
    pub fn method(&self) -> &'static str {
        match self.inner.method {
            SolveMethod::Iterative => "iterative",
            SolveMethod::ClosedForm => "closed_form",
            SolveMethod::NonStationaryOnly => "non_stationary_only",
        }
    }

    /// Stationary sources `Ps·X` of channels × time data.
    pub fn stationary_sources<'py>(&self, data: &Bound<'py, PyAny>) -> PyResult<Vec<Vec<f64>>> {
        let x = extract_f64_matrix(data)?;
        let s = self.inner.stationary_sources(x.view()).map_err(SsaError::from)?;
        Ok(matrix_to_rows(&s))
    }

    /// Non-stationary sources `Pn·X` of channels × time data.
    pub fn non_stationary_sources<'py>(&self, data: &Bound<'py, PyAny>) -> PyResult<Vec<Vec<f64>>> {
        let x = extract_f64_matrix(data)?;
        let n = self.inner.non_stationary_sources(x.view()).map_err(SsaError::from)?;
        Ok(matrix_to_rows(&n))
    }
}

/// _rust_ssa — initializer for the `_rust_ssa` Python extension module.
///
/// Creates the `ssa` submodule, attaches it to the parent module and
/// registers it in `sys.modules` as `rust_ssa.ssa` so dotted imports work.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_ssa<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let ssa_mod = PyModule::new(_py, "ssa")?;
    ssa_module(_py, m, &ssa_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("rust_ssa.ssa", ssa_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn ssa_module<'py>(_py: Python, rust_ssa: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<SSA>()?;
    m.add_class::<SSAResult>()?;
    m.add_class::<StopToken>()?;
    rust_ssa.add_submodule(m)?;
    Ok(())
}
