//! moments::series — validated multivariate time series.
//!
//! A [`TimeSeries`] stores samples column-wise (`n` channels × `T` time
//! points). Construction rejects empty input and non-finite samples, so the
//! estimator downstream never has to.
use crate::moments::errors::{MomentError, MomentResult};
use ndarray::{Array2, ArrayView2};

/// Channels × time matrix of finite samples.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    data: Array2<f64>,
}

impl TimeSeries {
    /// Wrap a channels × time matrix.
    ///
    /// # Errors
    /// - [`MomentError::EmptySeries`] for zero channels or zero samples.
    /// - [`MomentError::NonFiniteData`] at the first NaN/±∞ entry.
    pub fn new(data: Array2<f64>) -> MomentResult<Self> {
        let (dims, samples) = data.dim();
        if dims == 0 || samples == 0 {
            return Err(MomentError::EmptySeries { dims, samples });
        }
        if let Some(((row, col), &value)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(MomentError::NonFiniteData { row, col, value });
        }
        Ok(Self { data })
    }

    /// Wrap a time × channels matrix (one sample per row).
    pub fn from_time_major(data: Array2<f64>) -> MomentResult<Self> {
        Self::new(data.reversed_axes().as_standard_layout().into_owned())
    }

    pub fn dims(&self) -> usize {
        self.data.nrows()
    }

    pub fn samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }
}
