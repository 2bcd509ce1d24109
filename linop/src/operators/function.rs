//! Matrix-free operators defined by closures
//!
//! ```rust
//! use linop::{broadcast_matvec, LinearOperator};
//! use linop_core::DataType;
//! use nalgebra::DVector;
//!
//! // Cyclic shift, never stored as a matrix
//! let shift = LinearOperator::builder((3, 3), DataType::F64)
//!     .matmul(broadcast_matvec(|v: &DVector<f64>| {
//!         DVector::from_fn(v.len(), |i, _| v[(i + v.len() - 1) % v.len()])
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let y = shift.matvec(&DVector::from_vec(vec![1.0, 2.0, 3.0])).unwrap();
//! assert_eq!(y.as_slice(), &[3.0, 1.0, 2.0]);
//! ```

use crate::error::{LinopError, Result};
use crate::linalg::{self, NormOrd};
use crate::operator::{LinearOperator, Operator};
use linop_core::{DataType, Property};
use nalgebra::{Complex, DMatrix, DVector};
use std::sync::Arc;

type MatFn = Arc<dyn Fn(&DMatrix<f64>) -> Result<DMatrix<f64>> + Send + Sync>;
type Thunk<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// Operator whose behaviour is supplied entirely by closures
#[derive(Clone)]
pub struct FnOperator {
    name: Option<String>,
    matmul: MatFn,
    rmatmul: Option<MatFn>,
    todense: Option<Thunk<DMatrix<f64>>>,
    transpose: Option<Thunk<LinearOperator>>,
    inverse: Option<Thunk<LinearOperator>>,
    rank: Option<Thunk<usize>>,
    eigvals: Option<Thunk<DVector<Complex<f64>>>>,
    cond: Option<Arc<dyn Fn(NormOrd) -> Result<f64> + Send + Sync>>,
    det: Option<Thunk<f64>>,
    logabsdet: Option<Thunk<f64>>,
    trace: Option<Thunk<f64>>,
}

/// Builder for [`FnOperator`]s; only [`OperatorBuilder::matmul`] is required
pub struct OperatorBuilder {
    shape: (usize, usize),
    dtype: DataType,
    name: Option<String>,
    matmul: Option<MatFn>,
    rmatmul: Option<MatFn>,
    todense: Option<Thunk<DMatrix<f64>>>,
    transpose: Option<Thunk<LinearOperator>>,
    inverse: Option<Thunk<LinearOperator>>,
    rank: Option<Thunk<usize>>,
    eigvals: Option<Thunk<DVector<Complex<f64>>>>,
    cond: Option<Arc<dyn Fn(NormOrd) -> Result<f64> + Send + Sync>>,
    det: Option<Thunk<f64>>,
    logabsdet: Option<Thunk<f64>>,
    trace: Option<Thunk<f64>>,
    properties: Vec<(Property, bool)>,
}

impl OperatorBuilder {
    pub fn new(shape: (usize, usize), dtype: DataType) -> Self {
        Self {
            shape,
            dtype,
            name: None,
            matmul: None,
            rmatmul: None,
            todense: None,
            transpose: None,
            inverse: None,
            rank: None,
            eigvals: None,
            cond: None,
            det: None,
            logabsdet: None,
            trace: None,
            properties: Vec::new(),
        }
    }

    /// Name shown by `Display`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `A X` for `X` of shape `cols × K`
    pub fn matmul<F>(mut self, f: F) -> Self
    where
        F: Fn(&DMatrix<f64>) -> Result<DMatrix<f64>> + Send + Sync + 'static,
    {
        self.matmul = Some(Arc::new(f));
        self
    }

    /// `X A` for `X` of shape `K × rows`
    pub fn rmatmul<F>(mut self, f: F) -> Self
    where
        F: Fn(&DMatrix<f64>) -> Result<DMatrix<f64>> + Send + Sync + 'static,
    {
        self.rmatmul = Some(Arc::new(f));
        self
    }

    pub fn todense<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<DMatrix<f64>> + Send + Sync + 'static,
    {
        self.todense = Some(Arc::new(f));
        self
    }

    pub fn transpose<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<LinearOperator> + Send + Sync + 'static,
    {
        self.transpose = Some(Arc::new(f));
        self
    }

    pub fn inverse<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<LinearOperator> + Send + Sync + 'static,
    {
        self.inverse = Some(Arc::new(f));
        self
    }

    pub fn rank<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<usize> + Send + Sync + 'static,
    {
        self.rank = Some(Arc::new(f));
        self
    }

    pub fn eigvals<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<DVector<Complex<f64>>> + Send + Sync + 'static,
    {
        self.eigvals = Some(Arc::new(f));
        self
    }

    pub fn cond<F>(mut self, f: F) -> Self
    where
        F: Fn(NormOrd) -> Result<f64> + Send + Sync + 'static,
    {
        self.cond = Some(Arc::new(f));
        self
    }

    pub fn det<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<f64> + Send + Sync + 'static,
    {
        self.det = Some(Arc::new(f));
        self
    }

    pub fn logabsdet<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<f64> + Send + Sync + 'static,
    {
        self.logabsdet = Some(Arc::new(f));
        self
    }

    pub fn trace<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<f64> + Send + Sync + 'static,
    {
        self.trace = Some(Arc::new(f));
        self
    }

    /// Declare a property flag; checked when the operator is built
    pub fn property(mut self, property: Property, value: bool) -> Self {
        self.properties.push((property, value));
        self
    }

    pub fn build(self) -> Result<LinearOperator> {
        let matmul = self.matmul.ok_or_else(|| {
            LinopError::InvalidArgument("a matrix-free operator needs a matmul closure".into())
        })?;

        let op = LinearOperator::new(
            self.shape,
            self.dtype,
            FnOperator {
                name: self.name,
                matmul,
                rmatmul: self.rmatmul,
                todense: self.todense,
                transpose: self.transpose,
                inverse: self.inverse,
                rank: self.rank,
                eigvals: self.eigvals,
                cond: self.cond,
                det: self.det,
                logabsdet: self.logabsdet,
                trace: self.trace,
            },
        );

        for (property, value) in self.properties {
            op.set_property(property, Some(value))?;
        }
        Ok(op)
    }
}

impl LinearOperator {
    /// Start building a matrix-free operator
    pub fn builder(shape: (usize, usize), dtype: DataType) -> OperatorBuilder {
        OperatorBuilder::new(shape, dtype)
    }
}

impl Operator for FnOperator {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("LinearOperator")
    }

    fn matmul(&self, this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.ncols() == 0 {
            return Ok(DMatrix::zeros(this.nrows(), 0));
        }
        (self.matmul)(x)
    }

    fn rmatmul(&self, this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        let f = self.rmatmul.as_ref()?;
        if x.nrows() == 0 {
            return Some(Ok(DMatrix::zeros(0, this.ncols())));
        }
        Some(f(x))
    }

    fn todense(&self, this: &LinearOperator) -> Result<DMatrix<f64>> {
        match &self.todense {
            Some(f) => f(),
            None => linalg::todense(this),
        }
    }

    fn transpose(&self, _this: &LinearOperator) -> Option<LinearOperator> {
        // A failing transpose closure falls back to the lazy transpose
        self.transpose.as_ref().and_then(|f| f().ok())
    }

    fn inverse(&self, _this: &LinearOperator) -> Option<Result<LinearOperator>> {
        self.inverse.as_ref().map(|f| f())
    }

    fn rank(&self, this: &LinearOperator) -> Result<usize> {
        match &self.rank {
            Some(f) => f(),
            None => linalg::rank(this),
        }
    }

    fn eigvals(&self, this: &LinearOperator) -> Result<DVector<Complex<f64>>> {
        match &self.eigvals {
            Some(f) => f(),
            None => linalg::eigvals(this),
        }
    }

    fn cond(&self, this: &LinearOperator, p: NormOrd) -> Result<f64> {
        match &self.cond {
            Some(f) => f(p),
            None => linalg::cond(this, p),
        }
    }

    fn det(&self, this: &LinearOperator) -> Result<f64> {
        match &self.det {
            Some(f) => f(),
            None => linalg::det(this),
        }
    }

    fn logabsdet(&self, this: &LinearOperator) -> Result<f64> {
        match &self.logabsdet {
            Some(f) => f(),
            None => linalg::logabsdet(this),
        }
    }

    fn trace(&self, this: &LinearOperator) -> Result<f64> {
        match &self.trace {
            Some(f) => f(),
            None => linalg::trace(this),
        }
    }
}

/// Lift a vector map `ℝᴺ → ℝᴹ` to a column-wise matrix product
pub fn broadcast_matvec<F>(
    f: F,
) -> impl Fn(&DMatrix<f64>) -> Result<DMatrix<f64>> + Send + Sync + 'static
where
    F: Fn(&DVector<f64>) -> DVector<f64> + Send + Sync + 'static,
{
    move |x: &DMatrix<f64>| {
        let columns: Vec<DVector<f64>> = x
            .column_iter()
            .map(|column| f(&column.into_owned()))
            .collect();
        stack(&columns, x.ncols())
    }
}

/// Lift a vector map `ℝᴹ → ℝᴺ` to a row-wise product `X A`
pub fn broadcast_rmatvec<F>(
    f: F,
) -> impl Fn(&DMatrix<f64>) -> Result<DMatrix<f64>> + Send + Sync + 'static
where
    F: Fn(&DVector<f64>) -> DVector<f64> + Send + Sync + 'static,
{
    move |x: &DMatrix<f64>| {
        let rows: Vec<DVector<f64>> = x
            .row_iter()
            .map(|row| f(&row.transpose()))
            .collect();
        stack(&rows, x.nrows()).map(|stacked| stacked.transpose())
    }
}

/// Columns of equal length side by side
fn stack(columns: &[DVector<f64>], count: usize) -> Result<DMatrix<f64>> {
    let len = columns.first().map_or(0, |c| c.len());
    if let Some(bad) = columns.iter().find(|c| c.len() != len) {
        return Err(LinopError::DimensionMismatch {
            expected: len,
            got: bad.len(),
        });
    }
    let mut out = DMatrix::zeros(len, count);
    for (j, column) in columns.iter().enumerate() {
        out.set_column(j, column);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn diag(d: Vec<f64>) -> LinearOperator {
        let n = d.len();
        let d = DVector::from_vec(d);
        let dt = d.clone();
        LinearOperator::builder((n, n), DataType::F64)
            .name("Diagonal")
            .matmul(broadcast_matvec(move |v| v.component_mul(&d)))
            .rmatmul(broadcast_rmatvec(move |v| v.component_mul(&dt)))
            .property(Property::Symmetric, true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_matrix_free_application() {
        let d = diag(vec![1.0, 2.0, 3.0]);
        let x = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        assert_eq!(d.matvec(&x).unwrap().as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(d.rmatvec(&x).unwrap().as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(
            d.matmat(&DMatrix::identity(3, 3)).unwrap(),
            DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 2.0, 3.0]))
        );
        assert_eq!(d.to_string(), "<Diagonal with shape=(3, 3) and dtype=f64>");
        assert_eq!(d.is_symmetric(), Some(true));
    }

    #[test]
    fn test_fallbacks_without_closures() {
        let d = diag(vec![1.0, 2.0, 4.0]);
        assert_relative_eq!(d.trace().unwrap(), 7.0);
        assert_relative_eq!(d.det().unwrap(), 8.0, epsilon = 1e-12);
        assert_relative_eq!(d.logabsdet().unwrap(), 8f64.ln(), epsilon = 1e-12);
        assert_eq!(d.rank().unwrap(), 3);
        assert_relative_eq!(d.cond(NormOrd::Two).unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_supplied_closures_override_fallbacks() {
        let op = LinearOperator::builder((2, 2), DataType::F64)
            .matmul(|x| Ok(x * 3.0))
            .trace(|| Ok(6.0))
            .det(|| Ok(9.0))
            .rank(|| Ok(2))
            .transpose(|| Ok(LinearOperator::identity(2, DataType::F64) * 3.0))
            .build()
            .unwrap();
        assert_eq!(op.trace().unwrap(), 6.0);
        assert_eq!(op.det().unwrap(), 9.0);
        assert_eq!(op.rank().unwrap(), 2);
        assert_eq!(op.transpose().todense().unwrap(), DMatrix::identity(2, 2) * 3.0);
    }

    #[test]
    fn test_missing_matmul_is_rejected() {
        let err = LinearOperator::builder((2, 2), DataType::F64).build().unwrap_err();
        assert!(matches!(err, LinopError::InvalidArgument(_)));
    }

    #[test]
    fn test_wrong_output_shape_is_reported() {
        let op = LinearOperator::builder((3, 2), DataType::F64)
            .matmul(broadcast_matvec(|v| v.clone()))
            .build()
            .unwrap();
        let err = op.matvec(&DVector::zeros(2)).unwrap_err();
        assert!(matches!(
            err,
            LinopError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn test_ragged_broadcast_output() {
        let ragged = broadcast_matvec(|v: &DVector<f64>| DVector::zeros(v[0] as usize));
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(ragged(&x).is_err());
    }

    #[test]
    fn test_invalid_property_is_rejected() {
        let err = LinearOperator::builder((2, 3), DataType::F64)
            .matmul(|x| Ok(DMatrix::zeros(2, x.ncols())))
            .property(Property::Symmetric, true)
            .build()
            .unwrap_err();
        assert!(matches!(err, LinopError::InvalidProperty { .. }));
    }
}
