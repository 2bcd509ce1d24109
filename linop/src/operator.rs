//! The [`LinearOperator`] handle and the [`Operator`] behaviour trait
//!
//! A `LinearOperator` is a reference-counted handle to a node holding the
//! operator's shape, data type, property flags, cached derived quantities
//! and its behaviour as a boxed [`Operator`]. Cloning a handle never copies
//! the operator; composite operators share their constituents.
//!
//! ## Application
//!
//! ```rust
//! use linop::{LinearOperator, Matrix};
//! use nalgebra::{DMatrix, DVector};
//!
//! let a = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! let y = a.matvec(&DVector::from_vec(vec![1.0, 0.0, -1.0])).unwrap();
//! assert_eq!(y.as_slice(), &[-2.0, -2.0]);
//!
//! let at = a.transpose();
//! assert_eq!(at.shape(), (3, 2));
//! ```

use crate::error::{LinopError, Result};
use crate::linalg::{self, NormOrd};
use crate::operators::{Inverse, Transposed, TypeCast};
use hashbrown::HashMap;
use linop_core::validation::{normalize_axis, validate_square};
use linop_core::{can_cast, Casting, DataType, MatrixProperties, Property};
use log::trace;
use nalgebra::{Complex, DMatrix, DVector};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Object-safe access to the concrete operator type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Behaviour of a concrete linear operator
///
/// Only [`Operator::matmul`] is required. Every other method has a default
/// that either declines (returns `None`, letting the handle pick a generic
/// strategy) or falls back to a dense computation. `this` is the handle
/// owning the behaviour; it gives access to shape, data type, properties and
/// caches.
///
/// Inputs are validated by the handle before they reach these methods.
pub trait Operator: AsAny + Send + Sync {
    /// Short type name used in `Display`
    fn name(&self) -> &str {
        "LinearOperator"
    }

    /// `A X` for `X` of shape `cols × K`
    fn matmul(&self, this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// `X A` for `X` of shape `K × rows`, if the operator has a native row product
    fn rmatmul(&self, _this: &LinearOperator, _x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        None
    }

    fn todense(&self, this: &LinearOperator) -> Result<DMatrix<f64>> {
        linalg::todense(this)
    }

    /// Structural transpose, if one exists
    fn transpose(&self, _this: &LinearOperator) -> Option<LinearOperator> {
        None
    }

    /// Structural inverse, if one exists
    fn inverse(&self, _this: &LinearOperator) -> Option<Result<LinearOperator>> {
        None
    }

    fn rank(&self, this: &LinearOperator) -> Result<usize> {
        linalg::rank(this)
    }

    fn eigvals(&self, this: &LinearOperator) -> Result<DVector<Complex<f64>>> {
        linalg::eigvals(this)
    }

    fn cond(&self, this: &LinearOperator, p: NormOrd) -> Result<f64> {
        linalg::cond(this, p)
    }

    fn det(&self, this: &LinearOperator) -> Result<f64> {
        linalg::det(this)
    }

    fn logabsdet(&self, this: &LinearOperator) -> Result<f64> {
        linalg::logabsdet(this)
    }

    fn trace(&self, this: &LinearOperator) -> Result<f64> {
        linalg::trace(this)
    }

    /// Lower Cholesky factor, if it can be computed structurally
    fn cholesky(&self, _this: &LinearOperator) -> Option<Result<LinearOperator>> {
        None
    }

    /// `½(A + Aᵀ)`, if it can be formed eagerly
    fn symmetrize(&self, _this: &LinearOperator) -> Option<Result<LinearOperator>> {
        None
    }

    /// Operator-specific cast; the handle has already validated the casting rule
    fn astype(
        &self,
        _this: &LinearOperator,
        _dtype: DataType,
        _copy: bool,
    ) -> Option<Result<LinearOperator>> {
        None
    }

    /// Structural equality with another operator
    fn equals(&self, _this: &LinearOperator, _other: &LinearOperator) -> bool {
        false
    }

    fn describe(&self, this: &LinearOperator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = this.shape();
        write!(
            f,
            "<{} with shape=({rows}, {cols}) and dtype={}>",
            self.name(),
            this.dtype()
        )
    }
}

/// Axis of an operand along which the operator is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Each column is a vector (`A X`)
    Columns,
    /// Each row is a vector (`(A Xᵀ)ᵀ`)
    Rows,
}

impl Axis {
    /// Axis from a possibly negative index (`0`/`-2` for columns, `1`/`-1` for rows)
    pub fn from_index(axis: isize) -> Result<Self> {
        match normalize_axis(axis) {
            Ok(0) => Ok(Axis::Columns),
            Ok(_) => Ok(Axis::Rows),
            Err(_) => Err(LinopError::Axis(format!(
                "axis {axis} is out of bounds for a 2-D operand"
            ))),
        }
    }

    fn index(self) -> usize {
        match self {
            Axis::Columns => 0,
            Axis::Rows => 1,
        }
    }
}

#[derive(Default)]
struct Cache {
    todense: OnceLock<DMatrix<f64>>,
    rank: OnceLock<usize>,
    eigvals: OnceLock<DVector<Complex<f64>>>,
    det: OnceLock<f64>,
    logabsdet: OnceLock<f64>,
    trace: OnceLock<f64>,
    cond: Mutex<HashMap<NormOrd, f64>>,
    cholesky: Mutex<Option<LinearOperator>>,
}

struct Node {
    shape: (usize, usize),
    dtype: DataType,
    properties: Mutex<MatrixProperties>,
    cache: Cache,
    op: Box<dyn Operator>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Return the cached value, or compute and cache it
fn cached<T: Clone>(
    cell: &OnceLock<T>,
    what: &str,
    compute: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if let Some(value) = cell.get() {
        trace!("Cache hit for {what}");
        return Ok(value.clone());
    }
    let value = compute()?;
    Ok(cell.get_or_init(|| value).clone())
}

/// Shared handle to a linear operator
#[derive(Clone)]
pub struct LinearOperator {
    node: Arc<Node>,
}

impl LinearOperator {
    /// Wrap a concrete operator of the given shape and data type
    pub fn new(shape: (usize, usize), dtype: DataType, op: impl Operator + 'static) -> Self {
        Self::with_properties(shape, dtype, MatrixProperties::for_shape(shape), op)
    }

    /// Wrap a concrete operator with known property flags
    ///
    /// Flags that are not admissible for `shape` are reset to the defaults
    /// of the shape.
    pub(crate) fn with_properties(
        shape: (usize, usize),
        dtype: DataType,
        properties: MatrixProperties,
        op: impl Operator + 'static,
    ) -> Self {
        let properties = if properties.is_admissible(shape) {
            properties
        } else {
            MatrixProperties::for_shape(shape)
        };
        Self {
            node: Arc::new(Node {
                shape,
                dtype,
                properties: Mutex::new(properties),
                cache: Cache::default(),
                op: Box::new(op),
            }),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.node.shape
    }

    pub fn nrows(&self) -> usize {
        self.node.shape.0
    }

    pub fn ncols(&self) -> usize {
        self.node.shape.1
    }

    /// Always 2
    pub fn ndim(&self) -> usize {
        2
    }

    pub fn size(&self) -> usize {
        self.nrows() * self.ncols()
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    pub fn dtype(&self) -> DataType {
        self.node.dtype
    }

    /// Downcast the behaviour to a concrete operator type
    pub fn downcast_ref<T: Operator>(&self) -> Option<&T> {
        AsAny::as_any(&*self.node.op).downcast_ref::<T>()
    }

    /// Whether both handles point to the same node
    pub fn ptr_eq(&self, other: &LinearOperator) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub(crate) fn behaviour(&self) -> &dyn Operator {
        &*self.node.op
    }

    pub(crate) fn require_square(&self) -> Result<usize> {
        validate_square(self.shape()).map_err(|_| LinopError::NotSquare(self.shape()))
    }

    // Properties

    pub fn properties(&self) -> MatrixProperties {
        *lock(&self.node.properties)
    }

    pub fn property(&self, property: Property) -> Option<bool> {
        lock(&self.node.properties).get(property)
    }

    /// Record a property flag. Flags can be learned but never changed.
    pub fn set_property(&self, property: Property, value: Option<bool>) -> Result<()> {
        let square = self.is_square();
        lock(&self.node.properties)
            .set(property, value, square)
            .map_err(|err| LinopError::from_property(property, err))
    }

    pub fn is_symmetric(&self) -> Option<bool> {
        self.property(Property::Symmetric)
    }

    pub fn is_lower_triangular(&self) -> Option<bool> {
        self.property(Property::LowerTriangular)
    }

    pub fn is_upper_triangular(&self) -> Option<bool> {
        self.property(Property::UpperTriangular)
    }

    pub fn is_positive_definite(&self) -> Option<bool> {
        self.property(Property::PositiveDefinite)
    }

    // Application

    /// `A X` for `X` of shape `cols × K`
    pub fn matmat(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.nrows() != self.ncols() {
            return Err(LinopError::DimensionMismatch {
                expected: self.ncols(),
                got: x.nrows(),
            });
        }

        let y = self.node.op.matmul(self, x)?;
        check_output(y.shape(), (self.nrows(), x.ncols()))?;
        Ok(y)
    }

    /// `A x`
    pub fn matvec(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        if x.len() != self.ncols() {
            return Err(LinopError::DimensionMismatch {
                expected: self.ncols(),
                got: x.len(),
            });
        }

        let y = self.matmat(&DMatrix::from_column_slice(x.len(), 1, x.as_slice()))?;
        Ok(DVector::from_column_slice(y.as_slice()))
    }

    /// `X A` for `X` of shape `K × rows`
    pub fn rmatmat(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.ncols() != self.nrows() {
            return Err(LinopError::DimensionMismatch {
                expected: self.nrows(),
                got: x.ncols(),
            });
        }

        let y = match self.node.op.rmatmul(self, x) {
            Some(result) => result?,
            None if self.is_symmetric() == Some(true) => self.matmat(&x.transpose())?.transpose(),
            None => self.transpose().matmat(&x.transpose())?.transpose(),
        };
        check_output(y.shape(), (x.nrows(), self.ncols()))?;
        Ok(y)
    }

    /// `xᵀ A`
    pub fn rmatvec(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        if x.len() != self.nrows() {
            return Err(LinopError::DimensionMismatch {
                expected: self.nrows(),
                got: x.len(),
            });
        }

        let y = self.rmatmat(&DMatrix::from_row_slice(1, x.len(), x.as_slice()))?;
        Ok(DVector::from_iterator(y.ncols(), y.iter().copied()))
    }

    /// Apply the operator to every column (`Axis::Columns`) or every row
    /// (`Axis::Rows`) of `x`
    pub fn apply(&self, x: &DMatrix<f64>, axis: Axis) -> Result<DMatrix<f64>> {
        let got = match axis {
            Axis::Columns => x.nrows(),
            Axis::Rows => x.ncols(),
        };
        if got != self.ncols() {
            return Err(LinopError::AxisMismatch {
                axis: axis.index(),
                expected: self.ncols(),
                got,
            });
        }

        match axis {
            Axis::Columns => self.matmat(x),
            Axis::Rows => Ok(self.matmat(&x.transpose())?.transpose()),
        }
    }

    // Dense materialization

    /// Explicit matrix of the operator, cached after the first call
    pub fn todense(&self) -> Result<DMatrix<f64>> {
        cached(&self.node.cache.todense, "todense", || self.todense_uncached())
    }

    /// Explicit matrix of the operator, bypassing the cache
    pub fn todense_uncached(&self) -> Result<DMatrix<f64>> {
        let dense = self.node.op.todense(self)?;
        check_output(dense.shape(), self.shape())?;
        Ok(dense)
    }

    // Derived quantities

    pub fn rank(&self) -> Result<usize> {
        cached(&self.node.cache.rank, "rank", || self.node.op.rank(self))
    }

    /// Eigenvalues of a square operator
    pub fn eigvals(&self) -> Result<DVector<Complex<f64>>> {
        let n = self.require_square()?;
        let values = cached(&self.node.cache.eigvals, "eigvals", || {
            self.node.op.eigvals(self)
        })?;
        if values.len() != n {
            return Err(LinopError::DimensionMismatch {
                expected: n,
                got: values.len(),
            });
        }
        Ok(values)
    }

    /// Condition number of a square operator in the norm `p`
    pub fn cond(&self, p: NormOrd) -> Result<f64> {
        self.require_square()?;
        if let Some(&value) = lock(&self.node.cache.cond).get(&p) {
            trace!("Cache hit for cond({p})");
            return Ok(value);
        }
        let value = self.node.op.cond(self, p)?;
        lock(&self.node.cache.cond).insert(p, value);
        Ok(value)
    }

    pub fn det(&self) -> Result<f64> {
        self.require_square()?;
        cached(&self.node.cache.det, "det", || self.node.op.det(self))
    }

    /// `ln |det A|`, `-∞` for singular operators
    pub fn logabsdet(&self) -> Result<f64> {
        self.require_square()?;
        cached(&self.node.cache.logabsdet, "logabsdet", || {
            self.node.op.logabsdet(self)
        })
    }

    pub fn trace(&self) -> Result<f64> {
        self.require_square()?;
        cached(&self.node.cache.trace, "trace", || self.node.op.trace(self))
    }

    // Decompositions

    /// Cholesky factor of a symmetric positive definite operator
    ///
    /// The lower factor is computed once and cached. Success marks the
    /// operator positive definite; failure marks it not positive definite.
    pub fn cholesky(&self, lower: bool) -> Result<LinearOperator> {
        if self.is_symmetric() != Some(true) {
            return Err(LinopError::LinAlg(
                "The Cholesky decomposition is only defined for symmetric operators".into(),
            ));
        }
        if self.is_positive_definite() == Some(false) {
            return Err(LinopError::LinAlg(
                "The Cholesky decomposition is only defined for positive definite operators"
                    .into(),
            ));
        }

        let factor = {
            let mut slot = lock(&self.node.cache.cholesky);
            match slot.as_ref() {
                Some(factor) => {
                    trace!("Cache hit for cholesky");
                    factor.clone()
                }
                None => {
                    let result = match self.node.op.cholesky(self) {
                        Some(result) => result,
                        None => linalg::cholesky(self),
                    };
                    match result {
                        Ok(factor) => {
                            self.set_property(Property::PositiveDefinite, Some(true))?;
                            *slot = Some(factor.clone());
                            factor
                        }
                        Err(err) => {
                            log::warn!("Cholesky decomposition of {self} failed: {err}");
                            self.set_property(Property::PositiveDefinite, Some(false))?;
                            return Err(err);
                        }
                    }
                }
            }
        };

        if lower {
            Ok(factor)
        } else {
            Ok(factor.transpose())
        }
    }

    // Unary operations

    /// `Aᵀ`, structural when the operator knows its transpose, lazy otherwise
    pub fn transpose(&self) -> LinearOperator {
        match self.node.op.transpose(self) {
            Some(transposed) => transposed,
            None => Transposed::wrap(self),
        }
    }

    /// Alias of [`LinearOperator::transpose`]
    pub fn t(&self) -> LinearOperator {
        self.transpose()
    }

    /// Permute the two axes; `(0, 1)` is the identity permutation
    pub fn transpose_axes(&self, axes: (isize, isize)) -> Result<LinearOperator> {
        let invalid = || LinopError::Axis(format!("axes {axes:?} do not permute (0, 1)"));
        let a = normalize_axis(axes.0).map_err(|_| invalid())?;
        let b = normalize_axis(axes.1).map_err(|_| invalid())?;
        match (a, b) {
            (0, 1) => Ok(self.clone()),
            (1, 0) => Ok(self.transpose()),
            _ => Err(invalid()),
        }
    }

    /// `A⁻¹`, structural when available, lazily factorized otherwise
    pub fn inv(&self) -> Result<LinearOperator> {
        self.require_square()?;
        match self.node.op.inverse(self) {
            Some(inverse) => inverse,
            None => Inverse::wrap(self),
        }
    }

    /// `½(A + Aᵀ)`, flagged symmetric
    pub fn symmetrize(&self) -> Result<LinearOperator> {
        self.require_square()?;
        if self.is_symmetric() == Some(true) {
            return Ok(self.clone());
        }

        let symmetric = match self.node.op.symmetrize(self) {
            Some(result) => result?,
            None => self.add(&self.transpose())?.scale(0.5),
        };
        symmetric.set_property(Property::Symmetric, Some(true))?;
        Ok(symmetric)
    }

    /// Cast to another data type under the given casting rule
    pub fn astype(&self, dtype: DataType, casting: Casting, copy: bool) -> Result<LinearOperator> {
        if !can_cast(self.dtype(), dtype, casting) {
            return Err(LinopError::Cast {
                from: self.dtype(),
                to: dtype,
                casting,
            });
        }

        if dtype == self.dtype() && !copy {
            return Ok(self.clone());
        }

        match self.node.op.astype(self, dtype, copy) {
            Some(result) => result,
            None => Ok(TypeCast::wrap(self, dtype)),
        }
    }
}

fn check_output(got: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if got.0 != expected.0 {
        return Err(LinopError::DimensionMismatch {
            expected: expected.0,
            got: got.0,
        });
    }
    if got.1 != expected.1 {
        return Err(LinopError::DimensionMismatch {
            expected: expected.1,
            got: got.1,
        });
    }
    Ok(())
}

impl fmt::Display for LinearOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.op.describe(self, f)
    }
}

impl fmt::Debug for LinearOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearOperator")
            .field("name", &self.node.op.name())
            .field("shape", &self.shape())
            .field("dtype", &self.dtype())
            .field("properties", &self.properties())
            .finish()
    }
}

impl PartialEq for LinearOperator {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.node.op.equals(self, other)
    }
}
