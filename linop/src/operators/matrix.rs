//! Explicit matrices, dense or CSR

use crate::error::{LinopError, Result};
use crate::operator::{LinearOperator, Operator};
use crate::sparse::CsrMatrix;
use linop_core::{DataType, Element, MatrixProperties};
use nalgebra::DMatrix;

/// Storage of an explicit matrix
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Dense(DMatrix<f64>),
    Sparse(CsrMatrix),
}

impl Storage {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Storage::Dense(a) => a.shape(),
            Storage::Sparse(a) => a.shape(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Storage::Sparse(_))
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            Storage::Dense(a) => a.clone(),
            Storage::Sparse(a) => a.to_dense(),
        }
    }

    fn transpose(&self) -> Self {
        match self {
            Storage::Dense(a) => Storage::Dense(a.transpose()),
            Storage::Sparse(a) => Storage::Sparse(a.transpose()),
        }
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Storage::Dense(a) => Storage::Dense(a.map(f)),
            Storage::Sparse(a) => Storage::Sparse(a.map(f)),
        }
    }

    pub(crate) fn scale(&self, alpha: f64) -> Self {
        match self {
            Storage::Dense(a) => Storage::Dense(a * alpha),
            Storage::Sparse(a) => Storage::Sparse(a.scale(alpha)),
        }
    }

    /// Sum of two storages of the same kind; `None` for mixed storage
    pub(crate) fn add(&self, other: &Storage) -> Option<Result<Self>> {
        match (self, other) {
            (Storage::Dense(a), Storage::Dense(b)) => Some(Ok(Storage::Dense(a + b))),
            (Storage::Sparse(a), Storage::Sparse(b)) => Some(a.add(b).map(Storage::Sparse)),
            _ => None,
        }
    }

    /// Product of two explicit matrices; sparse only when both are sparse
    pub(crate) fn matmul(&self, other: &Storage) -> Result<Self> {
        Ok(match (self, other) {
            (Storage::Dense(a), Storage::Dense(b)) => Storage::Dense(a * b),
            (Storage::Sparse(a), Storage::Sparse(b)) => Storage::Sparse(a.matmul_sparse(b)?),
            (Storage::Sparse(a), Storage::Dense(b)) => Storage::Dense(a.matmul(b)?),
            (Storage::Dense(a), Storage::Sparse(b)) => Storage::Dense(b.rmatmul(a)?),
        })
    }
}

/// An operator backed by an explicit array
#[derive(Debug, Clone)]
pub struct Matrix {
    storage: Storage,
}

impl Matrix {
    /// Dense `f64` matrix
    pub fn dense(a: DMatrix<f64>) -> LinearOperator {
        Self::dense_with_dtype(a, DataType::F64)
    }

    /// Dense matrix with a nominal data type; entries are rounded to it
    pub fn dense_with_dtype(a: DMatrix<f64>, dtype: DataType) -> LinearOperator {
        Self::from_storage(Storage::Dense(a), dtype, None)
    }

    /// Dense `f64` matrix from row-major entries
    pub fn from_row_slice(rows: usize, cols: usize, values: &[f64]) -> Result<LinearOperator> {
        Self::from_elements(rows, cols, values)
    }

    /// Dense matrix from row-major entries of any element type; the data
    /// type is taken from `T`
    pub fn from_elements<T: Element>(
        rows: usize,
        cols: usize,
        values: &[T],
    ) -> Result<LinearOperator> {
        if values.len() != rows * cols {
            return Err(LinopError::DimensionMismatch {
                expected: rows * cols,
                got: values.len(),
            });
        }
        let a = DMatrix::from_row_iterator(rows, cols, values.iter().map(|v| v.to_f64()));
        Ok(Self::dense_with_dtype(a, T::data_type()))
    }

    /// Sparse `f64` matrix
    pub fn sparse(a: CsrMatrix) -> LinearOperator {
        Self::sparse_with_dtype(a, DataType::F64)
    }

    pub fn sparse_with_dtype(a: CsrMatrix, dtype: DataType) -> LinearOperator {
        Self::from_storage(Storage::Sparse(a), dtype, None)
    }

    pub(crate) fn from_storage(
        storage: Storage,
        dtype: DataType,
        properties: Option<MatrixProperties>,
    ) -> LinearOperator {
        let storage = if dtype == DataType::F64 {
            storage
        } else {
            storage.map(|v| dtype.cast(v))
        };
        let shape = storage.shape();
        let properties = properties.unwrap_or_else(|| MatrixProperties::for_shape(shape));
        LinearOperator::with_properties(shape, dtype, properties, Matrix { storage })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn is_sparse(&self) -> bool {
        self.storage.is_sparse()
    }

    /// Number of stored entries (all entries for dense storage)
    pub fn nnz(&self) -> usize {
        match &self.storage {
            Storage::Dense(a) => a.len(),
            Storage::Sparse(a) => a.nnz(),
        }
    }
}

impl LinearOperator {
    /// The explicit matrix behind this operator, if it is one
    pub fn as_matrix(&self) -> Option<&Matrix> {
        self.downcast_ref::<Matrix>()
    }
}

impl Operator for Matrix {
    fn name(&self) -> &str {
        "Matrix"
    }

    fn matmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        match &self.storage {
            Storage::Dense(a) => Ok(a * x),
            Storage::Sparse(a) => a.matmul(x),
        }
    }

    fn rmatmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        Some(match &self.storage {
            Storage::Dense(a) => Ok(x * a),
            Storage::Sparse(a) => a.rmatmul(x),
        })
    }

    fn todense(&self, _this: &LinearOperator) -> Result<DMatrix<f64>> {
        Ok(self.storage.to_dense())
    }

    fn transpose(&self, this: &LinearOperator) -> Option<LinearOperator> {
        Some(Matrix::from_storage(
            self.storage.transpose(),
            this.dtype(),
            Some(this.properties().transposed()),
        ))
    }

    fn inverse(&self, this: &LinearOperator) -> Option<Result<LinearOperator>> {
        let Storage::Sparse(a) = &self.storage else {
            return None;
        };

        let inverse = a
            .to_dense()
            .try_inverse()
            .ok_or_else(LinopError::singular)
            .map(|inv| {
                let props = this.properties();
                let inherited = MatrixProperties::new(
                    props.get(linop_core::Property::Symmetric),
                    None,
                    None,
                    props.get(linop_core::Property::PositiveDefinite),
                );
                Matrix::from_storage(
                    Storage::Sparse(CsrMatrix::from_dense(&inv)),
                    this.dtype().inexact(),
                    Some(inherited),
                )
            });
        Some(inverse)
    }

    fn trace(&self, this: &LinearOperator) -> Result<f64> {
        let trace = match &self.storage {
            Storage::Dense(a) => a.trace(),
            Storage::Sparse(a) => a.diagonal().sum(),
        };
        Ok(this.dtype().cast(trace))
    }

    fn symmetrize(&self, this: &LinearOperator) -> Option<Result<LinearOperator>> {
        let sum = match self.storage.add(&self.storage.transpose())? {
            Ok(sum) => sum,
            Err(err) => return Some(Err(err)),
        };
        Some(Ok(Matrix::from_storage(
            sum.scale(0.5),
            this.dtype().inexact(),
            Some(MatrixProperties::new(Some(true), None, None, None)),
        )))
    }

    fn astype(
        &self,
        _this: &LinearOperator,
        dtype: DataType,
        _copy: bool,
    ) -> Option<Result<LinearOperator>> {
        Some(Ok(Matrix::from_storage(self.storage.clone(), dtype, None)))
    }

    fn equals(&self, this: &LinearOperator, other: &LinearOperator) -> bool {
        match other.as_matrix() {
            Some(matrix) => {
                this.shape() == other.shape()
                    && this.dtype() == other.dtype()
                    && self.storage == matrix.storage
            }
            None => false,
        }
    }
}
