//! Row selection and embedding operators

use crate::error::{LinopError, Result};
use crate::linalg;
use crate::operator::{LinearOperator, Operator};
use linop_core::validation::validate_indices;
use linop_core::DataType;
use nalgebra::DMatrix;

/// Picks rows: `(S x)[i] = x[indices[i]]`
#[derive(Debug, Clone)]
pub struct Selection {
    indices: Vec<usize>,
}

impl Selection {
    /// Selection of `shape.0` out of `shape.1` coordinates
    pub fn new(indices: Vec<usize>, shape: (usize, usize)) -> Result<LinearOperator> {
        Self::with_dtype(indices, shape, DataType::F64)
    }

    pub fn with_dtype(
        indices: Vec<usize>,
        shape: (usize, usize),
        dtype: DataType,
    ) -> Result<LinearOperator> {
        let (k, n) = shape;
        if k > n {
            return Err(LinopError::InvalidArgument(format!(
                "invalid shape {shape:?} for a selection; use an embedding when the output \
                 dimension exceeds the input dimension"
            )));
        }
        if indices.len() != k {
            return Err(LinopError::DimensionMismatch {
                expected: k,
                got: indices.len(),
            });
        }
        validate_indices(&indices, n)?;
        Ok(LinearOperator::new(shape, dtype, Selection { indices }))
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl Operator for Selection {
    fn name(&self) -> &str {
        "Selection"
    }

    fn matmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        Ok(x.select_rows(self.indices.iter()))
    }

    fn todense(&self, this: &LinearOperator) -> Result<DMatrix<f64>> {
        let eye = DMatrix::<f64>::identity(this.ncols(), this.ncols());
        Ok(eye.select_rows(self.indices.iter()))
    }

    fn transpose(&self, this: &LinearOperator) -> Option<LinearOperator> {
        let (k, n) = this.shape();
        Some(LinearOperator::new(
            (n, k),
            this.dtype(),
            Embedding {
                take: (0..k).collect(),
                put: self.indices.clone(),
                fill_value: 0.0,
            },
        ))
    }
}

/// Scatters rows into a filled output:
/// `(E x)[put[i]] = x[take[i]]`, every other entry `fill_value`
///
/// A non-zero `fill_value` makes the map affine. Its transpose is the
/// selection of the placed rows, which drops the fill, so transposing twice
/// does not give back `E`.
#[derive(Debug, Clone)]
pub struct Embedding {
    take: Vec<usize>,
    put: Vec<usize>,
    fill_value: f64,
}

impl Embedding {
    /// Embedding of `shape.1` into `shape.0` coordinates
    pub fn new(
        take: Vec<usize>,
        put: Vec<usize>,
        shape: (usize, usize),
        fill_value: f64,
    ) -> Result<LinearOperator> {
        Self::with_dtype(take, put, shape, fill_value, DataType::F64)
    }

    pub fn with_dtype(
        take: Vec<usize>,
        put: Vec<usize>,
        shape: (usize, usize),
        fill_value: f64,
        dtype: DataType,
    ) -> Result<LinearOperator> {
        let (m, n) = shape;
        if m < n {
            return Err(LinopError::InvalidArgument(format!(
                "invalid shape {shape:?} for an embedding; use a selection when the output \
                 dimension is smaller than the input dimension"
            )));
        }
        if take.len() != put.len() {
            return Err(LinopError::DimensionMismatch {
                expected: take.len(),
                got: put.len(),
            });
        }
        validate_indices(&take, n)?;
        validate_indices(&put, m)?;
        Ok(LinearOperator::new(
            shape,
            dtype,
            Embedding {
                take,
                put,
                fill_value,
            },
        ))
    }

    pub fn take_indices(&self) -> &[usize] {
        &self.take
    }

    pub fn put_indices(&self) -> &[usize] {
        &self.put
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    /// The transpose is a selection only when input coordinate `i` is placed
    /// at `put[i]` for every `i`
    fn transpose_selection(&self, this: &LinearOperator) -> Option<LinearOperator> {
        let (m, n) = this.shape();
        if self.put.len() != n || !self.take.iter().copied().eq(0..n) {
            return None;
        }
        Selection::with_dtype(self.put.clone(), (n, m), this.dtype()).ok()
    }
}

impl Operator for Embedding {
    fn name(&self) -> &str {
        "Embedding"
    }

    fn matmul(&self, this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let mut out = DMatrix::from_element(this.nrows(), x.ncols(), self.fill_value);
        for (&take, &put) in self.take.iter().zip(&self.put) {
            out.row_mut(put).copy_from(&x.row(take));
        }
        Ok(out)
    }

    fn todense(&self, this: &LinearOperator) -> Result<DMatrix<f64>> {
        match self.transpose_selection(this) {
            Some(selection) if self.fill_value == 0.0 => Ok(selection.todense()?.transpose()),
            _ => linalg::todense(this),
        }
    }

    fn transpose(&self, this: &LinearOperator) -> Option<LinearOperator> {
        self.transpose_selection(this)
    }
}
