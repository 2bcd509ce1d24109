//! The identity operator

use crate::error::Result;
use crate::linalg::NormOrd;
use crate::operator::{LinearOperator, Operator};
use linop_core::{DataType, MatrixProperties};
use nalgebra::{Complex, DMatrix, DVector};

/// `I`, square, with every property flag set
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Identity {
    pub fn new(n: usize, dtype: DataType) -> LinearOperator {
        LinearOperator::with_properties(
            (n, n),
            dtype,
            MatrixProperties::new(Some(true), Some(true), Some(true), Some(true)),
            Identity,
        )
    }
}

impl LinearOperator {
    /// `n × n` identity
    pub fn identity(n: usize, dtype: DataType) -> LinearOperator {
        Identity::new(n, dtype)
    }

    pub fn is_identity(&self) -> bool {
        self.downcast_ref::<Identity>().is_some()
    }
}

impl Operator for Identity {
    fn name(&self) -> &str {
        "Identity"
    }

    fn matmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        Ok(x.clone())
    }

    fn rmatmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        Some(Ok(x.clone()))
    }

    fn todense(&self, this: &LinearOperator) -> Result<DMatrix<f64>> {
        Ok(DMatrix::identity(this.nrows(), this.ncols()))
    }

    fn transpose(&self, this: &LinearOperator) -> Option<LinearOperator> {
        Some(this.clone())
    }

    fn inverse(&self, this: &LinearOperator) -> Option<Result<LinearOperator>> {
        Some(Ok(this.clone()))
    }

    fn rank(&self, this: &LinearOperator) -> Result<usize> {
        Ok(this.nrows())
    }

    fn eigvals(&self, this: &LinearOperator) -> Result<DVector<Complex<f64>>> {
        Ok(DVector::from_element(this.nrows(), Complex::new(1.0, 0.0)))
    }

    fn cond(&self, this: &LinearOperator, p: NormOrd) -> Result<f64> {
        Ok(match p {
            NormOrd::Fro => this.nrows() as f64,
            _ => 1.0,
        })
    }

    fn det(&self, _this: &LinearOperator) -> Result<f64> {
        Ok(1.0)
    }

    fn logabsdet(&self, _this: &LinearOperator) -> Result<f64> {
        Ok(0.0)
    }

    fn trace(&self, this: &LinearOperator) -> Result<f64> {
        Ok(this.dtype().cast(this.nrows() as f64))
    }

    fn cholesky(&self, this: &LinearOperator) -> Option<Result<LinearOperator>> {
        // The factor is cached on this node, so it must be a distinct node
        Some(Ok(Identity::new(this.nrows(), this.dtype().inexact())))
    }

    fn astype(
        &self,
        this: &LinearOperator,
        dtype: DataType,
        _copy: bool,
    ) -> Option<Result<LinearOperator>> {
        Some(Ok(Identity::new(this.nrows(), dtype)))
    }

    fn equals(&self, this: &LinearOperator, other: &LinearOperator) -> bool {
        other.is_identity() && this.shape() == other.shape() && this.dtype() == other.dtype()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linop_core::Casting;

    #[test]
    fn test_identity_structure() {
        let id = LinearOperator::identity(3, DataType::F64);
        assert_eq!(id.is_symmetric(), Some(true));
        assert_eq!(id.is_lower_triangular(), Some(true));
        assert_eq!(id.is_upper_triangular(), Some(true));
        assert_eq!(id.is_positive_definite(), Some(true));
        assert!(id.transpose().ptr_eq(&id));
        assert!(id.inv().unwrap().ptr_eq(&id));
        assert_eq!(id.todense().unwrap(), DMatrix::identity(3, 3));
    }

    #[test]
    fn test_identity_quantities() {
        let id = LinearOperator::identity(4, DataType::I32);
        assert_eq!(id.rank().unwrap(), 4);
        assert_eq!(id.det().unwrap(), 1.0);
        assert_eq!(id.logabsdet().unwrap(), 0.0);
        assert_eq!(id.trace().unwrap(), 4.0);
        assert_eq!(id.cond(NormOrd::Inf).unwrap(), 1.0);
        assert_eq!(id.cond(NormOrd::Fro).unwrap(), 4.0);
        assert!(id.eigvals().unwrap().iter().all(|c| *c == Complex::new(1.0, 0.0)));
    }

    #[test]
    fn test_identity_cholesky_and_cast() {
        let id = LinearOperator::identity(2, DataType::F64);
        assert_eq!(id.cholesky(true).unwrap(), id);

        let cast = id.astype(DataType::F32, Casting::SameKind, false).unwrap();
        assert!(cast.is_identity());
        assert_eq!(cast.dtype(), DataType::F32);
        assert_ne!(cast, id);
        assert_eq!(id, LinearOperator::identity(2, DataType::F64));
    }

    #[test]
    fn test_identity_application() {
        let id = LinearOperator::identity(2, DataType::F64);
        let x = DVector::from_vec(vec![3.0, -1.0]);
        assert_eq!(id.matvec(&x).unwrap(), x);
        assert_eq!(id.rmatvec(&x).unwrap(), x);
        assert_eq!(id.to_string(), "<Identity with shape=(2, 2) and dtype=f64>");
    }
}
