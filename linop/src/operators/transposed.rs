//! Lazy transpose of an operator without a structural transpose

use crate::error::Result;
use crate::linalg::NormOrd;
use crate::operator::{LinearOperator, Operator};
use nalgebra::{Complex, DMatrix, DVector};
use std::fmt;

/// `Aᵀ`, evaluated through the row product of `A`
pub struct Transposed {
    inner: LinearOperator,
}

impl Transposed {
    pub fn wrap(inner: &LinearOperator) -> LinearOperator {
        let (rows, cols) = inner.shape();
        LinearOperator::with_properties(
            (cols, rows),
            inner.dtype(),
            inner.properties().transposed(),
            Transposed {
                inner: inner.clone(),
            },
        )
    }

    pub fn inner(&self) -> &LinearOperator {
        &self.inner
    }
}

impl Operator for Transposed {
    fn name(&self) -> &str {
        "Transposed"
    }

    fn matmul(&self, this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        // Aᵀ X = (Xᵀ A)ᵀ
        if let Some(product) = self.inner.behaviour().rmatmul(&self.inner, &x.transpose()) {
            return Ok(product?.transpose());
        }
        if self.inner.is_symmetric() == Some(true) {
            return self.inner.matmat(x);
        }
        Ok(this.todense()? * x)
    }

    fn rmatmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        // X Aᵀ = (A Xᵀ)ᵀ
        Some(
            self.inner
                .matmat(&x.transpose())
                .map(|product| product.transpose()),
        )
    }

    fn todense(&self, _this: &LinearOperator) -> Result<DMatrix<f64>> {
        Ok(self.inner.todense()?.transpose())
    }

    fn transpose(&self, _this: &LinearOperator) -> Option<LinearOperator> {
        Some(self.inner.clone())
    }

    fn inverse(&self, _this: &LinearOperator) -> Option<Result<LinearOperator>> {
        Some(self.inner.inv().map(|inverse| inverse.transpose()))
    }

    fn rank(&self, _this: &LinearOperator) -> Result<usize> {
        self.inner.rank()
    }

    fn eigvals(&self, _this: &LinearOperator) -> Result<DVector<Complex<f64>>> {
        self.inner.eigvals()
    }

    fn cond(&self, _this: &LinearOperator, p: NormOrd) -> Result<f64> {
        self.inner.cond(p.transposed())
    }

    fn det(&self, _this: &LinearOperator) -> Result<f64> {
        self.inner.det()
    }

    fn logabsdet(&self, _this: &LinearOperator) -> Result<f64> {
        self.inner.logabsdet()
    }

    fn trace(&self, _this: &LinearOperator) -> Result<f64> {
        self.inner.trace()
    }

    fn describe(&self, _this: &LinearOperator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transpose of {}", self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OperatorBuilder;
    use approx::assert_relative_eq;
    use linop_core::{DataType, Property};

    /// Matrix-free operator without a row product
    fn opaque(a: DMatrix<f64>) -> LinearOperator {
        let shape = a.shape();
        OperatorBuilder::new(shape, DataType::F64)
            .matmul(move |x| Ok(&a * x))
            .build()
            .unwrap()
    }

    #[test]
    fn test_lazy_transpose_products() {
        let dense = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let a = opaque(dense.clone());
        let t = a.transpose();
        assert!(t.downcast_ref::<Transposed>().is_some());
        assert_eq!(t.shape(), (3, 2));

        let x = DVector::from_vec(vec![1.0, -1.0]);
        assert_eq!(t.matvec(&x).unwrap(), dense.transpose() * &x);

        let z = DVector::from_vec(vec![1.0, 0.0, 2.0]);
        assert_eq!(t.rmatvec(&z).unwrap(), (z.transpose() * dense.transpose()).transpose());
        assert!(t.transpose().ptr_eq(&a));
    }

    #[test]
    fn test_transposed_flags_and_delegation() {
        let a = opaque(DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 1.0, 3.0]));
        a.set_property(Property::LowerTriangular, Some(true)).unwrap();
        let t = a.transpose();
        assert_eq!(t.is_upper_triangular(), Some(true));
        assert_eq!(t.is_lower_triangular(), None);
        assert_relative_eq!(t.det().unwrap(), 6.0, epsilon = 1e-12);
        assert_relative_eq!(t.trace().unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(t.rank().unwrap(), 2);
        assert_relative_eq!(
            t.cond(NormOrd::One).unwrap(),
            a.cond(NormOrd::Inf).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_transposed_display() {
        let a = opaque(DMatrix::zeros(2, 3));
        assert_eq!(
            a.transpose().to_string(),
            "Transpose of <LinearOperator with shape=(2, 3) and dtype=f64>"
        );
    }
}
