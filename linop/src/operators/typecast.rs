//! Lazy data type conversion

use crate::error::Result;
use crate::linalg::NormOrd;
use crate::operator::{LinearOperator, Operator};
use linop_core::{Casting, DataType};
use nalgebra::{Complex, DMatrix, DVector};

/// An operator reporting a different data type than the one it wraps
///
/// Products are delegated unchanged; materialized entries and the trace are
/// rounded to the target type.
pub struct TypeCast {
    inner: LinearOperator,
}

impl TypeCast {
    pub fn wrap(inner: &LinearOperator, dtype: DataType) -> LinearOperator {
        LinearOperator::with_properties(
            inner.shape(),
            dtype,
            inner.properties(),
            TypeCast {
                inner: inner.clone(),
            },
        )
    }

    pub fn inner(&self) -> &LinearOperator {
        &self.inner
    }
}

impl Operator for TypeCast {
    fn name(&self) -> &str {
        "TypeCast"
    }

    fn matmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.inner.matmat(x)
    }

    fn rmatmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        Some(self.inner.rmatmat(x))
    }

    fn todense(&self, this: &LinearOperator) -> Result<DMatrix<f64>> {
        let dtype = this.dtype();
        Ok(self.inner.todense()?.map(|v| dtype.cast(v)))
    }

    fn transpose(&self, this: &LinearOperator) -> Option<LinearOperator> {
        Some(TypeCast::wrap(&self.inner.transpose(), this.dtype()))
    }

    fn inverse(&self, this: &LinearOperator) -> Option<Result<LinearOperator>> {
        let dtype = this.dtype().inexact();
        Some(
            self.inner
                .inv()
                .and_then(|inverse| inverse.astype(dtype, Casting::Unsafe, false)),
        )
    }

    fn rank(&self, _this: &LinearOperator) -> Result<usize> {
        self.inner.rank()
    }

    fn eigvals(&self, this: &LinearOperator) -> Result<DVector<Complex<f64>>> {
        let dtype = this.dtype().inexact();
        Ok(self
            .inner
            .eigvals()?
            .map(|c| Complex::new(dtype.cast(c.re), dtype.cast(c.im))))
    }

    fn cond(&self, this: &LinearOperator, p: NormOrd) -> Result<f64> {
        Ok(this.dtype().inexact().cast(self.inner.cond(p)?))
    }

    fn det(&self, this: &LinearOperator) -> Result<f64> {
        Ok(this.dtype().inexact().cast(self.inner.det()?))
    }

    fn logabsdet(&self, this: &LinearOperator) -> Result<f64> {
        Ok(this.dtype().inexact().cast(self.inner.logabsdet()?))
    }

    fn trace(&self, this: &LinearOperator) -> Result<f64> {
        Ok(this.dtype().cast(self.inner.trace()?))
    }

    fn astype(
        &self,
        this: &LinearOperator,
        dtype: DataType,
        copy: bool,
    ) -> Option<Result<LinearOperator>> {
        if dtype == self.inner.dtype() && !copy {
            return Some(Ok(self.inner.clone()));
        }
        if dtype == this.dtype() {
            return Some(Ok(TypeCast::wrap(&self.inner, dtype)));
        }
        Some(self.inner.astype(dtype, Casting::Unsafe, copy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OperatorBuilder;

    fn opaque() -> LinearOperator {
        let a = DMatrix::from_row_slice(2, 2, &[1.5, 0.25, -2.75, 3.0]);
        OperatorBuilder::new((2, 2), DataType::F64)
            .matmul(move |x| Ok(&a * x))
            .build()
            .unwrap()
    }

    #[test]
    fn test_lazy_cast_rounds_dense_entries() {
        let a = opaque();
        let b = a.astype(DataType::I32, Casting::Unsafe, false).unwrap();
        assert!(b.downcast_ref::<TypeCast>().is_some());
        assert_eq!(b.dtype(), DataType::I32);
        assert_eq!(
            b.todense().unwrap(),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, -2.0, 3.0])
        );
        assert_eq!(b.trace().unwrap(), 4.0);
    }

    #[test]
    fn test_cast_back_returns_original() {
        let a = opaque();
        let b = a.astype(DataType::F32, Casting::SameKind, false).unwrap();
        assert!(b.astype(DataType::F64, Casting::Safe, false).unwrap().ptr_eq(&a));
        assert!(!b.astype(DataType::F64, Casting::Safe, true).unwrap().ptr_eq(&a));
    }

    #[test]
    fn test_cast_delegates_products() {
        let a = opaque();
        let b = a.astype(DataType::F32, Casting::Unsafe, false).unwrap();
        let x = DVector::from_vec(vec![1.0, 1.0]);
        assert_eq!(b.matvec(&x).unwrap(), a.matvec(&x).unwrap());
        assert_eq!(b.transpose().dtype(), DataType::F32);
        assert_eq!(b.inv().unwrap().dtype(), DataType::F32);
    }
}
