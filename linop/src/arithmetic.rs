//! Operator arithmetic
//!
//! Sums, scalar multiples and products are built lazily as composite nodes
//! that share their operands. A few combinations are simplified on
//! construction:
//!
//! - `1 · A` is `A`; scalings of scalings fold into one scalar
//! - explicit matrices with the same storage are added eagerly
//! - scalar multiples of explicit matrices are computed eagerly
//! - `I A` and `A I` are `A` when the data types agree
//! - products of explicit matrices are eager unless
//!   [`Config::lazy_matrix_matrix_matmul`](crate::Config) is set

use crate::config;
use crate::error::{LinopError, Result};
use crate::linalg::NormOrd;
use crate::operator::{LinearOperator, Operator};
use crate::operators::Matrix;
use linop_core::validation::{validate_matmul, validate_same_shape};
use linop_core::{result_type, MatrixProperties, Property};
use log::debug;
use nalgebra::{Complex, DMatrix, DVector};
use std::ops::{Add, Mul, Neg, Sub};

/// `A₁ + A₂ + …`
pub struct Sum {
    summands: Vec<LinearOperator>,
}

/// `α A`
pub struct Scaled {
    scalar: f64,
    operator: LinearOperator,
}

/// `A₁ A₂ … Aₖ`
pub struct Product {
    factors: Vec<LinearOperator>,
}

/// Flag is known true for every operand
fn all_true(operands: &[LinearOperator], property: Property) -> Option<bool> {
    operands
        .iter()
        .all(|op| op.property(property) == Some(true))
        .then_some(true)
}

/// Flags a sum inherits from its summands
fn sum_properties(summands: &[LinearOperator], shape: (usize, usize)) -> MatrixProperties {
    let symmetric = all_true(summands, Property::Symmetric);
    MatrixProperties::new(
        symmetric.or(MatrixProperties::for_shape(shape).get(Property::Symmetric)),
        all_true(summands, Property::LowerTriangular),
        all_true(summands, Property::UpperTriangular),
        all_true(summands, Property::PositiveDefinite),
    )
}

impl Sum {
    fn build(summands: Vec<LinearOperator>) -> LinearOperator {
        let shape = summands[0].shape();
        let dtype = summands
            .iter()
            .skip(1)
            .fold(summands[0].dtype(), |acc, op| result_type(acc, op.dtype()));

        let properties = sum_properties(&summands, shape);
        LinearOperator::with_properties(shape, dtype, properties, Sum { summands })
    }

    pub fn summands(&self) -> &[LinearOperator] {
        &self.summands
    }
}

impl Operator for Sum {
    fn name(&self) -> &str {
        "SumLinearOperator"
    }

    fn matmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let mut total = self.summands[0].matmat(x)?;
        for summand in &self.summands[1..] {
            total += summand.matmat(x)?;
        }
        Ok(total)
    }

    fn rmatmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        let total = || -> Result<DMatrix<f64>> {
            let mut total = self.summands[0].rmatmat(x)?;
            for summand in &self.summands[1..] {
                total += summand.rmatmat(x)?;
            }
            Ok(total)
        };
        Some(total())
    }

    fn todense(&self, _this: &LinearOperator) -> Result<DMatrix<f64>> {
        let mut total = self.summands[0].todense()?;
        for summand in &self.summands[1..] {
            total += summand.todense()?;
        }
        Ok(total)
    }

    fn transpose(&self, _this: &LinearOperator) -> Option<LinearOperator> {
        Some(Sum::build(
            self.summands.iter().map(LinearOperator::transpose).collect(),
        ))
    }

    fn trace(&self, this: &LinearOperator) -> Result<f64> {
        let mut trace = 0.0;
        for summand in &self.summands {
            trace += summand.trace()?;
        }
        Ok(this.dtype().cast(trace))
    }
}

impl Scaled {
    fn build(scalar: f64, operator: LinearOperator) -> LinearOperator {
        let props = operator.properties();
        let positive_definite = match props.get(Property::PositiveDefinite) {
            Some(true) if scalar > 0.0 => Some(true),
            _ => None,
        };
        let properties = MatrixProperties::new(
            props.get(Property::Symmetric),
            props.get(Property::LowerTriangular),
            props.get(Property::UpperTriangular),
            positive_definite,
        );

        LinearOperator::with_properties(
            operator.shape(),
            operator.dtype().inexact(),
            properties,
            Scaled { scalar, operator },
        )
    }

    pub fn scalar(&self) -> f64 {
        self.scalar
    }

    pub fn operator(&self) -> &LinearOperator {
        &self.operator
    }
}

impl Operator for Scaled {
    fn name(&self) -> &str {
        "ScaledLinearOperator"
    }

    fn matmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        Ok(self.operator.matmat(x)? * self.scalar)
    }

    fn rmatmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        Some(self.operator.rmatmat(x).map(|y| y * self.scalar))
    }

    fn todense(&self, _this: &LinearOperator) -> Result<DMatrix<f64>> {
        Ok(self.operator.todense()? * self.scalar)
    }

    fn transpose(&self, _this: &LinearOperator) -> Option<LinearOperator> {
        Some(self.operator.transpose().scale(self.scalar))
    }

    fn inverse(&self, _this: &LinearOperator) -> Option<Result<LinearOperator>> {
        if self.scalar == 0.0 {
            return Some(Err(LinopError::singular()));
        }
        Some(self.operator.inv().map(|inv| inv.scale(1.0 / self.scalar)))
    }

    fn rank(&self, _this: &LinearOperator) -> Result<usize> {
        if self.scalar == 0.0 {
            return Ok(0);
        }
        self.operator.rank()
    }

    fn eigvals(&self, _this: &LinearOperator) -> Result<DVector<Complex<f64>>> {
        Ok(self.operator.eigvals()? * Complex::new(self.scalar, 0.0))
    }

    fn cond(&self, _this: &LinearOperator, p: NormOrd) -> Result<f64> {
        if self.scalar == 0.0 {
            return Ok(f64::INFINITY);
        }
        self.operator.cond(p)
    }

    fn det(&self, this: &LinearOperator) -> Result<f64> {
        Ok(self.scalar.powi(this.nrows() as i32) * self.operator.det()?)
    }

    fn logabsdet(&self, this: &LinearOperator) -> Result<f64> {
        if self.scalar == 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(this.nrows() as f64 * self.scalar.abs().ln() + self.operator.logabsdet()?)
    }

    fn trace(&self, this: &LinearOperator) -> Result<f64> {
        Ok(this.dtype().cast(self.scalar * self.operator.trace()?))
    }
}

impl Product {
    fn build(factors: Vec<LinearOperator>) -> LinearOperator {
        let shape = (factors[0].nrows(), factors[factors.len() - 1].ncols());
        let dtype = factors
            .iter()
            .skip(1)
            .fold(factors[0].dtype(), |acc, op| result_type(acc, op.dtype()));

        let mut properties = MatrixProperties::for_shape(shape);
        if factors.iter().all(LinearOperator::is_square) {
            properties = MatrixProperties::new(
                properties.get(Property::Symmetric),
                all_true(&factors, Property::LowerTriangular),
                all_true(&factors, Property::UpperTriangular),
                None,
            );
        }

        LinearOperator::with_properties(shape, dtype, properties, Product { factors })
    }

    pub fn factors(&self) -> &[LinearOperator] {
        &self.factors
    }

    fn all_square(&self) -> bool {
        self.factors.iter().all(LinearOperator::is_square)
    }
}

impl Operator for Product {
    fn name(&self) -> &str {
        "ProductLinearOperator"
    }

    fn matmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let mut y = x.clone();
        for factor in self.factors.iter().rev() {
            y = factor.matmat(&y)?;
        }
        Ok(y)
    }

    fn rmatmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        let chain = || -> Result<DMatrix<f64>> {
            let mut y = x.clone();
            for factor in &self.factors {
                y = factor.rmatmat(&y)?;
            }
            Ok(y)
        };
        Some(chain())
    }

    fn todense(&self, _this: &LinearOperator) -> Result<DMatrix<f64>> {
        let mut dense = self.factors[0].todense()?;
        for factor in &self.factors[1..] {
            dense = factor.rmatmat(&dense)?;
        }
        Ok(dense)
    }

    fn transpose(&self, _this: &LinearOperator) -> Option<LinearOperator> {
        Some(Product::build(
            self.factors.iter().rev().map(LinearOperator::transpose).collect(),
        ))
    }

    fn inverse(&self, _this: &LinearOperator) -> Option<Result<LinearOperator>> {
        if !self.all_square() {
            return None;
        }
        let inverses: Result<Vec<LinearOperator>> =
            self.factors.iter().rev().map(LinearOperator::inv).collect();
        Some(inverses.map(Product::build))
    }

    fn det(&self, this: &LinearOperator) -> Result<f64> {
        if !self.all_square() {
            return crate::linalg::det(this);
        }
        let mut det = 1.0;
        for factor in &self.factors {
            det *= factor.det()?;
        }
        Ok(det)
    }

    fn logabsdet(&self, this: &LinearOperator) -> Result<f64> {
        if !self.all_square() {
            return crate::linalg::logabsdet(this);
        }
        let mut logabsdet = 0.0;
        for factor in &self.factors {
            logabsdet += factor.logabsdet()?;
        }
        Ok(logabsdet)
    }
}

impl LinearOperator {
    /// `A + B`
    pub fn add(&self, other: &LinearOperator) -> Result<LinearOperator> {
        validate_same_shape(self.shape(), other.shape())?;

        if let (Some(a), Some(b)) = (self.as_matrix(), other.as_matrix()) {
            if let Some(sum) = a.storage().add(b.storage()) {
                debug!("Adding explicit matrices eagerly");
                let dtype = result_type(self.dtype(), other.dtype());
                let properties = sum_properties(&[self.clone(), other.clone()], self.shape());
                return Ok(Matrix::from_storage(sum?, dtype, Some(properties)));
            }
        }

        let mut summands = Vec::new();
        for operand in [self, other] {
            match operand.downcast_ref::<Sum>() {
                Some(sum) => summands.extend(sum.summands.iter().cloned()),
                None => summands.push(operand.clone()),
            }
        }
        Ok(Sum::build(summands))
    }

    /// `A - B`
    pub fn sub(&self, other: &LinearOperator) -> Result<LinearOperator> {
        self.add(&other.scale(-1.0))
    }

    /// `α A`
    pub fn scale(&self, alpha: f64) -> LinearOperator {
        if alpha == 1.0 {
            return self.clone();
        }

        if let Some(matrix) = self.as_matrix() {
            let props = self.properties();
            let properties = MatrixProperties::new(
                props.get(Property::Symmetric),
                props.get(Property::LowerTriangular),
                props.get(Property::UpperTriangular),
                match props.get(Property::PositiveDefinite) {
                    Some(true) if alpha > 0.0 => Some(true),
                    _ => None,
                },
            );
            return Matrix::from_storage(
                matrix.storage().scale(alpha),
                self.dtype().inexact(),
                Some(properties),
            );
        }

        if let Some(scaled) = self.downcast_ref::<Scaled>() {
            return scaled.operator.scale(alpha * scaled.scalar);
        }

        Scaled::build(alpha, self.clone())
    }

    /// Matrix product `A B`
    pub fn compose(&self, other: &LinearOperator) -> Result<LinearOperator> {
        validate_matmul(self.shape(), other.shape())?;

        if self.is_identity() && self.dtype() == other.dtype() {
            return Ok(other.clone());
        }
        if other.is_identity() && self.dtype() == other.dtype() {
            return Ok(self.clone());
        }

        if let (Some(a), Some(b)) = (self.as_matrix(), other.as_matrix()) {
            if !config::current().lazy_matrix_matrix_matmul {
                debug!("Multiplying explicit matrices eagerly");
                let dtype = result_type(self.dtype(), other.dtype());
                return Ok(Matrix::from_storage(a.storage().matmul(b.storage())?, dtype, None));
            }
        }

        let mut factors = Vec::new();
        for operand in [self, other] {
            match operand.downcast_ref::<Product>() {
                Some(product) => factors.extend(product.factors.iter().cloned()),
                None => factors.push(operand.clone()),
            }
        }
        Ok(Product::build(factors))
    }
}

impl Neg for &LinearOperator {
    type Output = LinearOperator;

    fn neg(self) -> LinearOperator {
        self.scale(-1.0)
    }
}

impl Neg for LinearOperator {
    type Output = LinearOperator;

    fn neg(self) -> LinearOperator {
        self.scale(-1.0)
    }
}

impl Mul<f64> for &LinearOperator {
    type Output = LinearOperator;

    fn mul(self, alpha: f64) -> LinearOperator {
        self.scale(alpha)
    }
}

impl Mul<f64> for LinearOperator {
    type Output = LinearOperator;

    fn mul(self, alpha: f64) -> LinearOperator {
        self.scale(alpha)
    }
}

impl Mul<&LinearOperator> for f64 {
    type Output = LinearOperator;

    fn mul(self, op: &LinearOperator) -> LinearOperator {
        op.scale(self)
    }
}

impl Mul<LinearOperator> for f64 {
    type Output = LinearOperator;

    fn mul(self, op: LinearOperator) -> LinearOperator {
        op.scale(self)
    }
}

impl Add for &LinearOperator {
    type Output = Result<LinearOperator>;

    fn add(self, rhs: &LinearOperator) -> Result<LinearOperator> {
        LinearOperator::add(self, rhs)
    }
}

impl Sub for &LinearOperator {
    type Output = Result<LinearOperator>;

    fn sub(self, rhs: &LinearOperator) -> Result<LinearOperator> {
        LinearOperator::sub(self, rhs)
    }
}

impl Mul for &LinearOperator {
    type Output = Result<LinearOperator>;

    fn mul(self, rhs: &LinearOperator) -> Result<LinearOperator> {
        self.compose(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{with_config, Config};
    use crate::operators::{OperatorBuilder, Selection};
    use approx::assert_relative_eq;
    use linop_core::DataType;

    fn opaque(a: DMatrix<f64>) -> LinearOperator {
        OperatorBuilder::new(a.shape(), DataType::F64)
            .matmul(move |x| Ok(&a * x))
            .build()
            .unwrap()
    }

    fn dense(rows: usize, cols: usize, values: &[f64]) -> DMatrix<f64> {
        DMatrix::from_row_slice(rows, cols, values)
    }

    #[test]
    fn test_eager_matrix_sum() {
        let a = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]).unwrap();
        let c = (&a + &b).unwrap();
        assert!(c.as_matrix().is_some());
        assert_eq!(c.todense().unwrap(), dense(2, 2, &[2.0, 2.0, 3.0, 5.0]));

        let d = (&a - &b).unwrap();
        assert_eq!(d.todense().unwrap(), dense(2, 2, &[0.0, 2.0, 3.0, 3.0]));
    }

    #[test]
    fn test_eager_sum_keeps_flags() {
        let a = Matrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]).unwrap();
        let b = Matrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 1.0]).unwrap();
        for op in [&a, &b] {
            op.set_property(Property::Symmetric, Some(true)).unwrap();
            op.set_property(Property::PositiveDefinite, Some(true)).unwrap();
        }

        let c = (&a + &b).unwrap();
        assert!(c.as_matrix().is_some());
        assert_eq!(c.is_symmetric(), Some(true));
        assert_eq!(c.is_positive_definite(), Some(true));
        let l = c.cholesky(true).unwrap().todense().unwrap();
        assert_relative_eq!(&l * l.transpose(), dense(2, 2, &[5.0, 1.0, 1.0, 3.0]), epsilon = 1e-12);

        let upper = Matrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]).unwrap();
        let mixed = (&a + &upper).unwrap();
        assert_eq!(mixed.is_symmetric(), None);
        assert_eq!(mixed.is_positive_definite(), None);
    }

    #[test]
    fn test_lazy_sum_flattens() {
        let a = opaque(dense(2, 2, &[1.0, 0.0, 0.0, 1.0]));
        let b = opaque(dense(2, 2, &[0.0, 1.0, 1.0, 0.0]));
        let s = (&(&a + &b).unwrap() + &a).unwrap();
        assert_eq!(s.downcast_ref::<Sum>().unwrap().summands().len(), 3);
        assert_eq!(s.todense().unwrap(), dense(2, 2, &[2.0, 1.0, 1.0, 2.0]));
        assert_relative_eq!(s.trace().unwrap(), 4.0);
        assert_eq!(s.to_string(), "<SumLinearOperator with shape=(2, 2) and dtype=f64>");
    }

    #[test]
    fn test_sum_shape_mismatch() {
        let a = Matrix::from_row_slice(2, 2, &[0.0; 4]).unwrap();
        let b = Matrix::from_row_slice(2, 1, &[0.0; 2]).unwrap();
        assert!(matches!(&a + &b, Err(LinopError::Core(_))));
    }

    #[test]
    fn test_sum_properties() {
        let a = opaque(dense(2, 2, &[2.0, 0.0, 0.0, 2.0]));
        a.set_property(Property::Symmetric, Some(true)).unwrap();
        a.set_property(Property::PositiveDefinite, Some(true)).unwrap();
        let s = (&a + &LinearOperator::identity(2, DataType::F64)).unwrap();
        assert_eq!(s.is_symmetric(), Some(true));
        assert_eq!(s.is_positive_definite(), Some(true));
        assert_eq!(s.is_lower_triangular(), None);
    }

    #[test]
    fn test_scaling() {
        let a = opaque(dense(2, 2, &[1.0, 2.0, 3.0, 4.0]));
        assert!(a.scale(1.0).ptr_eq(&a));

        let s = 2.0 * &(&a * 3.0);
        let scaled = s.downcast_ref::<Scaled>().unwrap();
        assert_eq!(scaled.scalar(), 6.0);
        assert!(scaled.operator().ptr_eq(&a));
        assert_relative_eq!(s.det().unwrap(), 36.0 * -2.0, epsilon = 1e-9);
        assert_relative_eq!(s.trace().unwrap(), 30.0, epsilon = 1e-12);
        assert_relative_eq!(
            s.logabsdet().unwrap(),
            (72.0f64).ln(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            s.inv().unwrap().todense().unwrap(),
            a.todense().unwrap().try_inverse().unwrap() / 6.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_scaling_promotes_integers() {
        let a = Matrix::from_elements(1, 2, &[1i32, 2]).unwrap();
        let b = &a * 0.5;
        assert_eq!(b.dtype(), DataType::F64);
        assert_eq!(b.todense().unwrap(), dense(1, 2, &[0.5, 1.0]));
    }

    #[test]
    fn test_negation() {
        let a = Matrix::from_row_slice(1, 2, &[1.0, -2.0]).unwrap();
        assert!((-&a).as_matrix().is_some());
        assert_eq!((-a).todense().unwrap(), dense(1, 2, &[-1.0, 2.0]));

        let b = opaque(dense(1, 1, &[3.0]));
        assert!((-&b).downcast_ref::<Scaled>().is_some());
    }

    #[test]
    fn test_scaled_positive_definite() {
        let a = LinearOperator::identity(2, DataType::F64);
        assert_eq!((&a * 2.0).is_positive_definite(), Some(true));
        assert_eq!((&a * -2.0).is_positive_definite(), None);
        assert_eq!((&a * -2.0).is_symmetric(), Some(true));
    }

    #[test]
    fn test_identity_products_simplify() {
        let a = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let left = LinearOperator::identity(2, DataType::F64);
        let right = LinearOperator::identity(3, DataType::F64);
        assert!((&left * &a).unwrap().ptr_eq(&a));
        assert!((&a * &right).unwrap().ptr_eq(&a));

        let f32_identity = LinearOperator::identity(2, DataType::F32);
        assert!(!(&f32_identity * &a).unwrap().ptr_eq(&a));
    }

    #[test]
    fn test_matrix_products_eager_or_lazy() {
        let a = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::from_row_slice(2, 1, &[1.0, 1.0]).unwrap();
        let eager = (&a * &b).unwrap();
        assert!(eager.as_matrix().is_some());
        assert_eq!(eager.todense().unwrap(), dense(2, 1, &[3.0, 7.0]));

        let lazy_cfg = Config::default().with_lazy_matrix_matrix_matmul(true);
        let lazy = with_config(lazy_cfg, || (&a * &b).unwrap());
        assert!(lazy.downcast_ref::<Product>().is_some());
        assert_eq!(lazy.todense().unwrap(), dense(2, 1, &[3.0, 7.0]));
    }

    #[test]
    fn test_product_chain() {
        let a = opaque(dense(2, 2, &[2.0, 0.0, 0.0, 3.0]));
        let b = opaque(dense(2, 2, &[1.0, 1.0, 0.0, 1.0]));
        let p = (&(&a * &b).unwrap() * &a).unwrap();
        let product = p.downcast_ref::<Product>().unwrap();
        assert_eq!(product.factors().len(), 3);

        let expected = dense(2, 2, &[2.0, 0.0, 0.0, 3.0])
            * dense(2, 2, &[1.0, 1.0, 0.0, 1.0])
            * dense(2, 2, &[2.0, 0.0, 0.0, 3.0]);
        assert_eq!(p.todense().unwrap(), expected);
        assert_relative_eq!(p.det().unwrap(), 36.0, epsilon = 1e-9);
        assert_relative_eq!(p.logabsdet().unwrap(), 36f64.ln(), epsilon = 1e-9);
        assert_eq!(p.transpose().todense().unwrap(), expected.transpose());
        assert_relative_eq!(
            p.inv().unwrap().todense().unwrap(),
            expected.clone().try_inverse().unwrap(),
            epsilon = 1e-12
        );
        let x = DMatrix::from_row_slice(1, 2, &[1.0, -1.0]);
        assert_eq!(p.rmatmat(&x).unwrap(), &x * &expected);
    }

    #[test]
    fn test_product_shape_checks() {
        let a = Matrix::from_row_slice(2, 3, &[0.0; 6]).unwrap();
        assert!((&a * &a).is_err());

        let s = Selection::new(vec![1], (1, 2)).unwrap();
        let p = (&s * &a).unwrap();
        assert_eq!(p.shape(), (1, 3));
        assert!(p.inv().is_err());
    }

    #[test]
    fn test_sum_transpose() {
        let a = opaque(dense(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        let b = Matrix::from_row_slice(2, 3, &[1.0; 6]).unwrap();
        let s = (&a + &b).unwrap();
        let t = s.transpose();
        assert!(t.downcast_ref::<Sum>().is_some());
        assert_eq!(t.todense().unwrap(), s.todense().unwrap().transpose());
    }
}
