//! Lazy inverse of a square operator
//!
//! The wrapped operator is factorized on first use and the factorization is
//! kept for every later solve. Symmetric operators that admit a Cholesky
//! factor are solved through it; everything else goes through LU.

use crate::error::{LinopError, Result};
use crate::linalg::NormOrd;
use crate::operator::{LinearOperator, Operator};
use linop_core::{MatrixProperties, Property};
use log::debug;
use nalgebra::{Complex, DMatrix, DVector, Dyn, LU};
use std::fmt;
use std::sync::OnceLock;

enum Factorization {
    /// Lower Cholesky factor `L` with `A = L Lᵀ`
    Cholesky(DMatrix<f64>),
    Lu(LU<f64, Dyn, Dyn>),
}

impl Factorization {
    fn solve(&self, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let solution = match self {
            Factorization::Cholesky(l) => l
                .solve_lower_triangular(b)
                .and_then(|y| l.tr_solve_lower_triangular(&y)),
            Factorization::Lu(lu) => lu.solve(b),
        };
        solution.ok_or_else(LinopError::singular)
    }
}

/// `A⁻¹`, applied by solving with a cached factorization of `A`
pub struct Inverse {
    inner: LinearOperator,
    factor: OnceLock<Factorization>,
    factor_t: OnceLock<LU<f64, Dyn, Dyn>>,
}

impl Inverse {
    pub fn wrap(inner: &LinearOperator) -> Result<LinearOperator> {
        inner.require_square()?;
        let props = inner.properties();
        let inherited = MatrixProperties::new(
            props.get(Property::Symmetric),
            None,
            None,
            props.get(Property::PositiveDefinite),
        );
        Ok(LinearOperator::with_properties(
            inner.shape(),
            inner.dtype().inexact(),
            inherited,
            Inverse {
                inner: inner.clone(),
                factor: OnceLock::new(),
                factor_t: OnceLock::new(),
            },
        ))
    }

    pub fn inner(&self) -> &LinearOperator {
        &self.inner
    }

    fn factorization(&self) -> Result<&Factorization> {
        if let Some(factor) = self.factor.get() {
            return Ok(factor);
        }

        let inner = &self.inner;
        let factor = if inner.is_symmetric() == Some(true)
            && inner.is_positive_definite() != Some(false)
        {
            match inner.cholesky(true) {
                Ok(lower) => {
                    debug!("Inverting {inner} through its Cholesky factor");
                    Some(Factorization::Cholesky(lower.todense()?))
                }
                Err(_) => None,
            }
        } else {
            None
        };

        let factor = match factor {
            Some(factor) => factor,
            None => {
                debug!("Inverting {inner} through an LU decomposition");
                Factorization::Lu(inner.todense()?.lu())
            }
        };
        Ok(self.factor.get_or_init(|| factor))
    }

    fn transposed_factorization(&self) -> Result<&LU<f64, Dyn, Dyn>> {
        if let Some(lu) = self.factor_t.get() {
            return Ok(lu);
        }
        debug!("Factorizing the transpose of {}", self.inner);
        let lu = self.inner.todense()?.transpose().lu();
        Ok(self.factor_t.get_or_init(|| lu))
    }
}

impl Operator for Inverse {
    fn name(&self) -> &str {
        "Inverse"
    }

    fn matmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.factorization()?.solve(x)
    }

    fn rmatmul(&self, _this: &LinearOperator, x: &DMatrix<f64>) -> Option<Result<DMatrix<f64>>> {
        // X A⁻¹ = (A⁻ᵀ Xᵀ)ᵀ
        let solve = || -> Result<DMatrix<f64>> {
            let rhs = x.transpose();
            let solution = match self.factorization()? {
                Factorization::Cholesky(_) => self.factorization()?.solve(&rhs)?,
                Factorization::Lu(_) => self
                    .transposed_factorization()?
                    .solve(&rhs)
                    .ok_or_else(LinopError::singular)?,
            };
            Ok(solution.transpose())
        };
        Some(solve())
    }

    fn transpose(&self, this: &LinearOperator) -> Option<LinearOperator> {
        if this.is_symmetric() == Some(true) {
            return Some(this.clone());
        }
        Inverse::wrap(&self.inner.transpose()).ok()
    }

    fn inverse(&self, _this: &LinearOperator) -> Option<Result<LinearOperator>> {
        Some(Ok(self.inner.clone()))
    }

    fn eigvals(&self, _this: &LinearOperator) -> Result<DVector<Complex<f64>>> {
        Ok(self.inner.eigvals()?.map(|lambda| lambda.inv()))
    }

    fn cond(&self, _this: &LinearOperator, p: NormOrd) -> Result<f64> {
        self.inner.cond(p)
    }

    fn det(&self, _this: &LinearOperator) -> Result<f64> {
        Ok(1.0 / self.inner.det()?)
    }

    fn logabsdet(&self, _this: &LinearOperator) -> Result<f64> {
        Ok(-self.inner.logabsdet()?)
    }

    fn describe(&self, _this: &LinearOperator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inverse of {}", self.inner)
    }
}
