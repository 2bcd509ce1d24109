//! Random variables under linear maps
//!
//! Applying an operator `A` to a random variable pushes its distribution
//! forward: a constant `s` becomes `A s`, a Gaussian `N(μ, Σ)` becomes
//! `N(A μ, A Σ Aᵀ)`. The new covariance is composed lazily, so nothing is
//! materialized until the moments are needed.

use crate::error::{LinopError, Result};
use crate::operator::LinearOperator;
use crate::operators::Matrix;
use linop_core::Property;
use log::debug;
use nalgebra::{DMatrix, DVector};
use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::Normal as Univariate;
use std::f64::consts::PI;

/// A random variable that can be transformed by a linear operator
#[derive(Debug, Clone)]
pub enum RandomVariable {
    Constant(Constant),
    Normal(Normal),
}

/// Point mass at `support`
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    support: DVector<f64>,
}

/// Multivariate Gaussian with an operator covariance
#[derive(Debug, Clone)]
pub struct Normal {
    mean: DVector<f64>,
    cov: LinearOperator,
}

fn statistics_error(err: statrs::StatsError) -> LinopError {
    LinopError::InvalidArgument(err.to_string())
}

impl Constant {
    pub fn new(support: DVector<f64>) -> Self {
        Self { support }
    }

    pub fn support(&self) -> &DVector<f64> {
        &self.support
    }

    pub fn dim(&self) -> usize {
        self.support.len()
    }
}

impl Normal {
    /// Gaussian with mean `mean` and square covariance of matching size
    pub fn new(mean: DVector<f64>, cov: LinearOperator) -> Result<Self> {
        let n = cov.require_square()?;
        if n != mean.len() {
            return Err(LinopError::DimensionMismatch {
                expected: mean.len(),
                got: n,
            });
        }
        Ok(Self { mean, cov })
    }

    /// Gaussian with a dense covariance, flagged symmetric
    pub fn from_dense(mean: DVector<f64>, cov: DMatrix<f64>) -> Result<Self> {
        let cov = Matrix::dense(cov);
        cov.set_property(Property::Symmetric, Some(true))?;
        Self::new(mean, cov)
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn cov(&self) -> &LinearOperator {
        &self.cov
    }

    /// `N(μ + b, Σ)`
    pub fn shift(&self, b: &DVector<f64>) -> Result<Normal> {
        if b.len() != self.dim() {
            return Err(LinopError::DimensionMismatch {
                expected: self.dim(),
                got: b.len(),
            });
        }
        Ok(Normal {
            mean: &self.mean + b,
            cov: self.cov.clone(),
        })
    }

    /// Pushforward under `A`: `N(A μ, A Σ Aᵀ)`
    pub fn transform(&self, a: &LinearOperator) -> Result<Normal> {
        let mean = a.matvec(&self.mean)?;
        let cov = a.compose(&self.cov)?.compose(&a.transpose())?;
        if self.cov.is_symmetric() == Some(true) {
            cov.set_property(Property::Symmetric, Some(true))?;
        }
        Ok(Normal { mean, cov })
    }

    /// Lower Cholesky factor of the symmetrized covariance
    fn factor(&self) -> Result<DMatrix<f64>> {
        self.cov.symmetrize()?.cholesky(true)?.todense()
    }

    /// `n` draws as the columns of a `dim × n` matrix
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<DMatrix<f64>> {
        let standard = Univariate::new(0.0, 1.0).map_err(statistics_error)?;
        let l = self.factor()?;
        debug!("Sampling {n} draws of a {}-dimensional normal", self.dim());

        let z = DMatrix::from_fn(self.dim(), n, |_, _| standard.sample(rng));
        let mut draws = l * z;
        for mut column in draws.column_iter_mut() {
            column += &self.mean;
        }
        Ok(draws)
    }

    /// Log-density at `x`
    pub fn logpdf(&self, x: &DVector<f64>) -> Result<f64> {
        if x.len() != self.dim() {
            return Err(LinopError::DimensionMismatch {
                expected: self.dim(),
                got: x.len(),
            });
        }

        let l = self.factor()?;
        let whitened = l
            .solve_lower_triangular(&(x - &self.mean))
            .ok_or_else(LinopError::singular)?;
        let half_logdet: f64 = l.diagonal().iter().map(|d| d.ln()).sum();

        Ok(-0.5 * (whitened.norm_squared() + self.dim() as f64 * (2.0 * PI).ln()) - half_logdet)
    }

    pub fn pdf(&self, x: &DVector<f64>) -> Result<f64> {
        Ok(self.logpdf(x)?.exp())
    }

    /// Univariate marginal of component `i`
    pub fn marginal(&self, i: usize) -> Result<Univariate> {
        if i >= self.dim() {
            return Err(LinopError::InvalidArgument(format!(
                "component {i} out of range for a {}-dimensional normal",
                self.dim()
            )));
        }
        let mut e = DVector::zeros(self.dim());
        e[i] = 1.0;
        let variance = self.cov.matvec(&e)?[i];
        Univariate::new(self.mean[i], variance.sqrt()).map_err(statistics_error)
    }
}

impl RandomVariable {
    pub fn dim(&self) -> usize {
        match self {
            RandomVariable::Constant(c) => c.dim(),
            RandomVariable::Normal(n) => n.dim(),
        }
    }

    pub fn mean(&self) -> DVector<f64> {
        match self {
            RandomVariable::Constant(c) => c.support.clone(),
            RandomVariable::Normal(n) => n.mean.clone(),
        }
    }

    /// Dense covariance; zeros for constants
    pub fn cov(&self) -> Result<DMatrix<f64>> {
        match self {
            RandomVariable::Constant(c) => Ok(DMatrix::zeros(c.dim(), c.dim())),
            RandomVariable::Normal(n) => n.cov.todense(),
        }
    }

    /// Marginal variances
    pub fn var(&self) -> Result<DVector<f64>> {
        Ok(self.cov()?.diagonal())
    }

    /// Marginal standard deviations
    pub fn std(&self) -> Result<DVector<f64>> {
        Ok(self.var()?.map(f64::sqrt))
    }

    /// `n` draws as the columns of a `dim × n` matrix
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<DMatrix<f64>> {
        match self {
            RandomVariable::Constant(c) => Ok(DMatrix::from_fn(c.dim(), n, |i, _| c.support[i])),
            RandomVariable::Normal(normal) => normal.sample(rng, n),
        }
    }
}

impl From<Constant> for RandomVariable {
    fn from(c: Constant) -> Self {
        RandomVariable::Constant(c)
    }
}

impl From<Normal> for RandomVariable {
    fn from(n: Normal) -> Self {
        RandomVariable::Normal(n)
    }
}

impl LinearOperator {
    /// Push a random variable forward through this operator
    pub fn apply_rv(&self, rv: &RandomVariable) -> Result<RandomVariable> {
        match rv {
            RandomVariable::Constant(c) => Ok(Constant::new(self.matvec(&c.support)?).into()),
            RandomVariable::Normal(n) => Ok(n.transform(self)?.into()),
        }
    }
}
