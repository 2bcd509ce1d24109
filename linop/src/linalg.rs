//! Dense fallbacks for derived quantities
//!
//! Operators that cannot compute a quantity structurally fall back to these
//! routines, which work on the dense materialization (or on products with
//! unit vectors for the trace).

use crate::error::{LinopError, Result};
use crate::operator::LinearOperator;
use crate::operators::Matrix;
use linop_core::Property;
use log::debug;
use nalgebra::{Complex, DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Matrix norm used by condition numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormOrd {
    /// Largest singular value
    #[default]
    Two,
    /// Smallest singular value
    NegTwo,
    /// Maximum absolute column sum
    One,
    /// Minimum absolute column sum
    NegOne,
    /// Maximum absolute row sum
    Inf,
    /// Minimum absolute row sum
    NegInf,
    /// Frobenius norm
    Fro,
}

impl NormOrd {
    /// The norm whose value on `Aᵀ` equals this norm on `A`
    pub fn transposed(self) -> Self {
        match self {
            NormOrd::One => NormOrd::Inf,
            NormOrd::Inf => NormOrd::One,
            NormOrd::NegOne => NormOrd::NegInf,
            NormOrd::NegInf => NormOrd::NegOne,
            other => other,
        }
    }

    /// Evaluate the norm on a dense matrix
    pub fn norm(self, a: &DMatrix<f64>) -> f64 {
        let column_sums = || a.column_iter().map(|c| c.iter().map(|v| v.abs()).sum::<f64>());
        let row_sums = || a.row_iter().map(|r| r.iter().map(|v| v.abs()).sum::<f64>());

        match self {
            NormOrd::Two => singular_values(a).iter().copied().fold(0.0, f64::max),
            NormOrd::NegTwo => singular_values(a)
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min),
            NormOrd::One => column_sums().fold(0.0, f64::max),
            NormOrd::NegOne => column_sums().fold(f64::INFINITY, f64::min),
            NormOrd::Inf => row_sums().fold(0.0, f64::max),
            NormOrd::NegInf => row_sums().fold(f64::INFINITY, f64::min),
            NormOrd::Fro => a.norm(),
        }
    }
}

impl fmt::Display for NormOrd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NormOrd::Two => "2",
            NormOrd::NegTwo => "-2",
            NormOrd::One => "1",
            NormOrd::NegOne => "-1",
            NormOrd::Inf => "inf",
            NormOrd::NegInf => "-inf",
            NormOrd::Fro => "fro",
        };
        f.write_str(name)
    }
}

impl FromStr for NormOrd {
    type Err = LinopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2" | "two" => Ok(NormOrd::Two),
            "-2" => Ok(NormOrd::NegTwo),
            "1" | "one" => Ok(NormOrd::One),
            "-1" => Ok(NormOrd::NegOne),
            "inf" => Ok(NormOrd::Inf),
            "-inf" => Ok(NormOrd::NegInf),
            "fro" | "frobenius" => Ok(NormOrd::Fro),
            other => Err(LinopError::InvalidArgument(format!(
                "unknown matrix norm `{other}`"
            ))),
        }
    }
}

fn singular_values(a: &DMatrix<f64>) -> DVector<f64> {
    if a.is_empty() {
        return DVector::zeros(0);
    }
    a.singular_values()
}

/// `A · I`, one product with the identity of the input dimension
pub(crate) fn todense(this: &LinearOperator) -> Result<DMatrix<f64>> {
    debug!("Materializing {this} through a product with the identity");
    this.matmat(&DMatrix::identity(this.ncols(), this.ncols()))
}

/// Numerical rank from the singular values
pub(crate) fn rank(this: &LinearOperator) -> Result<usize> {
    debug!("Computing rank of {this} from a dense SVD");
    let dense = this.todense()?;
    let sv = singular_values(&dense);
    let sigma_max = sv.iter().copied().fold(0.0, f64::max);
    let tol = sigma_max * (this.nrows().max(this.ncols()) as f64) * f64::EPSILON;
    Ok(sv.iter().filter(|&&s| s > tol).count())
}

pub(crate) fn eigvals(this: &LinearOperator) -> Result<DVector<Complex<f64>>> {
    let dense = this.todense()?;
    if this.property(Property::Symmetric) == Some(true) {
        debug!("Using the symmetric eigensolver for {this}");
        let values = dense.symmetric_eigenvalues();
        return Ok(values.map(|v| Complex::new(v, 0.0)));
    }
    debug!("Using the general eigensolver for {this}");
    Ok(dense.complex_eigenvalues())
}

/// Condition number; singular operators have condition `+∞`
pub(crate) fn cond(this: &LinearOperator, p: NormOrd) -> Result<f64> {
    debug!("Computing {p}-condition number of {this} densely");
    let dense = this.todense()?;

    match p {
        NormOrd::Two | NormOrd::NegTwo => {
            let sv = singular_values(&dense);
            let sigma_max = sv.iter().copied().fold(0.0, f64::max);
            let sigma_min = sv.iter().copied().fold(f64::INFINITY, f64::min);
            if sigma_min == 0.0 {
                return Ok(f64::INFINITY);
            }
            Ok(match p {
                NormOrd::Two => sigma_max / sigma_min,
                _ => sigma_min / sigma_max,
            })
        }
        _ => match dense.clone().try_inverse() {
            Some(inverse) => Ok(p.norm(&dense) * p.norm(&inverse)),
            None => Ok(f64::INFINITY),
        },
    }
}

pub(crate) fn det(this: &LinearOperator) -> Result<f64> {
    debug!("Computing determinant of {this} from a dense LU");
    Ok(this.todense()?.lu().determinant())
}

pub(crate) fn logabsdet(this: &LinearOperator) -> Result<f64> {
    let det = this.det()?;
    if det == 0.0 {
        return Ok(f64::NEG_INFINITY);
    }
    Ok(det.abs().ln())
}

/// Sum of `(A eᵢ)ᵢ`, one unit vector at a time
pub(crate) fn trace(this: &LinearOperator) -> Result<f64> {
    debug!("Probing trace of {this} with unit vectors");
    let n = this.nrows();
    let mut unit = DVector::zeros(n);
    let mut trace = 0.0;
    for i in 0..n {
        unit[i] = 1.0;
        trace += this.matvec(&unit)?[i];
        unit[i] = 0.0;
    }
    Ok(this.dtype().cast(trace))
}

/// Lower Cholesky factor of the dense matrix
pub(crate) fn cholesky(this: &LinearOperator) -> Result<LinearOperator> {
    debug!("Computing dense Cholesky factor of {this}");
    let dense = this.todense()?;
    let factor = nalgebra::Cholesky::new(dense).ok_or_else(|| {
        LinopError::LinAlg("Cholesky decomposition failed: matrix is not positive definite".into())
    })?;
    let lower = Matrix::dense_with_dtype(factor.l(), this.dtype().inexact());
    lower.set_property(Property::LowerTriangular, Some(true))?;
    Ok(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_norms() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, -2.0, 3.0, 4.0]);
        assert_relative_eq!(NormOrd::One.norm(&a), 6.0);
        assert_relative_eq!(NormOrd::NegOne.norm(&a), 4.0);
        assert_relative_eq!(NormOrd::Inf.norm(&a), 7.0);
        assert_relative_eq!(NormOrd::NegInf.norm(&a), 3.0);
        assert_relative_eq!(NormOrd::Fro.norm(&a), 30f64.sqrt());
    }

    #[test]
    fn test_norm_parsing() {
        assert_eq!("fro".parse::<NormOrd>().unwrap(), NormOrd::Fro);
        assert_eq!("-inf".parse::<NormOrd>().unwrap(), NormOrd::NegInf);
        assert_eq!("2".parse::<NormOrd>().unwrap(), NormOrd::Two);
        assert!("nuc".parse::<NormOrd>().is_err());
        for p in [NormOrd::NegTwo, NormOrd::One, NormOrd::Inf] {
            assert_eq!(p.to_string().parse::<NormOrd>().unwrap(), p);
        }
    }

    #[test]
    fn test_transposed_norms() {
        assert_eq!(NormOrd::One.transposed(), NormOrd::Inf);
        assert_eq!(NormOrd::NegInf.transposed(), NormOrd::NegOne);
        assert_eq!(NormOrd::Fro.transposed(), NormOrd::Fro);
    }

    #[test]
    fn test_fallback_rank_and_trace() {
        let a = Matrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0])
            .unwrap();
        assert_eq!(rank(&a).unwrap(), 2);
        assert_relative_eq!(trace(&a).unwrap(), 6.0);
    }

    #[test]
    fn test_fallback_cond_singular() {
        let a = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]).unwrap();
        assert_eq!(cond(&a, NormOrd::Two).unwrap(), f64::INFINITY);
        assert_eq!(cond(&a, NormOrd::One).unwrap(), f64::INFINITY);
        assert_eq!(logabsdet(&a).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_fallback_cond_diagonal() {
        let a = Matrix::dense(DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 2.0])));
        assert_relative_eq!(cond(&a, NormOrd::Two).unwrap(), 2.0);
        assert_relative_eq!(cond(&a, NormOrd::NegTwo).unwrap(), 0.5);
        assert_relative_eq!(cond(&a, NormOrd::Inf).unwrap(), 2.0);
        assert_relative_eq!(det(&a).unwrap(), 8.0);
    }
}
