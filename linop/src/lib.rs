//! linop - Finite-dimensional linear operators
//!
//! This library represents matrices explicitly (dense or CSR) or implicitly
//! (through their action on vectors) behind one shared handle, composes them
//! lazily and pushes random variables through them.
//!
//! ## Architecture
//!
//! - **linop-core**: data types, property flags, shape checks and the file
//!   header (no I/O, no numerics)
//! - **linop**: the operator engine, dense and sparse numerics, file I/O and
//!   the `linop` command line tool
//!
//! ## Quick Start
//!
//! ```rust
//! use linop::{LinearOperator, Matrix, NormOrd, Normal, RandomVariable};
//! use linop_core::DataType;
//! use nalgebra::{DMatrix, DVector};
//!
//! fn example() -> linop::Result<()> {
//!     let a = Matrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0])?;
//!     let b = (&(&a * 2.0) + &LinearOperator::identity(2, DataType::F64))?;
//!
//!     let y = b.matvec(&DVector::from_vec(vec![1.0, 1.0]))?;
//!     assert_eq!(y.as_slice(), &[7.0, 9.0]);
//!     println!("cond = {}", b.cond(NormOrd::Two)?);
//!
//!     let x: RandomVariable = Normal::from_dense(DVector::zeros(2), DMatrix::identity(2, 2))?.into();
//!     let z = a.apply_rv(&x)?;
//!     assert_eq!(z.cov()?, DMatrix::from_row_slice(2, 2, &[5.0, 5.0, 5.0, 10.0]));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! ## Features
//!
//! - **Explicit and matrix-free operators**: dense, CSR, closures, identity,
//!   row selection and embedding
//! - **Lazy algebra**: sums, scalar multiples, products, transposes,
//!   inverses and type casts share their operands
//! - **Cached derived quantities**: rank, eigenvalues, condition numbers,
//!   determinants, traces and Cholesky factors
//! - **Random variables**: Gaussian pushforwards, sampling and densities
//! - **Operator files**: memory-mapped reading of dense and CSR matrices

// Re-export core abstractions
pub use linop_core::{
    can_cast, result_type, Casting, CoreError, DataType, Element, LinopHeader, MatrixProperties,
    Property, StorageFormat,
};

pub mod arithmetic;
pub mod config;
pub mod error;
pub mod io;
pub mod linalg;
pub mod operator;
pub mod operators;
pub mod randvars;
pub mod sparse;

// Public exports
pub use arithmetic::{Product, Scaled, Sum};
pub use config::Config;
pub use error::{LinopError, Result};
pub use io::{read_header, read_matrix, write_matrix};
pub use linalg::NormOrd;
pub use operator::{Axis, LinearOperator, Operator};
pub use operators::{
    broadcast_matvec, broadcast_rmatvec, Embedding, FnOperator, Identity, Inverse, Matrix,
    OperatorBuilder, Selection, Storage, Transposed, TypeCast,
};
pub use randvars::{Constant, Normal, RandomVariable};
pub use sparse::CsrMatrix;
