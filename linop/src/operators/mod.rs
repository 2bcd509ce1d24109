//! Concrete operator behaviours
//!
//! - [`Matrix`]: explicit dense or CSR arrays
//! - [`FnOperator`]: matrix-free operators built from closures
//! - [`Identity`], [`Selection`], [`Embedding`]: structured operators
//! - [`Transposed`], [`Inverse`], [`TypeCast`]: lazy unary wrappers

pub mod function;
pub mod identity;
pub mod inverse;
pub mod matrix;
pub mod selection;
pub mod transposed;
pub mod typecast;

pub use function::{broadcast_matvec, broadcast_rmatvec, FnOperator, OperatorBuilder};
pub use identity::Identity;
pub use inverse::Inverse;
pub use matrix::{Matrix, Storage};
pub use selection::{Embedding, Selection};
pub use transposed::Transposed;
pub use typecast::TypeCast;
