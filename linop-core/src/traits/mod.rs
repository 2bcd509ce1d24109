//! Abstract interfaces shared by every matrix storage
//!
//! Traits are pure interfaces - no concrete implementations.

pub mod element;
pub mod matrix;

pub use element::Element;
#[cfg(feature = "alloc")]
pub use matrix::MatrixOperations;
pub use matrix::SparseMatrix;
