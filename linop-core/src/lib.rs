#![cfg_attr(not(feature = "std"), no_std)]

//! linop-core - Core definitions for finite-dimensional linear operators
//!
//! This crate provides the storage-independent vocabulary shared by the
//! operator engine: element and data types, casting rules, structural
//! property flags, shape validation and the binary file header. It does no
//! I/O and no numerics.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod dtype;
pub mod error;
pub mod format;
pub mod properties;
pub mod traits;
pub mod validation;

pub use dtype::{can_cast, result_type, Casting, DataType, Kind};
pub use error::*;
pub use format::{LinopHeader, StorageFormat};
pub use properties::{MatrixProperties, Property};
pub use traits::*;
pub use validation::parse_range;
