//! Binary format definitions for operator files
//!
//! This module contains pure data structure definitions for the on-disk
//! layout. No I/O operations - only format specifications.

pub mod constants;
pub mod header;

pub use header::{LinopHeader, StorageFormat};
