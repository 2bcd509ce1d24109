//! Validation utilities
//!
//! Pure validation functions with no I/O dependencies: typed array views,
//! file layout, argument parsing and shape algebra.

pub mod bounds;
pub mod format;
pub mod parsing;
pub mod shape;

pub use bounds::{validate_alignment, validate_array_bounds, validate_region};
pub use format::{align_to_8, align_to_boundary, validate_csr_layout, validate_dense_layout};
pub use parsing::parse_range;
pub use shape::{
    normalize_axis, validate_indices, validate_matmul, validate_same_shape, validate_square,
};
