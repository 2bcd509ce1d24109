//! Shape compatibility checks for operator algebra

use crate::error::CoreError;

/// Operator shape as `(rows, cols)`
pub type Shape = (usize, usize);

/// `lhs @ rhs` requires `lhs.cols == rhs.rows`; returns the product shape
pub const fn validate_matmul(lhs: Shape, rhs: Shape) -> Result<Shape, CoreError> {
    if lhs.1 != rhs.0 {
        return Err(CoreError::DimensionMismatch);
    }
    Ok((lhs.0, rhs.1))
}

/// Sums require identical shapes
pub const fn validate_same_shape(lhs: Shape, rhs: Shape) -> Result<Shape, CoreError> {
    if lhs.0 != rhs.0 || lhs.1 != rhs.1 {
        return Err(CoreError::DimensionMismatch);
    }
    Ok(lhs)
}

pub const fn validate_square(shape: Shape) -> Result<usize, CoreError> {
    if shape.0 != shape.1 {
        return Err(CoreError::NotSquare);
    }
    Ok(shape.0)
}

/// Every index must address one of `bound` rows
pub fn validate_indices(indices: &[usize], bound: usize) -> Result<(), CoreError> {
    if indices.iter().any(|&index| index >= bound) {
        return Err(CoreError::IndexOutOfBounds);
    }
    Ok(())
}

/// Normalize a possibly negative axis of a 2-D object into `0..2`
pub const fn normalize_axis(axis: isize) -> Result<usize, CoreError> {
    match axis {
        0 | -2 => Ok(0),
        1 | -1 => Ok(1),
        _ => Err(CoreError::IndexOutOfBounds),
    }
}
