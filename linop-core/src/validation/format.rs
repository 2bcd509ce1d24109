//! Layout validation for operator files

use crate::error::CoreError;

/// Align an offset to a specific boundary
///
/// `boundary` must be a power of two.
pub const fn align_to_boundary(offset: usize, boundary: usize) -> usize {
    (offset + boundary - 1) & !(boundary - 1)
}

/// Align an offset to the 8-byte boundary used for every array
pub const fn align_to_8(offset: usize) -> usize {
    align_to_boundary(offset, 8)
}

/// Validate that an offset is properly aligned
pub const fn validate_offset_alignment(offset: usize, boundary: usize) -> Result<(), CoreError> {
    if offset % boundary != 0 {
        return Err(CoreError::ArrayAlignment);
    }
    Ok(())
}

/// Validate the array sizes recorded for a dense payload
pub const fn validate_dense_layout(
    nrows: u64,
    ncols: u64,
    values_size: u64,
    element_size: usize,
) -> Result<(), CoreError> {
    let expected = match nrows.checked_mul(ncols) {
        Some(count) => match count.checked_mul(element_size as u64) {
            Some(bytes) => bytes,
            None => return Err(CoreError::ArraySizeOverflow),
        },
        None => return Err(CoreError::ArraySizeOverflow),
    };

    if expected != values_size {
        return Err(CoreError::DimensionMismatch);
    }
    Ok(())
}

/// Validate the array sizes recorded for a CSR payload
pub const fn validate_csr_layout(
    nrows: u64,
    nnz: u64,
    values_size: u64,
    indices_size: u64,
    pointers_size: u64,
    element_size: usize,
) -> Result<(), CoreError> {
    let values = match nnz.checked_mul(element_size as u64) {
        Some(bytes) => bytes,
        None => return Err(CoreError::ArraySizeOverflow),
    };
    let indices = match nnz.checked_mul(8) {
        Some(bytes) => bytes,
        None => return Err(CoreError::ArraySizeOverflow),
    };
    let pointers = match nrows.checked_add(1) {
        Some(count) => match count.checked_mul(8) {
            Some(bytes) => bytes,
            None => return Err(CoreError::ArraySizeOverflow),
        },
        None => return Err(CoreError::ArraySizeOverflow),
    };

    if values != values_size || indices != indices_size || pointers != pointers_size {
        return Err(CoreError::DimensionMismatch);
    }
    Ok(())
}
