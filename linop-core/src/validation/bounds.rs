//! Array bounds and alignment validation
//!
//! Pure mathematical validation functions for typed array views with no
//! I/O dependencies.

use crate::error::CoreError;

/// Validate array bounds for a given element type
///
/// Performs mathematical validation of array size calculations with
/// overflow protection.
pub const fn validate_array_bounds<T>(byte_len: usize) -> Result<usize, CoreError> {
    let element_size = core::mem::size_of::<T>();

    if byte_len % element_size != 0 {
        return Err(CoreError::ArrayAlignment);
    }

    let count = byte_len / element_size;

    // Conservative overflow protection for downstream index arithmetic
    if count > usize::MAX / 8 {
        return Err(CoreError::ArraySizeOverflow);
    }

    Ok(count)
}

/// Validate alignment for a pointer to typed data
pub fn validate_alignment<T>(ptr: *const u8) -> Result<(), CoreError> {
    let alignment = core::mem::align_of::<T>();
    let addr = ptr as usize;

    if addr % alignment != 0 {
        return Err(CoreError::ArrayAlignment);
    }

    Ok(())
}

/// Validate that `offset..offset + size` lies within a buffer of `total` bytes
pub const fn validate_region(offset: u64, size: u64, total: usize) -> Result<(), CoreError> {
    let end = match offset.checked_add(size) {
        Some(end) => end,
        None => return Err(CoreError::ArraySizeOverflow),
    };

    if end > total as u64 {
        return Err(CoreError::IndexOutOfBounds);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_array_bounds() {
        assert_eq!(validate_array_bounds::<u32>(16), Ok(4));
        assert_eq!(validate_array_bounds::<u64>(24), Ok(3));

        assert_eq!(
            validate_array_bounds::<u32>(15),
            Err(CoreError::ArrayAlignment)
        );
        assert_eq!(
            validate_array_bounds::<f64>(23),
            Err(CoreError::ArrayAlignment)
        );

        // Empty arrays are valid
        assert_eq!(validate_array_bounds::<u32>(0), Ok(0));
    }

    #[test]
    fn test_validate_alignment() {
        let aligned_data: [u64; 4] = [0; 4];
        let ptr = aligned_data.as_ptr() as *const u8;

        assert_eq!(validate_alignment::<u64>(ptr), Ok(()));
        assert_eq!(validate_alignment::<u32>(ptr), Ok(()));

        let unaligned_ptr = ptr.wrapping_add(1);
        assert_eq!(
            validate_alignment::<u64>(unaligned_ptr),
            Err(CoreError::ArrayAlignment)
        );
    }

    #[test]
    fn test_validate_region() {
        assert_eq!(validate_region(96, 32, 128), Ok(()));
        assert_eq!(validate_region(96, 33, 128), Err(CoreError::IndexOutOfBounds));
        assert_eq!(
            validate_region(u64::MAX, 2, 128),
            Err(CoreError::ArraySizeOverflow)
        );
    }
}
