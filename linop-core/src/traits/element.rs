//! Matrix element type constraints
//!
//! This module defines the trait that constrains what scalar types can be
//! used as entries of explicit matrices and of operator files.

use crate::dtype::DataType;

/// Trait for scalar types that can be stored as matrix entries
///
/// All element types must be:
/// - Pod: Plain old data, safe to reinterpret as bytes
/// - PartialEq: Can be compared for equality
/// - Send + Sync: Can cross thread boundaries
///
/// Operators compute in `f64`; `from_f64`/`to_f64` are the bridge between
/// typed buffers and operator arithmetic.
pub trait Element: bytemuck::Pod + PartialEq + Send + Sync + 'static {
    /// Get the DataType tag for this element type
    fn data_type() -> DataType;

    /// Get the size in bytes of this element type
    fn size_bytes() -> usize {
        core::mem::size_of::<Self>()
    }

    /// Convert from f64, truncating and saturating for integer types
    fn from_f64(value: f64) -> Self;

    /// Convert to f64 for operator arithmetic
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($type:ty, $variant:ident) => {
        impl Element for $type {
            fn data_type() -> DataType {
                DataType::$variant
            }

            fn from_f64(value: f64) -> Self {
                value as $type
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_element!(f32, F32);
impl_element!(f64, F64);
impl_element!(i32, I32);
impl_element!(i64, I64);
impl_element!(u32, U32);
impl_element!(u64, U64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_tags() {
        assert_eq!(f32::data_type(), DataType::F32);
        assert_eq!(i64::data_type(), DataType::I64);
        assert_eq!(u32::size_bytes(), 4);
        assert_eq!(u64::size_bytes(), DataType::U64.size_bytes());
    }

    #[test]
    fn test_conversions_match_dtype_cast() {
        for value in [-3.7, 0.0, 2.5, 1e10] {
            assert_eq!(i32::from_f64(value).to_f64(), DataType::I32.cast(value));
            assert_eq!(u64::from_f64(value).to_f64(), DataType::U64.cast(value));
            assert_eq!(f32::from_f64(value).to_f64(), DataType::F32.cast(value));
        }
    }
}
