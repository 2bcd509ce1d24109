//! Error types for core linear-operator definitions

/// Errors raised by the `no_std` layer (shapes, dtypes, file headers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// Operands with incompatible dimensions
    DimensionMismatch,
    /// Operation requires a square operator
    NotSquare,
    /// Invalid header format
    InvalidHeader,
    /// Unsupported format version or storage format
    UnsupportedFormat,
    /// Unknown data type tag
    UnsupportedDataType,
    /// Index out of bounds
    IndexOutOfBounds,
    /// Insufficient buffer space
    InsufficientBuffer,
    /// Array not aligned to its element size
    ArrayAlignment,
    /// Array too large for safe indexing
    ArraySizeOverflow,
    /// Malformed range or numeric literal
    InvalidRange,
    /// Matrix property flag conflicts with a previously set value
    PropertyConflict,
    /// Matrix property flag is not admissible for this operator
    InvalidProperty,
    /// Cast not permitted under the requested casting rule
    InvalidCast,
}

impl core::fmt::Display for CoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            CoreError::DimensionMismatch => "Dimension mismatch",
            CoreError::NotSquare => "Operator is not square",
            CoreError::InvalidHeader => "Invalid LNOP header",
            CoreError::UnsupportedFormat => "Unsupported format version",
            CoreError::UnsupportedDataType => "Unsupported data type",
            CoreError::IndexOutOfBounds => "Index out of bounds",
            CoreError::InsufficientBuffer => "Insufficient buffer space",
            CoreError::ArrayAlignment => "Array not aligned to element size",
            CoreError::ArraySizeOverflow => "Array size overflow",
            CoreError::InvalidRange => "Invalid range",
            CoreError::PropertyConflict => "Matrix property conflicts with its current value",
            CoreError::InvalidProperty => "Matrix property not admissible",
            CoreError::InvalidCast => "Cast not permitted",
        };
        write!(f, "{msg}")
    }
}

/// Result type for core operations
pub type Result<T> = core::result::Result<T, CoreError>;

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}
