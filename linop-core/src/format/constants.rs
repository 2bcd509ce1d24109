//! Format constants and magic bytes for operator files

/// Default alignment boundary for all arrays in a file
pub const ALIGNMENT_BOUNDARY: usize = 8;

/// Largest dimension accepted when parsing a header
pub const MAX_DIMENSION: u64 = 1 << 40;

/// Structure flags for matrix properties (value bits, low nibble)
pub const SYMMETRIC: u8 = 1;
pub const UPPER_TRIANGULAR: u8 = 2;
pub const LOWER_TRIANGULAR: u8 = 4;
pub const POSITIVE_DEFINITE: u8 = 8;

/// Shift applied to a value bit to obtain its "known" bit (high nibble)
pub const KNOWN_SHIFT: u8 = 4;
