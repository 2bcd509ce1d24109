//! Operator file header definitions
//!
//! A file starts with a fixed 96-byte little-endian header followed by
//! 8-byte aligned arrays (values, indices, pointers).

use core::mem::size_of;

use crate::dtype::DataType;
use crate::error::{CoreError, Result};
use crate::format::constants::MAX_DIMENSION;
use crate::properties::MatrixProperties;

/// Fixed-size header for operator files
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinopHeader {
    /// Magic bytes: "LNOP"
    pub magic: [u8; 4],
    /// Format version
    pub version: u8,
    /// Storage format (Dense=0, CSR=1)
    pub format_type: u8,
    /// Data type (f32=0, f64=1, i32=2, ...)
    pub data_type: u8,
    /// Structure flags (see `MatrixProperties::to_flags`)
    pub structure_flags: u8,
    /// Number of rows
    pub nrows: u64,
    /// Number of columns
    pub ncols: u64,
    /// Number of stored elements
    pub nnz: u64,
    /// Offset to values array from file start
    pub values_offset: u64,
    /// Size of values array in bytes
    pub values_size: u64,
    /// Offset to column index array (CSR only)
    pub indices_offset: u64,
    /// Size of column index array in bytes
    pub indices_size: u64,
    /// Offset to row pointer array (CSR only)
    pub pointers_offset: u64,
    /// Size of row pointer array in bytes
    pub pointers_size: u64,
    /// Reserved space for future extensions
    pub reserved: [u8; 16],
}

impl LinopHeader {
    /// Magic bytes for operator files
    pub const MAGIC: [u8; 4] = *b"LNOP";

    /// Current format version
    pub const VERSION: u8 = 1;

    /// Size of the header in bytes
    pub const SIZE: usize = size_of::<Self>();

    /// Create a new header with default values
    pub const fn new() -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            format_type: 0,
            data_type: 0,
            structure_flags: 0,
            nrows: 0,
            ncols: 0,
            nnz: 0,
            values_offset: 0,
            values_size: 0,
            indices_offset: 0,
            indices_size: 0,
            pointers_offset: 0,
            pointers_size: 0,
            reserved: [0; 16],
        }
    }

    /// Validate the header magic and version
    pub fn is_valid(&self) -> bool {
        self.magic == Self::MAGIC && self.version <= Self::VERSION
    }

    /// Typed storage format, if the tag is known
    pub const fn storage_format(&self) -> Option<StorageFormat> {
        StorageFormat::from_u8(self.format_type)
    }

    /// Typed data type, if the tag is known
    pub const fn dtype(&self) -> Option<DataType> {
        DataType::from_u8(self.data_type)
    }

    pub const fn properties(&self) -> MatrixProperties {
        MatrixProperties::from_flags(self.structure_flags)
    }

    /// Parse header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(CoreError::InsufficientBuffer);
        }

        if bytes[0..4] != Self::MAGIC {
            return Err(CoreError::InvalidHeader);
        }

        let version = bytes[4];
        if version > Self::VERSION {
            return Err(CoreError::UnsupportedFormat);
        }

        let format_type = bytes[5];
        if StorageFormat::from_u8(format_type).is_none() {
            return Err(CoreError::UnsupportedFormat);
        }

        let data_type = bytes[6];
        if DataType::from_u8(data_type).is_none() {
            return Err(CoreError::UnsupportedDataType);
        }

        let structure_flags = bytes[7];

        let mut fields = [0u64; 9];
        for (i, field) in fields.iter_mut().enumerate() {
            let start = 8 + i * 8;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[start..start + 8]);
            *field = u64::from_le_bytes(raw);
        }

        let [nrows, ncols, nnz, values_offset, values_size, indices_offset, indices_size, pointers_offset, pointers_size] =
            fields;

        if nrows > MAX_DIMENSION || ncols > MAX_DIMENSION {
            return Err(CoreError::ArraySizeOverflow);
        }

        let mut reserved = [0u8; 16];
        reserved.copy_from_slice(&bytes[80..96]);

        Ok(Self {
            magic: Self::MAGIC,
            version,
            format_type,
            data_type,
            structure_flags,
            nrows,
            ncols,
            nnz,
            values_offset,
            values_size,
            indices_offset,
            indices_size,
            pointers_offset,
            pointers_size,
            reserved,
        })
    }

    /// Convert header to bytes array (no-std compatible)
    pub fn to_bytes_array(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];

        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes[5] = self.format_type;
        bytes[6] = self.data_type;
        bytes[7] = self.structure_flags;

        let fields = [
            self.nrows,
            self.ncols,
            self.nnz,
            self.values_offset,
            self.values_size,
            self.indices_offset,
            self.indices_size,
            self.pointers_offset,
            self.pointers_size,
        ];
        for (i, field) in fields.iter().enumerate() {
            let start = 8 + i * 8;
            bytes[start..start + 8].copy_from_slice(&field.to_le_bytes());
        }

        bytes[80..96].copy_from_slice(&self.reserved);
        bytes
    }

    /// Convert header to bytes (requires alloc feature)
    #[cfg(feature = "alloc")]
    pub fn to_bytes(&self) -> alloc::vec::Vec<u8> {
        self.to_bytes_array().to_vec()
    }
}

impl Default for LinopHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage layouts an operator file can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum StorageFormat {
    /// Row-major dense array
    Dense = 0,
    /// Compressed Sparse Row (CSR) format
    Csr = 1,
}

impl StorageFormat {
    /// Convert from u8 representation
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageFormat::Dense),
            1 => Some(StorageFormat::Csr),
            _ => None,
        }
    }

    /// Convert to u8 representation
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

impl core::fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageFormat::Dense => write!(f, "dense"),
            StorageFormat::Csr => write!(f, "CSR"),
        }
    }
}
