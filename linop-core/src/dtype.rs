//! Element data types, promotion and casting rules
//!
//! Operators carry their entries as `f64`; a [`DataType`] records the nominal
//! element type an operator stands for and governs how values are rounded
//! when they are materialized or cast.

/// Data types an operator can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum DataType {
    /// 32-bit floating point
    F32 = 0,
    /// 64-bit floating point
    F64 = 1,
    /// 32-bit signed integer
    I32 = 2,
    /// 64-bit signed integer
    I64 = 3,
    /// 32-bit unsigned integer
    U32 = 4,
    /// 64-bit unsigned integer
    U64 = 5,
}

/// Broad numeric category of a [`DataType`]
///
/// Ordered from lowest to highest: casting "upwards" never loses the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    UnsignedInt,
    SignedInt,
    Float,
}

/// Rules controlling which casts [`can_cast`] accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Casting {
    /// Only identical types
    No,
    /// Only identical types (byte order is always native here)
    Equiv,
    /// Only casts that preserve every value
    Safe,
    /// Safe casts or casts within/upwards of a kind
    SameKind,
    /// Any cast
    #[default]
    Unsafe,
}

impl DataType {
    /// Convert from u8 representation
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DataType::F32),
            1 => Some(DataType::F64),
            2 => Some(DataType::I32),
            3 => Some(DataType::I64),
            4 => Some(DataType::U32),
            5 => Some(DataType::U64),
            _ => None,
        }
    }

    /// Convert to u8 representation
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get the size in bytes for this data type
    pub const fn size_bytes(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
        }
    }

    pub const fn kind(self) -> Kind {
        match self {
            DataType::F32 | DataType::F64 => Kind::Float,
            DataType::I32 | DataType::I64 => Kind::SignedInt,
            DataType::U32 | DataType::U64 => Kind::UnsignedInt,
        }
    }

    /// Whether values of this type are floating point
    pub const fn is_inexact(self) -> bool {
        matches!(self.kind(), Kind::Float)
    }

    /// The floating-point type used for quantities derived from this type
    /// (determinants, eigenvalues, inverses)
    pub const fn inexact(self) -> Self {
        if self.is_inexact() {
            self
        } else {
            DataType::F64
        }
    }

    /// Round `value` to the nearest representable value of this type.
    ///
    /// Integer types truncate toward zero and saturate at their bounds;
    /// NaN maps to zero.
    pub fn cast(self, value: f64) -> f64 {
        match self {
            DataType::F64 => value,
            DataType::F32 => value as f32 as f64,
            DataType::I32 => value as i32 as f64,
            DataType::I64 => value as i64 as f64,
            DataType::U32 => value as u32 as f64,
            DataType::U64 => value as u64 as f64,
        }
    }

    /// Parse a type name such as `"f64"` or `"i32"`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "f32" | "float32" => Some(DataType::F32),
            "f64" | "float64" | "double" => Some(DataType::F64),
            "i32" | "int32" => Some(DataType::I32),
            "i64" | "int64" => Some(DataType::I64),
            "u32" | "uint32" => Some(DataType::U32),
            "u64" | "uint64" => Some(DataType::U64),
            _ => None,
        }
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::F64
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DataType::F32 => write!(f, "f32"),
            DataType::F64 => write!(f, "f64"),
            DataType::I32 => write!(f, "i32"),
            DataType::I64 => write!(f, "i64"),
            DataType::U32 => write!(f, "u32"),
            DataType::U64 => write!(f, "u64"),
        }
    }
}

/// Smallest type both operands promote to
pub fn result_type(a: DataType, b: DataType) -> DataType {
    use DataType::*;

    if a == b {
        return a;
    }

    match (a.kind(), b.kind()) {
        (Kind::Float, Kind::Float) => F64,
        (Kind::Float, _) | (_, Kind::Float) => F64,
        (Kind::SignedInt, Kind::SignedInt) | (Kind::UnsignedInt, Kind::UnsignedInt) => {
            if a.size_bytes() >= b.size_bytes() {
                a
            } else {
                b
            }
        }
        // mixed signedness
        _ => {
            let (signed, unsigned) = if a.kind() == Kind::SignedInt {
                (a, b)
            } else {
                (b, a)
            };
            match (signed, unsigned) {
                (_, U64) => F64,
                _ => I64,
            }
        }
    }
}

/// Whether a value of type `from` may be cast to `to` under `casting`
pub fn can_cast(from: DataType, to: DataType, casting: Casting) -> bool {
    use DataType::*;

    if from == to {
        return true;
    }

    let safe = matches!(
        (from, to),
        (F32, F64)
            | (I32, I64)
            | (I32, F64)
            | (I64, F64)
            | (U32, U64)
            | (U32, I64)
            | (U32, F64)
            | (U64, F64)
    );

    match casting {
        Casting::No | Casting::Equiv => false,
        Casting::Safe => safe,
        Casting::SameKind => safe || from.kind() <= to.kind(),
        Casting::Unsafe => true,
    }
}
