//! Structural matrix properties
//!
//! Each property is tri-state: `None` means unknown. A property can be
//! learned once (unknown -> true/false) but never changed afterwards.

use crate::error::{CoreError, Result};
use crate::format::constants::{
    KNOWN_SHIFT, LOWER_TRIANGULAR, POSITIVE_DEFINITE, SYMMETRIC, UPPER_TRIANGULAR,
};

/// Names of the tracked properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Property {
    Symmetric,
    LowerTriangular,
    UpperTriangular,
    PositiveDefinite,
}

impl Property {
    pub const ALL: [Property; 4] = [
        Property::Symmetric,
        Property::LowerTriangular,
        Property::UpperTriangular,
        Property::PositiveDefinite,
    ];

    /// Bit used for this property in the structure-flag byte
    pub const fn flag(self) -> u8 {
        match self {
            Property::Symmetric => SYMMETRIC,
            Property::UpperTriangular => UPPER_TRIANGULAR,
            Property::LowerTriangular => LOWER_TRIANGULAR,
            Property::PositiveDefinite => POSITIVE_DEFINITE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Property::Symmetric => "symmetric",
            Property::LowerTriangular => "lower_triangular",
            Property::UpperTriangular => "upper_triangular",
            Property::PositiveDefinite => "positive_definite",
        }
    }
}

impl core::fmt::Display for Property {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tri-state property flags of one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixProperties {
    symmetric: Option<bool>,
    lower_triangular: Option<bool>,
    upper_triangular: Option<bool>,
    positive_definite: Option<bool>,
}

impl MatrixProperties {
    /// Flags for an operator of the given shape; non-square operators are
    /// known not to be symmetric.
    pub const fn for_shape(shape: (usize, usize)) -> Self {
        let symmetric = if shape.0 == shape.1 { None } else { Some(false) };
        Self {
            symmetric,
            lower_triangular: None,
            upper_triangular: None,
            positive_definite: None,
        }
    }

    /// Flags from explicit values.
    ///
    /// No admissibility checks are made; see [`MatrixProperties::is_admissible`].
    pub const fn new(
        symmetric: Option<bool>,
        lower_triangular: Option<bool>,
        upper_triangular: Option<bool>,
        positive_definite: Option<bool>,
    ) -> Self {
        Self {
            symmetric,
            lower_triangular,
            upper_triangular,
            positive_definite,
        }
    }

    /// Flags of the transposed operator: triangularity swaps sides
    pub const fn transposed(&self) -> Self {
        Self {
            symmetric: self.symmetric,
            lower_triangular: self.upper_triangular,
            upper_triangular: self.lower_triangular,
            positive_definite: self.positive_definite,
        }
    }

    /// Whether these flags could have been reached through [`MatrixProperties::set`]
    pub const fn is_admissible(&self, shape: (usize, usize)) -> bool {
        let square = shape.0 == shape.1;
        if !square && !matches!(self.symmetric, Some(false)) {
            return false;
        }
        !matches!(self.positive_definite, Some(true)) || matches!(self.symmetric, Some(true))
    }

    pub const fn get(&self, property: Property) -> Option<bool> {
        match property {
            Property::Symmetric => self.symmetric,
            Property::LowerTriangular => self.lower_triangular,
            Property::UpperTriangular => self.upper_triangular,
            Property::PositiveDefinite => self.positive_definite,
        }
    }

    /// Record a property value.
    ///
    /// `is_square` is needed to reject symmetric operators of non-square
    /// shape. Setting a value equal to the current one is a no-op.
    pub fn set(&mut self, property: Property, value: Option<bool>, is_square: bool) -> Result<()> {
        if property == Property::Symmetric && value == Some(true) && !is_square {
            return Err(CoreError::InvalidProperty);
        }

        if property == Property::PositiveDefinite
            && value == Some(true)
            && self.symmetric != Some(true)
        {
            return Err(CoreError::InvalidProperty);
        }

        let slot = match property {
            Property::Symmetric => &mut self.symmetric,
            Property::LowerTriangular => &mut self.lower_triangular,
            Property::UpperTriangular => &mut self.upper_triangular,
            Property::PositiveDefinite => &mut self.positive_definite,
        };

        if *slot == value {
            return Ok(());
        }

        if slot.is_some() {
            return Err(CoreError::PropertyConflict);
        }

        *slot = value;
        Ok(())
    }

    /// Encode into a structure-flag byte: low nibble holds values, high
    /// nibble marks which values are known.
    pub const fn to_flags(&self) -> u8 {
        let mut flags = 0u8;
        let mut i = 0;
        while i < Property::ALL.len() {
            let property = Property::ALL[i];
            if let Some(value) = self.get(property) {
                flags |= property.flag() << KNOWN_SHIFT;
                if value {
                    flags |= property.flag();
                }
            }
            i += 1;
        }
        flags
    }

    /// Decode a structure-flag byte written by [`MatrixProperties::to_flags`]
    pub const fn from_flags(flags: u8) -> Self {
        const fn decode(flags: u8, bit: u8) -> Option<bool> {
            if flags & (bit << KNOWN_SHIFT) == 0 {
                None
            } else {
                Some(flags & bit != 0)
            }
        }

        Self {
            symmetric: decode(flags, SYMMETRIC),
            lower_triangular: decode(flags, LOWER_TRIANGULAR),
            upper_triangular: decode(flags, UPPER_TRIANGULAR),
            positive_definite: decode(flags, POSITIVE_DEFINITE),
        }
    }
}
