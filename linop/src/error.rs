//! Error types for the operator engine

use linop_core::{Casting, CoreError, DataType, Property};
use thiserror::Error;

/// Errors raised while building, applying or analysing linear operators
#[derive(Debug, Error)]
pub enum LinopError {
    /// Operand dimensions do not match the operator
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Operand dimension along an application axis does not match
    #[error("Dimension mismatch along axis {axis}: expected {expected}, got {got}")]
    AxisMismatch {
        axis: usize,
        expected: usize,
        got: usize,
    },

    /// Operation is only defined for square operators
    #[error("Operator of shape {0:?} is not square")]
    NotSquare((usize, usize)),

    /// Numerical failure (singular matrix, failed factorization)
    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    /// A known property flag was asked to change
    #[error("Property `{property}` conflicts with its current value")]
    PropertyConflict { property: Property },

    /// A property flag is not admissible for this operator
    #[error("Property `{property}` is not admissible: {reason}")]
    InvalidProperty {
        property: Property,
        reason: &'static str,
    },

    /// Cast rejected by the casting rule
    #[error("Cannot cast from {from} to {to} under the {casting:?} rule")]
    Cast {
        from: DataType,
        to: DataType,
        casting: Casting,
    },

    /// Invalid axis specification
    #[error("Invalid axes: {0}")]
    Axis(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl LinopError {
    pub(crate) fn singular() -> Self {
        LinopError::LinAlg("Matrix is singular".to_string())
    }

    /// Attach the property name to a core flag error
    pub(crate) fn from_property(property: Property, err: CoreError) -> Self {
        match err {
            CoreError::PropertyConflict => LinopError::PropertyConflict { property },
            CoreError::InvalidProperty => LinopError::InvalidProperty {
                property,
                reason: match property {
                    Property::Symmetric => "only square operators can be symmetric",
                    Property::PositiveDefinite => {
                        "positive definite operators must be symmetric"
                    }
                    _ => "not admissible for this operator",
                },
            },
            other => LinopError::Core(other),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, LinopError>;
