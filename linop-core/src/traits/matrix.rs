//! Core matrix abstraction traits
//!
//! These are the storage-level interfaces explicit matrices provide,
//! independent of the operator engine built on top of them.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Core sparse matrix trait for format-agnostic access
///
/// This trait provides the minimal interface that all sparse matrix
/// implementations must provide, regardless of storage layout.
pub trait SparseMatrix {
    /// The element type stored in this matrix
    type Element: Copy;

    /// Get an element at the specified position
    ///
    /// Returns `None` if the element is zero (not stored) or if the
    /// position is out of bounds.
    fn get_element(&self, row: usize, col: usize) -> Option<Self::Element>;

    /// Get matrix dimensions as (rows, cols)
    fn dimensions(&self) -> (usize, usize);

    /// Get number of non-zero elements stored
    fn nnz(&self) -> usize;

    /// Fraction of entries that are stored
    fn density(&self) -> f64 {
        let (rows, cols) = self.dimensions();
        if rows == 0 || cols == 0 {
            0.0
        } else {
            self.nnz() as f64 / (rows as f64 * cols as f64)
        }
    }
}

/// Extension trait for row/column operations (requires alloc feature)
#[cfg(feature = "alloc")]
pub trait MatrixOperations: SparseMatrix {
    /// Get all stored elements in a row as `(column, value)` pairs,
    /// in column order.
    fn get_row(&self, row_index: usize) -> Vec<(usize, Self::Element)>;

    /// Get all stored elements in a column as `(row, value)` pairs,
    /// in row order.
    fn get_col(&self, col_index: usize) -> Vec<(usize, Self::Element)>;
}
