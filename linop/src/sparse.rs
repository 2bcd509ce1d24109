//! Compressed sparse row storage
//!
//! Column indices are sorted and unique within each row and no explicit
//! zeros are stored. Products run on the rayon pool once the matrix has at
//! least [`Config::parallel_min_rows`](crate::Config) rows.

use crate::config;
use crate::error::{LinopError, Result};
use hashbrown::HashMap;
use linop_core::{MatrixOperations, SparseMatrix};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Empty (all-zero) matrix
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            indptr: vec![0; nrows + 1],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(row, col, value)` triplets in any order
    ///
    /// Duplicate entries are summed and resulting zeros dropped.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Result<Self> {
        if let Some(&(row, col, _)) = triplets
            .iter()
            .find(|&&(row, col, _)| row >= nrows || col >= ncols)
        {
            return Err(LinopError::InvalidArgument(format!(
                "entry ({row}, {col}) is out of bounds for a {nrows}x{ncols} matrix"
            )));
        }

        let mut sorted = triplets.to_vec();
        sorted.sort_unstable_by_key(|&(row, col, _)| (row, col));

        let mut indptr = vec![0; nrows + 1];
        let mut indices = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, value) in sorted {
            if last == Some((row, col)) {
                if let Some(acc) = values.last_mut() {
                    *acc += value;
                }
                continue;
            }
            indices.push(col);
            values.push(value);
            indptr[row + 1] += 1;
            last = Some((row, col));
        }

        for row in 0..nrows {
            indptr[row + 1] += indptr[row];
        }

        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        }
        .pruned())
    }

    /// Build from raw CSR arrays, validating their structure
    pub fn from_raw_parts(
        nrows: usize,
        ncols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let invalid = |what: &str| LinopError::InvalidArgument(format!("invalid CSR arrays: {what}"));

        if indptr.len() != nrows + 1 {
            return Err(invalid("row pointer length must be rows + 1"));
        }
        if indices.len() != values.len() {
            return Err(invalid("index and value arrays differ in length"));
        }
        if indptr[0] != 0 || indptr[nrows] != values.len() {
            return Err(invalid("row pointers do not span the value array"));
        }
        if indptr.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(invalid("row pointers are not monotone"));
        }
        for row in 0..nrows {
            let cols = &indices[indptr[row]..indptr[row + 1]];
            if cols.iter().any(|&col| col >= ncols) {
                return Err(invalid("column index out of bounds"));
            }
            if cols.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(invalid("column indices not strictly increasing"));
            }
        }

        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        }
        .pruned())
    }

    pub fn from_dense(dense: &DMatrix<f64>) -> Self {
        let (nrows, ncols) = dense.shape();
        let mut indptr = Vec::with_capacity(nrows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();

        indptr.push(0);
        for row in 0..nrows {
            for col in 0..ncols {
                let value = dense[(row, col)];
                if value != 0.0 {
                    indices.push(col);
                    values.push(value);
                }
            }
            indptr.push(values.len());
        }

        Self {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        }
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.nrows, self.ncols);
        for row in 0..self.nrows {
            for (col, value) in self.row(row) {
                dense[(row, col)] = value;
            }
        }
        dense
    }

    /// Drop explicit zeros
    fn pruned(self) -> Self {
        if self.values.iter().all(|&v| v != 0.0) {
            return self;
        }

        let mut indptr = Vec::with_capacity(self.nrows + 1);
        let mut indices = Vec::with_capacity(self.indices.len());
        let mut values = Vec::with_capacity(self.values.len());
        indptr.push(0);
        for row in 0..self.nrows {
            for (col, value) in self.row(row) {
                if value != 0.0 {
                    indices.push(col);
                    values.push(value);
                }
            }
            indptr.push(values.len());
        }

        Self {
            nrows: self.nrows,
            ncols: self.ncols,
            indptr,
            indices,
            values,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Stored entries of one row as `(col, value)`
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.indptr[row]..self.indptr[row + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.ncols + 1];
        for &col in &self.indices {
            counts[col + 1] += 1;
        }
        for col in 0..self.ncols {
            counts[col + 1] += counts[col];
        }

        let indptr = counts.clone();
        let mut next = counts;
        let mut indices = vec![0; self.values.len()];
        let mut values = vec![0.0; self.values.len()];

        for row in 0..self.nrows {
            for (col, value) in self.row(row) {
                let slot = next[col];
                indices[slot] = row;
                values[slot] = value;
                next[col] += 1;
            }
        }

        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            indptr,
            indices,
            values,
        }
    }

    pub fn scale(&self, alpha: f64) -> Self {
        Self {
            values: self.values.iter().map(|&v| alpha * v).collect(),
            ..self.clone()
        }
        .pruned()
    }

    /// Apply `f` to every stored entry
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            values: self.values.iter().map(|&v| f(v)).collect(),
            ..self.clone()
        }
        .pruned()
    }

    /// Entry-wise sum of two matrices of equal shape
    pub fn add(&self, other: &CsrMatrix) -> Result<Self> {
        if self.nrows != other.nrows {
            return Err(LinopError::DimensionMismatch {
                expected: self.nrows,
                got: other.nrows,
            });
        }
        if self.ncols != other.ncols {
            return Err(LinopError::DimensionMismatch {
                expected: self.ncols,
                got: other.ncols,
            });
        }

        let mut indptr = Vec::with_capacity(self.nrows + 1);
        let mut indices = Vec::with_capacity(self.nnz() + other.nnz());
        let mut values = Vec::with_capacity(self.nnz() + other.nnz());
        indptr.push(0);

        for row in 0..self.nrows {
            let mut lhs = self.row(row).peekable();
            let mut rhs = other.row(row).peekable();
            loop {
                let (col, value) = match (lhs.peek().copied(), rhs.peek().copied()) {
                    (Some((lc, lv)), Some((rc, rv))) if lc == rc => {
                        lhs.next();
                        rhs.next();
                        (lc, lv + rv)
                    }
                    (Some((lc, lv)), Some((rc, _))) if lc < rc => {
                        lhs.next();
                        (lc, lv)
                    }
                    (_, Some((rc, rv))) => {
                        rhs.next();
                        (rc, rv)
                    }
                    (Some((lc, lv)), None) => {
                        lhs.next();
                        (lc, lv)
                    }
                    (None, None) => break,
                };
                if value != 0.0 {
                    indices.push(col);
                    values.push(value);
                }
            }
            indptr.push(values.len());
        }

        Ok(Self {
            nrows: self.nrows,
            ncols: self.ncols,
            indptr,
            indices,
            values,
        })
    }

    /// Main diagonal
    pub fn diagonal(&self) -> DVector<f64> {
        let n = self.nrows.min(self.ncols);
        DVector::from_fn(n, |i, _| self.get(i, i))
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Entry at `(row, col)`, zero when not stored
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.indptr[row]..self.indptr[row + 1];
        match self.indices[range.clone()].binary_search(&col) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => 0.0,
        }
    }

    /// `A X` for a dense `X` of shape `cols × K`
    pub fn matmul(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.nrows() != self.ncols {
            return Err(LinopError::DimensionMismatch {
                expected: self.ncols,
                got: x.nrows(),
            });
        }

        let k = x.ncols();
        if k == 0 || self.nrows == 0 {
            return Ok(DMatrix::zeros(self.nrows, k));
        }

        // Row-major output so that each row is one contiguous chunk
        let mut out = vec![0.0; self.nrows * k];
        let kernel = |(row, out_row): (usize, &mut [f64])| {
            for (col, value) in self.row(row) {
                for (c, slot) in out_row.iter_mut().enumerate() {
                    *slot += value * x[(col, c)];
                }
            }
        };

        if self.nrows >= config::current().parallel_min_rows {
            out.par_chunks_mut(k).enumerate().for_each(kernel);
        } else {
            out.chunks_mut(k).enumerate().for_each(kernel);
        }

        Ok(DMatrix::from_row_slice(self.nrows, k, &out))
    }

    /// `X A` for a dense `X` of shape `K × rows`
    pub fn rmatmul(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.ncols() != self.nrows {
            return Err(LinopError::DimensionMismatch {
                expected: self.nrows,
                got: x.ncols(),
            });
        }

        let mut out = DMatrix::zeros(x.nrows(), self.ncols);
        for row in 0..self.nrows {
            for (col, value) in self.row(row) {
                let mut target = out.column_mut(col);
                target.axpy(value, &x.column(row), 1.0);
            }
        }
        Ok(out)
    }

    /// Sparse product `A B`
    pub fn matmul_sparse(&self, other: &CsrMatrix) -> Result<Self> {
        if other.nrows != self.ncols {
            return Err(LinopError::DimensionMismatch {
                expected: self.ncols,
                got: other.nrows,
            });
        }

        let rows: Vec<Vec<(usize, f64)>> = (0..self.nrows)
            .into_par_iter()
            .map(|row| {
                let mut acc: HashMap<usize, f64> = HashMap::new();
                for (mid, lhs) in self.row(row) {
                    for (col, rhs) in other.row(mid) {
                        *acc.entry(col).or_insert(0.0) += lhs * rhs;
                    }
                }
                let mut entries: Vec<(usize, f64)> =
                    acc.into_iter().filter(|&(_, v)| v != 0.0).collect();
                entries.sort_unstable_by_key(|&(col, _)| col);
                entries
            })
            .collect();

        let mut indptr = Vec::with_capacity(self.nrows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);
        for entries in rows {
            for (col, value) in entries {
                indices.push(col);
                values.push(value);
            }
            indptr.push(values.len());
        }

        Ok(Self {
            nrows: self.nrows,
            ncols: other.ncols,
            indptr,
            indices,
            values,
        })
    }
}

impl SparseMatrix for CsrMatrix {
    type Element = f64;

    fn get_element(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        let range = self.indptr[row]..self.indptr[row + 1];
        self.indices[range.clone()]
            .binary_search(&col)
            .ok()
            .map(|pos| self.values[range.start + pos])
    }

    fn dimensions(&self) -> (usize, usize) {
        self.shape()
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }
}

impl MatrixOperations for CsrMatrix {
    fn get_row(&self, row: usize) -> Vec<(usize, f64)> {
        if row >= self.nrows {
            return Vec::new();
        }
        self.row(row).collect()
    }

    fn get_col(&self, col: usize) -> Vec<(usize, f64)> {
        if col >= self.ncols {
            return Vec::new();
        }
        (0..self.nrows)
            .filter_map(|row| self.get_element(row, col).map(|value| (row, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{with_config, Config};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sample() -> CsrMatrix {
        // [[1, 0, 2],
        //  [0, 0, 3],
        //  [4, 5, 0]]
        CsrMatrix::from_triplets(
            3,
            3,
            &[(2, 1, 5.0), (0, 0, 1.0), (1, 2, 3.0), (0, 2, 2.0), (2, 0, 4.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_from_triplets_sorts_and_sums() {
        let m = CsrMatrix::from_triplets(2, 2, &[(0, 1, 1.0), (0, 0, 2.0), (0, 1, 3.0)]).unwrap();
        assert_eq!(m.indptr(), &[0, 2, 2]);
        assert_eq!(m.indices(), &[0, 1]);
        assert_eq!(m.values(), &[2.0, 4.0]);

        let cancelled = CsrMatrix::from_triplets(2, 2, &[(1, 1, 1.0), (1, 1, -1.0)]).unwrap();
        assert_eq!(cancelled.nnz(), 0);

        assert!(CsrMatrix::from_triplets(2, 2, &[(2, 0, 1.0)]).is_err());
    }

    #[test]
    fn test_raw_parts_validation() {
        assert!(CsrMatrix::from_raw_parts(2, 2, vec![0, 1, 2], vec![1, 0], vec![1.0, 2.0]).is_ok());
        assert!(CsrMatrix::from_raw_parts(2, 2, vec![0, 1], vec![1], vec![1.0]).is_err());
        assert!(CsrMatrix::from_raw_parts(1, 2, vec![0, 2], vec![1, 0], vec![1.0, 2.0]).is_err());
        assert!(CsrMatrix::from_raw_parts(1, 2, vec![0, 1], vec![2], vec![1.0]).is_err());
        assert!(CsrMatrix::from_raw_parts(1, 2, vec![0, 2], vec![0], vec![1.0]).is_err());
        // row pointer past the end of the arrays
        assert!(CsrMatrix::from_raw_parts(2, 2, vec![0, 5, 2], vec![0, 1], vec![1.0, 2.0]).is_err());
        assert!(CsrMatrix::from_raw_parts(3, 2, vec![0, 2, 1, 2], vec![0, 1], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_dense_roundtrip_and_access() {
        let m = sample();
        let dense = m.to_dense();
        assert_eq!(dense[(2, 1)], 5.0);
        assert_eq!(CsrMatrix::from_dense(&dense), m);
        assert_eq!(m.get_element(1, 2), Some(3.0));
        assert_eq!(m.get_element(1, 1), None);
        assert_eq!(m.get_element(3, 0), None);
        assert_eq!(m.get_row(0), vec![(0, 1.0), (2, 2.0)]);
        assert_eq!(m.get_col(0), vec![(0, 1.0), (2, 4.0)]);
        assert_eq!(m.diagonal().as_slice(), &[1.0, 0.0, 0.0]);
        assert!((m.density() - 5.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_transpose() {
        let m = sample();
        assert_eq!(m.transpose().to_dense(), m.to_dense().transpose());
        assert_eq!(m.transpose().transpose(), m);
    }

    #[test]
    fn test_add_and_scale() {
        let m = sample();
        let sum = m.add(&m.scale(-1.0)).unwrap();
        assert_eq!(sum.nnz(), 0);
        assert_eq!(m.add(&m.transpose()).unwrap().to_dense(), m.to_dense() + m.to_dense().transpose());
        assert!(m.add(&CsrMatrix::zeros(2, 3)).is_err());
        assert!(matches!(
            CsrMatrix::zeros(2, 3).add(&CsrMatrix::zeros(3, 2)),
            Err(LinopError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_products_match_dense() {
        let m = sample();
        let dense = m.to_dense();
        let x = DMatrix::from_fn(3, 2, |i, j| (i + 2 * j) as f64);
        assert_eq!(m.matmul(&x).unwrap(), &dense * &x);
        assert_eq!(m.rmatmul(&x.transpose()).unwrap(), x.transpose() * &dense);
        assert_eq!(m.matmul_sparse(&m).unwrap().to_dense(), &dense * &dense);
        assert!(m.matmul(&DMatrix::zeros(2, 1)).is_err());
        assert_eq!(m.matmul(&DMatrix::zeros(3, 0)).unwrap().shape(), (3, 0));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let mut rng = StdRng::seed_from_u64(7);
        let triplets: Vec<_> = (0..400)
            .map(|_| (rng.gen_range(0..64), rng.gen_range(0..32), rng.gen_range(-1.0..1.0)))
            .collect();
        let m = CsrMatrix::from_triplets(64, 32, &triplets).unwrap();
        let x = DMatrix::from_fn(32, 3, |i, j| (i * 3 + j) as f64 / 10.0);

        let serial = m.matmul(&x).unwrap();
        let parallel = with_config(Config::default().with_parallel_min_rows(1), || m.matmul(&x).unwrap());
        assert_eq!(serial, parallel);
    }
}
