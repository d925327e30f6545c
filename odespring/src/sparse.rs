// SPDX-License-Identifier: AGPL-3.0-only

//! Sparse matrix formats for the lattice coupling operator.
//!
//! CSR is the host format. ELLPACK is the GPU format: a fixed number of
//! slots per row stored column-major, so consecutive threads read
//! consecutive addresses. Unused slots carry column `-1`.
//!
//! Repeated column indices within a row are kept as separate entries and
//! their contributions add.

/// Round `n` up to a multiple of `m`.
#[must_use]
pub const fn alignup(n: usize, m: usize) -> usize {
    if n % m == 0 {
        n
    } else {
        n - n % m + m
    }
}

/// Row alignment of the ELL layout.
pub const ELL_ROW_ALIGN: usize = 16;

/// Padding marker for empty ELL slots.
pub const ELL_EMPTY: i32 = -1;

/// Sparse matrix in Compressed Sparse Row format.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    pub n: usize,
    pub row_ptr: Vec<usize>,
    pub col_idx: Vec<usize>,
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// Build from per-row `(column, value)` lists, preserving entry order.
    #[must_use]
    pub fn from_rows(rows: &[Vec<(usize, f64)>]) -> Self {
        let nnz = rows.iter().map(Vec::len).sum();
        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);
        for row in rows {
            for &(c, v) in row {
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        Self {
            n: rows.len(),
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Sparse matrix-vector product: y = A * x.
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        for (i, yi) in y.iter_mut().enumerate().take(self.n) {
            *yi = self.row_dot(i, 0.0, x);
        }
    }

    /// y += A * x, adding each row's entries onto the existing `y[i]`.
    pub fn spmv_accumulate(&self, x: &[f64], y: &mut [f64]) {
        for (i, yi) in y.iter_mut().enumerate().take(self.n) {
            *yi = self.row_dot(i, *yi, x);
        }
    }

    /// `init + Σⱼ A[i,j]·x[j]`, summed in storage order.
    #[inline]
    #[must_use]
    pub fn row_dot(&self, i: usize, init: f64, x: &[f64]) -> f64 {
        let mut sum = init;
        for j in self.row_ptr[i]..self.row_ptr[i + 1] {
            sum += self.values[j] * x[self.col_idx[j]];
        }
        sum
    }

    /// Number of stored entries.
    #[must_use]
    pub const fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Longest row.
    #[must_use]
    pub fn max_row_len(&self) -> usize {
        self.row_ptr
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// `xᵀ A x`.
    #[must_use]
    pub fn quadratic_form(&self, x: &[f64]) -> f64 {
        (0..self.n).map(|i| x[i] * self.row_dot(i, 0.0, x)).sum()
    }
}

/// Column-major ELLPACK matrix.
///
/// Slot `k` of row `i` lives at `i + k·pitch`.
#[derive(Debug, Clone)]
pub struct EllMatrix {
    pub n: usize,
    pub width: usize,
    pub pitch: usize,
    pub col: Vec<i32>,
    pub values: Vec<f64>,
}

impl EllMatrix {
    /// Convert CSR to ELL with `pitch = alignup(n, 16)` and width equal to
    /// the longest row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::OdeSpringError::InvalidConfig`] if a column
    /// index does not fit in `i32`.
    pub fn from_csr(csr: &CsrMatrix) -> crate::error::Result<Self> {
        let n = csr.n;
        let width = csr.max_row_len();
        let pitch = alignup(n, ELL_ROW_ALIGN);
        let mut col = vec![ELL_EMPTY; width * pitch];
        let mut values = vec![0.0; width * pitch];
        for i in 0..n {
            for (k, j) in (csr.row_ptr[i]..csr.row_ptr[i + 1]).enumerate() {
                let c = i32::try_from(csr.col_idx[j]).map_err(|_| {
                    crate::error::OdeSpringError::InvalidConfig(format!(
                        "column index {} exceeds ELL i32 range",
                        csr.col_idx[j]
                    ))
                })?;
                col[i + k * pitch] = c;
                values[i + k * pitch] = csr.values[j];
            }
        }
        Ok(Self {
            n,
            width,
            pitch,
            col,
            values,
        })
    }

    /// Sparse matrix-vector product: y = A * x.
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        for (i, yi) in y.iter_mut().enumerate().take(self.n) {
            let mut sum = 0.0;
            for k in 0..self.width {
                let c = self.col[i + k * self.pitch];
                if c != ELL_EMPTY {
                    sum += self.values[i + k * self.pitch] * x[c as usize];
                }
            }
            *yi = sum;
        }
    }

    /// Total slots including padding.
    #[must_use]
    pub const fn slots(&self) -> usize {
        self.width * self.pitch
    }
}
