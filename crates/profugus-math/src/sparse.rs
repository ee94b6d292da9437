// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Matrix Backends
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Assembled matrices behind one operator interface.
//!
//! Both backends are filled from the same `(row, col, value)` triplets, so a
//! problem assembled once runs identically on either storage.

use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use profugus_types::config::MatrixBackend;
use profugus_types::error::{ProfugusError, ProfugusResult};

use crate::operator::LinearOperator;

/// Compressed sparse row matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Duplicate `(row, col)` entries are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        mut triplets: Vec<(usize, usize, f64)>,
    ) -> ProfugusResult<Self> {
        if let Some(&(r, c, _)) = triplets.iter().find(|(r, c, _)| *r >= nrows || *c >= ncols) {
            return Err(ProfugusError::LinAlg(format!(
                "Triplet ({r}, {c}) outside {nrows}x{ncols} matrix"
            )));
        }
        if triplets.iter().any(|t| !t.2.is_finite()) {
            return Err(ProfugusError::LinAlg(
                "Matrix entries must be finite".to_string(),
            ));
        }
        triplets.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_ptr = vec![0usize; nrows + 1];
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in triplets {
            if last == Some((r, c)) {
                if let Some(tail) = values.last_mut() {
                    *tail += v;
                }
                continue;
            }
            row_ptr[r + 1] += 1;
            col_idx.push(c);
            values.push(v);
            last = Some((r, c));
        }
        for r in 0..nrows {
            row_ptr[r + 1] += row_ptr[r];
        }
        Ok(CsrMatrix {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        })
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Entries of row `r` as `(col, value)`.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_ptr[r]..self.row_ptr[r + 1];
        self.col_idx[span.clone()]
            .iter()
            .copied()
            .zip(self.values[span].iter().copied())
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.nrows.min(self.ncols))
            .map(|r| {
                self.row(r)
                    .find(|&(c, _)| c == r)
                    .map(|(_, v)| v)
                    .unwrap_or(0.0)
            })
            .collect()
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.nrows, self.ncols));
        for r in 0..self.nrows {
            for (c, v) in self.row(r) {
                out[[r, c]] = v;
            }
        }
        out
    }

    /// Write in Matrix Market coordinate format (1-based indices).
    pub fn write_matrix_market(&self, path: impl AsRef<Path>) -> ProfugusResult<()> {
        let file = std::fs::File::create(path)?;
        let mut w = BufWriter::new(file);
        writeln!(w, "%%MatrixMarket matrix coordinate real general")?;
        writeln!(w, "{} {} {}", self.nrows, self.ncols, self.nnz())?;
        for r in 0..self.nrows {
            for (c, v) in self.row(r) {
                writeln!(w, "{} {} {:.16e}", r + 1, c + 1, v)?;
            }
        }
        w.flush()?;
        Ok(())
    }
}

impl LinearOperator for CsrMatrix {
    fn rows(&self) -> usize {
        self.nrows
    }

    fn cols(&self) -> usize {
        self.ncols
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        for (r, yr) in y.iter_mut().enumerate().take(self.nrows) {
            *yr = self.row(r).map(|(c, v)| v * x[c]).sum();
        }
    }
}

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: Array2<f64>,
}

impl DenseMatrix {
    pub fn new(data: Array2<f64>) -> Self {
        DenseMatrix { data }
    }

    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: Vec<(usize, usize, f64)>,
    ) -> ProfugusResult<Self> {
        // validation and duplicate merging shared with CSR
        let csr = CsrMatrix::from_triplets(nrows, ncols, triplets)?;
        Ok(DenseMatrix {
            data: csr.to_dense(),
        })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn diagonal(&self) -> Vec<f64> {
        self.data.diag().to_vec()
    }
}

impl LinearOperator for DenseMatrix {
    fn rows(&self) -> usize {
        self.data.nrows()
    }

    fn cols(&self) -> usize {
        self.data.ncols()
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        for (yr, row) in y.iter_mut().zip(self.data.rows()) {
            *yr = row.iter().zip(x).map(|(a, b)| a * b).sum();
        }
    }
}

/// Matrix in the backend selected by configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Matrix {
    Csr(CsrMatrix),
    Dense(DenseMatrix),
}

impl Matrix {
    pub fn from_triplets(
        backend: MatrixBackend,
        nrows: usize,
        ncols: usize,
        triplets: Vec<(usize, usize, f64)>,
    ) -> ProfugusResult<Self> {
        Ok(match backend {
            MatrixBackend::Csr => Matrix::Csr(CsrMatrix::from_triplets(nrows, ncols, triplets)?),
            MatrixBackend::Dense => {
                Matrix::Dense(DenseMatrix::from_triplets(nrows, ncols, triplets)?)
            }
        })
    }

    pub fn backend(&self) -> MatrixBackend {
        match self {
            Matrix::Csr(_) => MatrixBackend::Csr,
            Matrix::Dense(_) => MatrixBackend::Dense,
        }
    }

    pub fn diagonal(&self) -> Vec<f64> {
        match self {
            Matrix::Csr(m) => m.diagonal(),
            Matrix::Dense(m) => m.diagonal(),
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            Matrix::Csr(m) => m.to_dense(),
            Matrix::Dense(m) => m.data().clone(),
        }
    }

    /// Matrix Market dump; dense storage is written with its zeros dropped.
    pub fn write_matrix_market(&self, path: impl AsRef<Path>) -> ProfugusResult<()> {
        match self {
            Matrix::Csr(m) => m.write_matrix_market(path),
            Matrix::Dense(m) => {
                let (nr, nc) = m.data().dim();
                let triplets = m
                    .data()
                    .indexed_iter()
                    .filter(|(_, v)| **v != 0.0)
                    .map(|((r, c), &v)| (r, c, v))
                    .collect();
                CsrMatrix::from_triplets(nr, nc, triplets)?.write_matrix_market(path)
            }
        }
    }
}

impl LinearOperator for Matrix {
    fn rows(&self) -> usize {
        match self {
            Matrix::Csr(m) => m.rows(),
            Matrix::Dense(m) => m.rows(),
        }
    }

    fn cols(&self) -> usize {
        match self {
            Matrix::Csr(m) => m.cols(),
            Matrix::Dense(m) => m.cols(),
        }
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        match self {
            Matrix::Csr(m) => m.apply_vec(x, y),
            Matrix::Dense(m) => m.apply_vec(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triplets() -> Vec<(usize, usize, f64)> {
        vec![
            (0, 0, 4.0),
            (0, 1, -1.0),
            (1, 0, -1.0),
            (1, 1, 2.0),
            (1, 1, 2.0),
            (1, 2, -1.0),
            (2, 1, -1.0),
            (2, 2, 4.0),
        ]
    }

    #[test]
    fn test_csr_merges_duplicates() {
        let m = CsrMatrix::from_triplets(3, 3, triplets()).unwrap();
        assert_eq!(m.nnz(), 7);
        assert_eq!(m.diagonal(), vec![4.0, 4.0, 4.0]);
        let mut y = [0.0; 3];
        m.apply_vec(&[1.0, 1.0, 1.0], &mut y);
        assert_eq!(y, [3.0, 2.0, 3.0]);
    }

    #[test]
    fn test_backends_agree() {
        let csr = Matrix::from_triplets(MatrixBackend::Csr, 3, 3, triplets()).unwrap();
        let dense = Matrix::from_triplets(MatrixBackend::Dense, 3, 3, triplets()).unwrap();
        assert_eq!(csr.to_dense(), dense.to_dense());
        let x = [0.3, -1.2, 2.5];
        let (mut a, mut b) = ([0.0; 3], [0.0; 3]);
        csr.apply_vec(&x, &mut a);
        dense.apply_vec(&x, &mut b);
        assert_eq!(a, b);
        assert_eq!(dense.diagonal(), csr.diagonal());
    }

    #[test]
    fn test_rejects_out_of_range_triplet() {
        assert!(CsrMatrix::from_triplets(2, 2, vec![(2, 0, 1.0)]).is_err());
        assert!(CsrMatrix::from_triplets(2, 2, vec![(0, 0, f64::NAN)]).is_err());
    }

    #[test]
    fn test_empty_rows() {
        let m = CsrMatrix::from_triplets(3, 3, vec![(2, 2, 1.0)]).unwrap();
        assert_eq!(m.diagonal(), vec![0.0, 0.0, 1.0]);
        assert_eq!(m.row(0).count(), 0);
    }

    #[test]
    fn test_matrix_market_output() {
        let m = Matrix::from_triplets(MatrixBackend::Dense, 3, 3, triplets()).unwrap();
        let path = std::env::temp_dir().join("profugus_math_mm_test.mtx");
        m.write_matrix_market(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("%%MatrixMarket matrix coordinate real general"));
        assert_eq!(lines.next(), Some("3 3 7"));
        assert_eq!(lines.count(), 7);
        let _ = std::fs::remove_file(&path);
    }
}
