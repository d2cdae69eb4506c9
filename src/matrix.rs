//! Dense origin-destination matrices.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionError {
    #[error("expected {expected} cells for a {size}x{size} matrix, got {actual}")]
    CellCount {
        size: usize,
        expected: usize,
        actual: usize,
    },
    #[error("index {index} out of range for a {size}x{size} matrix")]
    IndexOutOfRange { index: usize, size: usize },
}

/// A square, row-major matrix of directed travel costs.
///
/// `None` marks a pair the engine could not route; it is never folded into
/// a numeric value here.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    size: usize,
    cells: Vec<Option<f64>>,
}

impl Matrix {
    pub fn from_cells(size: usize, cells: Vec<Option<f64>>) -> Result<Self, DimensionError> {
        let expected = size * size;
        if cells.len() != expected {
            return Err(DimensionError::CellCount {
                size,
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { size, cells })
    }

    /// Builds a matrix from nested rows, all of which must have `rows.len()` cells.
    pub fn from_rows(rows: Vec<Vec<Option<f64>>>) -> Result<Self, DimensionError> {
        let size = rows.len();
        let actual = rows.iter().map(Vec::len).sum();
        if rows.iter().any(|row| row.len() != size) {
            return Err(DimensionError::CellCount {
                size,
                expected: size * size,
                actual,
            });
        }
        Self::from_cells(size, rows.into_iter().flatten().collect())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, from: usize, to: usize) -> Option<f64> {
        self.cells[from * self.size + to]
    }

    pub fn row(&self, from: usize) -> &[Option<f64>] {
        &self.cells[from * self.size..(from + 1) * self.size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<f64>]> {
        (0..self.size).map(move |from| self.row(from))
    }

    /// Principal submatrix over `indices`, in the given order.
    pub fn submatrix(&self, indices: &[usize]) -> Result<Matrix, DimensionError> {
        if let Some(&index) = indices.iter().find(|&&index| index >= self.size) {
            return Err(DimensionError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }

        let cells = indices
            .iter()
            .flat_map(|&from| indices.iter().map(move |&to| (from, to)))
            .map(|(from, to)| self.get(from, to))
            .collect();

        Ok(Matrix {
            size: indices.len(),
            cells,
        })
    }

    /// Number of off-diagonal cells without a route.
    pub fn unreachable_count(&self) -> usize {
        (0..self.size)
            .flat_map(|from| (0..self.size).map(move |to| (from, to)))
            .filter(|&(from, to)| from != to && self.get(from, to).is_none())
            .count()
    }
}

/// The two matrices produced for one planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct OdMatrix {
    /// Seconds.
    pub durations: Matrix,
    /// Meters.
    pub distances: Matrix,
}

impl OdMatrix {
    pub fn size(&self) -> usize {
        self.durations.size()
    }

    pub fn metric(&self, metric: Metric) -> &Matrix {
        match metric {
            Metric::Duration => &self.durations,
            Metric::Distance => &self.distances,
        }
    }
}

/// Cost dimension used for clustering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Duration,
    Distance,
}
