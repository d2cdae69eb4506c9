//! Batched OD matrix assembly.
//!
//! Routing engines cap how many locations a single table query may cover.
//! The tiler splits the location range into consecutive blocks, queries
//! every (row block, column block) pair and stitches the tiles back into
//! full duration and distance matrices.

use std::ops::Range;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::matrix::{DimensionError, Matrix, OdMatrix};
use crate::traits::{Annotations, EngineError, RoutingEngine, TableOptions, TableRequest};

/// Largest per-axis table size accepted by a stock OSRM server.
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("batch size must be at least 1")]
    EmptyBatchSize,
    #[error(transparent)]
    Dimension(#[from] DimensionError),
    #[error("invalid table options")]
    InvalidOptions(#[source] EngineError),
    #[error("tile ({row_block}, {col_block}) failed")]
    Tile {
        row_block: usize,
        col_block: usize,
        source: EngineError,
    },
    #[error("tile ({row_block}, {col_block}) response has no {annotation} matrix")]
    MissingAnnotation {
        row_block: usize,
        col_block: usize,
        annotation: &'static str,
    },
    #[error(
        "tile ({row_block}, {col_block}) {annotation} matrix is not {expected_rows}x{expected_cols}"
    )]
    TileShape {
        row_block: usize,
        col_block: usize,
        annotation: &'static str,
        expected_rows: usize,
        expected_cols: usize,
    },
}

/// Splits `[0, len)` into consecutive ranges of at most `batch_size`.
///
/// The last range holds the remainder and is never padded.
pub fn block_ranges(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    (0..len.div_ceil(batch_size))
        .map(|block| {
            let start = block * batch_size;
            start..(start + batch_size).min(len)
        })
        .collect()
}

#[derive(Debug)]
struct Tile {
    rows: Range<usize>,
    cols: Range<usize>,
    durations: Vec<Vec<Option<f64>>>,
    distances: Vec<Vec<Option<f64>>>,
}

/// Assembles complete OD matrices from bounded table queries.
pub struct MatrixTiler<'a, E: RoutingEngine> {
    engine: &'a E,
    batch_size: usize,
    options: TableOptions,
}

impl<'a, E: RoutingEngine> MatrixTiler<'a, E> {
    pub fn new(engine: &'a E, batch_size: usize, options: TableOptions) -> Result<Self, MatrixError> {
        if batch_size == 0 {
            return Err(MatrixError::EmptyBatchSize);
        }
        options.validate().map_err(MatrixError::InvalidOptions)?;

        Ok(Self {
            engine,
            batch_size,
            options,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Queries every tile and places it by offset.
    ///
    /// Any failing tile aborts the assembly; a partial matrix is never returned.
    pub fn assemble(&self, coordinates: &[(f64, f64)]) -> Result<OdMatrix, MatrixError> {
        let size = coordinates.len();
        let blocks = block_ranges(size, self.batch_size);
        let grid = (0..blocks.len())
            .flat_map(|row| (0..blocks.len()).map(move |col| (row, col)))
            .collect::<Vec<_>>();

        let tiles = grid
            .par_iter()
            .map(|&(row, col)| self.fetch_tile(coordinates, &blocks, row, col))
            .collect::<Result<Vec<_>, _>>()?;

        let mut durations = vec![None; size * size];
        let mut distances = vec![None; size * size];
        for tile in tiles {
            place(&mut durations, size, &tile.rows, &tile.cols, tile.durations);
            place(&mut distances, size, &tile.rows, &tile.cols, tile.distances);
        }

        info!(
            locations = size,
            tiles = grid.len(),
            batch_size = self.batch_size,
            "assembled OD matrix"
        );

        Ok(OdMatrix {
            durations: Matrix::from_cells(size, durations)?,
            distances: Matrix::from_cells(size, distances)?,
        })
    }

    fn fetch_tile(
        &self,
        coordinates: &[(f64, f64)],
        blocks: &[Range<usize>],
        row_block: usize,
        col_block: usize,
    ) -> Result<Tile, MatrixError> {
        let rows = blocks[row_block].clone();
        let cols = blocks[col_block].clone();
        let tile_error = |source| MatrixError::Tile {
            row_block,
            col_block,
            source,
        };

        // Submit only the coordinates this tile touches; diagonal tiles
        // share one block for both axes.
        let (submitted, sources, destinations) = if row_block == col_block {
            let all = (0..rows.len()).collect::<Vec<_>>();
            (coordinates[rows.clone()].to_vec(), all.clone(), all)
        } else {
            let mut submitted = coordinates[rows.clone()].to_vec();
            submitted.extend_from_slice(&coordinates[cols.clone()]);
            let sources = (0..rows.len()).collect();
            let destinations = (rows.len()..rows.len() + cols.len()).collect();
            (submitted, sources, destinations)
        };

        let request = TableRequest::new(
            Some(sources),
            Some(destinations),
            Annotations::Both,
            self.options.clone(),
        )
        .map_err(tile_error)?;

        debug!(
            row_block,
            col_block,
            rows = rows.len(),
            cols = cols.len(),
            "requesting matrix tile"
        );
        let response = self.engine.table(&submitted, &request).map_err(tile_error)?;

        type Rows = Vec<Vec<Option<f64>>>;
        let check = |annotation: &'static str, values: Option<Rows>| -> Result<Rows, MatrixError> {
            let values = values.ok_or(MatrixError::MissingAnnotation {
                row_block,
                col_block,
                annotation,
            })?;
            if values.len() != rows.len() || values.iter().any(|row| row.len() != cols.len()) {
                return Err(MatrixError::TileShape {
                    row_block,
                    col_block,
                    annotation,
                    expected_rows: rows.len(),
                    expected_cols: cols.len(),
                });
            }
            Ok(values)
        };

        let durations = check("duration", response.durations)?;
        let distances = check("distance", response.distances)?;

        Ok(Tile {
            rows,
            cols,
            durations,
            distances,
        })
    }
}

fn place(
    cells: &mut [Option<f64>],
    size: usize,
    rows: &Range<usize>,
    cols: &Range<usize>,
    values: Vec<Vec<Option<f64>>>,
) {
    for (row, values) in rows.clone().zip(values) {
        let start = row * size + cols.start;
        cells[start..start + cols.len()].copy_from_slice(&values);
    }
}
