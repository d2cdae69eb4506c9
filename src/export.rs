//! Flat-file persistence for matrices and planning results.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::matrix::{DimensionError, Matrix};
use crate::merger::PlanningResult;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("invalid value {value:?} at row {row}, column {column}")]
    InvalidValue {
        row: usize,
        column: usize,
        value: String,
    },
    #[error("matrix is not square")]
    NotSquare(#[from] DimensionError),
}

/// Writes a matrix as headerless CSV, one row per source.
///
/// Values carry one decimal; unreachable cells are empty fields.
pub fn write_matrix<W: Write>(matrix: &Matrix, writer: W) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    for row in matrix.rows() {
        writer.write_record(row.iter().map(|cell| match cell {
            Some(value) => format!("{:.1}", value),
            None => String::new(),
        }))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a matrix written by [`write_matrix`]. Fields may be space padded.
pub fn read_matrix<R: Read>(reader: R) -> Result<Matrix, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cells = record
            .iter()
            .enumerate()
            .map(|(column, field)| {
                if field.is_empty() {
                    return Ok(None);
                }
                field
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| ExportError::InvalidValue {
                        row,
                        column,
                        value: field.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(cells);
    }

    Ok(Matrix::from_rows(rows)?)
}

pub fn save_matrix(matrix: &Matrix, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_matrix(matrix, BufWriter::new(file))
}

pub fn load_matrix(path: impl AsRef<Path>) -> Result<Matrix, ExportError> {
    let file = File::open(path)?;
    read_matrix(BufReader::new(file))
}

#[derive(Debug, Serialize)]
struct StopRow<'a> {
    id: &'a str,
    address: Option<&'a str>,
    latitude: f64,
    longitude: f64,
    route: usize,
    rank: usize,
}

#[derive(Debug, Serialize)]
struct RouteRow {
    route: usize,
    stops: usize,
    legs: usize,
    distance_m: f64,
    duration_s: f64,
}

/// Writes one row per planned stop, ordered by route then rank.
pub fn write_stops<W: Write>(result: &PlanningResult, writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for stop in &result.stops {
        writer.serialize(StopRow {
            id: stop.location.id(),
            address: stop.location.address(),
            latitude: stop.location.lat(),
            longitude: stop.location.lng(),
            route: stop.route,
            rank: stop.rank,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one row per sequenced route with its totals.
pub fn write_routes<W: Write>(result: &PlanningResult, writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for summary in &result.routes {
        writer.serialize(RouteRow {
            route: summary.route,
            stops: summary.stop_count,
            legs: summary.legs,
            distance_m: summary.distance_m,
            duration_s: summary.duration_s,
        })?;
    }
    writer.flush()?;
    Ok(())
}
