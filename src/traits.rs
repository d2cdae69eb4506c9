//! Routing engine seam.
//!
//! The planner never talks to a routing service directly. Matrix tiling and
//! route sequencing go through [`RoutingEngine`], which the OSRM adapter
//! implements and tests can mock.

use serde::Deserialize;
use thiserror::Error;

use crate::polyline::Polyline;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("routing engine request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("routing engine rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("no feasible route ({code}): {message}")]
    Infeasible { code: String, message: String },
    #[error("malformed routing engine response: {0}")]
    Malformed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, EngineError::Infeasible { .. })
    }
}

/// Which matrices a table query should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotations {
    Duration,
    Distance,
    Both,
}

impl Annotations {
    pub fn wants_duration(self) -> bool {
        matches!(self, Annotations::Duration | Annotations::Both)
    }

    pub fn wants_distance(self) -> bool {
        matches!(self, Annotations::Distance | Annotations::Both)
    }
}

/// Coordinate used when the engine estimates an unroutable pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackCoordinate {
    #[default]
    Input,
    Snapped,
}

/// Table options shared by every tile of a matrix.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Crow-flies speed (m/s) the engine uses for pairs with no route.
    pub fallback_speed: Option<f64>,
    pub fallback_coordinate: FallbackCoordinate,
    /// Multiplier applied to durations by the engine.
    pub scale_factor: Option<f64>,
}

impl TableOptions {
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(speed) = self.fallback_speed {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(EngineError::InvalidRequest(format!(
                    "fallback_speed must be > 0, got {speed}"
                )));
            }
        }
        if let Some(scale) = self.scale_factor {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(EngineError::InvalidRequest(format!(
                    "scale_factor must be > 0, got {scale}"
                )));
            }
        }
        Ok(())
    }
}

/// A validated table query over a submitted coordinate list.
///
/// `sources` and `destinations` index into that list; `None` means all.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRequest {
    sources: Option<Vec<usize>>,
    destinations: Option<Vec<usize>>,
    annotations: Annotations,
    options: TableOptions,
}

impl TableRequest {
    pub fn new(
        sources: Option<Vec<usize>>,
        destinations: Option<Vec<usize>>,
        annotations: Annotations,
        options: TableOptions,
    ) -> Result<Self, EngineError> {
        if sources.as_ref().is_some_and(Vec::is_empty) {
            return Err(EngineError::InvalidRequest("sources must not be empty".into()));
        }
        if destinations.as_ref().is_some_and(Vec::is_empty) {
            return Err(EngineError::InvalidRequest(
                "destinations must not be empty".into(),
            ));
        }
        options.validate()?;

        Ok(Self {
            sources,
            destinations,
            annotations,
            options,
        })
    }

    /// All-pairs query for both durations and distances.
    pub fn all(options: TableOptions) -> Result<Self, EngineError> {
        Self::new(None, None, Annotations::Both, options)
    }

    pub fn sources(&self) -> Option<&[usize]> {
        self.sources.as_deref()
    }

    pub fn destinations(&self) -> Option<&[usize]> {
        self.destinations.as_deref()
    }

    pub fn annotations(&self) -> Annotations {
        self.annotations
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Checks that every index refers to one of `len` submitted coordinates.
    pub fn check_indices(&self, len: usize) -> Result<(), EngineError> {
        let out_of_range = self
            .sources
            .iter()
            .chain(self.destinations.iter())
            .flatten()
            .find(|&&index| index >= len);

        match out_of_range {
            Some(index) => Err(EngineError::InvalidRequest(format!(
                "index {index} out of range for {len} coordinates"
            ))),
            None => Ok(()),
        }
    }
}

/// Table result; rows are sources, columns destinations, `None` is unreachable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableResponse {
    pub durations: Option<Vec<Vec<Option<f64>>>>,
    pub distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TripSource {
    #[default]
    Any,
    First,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TripDestination {
    #[default]
    Any,
    Last,
}

/// Level of detail of the returned route geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overview {
    #[default]
    Simplified,
    Full,
    False,
}

/// A validated trip (TSP) query.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequest {
    roundtrip: bool,
    source: TripSource,
    destination: TripDestination,
    overview: Overview,
}

impl TripRequest {
    pub fn new(
        roundtrip: bool,
        source: TripSource,
        destination: TripDestination,
        overview: Overview,
    ) -> Result<Self, EngineError> {
        // Open trips are only solvable with both endpoints fixed.
        if !roundtrip && (source != TripSource::First || destination != TripDestination::Last) {
            return Err(EngineError::InvalidRequest(
                "a non-roundtrip trip requires source=first and destination=last".into(),
            ));
        }

        Ok(Self {
            roundtrip,
            source,
            destination,
            overview,
        })
    }

    /// Closed tour fixed to start at the first coordinate.
    pub fn closed_from_first() -> Self {
        Self {
            roundtrip: true,
            source: TripSource::First,
            destination: TripDestination::Any,
            overview: Overview::Full,
        }
    }

    pub fn roundtrip(&self) -> bool {
        self.roundtrip
    }

    pub fn source(&self) -> TripSource {
        self.source
    }

    pub fn destination(&self) -> TripDestination {
        self.destination
    }

    pub fn overview(&self) -> Overview {
        self.overview
    }
}

/// A solved trip.
///
/// `waypoint_indices[i]` is the visiting position of the i-th submitted
/// coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct TripResponse {
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: Polyline,
    pub waypoint_indices: Vec<usize>,
}

/// Provides OD tables and bounded TSP solutions over road-network
/// coordinates given as (lat, lng).
pub trait RoutingEngine: Send + Sync {
    fn table(
        &self,
        coordinates: &[(f64, f64)],
        request: &TableRequest,
    ) -> Result<TableResponse, EngineError>;

    fn trip(
        &self,
        coordinates: &[(f64, f64)],
        request: &TripRequest,
    ) -> Result<TripResponse, EngineError>;
}
