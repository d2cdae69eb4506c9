//! OSRM HTTP adapter for table and trip queries.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::polyline::Polyline;
use crate::traits::{
    EngineError, FallbackCoordinate, Overview, RoutingEngine, TableRequest, TableResponse,
    TripDestination, TripRequest, TripResponse, TripSource,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    /// Protocol version, `v1` for every OSRM 5.x server.
    pub version: String,
    /// Transport profile the dataset was extracted with.
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            version: "v1".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn url(&self, service: &str, coordinates: &[(f64, f64)]) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            service,
            self.config.version,
            self.config.profile,
            format_coordinates(coordinates)
        )
    }

    fn get<T: DeserializeOwned>(
        &self,
        service: &str,
        coordinates: &[(f64, f64)],
        query: &[(&'static str, String)],
    ) -> Result<T, EngineError> {
        let url = self.url(service, coordinates);
        debug!(service, coordinates = coordinates.len(), "osrm request");

        let response = self.client.get(url).query(query).send()?;
        let status = response.status();
        let body = response.text()?;

        check_status(&body).map_err(|err| match err {
            EngineError::Malformed(reason) => {
                EngineError::Malformed(format!("HTTP {status}: {reason}"))
            }
            other => other,
        })?;

        serde_json::from_str(&body).map_err(|err| EngineError::Malformed(err.to_string()))
    }
}

impl RoutingEngine for OsrmClient {
    fn table(
        &self,
        coordinates: &[(f64, f64)],
        request: &TableRequest,
    ) -> Result<TableResponse, EngineError> {
        if coordinates.is_empty() {
            return Ok(TableResponse::default());
        }
        request.check_indices(coordinates.len())?;

        let body: OsrmTableResponse = self.get("table", coordinates, &table_query(request))?;

        Ok(TableResponse {
            durations: body.durations,
            distances: body.distances,
        })
    }

    fn trip(
        &self,
        coordinates: &[(f64, f64)],
        request: &TripRequest,
    ) -> Result<TripResponse, EngineError> {
        if coordinates.is_empty() {
            return Err(EngineError::InvalidRequest(
                "trip needs at least one coordinate".into(),
            ));
        }

        let body: OsrmTripResponse = self.get("trip", coordinates, &trip_query(request))?;
        body.into_trip(coordinates.len())
    }
}

/// `lng,lat;lng,lat;...` with six decimals.
fn format_coordinates(coordinates: &[(f64, f64)]) -> String {
    coordinates
        .iter()
        .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
        .collect::<Vec<_>>()
        .join(";")
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn table_query(request: &TableRequest) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();

    if let Some(sources) = request.sources() {
        query.push(("sources", join_indices(sources)));
    }
    if let Some(destinations) = request.destinations() {
        query.push(("destinations", join_indices(destinations)));
    }

    let annotations = request.annotations();
    let mut requested = Vec::new();
    if annotations.wants_duration() {
        requested.push("duration");
    }
    if annotations.wants_distance() {
        requested.push("distance");
    }
    query.push(("annotations", requested.join(",")));

    let options = request.options();
    if let Some(speed) = options.fallback_speed {
        query.push(("fallback_speed", speed.to_string()));
        let coordinate = match options.fallback_coordinate {
            FallbackCoordinate::Input => "input",
            FallbackCoordinate::Snapped => "snapped",
        };
        query.push(("fallback_coordinate", coordinate.to_string()));
    }
    if let Some(scale) = options.scale_factor {
        query.push(("scale_factor", scale.to_string()));
    }

    query
}

fn trip_query(request: &TripRequest) -> Vec<(&'static str, String)> {
    let source = match request.source() {
        TripSource::Any => "any",
        TripSource::First => "first",
    };
    let destination = match request.destination() {
        TripDestination::Any => "any",
        TripDestination::Last => "last",
    };
    let overview = match request.overview() {
        Overview::Simplified => "simplified",
        Overview::Full => "full",
        Overview::False => "false",
    };

    vec![
        ("roundtrip", request.roundtrip().to_string()),
        ("source", source.to_string()),
        ("destination", destination.to_string()),
        ("overview", overview.to_string()),
        ("geometries", "geojson".to_string()),
    ]
}

/// Maps the response `code` onto success, infeasibility or rejection.
fn check_status(body: &str) -> Result<(), EngineError> {
    let status: OsrmStatus =
        serde_json::from_str(body).map_err(|err| EngineError::Malformed(err.to_string()))?;

    let message = status.message.unwrap_or_default();
    match status.code.as_str() {
        "Ok" => Ok(()),
        "NoRoute" | "NoTrips" | "NoTable" | "NoSegment" => Err(EngineError::Infeasible {
            code: status.code,
            message,
        }),
        _ => Err(EngineError::Rejected {
            code: status.code,
            message,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct OsrmStatus {
    code: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct OsrmTripResponse {
    #[serde(default)]
    trips: Vec<OsrmTrip>,
    #[serde(default)]
    waypoints: Vec<OsrmWaypoint>,
}

#[derive(Debug, Deserialize)]
struct OsrmTrip {
    distance: f64,
    duration: f64,
    geometry: Option<OsrmGeometry>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmWaypoint {
    waypoint_index: usize,
    trips_index: usize,
}

impl OsrmTripResponse {
    fn into_trip(self, submitted: usize) -> Result<TripResponse, EngineError> {
        let mut trips = self.trips;
        if trips.len() != 1 {
            return Err(EngineError::Malformed(format!(
                "expected exactly one trip, got {}",
                trips.len()
            )));
        }
        if self.waypoints.len() != submitted {
            return Err(EngineError::Malformed(format!(
                "expected {} waypoints, got {}",
                submitted,
                self.waypoints.len()
            )));
        }
        if let Some(stray) = self.waypoints.iter().find(|w| w.trips_index != 0) {
            return Err(EngineError::Malformed(format!(
                "waypoint assigned to trip {}",
                stray.trips_index
            )));
        }

        let trip = trips.remove(0);
        let geometry = trip
            .geometry
            .map(|geometry| Polyline::from_lng_lat(&geometry.coordinates))
            .unwrap_or_default();

        Ok(TripResponse {
            distance_m: trip.distance,
            duration_s: trip.duration,
            geometry,
            waypoint_indices: self.waypoints.iter().map(|w| w.waypoint_index).collect(),
        })
    }
}
