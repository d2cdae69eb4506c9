//! Straight-line routing engine for tests.
//!
//! Tables use great-circle distance and a constant speed, optionally
//! inflated for northbound travel so that costs are directed. Trips are a
//! nearest-neighbour tour from the first coordinate. Every call is
//! recorded, and failures can be injected per coordinate.

use std::sync::Mutex;

use delivery_planner::polyline::Polyline;
use delivery_planner::traits::{
    EngineError, RoutingEngine, TableRequest, TableResponse, TripRequest, TripResponse,
};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// 40 km/h.
const DEFAULT_SPEED_MPS: f64 = 40.0 / 3.6;

pub fn haversine_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_lng / 2.0).sin().powi(2);

    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCall {
    pub coordinates: usize,
    pub sources: usize,
    pub destinations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripCall {
    pub coordinates: Vec<(f64, f64)>,
}

pub struct MockEngine {
    speed_mps: f64,
    northbound_factor: f64,
    max_table_size: usize,
    max_trip_size: usize,
    failing_table_at: Vec<(f64, f64)>,
    infeasible_trip_at: Vec<(f64, f64)>,
    isolated: Vec<(f64, f64)>,
    table_calls: Mutex<Vec<TableCall>>,
    trip_calls: Mutex<Vec<TripCall>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            speed_mps: DEFAULT_SPEED_MPS,
            northbound_factor: 1.0,
            max_table_size: 100,
            max_trip_size: 100,
            failing_table_at: Vec::new(),
            infeasible_trip_at: Vec::new(),
            isolated: Vec::new(),
            table_calls: Mutex::new(Vec::new()),
            trip_calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiplies cost when the destination lies north of the origin.
    pub fn northbound_factor(mut self, factor: f64) -> Self {
        self.northbound_factor = factor;
        self
    }

    /// Per-axis table limit, like osrm-routed `--max-table-size`.
    pub fn max_table_size(mut self, size: usize) -> Self {
        self.max_table_size = size;
        self
    }

    pub fn max_trip_size(mut self, size: usize) -> Self {
        self.max_trip_size = size;
        self
    }

    /// Table queries touching `coords` fail with a malformed response.
    pub fn failing_table_at(mut self, coords: (f64, f64)) -> Self {
        self.failing_table_at.push(coords);
        self
    }

    /// Trip queries touching `coords` report no feasible trip.
    pub fn infeasible_trip_at(mut self, coords: (f64, f64)) -> Self {
        self.infeasible_trip_at.push(coords);
        self
    }

    /// No route leads to or from `coords`.
    pub fn isolated(mut self, coords: (f64, f64)) -> Self {
        self.isolated.push(coords);
        self
    }

    pub fn table_calls(&self) -> Vec<TableCall> {
        self.table_calls.lock().unwrap().clone()
    }

    pub fn trip_calls(&self) -> Vec<TripCall> {
        self.trip_calls.lock().unwrap().clone()
    }

    /// (seconds, meters) from `from` to `to`, or `None` if unroutable.
    pub fn cost(&self, from: (f64, f64), to: (f64, f64)) -> Option<(f64, f64)> {
        if from == to {
            return Some((0.0, 0.0));
        }
        if self.isolated.contains(&from) || self.isolated.contains(&to) {
            return None;
        }
        let mut distance = haversine_m(from, to);
        if to.0 > from.0 {
            distance *= self.northbound_factor;
        }
        Some((distance / self.speed_mps, distance))
    }
}

impl RoutingEngine for MockEngine {
    fn table(
        &self,
        coordinates: &[(f64, f64)],
        request: &TableRequest,
    ) -> Result<TableResponse, EngineError> {
        request.check_indices(coordinates.len())?;
        let all = (0..coordinates.len()).collect::<Vec<_>>();
        let sources = request.sources().unwrap_or(&all[..]);
        let destinations = request.destinations().unwrap_or(&all[..]);

        self.table_calls.lock().unwrap().push(TableCall {
            coordinates: coordinates.len(),
            sources: sources.len(),
            destinations: destinations.len(),
        });

        if sources.len() > self.max_table_size || destinations.len() > self.max_table_size {
            return Err(EngineError::Rejected {
                code: "TooBig".into(),
                message: "Too many table coordinates".into(),
            });
        }
        if coordinates.iter().any(|c| self.failing_table_at.contains(c)) {
            return Err(EngineError::Malformed("truncated body".into()));
        }

        let mut durations = Vec::with_capacity(sources.len());
        let mut distances = Vec::with_capacity(sources.len());
        for &from in sources {
            let (row_durations, row_distances): (Vec<_>, Vec<_>) = destinations
                .iter()
                .map(|&to| match self.cost(coordinates[from], coordinates[to]) {
                    Some((duration, distance)) => (Some(duration), Some(distance)),
                    None => (None, None),
                })
                .unzip();
            durations.push(row_durations);
            distances.push(row_distances);
        }

        Ok(TableResponse {
            durations: request.annotations().wants_duration().then_some(durations),
            distances: request.annotations().wants_distance().then_some(distances),
        })
    }

    fn trip(
        &self,
        coordinates: &[(f64, f64)],
        request: &TripRequest,
    ) -> Result<TripResponse, EngineError> {
        self.trip_calls.lock().unwrap().push(TripCall {
            coordinates: coordinates.to_vec(),
        });

        if coordinates.len() > self.max_trip_size {
            return Err(EngineError::Rejected {
                code: "TooBig".into(),
                message: "Number of entries is larger than the limit".into(),
            });
        }
        if coordinates.iter().any(|c| self.infeasible_trip_at.contains(c)) {
            return Err(EngineError::Infeasible {
                code: "NoTrips".into(),
                message: "No trip visiting all destinations possible.".into(),
            });
        }

        // Nearest neighbour from the first coordinate.
        let mut visited = vec![false; coordinates.len()];
        let mut order = vec![0];
        visited[0] = true;
        while order.len() < coordinates.len() {
            let current = coordinates[*order.last().unwrap()];
            let next = (0..coordinates.len())
                .filter(|&i| !visited[i])
                .min_by(|&a, &b| {
                    haversine_m(current, coordinates[a]).total_cmp(&haversine_m(current, coordinates[b]))
                })
                .unwrap();
            visited[next] = true;
            order.push(next);
        }

        let mut path = order.iter().map(|&i| coordinates[i]).collect::<Vec<_>>();
        if request.roundtrip() {
            path.push(coordinates[0]);
        }
        let distance_m = path.windows(2).map(|pair| haversine_m(pair[0], pair[1])).sum::<f64>();

        let mut waypoint_indices = vec![0; coordinates.len()];
        for (position, &input) in order.iter().enumerate() {
            waypoint_indices[input] = position;
        }

        Ok(TripResponse {
            distance_m,
            duration_s: distance_m / self.speed_mps,
            geometry: Polyline::new(path),
            waypoint_indices,
        })
    }
}
