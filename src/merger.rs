//! Joins sequenced tours back onto the address records.
//!
//! The engine reports one `waypoint_index` per submitted coordinate, in
//! submission order. Alignment is therefore positional: the depot occupies
//! position 0 and the remaining entries pair up with the route's addresses
//! in the order they were submitted. [`reconcile`] is the only place that
//! relies on this.

use thiserror::Error;
use tracing::{info, warn};

use crate::location::Location;
use crate::polyline::Polyline;
use crate::sequencer::{RouteTour, SequenceError, SequencedRoute};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("expected {expected} waypoints (depot + addresses), got {actual}")]
    WaypointCountMismatch { expected: usize, actual: usize },
    #[error("depot has waypoint index {0}, expected 0")]
    DepotNotFirst(usize),
    #[error("waypoint index {index} outside 1..={max}")]
    WaypointOutOfRange { index: usize, max: usize },
    #[error("waypoint index {0} assigned twice")]
    DuplicateWaypoint(usize),
}

/// Inconsistent input to [`merge`] itself, as opposed to a bad route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("route {route} refers to unknown address {address}")]
    UnknownAddress { route: usize, address: usize },
}

/// Why a route ended up unplanned.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("leg {leg} cannot be reconciled")]
    Reconcile { leg: usize, source: ReconcileError },
}

/// Delivery ranks (1-based) for `addresses` submitted after the depot.
///
/// `waypoint_indices` covers the depot at position 0 followed by the
/// addresses in submitted order. Any count mismatch, misplaced depot,
/// out-of-range or repeated index is an error.
pub fn reconcile(addresses: usize, waypoint_indices: &[usize]) -> Result<Vec<usize>, ReconcileError> {
    if waypoint_indices.len() != addresses + 1 {
        return Err(ReconcileError::WaypointCountMismatch {
            expected: addresses + 1,
            actual: waypoint_indices.len(),
        });
    }
    if waypoint_indices[0] != 0 {
        return Err(ReconcileError::DepotNotFirst(waypoint_indices[0]));
    }

    let mut seen = vec![false; addresses + 1];
    waypoint_indices[1..]
        .iter()
        .map(|&index| {
            if index == 0 || index > addresses {
                return Err(ReconcileError::WaypointOutOfRange {
                    index,
                    max: addresses,
                });
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(ReconcileError::DuplicateWaypoint(index));
            }
            Ok(index)
        })
        .collect()
}

/// An address with its route and delivery rank.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStop {
    pub location: Location,
    pub route: usize,
    /// 1-based position in delivery order; the depot is not ranked.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub route: usize,
    /// Addresses served, depot excluded.
    pub stop_count: usize,
    pub legs: usize,
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: Polyline,
    /// Address ids in delivery order.
    pub sequence: Vec<String>,
}

#[derive(Debug)]
pub struct RouteFailure {
    pub route: usize,
    /// Ids of the addresses left unplanned.
    pub addresses: Vec<String>,
    pub error: RouteError,
}

#[derive(Debug, Default)]
pub struct PlanningResult {
    /// Ordered by route, then rank.
    pub stops: Vec<PlannedStop>,
    pub routes: Vec<RouteSummary>,
    pub failures: Vec<RouteFailure>,
}

impl PlanningResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn stops_for(&self, route: usize) -> impl Iterator<Item = &PlannedStop> {
        self.stops.iter().filter(move |stop| stop.route == route)
    }

    pub fn summary(&self, route: usize) -> Option<&RouteSummary> {
        self.routes.iter().find(|summary| summary.route == route)
    }
}

/// Builds the planning result from per-route sequencing outcomes.
///
/// Routes that failed to sequence, or whose engine order cannot be
/// reconciled, are listed in `failures`; every other route is merged.
/// Route metrics come straight from the tours.
pub fn merge(
    addresses: &[Location],
    sequenced: Vec<SequencedRoute>,
) -> Result<PlanningResult, MergeError> {
    for entry in &sequenced {
        let legs = entry.outcome.as_ref().map_or(&[][..], |tour| tour.legs.as_slice());
        let mut referenced = entry
            .members
            .iter()
            .chain(legs.iter().flat_map(|leg| &leg.addresses));
        if let Some(&address) = referenced.find(|&&address| address >= addresses.len()) {
            return Err(MergeError::UnknownAddress {
                route: entry.route,
                address,
            });
        }
    }

    let mut result = PlanningResult::default();

    for SequencedRoute {
        route,
        members,
        outcome,
    } in sequenced
    {
        let stops = outcome
            .map_err(RouteError::from)
            .and_then(|tour| ranked_stops(route, addresses, &tour).map(|stops| (tour, stops)));

        let (tour, stops) = match stops {
            Ok(merged) => merged,
            Err(error) => {
                if let RouteError::Reconcile { leg, source } = &error {
                    warn!(route, leg, error = %source, "engine stop order cannot be reconciled");
                }
                result.failures.push(RouteFailure {
                    route,
                    addresses: members
                        .iter()
                        .map(|&address| addresses[address].id().to_string())
                        .collect(),
                    error,
                });
                continue;
            }
        };

        result.routes.push(RouteSummary {
            route,
            stop_count: stops.len(),
            legs: tour.legs.len(),
            distance_m: tour.distance_m(),
            duration_s: tour.duration_s(),
            geometry: tour.geometry(),
            sequence: stops.iter().map(|stop| stop.location.id().to_string()).collect(),
        });
        result.stops.extend(stops);
    }

    info!(
        stops = result.stops.len(),
        routes = result.routes.len(),
        failed = result.failures.len(),
        "merged planning result"
    );
    Ok(result)
}

/// Stops of one tour in delivery order, ranks continuing across legs.
/// Address positions must already be known to be in range.
fn ranked_stops(
    route: usize,
    addresses: &[Location],
    tour: &RouteTour,
) -> Result<Vec<PlannedStop>, RouteError> {
    let mut stops = Vec::with_capacity(tour.address_count());
    let mut offset = 0;
    for (leg, tour_leg) in tour.legs.iter().enumerate() {
        let ranks = reconcile(tour_leg.addresses.len(), &tour_leg.trip.waypoint_indices)
            .map_err(|source| RouteError::Reconcile { leg, source })?;

        for (&address, rank) in tour_leg.addresses.iter().zip(ranks) {
            stops.push(PlannedStop {
                location: addresses[address].clone(),
                route,
                rank: offset + rank,
            });
        }
        offset += tour_leg.addresses.len();
    }
    stops.sort_by_key(|stop| stop.rank);
    Ok(stops)
}
