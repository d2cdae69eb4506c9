//! Per-route tour sequencing.
//!
//! Tour construction itself belongs to the routing engine. This module only
//! frames the trip query: depot first, closed round trip fixed to start at
//! the depot, and a hard cap on stops per call.

use rayon::prelude::*;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::location::{Depot, Location};
use crate::partition::RouteAssignment;
use crate::polyline::Polyline;
use crate::traits::{EngineError, RoutingEngine, TripRequest, TripResponse};

/// Largest trip (depot included) a stock OSRM server will solve.
pub const DEFAULT_MAX_STOPS: usize = 100;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("route has no addresses")]
    EmptyRoute,
    #[error("stop cap must leave room for the depot and one address, got {0}")]
    InvalidStopCap(usize),
    #[error("{stops} stops exceed the per-trip cap of {cap}")]
    ExceedsStopCap { stops: usize, cap: usize },
    #[error("trip for leg {leg} failed")]
    Engine { leg: usize, source: EngineError },
}

/// What to do with a route that does not fit in one trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverCapPolicy {
    /// Sequence consecutive chunks as separate closed legs from the depot.
    #[default]
    Split,
    /// Fail the route.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SequencerOptions {
    /// Stops per trip call, depot included.
    pub max_stops: usize,
    pub over_cap: OverCapPolicy,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            max_stops: DEFAULT_MAX_STOPS,
            over_cap: OverCapPolicy::Split,
        }
    }
}

/// One engine trip: the depot followed by `addresses`.
#[derive(Debug, Clone, PartialEq)]
pub struct TourLeg {
    /// Address positions in the order they were submitted after the depot.
    pub addresses: Vec<usize>,
    /// Raw engine output; `waypoint_indices[0]` belongs to the depot.
    pub trip: TripResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteTour {
    pub route: usize,
    pub legs: Vec<TourLeg>,
}

impl RouteTour {
    pub fn address_count(&self) -> usize {
        self.legs.iter().map(|leg| leg.addresses.len()).sum()
    }

    pub fn distance_m(&self) -> f64 {
        self.legs.iter().map(|leg| leg.trip.distance_m).sum()
    }

    pub fn duration_s(&self) -> f64 {
        self.legs.iter().map(|leg| leg.trip.duration_s).sum()
    }

    /// Leg geometries joined end to end.
    pub fn geometry(&self) -> Polyline {
        let mut geometry = Polyline::default();
        for leg in &self.legs {
            geometry.extend(&leg.trip.geometry);
        }
        geometry
    }
}

/// Sequencing outcome for one route label.
#[derive(Debug)]
pub struct SequencedRoute {
    pub route: usize,
    /// Address positions assigned to the route, in original order.
    pub members: Vec<usize>,
    pub outcome: Result<RouteTour, SequenceError>,
}

pub struct RouteSequencer<'a, E: RoutingEngine> {
    engine: &'a E,
    options: SequencerOptions,
}

impl<'a, E: RoutingEngine> RouteSequencer<'a, E> {
    pub fn new(engine: &'a E, options: SequencerOptions) -> Result<Self, SequenceError> {
        if options.max_stops < 2 {
            return Err(SequenceError::InvalidStopCap(options.max_stops));
        }
        Ok(Self { engine, options })
    }

    /// Sequences one route. `members` index into `addresses`.
    pub fn sequence_route(
        &self,
        route: usize,
        depot: &Depot,
        addresses: &[Location],
        members: &[usize],
    ) -> Result<RouteTour, SequenceError> {
        if members.is_empty() {
            return Err(SequenceError::EmptyRoute);
        }

        let per_leg = self.options.max_stops - 1;
        if members.len() > per_leg {
            match self.options.over_cap {
                OverCapPolicy::Reject => {
                    return Err(SequenceError::ExceedsStopCap {
                        stops: members.len() + 1,
                        cap: self.options.max_stops,
                    });
                }
                OverCapPolicy::Split => {
                    warn!(
                        route,
                        stops = members.len() + 1,
                        cap = self.options.max_stops,
                        legs = members.len().div_ceil(per_leg),
                        "route exceeds stop cap, splitting into legs"
                    );
                }
            }
        }

        let request = TripRequest::closed_from_first();
        let mut legs = Vec::new();
        for (leg, chunk) in members.chunks(per_leg).enumerate() {
            let coordinates = std::iter::once(depot.coords())
                .chain(chunk.iter().map(|&address| addresses[address].coords()))
                .collect::<Vec<_>>();

            let trip = self
                .engine
                .trip(&coordinates, &request)
                .map_err(|source| SequenceError::Engine { leg, source })?;

            legs.push(TourLeg {
                addresses: chunk.to_vec(),
                trip,
            });
        }

        let tour = RouteTour { route, legs };
        info!(
            route,
            stops = tour.address_count() + 1,
            legs = tour.legs.len(),
            distance_m = tour.distance_m(),
            duration_s = tour.duration_s(),
            "sequenced route"
        );
        Ok(tour)
    }

    /// Sequences every route of `assignment` in parallel.
    ///
    /// A failing route is reported in its own outcome and does not stop the
    /// others. Outcomes are ordered by route label.
    pub fn sequence_all(
        &self,
        depot: &Depot,
        addresses: &[Location],
        assignment: &RouteAssignment,
    ) -> Vec<SequencedRoute> {
        (0..assignment.route_count())
            .into_par_iter()
            .map(|route| {
                let members = assignment.members(route);
                let outcome = self.sequence_route(route, depot, addresses, &members);
                if let Err(err) = &outcome {
                    warn!(route, error = %err, "route sequencing failed");
                }
                SequencedRoute {
                    route,
                    members,
                    outcome,
                }
            })
            .collect()
    }
}
