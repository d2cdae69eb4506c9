//! Route partitioning by complete-linkage agglomerative clustering.
//!
//! The OD matrix is used directly as a precomputed dissimilarity table.
//! By default every destination column is min-max scaled into [0, 1] on
//! its own, so a few remote addresses cannot stretch the scale for all
//! others, and the pair (i, j) with i < j is read from row i. Clusters are
//! then merged until the requested number of routes remains. Complete
//! linkage keeps the worst intra-route pair cost as small as possible,
//! which keeps single-driver routes compact.
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::matrix::{Matrix, Metric};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartitionError {
    #[error("route count {routes} must be between 1 and the number of addresses ({addresses})")]
    InvalidRouteCount { routes: usize, addresses: usize },
    #[error("no route between addresses {from} and {to}")]
    UnreachablePair { from: usize, to: usize },
    #[error("cost between addresses {from} and {to} is not finite")]
    NonFiniteCost { from: usize, to: usize },
    #[error("route labels must cover 0..{routes} without gaps")]
    NonContiguousLabels { routes: usize },
}

/// How to treat address pairs the engine could not route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Fail the partition.
    #[default]
    Reject,
    /// Count the pair as maximally dissimilar.
    MaxDissimilarity,
}

/// How matrix costs become pair dissimilarities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// Min-max scale each destination column separately, then take the
    /// pair (i, j), i < j, from the upper triangle.
    #[default]
    PerColumn,
    /// One min-max range over all reachable off-diagonal cells, pairs
    /// symmetrized with `max(d[i][j], d[j][i])`. Complete linkage is
    /// invariant under this scaling, so it only matters for the direction
    /// handling.
    GlobalSymmetric,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartitionOptions {
    /// Number of routes (drivers).
    pub routes: usize,
    pub metric: Metric,
    pub scaling: Scaling,
    pub unreachable: UnreachablePolicy,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            routes: 1,
            metric: Metric::Duration,
            scaling: Scaling::PerColumn,
            unreachable: UnreachablePolicy::Reject,
        }
    }
}

/// One route label per address, in address order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAssignment {
    labels: Vec<usize>,
    routes: usize,
}

impl RouteAssignment {
    /// Wraps externally chosen labels, which must use every label in `0..K`.
    pub fn from_labels(labels: Vec<usize>) -> Result<Self, PartitionError> {
        let routes = labels.iter().max().map_or(0, |max| max + 1);
        let mut used = vec![false; routes];
        for &label in &labels {
            used[label] = true;
        }
        if routes == 0 || used.contains(&false) {
            return Err(PartitionError::NonContiguousLabels { routes });
        }
        Ok(Self { labels, routes })
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label(&self, address: usize) -> usize {
        self.labels[address]
    }

    pub fn route_count(&self) -> usize {
        self.routes
    }

    /// Address positions carrying `route`, in their original order.
    pub fn members(&self, route: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == route)
            .map(|(address, _)| address)
            .collect()
    }
}

/// Clusters the addresses of an address-only matrix into `options.routes` routes.
pub fn partition(
    matrix: &Matrix,
    options: &PartitionOptions,
) -> Result<RouteAssignment, PartitionError> {
    let addresses = matrix.size();
    if options.routes == 0 || options.routes > addresses {
        return Err(PartitionError::InvalidRouteCount {
            routes: options.routes,
            addresses,
        });
    }

    let unreachable = matrix.unreachable_count();
    if unreachable > 0 {
        debug!(unreachable, policy = ?options.unreachable, "matrix has unreachable pairs");
    }

    let dissimilarity = normalize(matrix, options.scaling, options.unreachable)?;
    let labels = complete_linkage(dissimilarity, addresses, options.routes);

    info!(addresses, routes = options.routes, "partitioned addresses into routes");

    Ok(RouteAssignment {
        labels,
        routes: options.routes,
    })
}

/// Turns matrix costs into a symmetric, row-major dissimilarity table with
/// a zero diagonal. Missing cells score 1.0 unless `policy` rejects them.
fn normalize(
    matrix: &Matrix,
    scaling: Scaling,
    policy: UnreachablePolicy,
) -> Result<Vec<f64>, PartitionError> {
    let size = matrix.size();
    for from in 0..size {
        for to in (0..size).filter(|&to| to != from) {
            match matrix.get(from, to) {
                Some(value) if !value.is_finite() => {
                    return Err(PartitionError::NonFiniteCost { from, to });
                }
                None if policy == UnreachablePolicy::Reject => {
                    return Err(PartitionError::UnreachablePair { from, to });
                }
                _ => {}
            }
        }
    }

    let mut dissimilarity = vec![0.0; size * size];
    match scaling {
        Scaling::PerColumn => {
            // Ranges include the diagonal.
            let ranges = (0..size)
                .map(|to| value_range((0..size).filter_map(|from| matrix.get(from, to))))
                .collect::<Vec<_>>();
            for from in 0..size {
                for to in (from + 1)..size {
                    let value = scale(matrix.get(from, to), ranges[to]);
                    dissimilarity[from * size + to] = value;
                    dissimilarity[to * size + from] = value;
                }
            }
        }
        Scaling::GlobalSymmetric => {
            let range = value_range(
                (0..size)
                    .flat_map(|from| (0..size).map(move |to| (from, to)))
                    .filter(|&(from, to)| from != to)
                    .filter_map(|(from, to)| matrix.get(from, to)),
            );
            for from in 0..size {
                for to in (from + 1)..size {
                    let value =
                        scale(matrix.get(from, to), range).max(scale(matrix.get(to, from), range));
                    dissimilarity[from * size + to] = value;
                    dissimilarity[to * size + from] = value;
                }
            }
        }
    }

    Ok(dissimilarity)
}

/// `(min, max)` of `values`, or `None` when there are none.
fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |range, value| match range {
        None => Some((value, value)),
        Some((min, max)) => Some((f64::min(min, value), f64::max(max, value))),
    })
}

/// A constant range maps to 0.0; a missing cell to 1.0.
fn scale(value: Option<f64>, range: Option<(f64, f64)>) -> f64 {
    match (value, range) {
        (Some(value), Some((min, max))) if max > min => (value - min) / (max - min),
        (Some(_), _) => 0.0,
        (None, _) => 1.0,
    }
}

/// Agglomerates `size` singletons until `target` clusters remain and returns
/// labels numbered by first appearance.
///
/// Uses the Lance-Williams update for complete linkage:
/// `d(k, i ∪ j) = max(d(k, i), d(k, j))`. Ties go to the lowest (i, j).
fn complete_linkage(mut distances: Vec<f64>, size: usize, target: usize) -> Vec<usize> {
    let mut active = vec![true; size];
    let mut cluster_of = (0..size).collect::<Vec<_>>();
    let mut remaining = size;

    while remaining > target {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..size).filter(|&i| active[i]) {
            for j in ((i + 1)..size).filter(|&j| active[j]) {
                let distance = distances[i * size + j];
                if best.is_none_or(|(_, _, current)| distance < current) {
                    best = Some((i, j, distance));
                }
            }
        }

        let Some((keep, absorb, _)) = best else {
            break;
        };

        for other in (0..size).filter(|&other| active[other] && other != keep && other != absorb) {
            let merged = distances[keep * size + other].max(distances[absorb * size + other]);
            distances[keep * size + other] = merged;
            distances[other * size + keep] = merged;
        }
        active[absorb] = false;
        for cluster in cluster_of.iter_mut().filter(|cluster| **cluster == absorb) {
            *cluster = keep;
        }
        remaining -= 1;
    }

    let mut label_of_cluster = vec![None; size];
    let mut next_label = 0;
    cluster_of
        .iter()
        .map(|&cluster| {
            *label_of_cluster[cluster].get_or_insert_with(|| {
                next_label += 1;
                next_label - 1
            })
        })
        .collect()
}
