//! End-to-end planning pipeline.
//!
//! Location ordering for the full matrix is the depot at index 0 followed by
//! the addresses in input order. Clustering runs on the address-only
//! submatrix.

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, PlannerConfig};
use crate::location::{Depot, Location, planning_coordinates};
use crate::matrix::{DimensionError, OdMatrix};
use crate::merger::{MergeError, PlanningResult, merge};
use crate::osrm::OsrmClient;
use crate::partition::{PartitionError, RouteAssignment, partition};
use crate::sequencer::{RouteSequencer, SequenceError};
use crate::tiler::{MatrixError, MatrixTiler};
use crate::traits::RoutingEngine;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build routing engine client")]
    Client(#[from] reqwest::Error),
    #[error("matrix assembly failed")]
    Matrix(#[from] MatrixError),
    #[error("matrix covers {actual} locations, expected depot + {addresses} addresses")]
    MatrixSize { addresses: usize, actual: usize },
    #[error(transparent)]
    Dimension(#[from] DimensionError),
    #[error("route partitioning failed")]
    Partition(#[from] PartitionError),
    #[error("invalid sequencing options")]
    Sequencer(#[from] SequenceError),
    #[error("result merge failed")]
    Merge(#[from] MergeError),
}

/// Builds an OSRM client from the configuration.
pub fn connect(config: &PlannerConfig) -> Result<OsrmClient, PlanError> {
    Ok(OsrmClient::new(config.osrm.clone())?)
}

pub struct Planner<'a, E: RoutingEngine> {
    engine: &'a E,
    config: PlannerConfig,
}

impl<'a, E: RoutingEngine> Planner<'a, E> {
    pub fn new(engine: &'a E, config: PlannerConfig) -> Result<Self, PlanError> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Full OD matrix over depot + addresses.
    pub fn assemble_matrix(
        &self,
        depot: &Depot,
        addresses: &[Location],
    ) -> Result<OdMatrix, PlanError> {
        let tiler = MatrixTiler::new(self.engine, self.config.batch_size, self.config.table.clone())?;
        Ok(tiler.assemble(&planning_coordinates(depot, addresses))?)
    }

    /// Route labels for `addresses` from a depot-inclusive matrix.
    pub fn assign_routes(
        &self,
        addresses: &[Location],
        matrix: &OdMatrix,
    ) -> Result<RouteAssignment, PlanError> {
        if matrix.size() != addresses.len() + 1 {
            return Err(PlanError::MatrixSize {
                addresses: addresses.len(),
                actual: matrix.size(),
            });
        }

        let address_indices = (1..=addresses.len()).collect::<Vec<_>>();
        let costs = matrix
            .metric(self.config.partition.metric)
            .submatrix(&address_indices)?;
        Ok(partition(&costs, &self.config.partition)?)
    }

    /// Runs the whole pipeline.
    pub fn plan(&self, depot: &Depot, addresses: &[Location]) -> Result<PlanningResult, PlanError> {
        let matrix = self.assemble_matrix(depot, addresses)?;
        self.plan_with_matrix(depot, addresses, &matrix)
    }

    /// Partitions, sequences and merges using an already assembled matrix.
    pub fn plan_with_matrix(
        &self,
        depot: &Depot,
        addresses: &[Location],
        matrix: &OdMatrix,
    ) -> Result<PlanningResult, PlanError> {
        let assignment = self.assign_routes(addresses, matrix)?;

        let sequencer = RouteSequencer::new(self.engine, self.config.sequencing.clone())?;
        let sequenced = sequencer.sequence_all(depot, addresses, &assignment);
        let result = merge(addresses, sequenced)?;

        info!(
            addresses = addresses.len(),
            routes = assignment.route_count(),
            failed = result.failures.len(),
            "planning finished"
        );
        Ok(result)
    }
}
