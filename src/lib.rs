//! delivery-planner
//!
//! Plans depot-based delivery routes on top of an external routing engine:
//! tiled OD matrix assembly, complete-linkage route partitioning, per-route
//! trip sequencing and reconciliation of the engine's stop order.

pub mod config;
pub mod export;
pub mod location;
pub mod matrix;
pub mod merger;
pub mod osrm;
pub mod partition;
pub mod planner;
pub mod polyline;
pub mod sequencer;
pub mod tiler;
pub mod traits;

pub use config::PlannerConfig;
pub use location::{Depot, Location};
pub use merger::PlanningResult;
pub use planner::{PlanError, Planner};
