//! Test fixtures for delivery-planner.
//!
//! Provides:
//! - Real Calgary locations around the Aero Drive depot
//! - A straight-line mock routing engine with call recording

#![allow(dead_code)]

pub mod calgary_locations;
pub mod mock_engine;

pub use calgary_locations::*;
pub use mock_engine::*;
