//! Domain types used throughout the pipelines.
//!
//! This module defines:
//!
//! - run configurations (`EnergyDensityConfig`, `FitConfig`, `SimulateConfig`)
//! - the SSC starting point (`SscStart`)
//! - serializable outputs (`EnergyDensityRun`, `FitReport`)

pub mod types;

pub use types::*;
