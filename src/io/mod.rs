//! Input/output helpers.
//!
//! - SED table ingest, ECSV or CSV (`ingest`)
//! - SED table and JSON report exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
