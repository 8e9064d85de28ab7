//! `blazar-ssc` library crate.
//!
//! Photon fields around a relativistic jet and synchrotron self-Compton SED
//! fitting. The binary (`blazar`) is a thin wrapper around [`app::run`]; the
//! pipelines, physics and fitter are all usable from this library.
//!
//! - `physics`, `math`: constants, cosmology and numerical helpers
//! - `particles`, `emission`, `radiative`, `targets`: the emission model
//! - `models`, `fit`, `data`: fittable SSC model, optimiser and datasets
//! - `io`, `plot`, `report`: files, figures and terminal output
//! - `cli`, `app`, `domain`: command line, pipelines and shared config types

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod emission;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod particles;
pub mod physics;
pub mod plot;
pub mod radiative;
pub mod report;
pub mod targets;
