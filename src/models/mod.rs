//! Fittable emission models.

pub mod ssc;

pub use ssc::*;
