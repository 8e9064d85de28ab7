//! Fitting machinery.
//!
//! - bounded parameters and the model interface (`params`)
//! - χ² statistic (`stat`)
//! - Levenberg–Marquardt optimiser (`levmar`)
//! - fit orchestration and error estimates (`fitter`)
//! - serializable results (`results`)

pub mod fitter;
pub mod levmar;
pub mod params;
pub mod results;
pub mod stat;

pub use fitter::*;
pub use levmar::*;
pub use params::*;
pub use results::*;
pub use stat::*;
