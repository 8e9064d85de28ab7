//! Numerical utilities: grids, quadrature, special functions and least squares.

pub mod grid;
pub mod integrate;
pub mod ols;
pub mod special;

pub use grid::*;
pub use integrate::*;
pub use ols::*;
pub use special::*;
