//! Physical constants in cgs units (CODATA 2018 values).

use std::f64::consts::PI;

/// Speed of light (cm s^-1).
pub const C: f64 = 2.997_924_58e10;

/// Electron mass (g).
pub const M_E: f64 = 9.109_383_701_5e-28;

/// Elementary charge (esu).
pub const E_CHARGE: f64 = 4.803_204_712_570_263e-10;

/// Planck constant (erg s).
pub const H: f64 = 6.626_070_15e-27;

/// Boltzmann constant (erg K^-1).
pub const K_B: f64 = 1.380_649e-16;

/// Thomson cross section (cm^2).
pub const SIGMA_T: f64 = 6.652_458_732_1e-25;

/// Gravitational constant (cm^3 g^-1 s^-2).
pub const G: f64 = 6.674_30e-8;

/// Solar mass (g).
pub const M_SUN: f64 = 1.988_409_870_698_051e33;

/// Stefan-Boltzmann constant (erg cm^-2 s^-1 K^-4).
pub const SIGMA_SB: f64 = 5.670_374_419e-5;

/// Radiation constant `a = 4 σ_SB / c` (erg cm^-3 K^-4).
pub const A_RAD: f64 = 4.0 * SIGMA_SB / C;

/// Electron rest energy (erg).
pub const MEC2: f64 = M_E * C * C;

/// Electron Compton wavelength `h / (m_e c)` (cm).
pub const LAMBDA_C: f64 = H / (M_E * C);

/// Critical magnetic field `m_e^2 c^3 / (e ħ)` (G).
pub const B_CR: f64 = 4.414e13;

/// One electronvolt (erg).
pub const EV: f64 = 1.602_176_634e-12;

/// One angstrom (cm).
pub const ANGSTROM: f64 = 1e-8;

/// One parsec (cm).
pub const PARSEC: f64 = 3.085_677_581_491_367e18;

/// Present-day CMB temperature (K).
pub const T_CMB0: f64 = 2.72548;

/// One day (s).
pub const DAY: f64 = 86_400.0;

/// `4π`, used by every flux prefactor.
pub const FOUR_PI: f64 = 4.0 * PI;

/// Dimensionless photon energy `ε = hν / (m_e c^2)`.
pub fn nu_to_epsilon(nu: f64) -> f64 {
    H * nu / MEC2
}

/// Frequency (Hz) of a photon with energy `energy_ev` (eV).
pub fn ev_to_hz(energy_ev: f64) -> f64 {
    energy_ev * EV / H
}
