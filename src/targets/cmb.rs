//! Cosmic microwave background at the source redshift.

use crate::emission::Blob;
use crate::physics::{A_RAD, T_CMB0};
use crate::targets::PhotonTarget;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cmb {
    z: f64,
}

impl Cmb {
    pub fn new(z: f64) -> Self {
        Self { z }
    }

    /// Temperature at the source redshift (K).
    pub fn temperature(&self) -> f64 {
        T_CMB0 * (1.0 + self.z)
    }

    /// Energy density in the galaxy frame (erg cm^-3).
    pub fn u_0(&self) -> f64 {
        A_RAD * self.temperature().powi(4)
    }
}

impl PhotonTarget for Cmb {
    fn label(&self) -> &str {
        "CMB"
    }

    /// Independent of `r`: the field is isotropic and homogeneous.
    fn u(&self, _r: f64, blob: &Blob) -> f64 {
        let beta = blob.beta();
        self.u_0() * blob.gamma() * blob.gamma() * (1.0 + beta * beta / 3.0)
    }
}
