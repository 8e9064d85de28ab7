//! Fittable parameters and the model interface the optimiser drives.

use serde::Serialize;

use crate::error::AppError;

/// A named, bounded model parameter.
///
/// The value is kept inside `[min, max]` on every assignment: out-of-range
/// values are clipped, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    name: String,
    value: f64,
    min: f64,
    max: f64,
    frozen: bool,
    units: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64, min: f64, max: f64) -> Result<Self, AppError> {
        let name = name.into();
        if !(min.is_finite() && max.is_finite() && min <= max) {
            return Err(AppError::new(2, format!("Invalid bounds for parameter {name}: [{min}, {max}]")));
        }
        if value.is_nan() {
            return Err(AppError::new(2, format!("Parameter {name} cannot be NaN")));
        }
        Ok(Self {
            name,
            value: value.clamp(min, max),
            min,
            max,
            frozen: false,
            units: String::new(),
        })
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Assign a new value, clipped into bounds. NaN leaves the value unchanged.
    pub fn set_value(&mut self, value: f64) {
        if !value.is_nan() {
            self.value = value.clamp(self.min, self.max);
        }
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn thaw(&mut self) {
        self.frozen = false;
    }
}

/// A model whose parameters can be fitted to one-dimensional data.
///
/// `calc` must be a pure function of the full parameter vector so the
/// optimiser can probe trial points from several threads at once.
pub trait FittableModel: Send + Sync {
    fn name(&self) -> &str;

    fn params(&self) -> &[Parameter];

    fn params_mut(&mut self) -> &mut [Parameter];

    /// Model values at `x` for the full (frozen and thawed) parameter vector.
    fn calc(&self, pars: &[f64], x: &[f64]) -> Result<Vec<f64>, AppError>;

    /// Model values at `x` for the current parameter values.
    fn eval(&self, x: &[f64]) -> Result<Vec<f64>, AppError> {
        self.calc(&self.param_values(), x)
    }

    fn param_values(&self) -> Vec<f64> {
        self.params().iter().map(Parameter::value).collect()
    }

    fn thawed_indices(&self) -> Vec<usize> {
        self.params()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| (!p.is_frozen()).then_some(i))
            .collect()
    }

    fn param_index(&self, name: &str) -> Result<usize, AppError> {
        self.params()
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| AppError::new(2, format!("Model {} has no parameter named {name}", self.name())))
    }

    fn param(&self, name: &str) -> Result<&Parameter, AppError> {
        let idx = self.param_index(name)?;
        Ok(&self.params()[idx])
    }

    fn param_mut(&mut self, name: &str) -> Result<&mut Parameter, AppError> {
        let idx = self.param_index(name)?;
        Ok(&mut self.params_mut()[idx])
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<(), AppError> {
        self.param_mut(name)?.set_value(value);
        Ok(())
    }

    fn freeze(&mut self, name: &str) -> Result<(), AppError> {
        self.param_mut(name)?.freeze();
        Ok(())
    }

    fn thaw(&mut self, name: &str) -> Result<(), AppError> {
        self.param_mut(name)?.thaw();
        Ok(())
    }

    /// Write a full parameter vector back into the model (clipped).
    fn set_param_values(&mut self, values: &[f64]) {
        for (p, &v) in self.params_mut().iter_mut().zip(values) {
            p.set_value(v);
        }
    }
}
