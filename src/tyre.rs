use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters describing the attitude of a tyre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TyreAttitude {
    /// Normal load acting on the tyre (N).
    pub normal_load: f64,
    /// Track grip-factor multiplier applied to friction capacity.
    #[serde(default = "default_grip_factor")]
    pub grip_factor: f64,
}

fn default_grip_factor() -> f64 {
    1.0
}

impl TyreAttitude {
    pub fn new(normal_load: f64) -> Self {
        Self {
            normal_load,
            grip_factor: 1.0,
        }
    }

    pub fn with_grip_factor(normal_load: f64, grip_factor: f64) -> Self {
        Self {
            normal_load,
            grip_factor,
        }
    }
}

/// The tyre was asked to sustain a force outside its validity envelope.
///
/// Recovered locally by the solver (zero available traction); never
/// surfaced through the public error type.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("required force {required:.1} N exceeds tyre maximum {maximum:.1} N")]
pub struct InvalidAttitude {
    pub required: f64,
    pub maximum: f64,
}

/// Tyre model variants, selected by the `model_type` discriminator in the
/// vehicle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type")]
pub enum TyreModel {
    #[serde(rename = "linear")]
    Linear(LinearTyreModel),
}

impl TyreModel {
    pub fn calculate_lateral_force(
        &self,
        attitude: &TyreAttitude,
        required_fx: f64,
    ) -> Result<f64, InvalidAttitude> {
        match self {
            TyreModel::Linear(model) => model.calculate_lateral_force(attitude, required_fx),
        }
    }

    pub fn calculate_longitudinal_force(
        &self,
        attitude: &TyreAttitude,
        required_fy: f64,
    ) -> Result<f64, InvalidAttitude> {
        match self {
            TyreModel::Linear(model) => model.calculate_longitudinal_force(attitude, required_fy),
        }
    }

    pub fn get_slip_ratio(&self, fx: f64) -> f64 {
        match self {
            TyreModel::Linear(model) => fx / model.slip_stiffness,
        }
    }

    pub fn get_slip_angle(&self, fy: f64) -> f64 {
        match self {
            TyreModel::Linear(model) => fy / model.cornering_stiffness,
        }
    }
}

/// Load-sensitive linear tyre model.
///
/// The friction coefficient falls linearly with normal load; combined
/// slip trades the two axes along a friction ellipse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTyreModel {
    pub mu_x_peak: f64,
    pub mu_x_load_sensitivity: f64,
    pub mu_y_peak: f64,
    pub mu_y_load_sensitivity: f64,
    /// Longitudinal force generated per unit of slip ratio (N).
    pub slip_stiffness: f64,
    /// Lateral force generated per unit of slip angle (N/rad).
    pub cornering_stiffness: f64,
}

impl LinearTyreModel {
    fn mu_x(&self, normal_load: f64) -> f64 {
        self.mu_x_peak - self.mu_x_load_sensitivity * normal_load
    }

    fn mu_y(&self, normal_load: f64) -> f64 {
        self.mu_y_peak - self.mu_y_load_sensitivity * normal_load
    }

    fn fx_max(&self, attitude: &TyreAttitude) -> f64 {
        self.mu_x(attitude.normal_load) * attitude.normal_load * attitude.grip_factor
    }

    fn fy_max(&self, attitude: &TyreAttitude) -> f64 {
        self.mu_y(attitude.normal_load) * attitude.normal_load * attitude.grip_factor
    }

    fn scale_factor(required_force: f64, maximum_force: f64) -> Result<f64, InvalidAttitude> {
        if maximum_force <= 0.0 || required_force.abs() > maximum_force {
            return Err(InvalidAttitude {
                required: required_force,
                maximum: maximum_force,
            });
        }
        Ok((1.0 - (required_force / maximum_force).powi(2)).sqrt())
    }

    /// Lateral force available while sustaining `required_fx`.
    pub fn calculate_lateral_force(
        &self,
        attitude: &TyreAttitude,
        required_fx: f64,
    ) -> Result<f64, InvalidAttitude> {
        let fx_max = self.fx_max(attitude);
        let fy_max = self.fy_max(attitude);
        Ok(fy_max * Self::scale_factor(required_fx, fx_max)?)
    }

    /// Longitudinal force available while sustaining `required_fy`.
    pub fn calculate_longitudinal_force(
        &self,
        attitude: &TyreAttitude,
        required_fy: f64,
    ) -> Result<f64, InvalidAttitude> {
        let fx_max = self.fx_max(attitude);
        let fy_max = self.fy_max(attitude);
        Ok(fx_max * Self::scale_factor(required_fy, fy_max)?)
    }
}

/// A racing tyre: physical dimensions plus the force model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tyre {
    pub name: String,
    /// Unloaded radius of the tyre (m).
    pub unloaded_radius: f64,
    pub tyre_model: TyreModel,
}

/// The tyres of a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tyres {
    pub front: Tyre,
    pub rear: Tyre,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_model() -> LinearTyreModel {
        LinearTyreModel {
            mu_x_peak: 2.0,
            mu_x_load_sensitivity: 0.0005,
            mu_y_peak: 2.2,
            mu_y_load_sensitivity: 0.0005,
            slip_stiffness: 40_000.0,
            cornering_stiffness: 30_000.0,
        }
    }

    #[test]
    fn test_pure_lateral_force() {
        let model = test_model();
        let attitude = TyreAttitude::new(1000.0);
        // mu_y = 2.2 - 0.5 = 1.7
        let fy = model.calculate_lateral_force(&attitude, 0.0).unwrap();
        assert!((fy - 1700.0).abs() < 1e-9);
    }

    #[test]
    fn test_combined_slip_reduces_lateral() {
        let model = test_model();
        let attitude = TyreAttitude::new(1000.0);
        let pure = model.calculate_lateral_force(&attitude, 0.0).unwrap();
        let combined = model.calculate_lateral_force(&attitude, 800.0).unwrap();
        assert!(combined < pure);
        assert!(combined > 0.0);
    }

    #[test]
    fn test_overloaded_attitude_is_invalid() {
        let model = test_model();
        let attitude = TyreAttitude::new(1000.0);
        // fx_max = 1.5 * 1000 = 1500
        let result = model.calculate_lateral_force(&attitude, 2000.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_load_is_invalid() {
        let model = test_model();
        let attitude = TyreAttitude::new(0.0);
        assert!(model.calculate_lateral_force(&attitude, 0.0).is_err());
    }

    #[test]
    fn test_grip_factor_scales_capacity() {
        let model = test_model();
        let dry = TyreAttitude::new(1000.0);
        let slippery = TyreAttitude::with_grip_factor(1000.0, 0.5);
        let fy_dry = model.calculate_lateral_force(&dry, 0.0).unwrap();
        let fy_slippery = model.calculate_lateral_force(&slippery, 0.0).unwrap();
        assert!((fy_slippery - fy_dry * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_negative_required_force_uses_magnitude() {
        let model = test_model();
        let attitude = TyreAttitude::new(1000.0);
        let positive = model.calculate_lateral_force(&attitude, 500.0).unwrap();
        let negative = model.calculate_lateral_force(&attitude, -500.0).unwrap();
        assert!((positive - negative).abs() < 1e-12);
    }

    #[test]
    fn test_tyre_model_json_discriminator() {
        let json = r#"{
            "model_type": "linear",
            "mu_x_peak": 2.0,
            "mu_x_load_sensitivity": 0.0005,
            "mu_y_peak": 2.2,
            "mu_y_load_sensitivity": 0.0005,
            "slip_stiffness": 40000.0,
            "cornering_stiffness": 30000.0
        }"#;
        let model: TyreModel = serde_json::from_str(json).unwrap();
        let TyreModel::Linear(linear) = model;
        assert_eq!(linear.mu_x_peak, 2.0);
    }

    #[test]
    fn test_slip_accessors() {
        let model = TyreModel::Linear(test_model());
        assert!((model.get_slip_ratio(4000.0) - 0.1).abs() < 1e-12);
        assert!((model.get_slip_angle(3000.0) - 0.1).abs() < 1e-12);
    }
}
