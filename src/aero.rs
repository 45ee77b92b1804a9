use serde::{Deserialize, Serialize};

/// Aerodynamic attitude of the vehicle at a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AeroAttitude {
    pub velocity: f64,
    pub air_density: f64,
}

/// Aero model variants, selected by the `model_type` discriminator in the
/// vehicle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type")]
pub enum AeroModel {
    #[serde(rename = "constant")]
    Constant(ConstantAero),
}

impl AeroModel {
    pub fn lift_coefficient(&self, _attitude: &AeroAttitude) -> f64 {
        match self {
            AeroModel::Constant(model) => model.lift_coefficient,
        }
    }

    pub fn drag_coefficient(&self, _attitude: &AeroAttitude) -> f64 {
        match self {
            AeroModel::Constant(model) => model.drag_coefficient,
        }
    }
}

/// Lift and drag coefficients independent of attitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantAero {
    pub lift_coefficient: f64,
    pub drag_coefficient: f64,
}

/// The aerodynamic package of the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeroPackage {
    /// Frontal area (m²).
    pub frontal_area: f64,
    pub aero_model: AeroModel,
}

impl AeroPackage {
    pub fn get_downforce(&self, attitude: &AeroAttitude) -> f64 {
        self.calculate_aero_force(self.aero_model.lift_coefficient(attitude), attitude)
    }

    pub fn get_drag(&self, attitude: &AeroAttitude) -> f64 {
        self.calculate_aero_force(self.aero_model.drag_coefficient(attitude), attitude)
    }

    fn calculate_aero_force(&self, coefficient: f64, attitude: &AeroAttitude) -> f64 {
        0.5 * coefficient * self.frontal_area * attitude.air_density * attitude.velocity.powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_package() -> AeroPackage {
        AeroPackage {
            frontal_area: 1.0,
            aero_model: AeroModel::Constant(ConstantAero {
                lift_coefficient: 3.0,
                drag_coefficient: 1.2,
            }),
        }
    }

    #[test]
    fn test_aero_forces_scale_with_velocity_squared() {
        let aero = test_package();
        let at_10 = AeroAttitude { velocity: 10.0, air_density: 1.225 };
        let at_20 = AeroAttitude { velocity: 20.0, air_density: 1.225 };

        let downforce_10 = aero.get_downforce(&at_10);
        let downforce_20 = aero.get_downforce(&at_20);
        assert!((downforce_20 / downforce_10 - 4.0).abs() < 1e-12);

        // 0.5 * 3.0 * 1.0 * 1.225 * 100 = 183.75
        assert!((downforce_10 - 183.75).abs() < 1e-9);
        assert!((aero.get_drag(&at_10) - 73.5).abs() < 1e-9);
    }

    #[test]
    fn test_aero_model_json_discriminator() {
        let json = r#"{
            "model_type": "constant",
            "lift_coefficient": 3.0,
            "drag_coefficient": 1.2
        }"#;
        let model: AeroModel = serde_json::from_str(json).unwrap();
        let attitude = AeroAttitude { velocity: 1.0, air_density: 1.0 };
        assert_eq!(model.lift_coefficient(&attitude), 3.0);
    }
}
