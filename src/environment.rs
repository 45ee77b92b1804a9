use serde::{Deserialize, Serialize};

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.81;

/// Air density at sea level (kg/m³)
pub const AIR_DENSITY: f64 = 1.225;

/// Environmental variables for a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    #[serde(default = "default_air_density")]
    pub air_density: f64,
}

fn default_gravity() -> f64 {
    GRAVITY
}

fn default_air_density() -> f64 {
    AIR_DENSITY
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            air_density: AIR_DENSITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults() {
        let env = Environment::default();
        assert_eq!(env.gravity, 9.81);
        assert_eq!(env.air_density, 1.225);
    }

    #[test]
    fn test_environment_partial_override() {
        let env: Environment = serde_json::from_str(r#"{"air_density": 1.1}"#).unwrap();
        assert_eq!(env.gravity, 9.81);
        assert_eq!(env.air_density, 1.1);
    }
}
