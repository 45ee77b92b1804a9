use crate::environment::Environment;
use crate::error::{SimError, SimResult};
use crate::mesh::TrackNode;
use crate::point_mass::PointMassModel;
use crate::tyre::{InvalidAttitude, TyreAttitude};
use crate::vehicle::Vehicle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Slowly-varying vehicle state carried between solver iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVariables {
    pub velocity: f64,
    pub longitudinal_acceleration: f64,
    /// Fraction of remaining accumulator energy, in [0, 1].
    pub state_of_charge: f64,
}

impl Default for StateVariables {
    fn default() -> Self {
        Self {
            velocity: 0.0,
            longitudinal_acceleration: 0.0,
            state_of_charge: 1.0,
        }
    }
}

impl StateVariables {
    pub fn with_velocity(velocity: f64) -> Self {
        Self {
            velocity,
            ..Self::default()
        }
    }
}

/// A per-corner quantity (front left, front right, rear left, rear right).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerValues<T> {
    pub front_left: T,
    pub front_right: T,
    pub rear_left: T,
    pub rear_right: T,
}

impl<T: Copy> CornerValues<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            front_left: value,
            front_right: value,
            rear_left: value,
            rear_right: value,
        }
    }
}

impl CornerValues<f64> {
    pub fn total(&self) -> f64 {
        self.front_left + self.front_right + self.rear_left + self.rear_right
    }

    pub fn rear_total(&self) -> f64 {
        self.rear_left + self.rear_right
    }
}

/// The fully computed state of the vehicle at a node and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FullVehicleState {
    pub weight: f64,
    pub centripetal_force: f64,
    pub downforce: f64,
    pub drag: f64,
    /// Forces opposing motion along the track (drag + weight along x).
    pub resistive_fx: f64,
    /// Lateral force demanded in the road plane.
    pub required_fy: f64,
    pub normal_force: f64,
    pub normal_loads: CornerValues<f64>,
    pub tyre_attitudes: CornerValues<TyreAttitude>,
    pub lateral_traction: CornerValues<f64>,
    pub longitudinal_traction: CornerValues<f64>,
    pub motor_speed: f64,
    pub motor_torque: f64,
    pub motor_power: f64,
    pub accumulator_power: f64,
    /// Rear-axle drive force available from the motor.
    pub drive_force: f64,
}

impl FullVehicleState {
    pub fn total_lateral_traction(&self) -> f64 {
        self.lateral_traction.total()
    }
}

impl Default for FullVehicleState {
    fn default() -> Self {
        Self {
            weight: 0.0,
            centripetal_force: 0.0,
            downforce: 0.0,
            drag: 0.0,
            resistive_fx: 0.0,
            required_fy: 0.0,
            normal_force: 0.0,
            normal_loads: CornerValues::uniform(0.0),
            tyre_attitudes: CornerValues::uniform(TyreAttitude::new(0.0)),
            lateral_traction: CornerValues::uniform(0.0),
            longitudinal_traction: CornerValues::uniform(0.0),
            motor_speed: 0.0,
            motor_torque: 0.0,
            motor_power: 0.0,
            accumulator_power: 0.0,
            drive_force: 0.0,
        }
    }
}

/// Failure of a vehicle-model operation.
///
/// The two tiers carry different semantics: a tyre attitude violation is
/// recovered locally by the solver, while an invalid configuration or
/// state input is surfaced to the caller.
#[derive(Debug)]
pub enum ModelError {
    Attitude(InvalidAttitude),
    Config(SimError),
}

impl From<InvalidAttitude> for ModelError {
    fn from(error: InvalidAttitude) -> Self {
        ModelError::Attitude(error)
    }
}

impl From<SimError> for ModelError {
    fn from(error: SimError) -> Self {
        ModelError::Config(error)
    }
}

/// Capability set the solver consumes from a vehicle model.
///
/// All operations are pure: the same `(state, node, velocity)` triple
/// always produces the same result.
pub trait VehicleModel {
    /// Compute every scalar the solver needs at a resolved velocity.
    fn resolve(
        &self,
        state: &StateVariables,
        node: &TrackNode,
        velocity: f64,
    ) -> SimResult<FullVehicleState>;

    /// Largest velocity sustainable with lateral traction alone.
    fn lateral_velocity_limit(&self, state: &StateVariables, node: &TrackNode) -> f64;

    /// Net longitudinal acceleration while driving (m/s²).
    fn acceleration_at(
        &self,
        state: &StateVariables,
        node: &TrackNode,
        velocity: f64,
    ) -> Result<f64, ModelError>;

    /// Magnitude of the maximum sustainable deceleration while braking.
    fn deceleration_at(
        &self,
        state: &StateVariables,
        node: &TrackNode,
        velocity: f64,
    ) -> Result<f64, ModelError>;

    /// Motor-limited top speed of the vehicle at full charge.
    fn maximum_velocity(&self) -> f64;

    /// Advance the state of charge after drawing `energy` joules.
    fn update_state_of_charge(&self, state_of_charge: f64, energy: f64) -> f64;
}

type ModelFactory = fn(Vehicle, Environment) -> SimResult<Box<dyn VehicleModel + Send + Sync>>;

static MODEL_REGISTRY: OnceLock<BTreeMap<&'static str, ModelFactory>> = OnceLock::new();

fn registry() -> &'static BTreeMap<&'static str, ModelFactory> {
    MODEL_REGISTRY.get_or_init(|| {
        let mut models: BTreeMap<&'static str, ModelFactory> = BTreeMap::new();
        models.insert("point_mass", |vehicle, environment| {
            PointMassModel::new(vehicle, environment)
                .map(|model| Box::new(model) as Box<dyn VehicleModel + Send + Sync>)
        });
        models
    })
}

/// Instantiate a vehicle model by its registered tag.
pub fn create_model(
    name: &str,
    vehicle: Vehicle,
    environment: Environment,
) -> SimResult<Box<dyn VehicleModel + Send + Sync>> {
    match registry().get(name) {
        Some(factory) => factory(vehicle, environment),
        None => Err(SimError::UnknownVehicleModel {
            name: name.to_string(),
            available: list_models(),
        }),
    }
}

pub fn list_models() -> Vec<String> {
    registry().keys().map(|k| k.to_string()).collect()
}
