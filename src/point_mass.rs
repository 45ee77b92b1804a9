use crate::aero::AeroAttitude;
use crate::environment::Environment;
use crate::error::SimResult;
use crate::mesh::TrackNode;
use crate::tyre::TyreAttitude;
use crate::vehicle::Vehicle;
use crate::vehicle_model::{
    CornerValues, FullVehicleState, ModelError, StateVariables, VehicleModel,
};

/// Iteration cap for the lateral velocity fixed point. Exhausting it is
/// not an error; the last iterate is returned.
const MAX_LATERAL_ITERATIONS: usize = 10_000;

/// Step margin (m/s) subtracted on each fixed-point iteration.
const LATERAL_CONVERGENCE_MARGIN: f64 = 0.001;

/// Point-mass vehicle model.
///
/// All four corners carry an equal share of the normal load; drive force
/// goes through the two rear corners.
pub struct PointMassModel {
    vehicle: Vehicle,
    environment: Environment,
    maximum_velocity: f64,
}

/// Force balance at a node and velocity, in the track frame: x along the
/// track, y lateral in the road plane, z normal to the road.
struct ForceBalance {
    weight_x: f64,
    weight_y: f64,
    centripetal_force: f64,
    centripetal_y: f64,
    downforce: f64,
    drag: f64,
    resistive_fx: f64,
    required_fy: f64,
    normal_force: f64,
    corner_load: f64,
}

impl PointMassModel {
    pub fn new(vehicle: Vehicle, environment: Environment) -> SimResult<Self> {
        let maximum_velocity = vehicle.maximum_velocity()?;
        Ok(Self {
            vehicle,
            environment,
            maximum_velocity,
        })
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    fn weight(&self) -> f64 {
        self.vehicle.total_mass() * self.environment.gravity
    }

    fn aero_attitude(&self, velocity: f64) -> AeroAttitude {
        AeroAttitude {
            velocity,
            air_density: self.environment.air_density,
        }
    }

    fn tyre_attitude(&self, node: &TrackNode, normal_load: f64) -> TyreAttitude {
        TyreAttitude::with_grip_factor(normal_load, node.grip_factor)
    }

    fn force_balance(&self, node: &TrackNode, velocity: f64) -> ForceBalance {
        let weight = self.weight();
        let weight_x = weight * node.inclination.sin();
        let weight_y = -weight * node.banking.sin();
        let weight_z = weight * node.banking.cos() * node.inclination.cos();

        let centripetal_force =
            self.vehicle.total_mass() * velocity.powi(2) * node.curvature;
        let centripetal_y = centripetal_force * node.banking.cos();
        let centripetal_z = centripetal_force * node.banking.sin();

        let aero_attitude = self.aero_attitude(velocity);
        let downforce = self.vehicle.aero.get_downforce(&aero_attitude);
        let drag = self.vehicle.aero.get_drag(&aero_attitude);

        let normal_force = weight_z + centripetal_z + downforce;

        ForceBalance {
            weight_x,
            weight_y,
            centripetal_force,
            centripetal_y,
            downforce,
            drag,
            resistive_fx: drag + weight_x,
            required_fy: centripetal_y + weight_y,
            normal_force,
            corner_load: normal_force / 4.0,
        }
    }

    /// Total lateral force the four corners can produce at zero
    /// longitudinal demand. A corner outside its envelope contributes
    /// nothing.
    fn available_lateral_force(&self, node: &TrackNode, corner_load: f64) -> f64 {
        let attitude = self.tyre_attitude(node, corner_load);
        let front = self
            .vehicle
            .tyres
            .front
            .tyre_model
            .calculate_lateral_force(&attitude, 0.0)
            .unwrap_or(0.0);
        let rear = self
            .vehicle
            .tyres
            .rear
            .tyre_model
            .calculate_lateral_force(&attitude, 0.0)
            .unwrap_or(0.0);
        2.0 * front + 2.0 * rear
    }

    fn motor_drive_force(&self, state: &StateVariables, velocity: f64) -> SimResult<f64> {
        let motor_speed = self.vehicle.velocity_to_motor_speed(velocity);
        let motor_torque = self
            .vehicle
            .powertrain
            .get_motor_torque(state.state_of_charge, motor_speed)?;
        Ok(self.vehicle.motor_torque_to_drive_force(motor_torque))
    }
}

impl VehicleModel for PointMassModel {
    fn resolve(
        &self,
        state: &StateVariables,
        node: &TrackNode,
        velocity: f64,
    ) -> SimResult<FullVehicleState> {
        let forces = self.force_balance(node, velocity);
        let attitude = self.tyre_attitude(node, forces.corner_load);

        let front_model = &self.vehicle.tyres.front.tyre_model;
        let rear_model = &self.vehicle.tyres.rear.tyre_model;

        // Drive demand is carried by the rear corners alone; the lateral
        // demand is shared equally by all four.
        let rear_fx_share = forces.resistive_fx / 2.0;
        let corner_fy_share = forces.required_fy / 4.0;

        let lateral_front = front_model
            .calculate_lateral_force(&attitude, 0.0)
            .unwrap_or(0.0);
        let lateral_rear = rear_model
            .calculate_lateral_force(&attitude, rear_fx_share)
            .unwrap_or(0.0);
        let longitudinal_front = front_model
            .calculate_longitudinal_force(&attitude, corner_fy_share)
            .unwrap_or(0.0);
        let longitudinal_rear = rear_model
            .calculate_longitudinal_force(&attitude, corner_fy_share)
            .unwrap_or(0.0);

        let motor_speed = self.vehicle.velocity_to_motor_speed(velocity);
        let motor_torque = self
            .vehicle
            .powertrain
            .get_motor_torque(state.state_of_charge, motor_speed)?;
        let motor_power = self
            .vehicle
            .powertrain
            .get_motor_power(state.state_of_charge, motor_speed)?;
        let accumulator_power = self
            .vehicle
            .powertrain
            .get_accumulator_power(state.state_of_charge, motor_speed)?;

        Ok(FullVehicleState {
            weight: self.weight(),
            centripetal_force: forces.centripetal_force,
            downforce: forces.downforce,
            drag: forces.drag,
            resistive_fx: forces.resistive_fx,
            required_fy: forces.required_fy,
            normal_force: forces.normal_force,
            normal_loads: CornerValues::uniform(forces.corner_load),
            tyre_attitudes: CornerValues::uniform(attitude),
            lateral_traction: CornerValues {
                front_left: lateral_front,
                front_right: lateral_front,
                rear_left: lateral_rear,
                rear_right: lateral_rear,
            },
            longitudinal_traction: CornerValues {
                front_left: longitudinal_front,
                front_right: longitudinal_front,
                rear_left: longitudinal_rear,
                rear_right: longitudinal_rear,
            },
            motor_speed,
            motor_torque,
            motor_power,
            accumulator_power,
            drive_force: self.vehicle.motor_torque_to_drive_force(motor_torque),
        })
    }

    fn lateral_velocity_limit(&self, _state: &StateVariables, node: &TrackNode) -> f64 {
        if node.curvature == 0.0 {
            return self.maximum_velocity;
        }

        let mass = self.vehicle.total_mass();
        let mut velocity = self.maximum_velocity;

        for _ in 0..MAX_LATERAL_ITERATIONS {
            let forces = self.force_balance(node, velocity);
            let available_fy = self.available_lateral_force(node, forces.corner_load);

            if available_fy >= forces.required_fy.abs() {
                break;
            }

            let lateral_acceleration = (available_fy + forces.weight_y) / mass;
            if lateral_acceleration <= 0.0 {
                velocity = 0.0;
                break;
            }
            velocity = (lateral_acceleration / node.curvature.abs()).sqrt()
                - LATERAL_CONVERGENCE_MARGIN;
        }

        velocity.max(0.0)
    }

    fn acceleration_at(
        &self,
        state: &StateVariables,
        node: &TrackNode,
        velocity: f64,
    ) -> Result<f64, ModelError> {
        let forces = self.force_balance(node, velocity);
        let attitude = self.tyre_attitude(node, forces.corner_load);
        let corner_fy_share = forces.required_fy / 4.0;

        let rear_traction = 2.0
            * self
                .vehicle
                .tyres
                .rear
                .tyre_model
                .calculate_longitudinal_force(&attitude, corner_fy_share)?;

        let motor_force = self.motor_drive_force(state, velocity)?;
        let drive_fx = motor_force.min(rear_traction);

        Ok((drive_fx - forces.resistive_fx) / self.vehicle.equivalent_mass())
    }

    fn deceleration_at(
        &self,
        _state: &StateVariables,
        node: &TrackNode,
        velocity: f64,
    ) -> Result<f64, ModelError> {
        let forces = self.force_balance(node, velocity);
        let attitude = self.tyre_attitude(node, forces.corner_load);
        let corner_fy_share = forces.required_fy / 4.0;

        let front = self
            .vehicle
            .tyres
            .front
            .tyre_model
            .calculate_longitudinal_force(&attitude, corner_fy_share)?;
        let rear = self
            .vehicle
            .tyres
            .rear
            .tyre_model
            .calculate_longitudinal_force(&attitude, corner_fy_share)?;
        let braking_fx = 2.0 * front + 2.0 * rear;

        // Resistance aids deceleration.
        Ok((braking_fx + forces.resistive_fx) / self.vehicle.equivalent_mass())
    }

    fn maximum_velocity(&self) -> f64 {
        self.maximum_velocity
    }

    fn update_state_of_charge(&self, state_of_charge: f64, energy: f64) -> f64 {
        self.vehicle
            .powertrain
            .update_state_of_charge(state_of_charge, energy)
    }
}
