use crate::aero::AeroPackage;
use crate::error::SimResult;
use crate::powertrain::Powertrain;
use crate::tyre::Tyres;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A property with distinct values on the front and rear axles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontRear<T> {
    pub front: T,
    pub rear: T,
}

fn area_of_circle(diameter: f64) -> f64 {
    diameter.powi(2) * PI / 4.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleMetadata {
    pub name: String,
    pub year: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub name: String,
    /// Mass of the driver (kg).
    pub mass: f64,
    /// Height of the driver (m).
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsprungMass {
    pub mass: f64,
    pub centre_of_gravity_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inertia {
    /// Mass of the vehicle without the driver (kg).
    pub curb_mass: f64,
    /// Proportion of mass on the front axle, in [0, 1].
    pub front_mass_distribution: f64,
    pub centre_of_gravity_height: f64,
    pub yaw_inertia: f64,
    pub front_unsprung_mass: UnsprungMass,
    pub rear_unsprung_mass: UnsprungMass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Steering {
    /// Steering-wheel angle per road-wheel angle.
    pub steering_ratio: f64,
    pub steering_wheel_radius: f64,
}

impl Steering {
    pub fn get_steering_wheel_angle(&self, wheel_angle: f64) -> f64 {
        wheel_angle * self.steering_ratio
    }

    pub fn get_wheel_angle(&self, steering_wheel_angle: f64) -> f64 {
        steering_wheel_angle / self.steering_ratio
    }
}

/// Axle suspension variants, selected by the `suspension_type`
/// discriminator in the vehicle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "suspension_type")]
pub enum SuspensionAxle {
    #[serde(rename = "decoupled")]
    Decoupled {
        track_width: f64,
        roll_centre_height: f64,
        heave_motion_ratio: f64,
        heave_spring_rate: f64,
        roll_motion_ratio: f64,
        roll_spring_rate: f64,
    },
    #[serde(rename = "direct_actuation")]
    DirectActuation { track_width: f64 },
}

impl SuspensionAxle {
    pub fn track_width(&self) -> f64 {
        match self {
            SuspensionAxle::Decoupled { track_width, .. } => *track_width,
            SuspensionAxle::DirectActuation { track_width } => *track_width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    pub front: SuspensionAxle,
    pub rear: SuspensionAxle,
    pub wheelbase: f64,
    pub centre_of_gravity_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmission {
    /// Motor revolutions per drive-axle revolution.
    pub final_drive_ratio: f64,
}

// --- Brakes ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterCylinder {
    pub name: String,
    pub piston_diameter: f64,
    #[serde(default)]
    pub colour: Option<String>,
}

impl MasterCylinder {
    pub fn piston_area(&self) -> f64 {
        area_of_circle(self.piston_diameter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrakeCaliper {
    pub name: String,
    pub piston_count: u32,
    pub piston_diameter: f64,
}

impl BrakeCaliper {
    pub fn piston_area(&self) -> f64 {
        self.piston_count as f64 * area_of_circle(self.piston_diameter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrakeDisc {
    pub name: String,
    pub outer_diameter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrakePad {
    pub name: String,
    pub height: f64,
    pub coefficient_of_friction: f64,
}

/// An individual brake line from pedal to wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrakeLine {
    pub cylinder: MasterCylinder,
    pub caliper: BrakeCaliper,
    pub disc: BrakeDisc,
    pub pad: BrakePad,
}

impl BrakeLine {
    fn area_scaling_factor(&self) -> f64 {
        self.caliper.piston_area() / self.cylinder.piston_area()
    }

    /// Radius at which the braking force acts on the wheel.
    fn effective_radius(&self) -> f64 {
        0.5 * (self.disc.outer_diameter - self.pad.height)
    }

    fn force_to_torque_scaling_factor(&self) -> f64 {
        self.area_scaling_factor() * self.pad.coefficient_of_friction * self.effective_radius()
    }

    pub fn get_brake_pressure(&self, cylinder_force: f64) -> f64 {
        cylinder_force / self.cylinder.piston_area()
    }

    pub fn force_to_torque(&self, cylinder_force: f64) -> f64 {
        cylinder_force * self.force_to_torque_scaling_factor()
    }

    pub fn torque_to_force(&self, braking_torque: f64) -> f64 {
        braking_torque / self.force_to_torque_scaling_factor()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brakes {
    pub front: BrakeLine,
    pub rear: BrakeLine,
    /// Master-cylinder force per pedal force.
    pub pedal_ratio: f64,
    /// Proportion of pedal force on the front master cylinder, in [0, 1].
    pub front_brake_bias: f64,
    /// Maximum regenerative braking torque (Nm).
    pub regen_torque: f64,
}

impl Brakes {
    pub fn brake_bias(&self) -> FrontRear<f64> {
        FrontRear {
            front: self.front_brake_bias,
            rear: 1.0 - self.front_brake_bias,
        }
    }

    fn get_cylinder_forces(&self, pedal_force: f64) -> FrontRear<f64> {
        let total_force = pedal_force * self.pedal_ratio;
        let bias = self.brake_bias();
        FrontRear {
            front: total_force * bias.front,
            rear: total_force * bias.rear,
        }
    }

    pub fn pedal_force_to_wheel_torque(&self, pedal_force: f64) -> FrontRear<f64> {
        let forces = self.get_cylinder_forces(pedal_force);
        FrontRear {
            front: self.front.force_to_torque(forces.front),
            rear: self.rear.force_to_torque(forces.rear),
        }
    }

    /// Proportion of total braking torque on each axle for a unit pedal
    /// force.
    pub fn get_overall_brake_balance(&self) -> FrontRear<f64> {
        let torques = self.pedal_force_to_wheel_torque(1.0);
        let total = torques.front + torques.rear;
        FrontRear {
            front: torques.front / total,
            rear: torques.rear / total,
        }
    }
}

// --- Vehicle ---

/// The full vehicle, fully resolved against the component libraries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub metadata: VehicleMetadata,
    pub driver: Driver,
    pub aero: AeroPackage,
    pub brakes: Brakes,
    pub inertia: Inertia,
    pub powertrain: Powertrain,
    pub steering: Steering,
    pub suspension: Suspension,
    pub transmission: Transmission,
    pub tyres: Tyres,
}

impl Vehicle {
    pub fn total_mass(&self) -> f64 {
        self.inertia.curb_mass + self.driver.mass
    }

    /// Mass used for longitudinal dynamics. The point-mass model ignores
    /// rotating inertia, so this equals the total mass.
    pub fn equivalent_mass(&self) -> f64 {
        self.total_mass()
    }

    fn overall_motor_scaling(&self) -> f64 {
        self.transmission.final_drive_ratio / self.tyres.rear.unloaded_radius
    }

    pub fn motor_torque_to_drive_force(&self, motor_torque: f64) -> f64 {
        motor_torque * self.overall_motor_scaling()
    }

    pub fn traction_force_to_motor_torque(&self, traction_force: f64) -> f64 {
        traction_force / self.overall_motor_scaling()
    }

    pub fn motor_speed_to_velocity(&self, motor_speed: f64) -> f64 {
        motor_speed / self.overall_motor_scaling()
    }

    pub fn velocity_to_motor_speed(&self, velocity: f64) -> f64 {
        velocity * self.overall_motor_scaling()
    }

    /// Largest velocity the powertrain can reach at full charge.
    pub fn maximum_velocity(&self) -> SimResult<f64> {
        Ok(self.motor_speed_to_velocity(self.powertrain.get_maximum_motor_speed(1.0)?))
    }
}
