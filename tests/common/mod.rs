#![allow(dead_code)]

use lapsim::aero::{AeroModel, AeroPackage, ConstantAero};
use lapsim::powertrain::{Accumulator, Cell, Motor, MotorController, Powertrain, TorqueMap};
use lapsim::track_data::{
    Configuration, GripFactorBand, SectorBand, ShapeSegment, TrackData, TrackMetadata,
    TrackSample,
};
use lapsim::tyre::{LinearTyreModel, Tyre, TyreModel, Tyres};
use lapsim::vehicle::{
    BrakeCaliper, BrakeDisc, BrakeLine, BrakePad, Brakes, Driver, Inertia, MasterCylinder,
    Steering, Suspension, SuspensionAxle, Transmission, UnsprungMass, Vehicle, VehicleMetadata,
};
use std::f64::consts::PI;

pub fn test_tyre(name: &str) -> Tyre {
    Tyre {
        name: name.to_string(),
        unloaded_radius: 0.25,
        tyre_model: TyreModel::Linear(LinearTyreModel {
            mu_x_peak: 1.5,
            mu_x_load_sensitivity: 0.0,
            mu_y_peak: 1.5,
            mu_y_load_sensitivity: 0.0,
            slip_stiffness: 40_000.0,
            cornering_stiffness: 30_000.0,
        }),
    }
}

fn brake_line() -> BrakeLine {
    BrakeLine {
        cylinder: MasterCylinder {
            name: "MC20".to_string(),
            piston_diameter: 0.02,
            colour: None,
        },
        caliper: BrakeCaliper {
            name: "C2P30".to_string(),
            piston_count: 2,
            piston_diameter: 0.03,
        },
        disc: BrakeDisc {
            name: "D220".to_string(),
            outer_diameter: 0.22,
        },
        pad: BrakePad {
            name: "P45".to_string(),
            height: 0.03,
            coefficient_of_friction: 0.45,
        },
    }
}

/// A 250 kg car (driver included) with constant-mu tyres, a flat 80 Nm
/// torque map through a 4.0 final drive, and a 35 m/s top speed.
pub fn test_vehicle() -> Vehicle {
    Vehicle {
        metadata: VehicleMetadata {
            name: "Integration Car".to_string(),
            year: 2024,
            description: String::new(),
        },
        driver: Driver {
            name: "Test Driver".to_string(),
            mass: 70.0,
            height: 1.75,
        },
        aero: AeroPackage {
            frontal_area: 1.0,
            aero_model: AeroModel::Constant(ConstantAero {
                lift_coefficient: 3.0,
                drag_coefficient: 1.2,
            }),
        },
        brakes: Brakes {
            front: brake_line(),
            rear: brake_line(),
            pedal_ratio: 4.0,
            front_brake_bias: 0.6,
            regen_torque: 100.0,
        },
        inertia: Inertia {
            curb_mass: 180.0,
            front_mass_distribution: 0.48,
            centre_of_gravity_height: 0.28,
            yaw_inertia: 80.0,
            front_unsprung_mass: UnsprungMass {
                mass: 9.0,
                centre_of_gravity_height: 0.22,
            },
            rear_unsprung_mass: UnsprungMass {
                mass: 10.0,
                centre_of_gravity_height: 0.23,
            },
        },
        powertrain: Powertrain {
            accumulator: Accumulator {
                cell: Cell {
                    name: "Test Cell".to_string(),
                    capacity: 40_000.0,
                    nominal_voltage: 3.6,
                    charge_voltage: 4.2,
                    discharge_voltage: 2.5,
                    discharge_current: 30.0,
                    resistance: 0.017,
                    datasheet_url: None,
                },
                cells_in_parallel: 5,
                cells_in_series: 100,
            },
            motor: Motor {
                name: "Test Motor".to_string(),
                torque_map: TorqueMap {
                    rpm: vec![0.0, 24_000.0 / PI],
                    torque: vec![80.0, 80.0],
                },
                maximum_rpm: 24_000.0 / PI,
                rated_voltage: 600.0,
                datasheet_url: None,
            },
            motor_controller: MotorController {
                name: "Test Controller".to_string(),
                resistance: 0.2,
                efficiency: 0.95,
            },
        },
        steering: Steering {
            steering_ratio: 5.0,
            steering_wheel_radius: 0.12,
        },
        suspension: Suspension {
            front: SuspensionAxle::DirectActuation { track_width: 1.2 },
            rear: SuspensionAxle::DirectActuation { track_width: 1.18 },
            wheelbase: 1.55,
            centre_of_gravity_height: 0.28,
        },
        transmission: Transmission {
            final_drive_ratio: 4.0,
        },
        tyres: Tyres {
            front: test_tyre("Front Slick"),
            rear: test_tyre("Rear Slick"),
        },
    }
}

fn default_samples() -> (Vec<TrackSample>, Vec<TrackSample>, Vec<GripFactorBand>, Vec<SectorBand>) {
    (
        vec![TrackSample { position: 0.0, value: 0.0 }],
        vec![TrackSample { position: 0.0, value: 0.0 }],
        vec![GripFactorBand { start_point: 0.0, grip_factor: 1.0 }],
        vec![SectorBand { start_point: 0.0, sector: 1 }],
    )
}

pub fn track_from_segments(segments: Vec<ShapeSegment>, configuration: Configuration) -> TrackData {
    let (elevation, banking, grip_factor, sector) = default_samples();
    TrackData {
        metadata: TrackMetadata::default(),
        shape: segments,
        elevation,
        banking,
        grip_factor,
        sector,
        configuration,
    }
}

pub fn straight_track(length: f64) -> TrackData {
    track_from_segments(
        vec![ShapeSegment { length, curvature: 0.0 }],
        Configuration::Open,
    )
}

pub fn circle_track(length: f64, curvature: f64) -> TrackData {
    track_from_segments(
        vec![ShapeSegment { length, curvature }],
        Configuration::Closed,
    )
}

/// A short straight-corner mix standing in for an autocross course.
pub fn autocross_track() -> TrackData {
    track_from_segments(
        vec![
            ShapeSegment { length: 60.0, curvature: 0.0 },
            ShapeSegment { length: 30.0, curvature: 0.05 },
            ShapeSegment { length: 40.0, curvature: 0.0 },
            ShapeSegment { length: 25.0, curvature: -0.08 },
            ShapeSegment { length: 45.0, curvature: 0.0 },
        ],
        Configuration::Closed,
    )
}
