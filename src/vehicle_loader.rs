use crate::aero::AeroPackage;
use crate::error::{SimError, SimResult};
use crate::library::{self, ComponentLibraries, ComponentRef};
use crate::powertrain::{Accumulator, Cell, Motor, MotorController, Powertrain};
use crate::tyre::{Tyre, Tyres};
use crate::vehicle::{
    BrakeCaliper, BrakeDisc, BrakeLine, BrakePad, Brakes, Driver, Inertia, MasterCylinder,
    Steering, Suspension, Transmission, Vehicle, VehicleMetadata,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;

// Document-level structs: shaped like the resolved vehicle, but any
// component position may hold a library name instead of an object.

#[derive(Debug, Deserialize)]
struct VehicleFile {
    metadata: VehicleMetadata,
    driver: ComponentRef<Driver>,
    aero: AeroPackage,
    brakes: BrakesFile,
    inertia: Inertia,
    powertrain: PowertrainFile,
    steering: Steering,
    suspension: Suspension,
    transmission: Transmission,
    tyres: TyresFile,
}

#[derive(Debug, Deserialize)]
struct BrakesFile {
    front: BrakeLineFile,
    rear: BrakeLineFile,
    pedal_ratio: f64,
    front_brake_bias: f64,
    regen_torque: f64,
}

#[derive(Debug, Deserialize)]
struct BrakeLineFile {
    cylinder: ComponentRef<MasterCylinder>,
    caliper: ComponentRef<BrakeCaliper>,
    disc: ComponentRef<BrakeDisc>,
    pad: ComponentRef<BrakePad>,
}

#[derive(Debug, Deserialize)]
struct PowertrainFile {
    accumulator: AccumulatorFile,
    motor: ComponentRef<Motor>,
    motor_controller: ComponentRef<MotorController>,
}

#[derive(Debug, Deserialize)]
struct AccumulatorFile {
    cell: ComponentRef<Cell>,
    cells_in_parallel: u32,
    cells_in_series: u32,
}

#[derive(Debug, Deserialize)]
struct TyresFile {
    front: ComponentRef<Tyre>,
    rear: ComponentRef<Tyre>,
}

pub struct VehicleLoader;

impl VehicleLoader {
    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
        libraries: &ComponentLibraries,
    ) -> SimResult<Vehicle> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::load_from_string(&content, libraries).map_err(|e| match e {
            SimError::InvalidVehicleConfig(msg) => {
                SimError::InvalidVehicleConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn load_from_string(content: &str, libraries: &ComponentLibraries) -> SimResult<Vehicle> {
        let vehicle_file: VehicleFile = serde_json::from_str(content)
            .map_err(|e| SimError::InvalidVehicleConfig(format!("JSON parse error: {}", e)))?;
        Self::resolve(vehicle_file, libraries)
    }

    fn resolve(file: VehicleFile, libraries: &ComponentLibraries) -> SimResult<Vehicle> {
        let vehicle = Vehicle {
            metadata: file.metadata,
            driver: libraries.resolve(library::DRIVERS_LIBRARY, file.driver)?,
            aero: file.aero,
            brakes: Brakes {
                front: Self::resolve_brake_line(file.brakes.front, libraries)?,
                rear: Self::resolve_brake_line(file.brakes.rear, libraries)?,
                pedal_ratio: file.brakes.pedal_ratio,
                front_brake_bias: file.brakes.front_brake_bias,
                regen_torque: file.brakes.regen_torque,
            },
            inertia: file.inertia,
            powertrain: Powertrain {
                accumulator: Accumulator {
                    cell: libraries.resolve(library::CELLS_LIBRARY, file.powertrain.accumulator.cell)?,
                    cells_in_parallel: file.powertrain.accumulator.cells_in_parallel,
                    cells_in_series: file.powertrain.accumulator.cells_in_series,
                },
                motor: libraries.resolve(library::MOTORS_LIBRARY, file.powertrain.motor)?,
                motor_controller: libraries
                    .resolve(library::MOTOR_CONTROLLERS_LIBRARY, file.powertrain.motor_controller)?,
            },
            steering: file.steering,
            suspension: file.suspension,
            transmission: file.transmission,
            tyres: Tyres {
                front: libraries.resolve(library::TYRES_LIBRARY, file.tyres.front)?,
                rear: libraries.resolve(library::TYRES_LIBRARY, file.tyres.rear)?,
            },
        };

        Self::validate(&vehicle)?;
        Ok(vehicle)
    }

    fn resolve_brake_line(
        file: BrakeLineFile,
        libraries: &ComponentLibraries,
    ) -> SimResult<BrakeLine> {
        Ok(BrakeLine {
            cylinder: libraries.resolve(library::MASTER_CYLINDERS_LIBRARY, file.cylinder)?,
            caliper: libraries.resolve(library::BRAKE_CALIPERS_LIBRARY, file.caliper)?,
            disc: libraries.resolve(library::BRAKE_DISCS_LIBRARY, file.disc)?,
            pad: libraries.resolve(library::BRAKE_PADS_LIBRARY, file.pad)?,
        })
    }

    fn validate(vehicle: &Vehicle) -> SimResult<()> {
        if vehicle.inertia.curb_mass <= 0.0 {
            return Err(SimError::invalid_vehicle("curb mass must be positive"));
        }
        if !(0.0..=1.0).contains(&vehicle.inertia.front_mass_distribution) {
            return Err(SimError::invalid_vehicle(
                "front mass distribution must lie in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&vehicle.brakes.front_brake_bias) {
            return Err(SimError::invalid_vehicle("front brake bias must lie in [0, 1]"));
        }
        if vehicle.aero.frontal_area <= 0.0 {
            return Err(SimError::invalid_vehicle("frontal area must be positive"));
        }
        if vehicle.tyres.rear.unloaded_radius <= 0.0 {
            return Err(SimError::invalid_vehicle("rear tyre radius must be positive"));
        }
        if vehicle.transmission.final_drive_ratio <= 0.0 {
            return Err(SimError::invalid_vehicle("final drive ratio must be positive"));
        }
        Ok(())
    }
}

/// Load a vehicle by file name from the vehicle library directory.
pub fn load_vehicle<P: AsRef<Path>>(
    library_root: P,
    filename: &str,
    libraries: &ComponentLibraries,
) -> SimResult<Vehicle> {
    let path = library_root.as_ref().join(filename);
    if !path.is_file() {
        let available: Vec<String> = fs::read_dir(library_root.as_ref())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .collect()
            })
            .unwrap_or_default();
        return Err(SimError::InvalidVehicleConfig(format!(
            "unable to find '{}' in vehicle library. Available vehicles: {:?}",
            filename, available
        )));
    }
    VehicleLoader::load_from_file(path, libraries)
}
