use crate::aero::AeroModel;
use crate::error::{SimError, SimResult};
use crate::vehicle::Vehicle;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A named, gettable and settable design parameter of a vehicle.
#[derive(Debug, Clone, Copy)]
pub struct Parameter {
    pub name: &'static str,
    pub unit: &'static str,
    getter: fn(&Vehicle) -> f64,
    setter: fn(&mut Vehicle, f64),
}

impl Parameter {
    pub fn get_value(&self, vehicle: &Vehicle) -> f64 {
        (self.getter)(vehicle)
    }

    pub fn set_value(&self, vehicle: &mut Vehicle, value: f64) {
        (self.setter)(vehicle, value)
    }

    /// Clone the baseline and apply a new parameter value to the clone.
    pub fn get_new_vehicle(&self, baseline_vehicle: &Vehicle, value: f64) -> Vehicle {
        let mut vehicle = baseline_vehicle.clone();
        self.set_value(&mut vehicle, value);
        vehicle
    }

    pub fn name_with_unit(&self) -> String {
        format!("{} ({})", self.name, self.unit)
    }
}

static PARAMETER_REGISTRY: OnceLock<BTreeMap<&'static str, Parameter>> = OnceLock::new();

fn registry() -> &'static BTreeMap<&'static str, Parameter> {
    PARAMETER_REGISTRY.get_or_init(|| {
        let mut parameters: BTreeMap<&'static str, Parameter> = BTreeMap::new();
        let mut register = |parameter: Parameter| {
            parameters.insert(parameter.name, parameter);
        };

        register(Parameter {
            name: "Curb Mass",
            unit: "kg",
            getter: |v| v.inertia.curb_mass,
            setter: |v, value| v.inertia.curb_mass = value,
        });
        register(Parameter {
            name: "Lift Coefficient",
            unit: "-",
            getter: |v| {
                let AeroModel::Constant(ref model) = v.aero.aero_model;
                model.lift_coefficient
            },
            setter: |v, value| {
                let AeroModel::Constant(ref mut model) = v.aero.aero_model;
                model.lift_coefficient = value;
            },
        });
        register(Parameter {
            name: "Drag Coefficient",
            unit: "-",
            getter: |v| {
                let AeroModel::Constant(ref model) = v.aero.aero_model;
                model.drag_coefficient
            },
            setter: |v, value| {
                let AeroModel::Constant(ref mut model) = v.aero.aero_model;
                model.drag_coefficient = value;
            },
        });
        register(Parameter {
            name: "Final Drive Ratio",
            unit: "-",
            getter: |v| v.transmission.final_drive_ratio,
            setter: |v, value| v.transmission.final_drive_ratio = value,
        });

        parameters
    })
}

/// Look up a parameter by name.
pub fn get_parameter(name: &str) -> SimResult<&'static Parameter> {
    registry().get(name).ok_or_else(|| SimError::UnknownParameter {
        name: name.to_string(),
        available: list_parameters(),
    })
}

pub fn list_parameters() -> Vec<String> {
    registry().keys().map(|k| k.to_string()).collect()
}

/// Clone `baseline_vehicle` with `parameter` set to `value`.
pub fn get_new_vehicle(baseline_vehicle: &Vehicle, parameter: &Parameter, value: f64) -> Vehicle {
    parameter.get_new_vehicle(baseline_vehicle, value)
}
