use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

fn check_state_of_charge(state_of_charge: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&state_of_charge) {
        Ok(())
    } else {
        Err(SimError::InvalidVehicleConfig(format!(
            "state of charge {} outside [0, 1]",
            state_of_charge
        )))
    }
}

/// An electrochemical cell.
///
/// `capacity` is the charge capacity in ampere-seconds; the cell's energy
/// content is `capacity * nominal_voltage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
    pub capacity: f64,
    pub nominal_voltage: f64,
    pub charge_voltage: f64,
    pub discharge_voltage: f64,
    pub discharge_current: f64,
    pub resistance: f64,
    #[serde(default)]
    pub datasheet_url: Option<String>,
}

impl Cell {
    /// Open-circuit voltage, linear in state of charge.
    ///
    /// A state of charge outside [0, 1] is a configuration error.
    pub fn get_voltage(&self, state_of_charge: f64) -> SimResult<f64> {
        check_state_of_charge(state_of_charge)?;
        Ok(self.discharge_voltage
            + (self.charge_voltage - self.discharge_voltage) * state_of_charge)
    }
}

/// An electric accumulator built from identical cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    pub cell: Cell,
    pub cells_in_parallel: u32,
    pub cells_in_series: u32,
}

impl Accumulator {
    pub fn number_of_cells(&self) -> u32 {
        self.cells_in_parallel * self.cells_in_series
    }

    /// Total charge capacity (A·s).
    pub fn capacity(&self) -> f64 {
        self.cell.capacity * self.number_of_cells() as f64
    }

    /// Total energy capacity (J).
    pub fn energy_capacity(&self) -> f64 {
        self.capacity() * self.cell.nominal_voltage
    }

    pub fn maximum_voltage(&self) -> f64 {
        self.cell.charge_voltage * self.cells_in_series as f64
    }

    pub fn minimum_voltage(&self) -> f64 {
        self.cell.discharge_voltage * self.cells_in_series as f64
    }

    pub fn maximum_discharge_current(&self) -> f64 {
        self.cell.discharge_current * self.cells_in_parallel as f64
    }

    pub fn resistance(&self) -> f64 {
        self.cell.resistance * self.cells_in_series as f64 / self.cells_in_parallel as f64
    }

    pub fn get_voltage(&self, state_of_charge: f64) -> SimResult<f64> {
        Ok(self.cell.get_voltage(state_of_charge)? * self.cells_in_series as f64)
    }

    /// Advance the state of charge after drawing `energy` joules.
    ///
    /// Monotonically decreasing in cumulative energy drawn: regenerated
    /// (negative) energy is ignored and the result is clamped to [0, 1].
    pub fn update_state_of_charge(&self, state_of_charge: f64, energy: f64) -> f64 {
        let drawn = energy.max(0.0);
        (state_of_charge - drawn / self.energy_capacity()).clamp(0.0, 1.0)
    }
}

/// A torque map for a motor: shaft torque against rotational speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorqueMap {
    pub rpm: Vec<f64>,
    pub torque: Vec<f64>,
}

impl TorqueMap {
    /// Linear interpolation, clamped to the end values.
    pub fn lookup_torque(&self, rpm: f64) -> f64 {
        if self.rpm.is_empty() {
            return 0.0;
        }
        if rpm <= self.rpm[0] {
            return self.torque[0];
        }
        if rpm >= self.rpm[self.rpm.len() - 1] {
            return self.torque[self.torque.len() - 1];
        }
        for i in 0..self.rpm.len() - 1 {
            if rpm >= self.rpm[i] && rpm <= self.rpm[i + 1] {
                let t = (rpm - self.rpm[i]) / (self.rpm[i + 1] - self.rpm[i]);
                return self.torque[i] + (self.torque[i + 1] - self.torque[i]) * t;
            }
        }
        self.torque[self.torque.len() - 1]
    }
}

/// An electric motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    pub name: String,
    pub torque_map: TorqueMap,
    pub maximum_rpm: f64,
    pub rated_voltage: f64,
    #[serde(default)]
    pub datasheet_url: Option<String>,
}

impl Motor {
    /// Mechanical speed limit (rad/s).
    pub fn maximum_speed(&self) -> f64 {
        self.maximum_rpm * PI / 30.0
    }

    /// Motor speed constant (rad/s per volt).
    pub fn speed_per_volt(&self) -> f64 {
        self.maximum_speed() / self.rated_voltage
    }

    /// Shaft torque at a rotational speed (rad/s).
    pub fn get_torque(&self, speed: f64) -> f64 {
        let rpm = speed * 30.0 / PI;
        if rpm > self.maximum_rpm {
            0.0
        } else {
            self.torque_map.lookup_torque(rpm)
        }
    }

    /// Shaft power at a rotational speed (W).
    pub fn get_power(&self, speed: f64) -> f64 {
        speed * self.get_torque(speed)
    }
}

/// A motor controller (inverter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorController {
    pub name: String,
    pub resistance: f64,
    pub efficiency: f64,
}

/// A single-motor, rear-wheel-drive electric powertrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Powertrain {
    pub accumulator: Accumulator,
    pub motor: Motor,
    pub motor_controller: MotorController,
}

impl Powertrain {
    /// Resistive voltage drop across pack and controller at a current.
    pub fn get_voltage_drop(&self, current: f64) -> f64 {
        current * (self.accumulator.resistance() + self.motor_controller.resistance)
    }

    /// Voltage available at the motor terminals.
    pub fn get_motor_voltage(&self, state_of_charge: f64, current: f64) -> SimResult<f64> {
        Ok(self.accumulator.get_voltage(state_of_charge)? - self.get_voltage_drop(current))
    }

    /// Speed above which the available voltage can no longer hold torque.
    pub fn get_knee_speed(&self, state_of_charge: f64, current: f64) -> SimResult<f64> {
        Ok(self.get_motor_voltage(state_of_charge, current)? * self.motor.speed_per_volt())
    }

    /// Largest motor speed reachable at a state of charge.
    pub fn get_maximum_motor_speed(&self, state_of_charge: f64) -> SimResult<f64> {
        Ok(self
            .get_knee_speed(state_of_charge, 0.0)?
            .min(self.motor.maximum_speed()))
    }

    /// Shaft torque available at a speed, respecting the voltage limit at
    /// maximum discharge current.
    pub fn get_motor_torque(&self, state_of_charge: f64, motor_speed: f64) -> SimResult<f64> {
        let knee = self.get_knee_speed(
            state_of_charge,
            self.accumulator.maximum_discharge_current(),
        )?;
        if motor_speed >= knee {
            Ok(0.0)
        } else {
            Ok(self.motor.get_torque(motor_speed))
        }
    }

    /// Shaft power at a speed (W).
    pub fn get_motor_power(&self, state_of_charge: f64, motor_speed: f64) -> SimResult<f64> {
        Ok(motor_speed * self.get_motor_torque(state_of_charge, motor_speed)?)
    }

    /// Electrical power drawn from the accumulator for a shaft power.
    pub fn get_accumulator_power(&self, state_of_charge: f64, motor_speed: f64) -> SimResult<f64> {
        Ok(self.get_motor_power(state_of_charge, motor_speed)? / self.motor_controller.efficiency)
    }

    pub fn update_state_of_charge(&self, state_of_charge: f64, energy: f64) -> f64 {
        self.accumulator.update_state_of_charge(state_of_charge, energy)
    }
}
