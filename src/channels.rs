use crate::error::{SimError, SimResult};
use crate::solution::Solution;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// Physical quantity of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Time,
    Length,
    Curvature,
    Velocity,
    Acceleration,
    Angle,
    Force,
    Torque,
    Energy,
    Power,
    Dimensionless,
}

/// Display units, convertible from the SI value of their quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Second,
    Meter,
    PerMeter,
    MeterPerSecond,
    KilometerPerHour,
    MeterPerSecondSquared,
    Radian,
    Degree,
    Newton,
    NewtonMeter,
    Joule,
    Watt,
    Kilowatt,
    Fraction,
}

impl Unit {
    pub fn quantity(&self) -> Quantity {
        match self {
            Unit::Second => Quantity::Time,
            Unit::Meter => Quantity::Length,
            Unit::PerMeter => Quantity::Curvature,
            Unit::MeterPerSecond | Unit::KilometerPerHour => Quantity::Velocity,
            Unit::MeterPerSecondSquared => Quantity::Acceleration,
            Unit::Radian | Unit::Degree => Quantity::Angle,
            Unit::Newton => Quantity::Force,
            Unit::NewtonMeter => Quantity::Torque,
            Unit::Joule => Quantity::Energy,
            Unit::Watt | Unit::Kilowatt => Quantity::Power,
            Unit::Fraction => Quantity::Dimensionless,
        }
    }

    /// Convert a value from SI units into this unit.
    pub fn convert(&self, si_value: f64) -> f64 {
        match self {
            Unit::KilometerPerHour => si_value * 3.6,
            Unit::Degree => si_value.to_degrees(),
            Unit::Kilowatt => si_value / 1000.0,
            _ => si_value,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Second => "s",
            Unit::Meter => "m",
            Unit::PerMeter => "1/m",
            Unit::MeterPerSecond => "m/s",
            Unit::KilometerPerHour => "km/h",
            Unit::MeterPerSecondSquared => "m/s^2",
            Unit::Radian => "rad",
            Unit::Degree => "deg",
            Unit::Newton => "N",
            Unit::NewtonMeter => "Nm",
            Unit::Joule => "J",
            Unit::Watt => "W",
            Unit::Kilowatt => "kW",
            Unit::Fraction => "-",
        }
    }
}

/// A function from a solution to one value per node.
pub type ChannelFn = Arc<dyn Fn(&Solution) -> Vec<f64> + Send + Sync>;

/// A named, unit-tagged data channel.
#[derive(Clone)]
pub struct Channel {
    pub name: &'static str,
    pub unit: Unit,
    function: ChannelFn,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .finish()
    }
}

impl Channel {
    fn new(name: &'static str, unit: Unit, function: ChannelFn) -> Self {
        Self { name, unit, function }
    }

    /// Extract the channel values in SI units.
    pub fn values(&self, solution: &Solution) -> Vec<f64> {
        (self.function)(solution)
    }

    /// Extract the channel values converted to a display unit of the same
    /// quantity.
    pub fn values_in(&self, solution: &Solution, unit: Unit) -> Vec<f64> {
        assert!(
            unit.quantity() == self.unit.quantity(),
            "unit '{}' does not match the quantity of channel '{}'",
            unit.symbol(),
            self.name
        );
        self.values(solution).into_iter().map(|v| unit.convert(v)).collect()
    }

    /// Axis label in the format "Name (unit)".
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.unit.symbol())
    }
}

// --- Combinators ---

fn from_node(f: fn(&crate::solution::SolutionNode) -> f64) -> ChannelFn {
    Arc::new(move |solution| solution.nodes().iter().map(f).collect())
}

pub fn negate(channel: ChannelFn) -> ChannelFn {
    Arc::new(move |solution| channel(solution).into_iter().map(|v| -v).collect())
}

pub fn add(channel_1: ChannelFn, channel_2: ChannelFn) -> ChannelFn {
    Arc::new(move |solution| {
        channel_1(solution)
            .into_iter()
            .zip(channel_2(solution))
            .map(|(a, b)| a + b)
            .collect()
    })
}

pub fn subtract(channel_1: ChannelFn, channel_2: ChannelFn) -> ChannelFn {
    add(channel_1, negate(channel_2))
}

pub fn product(channel_1: ChannelFn, channel_2: ChannelFn) -> ChannelFn {
    Arc::new(move |solution| {
        channel_1(solution)
            .into_iter()
            .zip(channel_2(solution))
            .map(|(a, b)| a * b)
            .collect()
    })
}

pub fn quotient(channel_1: ChannelFn, channel_2: ChannelFn) -> ChannelFn {
    Arc::new(move |solution| {
        channel_1(solution)
            .into_iter()
            .zip(channel_2(solution))
            .map(|(a, b)| a / b)
            .collect()
    })
}

pub fn power(channel: ChannelFn, exponent: f64) -> ChannelFn {
    Arc::new(move |solution| {
        channel(solution).into_iter().map(|v| v.powf(exponent)).collect()
    })
}

pub fn square(channel: ChannelFn) -> ChannelFn {
    power(channel, 2.0)
}

pub fn square_root(channel: ChannelFn) -> ChannelFn {
    Arc::new(move |solution| channel(solution).into_iter().map(|v| v.sqrt()).collect())
}

pub fn hypot(channel_1: ChannelFn, channel_2: ChannelFn) -> ChannelFn {
    square_root(add(square(channel_1), square(channel_2)))
}

/// Forward difference preserving length: interior values average the
/// adjacent differences, the ends keep the true differences.
pub fn difference(channel: ChannelFn) -> ChannelFn {
    Arc::new(move |solution| {
        let x = channel(solution);
        if x.len() < 2 {
            return vec![0.0; x.len()];
        }
        let true_diff: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let mut result = Vec::with_capacity(x.len());
        result.push(true_diff[0]);
        for i in 0..true_diff.len() - 1 {
            result.push(0.5 * (true_diff[i] + true_diff[i + 1]));
        }
        result.push(true_diff[true_diff.len() - 1]);
        result
    })
}

pub fn cumulative_sum(channel: ChannelFn) -> ChannelFn {
    Arc::new(move |solution| {
        let mut total = 0.0;
        channel(solution)
            .into_iter()
            .map(|v| {
                total += v;
                total
            })
            .collect()
    })
}

pub fn derivative(channel: ChannelFn, wrt: ChannelFn) -> ChannelFn {
    quotient(difference(channel), wrt)
}

pub fn integral(channel: ChannelFn, wrt: ChannelFn) -> ChannelFn {
    cumulative_sum(product(channel, wrt))
}

// --- Registry ---

static CHANNEL_REGISTRY: OnceLock<BTreeMap<&'static str, Channel>> = OnceLock::new();

fn registry() -> &'static BTreeMap<&'static str, Channel> {
    CHANNEL_REGISTRY.get_or_init(|| {
        let mut channels: BTreeMap<&'static str, Channel> = BTreeMap::new();
        let mut register = |channel: Channel| {
            channels.insert(channel.name, channel);
        };

        register(Channel::new(
            "Position",
            Unit::Meter,
            from_node(|n| n.track().position),
        ));
        register(Channel::new(
            "Length",
            Unit::Meter,
            from_node(|n| n.track().length),
        ));
        register(Channel::new(
            "Elevation",
            Unit::Meter,
            from_node(|n| n.track().elevation),
        ));
        register(Channel::new(
            "Curvature",
            Unit::PerMeter,
            from_node(|n| n.track().curvature),
        ));
        register(Channel::new(
            "Banking",
            Unit::Radian,
            from_node(|n| n.track().banking),
        ));
        register(Channel::new(
            "Inclination",
            Unit::Radian,
            from_node(|n| n.track().inclination),
        ));
        register(Channel::new(
            "Velocity",
            Unit::MeterPerSecond,
            from_node(|n| n.avg_velocity()),
        ));
        register(Channel::new(
            "Maximum Velocity",
            Unit::MeterPerSecond,
            from_node(|n| n.max_velocity()),
        ));
        register(Channel::new(
            "Longitudinal Acceleration",
            Unit::MeterPerSecondSquared,
            from_node(|n| n.longitudinal_acceleration()),
        ));
        register(Channel::new(
            "Lateral Acceleration",
            Unit::MeterPerSecondSquared,
            from_node(|n| n.lateral_acceleration()),
        ));
        register(Channel::new(
            "Resultant Acceleration",
            Unit::MeterPerSecondSquared,
            hypot(
                from_node(|n| n.longitudinal_acceleration()),
                from_node(|n| n.lateral_acceleration()),
            ),
        ));
        register(Channel::new(
            "Time",
            Unit::Second,
            cumulative_sum(from_node(|n| n.time())),
        ));
        register(Channel::new(
            "State of Charge",
            Unit::Fraction,
            from_node(|n| n.state_variables().state_of_charge),
        ));
        register(Channel::new(
            "Motor Torque",
            Unit::NewtonMeter,
            from_node(|n| n.full_state().motor_torque),
        ));
        register(Channel::new(
            "Motor Power",
            Unit::Watt,
            from_node(|n| n.full_state().motor_power),
        ));
        register(Channel::new(
            "Accumulator Power",
            Unit::Watt,
            from_node(|n| n.full_state().accumulator_power),
        ));
        register(Channel::new(
            "Energy Used",
            Unit::Joule,
            cumulative_sum(from_node(|n| n.energy_used())),
        ));
        register(Channel::new(
            "Normal Force",
            Unit::Newton,
            from_node(|n| n.full_state().normal_force),
        ));
        register(Channel::new(
            "Downforce",
            Unit::Newton,
            from_node(|n| n.full_state().downforce),
        ));
        register(Channel::new(
            "Drag",
            Unit::Newton,
            from_node(|n| n.full_state().drag),
        ));

        channels
    })
}

/// Look up a data channel by name.
pub fn get_channel(name: &str) -> SimResult<&'static Channel> {
    registry().get(name).ok_or_else(|| SimError::UnknownChannel {
        name: name.to_string(),
        available: list_channels(),
    })
}

/// The available channel names.
pub fn list_channels() -> Vec<String> {
    registry().keys().map(|k| k.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{TrackMesh, TrackNode};
    use crate::track_data::Configuration;
    use crate::vehicle_model::StateVariables;

    fn test_solution() -> Solution {
        let nodes: Vec<TrackNode> = (0..4)
            .map(|i| TrackNode {
                position: i as f64 * 10.0,
                length: 10.0,
                curvature: 0.05,
                elevation: 0.0,
                inclination: 0.0,
                banking: 0.0,
                grip_factor: 1.0,
                sector: 1,
            })
            .collect();
        let mesh = TrackMesh::new(nodes, Configuration::Open).unwrap();
        let states = vec![StateVariables::default(); 4];
        let mut solution = Solution::new(&mesh, &states);
        for (i, node) in solution.nodes_mut().iter_mut().enumerate() {
            node.set_initial_velocity(10.0 + i as f64 * 2.0);
            node.set_final_velocity(12.0 + i as f64 * 2.0);
        }
        solution
    }

    #[test]
    fn test_velocity_channel() {
        let solution = test_solution();
        let channel = get_channel("Velocity").unwrap();
        let values = channel.values(&solution);
        // Node 0's initial stays anchored at 0 -> average (0 + 12) / 2.
        assert_eq!(values[0], 6.0);
        assert_eq!(values[1], 13.0);
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_unknown_channel_lists_available() {
        let error = get_channel("Warp Factor").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("Warp Factor"));
        assert!(message.contains("Velocity"));
    }

    #[test]
    fn test_time_is_cumulative() {
        let solution = test_solution();
        let values = get_channel("Time").unwrap().values(&solution);
        for window in values.windows(2) {
            assert!(window[1] > window[0]);
        }
        let total: f64 = solution.nodes().iter().map(|n| n.time()).sum();
        assert!((values[3] - total).abs() < 1e-12);
    }

    #[test]
    fn test_resultant_acceleration_is_hypot() {
        let solution = test_solution();
        let longitudinal = get_channel("Longitudinal Acceleration")
            .unwrap()
            .values(&solution);
        let lateral = get_channel("Lateral Acceleration").unwrap().values(&solution);
        let resultant = get_channel("Resultant Acceleration")
            .unwrap()
            .values(&solution);
        for i in 0..solution.node_count() {
            assert!((resultant[i] - longitudinal[i].hypot(lateral[i])).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unit_conversion() {
        let solution = test_solution();
        let channel = get_channel("Velocity").unwrap();
        let si = channel.values(&solution);
        let kph = channel.values_in(&solution, Unit::KilometerPerHour);
        assert!((kph[1] - si[1] * 3.6).abs() < 1e-12);
    }

    #[test]
    #[should_panic]
    fn test_unit_quantity_mismatch_panics() {
        let solution = test_solution();
        let channel = get_channel("Velocity").unwrap();
        channel.values_in(&solution, Unit::Newton);
    }

    #[test]
    fn test_difference_preserves_length() {
        let values = Arc::new(|_: &Solution| vec![1.0, 3.0, 6.0, 10.0]) as ChannelFn;
        let diff = difference(values);
        let solution = test_solution();
        let result = diff(&solution);
        assert_eq!(result, vec![2.0, 2.5, 3.5, 4.0]);
    }

    #[test]
    fn test_combinator_algebra() {
        let solution = test_solution();
        let ones = Arc::new(|s: &Solution| vec![1.0; s.node_count()]) as ChannelFn;
        let twos = Arc::new(|s: &Solution| vec![2.0; s.node_count()]) as ChannelFn;

        assert_eq!(add(ones.clone(), twos.clone())(&solution)[0], 3.0);
        assert_eq!(subtract(ones.clone(), twos.clone())(&solution)[0], -1.0);
        assert_eq!(product(ones.clone(), twos.clone())(&solution)[0], 2.0);
        assert_eq!(quotient(ones.clone(), twos.clone())(&solution)[0], 0.5);
        assert_eq!(power(twos.clone(), 3.0)(&solution)[0], 8.0);
        assert_eq!(square_root(power(twos.clone(), 2.0))(&solution)[0], 2.0);
        assert_eq!(cumulative_sum(ones.clone())(&solution), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            integral(ones.clone(), twos.clone())(&solution),
            vec![2.0, 4.0, 6.0, 8.0]
        );
    }
}
