use crate::competition::{simulate_competition, CompetitionSettings};
use crate::error::SimResult;
use crate::mesh::TrackMesh;
use crate::parameters::Parameter;
use crate::points::{calculate_points, CompetitionData};
use crate::solution::Solution;
use crate::solver::SolverKind;
use crate::vehicle::Vehicle;
use crate::vehicle_model::VehicleModel;
use tracing::info;

/// Relative step used for central-difference sensitivities.
const PARAMETER_DELTA_SCALAR: f64 = 1e-4;

/// Settings for a 1-D sweep of a parameter.
#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    pub parameter: &'static Parameter,
    pub start_value: f64,
    pub end_value: f64,
    pub number_of_steps: usize,
}

impl SweepSettings {
    /// The linearly spaced parameter values of the sweep.
    pub fn values(&self) -> Vec<f64> {
        if self.number_of_steps <= 1 {
            return vec![self.start_value];
        }
        let step = (self.end_value - self.start_value) / (self.number_of_steps - 1) as f64;
        (0..self.number_of_steps)
            .map(|i| self.start_value + step * i as f64)
            .collect()
    }
}

/// Parameter values and the competition points they scored.
#[derive(Debug, Clone)]
pub struct SweepResults {
    pub parameter: &'static Parameter,
    pub data: Vec<(f64, f64)>,
}

/// Sweep a parameter, running the full competition at each value.
pub fn sweep_1d(
    baseline_vehicle: &Vehicle,
    sweep_settings: &SweepSettings,
    competition_settings: &CompetitionSettings,
    competition_data: &CompetitionData,
) -> SimResult<SweepResults> {
    let mut results = SweepResults {
        parameter: sweep_settings.parameter,
        data: Vec::with_capacity(sweep_settings.number_of_steps),
    };

    for value in sweep_settings.values() {
        info!(
            "Simulating vehicle with {} = {}",
            sweep_settings.parameter.name, value
        );
        let vehicle = sweep_settings.parameter.get_new_vehicle(baseline_vehicle, value);
        let competition = simulate_competition(&vehicle, competition_settings)?;
        let points = calculate_points(&competition, competition_data);
        results.data.push((value, points.total()));
    }

    Ok(results)
}

/// Central-difference sensitivity of total points to one parameter.
pub struct SensitivityAnalysis<'a> {
    pub baseline_vehicle: &'a Vehicle,
    pub parameter: &'static Parameter,
}

impl<'a> SensitivityAnalysis<'a> {
    pub fn new(baseline_vehicle: &'a Vehicle, parameter: &'static Parameter) -> Self {
        Self {
            baseline_vehicle,
            parameter,
        }
    }

    pub fn baseline_value(&self) -> f64 {
        self.parameter.get_value(self.baseline_vehicle)
    }

    pub fn parameter_delta(&self) -> f64 {
        self.baseline_value() * PARAMETER_DELTA_SCALAR
    }

    pub fn get_sensitivity(
        &self,
        competition_settings: &CompetitionSettings,
        competition_data: &CompetitionData,
    ) -> SimResult<f64> {
        let delta = self.parameter_delta();
        let baseline = self.baseline_value();

        let mut total_points = [0.0; 2];
        for (i, value) in [baseline + delta, baseline - delta].into_iter().enumerate() {
            let vehicle = self.parameter.get_new_vehicle(self.baseline_vehicle, value);
            let results = simulate_competition(&vehicle, competition_settings)?;
            total_points[i] = calculate_points(&results, competition_data).total();
        }

        Ok((total_points[0] - total_points[1]) / (2.0 * delta))
    }
}

/// Sensitivity of one parameter evaluated across a sweep of another.
#[derive(Debug, Clone)]
pub struct CouplingResults {
    pub sweep_parameter: &'static Parameter,
    pub coupled_parameter: &'static Parameter,
    pub data: Vec<(f64, f64)>,
}

pub fn coupling(
    baseline_vehicle: &Vehicle,
    sweep_settings: &SweepSettings,
    coupled_parameter: &'static Parameter,
    competition_settings: &CompetitionSettings,
    competition_data: &CompetitionData,
) -> SimResult<CouplingResults> {
    let mut results = CouplingResults {
        sweep_parameter: sweep_settings.parameter,
        coupled_parameter,
        data: Vec::with_capacity(sweep_settings.number_of_steps),
    };

    for value in sweep_settings.values() {
        info!(
            "Coupling: {} = {}, differentiating {}",
            sweep_settings.parameter.name, value, coupled_parameter.name
        );
        let vehicle = sweep_settings.parameter.get_new_vehicle(baseline_vehicle, value);
        let analysis = SensitivityAnalysis::new(&vehicle, coupled_parameter);
        let sensitivity = analysis.get_sensitivity(competition_settings, competition_data)?;
        results.data.push((value, sensitivity));
    }

    Ok(results)
}

/// The solutions for a set of distinct vehicles on one mesh.
#[derive(Debug, Clone, Default)]
pub struct ComparisonResults {
    vehicles: Vec<Vehicle>,
    solutions: Vec<Solution>,
}

impl ComparisonResults {
    pub fn add_result(&mut self, vehicle: Vehicle, solution: Solution) {
        self.vehicles.push(vehicle);
        self.solutions.push(solution);
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vehicle, &Solution)> {
        self.vehicles.iter().zip(self.solutions.iter())
    }
}

/// Run the same simulation for each vehicle and collect the solutions.
pub fn compare_vehicles(
    vehicles: Vec<Vehicle>,
    mesh: &TrackMesh,
    environment: crate::environment::Environment,
    solver: SolverKind,
) -> SimResult<ComparisonResults> {
    let mut results = ComparisonResults::default();
    for vehicle in vehicles {
        let model = crate::vehicle_model::create_model("point_mass", vehicle.clone(), environment)?;
        let solution = solver.solve(model.as_ref() as &dyn VehicleModel, mesh)?;
        results.add_result(vehicle, solution);
    }
    Ok(results)
}
