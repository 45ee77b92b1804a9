mod common;

use common::{autocross_track, circle_track, straight_track, test_vehicle};
use lapsim::analysis::compare_vehicles;
use lapsim::environment::Environment;
use lapsim::mesh::{MeshGenerator, ENDURANCE_MIN_LENGTH};
use lapsim::point_mass::PointMassModel;
use lapsim::solution::Solution;
use lapsim::solver::{QuasiSteadyStateSolver, QuasiTransientSolver, SolverKind};
use lapsim::vehicle_model::{StateVariables, VehicleModel};

fn solve_qss(model: &dyn VehicleModel, track: &lapsim::track_data::TrackData) -> Solution {
    let mesh = MeshGenerator::new(1.0).generate_mesh(track).unwrap();
    let states = vec![StateVariables::default(); mesh.node_count()];
    QuasiSteadyStateSolver::solve(model, &mesh, &states).unwrap()
}

fn point_mass() -> PointMassModel {
    PointMassModel::new(test_vehicle(), Environment::default()).unwrap()
}

#[test]
fn test_straight_envelope_is_vehicle_maximum() {
    let model = point_mass();
    let solution = solve_qss(&model, &straight_track(100.0));

    for node in solution.nodes() {
        assert_eq!(node.max_velocity(), model.maximum_velocity());
    }
    assert_eq!(solution.nodes()[0].initial_velocity(), 0.0);
}

#[test]
fn test_velocity_envelope_and_continuity_invariants() {
    let model = point_mass();
    let solution = solve_qss(&model, &autocross_track());
    let nodes = solution.nodes();

    assert_eq!(nodes[0].initial_velocity(), 0.0);
    for node in nodes {
        assert!(node.max_velocity() >= 0.0);
        assert!(node.initial_velocity() <= node.max_velocity() + 1e-6);
        assert!(node.final_velocity() <= node.max_velocity() + 1e-6);
    }
    for i in 0..nodes.len() - 1 {
        assert_eq!(nodes[i].final_velocity(), nodes[i + 1].initial_velocity());
    }

    assert!(solution.total_time().is_finite());
    assert!(solution.total_time() > 0.0);
}

#[test]
fn test_constant_corner_rides_the_lateral_limit() {
    // 360 m circle of radius 20 m.
    let model = point_mass();
    let solution = solve_qss(&model, &circle_track(360.0, 0.05));
    let nodes = solution.nodes();

    // The lateral fixed point: mu*(W + downforce) balancing m v^2 k
    // gives v^2 = 3678.75 / 9.74375.
    let expected = (3678.75_f64 / 9.74375).sqrt();
    for node in nodes {
        assert!((node.max_velocity() - expected).abs() < 0.05);
    }

    // Past the launch transient the car rides just below the envelope,
    // held back only by the traction ellipse.
    for node in &nodes[nodes.len() / 2..] {
        assert!(node.final_velocity() <= node.max_velocity() + 1e-6);
        assert!(node.final_velocity() > 0.95 * node.max_velocity());
    }
}

#[test]
fn test_state_of_charge_monotonic() {
    let model = point_mass();
    let solution = solve_qss(&model, &autocross_track());
    let nodes = solution.nodes();

    for i in 0..nodes.len() - 1 {
        assert!(
            nodes[i + 1].state_variables().state_of_charge
                <= nodes[i].state_variables().state_of_charge
        );
    }

    // Driving consumes energy: the lap must end below full charge.
    let final_soc = nodes.last().unwrap().state_variables().state_of_charge;
    assert!(final_soc < 1.0);
    assert!(final_soc > 0.0);
}

#[test]
fn test_heavier_vehicle_is_never_faster() {
    let baseline = test_vehicle();
    let heavy = lapsim::parameters::get_parameter("Curb Mass")
        .unwrap()
        .get_new_vehicle(&baseline, baseline.inertia.curb_mass + 70.0);

    let mesh = MeshGenerator::new(1.0)
        .generate_mesh(&autocross_track())
        .unwrap();
    let results = compare_vehicles(
        vec![baseline, heavy],
        &mesh,
        Environment::default(),
        SolverKind::QuasiSteadyState,
    )
    .unwrap();

    let times: Vec<f64> = results.solutions().iter().map(|s| s.total_time()).collect();
    assert_eq!(times.len(), 2);
    assert!(times[1] >= times[0]);
}

#[test]
fn test_quasi_transient_converges() {
    let model = point_mass();
    let mesh = MeshGenerator::new(1.0)
        .generate_mesh(&autocross_track())
        .unwrap();

    let transient = QuasiTransientSolver::solve(&model, &mesh).unwrap();
    assert!(transient.total_time().is_finite());

    // Re-running the QSS solver with the converged SoC profile must
    // reproduce the lap time within the convergence tolerance.
    let replay = QuasiSteadyStateSolver::solve(&model, &mesh, &transient.states()).unwrap();
    assert!((replay.total_time() - transient.total_time()).abs() < 1e-4);
}

#[test]
fn test_out_of_range_state_of_charge_surfaces_config_error() {
    let model = point_mass();
    let mesh = MeshGenerator::new(1.0)
        .generate_mesh(&straight_track(100.0))
        .unwrap();

    let mut states = vec![StateVariables::default(); mesh.node_count()];
    states[0].state_of_charge = 1.5;

    let result = QuasiSteadyStateSolver::solve(&model, &mesh, &states);
    assert!(matches!(
        result,
        Err(lapsim::SimError::InvalidVehicleConfig(_))
    ));
}

#[test]
fn test_solver_is_deterministic() {
    let model = point_mass();
    let first = solve_qss(&model, &autocross_track());
    let second = solve_qss(&model, &autocross_track());

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_endurance_event_length() {
    let mesh = MeshGenerator::new(1.0)
        .generate_mesh(&autocross_track())
        .unwrap();
    let endurance = mesh.generate_endurance_mesh();

    assert!(endurance.total_length() >= ENDURANCE_MIN_LENGTH);
    // ceil(22000 / 200) = 110 laps of the 200 m autocross loop.
    assert_eq!(endurance.node_count(), mesh.node_count() * 110);
}
