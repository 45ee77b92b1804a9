use crate::error::SimResult;
use crate::mesh::TrackMesh;
use crate::solution::Solution;
use crate::vehicle_model::{ModelError, StateVariables, VehicleModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Iteration cap for the quasi-transient outer loop.
pub const MAX_TRANSIENT_ITERATIONS: usize = 100;

/// Lap-time convergence tolerance for the quasi-transient loop (s).
pub const CONVERGENCE_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    QuasiSteadyState,
    QuasiTransient,
}

impl SolverKind {
    pub fn solve(self, model: &dyn VehicleModel, mesh: &TrackMesh) -> SimResult<Solution> {
        match self {
            SolverKind::QuasiSteadyState => {
                let states = vec![StateVariables::default(); mesh.node_count()];
                QuasiSteadyStateSolver::solve(model, mesh, &states)
            }
            SolverKind::QuasiTransient => QuasiTransientSolver::solve(model, mesh),
        }
    }
}

/// Quasi-steady-state solver.
///
/// Treats each node's lateral dynamics as static at its velocity while
/// longitudinal dynamics evolve over segments. Runs in six strictly
/// ordered phases over a fresh solution.
pub struct QuasiSteadyStateSolver;

impl QuasiSteadyStateSolver {
    pub fn solve(
        model: &dyn VehicleModel,
        mesh: &TrackMesh,
        states: &[StateVariables],
    ) -> SimResult<Solution> {
        let mut solution = Solution::new(mesh, states);

        info!("Solving maximum velocity envelope...");
        Self::solve_maximum_velocity(model, &mut solution);

        let worklist = Self::identify_apexes(&mut solution);
        debug!("Found {} apexes", worklist.len());

        info!("Solving forward propagation...");
        Self::propagate_forward(model, &mut solution, &worklist)?;

        info!("Solving backward propagation...");
        Self::propagate_backward(model, &mut solution, &worklist)?;

        Self::resolve_full_state(model, &mut solution)?;
        Self::recompute_state_variables(model, &mut solution);

        Ok(solution)
    }

    /// Phase 1: the lateral-traction-limited velocity at every node.
    fn solve_maximum_velocity(model: &dyn VehicleModel, solution: &mut Solution) {
        for node in solution.nodes_mut() {
            let state = node.state_variables();
            let track = *node.track();
            node.set_max_velocity(model.lateral_velocity_limit(&state, &track));
        }
    }

    /// Phase 2: apexes are the strict local minima of the envelope, plus
    /// the first and last node. Returns the worklist sorted ascending by
    /// envelope velocity, ties broken by index.
    fn identify_apexes(solution: &mut Solution) -> Vec<usize> {
        let count = solution.node_count();
        let max_velocity: Vec<f64> =
            solution.nodes().iter().map(|n| n.max_velocity()).collect();

        let mut apexes: Vec<usize> = Vec::new();
        apexes.push(0);
        for i in 1..count.saturating_sub(1) {
            if max_velocity[i] < max_velocity[i - 1] && max_velocity[i] < max_velocity[i + 1] {
                apexes.push(i);
            }
        }
        if count > 1 {
            apexes.push(count - 1);
        }

        for &apex in &apexes {
            solution.nodes_mut()[apex].set_apex(true);
        }

        apexes.sort_by(|&a, &b| {
            max_velocity[a]
                .partial_cmp(&max_velocity[b])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        apexes
    }

    /// Phase 3: accelerate forward out of each surviving apex, slowest
    /// apex first.
    fn propagate_forward(
        model: &dyn VehicleModel,
        solution: &mut Solution,
        worklist: &[usize],
    ) -> SimResult<()> {
        let count = solution.node_count();

        for &apex in worklist {
            if !solution.nodes()[apex].is_apex() {
                continue;
            }

            let apex_velocity = solution.nodes()[apex].max_velocity();
            solution.nodes_mut()[apex].set_initial_velocity(apex_velocity);

            let mut i = apex;
            loop {
                let node = &solution.nodes()[i];
                let initial_velocity = node.initial_velocity();
                let state = node.state_variables();
                let track = *node.track();

                let traction_velocity =
                    match model.acceleration_at(&state, &track, initial_velocity) {
                        Ok(acceleration) => {
                            let term = initial_velocity.powi(2)
                                + 2.0 * acceleration * track.length;
                            term.max(0.0).sqrt()
                        }
                        // Outside the tyre envelope: no acceleration this step.
                        Err(ModelError::Attitude(_)) => initial_velocity,
                        Err(ModelError::Config(error)) => return Err(error),
                    };

                let final_velocity = traction_velocity.min(node.max_velocity());
                solution.nodes_mut()[i].set_final_velocity(final_velocity);

                if i + 1 >= count {
                    break;
                }
                solution.nodes_mut()[i + 1].set_initial_velocity(final_velocity);

                if solution.nodes()[i + 1].is_apex() {
                    if final_velocity < solution.nodes()[i + 1].max_velocity() {
                        // The later apex is dominated; it need not be
                        // solved independently.
                        solution.nodes_mut()[i + 1].set_apex(false);
                    } else {
                        break;
                    }
                }

                i += 1;
            }
        }

        Ok(())
    }

    /// Phase 4: brake backward into each surviving apex, in the same
    /// order.
    fn propagate_backward(
        model: &dyn VehicleModel,
        solution: &mut Solution,
        worklist: &[usize],
    ) -> SimResult<()> {
        for &apex in worklist {
            if !solution.nodes()[apex].is_apex() {
                continue;
            }

            let mut i = apex;
            while i > 0 {
                let previous_final = solution.nodes()[i - 1].final_velocity();
                let current_final = solution.nodes()[i].final_velocity();
                if previous_final <= current_final {
                    break;
                }

                let node = &solution.nodes()[i];
                let state = node.state_variables();
                let track = *node.track();

                let braking_velocity =
                    match model.deceleration_at(&state, &track, current_final) {
                        Ok(deceleration) => {
                            let term =
                                current_final.powi(2) + 2.0 * deceleration * track.length;
                            if term <= 0.0 {
                                0.0
                            } else {
                                term.sqrt()
                            }
                        }
                        Err(ModelError::Attitude(_)) => current_final,
                        Err(ModelError::Config(error)) => return Err(error),
                    };

                // The entry speed also respects this node's lateral
                // envelope; a faster apex's forward walk may have carried
                // an over-envelope speed in here.
                let new_velocity = braking_velocity
                    .min(previous_final)
                    .min(solution.nodes()[i].max_velocity());
                solution.nodes_mut()[i].set_initial_velocity(new_velocity);
                solution.nodes_mut()[i - 1].set_final_velocity(new_velocity);

                if solution.nodes()[i - 1].is_apex() {
                    // Compared against the pre-assignment final velocity:
                    // braking through an apex overrides it.
                    if new_velocity < previous_final {
                        solution.nodes_mut()[i - 1].set_apex(false);
                    } else {
                        break;
                    }
                }

                i -= 1;
            }
        }

        Ok(())
    }

    /// Phase 5: resolve the full vehicle state at each node's average
    /// velocity.
    fn resolve_full_state(model: &dyn VehicleModel, solution: &mut Solution) -> SimResult<()> {
        for node in solution.nodes_mut() {
            let state = node.state_variables();
            let track = *node.track();
            let velocity = node.avg_velocity();
            node.set_full_state(model.resolve(&state, &track, velocity)?);
        }
        Ok(())
    }

    /// Phase 6: advance the state of charge monotonically along the lap.
    fn recompute_state_variables(model: &dyn VehicleModel, solution: &mut Solution) {
        for i in 1..solution.node_count() {
            let previous = &solution.nodes()[i - 1];
            let state_of_charge = model.update_state_of_charge(
                previous.state_variables().state_of_charge,
                previous.energy_used(),
            );

            let node = &mut solution.nodes_mut()[i];
            let mut state = node.state_variables();
            state.state_of_charge = state_of_charge;
            state.velocity = node.avg_velocity();
            state.longitudinal_acceleration = node.longitudinal_acceleration();
            node.set_state_variables(state);
        }
    }
}

/// Quasi-transient solver: re-runs the QSS solver with the state of
/// charge profile fed back until the lap time converges.
pub struct QuasiTransientSolver;

impl QuasiTransientSolver {
    pub fn solve(model: &dyn VehicleModel, mesh: &TrackMesh) -> SimResult<Solution> {
        let states = vec![StateVariables::default(); mesh.node_count()];
        let mut solution = QuasiSteadyStateSolver::solve(model, mesh, &states)?;
        let mut previous_time = solution.total_time();
        info!("Iteration 0, time: {:.3}s", previous_time);

        for iteration in 1..MAX_TRANSIENT_ITERATIONS {
            let states = solution.states();
            solution = QuasiSteadyStateSolver::solve(model, mesh, &states)?;
            let time = solution.total_time();
            info!("Iteration {}, time: {:.3}s", iteration, time);

            if (time - previous_time).abs() < CONVERGENCE_TOLERANCE {
                info!("Converged after {} iterations.", iteration);
                return Ok(solution);
            }
            previous_time = time;
        }

        // Hitting the cap is not an error; the last iterate stands.
        warn!(
            "Quasi-transient loop did not converge within {} iterations",
            MAX_TRANSIENT_ITERATIONS
        );
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{TrackMesh, TrackNode};
    use crate::track_data::Configuration;
    use crate::tyre::InvalidAttitude;
    use crate::vehicle_model::{FullVehicleState, ModelError, StateVariables, VehicleModel};

    /// A vehicle with constant capabilities, for exercising the solver in
    /// isolation.
    struct ConstantCapabilityModel {
        max_velocity: f64,
        acceleration: f64,
        deceleration: f64,
        /// Envelope override per node index.
        envelope: Option<Vec<f64>>,
    }

    impl ConstantCapabilityModel {
        fn new(max_velocity: f64, acceleration: f64, deceleration: f64) -> Self {
            Self {
                max_velocity,
                acceleration,
                deceleration,
                envelope: None,
            }
        }
    }

    impl VehicleModel for ConstantCapabilityModel {
        fn resolve(
            &self,
            _state: &StateVariables,
            _node: &TrackNode,
            _velocity: f64,
        ) -> SimResult<FullVehicleState> {
            Ok(FullVehicleState::default())
        }

        fn lateral_velocity_limit(&self, _state: &StateVariables, node: &TrackNode) -> f64 {
            if let Some(envelope) = &self.envelope {
                envelope[node.sector as usize - 1]
            } else if node.curvature == 0.0 {
                self.max_velocity
            } else {
                self.max_velocity / 2.0
            }
        }

        fn acceleration_at(
            &self,
            _state: &StateVariables,
            _node: &TrackNode,
            _velocity: f64,
        ) -> Result<f64, ModelError> {
            Ok(self.acceleration)
        }

        fn deceleration_at(
            &self,
            _state: &StateVariables,
            _node: &TrackNode,
            _velocity: f64,
        ) -> Result<f64, ModelError> {
            Ok(self.deceleration)
        }

        fn maximum_velocity(&self) -> f64 {
            self.max_velocity
        }

        fn update_state_of_charge(&self, state_of_charge: f64, _energy: f64) -> f64 {
            state_of_charge
        }
    }

    fn uniform_mesh(node_count: usize, node_length: f64) -> TrackMesh {
        let nodes: Vec<TrackNode> = (0..node_count)
            .map(|i| TrackNode {
                position: i as f64 * node_length,
                length: node_length,
                curvature: 0.0,
                elevation: 0.0,
                inclination: 0.0,
                banking: 0.0,
                grip_factor: 1.0,
                sector: 1,
            })
            .collect();
        TrackMesh::new(nodes, Configuration::Open).unwrap()
    }

    /// Mesh whose per-node envelope is picked out of the model's table
    /// through the sector number.
    fn mesh_with_sectors(sectors: &[u32], node_length: f64) -> TrackMesh {
        let nodes: Vec<TrackNode> = sectors
            .iter()
            .enumerate()
            .map(|(i, &sector)| TrackNode {
                position: i as f64 * node_length,
                length: node_length,
                curvature: 0.0,
                elevation: 0.0,
                inclination: 0.0,
                banking: 0.0,
                grip_factor: 1.0,
                sector,
            })
            .collect();
        TrackMesh::new(nodes, Configuration::Open).unwrap()
    }

    fn solve(model: &dyn VehicleModel, mesh: &TrackMesh) -> Solution {
        let states = vec![StateVariables::default(); mesh.node_count()];
        QuasiSteadyStateSolver::solve(model, mesh, &states).unwrap()
    }

    #[test]
    fn test_straight_line_acceleration() {
        // 100 m straight, 10 nodes of 10 m, constant 5 m/s² both ways.
        let model = ConstantCapabilityModel::new(30.0, 5.0, 5.0);
        let mesh = uniform_mesh(10, 10.0);
        let solution = solve(&model, &mesh);
        let nodes = solution.nodes();

        assert_eq!(nodes[0].initial_velocity(), 0.0);
        assert!((nodes[0].final_velocity() - 10.0).abs() < 1e-9);
        assert!((nodes[1].final_velocity() - 200.0_f64.sqrt()).abs() < 1e-9);
        assert!((nodes[2].final_velocity() - 300.0_f64.sqrt()).abs() < 1e-9);

        // Capped at the envelope once sqrt(2 a s) exceeds it.
        let last = nodes.last().unwrap();
        assert!(last.final_velocity() <= 30.0 + 1e-9);
    }

    #[test]
    fn test_velocity_continuity() {
        let model = ConstantCapabilityModel::new(30.0, 5.0, 5.0);
        let mesh = uniform_mesh(10, 10.0);
        let solution = solve(&model, &mesh);
        let nodes = solution.nodes();

        for i in 0..nodes.len() - 1 {
            assert_eq!(nodes[i].final_velocity(), nodes[i + 1].initial_velocity());
        }
    }

    #[test]
    fn test_single_node_mesh_keeps_standing_start() {
        let model = ConstantCapabilityModel::new(30.0, 5.0, 5.0);
        let mesh = uniform_mesh(1, 10.0);
        let solution = solve(&model, &mesh);

        // The anchored standing start wins over the apex set; the exit
        // speed follows the kinematics over the node's own length.
        assert_eq!(solution.nodes()[0].initial_velocity(), 0.0);
        assert!((solution.nodes()[0].final_velocity() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_apex_pruning() {
        // Straight-corner-straight: a slow envelope at the central node,
        // flanks at 30 m/s, centre at 10 m/s. Acceleration is weak enough
        // that the trailing flank never recovers to its envelope.
        let mut sectors = vec![1u32; 201];
        sectors[100] = 2;
        let mesh = mesh_with_sectors(&sectors, 5.0);
        let mut model = ConstantCapabilityModel::new(30.0, 0.3, 6.0);
        model.envelope = Some(vec![30.0, 10.0]);

        let solution = solve(&model, &mesh);
        let apexes = solution.apexes();

        // The central apex survives; the apex at N-1 is dominated by the
        // acceleration out of the corner and was pruned.
        assert!(apexes.contains(&100));
        assert!(!apexes.contains(&200));
        assert!(apexes.iter().all(|&a| a == 0 || a == 100));

        // Velocity at the apex equals its envelope.
        let nodes = solution.nodes();
        assert!((nodes[100].initial_velocity() - 10.0).abs() < 1e-9);
        assert!(nodes[100].final_velocity() <= 10.0 + 1e-9);

        // Braking approach: the node before the apex ends at the apex
        // envelope and its entry speed follows the braking kinematics.
        assert!((nodes[99].final_velocity() - 10.0).abs() < 1e-9);
        let expected_entry = (10.0_f64.powi(2) + 2.0 * 6.0 * 5.0).sqrt();
        assert!((nodes[99].initial_velocity() - expected_entry).abs() < 1e-9);

        // Exit side accelerates away from the apex.
        let expected_exit = (10.0_f64.powi(2) + 2.0 * 0.3 * 5.0).sqrt();
        assert!((nodes[101].final_velocity() - expected_exit).abs() < 1e-9);
    }

    #[test]
    fn test_envelope_respected_everywhere() {
        let mut sectors = vec![1u32; 201];
        sectors[100] = 2;
        let mesh = mesh_with_sectors(&sectors, 5.0);
        let mut model = ConstantCapabilityModel::new(30.0, 3.0, 6.0);
        model.envelope = Some(vec![30.0, 10.0]);

        let solution = solve(&model, &mesh);
        let nodes = solution.nodes();
        for node in nodes {
            assert!(node.initial_velocity() <= node.max_velocity() + 1e-6);
            assert!(node.final_velocity() <= node.max_velocity() + 1e-6);
        }
        for i in 0..nodes.len() - 1 {
            assert_eq!(nodes[i].final_velocity(), nodes[i + 1].initial_velocity());
        }
    }

    #[test]
    fn test_constant_corner_rides_envelope_everywhere() {
        // 360 nodes of 1 m on a constant corner; acceleration is strong
        // enough to reach the cornering limit within the first node.
        let nodes: Vec<TrackNode> = (0..360)
            .map(|i| TrackNode {
                position: i as f64,
                length: 1.0,
                curvature: 0.02,
                elevation: 0.0,
                inclination: 0.0,
                banking: 0.0,
                grip_factor: 1.0,
                sector: 1,
            })
            .collect();
        let mesh = TrackMesh::new(nodes, Configuration::Closed).unwrap();
        let model = ConstantCapabilityModel::new(30.0, 500.0, 500.0);
        let solution = solve(&model, &mesh);

        // The model's cornering envelope is half its maximum velocity.
        for node in solution.nodes() {
            assert!((node.final_velocity() - 15.0).abs() < 1e-9);
        }

        // Only the standing-start node runs below the limit.
        let expected_time = 1.0 / 7.5 + 359.0 / 15.0;
        assert!((solution.total_time() - expected_time).abs() < 1e-9);
    }

    #[test]
    fn test_determinism() {
        let model = ConstantCapabilityModel::new(30.0, 5.0, 5.0);
        let mesh = uniform_mesh(50, 2.0);
        let first = solve(&model, &mesh);
        let second = solve(&model, &mesh);

        let first_bytes = serde_json::to_string(&first).unwrap();
        let second_bytes = serde_json::to_string(&second).unwrap();
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn test_acceleration_failure_falls_back_to_initial_velocity() {
        struct FailingModel;
        impl VehicleModel for FailingModel {
            fn resolve(
                &self,
                _state: &StateVariables,
                _node: &TrackNode,
                _velocity: f64,
            ) -> SimResult<FullVehicleState> {
                Ok(FullVehicleState::default())
            }
            fn lateral_velocity_limit(
                &self,
                _state: &StateVariables,
                _node: &TrackNode,
            ) -> f64 {
                20.0
            }
            fn acceleration_at(
                &self,
                _state: &StateVariables,
                _node: &TrackNode,
                _velocity: f64,
            ) -> Result<f64, ModelError> {
                Err(ModelError::Attitude(InvalidAttitude { required: 1.0, maximum: 0.5 }))
            }
            fn deceleration_at(
                &self,
                _state: &StateVariables,
                _node: &TrackNode,
                _velocity: f64,
            ) -> Result<f64, ModelError> {
                Err(ModelError::Attitude(InvalidAttitude { required: 1.0, maximum: 0.5 }))
            }
            fn maximum_velocity(&self) -> f64 {
                20.0
            }
            fn update_state_of_charge(&self, state_of_charge: f64, _energy: f64) -> f64 {
                state_of_charge
            }
        }

        let mesh = uniform_mesh(5, 10.0);
        let solution = solve(&FailingModel, &mesh);

        // No acceleration is possible from the standing start: every
        // velocity stays at zero.
        for node in solution.nodes() {
            assert_eq!(node.final_velocity(), 0.0);
        }
    }

    #[test]
    fn test_transient_converges_when_state_is_static() {
        // SoC feedback is a no-op, so the second iteration must match the
        // first and the loop converges immediately.
        let model = ConstantCapabilityModel::new(30.0, 5.0, 5.0);
        let mesh = uniform_mesh(10, 10.0);
        let solution = QuasiTransientSolver::solve(&model, &mesh).unwrap();
        let reference = solve(&model, &mesh);
        assert!((solution.total_time() - reference.total_time()).abs() < 1e-12);
    }
}
