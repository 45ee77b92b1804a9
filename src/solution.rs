use crate::mesh::{TrackMesh, TrackNode};
use crate::vehicle_model::{FullVehicleState, StateVariables};
use serde::{Deserialize, Serialize};

/// The solver's working record for one track node.
///
/// Velocities are guarded by anchor flags: a plain set on an anchored
/// velocity is ignored, so later propagation steps cannot overwrite
/// pinned values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionNode {
    track: TrackNode,
    max_velocity: f64,
    initial_velocity: f64,
    final_velocity: f64,
    initial_anchored: bool,
    final_anchored: bool,
    apex: bool,
    state_variables: StateVariables,
    full_state: FullVehicleState,
}

impl SolutionNode {
    fn new(track: TrackNode, state_variables: StateVariables) -> Self {
        Self {
            track,
            max_velocity: 0.0,
            initial_velocity: 0.0,
            final_velocity: 0.0,
            initial_anchored: false,
            final_anchored: false,
            apex: false,
            state_variables,
            full_state: FullVehicleState::default(),
        }
    }

    pub fn track(&self) -> &TrackNode {
        &self.track
    }

    pub fn length(&self) -> f64 {
        self.track.length
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    pub fn initial_velocity(&self) -> f64 {
        self.initial_velocity
    }

    pub fn final_velocity(&self) -> f64 {
        self.final_velocity
    }

    pub fn is_apex(&self) -> bool {
        self.apex
    }

    pub fn state_variables(&self) -> StateVariables {
        self.state_variables
    }

    pub fn full_state(&self) -> &FullVehicleState {
        &self.full_state
    }

    pub(crate) fn set_max_velocity(&mut self, velocity: f64) {
        self.max_velocity = velocity;
    }

    /// Set the initial velocity unless it is anchored.
    pub(crate) fn set_initial_velocity(&mut self, velocity: f64) {
        if !self.initial_anchored {
            self.initial_velocity = velocity;
        }
    }

    /// Set the final velocity unless it is anchored.
    pub(crate) fn set_final_velocity(&mut self, velocity: f64) {
        if !self.final_anchored {
            self.final_velocity = velocity;
        }
    }

    /// Pin the initial velocity at a value.
    pub(crate) fn anchor_initial_velocity(&mut self, velocity: f64) {
        self.initial_velocity = velocity;
        self.initial_anchored = true;
    }

    #[allow(dead_code)]
    pub(crate) fn anchor_final_velocity(&mut self, velocity: f64) {
        self.final_velocity = velocity;
        self.final_anchored = true;
    }

    pub(crate) fn set_apex(&mut self, apex: bool) {
        self.apex = apex;
    }

    pub(crate) fn set_state_variables(&mut self, state: StateVariables) {
        self.state_variables = state;
    }

    pub(crate) fn set_full_state(&mut self, full_state: FullVehicleState) {
        self.full_state = full_state;
    }

    pub fn avg_velocity(&self) -> f64 {
        (self.initial_velocity + self.final_velocity) / 2.0
    }

    pub fn longitudinal_acceleration(&self) -> f64 {
        (self.final_velocity.powi(2) - self.initial_velocity.powi(2)) / (2.0 * self.track.length)
    }

    pub fn lateral_acceleration(&self) -> f64 {
        self.avg_velocity().powi(2) * self.track.curvature
    }

    /// Time spent on the node. Undefined (infinite) at zero velocity.
    pub fn time(&self) -> f64 {
        self.track.length / self.avg_velocity()
    }

    pub fn energy_used(&self) -> f64 {
        self.full_state.accumulator_power * self.time()
    }
}

/// The solution to a simulation: one record per mesh node.
///
/// Node 0's initial velocity is anchored at zero (a standing start); it
/// is the only permanent anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    nodes: Vec<SolutionNode>,
}

impl Solution {
    pub fn new(mesh: &TrackMesh, states: &[StateVariables]) -> Self {
        let mut nodes: Vec<SolutionNode> = mesh
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, track)| {
                let state = states.get(i).copied().unwrap_or_default();
                SolutionNode::new(*track, state)
            })
            .collect();
        nodes[0].anchor_initial_velocity(0.0);
        Self { nodes }
    }

    pub fn nodes(&self) -> &[SolutionNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [SolutionNode] {
        &mut self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Indices of the nodes currently flagged as apexes.
    pub fn apexes(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_apex())
            .map(|(i, _)| i)
            .collect()
    }

    /// Per-node state variables, as fed back by the quasi-transient loop.
    pub fn states(&self) -> Vec<StateVariables> {
        self.nodes.iter().map(|node| node.state_variables()).collect()
    }

    pub fn total_time(&self) -> f64 {
        self.nodes.iter().map(|node| node.time()).sum()
    }

    pub fn total_length(&self) -> f64 {
        self.nodes.iter().map(|node| node.length()).sum()
    }

    pub fn average_velocity(&self) -> f64 {
        self.total_length() / self.total_time()
    }
}
