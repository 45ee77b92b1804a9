use crate::error::{SimError, SimResult};
use crate::track_data::{Configuration, TrackData};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Minimum total length of an endurance event (m).
pub const ENDURANCE_MIN_LENGTH: f64 = 22_000.0;

/// One discretised segment of the track.
///
/// `position` is the distance from the track start to the *start* of the
/// segment. Nodes are immutable once the mesh is generated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackNode {
    pub position: f64,
    pub length: f64,
    /// Signed curvature, left positive, zero on a straight.
    pub curvature: f64,
    pub elevation: f64,
    pub inclination: f64,
    pub banking: f64,
    pub grip_factor: f64,
    pub sector: u32,
}

/// Ordered, non-empty sequence of track nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMesh {
    nodes: Vec<TrackNode>,
    configuration: Configuration,
}

impl TrackMesh {
    pub fn new(nodes: Vec<TrackNode>, configuration: Configuration) -> SimResult<Self> {
        if nodes.is_empty() {
            return Err(SimError::invalid_track("mesh must contain at least one node"));
        }
        for (i, node) in nodes.iter().enumerate() {
            if node.position < 0.0 {
                return Err(SimError::InvalidTrackData(format!(
                    "node {}: negative position {}",
                    i, node.position
                )));
            }
            if node.length <= 0.0 {
                return Err(SimError::InvalidTrackData(format!(
                    "node {}: non-positive length {}",
                    i, node.length
                )));
            }
            if node.inclination.abs() >= FRAC_PI_2 {
                return Err(SimError::InvalidTrackData(format!(
                    "node {}: inclination {} outside (-pi/2, pi/2)",
                    i, node.inclination
                )));
            }
            if node.banking.abs() > FRAC_PI_2 {
                return Err(SimError::InvalidTrackData(format!(
                    "node {}: banking {} outside [-pi/2, pi/2]",
                    i, node.banking
                )));
            }
            if node.grip_factor <= 0.0 {
                return Err(SimError::InvalidTrackData(format!(
                    "node {}: non-positive grip factor {}",
                    i, node.grip_factor
                )));
            }
            if node.sector < 1 {
                return Err(SimError::InvalidTrackData(format!("node {}: sector must be >= 1", i)));
            }
        }
        Ok(Self { nodes, configuration })
    }

    pub fn nodes(&self) -> &[TrackNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn configuration(&self) -> Configuration {
        self.configuration
    }

    pub fn total_length(&self) -> f64 {
        self.nodes.iter().map(|n| n.length).sum()
    }

    pub fn resolution(&self) -> f64 {
        self.total_length() / self.node_count() as f64
    }

    /// Derive an endurance mesh by looping this mesh until the total
    /// length reaches at least 22 000 m, re-numbering positions so they
    /// remain strictly increasing.
    pub fn generate_endurance_mesh(&self) -> TrackMesh {
        let lap_length = self.total_length();
        let laps = (ENDURANCE_MIN_LENGTH / lap_length).ceil().max(1.0) as usize;

        let mut nodes = Vec::with_capacity(self.nodes.len() * laps);
        for lap in 0..laps {
            let offset = lap as f64 * lap_length;
            for node in &self.nodes {
                let mut repeated = *node;
                repeated.position = node.position + offset;
                nodes.push(repeated);
            }
        }

        TrackMesh {
            nodes,
            configuration: self.configuration,
        }
    }
}

/// Generates a mesh from a track data object at a target node length.
#[derive(Debug, Clone, Copy)]
pub struct MeshGenerator {
    pub resolution: f64,
}

impl Default for MeshGenerator {
    fn default() -> Self {
        Self { resolution: 1.0 }
    }
}

impl MeshGenerator {
    pub fn new(resolution: f64) -> Self {
        Self { resolution }
    }

    pub fn generate_mesh(&self, track_data: &TrackData) -> SimResult<TrackMesh> {
        if self.resolution <= 0.0 {
            return Err(SimError::invalid_track("mesh resolution must be positive"));
        }
        if track_data.shape.is_empty() {
            return Err(SimError::invalid_track("track has no shape segments"));
        }

        let total_length = track_data.total_length();
        let node_count = ((total_length / self.resolution).round() as usize).max(1);
        let node_length = total_length / node_count as f64;

        let positions: Vec<f64> = (0..node_count).map(|i| i as f64 * node_length).collect();

        let curvature = self.interpolate_curvature(track_data, &positions, total_length);
        let elevation: Vec<f64> = positions
            .iter()
            .map(|&p| interp_linear(p, &sample_pairs(&track_data.elevation)))
            .collect();
        let banking: Vec<f64> = positions
            .iter()
            .map(|&p| interp_linear(p, &sample_pairs(&track_data.banking)))
            .collect();
        let inclination = calculate_inclination(&positions, &elevation);

        let grip_anchors: Vec<(f64, f64)> = if track_data.grip_factor.is_empty() {
            vec![(0.0, 1.0)]
        } else {
            track_data
                .grip_factor
                .iter()
                .map(|band| (band.start_point, band.grip_factor))
                .collect()
        };
        let sector_anchors: Vec<(f64, u32)> = if track_data.sector.is_empty() {
            vec![(0.0, 1)]
        } else {
            track_data
                .sector
                .iter()
                .map(|band| (band.start_point, band.sector))
                .collect()
        };

        let nodes: Vec<TrackNode> = (0..node_count)
            .map(|i| TrackNode {
                position: positions[i],
                length: node_length,
                curvature: curvature[i],
                elevation: elevation[i],
                inclination: inclination[i],
                banking: banking[i],
                grip_factor: interp_previous(positions[i], &grip_anchors),
                sector: interp_previous(positions[i], &sector_anchors),
            })
            .collect();

        TrackMesh::new(nodes, track_data.configuration)
    }

    /// Shape segments carry piecewise-constant curvature; the anchor for
    /// linear interpolation is the midpoint of each segment. Closed tracks
    /// get a wrap-around anchor one segment-length beyond the last,
    /// carrying the first segment's value.
    fn interpolate_curvature(
        &self,
        track_data: &TrackData,
        positions: &[f64],
        _total_length: f64,
    ) -> Vec<f64> {
        let mut anchors: Vec<(f64, f64)> = Vec::with_capacity(track_data.shape.len() + 1);
        let mut start = 0.0;
        for segment in &track_data.shape {
            anchors.push((start + segment.length / 2.0, segment.curvature));
            start += segment.length;
        }

        if track_data.configuration == Configuration::Closed {
            let last_length = track_data.shape.last().map(|s| s.length).unwrap_or(0.0);
            let first_value = anchors[0].1;
            let last_position = anchors.last().map(|a| a.0).unwrap_or(0.0);
            anchors.push((last_position + last_length, first_value));
        }

        positions.iter().map(|&p| interp_linear(p, &anchors)).collect()
    }
}

fn sample_pairs(samples: &[crate::track_data::TrackSample]) -> Vec<(f64, f64)> {
    samples.iter().map(|s| (s.position, s.value)).collect()
}

/// Inclination is the atan of adjacent elevation slopes, anchored at the
/// midpoint of each position interval and linearly interpolated back onto
/// the node positions.
fn calculate_inclination(positions: &[f64], elevation: &[f64]) -> Vec<f64> {
    if positions.len() < 2 {
        return vec![0.0; positions.len()];
    }

    let mut anchors: Vec<(f64, f64)> = Vec::with_capacity(positions.len() - 1);
    for i in 0..positions.len() - 1 {
        let dp = positions[i + 1] - positions[i];
        let de = elevation[i + 1] - elevation[i];
        anchors.push((positions[i] + dp / 2.0, (de / dp).atan()));
    }

    positions.iter().map(|&p| interp_linear(p, &anchors)).collect()
}

/// Linear interpolation over (position, value) anchors, clamping to the
/// end values outside the anchored range.
fn interp_linear(x: f64, anchors: &[(f64, f64)]) -> f64 {
    match anchors {
        [] => 0.0,
        [only] => only.1,
        _ => {
            if x <= anchors[0].0 {
                return anchors[0].1;
            }
            if x >= anchors[anchors.len() - 1].0 {
                return anchors[anchors.len() - 1].1;
            }
            for window in anchors.windows(2) {
                let (x0, y0) = window[0];
                let (x1, y1) = window[1];
                if x >= x0 && x <= x1 {
                    let t = (x - x0) / (x1 - x0);
                    return y0 + (y1 - y0) * t;
                }
            }
            anchors[anchors.len() - 1].1
        }
    }
}

/// Previous-value step lookup: a band starting at a position applies
/// until the next band start.
fn interp_previous<T: Copy>(x: f64, anchors: &[(f64, T)]) -> T {
    let mut value = anchors[0].1;
    for &(start, v) in anchors {
        if x >= start {
            value = v;
        } else {
            break;
        }
    }
    value
}
