use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration of a track. A closed track returns to its starting
/// position; an open track may end elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Configuration {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Forward
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl TrackMetadata {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed Track")
    }
}

/// One section of the track centreline with constant curvature.
///
/// Curvature is signed: left corners positive, right corners negative,
/// zero on a straight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeSegment {
    pub length: f64,
    pub curvature: f64,
}

/// A sampled value at a position along the track (elevation, banking).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSample {
    pub position: f64,
    pub value: f64,
}

/// A band starting at a position and extending to the next band start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GripFactorBand {
    pub start_point: f64,
    pub grip_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorBand {
    pub start_point: f64,
    pub sector: u32,
}

/// Validated track description, ready for mesh generation.
///
/// Banking is held in radians; the document format stores degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackData {
    pub metadata: TrackMetadata,
    pub shape: Vec<ShapeSegment>,
    pub elevation: Vec<TrackSample>,
    pub banking: Vec<TrackSample>,
    pub grip_factor: Vec<GripFactorBand>,
    pub sector: Vec<SectorBand>,
    pub configuration: Configuration,
}

impl TrackData {
    pub fn total_length(&self) -> f64 {
        self.shape.iter().map(|s| s.length).sum()
    }
}

// --- Document format ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    Straight,
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeRow {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub section_length: f64,
    #[serde(default)]
    pub corner_radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationRow {
    pub point: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankingRow {
    pub point: f64,
    pub banking_deg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GripFactorRow {
    pub start_point: f64,
    pub grip_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorRow {
    pub start_point: f64,
    pub sector: u32,
}

/// On-disk track document (JSON or YAML).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackFileFormat {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    pub configuration: Configuration,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub mirror: bool,
    pub shape: Vec<ShapeRow>,
    #[serde(default)]
    pub elevation: Vec<ElevationRow>,
    #[serde(default)]
    pub banking: Vec<BankingRow>,
    #[serde(default)]
    pub grip_factors: Vec<GripFactorRow>,
    #[serde(default)]
    pub sectors: Vec<SectorRow>,
}

pub struct TrackLoader;

impl TrackLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SimResult<TrackData> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::load_from_string(&content).map_err(|e| match e {
            SimError::InvalidTrackData(msg) => {
                SimError::InvalidTrackData(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn load_from_string(content: &str) -> SimResult<TrackData> {
        let track_file: TrackFileFormat = if content.trim_start().starts_with('{') {
            serde_json::from_str(content)
                .map_err(|e| SimError::InvalidTrackData(format!("JSON parse error: {}", e)))?
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| SimError::InvalidTrackData(format!("YAML parse error: {}", e)))?
        };

        Self::validate(&track_file)?;
        Ok(Self::build_track_data(track_file))
    }

    fn validate(track: &TrackFileFormat) -> SimResult<()> {
        if track.shape.is_empty() {
            return Err(SimError::invalid_track("track must have at least one shape segment"));
        }

        for (row, segment) in track.shape.iter().enumerate() {
            if segment.section_length <= 0.0 {
                return Err(SimError::InvalidTrackData(format!(
                    "shape row {}: section length must be positive (got {})",
                    row, segment.section_length
                )));
            }
            if segment.section_type != SectionType::Straight && segment.corner_radius <= 0.0 {
                return Err(SimError::InvalidTrackData(format!(
                    "shape row {}: corner radius must be positive (got {})",
                    row, segment.corner_radius
                )));
            }
        }

        for (row, banking) in track.banking.iter().enumerate() {
            if !(-90.0..=90.0).contains(&banking.banking_deg) {
                return Err(SimError::InvalidTrackData(format!(
                    "banking row {}: angle out of range [-90, 90] (got {})",
                    row, banking.banking_deg
                )));
            }
        }

        for (row, band) in track.grip_factors.iter().enumerate() {
            if band.grip_factor <= 0.0 {
                return Err(SimError::InvalidTrackData(format!(
                    "grip factor row {}: grip factor must be positive (got {})",
                    row, band.grip_factor
                )));
            }
        }

        Self::check_monotonic(track.elevation.iter().map(|r| r.point), "elevation")?;
        Self::check_monotonic(track.banking.iter().map(|r| r.point), "banking")?;
        Self::check_monotonic(track.grip_factors.iter().map(|r| r.start_point), "grip factor")?;
        Self::check_monotonic(track.sectors.iter().map(|r| r.start_point), "sector")?;

        Ok(())
    }

    fn check_monotonic(points: impl Iterator<Item = f64>, sheet: &str) -> SimResult<()> {
        let mut previous = f64::NEG_INFINITY;
        for (row, point) in points.enumerate() {
            if point <= previous {
                return Err(SimError::InvalidTrackData(format!(
                    "{} row {}: positions must be strictly increasing (got {} after {})",
                    sheet, row, point, previous
                )));
            }
            previous = point;
        }
        Ok(())
    }

    fn build_track_data(track_file: TrackFileFormat) -> TrackData {
        let mut shape: Vec<ShapeSegment> = track_file
            .shape
            .iter()
            .map(|row| ShapeSegment {
                length: row.section_length,
                curvature: match row.section_type {
                    SectionType::Straight => 0.0,
                    SectionType::Left => 1.0 / row.corner_radius,
                    SectionType::Right => -1.0 / row.corner_radius,
                },
            })
            .collect();

        if track_file.direction == Direction::Backward {
            shape.reverse();
            for segment in &mut shape {
                segment.curvature = -segment.curvature;
            }
        }
        if track_file.mirror {
            for segment in &mut shape {
                segment.curvature = -segment.curvature;
            }
        }

        let elevation = if track_file.elevation.is_empty() {
            vec![TrackSample { position: 0.0, value: 0.0 }]
        } else {
            track_file
                .elevation
                .iter()
                .map(|r| TrackSample { position: r.point, value: r.elevation })
                .collect()
        };

        let banking = if track_file.banking.is_empty() {
            vec![TrackSample { position: 0.0, value: 0.0 }]
        } else {
            track_file
                .banking
                .iter()
                .map(|r| TrackSample {
                    position: r.point,
                    value: r.banking_deg.to_radians(),
                })
                .collect()
        };

        let grip_factor = if track_file.grip_factors.is_empty() {
            vec![GripFactorBand { start_point: 0.0, grip_factor: 1.0 }]
        } else {
            track_file
                .grip_factors
                .iter()
                .map(|r| GripFactorBand {
                    start_point: r.start_point,
                    grip_factor: r.grip_factor,
                })
                .collect()
        };

        let sector = if track_file.sectors.is_empty() {
            vec![SectorBand { start_point: 0.0, sector: 1 }]
        } else {
            track_file
                .sectors
                .iter()
                .map(|r| SectorBand { start_point: r.start_point, sector: r.sector })
                .collect()
        };

        TrackData {
            metadata: TrackMetadata {
                name: track_file.name,
                country: track_file.country,
                city: track_file.city,
            },
            shape,
            elevation,
            banking,
            grip_factor,
            sector,
            configuration: track_file.configuration,
        }
    }
}
