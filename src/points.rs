use crate::competition::CompetitionResults;
use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Fastest-team times used to scale event scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionData {
    #[serde(default)]
    pub dataset: String,
    pub acceleration_t_min: f64,
    pub skidpad_t_min: f64,
    pub autocross_t_min: f64,
    pub endurance_t_min: f64,
}

impl Default for CompetitionData {
    fn default() -> Self {
        Self {
            dataset: "FSUK 2023".to_string(),
            acceleration_t_min: 3.5,
            skidpad_t_min: 4.7,
            autocross_t_min: 45.0,
            endurance_t_min: 1350.0,
        }
    }
}

impl CompetitionData {
    /// Load a named dataset from a JSON library file mapping dataset
    /// names to competition data.
    pub fn from_library<P: AsRef<Path>>(path: P, name: &str) -> SimResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let library: BTreeMap<String, CompetitionData> = serde_json::from_str(&content)
            .map_err(|e| SimError::parse(path.display().to_string(), e.to_string()))?;
        let mut data = library.get(name).cloned().ok_or_else(|| {
            SimError::InvalidVehicleConfig(format!(
                "competition dataset '{}' not found (available datasets: {:?})",
                name,
                library.keys().collect::<Vec<_>>()
            ))
        })?;
        data.dataset = name.to_string();
        Ok(data)
    }
}

/// Points scored in each dynamic event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompetitionPoints {
    pub acceleration: f64,
    pub skidpad: f64,
    pub autocross: f64,
    pub endurance: f64,
}

impl CompetitionPoints {
    pub fn total(&self) -> f64 {
        self.acceleration + self.skidpad + self.autocross + self.endurance
    }
}

/// Formula Student UK points formulas.
pub struct FsukPoints;

impl FsukPoints {
    pub fn acceleration_points(t_team: f64, t_min: f64) -> f64 {
        let t_min = t_min.min(t_team);
        let t_max = t_min * 1.5;
        5.0 + 65.0 * ((t_max / t_team) - 1.0) / ((t_max / t_min) - 1.0)
    }

    pub fn skidpad_points(t_team: f64, t_min: f64) -> f64 {
        let t_min = t_min.min(t_team);
        let t_max = t_min * 1.25;
        5.0 + 70.0 * ((t_max / t_team).powi(2) - 1.0) / ((t_max / t_min).powi(2) - 1.0)
    }

    pub fn autocross_points(t_team: f64, t_min: f64) -> f64 {
        let t_min = t_min.min(t_team);
        let t_max = t_min * 1.45;
        5.0 + 95.0 * ((t_max / t_team) - 1.0) / ((t_max / t_min) - 1.0)
    }

    pub fn endurance_points(t_team: f64, t_min: f64) -> f64 {
        let t_min = t_min.min(t_team);
        let t_max = t_min * 1.45;
        25.0 + 225.0 * ((t_max / t_team) - 1.0) / ((t_max / t_min) - 1.0)
    }
}

/// Score a simulated competition. The skidpad solution covers both laps
/// of the figure-of-eight, so its lap time is halved.
pub fn calculate_points(results: &CompetitionResults, data: &CompetitionData) -> CompetitionPoints {
    CompetitionPoints {
        acceleration: FsukPoints::acceleration_points(
            results.acceleration.total_time(),
            data.acceleration_t_min,
        ),
        skidpad: FsukPoints::skidpad_points(
            results.skidpad.total_time() / 2.0,
            data.skidpad_t_min,
        ),
        autocross: FsukPoints::autocross_points(
            results.autocross.total_time(),
            data.autocross_t_min,
        ),
        endurance: FsukPoints::endurance_points(
            results.endurance.total_time(),
            data.endurance_t_min,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_fastest_time_scores_maximum() {
        assert!((FsukPoints::acceleration_points(3.5, 3.5) - 70.0).abs() < 1e-9);
        assert!((FsukPoints::skidpad_points(4.7, 4.7) - 75.0).abs() < 1e-9);
        assert!((FsukPoints::autocross_points(45.0, 45.0) - 100.0).abs() < 1e-9);
        assert!((FsukPoints::endurance_points(1350.0, 1350.0) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_slower_time_scores_fewer_points() {
        let fast = FsukPoints::autocross_points(45.0, 45.0);
        let slow = FsukPoints::autocross_points(55.0, 45.0);
        assert!(slow < fast);
        assert!(slow >= 5.0);
    }

    #[test]
    fn test_team_faster_than_dataset_keeps_maximum() {
        // A team quicker than the recorded minimum caps the formula at
        // its own time.
        let points = FsukPoints::acceleration_points(3.0, 3.5);
        assert!((points - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_total() {
        let points = CompetitionPoints {
            acceleration: 70.0,
            skidpad: 75.0,
            autocross: 100.0,
            endurance: 250.0,
        };
        assert_eq!(points.total(), 495.0);
    }

    #[test]
    fn test_dataset_library_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.json");
        fs::write(
            &path,
            r#"{"FSUK 2023": {
                "acceleration_t_min": 3.6,
                "skidpad_t_min": 4.8,
                "autocross_t_min": 46.0,
                "endurance_t_min": 1400.0
            }}"#,
        )
        .unwrap();

        let data = CompetitionData::from_library(&path, "FSUK 2023").unwrap();
        assert_eq!(data.dataset, "FSUK 2023");
        assert_eq!(data.acceleration_t_min, 3.6);

        let missing = CompetitionData::from_library(&path, "FSG 2019");
        assert!(missing.is_err());
    }
}
