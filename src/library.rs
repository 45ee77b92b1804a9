use crate::error::{SimError, SimResult};
use crate::track_data::{TrackData, TrackLoader};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Library file names, one JSON file per component kind.
pub const CELLS_LIBRARY: &str = "cells.json";
pub const MOTORS_LIBRARY: &str = "motors.json";
pub const MOTOR_CONTROLLERS_LIBRARY: &str = "motor_controllers.json";
pub const MASTER_CYLINDERS_LIBRARY: &str = "master_cylinders.json";
pub const BRAKE_CALIPERS_LIBRARY: &str = "brake_calipers.json";
pub const BRAKE_DISCS_LIBRARY: &str = "brake_discs.json";
pub const BRAKE_PADS_LIBRARY: &str = "brake_pads.json";
pub const DRIVERS_LIBRARY: &str = "drivers.json";
pub const TYRES_LIBRARY: &str = "tyres.json";

/// A component given inline as an object or referenced by name.
///
/// A bare string in the vehicle document is resolved against the
/// corresponding component library file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentRef<T> {
    Inline(T),
    Name(String),
}

/// Access to the per-kind component library files under one directory.
#[derive(Debug, Clone)]
pub struct ComponentLibraries {
    root: PathBuf,
}

impl ComponentLibraries {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn load_library(&self, library_file: &str) -> SimResult<BTreeMap<String, Value>> {
        let path = self.root.join(library_file);
        let content = fs::read_to_string(&path).map_err(|e| {
            SimError::InvalidVehicleConfig(format!(
                "unable to read component library '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| SimError::parse(path.display().to_string(), e.to_string()))
    }

    pub fn list_components(&self, library_file: &str) -> SimResult<Vec<String>> {
        Ok(self.load_library(library_file)?.keys().cloned().collect())
    }

    /// Select a component from a library by name. The component's name is
    /// injected into the returned object.
    pub fn get_component<T: DeserializeOwned>(
        &self,
        library_file: &str,
        name: &str,
    ) -> SimResult<T> {
        let library = self.load_library(library_file)?;
        let mut component = library.get(name).cloned().ok_or_else(|| {
            SimError::InvalidVehicleConfig(format!(
                "component '{}' not found in library '{}' (available components: {:?})",
                name,
                library_file,
                library.keys().collect::<Vec<_>>()
            ))
        })?;

        if let Value::Object(ref mut map) = component {
            map.entry("name".to_string())
                .or_insert_with(|| Value::String(name.to_string()));
        }

        serde_json::from_value(component).map_err(|e| {
            SimError::InvalidVehicleConfig(format!(
                "component '{}' in library '{}' is malformed: {}",
                name, library_file, e
            ))
        })
    }

    /// Expand an inline-or-name reference into a concrete component.
    pub fn resolve<T: DeserializeOwned>(
        &self,
        library_file: &str,
        reference: ComponentRef<T>,
    ) -> SimResult<T> {
        match reference {
            ComponentRef::Inline(component) => Ok(component),
            ComponentRef::Name(name) => self.get_component(library_file, &name),
        }
    }
}

/// A directory of track documents, addressed by file stem.
#[derive(Debug, Clone)]
pub struct TrackLibrary {
    root: PathBuf,
}

/// File stems of the fixed event tracks in the library.
pub const ACCELERATION_TRACK: &str = "Acceleration";
pub const SKIDPAD_TRACK: &str = "Skidpad";

impl TrackLibrary {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn find(&self, name: &str) -> SimResult<PathBuf> {
        for extension in ["yaml", "yml", "json"] {
            let candidate = self.root.join(format!("{}.{}", name, extension));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(SimError::InvalidTrackData(format!(
            "track '{}' not found in library '{}' (available tracks: {:?})",
            name,
            self.root.display(),
            self.list_tracks()
        )))
    }

    pub fn list_tracks(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                let extension = path.extension().and_then(|s| s.to_str());
                if matches!(extension, Some("yaml") | Some("yml") | Some("json")) {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
        }
        names.sort();
        names
    }

    pub fn load(&self, name: &str) -> SimResult<TrackData> {
        TrackLoader::load_from_file(self.find(name)?)
    }

    pub fn load_acceleration(&self) -> SimResult<TrackData> {
        self.load(ACCELERATION_TRACK)
    }

    pub fn load_skidpad(&self) -> SimResult<TrackData> {
        self.load(SKIDPAD_TRACK)
    }
}

/// Load a track document from an explicit path.
pub fn load_track<P: AsRef<Path>>(path: P) -> SimResult<TrackData> {
    TrackLoader::load_from_file(path)
}
