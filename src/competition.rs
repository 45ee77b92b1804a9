use crate::environment::Environment;
use crate::error::SimResult;
use crate::library::TrackLibrary;
use crate::mesh::MeshGenerator;
use crate::solution::Solution;
use crate::solver::SolverKind;
use crate::track_data::TrackData;
use crate::vehicle::Vehicle;
use crate::vehicle_model::create_model;
use tracing::info;

/// The track data for the four dynamic events. Endurance reuses the
/// autocross track, looped out to the endurance distance.
#[derive(Debug, Clone)]
pub struct EventTracks {
    pub acceleration: TrackData,
    pub skidpad: TrackData,
    pub autocross: TrackData,
}

impl EventTracks {
    /// Fixed event tracks from the library plus a user-supplied autocross
    /// track.
    pub fn from_library(library: &TrackLibrary, autocross: TrackData) -> SimResult<Self> {
        Ok(Self {
            acceleration: library.load_acceleration()?,
            skidpad: library.load_skidpad()?,
            autocross,
        })
    }
}

/// Everything needed to simulate a competition besides the vehicle.
#[derive(Debug, Clone)]
pub struct CompetitionSettings {
    pub tracks: EventTracks,
    pub environment: Environment,
    pub model_name: String,
    pub solver: SolverKind,
    pub resolution: f64,
}

impl CompetitionSettings {
    pub fn new(tracks: EventTracks) -> Self {
        Self {
            tracks,
            environment: Environment::default(),
            model_name: "point_mass".to_string(),
            solver: SolverKind::QuasiSteadyState,
            resolution: 1.0,
        }
    }
}

/// The solutions to the four dynamic events.
#[derive(Debug, Clone)]
pub struct CompetitionResults {
    pub acceleration: Solution,
    pub skidpad: Solution,
    pub autocross: Solution,
    pub endurance: Solution,
}

/// Simulate all four dynamic events with one vehicle.
pub fn simulate_competition(
    vehicle: &Vehicle,
    settings: &CompetitionSettings,
) -> SimResult<CompetitionResults> {
    let model = create_model(
        &settings.model_name,
        vehicle.clone(),
        settings.environment,
    )?;
    let generator = MeshGenerator::new(settings.resolution);

    info!("Simulating acceleration event");
    let acceleration_mesh = generator.generate_mesh(&settings.tracks.acceleration)?;
    let acceleration = settings.solver.solve(model.as_ref(), &acceleration_mesh)?;

    info!("Simulating skidpad event");
    let skidpad_mesh = generator.generate_mesh(&settings.tracks.skidpad)?;
    let skidpad = settings.solver.solve(model.as_ref(), &skidpad_mesh)?;

    info!("Simulating autocross event");
    let autocross_mesh = generator.generate_mesh(&settings.tracks.autocross)?;
    let autocross = settings.solver.solve(model.as_ref(), &autocross_mesh)?;

    info!("Simulating endurance event");
    let endurance_mesh = autocross_mesh.generate_endurance_mesh();
    let endurance = settings.solver.solve(model.as_ref(), &endurance_mesh)?;

    Ok(CompetitionResults {
        acceleration,
        skidpad,
        autocross,
        endurance,
    })
}
