use anyhow::{bail, Context};
use clap::Parser;
use lapsim::channels::get_channel;
use lapsim::competition::{simulate_competition, CompetitionSettings, EventTracks};
use lapsim::environment::Environment;
use lapsim::library::{load_track, ComponentLibraries, TrackLibrary};
use lapsim::mesh::MeshGenerator;
use lapsim::points::{calculate_points, CompetitionData};
use lapsim::solver::SolverKind;
use lapsim::vehicle_loader::VehicleLoader;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Formula Student lap-time simulator", long_about = None)]
struct Args {
    /// Path to the vehicle document (JSON)
    #[arg(short, long)]
    vehicle: PathBuf,

    /// Path to the track document (JSON or YAML)
    #[arg(short, long)]
    track: PathBuf,

    /// Path to simulator.toml configuration file
    #[arg(short, long, default_value = "./simulator.toml")]
    config: String,

    /// Solver to use (qss|transient)
    #[arg(short, long)]
    solver: Option<String>,

    /// Run the full four-event competition instead of a single lap
    #[arg(long)]
    competition: bool,

    /// Channels to print after solving, comma separated
    #[arg(long, value_delimiter = ',')]
    channels: Vec<String>,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct SimulatorConfig {
    #[serde(default)]
    library: LibraryConfig,
    #[serde(default)]
    simulation: SimulationConfig,
    #[serde(default)]
    environment: Environment,
}

#[derive(Debug, Clone, Deserialize)]
struct LibraryConfig {
    components_dir: String,
    tracks_dir: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            components_dir: "./library/components".to_string(),
            tracks_dir: "./library/tracks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SimulationConfig {
    solver: String,
    resolution: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            solver: "qss".to_string(),
            resolution: 1.0,
        }
    }
}

impl SimulatorConfig {
    fn load_or_default(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse {}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

fn parse_solver(name: &str) -> anyhow::Result<SolverKind> {
    match name {
        "qss" => Ok(SolverKind::QuasiSteadyState),
        "transient" => Ok(SolverKind::QuasiTransient),
        other => bail!("unknown solver '{}' (expected 'qss' or 'transient')", other),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = SimulatorConfig::load_or_default(&args.config);
    let solver_name = args
        .solver
        .unwrap_or_else(|| config.simulation.solver.clone());
    let solver = parse_solver(&solver_name)?;

    let libraries = ComponentLibraries::new(&config.library.components_dir);
    let vehicle = VehicleLoader::load_from_file(&args.vehicle, &libraries)
        .with_context(|| format!("loading vehicle {}", args.vehicle.display()))?;
    let top_speed = vehicle.maximum_velocity()?;
    info!(
        "Loaded vehicle '{}' ({:.1} kg, top speed {:.1} m/s)",
        vehicle.metadata.name,
        vehicle.total_mass(),
        top_speed
    );

    let track = load_track(&args.track)
        .with_context(|| format!("loading track {}", args.track.display()))?;
    info!(
        "Loaded track '{}' ({:.0} m)",
        track.metadata.display_name(),
        track.total_length()
    );

    if args.competition {
        let track_library = TrackLibrary::new(&config.library.tracks_dir);
        let tracks = EventTracks::from_library(&track_library, track)?;
        let mut settings = CompetitionSettings::new(tracks);
        settings.environment = config.environment;
        settings.solver = solver;
        settings.resolution = config.simulation.resolution;

        let results = simulate_competition(&vehicle, &settings)?;
        let points = calculate_points(&results, &CompetitionData::default());

        println!("Acceleration: {:8.3} s  {:6.1} pts", results.acceleration.total_time(), points.acceleration);
        println!("Skidpad:      {:8.3} s  {:6.1} pts", results.skidpad.total_time() / 2.0, points.skidpad);
        println!("Autocross:    {:8.3} s  {:6.1} pts", results.autocross.total_time(), points.autocross);
        println!("Endurance:    {:8.3} s  {:6.1} pts", results.endurance.total_time(), points.endurance);
        println!("Total points: {:.1}", points.total());
        return Ok(());
    }

    let mesh = MeshGenerator::new(config.simulation.resolution)
        .generate_mesh(&track)
        .context("generating track mesh")?;
    info!("Mesh: {} nodes at {:.2} m", mesh.node_count(), mesh.resolution());

    let model = lapsim::vehicle_model::create_model(
        "point_mass",
        vehicle,
        config.environment,
    )?;
    let solution = solver.solve(model.as_ref(), &mesh)?;

    println!("Lap time:         {:.3} s", solution.total_time());
    println!("Average velocity: {:.2} m/s", solution.average_velocity());
    println!("Apexes:           {}", solution.apexes().len());

    for name in &args.channels {
        let channel = get_channel(name)?;
        let values = channel.values(&solution);
        let minimum = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let maximum = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        println!(
            "{:28} min {:10.3}  max {:10.3}",
            channel.label(),
            minimum,
            maximum
        );
    }

    Ok(())
}
