//! camwalk CLI
//!
//! Plan a camera trajectory for a scene file, or run the built-in scenarios.

use camwalk_core::{PlanError, PlannerConfig, Trajectory};
use camwalk_env::VoxelState;
use camwalk_sim::scenarios::ScenarioId;
use camwalk_sim::{ScenarioResult, ScenarioRunner, SceneInput, TrajectoryExport};
use clap::Parser;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "camwalk")]
#[command(about = "Informative camera random-walk trajectory planner", long_about = None)]
struct Args {
    /// Scene description (JSON) to plan a trajectory for
    #[arg(long, conflicts_with = "scenario")]
    scene: Option<String>,

    /// Built-in scenario to run (cube_face, open_sky, free_box, all)
    #[arg(short = 'S', long)]
    scenario: Option<String>,

    /// Planner config (JSON); overrides any config stored in the scene
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for the planner's random source
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Number of poses to plan
    #[arg(short, long)]
    length: Option<usize>,

    /// Write the planned trajectory to this JSON file
    #[arg(short, long)]
    output: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON summary on stdout
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let ok = match &args.scene {
        Some(path) => run_scene(&args, path),
        None => run_scenarios(&args),
    };

    if !ok {
        process::exit(1);
    }
}

/// Plans one scene file. Nothing is written unless planning succeeds.
fn run_scene(args: &Args, path: &str) -> bool {
    info!("camwalk v{}", env!("CARGO_PKG_VERSION"));

    let input = match SceneInput::from_json_file(path) {
        Ok(input) => input,
        Err(e) => {
            error!("{}", e);
            return false;
        }
    };

    let config = match load_config(args, input.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return false;
        }
    };

    let scene = match input.build(config.voxel_size) {
        Ok(scene) => scene,
        Err(e) => {
            error!("{}", e);
            return false;
        }
    };

    info!(
        "Scene: {} triangles, {} rays, grid {:?} ({} free / {} occupied voxels)",
        scene.mesh.len(),
        scene.rays.len(),
        scene.grid.dims(),
        scene.grid.count(VoxelState::Free),
        scene.grid.count(VoxelState::Occupied)
    );

    let trajectory = match scene.plan(config, args.seed) {
        Ok(trajectory) => trajectory,
        Err(e) => {
            error!("Planning failed: {}", e);
            print_summary(args, None, Some(&e));
            return false;
        }
    };

    info!("Planned {} poses (seed={})", trajectory.len(), args.seed);
    print_summary(args, Some(&trajectory), None);

    match &args.output {
        Some(output) => write_export(args.seed, &trajectory, output),
        None => true,
    }
}

/// Runs the built-in scenarios and reports pass/fail.
fn run_scenarios(args: &Args) -> bool {
    let name = args.scenario.as_deref().unwrap_or("all");
    let scenarios: Vec<ScenarioId> = if name == "all" {
        ScenarioId::all()
    } else {
        match name.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: cube_face, open_sky, free_box, all");
                return false;
            }
        }
    };

    if args.output.is_some() && scenarios.len() > 1 {
        eprintln!("Error: --output only supports a single scenario, not 'all'");
        return false;
    }

    let mut runner = ScenarioRunner::new(args.seed);
    if let Some(length) = args.length {
        runner = runner.with_trajectory_length(length);
    }

    let results: Vec<ScenarioResult> = scenarios.iter().map(|s| runner.run(*s)).collect();
    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed,
            "failed": failed,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "poses": r.poses,
                    "error": r.error,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
    } else {
        for r in &results {
            if r.passed {
                info!("✓ {} (seed={}) PASSED", r.scenario.name(), r.seed);
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    r.scenario.name(),
                    r.seed,
                    r.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
        if failed == 0 {
            info!("All {} scenario runs passed", results.len());
        } else {
            error!("{}/{} scenario runs failed", failed, results.len());
        }
    }

    let mut ok = failed == 0;
    if let (Some(output), Some(result)) = (&args.output, results.first()) {
        if let Some(trajectory) = &result.trajectory {
            ok &= write_export(args.seed, trajectory, output);
        }
    }
    ok
}

/// Config precedence: --config file, then the scene's own config, then
/// defaults. --length overrides the trajectory length.
fn load_config(args: &Args, from_scene: Option<PlannerConfig>) -> Result<PlannerConfig, PlanError> {
    let mut config = match &args.config {
        Some(path) => PlannerConfig::from_json_file(path)?,
        None => from_scene.unwrap_or_default(),
    };
    if let Some(length) = args.length {
        config = config.with_trajectory_length(length);
    }
    config.validate()?;
    Ok(config)
}

fn write_export(seed: u64, trajectory: &Trajectory, path: &str) -> bool {
    match TrajectoryExport::new(seed, trajectory).write_to_file(path) {
        Ok(()) => {
            info!("Wrote {} poses to {}", trajectory.len(), path);
            true
        }
        Err(e) => {
            error!("Cannot write {}: {}", path, e);
            false
        }
    }
}

fn print_summary(args: &Args, trajectory: Option<&Trajectory>, error: Option<&PlanError>) {
    if !args.json {
        return;
    }
    let summary = serde_json::json!({
        "seed": args.seed,
        "success": trajectory.is_some(),
        "poses": trajectory.map_or(0, |t| t.len()),
        "error": error.map(|e| e.to_string()),
        "unobservable": error.map_or(false, |e| e.is_unobservable()),
        "no_traversable_space": error.map_or(false, |e| e.is_no_traversable_space()),
    });
    println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
}
