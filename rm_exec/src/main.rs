//! Road manager vehicle executable.
//!
//! Loads a road network, places a single vehicle position on it and drives the vehicle along the
//! network for a fixed number of steps. Each step the vehicle is moved, a steering target is taken
//! ahead of it, and both are archived to the session directory.
//!
//! Parameters are read from `params/rm_exec.toml` under the software root, any of the start
//! conditions can be overridden on the command line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::convert::TryFrom;
use structopt::StructOpt;

// Internal
use rm_lib::{params::RmExecParams, JunctionStrategy, MoveStatus, RoadManager};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
    time,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "rm_exec", about = "Drive a vehicle position along a road network")]
struct Args {
    /// Parameter file, relative to the params directory
    #[structopt(short, long, default_value = "rm_exec.toml")]
    params: String,

    /// Override the network description path
    #[structopt(short, long)]
    network: Option<String>,

    /// Override the number of steps
    #[structopt(long)]
    steps: Option<usize>,

    /// Override the junction strategy code (0 random, 1 straight, 2 first match)
    #[structopt(long)]
    strategy: Option<i32>,

    /// Override the random seed
    #[structopt(long)]
    seed: Option<u64>,

    /// Only log at info level and above
    #[structopt(short, long)]
    quiet: bool,
}

/// One archived step of the vehicle.
#[derive(Debug, Serialize)]
struct TraceRecord {
    step: usize,
    status: i32,
    road_id: i32,
    lane_id: i32,
    s_m: f64,
    offset_m: f64,
    x_m: f64,
    y_m: f64,
    z_m: f64,
    heading_rad: f64,
    target_x_m: f64,
    target_y_m: f64,
    target_local_x_m: f64,
    target_local_y_m: f64,
    target_angle_rad: f64,
    target_curvature_m: f64,
    speed_limit_ms: f64,
}

/// Summary saved at the end of the run.
#[derive(Debug, Serialize)]
struct RunSummary {
    network: String,
    steps_run: usize,
    roads_visited: Vec<i32>,
    distance_m: f64,
    final_status: Option<MoveStatus>,
    duration_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("rm_exec", "sessions").wrap_err("Failed to create the session")?;

    let level = if args.quiet {
        LevelFilter::Info
    } else {
        LevelFilter::Trace
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Road Manager Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let mut params: RmExecParams =
        util::params::load(&args.params).wrap_err("Could not load rm_exec params")?;

    if let Some(ref network) = args.network {
        params.network_path = network.clone();
    }
    if let Some(steps) = args.steps {
        params.num_steps = steps;
    }
    if let Some(strategy) = args.strategy {
        params.strategy = strategy;
    }
    if let Some(seed) = args.seed {
        params.engine.rng_seed = seed;
    }

    let strategy = JunctionStrategy::try_from(params.strategy)
        .wrap_err("Invalid junction strategy in the parameters")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE ROAD MANAGER ----

    let network_path = host::get_sw_root()
        .wrap_err("Failed to get the software root")?
        .join(&params.network_path);

    let mut manager = RoadManager::new(params.engine.clone());
    manager
        .load(&network_path)
        .wrap_err_with(|| format!("Failed to load the network from {:?}", network_path))?;

    let vehicle = manager.create();
    manager
        .set_lane_pos(
            vehicle,
            params.start_road_id,
            params.start_lane_id,
            params.start_s_m,
            params.start_offset_m,
        )
        .wrap_err("Could not place the vehicle at its start position")?;

    let mut archiver =
        Archiver::from_path(&session, "vehicle.csv").wrap_err("Failed to create the trace archive")?;

    info!(
        "Vehicle placed on road {} lane {} at s = {:.2} m\n",
        params.start_road_id, params.start_lane_id, params.start_s_m
    );

    // ---- MAIN LOOP ----

    let start_time = Utc::now();
    let mut roads_visited = vec![params.start_road_id];
    let mut distance_m = 0.0;
    let mut final_status = None;
    let mut steps_run = 0;

    for step in 0..params.num_steps {
        let status = manager
            .move_position(vehicle, params.step_length_m, strategy)
            .wrap_err_with(|| format!("Failed to move the vehicle at step {}", step))?;
        final_status = Some(status);
        steps_run = step + 1;

        let pos = manager.position(vehicle)?;
        let track = *pos.track().ok_or_else(|| eyre!("Vehicle lost its road"))?;
        let world = *pos.world();

        if status == MoveStatus::CrossedToNewRoad {
            info!("Step {}: entered road {}", step, track.road_id);
            roads_visited.push(track.road_id);
        }

        let target = manager
            .steering_target(vehicle, params.lookahead_m, false)
            .wrap_err("Failed to compute the steering target")?;

        if target.clamped {
            debug!("Step {}: steering target clamped at the network's end", step);
        }

        archiver
            .serialise(TraceRecord {
                step,
                status: status.code(),
                road_id: track.road_id,
                lane_id: track.lane_id,
                s_m: track.s,
                offset_m: track.offset,
                x_m: world.position_m.x,
                y_m: world.position_m.y,
                z_m: world.position_m.z,
                heading_rad: world.heading_rad,
                target_x_m: target.global_pos_m.x,
                target_y_m: target.global_pos_m.y,
                target_local_x_m: target.local_pos_m.x,
                target_local_y_m: target.local_pos_m.y,
                target_angle_rad: target.angle_rad,
                target_curvature_m: target.curvature_m,
                speed_limit_ms: target.speed_limit_ms,
            })
            .wrap_err("Failed to archive the vehicle state")?;

        match status {
            MoveStatus::Moved | MoveStatus::CrossedToNewRoad => {
                distance_m += params.step_length_m.abs()
            }
            MoveStatus::OffRoad | MoveStatus::NoMovement => {
                warn!(
                    "Step {}: vehicle stopped at road {} s = {:.2} m ({:?})",
                    step, track.road_id, track.s, status
                );
                break;
            }
        }
    }

    // ---- SHUTDOWN ----

    let summary = RunSummary {
        network: params.network_path.clone(),
        steps_run,
        roads_visited,
        distance_m,
        final_status,
        duration_s: time::duration_to_seconds(Utc::now() - start_time),
    };

    let summary_path = session
        .save_json("summary.json", &summary)
        .wrap_err("Failed to save the run summary")?;

    info!(
        "Vehicle ran {} steps over {:.1} m, summary saved to {:?}",
        summary.steps_run, summary.distance_m, summary_path
    );

    manager.close();

    Ok(())
}
