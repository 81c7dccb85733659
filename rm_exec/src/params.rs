//! # Road Manager Parameters
//!
//! Tuning of the engine's numerical searches, plus the parameters of the vehicle executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::mover::JunctionStrategy;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the position engine.
///
/// Every field has a default so a parameter file only needs to list what it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub projection: ProjectionParams,

    pub mover: MoverParams,

    pub steering: SteeringParams,

    pub delta: DeltaParams,

    /// Seed of the random number generator used by the random junction strategy
    pub rng_seed: u64,
}

/// World to track projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    /// Spacing of the coarse samples taken along each reference line
    pub sample_step_m: f64,

    /// Points further than this from every road fail to project
    pub max_dist_m: f64,

    /// Maximum number of Newton iterations refining the foot point
    pub newton_iters: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoverParams {
    /// Maximum number of road crossings in a single move
    pub max_crossings: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringParams {
    /// Maximum chunk length when converting lane distance into reference line arc-length
    pub lane_step_m: f64,

    /// Junction strategy used for look-ahead queries which do not name one
    pub strategy: JunctionStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaParams {
    /// Maximum number of road hops explored when relating positions on different roads
    pub max_hops: usize,
}

/// Parameters of the vehicle executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmExecParams {
    /// Path to the road network description, relative to the software root
    pub network_path: String,

    /// Road the vehicle starts on
    pub start_road_id: i32,

    /// Lane the vehicle starts in
    pub start_lane_id: i32,

    /// Arc-length the vehicle starts at
    pub start_s_m: f64,

    /// Lateral offset from the start lane's centre
    #[serde(default)]
    pub start_offset_m: f64,

    /// Distance moved each step
    pub step_length_m: f64,

    /// Number of steps to run
    pub num_steps: usize,

    /// Look-ahead distance of the steering target
    pub lookahead_m: f64,

    /// Junction strategy code, see [`JunctionStrategy`]
    pub strategy: i32,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            sample_step_m: 1.0,
            max_dist_m: 50.0,
            newton_iters: 12,
        }
    }
}

impl Default for MoverParams {
    fn default() -> Self {
        Self { max_crossings: 32 }
    }
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            lane_step_m: 1.0,
            strategy: JunctionStrategy::Straight,
        }
    }
}

impl Default for DeltaParams {
    fn default() -> Self {
        Self { max_hops: 16 }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
