//! # Steering target projector
//!
//! Finds the point a given distance ahead of a position along the network, without moving the
//! position, and describes it relative to the position. Used to steer a vehicle towards a point on
//! its lane.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::Vector3;
use rand::Rng;
use serde::Serialize;

use road_net::RoadNetwork;

use crate::{
    geometry::{curvature_at_offset, speed_limit},
    mover::{advance, JunctionStrategy, MoveStatus},
    params::EngineParams,
    position::{track_to_world, Position, TrackPos},
    PosError,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Lower bound on the lane to reference line length ratio, reached near the centre of curvature
const MIN_LANE_SCALE: f64 = 1e-3;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Description of a steering target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SteeringTargetInfo {
    /// Target in world coordinates
    pub global_pos_m: Vector3<f64>,

    /// Target in the body frame of the position it was computed for
    pub local_pos_m: Vector3<f64>,

    /// Bearing of the target in the body frame, positive left
    pub angle_rad: f64,

    /// Curvature of the followed path at the target
    pub curvature_m: f64,

    pub road_heading_rad: f64,

    pub road_pitch_rad: f64,

    pub road_roll_rad: f64,

    pub speed_limit_ms: f64,

    /// Track pose of the target
    pub track: TrackPos,

    /// True if the network ended before the full look-ahead distance
    pub clamped: bool,
}

/// Track pose reached by a look-ahead.
#[derive(Debug, Clone, Copy)]
pub struct LookAhead {
    pub track: TrackPos,

    pub clamped: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the steering target `lookahead_m` metres ahead of `pos`.
///
/// With `along_reference_lane` the distance is measured along the reference line, otherwise along
/// the path of the position's lane at its current lateral offset. Positive distances look towards
/// increasing s. The target keeps the position's lane offset.
pub fn steering_target<R: Rng>(
    net: &RoadNetwork,
    pos: &Position,
    lookahead_m: f64,
    along_reference_lane: bool,
    strategy: JunctionStrategy,
    rng: &mut R,
    params: &EngineParams,
) -> Result<SteeringTargetInfo, PosError> {
    let track = pos.track_or_err()?;

    let ahead = look_ahead(
        net,
        track,
        lookahead_m,
        along_reference_lane,
        strategy,
        rng,
        params,
    )?;
    let eval = track_to_world(net, &ahead.track)?;

    let global_pos_m = eval.world.position_m;
    let local_pos_m = pos.world().to_local(&global_pos_m);

    let curvature_m = if along_reference_lane {
        eval.ref_point.curvature_m
    } else {
        curvature_at_offset(eval.ref_point.curvature_m, eval.track.t)
    };

    trace!(
        "Steering target {:.1} m ahead: road {} s = {:.3}, local ({:.3}, {:.3})",
        lookahead_m,
        eval.track.road_id,
        eval.track.s,
        local_pos_m.x,
        local_pos_m.y
    );

    Ok(SteeringTargetInfo {
        global_pos_m,
        local_pos_m,
        angle_rad: local_pos_m.y.atan2(local_pos_m.x),
        curvature_m,
        road_heading_rad: eval.ref_point.heading_rad,
        road_pitch_rad: eval.ref_point.pitch_rad,
        road_roll_rad: eval.ref_point.roll_rad,
        speed_limit_ms: speed_limit(net, eval.track.road_id, eval.track.s),
        track: eval.track,
        clamped: ahead.clamped,
    })
}

/// Find the track pose `distance_m` ahead of `track` without moving anything.
///
/// Along a lane the distance is converted to reference line arc-length in chunks of at most
/// `steering.lane_step_m`, scaling each chunk by the ratio of lane to reference line length at
/// its start. Road ends and junctions are handled exactly as by the mover, and
/// `mover.max_crossings` bounds the roads entered over the whole look-ahead, not per chunk.
pub fn look_ahead<R: Rng>(
    net: &RoadNetwork,
    track: &TrackPos,
    distance_m: f64,
    along_reference_lane: bool,
    strategy: JunctionStrategy,
    rng: &mut R,
    params: &EngineParams,
) -> Result<LookAhead, PosError> {
    let max_crossings = params.mover.max_crossings;

    if along_reference_lane {
        let adv = advance(net, track, distance_m, strategy, rng, max_crossings)?;

        return Ok(LookAhead {
            track: adv.track,
            clamped: ran_out(adv.status),
        });
    }

    let step_m = params.steering.lane_step_m.max(f64::EPSILON);

    let mut tp = *track;
    let mut direction = distance_m.signum();
    let mut remaining = distance_m.abs();
    let mut crossings_left = max_crossings;

    while remaining > 0.0 {
        let chunk = remaining.min(step_m);

        let road = net
            .road_by_id(tp.road_id)
            .ok_or(PosError::UnknownRoad(tp.road_id))?;
        let scale = (1.0 - road.ref_point(tp.s).curvature_m * tp.t).max(MIN_LANE_SCALE);

        let adv = advance(
            net,
            &tp,
            direction * chunk / scale,
            strategy,
            rng,
            crossings_left,
        )
        .map_err(|e| match e {
            PosError::SearchExhausted(_) => PosError::SearchExhausted(max_crossings),
            e => e,
        })?;
        tp = adv.track;
        crossings_left -= adv.crossings;

        if ran_out(adv.status) {
            return Ok(LookAhead {
                track: tp,
                clamped: true,
            });
        }

        // Keep travelling the same way through a road whose s runs backwards
        if adv.reversed {
            direction = -direction;
        }

        remaining -= chunk;
    }

    Ok(LookAhead {
        track: tp,
        clamped: false,
    })
}

fn ran_out(status: MoveStatus) -> bool {
    matches!(status, MoveStatus::OffRoad | MoveStatus::NoMovement)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
