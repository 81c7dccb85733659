//! # Coordinate conversions
//!
//! Total conversions between the track and world representations of a pose. Both are pure
//! functions of the network, so they can be run concurrently against a shared network.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};
use nalgebra::{Vector2, Vector3};

use road_net::{RefPoint, Road, RoadNetwork};
use util::maths::{wrap_2pi, wrap_pi};

use super::{TrackPos, WorldPose};
use crate::{params::ProjectionParams, PosError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Newton iterations stop once the foot point moves less than this
const NEWTON_TOL_M: f64 = 1e-9;

/// Lower bound on `1 - κ·d` in the Newton step, avoids blowing up near the centre of curvature
const MIN_NEWTON_DENOM: f64 = 1e-3;

/// Scores within this distance of each other are broken by heading
const SCORE_TIE_M: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Full evaluation of a track pose.
#[derive(Debug, Clone, Copy)]
pub struct TrackEval {
    /// The track pose, with `s` clamped into the road and `t` filled in
    pub track: TrackPos,

    pub world: WorldPose,

    /// Reference line at `track.s`
    pub ref_point: RefPoint,
}

/// Result of projecting a world point onto the network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub road_id: i32,

    pub lane_id: i32,

    pub s: f64,

    /// Lateral distance from the reference line, positive left
    pub t: f64,

    /// Lateral offset from the centre of `lane_id`
    pub offset: f64,

    /// Distance from the point to the road surface, 0 when the point lies on the road
    pub distance_m: f64,

    /// Reference line heading at `s`
    pub road_heading_rad: f64,
}

/// Score of a candidate foot point on one road.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    s: f64,
    t: f64,
    score: f64,
    heading_diff: f64,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the world pose of a track pose.
///
/// `s` is clamped into the road. The lateral position is the lane centre plus the lane offset,
/// and the relative angles are combined with the road's heading, pitch and roll at `s`.
pub fn track_to_world(net: &RoadNetwork, track: &TrackPos) -> Result<TrackEval, PosError> {
    let road = net
        .road_by_id(track.road_id)
        .ok_or(PosError::UnknownRoad(track.road_id))?;

    let s = road.clamp_s(track.s);

    let center_t = road
        .lane_center_t(s, track.lane_id)
        .ok_or(PosError::UnknownLane {
            road: track.road_id,
            lane: track.lane_id,
        })?;

    let t = center_t + track.offset;
    let ref_point = road.ref_point(s);

    let mut track = *track;
    track.s = s;
    track.t = t;
    track.h_rel = wrap_2pi(track.h_rel);

    let world = world_at(&ref_point, t, track.h_rel, track.p_rel, track.r_rel);

    trace!(
        "Track ({}, {}, {:.3}, {:.3}) -> world ({:.3}, {:.3}, {:.3})",
        track.road_id,
        track.lane_id,
        track.s,
        track.offset,
        world.position_m.x,
        world.position_m.y,
        world.position_m.z
    );

    Ok(TrackEval {
        track,
        world,
        ref_point,
    })
}

/// Project a world point onto the nearest road of the network.
///
/// Every road is sampled coarsely, the closest sample refined with Newton iterations on the
/// reference line, and the roads scored by how far the point lies outside their surface. The
/// vertical difference is part of the score when `z` is given, which separates roads crossing
/// over each other. Remaining ties are broken by the difference between `heading` and the road
/// heading, so overlapping roads in a junction resolve to the one being driven along.
pub fn world_to_track(
    net: &RoadNetwork,
    x: f64,
    y: f64,
    z: Option<f64>,
    heading: f64,
    params: &ProjectionParams,
) -> Result<Projection, PosError> {
    let point = Vector2::new(x, y);

    let mut best: Option<(&Road, Candidate)> = None;

    for road in net.roads() {
        let cand = project_on_road(road, &point, z, heading, params);

        let better = match best {
            None => true,
            Some((_, ref b)) => {
                if (cand.score - b.score).abs() <= SCORE_TIE_M {
                    cand.heading_diff < b.heading_diff
                } else {
                    cand.score < b.score
                }
            }
        };

        if better {
            best = Some((road, cand));
        }
    }

    let (road, cand) = match best {
        Some(b) if b.1.score <= params.max_dist_m => b,
        _ => {
            debug!("No road within {} m of ({:.3}, {:.3})", params.max_dist_m, x, y);
            return Err(PosError::ProjectionFailed { x, y });
        }
    };

    let (lane_id, offset) = road
        .lane_id_by_t(cand.s, cand.t)
        .ok_or(PosError::ProjectionFailed { x, y })?;

    debug!(
        "Projected ({:.3}, {:.3}) onto road {} lane {} at s = {:.3}, t = {:.3}",
        x, y, road.id, lane_id, cand.s, cand.t
    );

    Ok(Projection {
        road_id: road.id,
        lane_id,
        s: cand.s,
        t: cand.t,
        offset,
        distance_m: cand.score,
        road_heading_rad: road.ref_point(cand.s).heading_rad,
    })
}

/// World pose of the point at lateral distance `t` from a reference point.
pub(crate) fn world_at(
    ref_point: &RefPoint,
    t: f64,
    h_rel: f64,
    p_rel: f64,
    r_rel: f64,
) -> WorldPose {
    let normal = left_normal(ref_point.heading_rad);

    let position_m = Vector3::new(
        ref_point.position_m.x + t * normal.x,
        ref_point.position_m.y + t * normal.y,
        surface_z(ref_point, t),
    );

    // Driving against the road flips the sign of its pitch and roll
    let cos_h = h_rel.cos();

    WorldPose {
        position_m,
        heading_rad: wrap_2pi(ref_point.heading_rad + h_rel),
        pitch_rad: ref_point.pitch_rad * cos_h + p_rel,
        roll_rad: ref_point.roll_rad * cos_h + r_rel,
    }
}

/// Height of the road surface at lateral distance `t`, including superelevation.
pub(crate) fn surface_z(ref_point: &RefPoint, t: f64) -> f64 {
    ref_point.position_m.z + t * ref_point.roll_rad.tan()
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn left_normal(heading: f64) -> Vector2<f64> {
    Vector2::new(-heading.sin(), heading.cos())
}

fn tangent(heading: f64) -> Vector2<f64> {
    Vector2::new(heading.cos(), heading.sin())
}

fn project_on_road(
    road: &Road,
    point: &Vector2<f64>,
    z: Option<f64>,
    heading: f64,
    params: &ProjectionParams,
) -> Candidate {
    // ---- COARSE SAMPLING ----

    let num_samples = (road.length / params.sample_step_m.max(f64::EPSILON))
        .ceil()
        .max(1.0) as usize;

    let mut s = 0.0;
    let mut min_dist = f64::INFINITY;

    for i in 0..=num_samples {
        let s_i = road.length * i as f64 / num_samples as f64;
        let p = road.ref_point(s_i).position_m;
        let dist = (Vector2::new(p.x, p.y) - point).norm();

        if dist < min_dist {
            min_dist = dist;
            s = s_i;
        }
    }

    // ---- NEWTON REFINEMENT ----

    for _ in 0..params.newton_iters {
        let rp = road.ref_point(s);
        let d = point - rp.position_m.xy();

        let mut denom = 1.0 - rp.curvature_m * d.dot(&left_normal(rp.heading_rad));
        if denom < MIN_NEWTON_DENOM {
            denom = 1.0;
        }

        let s_next = road.clamp_s(s + d.dot(&tangent(rp.heading_rad)) / denom);
        let step = (s_next - s).abs();
        s = s_next;

        if step < NEWTON_TOL_M {
            break;
        }
    }

    // ---- SCORING ----

    let rp = road.ref_point(s);
    let d = point - rp.position_m.xy();

    // Non-zero only if the foot point is clamped to an end of the road
    let along = d.dot(&tangent(rp.heading_rad));
    let t = d.dot(&left_normal(rp.heading_rad));

    let (right, left) = road.lateral_extent(s);
    let lateral = if t > left {
        t - left
    } else if t < right {
        right - t
    } else {
        0.0
    };

    let vertical = z.map(|z| z - surface_z(&rp, t)).unwrap_or(0.0);

    // Driving either way along a road is equally valid
    let diff = wrap_pi(heading - rp.heading_rad).abs();
    let heading_diff = diff.min(std::f64::consts::PI - diff);

    Candidate {
        s,
        t,
        score: (along * along + lateral * lateral + vertical * vertical).sqrt(),
        heading_diff,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
