//! # Geometry queries
//!
//! Road and lane properties at a point of the network. "No lane here" is an ordinary outcome for
//! these queries, so they return zero (or `None`) rather than an error when the point is outside a
//! lane.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use rand::Rng;
use serde::Serialize;

use road_net::RoadNetwork;
use util::maths::SMALL_NUMBER;

use crate::{
    mover::JunctionStrategy,
    params::EngineParams,
    position::{track_to_world, Position},
    steering, PosError,
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Road and lane properties at a look-ahead point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoadLaneInfo {
    pub position_m: Vector3<f64>,

    /// Heading of the road at the point
    pub heading_rad: f64,

    pub pitch_rad: f64,

    pub roll_rad: f64,

    pub width_m: f64,

    /// Curvature of the path at the point's lateral position
    pub curvature_m: f64,

    pub speed_limit_ms: f64,

    /// True if the look-ahead ran out of network
    pub clamped: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Width of a lane at `s`, 0 if the road or lane does not exist there.
pub fn lane_width(net: &RoadNetwork, road_id: i32, s: f64, lane_id: i32) -> f64 {
    net.road_by_id(road_id)
        .map(|r| r.lane_width_by_s(s, lane_id))
        .unwrap_or(0.0)
}

/// Speed limit at `s` in m/s, 0 if the road is unknown or has no speed records.
pub fn speed_limit(net: &RoadNetwork, road_id: i32, s: f64) -> f64 {
    net.road_by_id(road_id)
        .map(|r| r.speed_by_s(s))
        .unwrap_or(0.0)
}

/// Curvature of a path running parallel to the reference line at lateral distance `t`.
///
/// Curvature is positive for left turns and `t` positive left, so paths on the inside of a bend
/// are tighter. A path through the centre of curvature has no defined curvature and gives 0.
pub fn curvature_at_offset(ref_curvature: f64, t: f64) -> f64 {
    if ref_curvature.abs() <= SMALL_NUMBER {
        return ref_curvature;
    }

    let radius = 1.0 / ref_curvature - t;

    if radius.abs() <= SMALL_NUMBER {
        0.0
    } else {
        1.0 / radius
    }
}

/// Curvature of the path followed by a position, corrected for its lateral offset.
pub fn position_curvature(pos: &Position) -> f64 {
    match pos.track() {
        Some(track) => curvature_at_offset(pos.curvature(), track.t),
        None => 0.0,
    }
}

/// Width of the lane a position is in, 0 if it has not been placed.
pub fn position_lane_width(net: &RoadNetwork, pos: &Position) -> f64 {
    match pos.track() {
        Some(t) => lane_width(net, t.road_id, t.s, t.lane_id),
        None => 0.0,
    }
}

/// Speed limit where a position is, 0 if it has not been placed.
pub fn position_speed_limit(net: &RoadNetwork, pos: &Position) -> f64 {
    match pos.track() {
        Some(t) => speed_limit(net, t.road_id, t.s),
        None => 0.0,
    }
}

/// Number of drivable lanes at `s`, 0 if the road is unknown.
pub fn num_drivable_lanes(net: &RoadNetwork, road_id: i32, s: f64) -> usize {
    net.road_by_id(road_id)
        .map(|r| r.drivable_lane_ids(s).len())
        .unwrap_or(0)
}

/// Id of the `index`th drivable lane at `s`, counting up from the rightmost lane.
pub fn drivable_lane_id_by_index(
    net: &RoadNetwork,
    road_id: i32,
    index: usize,
    s: f64,
) -> Option<i32> {
    net.road_by_id(road_id)?
        .drivable_lane_ids(s)
        .get(index)
        .copied()
}

/// Road and lane properties `lookahead_m` metres along the current lane of a position.
pub fn road_lane_info<R: Rng>(
    net: &RoadNetwork,
    pos: &Position,
    lookahead_m: f64,
    strategy: JunctionStrategy,
    rng: &mut R,
    params: &EngineParams,
) -> Result<RoadLaneInfo, PosError> {
    let track = pos.track_or_err()?;

    let ahead = steering::look_ahead(net, track, lookahead_m, false, strategy, rng, params)?;
    let eval = track_to_world(net, &ahead.track)?;
    let target = &eval.track;

    Ok(RoadLaneInfo {
        position_m: eval.world.position_m,
        heading_rad: eval.ref_point.heading_rad,
        pitch_rad: eval.ref_point.pitch_rad,
        roll_rad: eval.ref_point.roll_rad,
        width_m: lane_width(net, target.road_id, target.s, target.lane_id),
        curvature_m: curvature_at_offset(eval.ref_point.curvature_m, target.t),
        speed_limit_ms: speed_limit(net, target.road_id, target.s),
        clamped: ahead.clamped,
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::mover::test_networks::{t_junction, two_roads, TURN_RADIUS_M};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use road_net::{builder::RoadBuilder, Lane, LaneKind, NetworkDescription};

    #[test]
    fn test_lane_width_and_speed() {
        let net = two_roads();

        assert_eq!(lane_width(&net, 1, 50.0, -1), 3.5);
        assert_eq!(lane_width(&net, 1, 50.0, 0), 0.0);
        assert_eq!(lane_width(&net, 1, 50.0, 2), 0.0);
        assert_eq!(lane_width(&net, 1, 150.0, -1), 0.0);
        assert_eq!(lane_width(&net, 9, 50.0, -1), 0.0);

        assert_eq!(speed_limit(&net, 1, 50.0), 20.0);
        assert_eq!(speed_limit(&net, 2, 10.0), 10.0);
        assert_eq!(speed_limit(&net, 9, 10.0), 0.0);
    }

    #[test]
    fn test_curvature_at_offset() {
        // Straight roads are straight in every lane
        assert_eq!(curvature_at_offset(0.0, 5.0), 0.0);

        let k = 0.05;
        assert_eq!(curvature_at_offset(k, 0.0), k);
        assert!((curvature_at_offset(k, 10.0) - 0.1).abs() < 1e-12);

        // At the centre of curvature
        assert_eq!(curvature_at_offset(k, 20.0), 0.0);
    }

    #[test]
    fn test_curvature_monotonic_in_offset() {
        for &k in [0.001, 0.01, 0.05, 0.2].iter() {
            let r = 1.0 / k;
            let mut prev = curvature_at_offset(k, -0.99 * r);

            for i in -98..99 {
                let t = 0.01 * i as f64 * r;
                let c = curvature_at_offset(k, t);

                assert!(c > prev, "k = {}, t = {}", k, t);
                if t > 0.0 {
                    assert!(c > k);
                } else if t < 0.0 {
                    assert!(c < k);
                    assert!(c > 0.0);
                }

                prev = c;
            }

            // Far to the outside of the bend the path straightens out
            assert!(curvature_at_offset(k, -1e6 * r) < 1e-6 * k);
        }
    }

    #[test]
    fn test_drivable_lanes() {
        let road = RoadBuilder::new(1)
            .line(50.0)
            .lanes(vec![
                Lane::driving(-2, 3.5),
                Lane::new(-1, LaneKind::Shoulder, 1.0),
                Lane::driving(1, 3.5),
            ])
            .build();
        let net = RoadNetwork::new(NetworkDescription {
            name: "lanes".into(),
            roads: vec![road],
            junctions: vec![],
        })
        .unwrap();

        assert_eq!(num_drivable_lanes(&net, 1, 10.0), 2);
        assert_eq!(drivable_lane_id_by_index(&net, 1, 0, 10.0), Some(-2));
        assert_eq!(drivable_lane_id_by_index(&net, 1, 1, 10.0), Some(1));
        assert_eq!(drivable_lane_id_by_index(&net, 1, 2, 10.0), None);

        assert_eq!(num_drivable_lanes(&net, 5, 10.0), 0);
        assert_eq!(drivable_lane_id_by_index(&net, 5, 0, 10.0), None);
    }

    #[test]
    fn test_position_queries() {
        let net = two_roads();
        let mut pos = Position::new();

        assert_eq!(position_lane_width(&net, &pos), 0.0);
        assert_eq!(position_speed_limit(&net, &pos), 0.0);
        assert_eq!(position_curvature(&pos), 0.0);

        pos.set_lane_pos(&net, 2, -1, 10.0, 0.0).unwrap();
        assert_eq!(position_lane_width(&net, &pos), 3.5);
        assert_eq!(position_speed_limit(&net, &pos), 10.0);
        assert_eq!(position_curvature(&pos), 0.0);
    }

    #[test]
    fn test_road_lane_info() {
        let net = t_junction();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = Position::new();
        pos.set_lane_pos(&net, 1, -1, 95.0, 0.0).unwrap();

        // 10 m ahead with the left turn, 5 m into connecting road 10
        let info = road_lane_info(
            &net,
            &pos,
            10.0,
            JunctionStrategy::FirstMatch,
            &mut rng,
            &EngineParams::default(),
        )
        .unwrap();

        let k = 1.0 / TURN_RADIUS_M;
        assert!(!info.clamped);
        assert_eq!(info.width_m, 3.5);
        assert!((info.curvature_m - curvature_at_offset(k, -1.75)).abs() < 1e-9);
        assert!(info.curvature_m < k);
        assert!(info.heading_rad > 0.0);
    }
}
