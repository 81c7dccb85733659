//! # Longitudinal mover
//!
//! Moves positions along the reference lines of the network. Moves running off the end of a road
//! follow the road's links: a direct road link continues onto the linked road, a junction offers
//! several connecting roads and a [`JunctionStrategy`] picks one.
//!
//! Positions which run out of network are clamped to the last valid road end and flagged with
//! [`MoveStatus::OffRoad`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod junction;

#[cfg(test)]
pub(crate) mod test_networks;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::PI;

use log::{debug, trace};
use rand::Rng;
use serde::Serialize;

use road_net::{ContactPoint, Road, RoadNetwork};
use util::maths::wrap_2pi;

use crate::{
    params::MoverParams,
    position::{Position, TrackPos},
    PosError,
};
pub use junction::JunctionStrategy;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Distance a position is held back from a lane section boundary its lane does not cross
const SECTION_STOP_M: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Outcome of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoveStatus {
    /// Moved within the starting road
    Moved,

    /// Moved onto at least one other road
    CrossedToNewRoad,

    /// Ran out of network, the position is clamped to the last valid point
    OffRoad,

    /// Already at a road end with nowhere to go
    NoMovement,
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Result of [`advance`].
#[derive(Debug, Clone, Copy)]
pub struct Advance {
    /// Track pose reached, with `t` updated
    pub track: TrackPos,

    pub status: MoveStatus,

    /// True if the reached road's s-direction opposes the starting road's
    pub reversed: bool,

    /// Number of roads entered
    pub crossings: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl MoveStatus {
    /// Integer code of the status on the manager surface.
    pub fn code(&self) -> i32 {
        match self {
            MoveStatus::Moved => 0,
            MoveStatus::CrossedToNewRoad => 1,
            MoveStatus::OffRoad => 2,
            MoveStatus::NoMovement => 3,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Move a position `ds` metres along the reference line of its road.
///
/// Positive `ds` moves towards increasing s on the current road. The lane offset and relative
/// angles carry over, and the world pose is recomputed. The position is untouched on error.
pub fn move_along_s<R: Rng>(
    net: &RoadNetwork,
    pos: &mut Position,
    ds: f64,
    strategy: JunctionStrategy,
    rng: &mut R,
    params: &MoverParams,
) -> Result<MoveStatus, PosError> {
    let track = *pos.track_or_err()?;

    let adv = advance(net, &track, ds, strategy, rng, params.max_crossings)?;
    pos.set_track_pos(net, &adv.track)?;

    Ok(adv.status)
}

/// Compute the track pose `ds` metres along the reference line from `track`.
///
/// This is the read-only core of [`move_along_s`], also used by look-ahead queries.
pub fn advance<R: Rng>(
    net: &RoadNetwork,
    track: &TrackPos,
    ds: f64,
    strategy: JunctionStrategy,
    rng: &mut R,
    max_crossings: usize,
) -> Result<Advance, PosError> {
    let mut road = net
        .road_by_id(track.road_id)
        .ok_or(PosError::UnknownRoad(track.road_id))?;

    let mut tp = *track;
    tp.s = road.clamp_s(tp.s);

    if road.lane_by_s(tp.s, tp.lane_id).is_none() {
        return Err(PosError::UnknownLane {
            road: tp.road_id,
            lane: tp.lane_id,
        });
    }

    let start_s = tp.s;
    let mut remaining = ds;
    let mut crossings = 0;
    let mut reversed = false;

    let status = loop {
        if remaining == 0.0 {
            break moved_status(crossings);
        }

        let target = tp.s + remaining;

        // Landing exactly on an end still hands over to the next road if there is one
        let inside = if remaining > 0.0 {
            target < road.length
        } else {
            target > 0.0
        };

        if inside {
            match follow_sections(road, tp.s, target, tp.lane_id) {
                Ok(lane_id) => {
                    tp.lane_id = lane_id;
                    tp.s = target;
                    break moved_status(crossings);
                }
                Err((s, lane_id)) => {
                    tp.s = s;
                    tp.lane_id = lane_id;
                    break MoveStatus::OffRoad;
                }
            }
        }

        // ---- ROAD END ----

        let direction = remaining.signum();
        let end = ContactPoint::exit_for_direction(direction);
        let end_s = road.s_at(end);

        match follow_sections(road, tp.s, end_s, tp.lane_id) {
            Ok(lane_id) => tp.lane_id = lane_id,
            Err((s, lane_id)) => {
                tp.s = s;
                tp.lane_id = lane_id;
                break MoveStatus::OffRoad;
            }
        }

        let overshoot = (target - end_s).abs();
        let moved = crossings > 0 || (tp.s - start_s).abs() > 0.0 || overshoot == 0.0;
        tp.s = end_s;

        let heading = travel_heading(road, end_s, direction);
        let cands = junction::candidates(net, road, end, tp.lane_id);

        let next = match strategy.select(heading, &cands, rng) {
            Some(i) => cands[i],
            None => {
                debug!("Road {} has no continuation at {:?}", road.id, end);
                break if !moved {
                    MoveStatus::NoMovement
                } else if overshoot > 0.0 {
                    MoveStatus::OffRoad
                } else {
                    moved_status(crossings)
                };
            }
        };

        if crossings >= max_crossings {
            return Err(PosError::SearchExhausted(max_crossings));
        }
        crossings += 1;

        // Entering at the end of the next road reverses the frame
        if next.contact == end {
            tp.offset = -tp.offset;
            tp.h_rel = wrap_2pi(tp.h_rel + PI);
            reversed = !reversed;
        }

        trace!(
            "Crossing from road {} lane {} onto road {} lane {} at {:?}",
            tp.road_id,
            tp.lane_id,
            next.road.id,
            next.lane_id,
            next.contact
        );

        tp.road_id = next.road.id;
        tp.lane_id = next.lane_id;
        tp.s = next.road.s_at(next.contact);
        remaining = next.contact.entry_direction() * overshoot;
        road = next.road;
    };

    tp.t = road
        .lane_center_t(tp.s, tp.lane_id)
        .ok_or(PosError::UnknownLane {
            road: tp.road_id,
            lane: tp.lane_id,
        })?
        + tp.offset;

    Ok(Advance {
        track: tp,
        status,
        reversed,
        crossings,
    })
}

fn moved_status(crossings: usize) -> MoveStatus {
    if crossings > 0 {
        MoveStatus::CrossedToNewRoad
    } else {
        MoveStatus::Moved
    }
}

/// Heading of travel at `s` when moving in `direction` along the road.
fn travel_heading(road: &Road, s: f64, direction: f64) -> f64 {
    let heading = road.ref_point(s).heading_rad;

    if direction < 0.0 {
        wrap_2pi(heading + PI)
    } else {
        heading
    }
}

/// Carry a lane across the lane sections passed when moving from `from_s` to `to_s`.
///
/// If the lane has no continuation into a section, returns the furthest arc-length reached in the
/// lane and its id there.
fn follow_sections(road: &Road, from_s: f64, to_s: f64, lane_id: i32) -> Result<i32, (f64, i32)> {
    let from_idx = road.lane_section_idx_by_s(from_s);
    let to_idx = road.lane_section_idx_by_s(to_s);
    let sections = &road.lane_sections;

    let mut lane_id = lane_id;

    if to_idx > from_idx {
        for idx in from_idx..to_idx {
            let link = sections[idx]
                .lane_by_id(lane_id)
                .and_then(|l| l.link.successor);
            let next = &sections[idx + 1];

            match next.lane_by_id(link.unwrap_or(lane_id)) {
                Some(l) => lane_id = l.id,
                None => return Err(((next.s - SECTION_STOP_M).max(sections[idx].s), lane_id)),
            }
        }
    } else if to_idx < from_idx {
        for idx in ((to_idx + 1)..=from_idx).rev() {
            let link = sections[idx]
                .lane_by_id(lane_id)
                .and_then(|l| l.link.predecessor);

            match sections[idx - 1].lane_by_id(link.unwrap_or(lane_id)) {
                Some(l) => lane_id = l.id,
                None => return Err((sections[idx].s, lane_id)),
            }
        }
    }

    Ok(lane_id)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::mover::test_networks::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    const STRATEGIES: [JunctionStrategy; 3] = [
        JunctionStrategy::Random,
        JunctionStrategy::Straight,
        JunctionStrategy::FirstMatch,
    ];

    fn placed(net: &RoadNetwork, road: i32, lane: i32, s: f64, offset: f64) -> Position {
        let mut pos = Position::new();
        pos.set_lane_pos(net, road, lane, s, offset).unwrap();
        pos
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(MoveStatus::Moved.code(), 0);
        assert_eq!(MoveStatus::CrossedToNewRoad.code(), 1);
        assert_eq!(MoveStatus::OffRoad.code(), 2);
        assert_eq!(MoveStatus::NoMovement.code(), 3);
    }

    #[test]
    fn test_move_within_road() {
        let net = two_roads();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = placed(&net, 1, -1, 10.0, 0.3);

        let status = move_along_s(
            &net,
            &mut pos,
            25.0,
            JunctionStrategy::Straight,
            &mut rng,
            &MoverParams::default(),
        )
        .unwrap();

        let track = pos.track().unwrap();
        assert_eq!(status, MoveStatus::Moved);
        assert_eq!(track.road_id, 1);
        assert_eq!(track.s, 35.0);
        assert_eq!(track.offset, 0.3);
        assert!((pos.world().position_m.x - 35.0).abs() < 1e-12);
    }

    #[test]
    fn test_move_onto_linked_road() {
        let net = two_roads();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = placed(&net, 1, -1, 95.0, 0.0);

        let status = move_along_s(
            &net,
            &mut pos,
            10.0,
            JunctionStrategy::Straight,
            &mut rng,
            &MoverParams::default(),
        )
        .unwrap();

        let track = pos.track().unwrap();
        assert_eq!(status, MoveStatus::CrossedToNewRoad);
        assert_eq!(track.road_id, 2);
        assert!((track.s - 5.0).abs() < 1e-9);
        assert_eq!(track.lane_id, -1);
    }

    #[test]
    fn test_zero_move_is_idempotent() {
        let net = t_junction();

        for strategy in STRATEGIES.iter() {
            let mut rng = ChaCha8Rng::seed_from_u64(1);

            for &s in [0.0, 50.0, 100.0].iter() {
                let mut pos = placed(&net, 1, -1, s, 0.5);
                let before = *pos.track().unwrap();

                let status = move_along_s(
                    &net,
                    &mut pos,
                    0.0,
                    *strategy,
                    &mut rng,
                    &MoverParams::default(),
                )
                .unwrap();

                let after = pos.track().unwrap();
                assert_eq!(status, MoveStatus::Moved);
                assert_eq!(after.road_id, before.road_id);
                assert_eq!(after.lane_id, before.lane_id);
                assert_eq!(after.s, before.s);
            }
        }
    }

    #[test]
    fn test_dead_end() {
        let net = two_roads();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let params = MoverParams::default();

        // Runs off the end of road 2 and is clamped there
        let mut pos = placed(&net, 2, -1, 40.0, 0.0);
        let status = move_along_s(
            &net,
            &mut pos,
            20.0,
            JunctionStrategy::Straight,
            &mut rng,
            &params,
        )
        .unwrap();
        assert_eq!(status, MoveStatus::OffRoad);
        assert_eq!(pos.track().unwrap().s, 50.0);

        // Already at the end, nowhere to go
        let status = move_along_s(
            &net,
            &mut pos,
            5.0,
            JunctionStrategy::Straight,
            &mut rng,
            &params,
        )
        .unwrap();
        assert_eq!(status, MoveStatus::NoMovement);
        assert_eq!(pos.track().unwrap().s, 50.0);

        // Backwards off the start of road 1
        let mut pos = placed(&net, 1, -1, 3.0, 0.0);
        let status = move_along_s(
            &net,
            &mut pos,
            -5.0,
            JunctionStrategy::Straight,
            &mut rng,
            &params,
        )
        .unwrap();
        assert_eq!(status, MoveStatus::OffRoad);
        assert_eq!(pos.track().unwrap().s, 0.0);
    }

    #[test]
    fn test_move_backwards_across_link() {
        let net = two_roads();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = placed(&net, 2, -1, 2.0, 0.0);

        let status = move_along_s(
            &net,
            &mut pos,
            -7.0,
            JunctionStrategy::Straight,
            &mut rng,
            &MoverParams::default(),
        )
        .unwrap();

        let track = pos.track().unwrap();
        assert_eq!(status, MoveStatus::CrossedToNewRoad);
        assert_eq!(track.road_id, 1);
        assert!((track.s - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_link() {
        let net = head_to_head();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = placed(&net, 1, -1, 90.0, 0.5);
        let before = *pos.world();

        let status = move_along_s(
            &net,
            &mut pos,
            20.0,
            JunctionStrategy::Straight,
            &mut rng,
            &MoverParams::default(),
        )
        .unwrap();

        // Road 3 runs back towards road 1, so its s decreases as we go on
        let track = pos.track().unwrap();
        assert_eq!(status, MoveStatus::CrossedToNewRoad);
        assert_eq!(track.road_id, 3);
        assert_eq!(track.lane_id, 1);
        assert!((track.s - 40.0).abs() < 1e-9);
        assert_eq!(track.offset, -0.5);
        assert!((track.h_rel - PI).abs() < 1e-12);

        // Same side of the road and same direction in the world
        assert!((pos.world().position_m.x - 110.0).abs() < 1e-9);
        assert!((pos.world().position_m.y - before.position_m.y).abs() < 1e-9);
        assert!(util::maths::heading_diff(pos.world().heading_rad, 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_junction_straight() {
        let net = t_junction();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = placed(&net, 1, -1, 90.0, 0.0);

        // Through the straight connecting road and onto road 21
        let status = move_along_s(
            &net,
            &mut pos,
            40.0,
            JunctionStrategy::Straight,
            &mut rng,
            &MoverParams::default(),
        )
        .unwrap();

        let track = pos.track().unwrap();
        assert_eq!(status, MoveStatus::CrossedToNewRoad);
        assert_eq!(track.road_id, 21);
        assert!((track.s - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_junction_first_match() {
        let net = t_junction();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = placed(&net, 1, -1, 90.0, 0.0);

        move_along_s(
            &net,
            &mut pos,
            15.0,
            JunctionStrategy::FirstMatch,
            &mut rng,
            &MoverParams::default(),
        )
        .unwrap();

        assert_eq!(pos.track().unwrap().road_id, 10);
    }

    #[test]
    fn test_random_junction_visits_every_road() {
        let net = t_junction();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts = HashMap::new();

        for _ in 0..300 {
            let mut pos = placed(&net, 1, -1, 60.0, 0.0);
            let status = move_along_s(
                &net,
                &mut pos,
                40.0,
                JunctionStrategy::Random,
                &mut rng,
                &MoverParams::default(),
            )
            .unwrap();

            assert_eq!(status, MoveStatus::CrossedToNewRoad);
            *counts.entry(pos.track().unwrap().road_id).or_insert(0) += 1;
        }

        for id in [10, 11, 12].iter() {
            assert!(counts.get(id).copied().unwrap_or(0) > 0, "road {} never visited", id);
        }
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_zero_weight_connection_never_taken() {
        let net = weighted_junction();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for _ in 0..100 {
            let mut pos = placed(&net, 1, -1, 99.0, 0.0);
            move_along_s(
                &net,
                &mut pos,
                5.0,
                JunctionStrategy::Random,
                &mut rng,
                &MoverParams::default(),
            )
            .unwrap();

            assert_ne!(pos.track().unwrap().road_id, 12);
        }
    }

    #[test]
    fn test_lane_section_transition() {
        let net = lane_drop();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let params = MoverParams::default();

        // Lane -2 is linked to lane -1 of the second section
        let mut pos = placed(&net, 1, -2, 40.0, 0.0);
        let status = move_along_s(
            &net,
            &mut pos,
            20.0,
            JunctionStrategy::Straight,
            &mut rng,
            &params,
        )
        .unwrap();
        assert_eq!(status, MoveStatus::Moved);
        assert_eq!(pos.track().unwrap().lane_id, -1);

        // Lane -3 ends at the section boundary
        let mut pos = placed(&net, 1, -3, 40.0, 0.0);
        let status = move_along_s(
            &net,
            &mut pos,
            20.0,
            JunctionStrategy::Straight,
            &mut rng,
            &params,
        )
        .unwrap();
        assert_eq!(status, MoveStatus::OffRoad);
        assert_eq!(pos.track().unwrap().lane_id, -3);
        assert!(pos.track().unwrap().s < 50.0);
        assert!(pos.track().unwrap().s > 49.9);
    }

    #[test]
    fn test_crossing_bound() {
        let net = two_roads();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = placed(&net, 1, -1, 95.0, 0.0);
        let before = *pos.track().unwrap();

        let res = move_along_s(
            &net,
            &mut pos,
            10.0,
            JunctionStrategy::Straight,
            &mut rng,
            &MoverParams { max_crossings: 0 },
        );

        assert!(matches!(res, Err(PosError::SearchExhausted(0))));
        assert_eq!(*pos.track().unwrap(), before);
    }

    #[test]
    fn test_unplaced_position() {
        let net = two_roads();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut pos = Position::new();

        assert!(matches!(
            move_along_s(
                &net,
                &mut pos,
                1.0,
                JunctionStrategy::Straight,
                &mut rng,
                &MoverParams::default()
            ),
            Err(PosError::NoRoadAssociation)
        ));
    }
}
