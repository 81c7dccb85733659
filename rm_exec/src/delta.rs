//! # Delta engine
//!
//! Relative offset between two positions, measured in the frame of the second one: `ds` along its
//! direction of travel, `dt` positive to the left of that direction, and the difference of lane
//! ids.
//!
//! Positions on different roads are related by a shortest path search over road ends, bounded by
//! a maximum number of roads entered so cyclic networks terminate. When the path enters a road
//! against its s-direction the first position's lateral quantities are mirrored into the second
//! one's road frame, so `dt` and the lane difference describe the same side of the road.
//!
//! A position travels towards decreasing s when its heading relative to the road points backwards.
//! When the two positions travel opposite ways along the path joining them there is no common
//! direction of travel, and the s-direction of the lower numbered road, carried along the path, is
//! used instead. Either way `delta(a, b)` is the negation of `delta(b, a)`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashSet},
};

use log::{debug, trace};
use ordered_float::NotNan;
use serde::Serialize;

use road_net::{ContactPoint, RoadNetwork};

use crate::{
    position::{Position, TrackPos},
    PosError,
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Offset of one position relative to another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionDiff {
    pub ds: f64,

    pub dt: f64,

    pub d_lane_id: i32,
}

/// Node of the search queue, ordered by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SearchNode {
    /// Distance from the reference position to where the node's road is entered, or to the target
    /// position for target nodes
    dist: NotNan<f64>,

    kind: NodeKind,

    road_id: i32,

    /// +1 if the road is travelled towards increasing s
    travel: i32,

    /// +1 for the forwards search from the reference position, -1 backwards
    sign: i32,

    /// Number of roads entered
    hops: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum NodeKind {
    /// The node's road has just been entered
    Entry,

    /// The target position has been reached
    Target,
}

/// Bounded Dijkstra search over road ends.
struct Search<'a> {
    net: &'a RoadNetwork,
    queue: BinaryHeap<Reverse<SearchNode>>,
    visited: HashSet<(i32, i32, i32)>,
    max_hops: usize,

    /// True once a node was dropped for exceeding the hop bound
    pruned: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the offset of `a` relative to `b`.
pub fn delta(
    net: &RoadNetwork,
    a: &Position,
    b: &Position,
    max_hops: usize,
) -> Result<PositionDiff, PosError> {
    let ta = a.track_or_err()?;
    let tb = b.track_or_err()?;

    delta_track(net, ta, tb, max_hops)
}

/// Compute the offset of track pose `ta` relative to `tb`.
pub fn delta_track(
    net: &RoadNetwork,
    ta: &TrackPos,
    tb: &TrackPos,
    max_hops: usize,
) -> Result<PositionDiff, PosError> {
    let road_a = net
        .road_by_id(ta.road_id)
        .ok_or(PosError::UnknownRoad(ta.road_id))?;
    let road_b = net
        .road_by_id(tb.road_id)
        .ok_or(PosError::UnknownRoad(tb.road_id))?;

    if ta.road_id == tb.road_id {
        let road_diff = PositionDiff {
            ds: ta.s - tb.s,
            dt: ta.t - tb.t,
            d_lane_id: ta.lane_id - tb.lane_id,
        };

        return Ok(travel_frame(road_diff, ta, tb, 1));
    }

    let mut search = Search {
        net,
        queue: BinaryHeap::new(),
        visited: HashSet::new(),
        max_hops,
        pruned: false,
    };

    search.push_neighbours(tb.road_id, ContactPoint::End, 1, road_b.length - tb.s, 1)?;
    search.push_neighbours(tb.road_id, ContactPoint::Start, -1, tb.s, 1)?;

    while let Some(Reverse(node)) = search.queue.pop() {
        let dist = node.dist.into_inner();

        if node.kind == NodeKind::Target {
            let orientation = node.sign * node.travel;
            let road_diff = PositionDiff {
                ds: node.sign as f64 * dist,
                dt: orientation as f64 * ta.t - tb.t,
                d_lane_id: orientation * ta.lane_id - tb.lane_id,
            };
            let diff = travel_frame(road_diff, ta, tb, orientation);

            debug!(
                "Road {} reached from road {} in {} hops: {:?}",
                ta.road_id, tb.road_id, node.hops, diff
            );

            return Ok(diff);
        }

        if !search.visited.insert((node.road_id, node.travel, node.sign)) {
            continue;
        }

        trace!(
            "Entered road {} travelling {} at {:.3} m",
            node.road_id,
            node.travel,
            dist
        );

        if node.road_id == ta.road_id {
            let along = if node.travel > 0 {
                ta.s
            } else {
                road_a.length - ta.s
            };

            search.queue.push(Reverse(SearchNode {
                dist: not_nan(dist + along)?,
                kind: NodeKind::Target,
                ..node
            }));
            continue;
        }

        if node.road_id == tb.road_id {
            continue;
        }

        let length = net
            .road_by_id(node.road_id)
            .map(|r| r.length)
            .ok_or(PosError::UnknownRoad(node.road_id))?;
        let exit = ContactPoint::exit_for_direction(node.travel as f64);

        search.push_neighbours(node.road_id, exit, node.sign, dist + length, node.hops + 1)?;
    }

    if search.pruned {
        Err(PosError::SearchExhausted(max_hops))
    } else {
        Err(PosError::NoRelation)
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<'a> Search<'a> {
    /// Queue every road entered by leaving `road_id` through `end`.
    fn push_neighbours(
        &mut self,
        road_id: i32,
        end: ContactPoint,
        sign: i32,
        dist: f64,
        hops: usize,
    ) -> Result<(), PosError> {
        let neighbours = self.net.neighbours(road_id, end);

        if neighbours.is_empty() {
            return Ok(());
        }

        if hops > self.max_hops {
            self.pruned = true;
            return Ok(());
        }

        for n in neighbours {
            let travel = match n.contact {
                ContactPoint::Start => 1,
                ContactPoint::End => -1,
            };

            self.queue.push(Reverse(SearchNode {
                dist: not_nan(dist)?,
                kind: NodeKind::Entry,
                road_id: n.road_id,
                travel,
                sign,
                hops,
            }));
        }

        Ok(())
    }
}

/// Turn an offset in `tb`'s road frame into the shared travel frame of the pair.
///
/// `orientation` is +1 if `ta`'s road s-direction agrees with `tb`'s along the path, -1 otherwise.
fn travel_frame(
    road_diff: PositionDiff,
    ta: &TrackPos,
    tb: &TrackPos,
    orientation: i32,
) -> PositionDiff {
    let dir_a = orientation * travel_dir(ta);
    let dir_b = travel_dir(tb);

    let frame = if dir_a == dir_b {
        dir_b
    } else if tb.road_id <= ta.road_id {
        1
    } else {
        orientation
    };

    PositionDiff {
        ds: frame as f64 * road_diff.ds,
        dt: frame as f64 * road_diff.dt,
        d_lane_id: frame * road_diff.d_lane_id,
    }
}

/// +1 if the pose travels towards increasing s, -1 otherwise.
fn travel_dir(tp: &TrackPos) -> i32 {
    if tp.h_rel.cos() < 0.0 {
        -1
    } else {
        1
    }
}

fn not_nan(value: f64) -> Result<NotNan<f64>, PosError> {
    NotNan::new(value).map_err(|_| PosError::NoRelation)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
