//! # Junction resolution
//!
//! When a move runs off the end of a road it continues onto one of the roads linked to that end.
//! This module lists the possible continuations and picks one with a [`JunctionStrategy`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;
use std::f64::consts::PI;

use log::{debug, trace};
use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};

use road_net::{ContactPoint, LinkTarget, Road, RoadNetwork};
use util::maths::{heading_diff, wrap_2pi};

use crate::PosError;

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// How to choose between several roads leaving a junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunctionStrategy {
    /// Random choice weighted by the connection weights
    Random,

    /// The connection whose far end continues closest to the current heading
    Straight,

    /// The first connection in junction order
    FirstMatch,
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A road a move can continue onto.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub road: &'a Road,

    /// End of `road` the move enters at
    pub contact: ContactPoint,

    /// Lane entered on `road`
    pub lane_id: i32,

    pub weight: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl TryFrom<i32> for JunctionStrategy {
    type Error = PosError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(JunctionStrategy::Random),
            1 => Ok(JunctionStrategy::Straight),
            2 => Ok(JunctionStrategy::FirstMatch),
            c => Err(PosError::InvalidStrategy(c)),
        }
    }
}

impl From<JunctionStrategy> for i32 {
    fn from(strategy: JunctionStrategy) -> Self {
        match strategy {
            JunctionStrategy::Random => 0,
            JunctionStrategy::Straight => 1,
            JunctionStrategy::FirstMatch => 2,
        }
    }
}

impl JunctionStrategy {
    /// Pick one of the candidates, returning its index.
    ///
    /// `travel_heading` is the direction of travel as the move leaves the current road.
    pub fn select<R: Rng>(
        &self,
        travel_heading: f64,
        candidates: &[Candidate],
        rng: &mut R,
    ) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }

        let idx = match self {
            JunctionStrategy::FirstMatch => 0,
            JunctionStrategy::Random => match WeightedIndex::new(candidates.iter().map(|c| c.weight))
            {
                Ok(dist) => dist.sample(rng),
                // Every weight zero, fall back to a uniform choice
                Err(_) => rng.gen_range(0..candidates.len()),
            },
            JunctionStrategy::Straight => {
                let mut best = 0;
                let mut best_change = f64::INFINITY;

                for (i, c) in candidates.iter().enumerate() {
                    let change = heading_diff(travel_heading, exit_heading(c)).abs();
                    if change < best_change {
                        best_change = change;
                        best = i;
                    }
                }

                best
            }
        };

        debug!(
            "{:?} strategy chose road {} out of {} candidates",
            self,
            candidates[idx].road.id,
            candidates.len()
        );

        Some(idx)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Every road a move in `lane_id` can continue onto when leaving `road` through `end`.
///
/// A direct road link gives at most one candidate. A junction gives one candidate per connection
/// from `road` which accepts the lane, plus any connecting road leading back into `end` so the
/// junction can also be crossed against the direction its connections are listed in.
pub fn candidates<'a>(
    net: &'a RoadNetwork,
    road: &Road,
    end: ContactPoint,
    lane_id: i32,
) -> Vec<Candidate<'a>> {
    let lane_link = road
        .lane_by_s(road.s_at(end), lane_id)
        .and_then(|lane| match end {
            ContactPoint::End => lane.link.successor,
            ContactPoint::Start => lane.link.predecessor,
        });

    let mut cands = Vec::new();

    match road.link_at(end) {
        Some(LinkTarget::Road { id, contact }) => {
            if let Some(next) = net.road_by_id(*id) {
                let lane = lane_link.unwrap_or_else(|| carried_lane(lane_id, end, *contact));
                if let Some(lane_id) = entry_lane(next, *contact, lane) {
                    cands.push(Candidate {
                        road: next,
                        contact: *contact,
                        lane_id,
                        weight: 1.0,
                    });
                }
            }
        }
        Some(LinkTarget::Junction { .. }) => {
            let conns = net.junction_candidates(road.id, end);

            for conn in conns.iter() {
                let next = match net.road_by_id(conn.connecting_road) {
                    Some(r) => r,
                    None => continue,
                };

                let lane = if conn.lane_links.is_empty() {
                    Some(carried_lane(lane_id, end, conn.contact_point))
                } else {
                    conn.lane_to(lane_id)
                };

                if let Some(lane_id) = lane.and_then(|l| entry_lane(next, conn.contact_point, l)) {
                    cands.push(Candidate {
                        road: next,
                        contact: conn.contact_point,
                        lane_id,
                        weight: conn.weight,
                    });
                }
            }

            // Connecting roads which only list this road as their own link
            for n in net.neighbours(road.id, end) {
                let listed = conns
                    .iter()
                    .any(|c| c.connecting_road == n.road_id && c.contact_point == n.contact);
                if listed {
                    continue;
                }

                if let Some(next) = net.road_by_id(n.road_id) {
                    let lane = carried_lane(lane_id, end, n.contact);
                    if let Some(lane_id) = entry_lane(next, n.contact, lane) {
                        cands.push(Candidate {
                            road: next,
                            contact: n.contact,
                            lane_id,
                            weight: 1.0,
                        });
                    }
                }
            }
        }
        None => (),
    }

    trace!(
        "{} continuations from road {} {:?} in lane {}",
        cands.len(),
        road.id,
        end,
        lane_id
    );

    cands
}

/// Lane id kept across a link with no lane mapping, flipping sign when the road frames oppose.
pub(crate) fn carried_lane(lane_id: i32, exit: ContactPoint, entry: ContactPoint) -> i32 {
    if exit == entry {
        -lane_id
    } else {
        lane_id
    }
}

/// Check that `lane_id` exists where a move enters `road`.
fn entry_lane(road: &Road, contact: ContactPoint, lane_id: i32) -> Option<i32> {
    road.lane_section_by_s(road.s_at(contact))
        .and_then(|ls| ls.lane_by_id(lane_id))
        .map(|l| l.id)
}

/// Direction of travel when leaving the far end of a candidate road.
fn exit_heading(c: &Candidate) -> f64 {
    let (far_end, turn) = match c.contact {
        ContactPoint::Start => (ContactPoint::End, 0.0),
        ContactPoint::End => (ContactPoint::Start, PI),
    };

    wrap_2pi(c.road.ref_point(c.road.s_at(far_end)).heading_rad + turn)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
