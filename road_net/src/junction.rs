//! # Junctions
//!
//! A junction joins the ends of several roads through connecting roads. Each connection names the
//! road a vehicle arrives on, the connecting road it continues onto, and which end of the
//! connecting road it enters at.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::road::ContactPoint;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: i32,

    #[serde(default)]
    pub name: String,

    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub incoming_road: i32,

    pub connecting_road: i32,

    /// End of the connecting road which joins the incoming road
    pub contact_point: ContactPoint,

    /// Lane mapping from the incoming road to the connecting road. An empty list accepts any lane
    /// and keeps its id.
    #[serde(default)]
    pub lane_links: Vec<JunctionLaneLink>,

    /// Relative probability of this connection being taken, used by weighted random selection
    #[serde(default = "default_weight")]
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunctionLaneLink {
    pub from: i32,
    pub to: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Connection {
    pub fn new(incoming_road: i32, connecting_road: i32, contact_point: ContactPoint) -> Self {
        Self {
            incoming_road,
            connecting_road,
            contact_point,
            lane_links: Vec::new(),
            weight: default_weight(),
        }
    }

    pub fn with_lane_link(mut self, from: i32, to: i32) -> Self {
        self.lane_links.push(JunctionLaneLink { from, to });
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Lane on the connecting road reached from `from_lane` on the incoming road.
    ///
    /// Returns `None` if the connection has lane links but none for `from_lane`.
    pub fn lane_to(&self, from_lane: i32) -> Option<i32> {
        if self.lane_links.is_empty() {
            return Some(from_lane);
        }

        self.lane_links
            .iter()
            .find(|l| l.from == from_lane)
            .map(|l| l.to)
    }
}

impl Junction {
    /// Connections whose incoming road is `road_id`, in junction order.
    pub fn connections_from(&self, road_id: i32) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.incoming_road == road_id)
    }
}

fn default_weight() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
