//! # Road network
//!
//! The network holds every road and junction loaded for a session. It is immutable once built and
//! is shared between all queries as an `Arc<RoadNetwork>`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::fs::read_to_string;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    junction::{Connection, Junction},
    road::{ContactPoint, LinkTarget, Road},
    RoadNetError,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used when checking the arc-length layout of a road.
const S_TOLERANCE_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An immutable road network.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    name: String,
    roads: Vec<Road>,
    junctions: Vec<Junction>,
    road_index: HashMap<i32, usize>,
    junction_index: HashMap<i32, usize>,
}

/// The serialised form of a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDescription {
    #[serde(default)]
    pub name: String,

    pub roads: Vec<Road>,

    #[serde(default)]
    pub junctions: Vec<Junction>,
}

/// A road reachable from the end of another road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Neighbour {
    pub road_id: i32,

    /// End of the neighbouring road at which it is entered
    pub contact: ContactPoint,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoadNetwork {
    /// Build a network from its description, validating it.
    pub fn new(desc: NetworkDescription) -> Result<Self, RoadNetError> {
        let NetworkDescription {
            name,
            mut roads,
            junctions,
        } = desc;

        // Described sections get the same reference lane and ordering as built ones
        for road in roads.iter_mut() {
            for ls in road.lane_sections.iter_mut() {
                ls.normalise();
            }
        }

        let mut road_index = HashMap::with_capacity(roads.len());
        for (i, road) in roads.iter().enumerate() {
            if road_index.insert(road.id, i).is_some() {
                return Err(RoadNetError::Invalid(format!("duplicate road id {}", road.id)));
            }
        }

        let mut junction_index = HashMap::with_capacity(junctions.len());
        for (i, junction) in junctions.iter().enumerate() {
            if junction_index.insert(junction.id, i).is_some() {
                return Err(RoadNetError::Invalid(format!(
                    "duplicate junction id {}",
                    junction.id
                )));
            }
        }

        let network = Self {
            name,
            roads,
            junctions,
            road_index,
            junction_index,
        };

        network.validate()?;

        info!(
            "Road network \"{}\" built with {} roads and {} junctions",
            network.name,
            network.roads.len(),
            network.junctions.len()
        );

        Ok(network)
    }

    /// Load a network description from a file.
    ///
    /// The format is chosen by extension, `.json` or `.toml`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RoadNetError> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(RoadNetError::FileLoad)?;

        debug!("Loading road network from {:?}", path);

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            _ => Err(RoadNetError::UnknownFormat(path.to_path_buf())),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, RoadNetError> {
        Self::new(serde_json::from_str(content).map_err(RoadNetError::JsonParse)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, RoadNetError> {
        Self::new(toml::from_str(content).map_err(RoadNetError::TomlParse)?)
    }

    /// Convert back into a serialisable description.
    pub fn to_description(&self) -> NetworkDescription {
        NetworkDescription {
            name: self.name.clone(),
            roads: self.roads.clone(),
            junctions: self.junctions.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_roads(&self) -> usize {
        self.roads.len()
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn road_by_idx(&self, idx: usize) -> Option<&Road> {
        self.roads.get(idx)
    }

    pub fn road_by_id(&self, id: i32) -> Option<&Road> {
        self.road_index.get(&id).map(|&i| &self.roads[i])
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn junction_by_id(&self, id: i32) -> Option<&Junction> {
        self.junction_index.get(&id).map(|&i| &self.junctions[i])
    }

    /// Junction connections available when leaving `road_id` through its `end`.
    ///
    /// Empty if that end is not linked to a junction.
    pub fn junction_candidates(&self, road_id: i32, end: ContactPoint) -> Vec<&Connection> {
        let junction = self
            .road_by_id(road_id)
            .and_then(|r| r.link_at(end))
            .and_then(|link| match link {
                LinkTarget::Junction { id } => self.junction_by_id(*id),
                LinkTarget::Road { .. } => None,
            });

        match junction {
            Some(j) => j.connections_from(road_id).collect(),
            None => Vec::new(),
        }
    }

    /// Every road reachable from the given end of `road_id`, ignoring lanes.
    ///
    /// Junction links also yield connecting roads which lead into `road_id`, so a junction can be
    /// traversed against the direction its connections are listed in.
    pub fn neighbours(&self, road_id: i32, end: ContactPoint) -> Vec<Neighbour> {
        let road = match self.road_by_id(road_id) {
            Some(r) => r,
            None => return Vec::new(),
        };

        let mut neighbours = Vec::new();

        match road.link_at(end) {
            Some(LinkTarget::Road { id, contact }) => neighbours.push(Neighbour {
                road_id: *id,
                contact: *contact,
            }),
            Some(LinkTarget::Junction { id }) => {
                if let Some(junction) = self.junction_by_id(*id) {
                    for conn in junction.connections_from(road_id) {
                        neighbours.push(Neighbour {
                            road_id: conn.connecting_road,
                            contact: conn.contact_point,
                        });
                    }

                    // Connecting roads whose own links lead back to this end
                    let reverse = LinkTarget::Road {
                        id: road_id,
                        contact: end,
                    };
                    for conn in junction.connections.iter() {
                        if let Some(connecting) = self.road_by_id(conn.connecting_road) {
                            for c_end in [ContactPoint::Start, ContactPoint::End].iter() {
                                if connecting.link_at(*c_end) == Some(&reverse) {
                                    neighbours.push(Neighbour {
                                        road_id: connecting.id,
                                        contact: *c_end,
                                    });
                                }
                            }
                        }
                    }
                }
            }
            None => (),
        }

        // A connecting road can appear in several connections
        let mut seen = HashSet::new();
        neighbours.retain(|n| seen.insert(*n));

        neighbours
    }

    /// Check the invariants of the network.
    fn validate(&self) -> Result<(), RoadNetError> {
        for road in self.roads.iter() {
            validate_road(road)?;

            for link in [road.link.predecessor, road.link.successor].iter().flatten() {
                self.validate_link(link)?;
            }
        }

        for junction in self.junctions.iter() {
            for conn in junction.connections.iter() {
                for id in [conn.incoming_road, conn.connecting_road].iter() {
                    if self.road_by_id(*id).is_none() {
                        return Err(RoadNetError::UnknownRoad(*id));
                    }
                }

                if !(conn.weight >= 0.0) {
                    return Err(RoadNetError::Invalid(format!(
                        "junction {} connection to road {} has invalid weight {}",
                        junction.id, conn.connecting_road, conn.weight
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_link(&self, link: &LinkTarget) -> Result<(), RoadNetError> {
        match link {
            LinkTarget::Road { id, .. } => self
                .road_by_id(*id)
                .map(|_| ())
                .ok_or(RoadNetError::UnknownRoad(*id)),
            LinkTarget::Junction { id } => self
                .junction_by_id(*id)
                .map(|_| ())
                .ok_or(RoadNetError::UnknownJunction(*id)),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn validate_road(road: &Road) -> Result<(), RoadNetError> {
    let invalid = |msg: String| Err(RoadNetError::Invalid(format!("road {}: {}", road.id, msg)));

    if !(road.length > 0.0) {
        return invalid(format!("length must be positive, found {}", road.length));
    }

    if road.geometries.is_empty() {
        return invalid("no plan view geometry".into());
    }

    let first = match road.lane_sections.first() {
        Some(ls) => ls,
        None => return invalid("no lane sections".into()),
    };

    if first.s.abs() > S_TOLERANCE_M {
        return invalid(format!("first lane section starts at {}, not 0", first.s));
    }

    for pair in road.lane_sections.windows(2) {
        if pair[1].s <= pair[0].s {
            return invalid(format!(
                "lane sections at {} and {} are not increasing",
                pair[0].s, pair[1].s
            ));
        }
    }

    for ls in road.lane_sections.iter() {
        if ls.s > road.length + S_TOLERANCE_M {
            return invalid(format!("lane section at {} starts beyond the road end", ls.s));
        }

        // Sorted by id already, so duplicates are neighbours
        for pair in ls.lanes.windows(2) {
            if pair[0].id == pair[1].id {
                return invalid(format!(
                    "duplicate lane id {} in section at {}",
                    pair[0].id, ls.s
                ));
            }
        }

        // Each side must be numbered outwards from 1 without gaps
        let left = ls.lanes.iter().filter(|l| l.id > 0).count() as i32;
        let right = ls.lanes.iter().filter(|l| l.id < 0).count() as i32;
        let contiguous = ls
            .lanes
            .iter()
            .all(|l| (l.id > 0 && l.id <= left) || (l.id < 0 && -l.id <= right) || l.id == 0);
        if !contiguous {
            return invalid(format!("lane ids in section at {} are not contiguous", ls.s));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{builder::RoadBuilder, lane::Lane};

    fn junction_network() -> RoadNetwork {
        // Road 1 ends in junction 100, which connects to roads 10 and 11
        let r1 = RoadBuilder::new(1)
            .start(0.0, 0.0, 0.0)
            .line(100.0)
            .lanes(vec![Lane::driving(-1, 3.0)])
            .successor(LinkTarget::Junction { id: 100 })
            .build();
        let r10 = RoadBuilder::new(10)
            .junction(100)
            .start(100.0, 0.0, 0.0)
            .line(20.0)
            .lanes(vec![Lane::driving(-1, 3.0)])
            .predecessor(LinkTarget::Road {
                id: 1,
                contact: ContactPoint::End,
            })
            .build();
        let r11 = RoadBuilder::new(11)
            .junction(100)
            .start(100.0, 0.0, 0.0)
            .arc(0.05, 20.0)
            .lanes(vec![Lane::driving(-1, 3.0)])
            .predecessor(LinkTarget::Road {
                id: 1,
                contact: ContactPoint::End,
            })
            .build();

        RoadNetwork::new(NetworkDescription {
            name: "junction".into(),
            roads: vec![r1, r10, r11],
            junctions: vec![Junction {
                id: 100,
                name: String::new(),
                connections: vec![
                    Connection::new(1, 10, ContactPoint::Start),
                    Connection::new(1, 11, ContactPoint::Start),
                ],
            }],
        })
        .unwrap()
    }

    #[test]
    fn test_lookups() {
        let net = junction_network();
        assert_eq!(net.num_roads(), 3);
        assert_eq!(net.road_by_idx(1).map(|r| r.id), Some(10));
        assert_eq!(net.road_by_id(11).map(|r| r.id), Some(11));
        assert!(net.road_by_id(12).is_none());
        assert!(net.junction_by_id(100).is_some());
    }

    #[test]
    fn test_junction_candidates_and_neighbours() {
        let net = junction_network();

        let candidates: Vec<i32> = net
            .junction_candidates(1, ContactPoint::End)
            .iter()
            .map(|c| c.connecting_road)
            .collect();
        assert_eq!(candidates, vec![10, 11]);
        assert!(net.junction_candidates(1, ContactPoint::Start).is_empty());

        let neighbours = net.neighbours(1, ContactPoint::End);
        assert_eq!(neighbours.len(), 2);
        assert!(neighbours.contains(&Neighbour {
            road_id: 11,
            contact: ContactPoint::Start
        }));

        // Back out of the junction along the direct link
        assert_eq!(
            net.neighbours(10, ContactPoint::Start),
            vec![Neighbour {
                road_id: 1,
                contact: ContactPoint::End
            }]
        );
    }

    #[test]
    fn test_validation_rejects_bad_networks() {
        let dangling = RoadBuilder::new(1)
            .start(0.0, 0.0, 0.0)
            .line(10.0)
            .lanes(vec![Lane::driving(-1, 3.0)])
            .successor(LinkTarget::Road {
                id: 2,
                contact: ContactPoint::Start,
            })
            .build();
        let res = RoadNetwork::new(NetworkDescription {
            name: String::new(),
            roads: vec![dangling],
            junctions: Vec::new(),
        });
        assert!(matches!(res, Err(RoadNetError::UnknownRoad(2))));

        let gap = RoadBuilder::new(1)
            .start(0.0, 0.0, 0.0)
            .line(10.0)
            .lanes(vec![Lane::driving(-1, 3.0), Lane::driving(-3, 3.0)])
            .build();
        let res = RoadNetwork::new(NetworkDescription {
            name: String::new(),
            roads: vec![gap],
            junctions: Vec::new(),
        });
        assert!(matches!(res, Err(RoadNetError::Invalid(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let net = junction_network();
        let json = serde_json::to_string(&net.to_description()).unwrap();
        let loaded = RoadNetwork::from_json_str(&json).unwrap();

        assert_eq!(loaded.num_roads(), 3);
        assert_eq!(loaded.road_by_id(11), net.road_by_id(11));
        assert_eq!(loaded.junction_by_id(100), net.junction_by_id(100));
    }

    #[test]
    fn test_described_reference_lane() {
        let json = r#"{
            "name": "described",
            "roads": [{
                "id": 1,
                "length": 100.0,
                "geometries": [
                    {"s": 0.0, "x": 0.0, "y": 0.0, "hdg": 0.0, "length": 100.0, "kind": {"type": "line"}}
                ],
                "lane_sections": [
                    {"s": 0.0, "lanes": [
                        {"id": -2, "kind": "driving", "widths": [{"s": 0.0, "a": 3.5}]},
                        {"id": -1, "kind": "shoulder", "widths": [{"s": 0.0, "a": 1.0}]},
                        {"id": 0},
                        {"id": 1, "kind": "driving", "widths": [{"s": 0.0, "a": 3.5}]}
                    ]},
                    {"s": 50.0, "lanes": [
                        {"id": -1, "widths": [{"s": 0.0, "a": 3.5}]}
                    ]}
                ]
            }]
        }"#;

        let net = RoadNetwork::from_json_str(json).unwrap();
        let road = net.road_by_id(1).unwrap();

        // Lane 0 is never drivable
        assert_eq!(road.drivable_lane_ids(10.0), vec![-2, 1]);

        // Lane 0 is added where the description leaves it out
        assert!(road.lane_by_s(60.0, 0).is_some());
        assert_eq!(road.lane_center_t(60.0, 0), Some(0.0));
    }

    #[test]
    fn test_toml_description() {
        let toml_str = r#"
            name = "straight"

            [[roads]]
            id = 5
            length = 50.0

            [[roads.geometries]]
            s = 0.0
            x = 0.0
            y = 0.0
            hdg = 0.0
            length = 50.0
            kind = { type = "line" }

            [[roads.lane_sections]]
            s = 0.0

            [[roads.lane_sections.lanes]]
            id = 0
            kind = "none"

            [[roads.lane_sections.lanes]]
            id = -1
            kind = "driving"
            widths = [{ s = 0.0, a = 3.5 }]

            [[roads.speeds]]
            s = 0.0
            max_ms = 25.0
        "#;

        let net = RoadNetwork::from_toml_str(toml_str).unwrap();
        let road = net.road_by_id(5).unwrap();
        assert_eq!(road.lane_width_by_s(10.0, -1), 3.5);
        assert_eq!(road.speed_by_s(10.0), 25.0);
        assert_eq!(net.name(), "straight");
    }
}
