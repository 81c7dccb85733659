//! # Road builder
//!
//! Builds roads in code, chaining geometry records end to end so that the reference line is
//! continuous. Useful for tests and for networks generated programmatically.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::{
    geometry::{Geometry, GeometryKind},
    lane::{Lane, LaneSection},
    road::{LinkTarget, Poly3, Road, RoadLink, SpeedRecord},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Builder for a single [`Road`].
#[derive(Debug, Clone)]
pub struct RoadBuilder {
    road: Road,

    /// Pose `(x, y, hdg)` at which the next geometry record starts
    cursor: (f64, f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoadBuilder {
    pub fn new(id: i32) -> Self {
        Self {
            road: Road {
                id,
                name: String::new(),
                length: 0.0,
                junction: None,
                geometries: Vec::new(),
                elevations: Vec::new(),
                superelevations: Vec::new(),
                lane_sections: Vec::new(),
                speeds: Vec::new(),
                link: RoadLink::default(),
            },
            cursor: (0.0, 0.0, 0.0),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.road.name = name.to_string();
        self
    }

    /// Mark the road as a connecting road inside a junction.
    pub fn junction(mut self, id: i32) -> Self {
        self.road.junction = Some(id);
        self
    }

    /// Set the pose at which the next geometry record starts.
    pub fn start(mut self, x: f64, y: f64, hdg: f64) -> Self {
        self.cursor = (x, y, hdg);
        self
    }

    pub fn line(self, length: f64) -> Self {
        self.push_geometry(GeometryKind::Line, length)
    }

    pub fn arc(self, curvature: f64, length: f64) -> Self {
        self.push_geometry(GeometryKind::Arc { curvature }, length)
    }

    pub fn spiral(self, curv_start: f64, curv_end: f64, length: f64) -> Self {
        self.push_geometry(
            GeometryKind::Spiral {
                curv_start,
                curv_end,
            },
            length,
        )
    }

    /// Set the lanes of the first lane section.
    pub fn lanes(self, lanes: Vec<Lane>) -> Self {
        self.lane_section(0.0, lanes)
    }

    /// Add a lane section starting at `s`.
    pub fn lane_section(mut self, s: f64, lanes: Vec<Lane>) -> Self {
        self.road.lane_sections.push(LaneSection::new(s, lanes));
        self.road
            .lane_sections
            .sort_by(|a, b| a.s.partial_cmp(&b.s).unwrap_or(std::cmp::Ordering::Equal));
        self
    }

    pub fn elevation(mut self, record: Poly3) -> Self {
        self.road.elevations.push(record);
        self
    }

    pub fn superelevation(mut self, record: Poly3) -> Self {
        self.road.superelevations.push(record);
        self
    }

    pub fn speed(mut self, s: f64, max_ms: f64) -> Self {
        self.road.speeds.push(SpeedRecord { s, max_ms });
        self
    }

    pub fn predecessor(mut self, target: LinkTarget) -> Self {
        self.road.link.predecessor = Some(target);
        self
    }

    pub fn successor(mut self, target: LinkTarget) -> Self {
        self.road.link.successor = Some(target);
        self
    }

    pub fn build(self) -> Road {
        self.road
    }

    fn push_geometry(mut self, kind: GeometryKind, length: f64) -> Self {
        let (x, y, hdg) = self.cursor;
        let geom = Geometry {
            s: self.road.length,
            x,
            y,
            hdg,
            length,
            kind,
        };

        let end = geom.end();
        self.cursor = (end.position_m.x, end.position_m.y, end.heading_rad);
        self.road.length += length;
        self.road.geometries.push(geom);

        self
    }
}
