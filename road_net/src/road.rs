//! # Roads
//!
//! A road owns its reference line (plan view geometry plus elevation and superelevation
//! profiles), its lane sections, a speed profile, and links to whatever lies beyond each end.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::Geometry,
    lane::{Lane, LaneSection},
};
use util::maths::{clamp, poly3, poly3_prime};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A road in the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: i32,

    #[serde(default)]
    pub name: String,

    /// Length of the reference line
    pub length: f64,

    /// Id of the junction this road belongs to, if it is a connecting road
    #[serde(default)]
    pub junction: Option<i32>,

    /// Plan view geometry records, sorted by `s`
    pub geometries: Vec<Geometry>,

    /// Elevation profile records, sorted by `s`
    #[serde(default)]
    pub elevations: Vec<Poly3>,

    /// Superelevation (roll) profile records, sorted by `s`
    #[serde(default)]
    pub superelevations: Vec<Poly3>,

    /// Lane sections, sorted by `s`
    pub lane_sections: Vec<LaneSection>,

    /// Speed limit records, sorted by `s`
    #[serde(default)]
    pub speeds: Vec<SpeedRecord>,

    #[serde(default)]
    pub link: RoadLink,
}

/// A cubic polynomial record starting at `s`, evaluated as `a + b*ds + c*ds^2 + d*ds^3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Poly3 {
    pub s: f64,
    #[serde(default)]
    pub a: f64,
    #[serde(default)]
    pub b: f64,
    #[serde(default)]
    pub c: f64,
    #[serde(default)]
    pub d: f64,
}

/// Speed limit from `s` until the next record or the end of the road.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRecord {
    pub s: f64,
    pub max_ms: f64,
}

/// Links at each end of a road.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoadLink {
    pub predecessor: Option<LinkTarget>,
    pub successor: Option<LinkTarget>,
}

/// A fully evaluated point on a road's reference line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RefPoint {
    pub position_m: Vector3<f64>,
    pub heading_rad: f64,
    pub pitch_rad: f64,
    pub roll_rad: f64,
    pub curvature_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The element on the other side of a road link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum LinkTarget {
    Road { id: i32, contact: ContactPoint },
    Junction { id: i32 },
}

/// One end of a road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPoint {
    Start,
    End,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Poly3 {
    pub fn new(s: f64, a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { s, a, b, c, d }
    }

    pub fn constant(s: f64, a: f64) -> Self {
        Self::new(s, a, 0.0, 0.0, 0.0)
    }

    pub fn value(&self, s: f64) -> f64 {
        poly3(s - self.s, self.a, self.b, self.c, self.d)
    }

    pub fn slope(&self, s: f64) -> f64 {
        poly3_prime(s - self.s, self.b, self.c, self.d)
    }

    /// Find the record applying at `s` in a list sorted by `s`.
    ///
    /// This is the last record starting at or before `s`, or the first record if `s` lies before
    /// all of them.
    pub fn record_at(records: &[Poly3], s: f64) -> Option<&Poly3> {
        records
            .iter()
            .rev()
            .find(|r| r.s <= s)
            .or_else(|| records.first())
    }

    /// Evaluate a list of records at `s`, `None` if the list is empty.
    pub fn eval_records(records: &[Poly3], s: f64) -> Option<f64> {
        Self::record_at(records, s).map(|r| r.value(s))
    }
}

impl ContactPoint {
    /// Direction of travel along the road when entering it at this contact point.
    pub fn entry_direction(&self) -> f64 {
        match self {
            ContactPoint::Start => 1.0,
            ContactPoint::End => -1.0,
        }
    }

    /// The end reached by travelling in the given direction along s.
    pub fn exit_for_direction(direction: f64) -> Self {
        if direction >= 0.0 {
            ContactPoint::End
        } else {
            ContactPoint::Start
        }
    }
}

impl Road {
    /// Clamp `s` into the road's domain.
    pub fn clamp_s(&self, s: f64) -> f64 {
        clamp(s, 0.0, self.length)
    }

    /// Arc-length of the given end of the road.
    pub fn s_at(&self, end: ContactPoint) -> f64 {
        match end {
            ContactPoint::Start => 0.0,
            ContactPoint::End => self.length,
        }
    }

    /// The link leaving the given end of the road.
    pub fn link_at(&self, end: ContactPoint) -> Option<&LinkTarget> {
        match end {
            ContactPoint::Start => self.link.predecessor.as_ref(),
            ContactPoint::End => self.link.successor.as_ref(),
        }
    }

    pub fn geometry_by_s(&self, s: f64) -> Option<&Geometry> {
        self.geometries
            .iter()
            .rev()
            .find(|g| g.s <= s)
            .or_else(|| self.geometries.first())
    }

    /// Evaluate the reference line at `s` (clamped into the road).
    pub fn ref_point(&self, s: f64) -> RefPoint {
        let s = self.clamp_s(s);

        let geom = match self.geometry_by_s(s) {
            Some(g) => g.eval(s - g.s),
            None => return RefPoint::default(),
        };

        let (z, dz) = match Poly3::record_at(&self.elevations, s) {
            Some(r) => (r.value(s), r.slope(s)),
            None => (0.0, 0.0),
        };

        let roll_rad = Poly3::eval_records(&self.superelevations, s).unwrap_or(0.0);

        RefPoint {
            position_m: Vector3::new(geom.position_m.x, geom.position_m.y, z),
            heading_rad: geom.heading_rad,
            // Positive pitch is nose down, so climbing gives a negative pitch
            pitch_rad: -dz.atan(),
            roll_rad,
            curvature_m: geom.curvature_m,
        }
    }

    /// Index of the lane section containing `s`.
    pub fn lane_section_idx_by_s(&self, s: f64) -> usize {
        self.lane_sections
            .iter()
            .rposition(|ls| ls.s <= s)
            .unwrap_or(0)
    }

    pub fn lane_section_by_s(&self, s: f64) -> Option<&LaneSection> {
        self.lane_sections.get(self.lane_section_idx_by_s(s))
    }

    /// Get a lane by id in the section containing `s`.
    pub fn lane_by_s(&self, s: f64, lane_id: i32) -> Option<&Lane> {
        self.lane_section_by_s(s)?.lane_by_id(lane_id)
    }

    /// Width of a lane at `s`.
    ///
    /// Returns 0 if `s` is outside the road or the lane does not exist at `s`.
    pub fn lane_width_by_s(&self, s: f64, lane_id: i32) -> f64 {
        if s < 0.0 || s > self.length {
            return 0.0;
        }

        match self.lane_section_by_s(s) {
            Some(ls) => ls
                .lane_by_id(lane_id)
                .map(|l| l.width(s - ls.s))
                .unwrap_or(0.0),
            None => 0.0,
        }
    }

    /// Lateral position of a lane's centre relative to the reference line at `s`.
    pub fn lane_center_t(&self, s: f64, lane_id: i32) -> Option<f64> {
        let ls = self.lane_section_by_s(s)?;
        ls.lane_center_t(s - ls.s, lane_id)
    }

    /// Find the lane containing lateral position `t` at `s`, see [`LaneSection::lane_id_by_t`].
    pub fn lane_id_by_t(&self, s: f64, t: f64) -> Option<(i32, f64)> {
        let ls = self.lane_section_by_s(s)?;
        Some(ls.lane_id_by_t(s - ls.s, t))
    }

    /// Lateral extent `(right, left)` of the road at `s`, `right` being negative.
    pub fn lateral_extent(&self, s: f64) -> (f64, f64) {
        match self.lane_section_by_s(s) {
            Some(ls) => (-ls.right_width(s - ls.s), ls.left_width(s - ls.s)),
            None => (0.0, 0.0),
        }
    }

    /// Ids of the drivable lanes at `s` in ascending order.
    pub fn drivable_lane_ids(&self, s: f64) -> Vec<i32> {
        self.lane_section_by_s(s)
            .map(|ls| ls.drivable_lane_ids())
            .unwrap_or_default()
    }

    /// Speed limit at `s` in m/s, 0 if the road has no speed records.
    pub fn speed_by_s(&self, s: f64) -> f64 {
        self.speeds
            .iter()
            .rev()
            .find(|r| r.s <= s)
            .or_else(|| self.speeds.first())
            .map(|r| r.max_ms)
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
