//! # Lanes and lane sections
//!
//! Lanes are identified by a signed id. Lane 0 is the zero-width reference lane lying on the
//! road's reference line, lanes with positive ids lie to the left of it (numbered outwards) and
//! lanes with negative ids to the right.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::road::Poly3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A run of road over which the set of lanes is constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSection {
    /// Arc-length along the road at which this section starts
    pub s: f64,

    /// Lanes in the section, sorted by ascending id
    pub lanes: Vec<Lane>,
}

/// A single lane within a lane section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: i32,

    #[serde(default)]
    pub kind: LaneKind,

    /// Width records, with `s` relative to the start of the lane section
    #[serde(default)]
    pub widths: Vec<Poly3>,

    #[serde(default)]
    pub link: LaneLink,
}

/// Links from a lane to lanes in the neighbouring section or road.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LaneLink {
    pub predecessor: Option<i32>,
    pub successor: Option<i32>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneKind {
    Driving,
    Shoulder,
    Sidewalk,
    Border,
    Parking,
    Biking,
    Restricted,
    Median,
    None,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LaneKind {
    fn default() -> Self {
        LaneKind::Driving
    }
}

impl Lane {
    /// Create a lane of constant width.
    pub fn new(id: i32, kind: LaneKind, width_m: f64) -> Self {
        let widths = if id == 0 {
            Vec::new()
        } else {
            vec![Poly3::constant(0.0, width_m)]
        };

        Self {
            id,
            kind,
            widths,
            link: LaneLink::default(),
        }
    }

    /// Create a driving lane of constant width.
    pub fn driving(id: i32, width_m: f64) -> Self {
        Self::new(id, LaneKind::Driving, width_m)
    }

    /// Create the reference lane.
    pub fn reference() -> Self {
        Self::new(0, LaneKind::None, 0.0)
    }

    /// Set the lane links of this lane.
    pub fn with_link(mut self, predecessor: Option<i32>, successor: Option<i32>) -> Self {
        self.link = LaneLink {
            predecessor,
            successor,
        };
        self
    }

    pub fn is_driving(&self) -> bool {
        self.kind == LaneKind::Driving
    }

    /// Width of the lane at `ds` metres from the start of its lane section.
    ///
    /// The reference lane and lanes without width records have zero width.
    pub fn width(&self, ds: f64) -> f64 {
        if self.id == 0 {
            return 0.0;
        }

        Poly3::eval_records(&self.widths, ds)
            .map(|w| w.max(0.0))
            .unwrap_or(0.0)
    }
}

impl LaneSection {
    /// Create a new section, sorting the lanes and adding the reference lane if it is missing.
    pub fn new(s: f64, lanes: Vec<Lane>) -> Self {
        let mut section = Self { s, lanes };
        section.normalise();
        section
    }

    /// Sort the lanes and make lane 0 a zero-width, non-drivable reference lane, adding it if it
    /// is missing.
    pub fn normalise(&mut self) {
        match self.lanes.iter_mut().find(|l| l.id == 0) {
            Some(reference) => {
                reference.kind = LaneKind::None;
                reference.widths.clear();
            }
            None => self.lanes.push(Lane::reference()),
        }

        self.lanes.sort_by_key(|l| l.id);
    }

    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    pub fn lane_by_idx(&self, idx: usize) -> Option<&Lane> {
        self.lanes.get(idx)
    }

    pub fn lane_by_id(&self, id: i32) -> Option<&Lane> {
        self.lanes
            .binary_search_by_key(&id, |l| l.id)
            .ok()
            .map(|i| &self.lanes[i])
    }

    /// Ids of all drivable lanes in ascending order.
    pub fn drivable_lane_ids(&self) -> Vec<i32> {
        self.lanes
            .iter()
            .filter(|l| l.is_driving())
            .map(|l| l.id)
            .collect()
    }

    /// Get the signed lateral limits `(inner, outer)` of a lane relative to the reference line,
    /// `ds` metres into the section.
    ///
    /// For left lanes both values are positive with `inner <= outer`, for right lanes both are
    /// negative with `inner >= outer`. The reference lane returns `(0, 0)`.
    pub fn lane_bounds(&self, ds: f64, id: i32) -> Option<(f64, f64)> {
        self.lane_by_id(id)?;

        let side = id.signum();
        let mut inner = 0.0;

        // Walk outwards from the reference lane summing the widths of the lanes in between
        let mut current = side;
        while current != id {
            inner += self.lane_by_id(current).map(|l| l.width(ds)).unwrap_or(0.0);
            current += side;
        }

        let width = self.lane_by_id(id).map(|l| l.width(ds)).unwrap_or(0.0);

        Some((side as f64 * inner, side as f64 * (inner + width)))
    }

    /// Lateral position of the centre of a lane relative to the reference line.
    pub fn lane_center_t(&self, ds: f64, id: i32) -> Option<f64> {
        self.lane_bounds(ds, id).map(|(inner, outer)| 0.5 * (inner + outer))
    }

    /// Total width of the lanes on the left of the reference line.
    pub fn left_width(&self, ds: f64) -> f64 {
        self.lanes
            .iter()
            .filter(|l| l.id > 0)
            .map(|l| l.width(ds))
            .sum()
    }

    /// Total width of the lanes on the right of the reference line.
    pub fn right_width(&self, ds: f64) -> f64 {
        self.lanes
            .iter()
            .filter(|l| l.id < 0)
            .map(|l| l.width(ds))
            .sum()
    }

    /// Find the lane containing the lateral position `t`, returning the lane id and the offset of
    /// `t` from that lane's centre.
    ///
    /// Positions beyond the outermost lane snap to that lane (giving a large offset). A position
    /// exactly on the reference line is placed in the first right lane if there is one, otherwise
    /// the first left lane. If there are no lanes on the side of `t` the reference lane is used.
    pub fn lane_id_by_t(&self, ds: f64, t: f64) -> (i32, f64) {
        let side = if t < 0.0 {
            -1
        } else if t > 0.0 {
            1
        } else if self.lane_by_id(-1).is_some() {
            -1
        } else {
            1
        };

        let mut id = side;
        let mut found = None;
        while let Some((inner, outer)) = self.lane_bounds(ds, id) {
            let (lo, hi) = if side > 0 { (inner, outer) } else { (outer, inner) };
            found = Some(id);
            if t >= lo && t <= hi {
                break;
            }
            id += side;
        }

        match found {
            Some(id) => {
                let center = self.lane_center_t(ds, id).unwrap_or(0.0);
                (id, t - center)
            }
            None => (0, t),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn section() -> LaneSection {
        LaneSection::new(
            0.0,
            vec![
                Lane::driving(1, 3.5),
                Lane::new(2, LaneKind::Shoulder, 1.0),
                Lane::driving(-1, 3.0),
                Lane::new(-2, LaneKind::Sidewalk, 2.0),
            ],
        )
    }

    #[test]
    fn test_lane_section_sorted_with_reference() {
        let sec = section();
        let ids: Vec<i32> = sec.lanes.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![-2, -1, 0, 1, 2]);
        assert_eq!(sec.drivable_lane_ids(), vec![-1, 1]);
    }

    #[test]
    fn test_normalise_reference_lane() {
        // A described lane 0 defaults to driving and may carry a width
        let mut sec = LaneSection {
            s: 0.0,
            lanes: vec![
                Lane::driving(1, 3.5),
                Lane::driving(0, 2.0),
                Lane::driving(-1, 3.5),
            ],
        };
        sec.normalise();

        assert_eq!(sec.drivable_lane_ids(), vec![-1, 1]);
        assert_eq!(sec.lane_by_id(0).map(|l| l.kind), Some(LaneKind::None));
        assert!(sec.lane_by_id(0).unwrap().widths.is_empty());

        let mut missing = LaneSection {
            s: 0.0,
            lanes: vec![Lane::driving(-1, 3.5)],
        };
        missing.normalise();
        let ids: Vec<i32> = missing.lanes.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![-1, 0]);
    }

    #[test]
    fn test_lane_bounds_and_centres() {
        let sec = section();
        assert_eq!(sec.lane_bounds(0.0, 1), Some((0.0, 3.5)));
        assert_eq!(sec.lane_bounds(0.0, 2), Some((3.5, 4.5)));
        assert_eq!(sec.lane_bounds(0.0, -2), Some((-3.0, -5.0)));
        assert_eq!(sec.lane_center_t(0.0, -1), Some(-1.5));
        assert_eq!(sec.lane_center_t(0.0, 0), Some(0.0));
        assert_eq!(sec.lane_center_t(0.0, 3), None);
        assert_eq!(sec.left_width(0.0), 4.5);
        assert_eq!(sec.right_width(0.0), 5.0);
    }

    #[test]
    fn test_lane_id_by_t() {
        let sec = section();
        assert_eq!(sec.lane_id_by_t(0.0, 1.0), (1, 1.0 - 1.75));
        assert_eq!(sec.lane_id_by_t(0.0, 4.0), (2, 0.0));
        assert_eq!(sec.lane_id_by_t(0.0, -4.0), (-2, 0.0));
        assert_eq!(sec.lane_id_by_t(0.0, 0.0), (-1, 1.5));
        // Beyond the outer edge snaps to the outermost lane
        assert_eq!(sec.lane_id_by_t(0.0, 6.0), (2, 2.0));
    }

    #[test]
    fn test_width_polynomial() {
        let lane = Lane {
            id: -1,
            kind: LaneKind::Driving,
            widths: vec![Poly3::new(0.0, 3.0, 0.1, 0.0, 0.0), Poly3::constant(10.0, 5.0)],
            link: LaneLink::default(),
        };

        assert!((lane.width(5.0) - 3.5).abs() < 1e-12);
        assert_eq!(lane.width(12.0), 5.0);
        assert_eq!(Lane::reference().width(1.0), 0.0);
    }
}
