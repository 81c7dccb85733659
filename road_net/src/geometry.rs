//! # Plan view geometry
//!
//! The reference line of a road is a sequence of geometry records. Each record starts at a given
//! arc-length along the road and a given pose, and extends for its own length as either a straight
//! line, a constant curvature arc, or a clothoid spiral (linearly varying curvature).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use util::maths::{clamp, SMALL_NUMBER};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum arc-length of a single Simpson interval when integrating spirals.
const SPIRAL_INTEGRATION_STEP_M: f64 = 0.25;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single plan view geometry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Arc-length along the road at which this record starts
    pub s: f64,

    /// X position of the start of the record
    pub x: f64,

    /// Y position of the start of the record
    pub y: f64,

    /// Heading at the start of the record, radians from the +ve X axis
    pub hdg: f64,

    /// Length of the record along the reference line
    pub length: f64,

    /// The shape of the record
    pub kind: GeometryKind,
}

/// A point on the reference line in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeomPoint {
    pub position_m: Vector2<f64>,

    pub heading_rad: f64,

    /// Signed curvature, positive turning left
    pub curvature_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Shape of a geometry record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryKind {
    Line,
    Arc { curvature: f64 },
    Spiral { curv_start: f64, curv_end: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Geometry {
    /// Evaluate the record at a distance `ds` from its start.
    ///
    /// `ds` is clamped into `[0, length]`.
    pub fn eval(&self, ds: f64) -> GeomPoint {
        let ds = clamp(ds, 0.0, self.length);
        let start = Vector2::new(self.x, self.y);

        match self.kind {
            GeometryKind::Line => GeomPoint {
                position_m: start + ds * Vector2::new(self.hdg.cos(), self.hdg.sin()),
                heading_rad: self.hdg,
                curvature_m: 0.0,
            },
            GeometryKind::Arc { curvature } => {
                // A vanishing curvature would blow up the radius, treat as a line
                if curvature.abs() < SMALL_NUMBER {
                    return GeomPoint {
                        position_m: start + ds * Vector2::new(self.hdg.cos(), self.hdg.sin()),
                        heading_rad: self.hdg,
                        curvature_m: curvature,
                    };
                }

                let heading_rad = self.hdg + curvature * ds;

                // Move around the centre of rotation which is 1/curv away along the left normal
                let offset = Vector2::new(
                    heading_rad.sin() - self.hdg.sin(),
                    self.hdg.cos() - heading_rad.cos(),
                ) / curvature;

                GeomPoint {
                    position_m: start + offset,
                    heading_rad,
                    curvature_m: curvature,
                }
            }
            GeometryKind::Spiral {
                curv_start,
                curv_end,
            } => {
                let curv_rate = if self.length > SMALL_NUMBER {
                    (curv_end - curv_start) / self.length
                } else {
                    0.0
                };

                let heading_at = |u: f64| self.hdg + curv_start * u + 0.5 * curv_rate * u * u;

                GeomPoint {
                    position_m: start + integrate_heading(heading_at, ds),
                    heading_rad: heading_at(ds),
                    curvature_m: curv_start + curv_rate * ds,
                }
            }
        }
    }

    /// Return the point at the end of this record.
    pub fn end(&self) -> GeomPoint {
        self.eval(self.length)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Integrate the unit tangent `[cos(h(u)), sin(h(u))]` from 0 to `ds` with Simpson's rule.
fn integrate_heading<F>(heading_at: F, ds: f64) -> Vector2<f64>
where
    F: Fn(f64) -> f64,
{
    if ds <= 0.0 {
        return Vector2::zeros();
    }

    // Simpson's rule needs an even number of intervals
    let mut num_intervals = (ds / SPIRAL_INTEGRATION_STEP_M).ceil() as usize;
    num_intervals = (num_intervals.max(2) + 1) / 2 * 2;

    let step = ds / num_intervals as f64;
    let tangent = |u: f64| {
        let h = heading_at(u);
        Vector2::new(h.cos(), h.sin())
    };

    let mut sum = tangent(0.0) + tangent(ds);
    for i in 1..num_intervals {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * tangent(i as f64 * step);
    }

    sum * step / 3.0
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_line() {
        let geom = Geometry {
            s: 0.0,
            x: 1.0,
            y: 2.0,
            hdg: FRAC_PI_2,
            length: 10.0,
            kind: GeometryKind::Line,
        };

        let p = geom.eval(4.0);
        assert!((p.position_m - Vector2::new(1.0, 6.0)).norm() < 1e-9);
        assert_eq!(p.curvature_m, 0.0);

        // Clamped beyond the end
        let p = geom.eval(15.0);
        assert!((p.position_m - Vector2::new(1.0, 12.0)).norm() < 1e-9);
    }

    #[test]
    fn test_arc_quarter_circle() {
        // Radius 10 left turn starting at origin heading +X
        let geom = Geometry {
            s: 0.0,
            x: 0.0,
            y: 0.0,
            hdg: 0.0,
            length: 10.0 * FRAC_PI_2,
            kind: GeometryKind::Arc { curvature: 0.1 },
        };

        let p = geom.end();
        assert!((p.position_m - Vector2::new(10.0, 10.0)).norm() < 1e-9);
        assert!((p.heading_rad - FRAC_PI_2).abs() < 1e-12);

        // Right turn mirrors in Y
        let geom = Geometry {
            kind: GeometryKind::Arc { curvature: -0.1 },
            ..geom
        };
        let p = geom.end();
        assert!((p.position_m - Vector2::new(10.0, -10.0)).norm() < 1e-9);
        assert!((p.heading_rad + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_spiral_matches_arc_with_constant_curvature() {
        let arc = Geometry {
            s: 0.0,
            x: 3.0,
            y: -1.0,
            hdg: 0.3,
            length: 20.0 * PI,
            kind: GeometryKind::Arc { curvature: 0.05 },
        };
        let spiral = Geometry {
            kind: GeometryKind::Spiral {
                curv_start: 0.05,
                curv_end: 0.05,
            },
            ..arc.clone()
        };

        for ds in [0.0, 1.0, 13.7, 40.0, 20.0 * PI].iter() {
            let a = arc.eval(*ds);
            let b = spiral.eval(*ds);
            assert!((a.position_m - b.position_m).norm() < 1e-6);
            assert!((a.heading_rad - b.heading_rad).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spiral_curvature_varies_linearly() {
        let spiral = Geometry {
            s: 0.0,
            x: 0.0,
            y: 0.0,
            hdg: 0.0,
            length: 50.0,
            kind: GeometryKind::Spiral {
                curv_start: 0.0,
                curv_end: 0.02,
            },
        };

        assert!((spiral.eval(25.0).curvature_m - 0.01).abs() < 1e-12);
        // Heading is the integral of curvature: 0.5 * 0.02 * 50
        assert!((spiral.end().heading_rad - 0.5).abs() < 1e-12);
        // Turning left so the end point is above the X axis
        assert!(spiral.end().position_m.y > 0.0);
    }
}
