//! # Position entity
//!
//! A [`Position`] is where a tracked object sits in the road network. It holds two
//! representations of the same pose:
//!
//! - the track pose: road, lane, arc-length `s`, offset from the lane centre, and angles relative
//!   to the road,
//! - the world pose: cartesian position and absolute heading, pitch and roll.
//!
//! Every setter recomputes the other representation straight away, so reading either one is
//! always consistent with the last write. The [`PoseAuthority`] records which representation was
//! written last.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod convert;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;

use road_net::{RefPoint, RoadNetwork};
use util::maths::wrap_2pi;

use crate::{params::ProjectionParams, PosError};
pub use convert::{track_to_world, world_to_track, Projection, TrackEval};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Track relative pose.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TrackPos {
    pub road_id: i32,

    pub lane_id: i32,

    /// Arc-length along the road's reference line
    pub s: f64,

    /// Lateral offset from the lane centre, positive left
    pub offset: f64,

    /// Lateral distance from the reference line, positive left. Derived from the lane and offset.
    pub t: f64,

    /// Heading relative to the road, in [0, 2pi)
    pub h_rel: f64,

    pub p_rel: f64,

    pub r_rel: f64,
}

/// World pose.
///
/// Angles follow ISO 8855: heading anticlockwise from the x axis, positive pitch nose down,
/// positive roll right side down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WorldPose {
    pub position_m: Vector3<f64>,

    pub heading_rad: f64,

    pub pitch_rad: f64,

    pub roll_rad: f64,
}

/// Which representation of a position was last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PoseAuthority {
    /// Never placed
    Unset,

    /// Set from track coordinates, the world pose is derived
    Track,

    /// Set from world coordinates, the track pose is a projection
    World,
}

#[derive(Debug, Clone)]
pub struct Position {
    track: Option<TrackPos>,

    world: WorldPose,

    /// Reference line at the current arc-length
    ref_point: RefPoint,

    authority: PoseAuthority,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for PoseAuthority {
    fn default() -> Self {
        PoseAuthority::Unset
    }
}

impl WorldPose {
    /// Attitude of the body frame, from heading, pitch and roll.
    pub fn attitude_q(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.roll_rad, self.pitch_rad, self.heading_rad)
    }

    /// Express a world point in the body frame of this pose.
    pub fn to_local(&self, point_m: &Vector3<f64>) -> Vector3<f64> {
        self.attitude_q().inverse() * (point_m - self.position_m)
    }

    fn with_position(self, position_m: Vector3<f64>) -> Self {
        Self { position_m, ..self }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    /// Create a position with no road association.
    pub fn new() -> Self {
        Self {
            track: None,
            world: WorldPose::default(),
            ref_point: RefPoint::default(),
            authority: PoseAuthority::Unset,
        }
    }

    pub fn authority(&self) -> PoseAuthority {
        self.authority
    }

    /// The track pose, `None` if the position has never been placed on a road.
    pub fn track(&self) -> Option<&TrackPos> {
        self.track.as_ref()
    }

    /// The track pose, or `NoRoadAssociation` if the position has never been placed.
    pub fn track_or_err(&self) -> Result<&TrackPos, PosError> {
        self.track.as_ref().ok_or(PosError::NoRoadAssociation)
    }

    pub fn world(&self) -> &WorldPose {
        &self.world
    }

    /// Reference line point at the position's arc-length.
    pub fn ref_point(&self) -> &RefPoint {
        &self.ref_point
    }

    /// Curvature of the reference line at the position's arc-length, positive left.
    pub fn curvature(&self) -> f64 {
        self.ref_point.curvature_m
    }

    /// Place the position by lane coordinates, keeping its relative angles.
    pub fn set_lane_pos(
        &mut self,
        net: &RoadNetwork,
        road_id: i32,
        lane_id: i32,
        s: f64,
        offset: f64,
    ) -> Result<(), PosError> {
        let mut track = self.track.unwrap_or_default();
        track.road_id = road_id;
        track.lane_id = lane_id;
        track.s = s;
        track.offset = offset;

        self.set_track_pos(net, &track)
    }

    /// Place the position by a full track pose, `t` is ignored and recomputed.
    pub fn set_track_pos(&mut self, net: &RoadNetwork, track: &TrackPos) -> Result<(), PosError> {
        let eval = track_to_world(net, track)?;

        self.track = Some(eval.track);
        self.world = eval.world;
        self.ref_point = eval.ref_point;
        self.authority = PoseAuthority::Track;

        Ok(())
    }

    /// Place the position by a full world pose.
    ///
    /// The world pose is stored as given and the track pose is found by projecting onto the
    /// nearest road.
    pub fn set_inertia_pos(
        &mut self,
        net: &RoadNetwork,
        world: &WorldPose,
        params: &ProjectionParams,
    ) -> Result<(), PosError> {
        let p = &world.position_m;
        let proj = world_to_track(net, p.x, p.y, Some(p.z), world.heading_rad, params)?;

        let ref_point = road_ref_point(net, proj.road_id, proj.s)?;

        let h_rel = wrap_2pi(world.heading_rad - ref_point.heading_rad);
        let cos_h = h_rel.cos();

        self.track = Some(TrackPos {
            road_id: proj.road_id,
            lane_id: proj.lane_id,
            s: proj.s,
            offset: proj.offset,
            t: proj.t,
            h_rel,
            p_rel: world.pitch_rad - ref_point.pitch_rad * cos_h,
            r_rel: world.roll_rad - ref_point.roll_rad * cos_h,
        });
        self.world = WorldPose {
            heading_rad: wrap_2pi(world.heading_rad),
            ..*world
        };
        self.ref_point = ref_point;
        self.authority = PoseAuthority::World;

        Ok(())
    }

    /// Place the position by planar coordinates and heading.
    ///
    /// Height, pitch and roll are taken from the road surface at the projected point. `z_hint`
    /// only helps choose between roads stacked above each other.
    pub fn set_xyh_pos(
        &mut self,
        net: &RoadNetwork,
        x: f64,
        y: f64,
        z_hint: Option<f64>,
        heading: f64,
        params: &ProjectionParams,
    ) -> Result<(), PosError> {
        let proj = world_to_track(net, x, y, z_hint, heading, params)?;

        let ref_point = road_ref_point(net, proj.road_id, proj.s)?;
        let h_rel = wrap_2pi(heading - ref_point.heading_rad);

        let surface = convert::world_at(&ref_point, proj.t, h_rel, 0.0, 0.0);

        self.track = Some(TrackPos {
            road_id: proj.road_id,
            lane_id: proj.lane_id,
            s: proj.s,
            offset: proj.offset,
            t: proj.t,
            h_rel,
            p_rel: 0.0,
            r_rel: 0.0,
        });
        self.world = WorldPose {
            position_m: Vector3::new(x, y, surface.position_m.z),
            ..surface
        };
        self.ref_point = ref_point;
        self.authority = PoseAuthority::World;

        Ok(())
    }

    /// Move to a new arc-length on the same road and lane.
    pub fn set_s(&mut self, net: &RoadNetwork, s: f64) -> Result<(), PosError> {
        let mut track = *self.track_or_err()?;
        track.s = s;

        self.set_track_pos(net, &track)
    }

    /// Set the absolute heading, updating the relative heading through the road heading.
    pub fn set_heading(&mut self, heading: f64) {
        let heading = wrap_2pi(heading);

        match self.track {
            Some(ref mut track) => {
                track.h_rel = wrap_2pi(heading - self.ref_point.heading_rad);
                self.world = convert::world_at(
                    &self.ref_point,
                    track.t,
                    track.h_rel,
                    track.p_rel,
                    track.r_rel,
                )
                .with_position(self.world.position_m);
            }
            None => self.world.heading_rad = heading,
        }

        trace!("Heading set to {:.4} rad", heading);
    }

    /// Set the heading relative to the road, updating the absolute heading.
    ///
    /// Has no effect on a position with no road association.
    pub fn set_heading_relative(&mut self, h_rel: f64) {
        if let Some(ref mut track) = self.track {
            track.h_rel = wrap_2pi(h_rel);
            self.world = convert::world_at(
                &self.ref_point,
                track.t,
                track.h_rel,
                track.p_rel,
                track.r_rel,
            )
            .with_position(self.world.position_m);
        }
    }
}

fn road_ref_point(net: &RoadNetwork, road_id: i32, s: f64) -> Result<RefPoint, PosError> {
    net.road_by_id(road_id)
        .map(|r| r.ref_point(s))
        .ok_or(PosError::UnknownRoad(road_id))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use road_net::{builder::RoadBuilder, Lane, NetworkDescription};
    use std::f64::consts::{FRAC_PI_2, PI};

    fn network() -> RoadNetwork {
        RoadNetwork::new(NetworkDescription {
            name: "position".into(),
            roads: vec![RoadBuilder::new(1)
                .line(100.0)
                .lanes(vec![Lane::driving(-1, 3.5), Lane::driving(1, 3.5)])
                .build()],
            junctions: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_new_position_is_unset() {
        let pos = Position::new();

        assert_eq!(pos.authority(), PoseAuthority::Unset);
        assert!(pos.track().is_none());
        assert!(matches!(pos.track_or_err(), Err(PosError::NoRoadAssociation)));
    }

    #[test]
    fn test_set_lane_pos() {
        let net = network();
        let mut pos = Position::new();

        pos.set_lane_pos(&net, 1, -1, 30.0, 0.25).unwrap();

        let track = pos.track().unwrap();
        assert_eq!(pos.authority(), PoseAuthority::Track);
        assert_eq!(track.road_id, 1);
        assert!((track.t + 1.5).abs() < 1e-12);
        assert!((pos.world().position_m.x - 30.0).abs() < 1e-12);
        assert!((pos.world().position_m.y + 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_failed_set_leaves_position_unchanged() {
        let net = network();
        let mut pos = Position::new();
        pos.set_lane_pos(&net, 1, -1, 30.0, 0.0).unwrap();
        let before = *pos.track().unwrap();

        assert!(pos.set_lane_pos(&net, 7, -1, 30.0, 0.0).is_err());
        assert!(pos.set_lane_pos(&net, 1, -3, 30.0, 0.0).is_err());
        assert!(pos
            .set_inertia_pos(
                &net,
                &WorldPose {
                    position_m: Vector3::new(500.0, 500.0, 0.0),
                    ..Default::default()
                },
                &ProjectionParams::default()
            )
            .is_err());

        assert_eq!(*pos.track().unwrap(), before);
        assert_eq!(pos.authority(), PoseAuthority::Track);
    }

    #[test]
    fn test_set_s_requires_road() {
        let net = network();
        let mut pos = Position::new();

        assert!(matches!(
            pos.set_s(&net, 10.0),
            Err(PosError::NoRoadAssociation)
        ));

        pos.set_lane_pos(&net, 1, 1, 10.0, 0.0).unwrap();
        pos.set_s(&net, 20.0).unwrap();
        assert_eq!(pos.track().unwrap().s, 20.0);
        assert!((pos.world().position_m.x - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_set_inertia_pos() {
        let net = network();
        let mut pos = Position::new();

        let world = WorldPose {
            position_m: Vector3::new(42.0, 2.0, 0.0),
            heading_rad: PI,
            pitch_rad: 0.0,
            roll_rad: 0.0,
        };
        pos.set_inertia_pos(&net, &world, &ProjectionParams::default())
            .unwrap();

        let track = pos.track().unwrap();
        assert_eq!(pos.authority(), PoseAuthority::World);
        assert_eq!(track.lane_id, 1);
        assert!((track.s - 42.0).abs() < 1e-9);
        assert!((track.offset - 0.25).abs() < 1e-9);
        assert!((track.h_rel - PI).abs() < 1e-12);
        assert_eq!(pos.world().position_m, world.position_m);
    }

    #[test]
    fn test_set_xyh_pos_takes_height_from_road() {
        let net = network();
        let mut pos = Position::new();

        pos.set_xyh_pos(&net, 10.0, -1.0, Some(3.0), 0.0, &ProjectionParams::default())
            .unwrap();

        assert_eq!(pos.world().position_m.z, 0.0);
        assert_eq!(pos.track().unwrap().lane_id, -1);
    }

    #[test]
    fn test_heading_setters() {
        let net = network();
        let mut pos = Position::new();
        pos.set_lane_pos(&net, 1, 1, 10.0, 0.0).unwrap();

        pos.set_heading(-FRAC_PI_2);
        assert!((pos.world().heading_rad - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((pos.track().unwrap().h_rel - 3.0 * FRAC_PI_2).abs() < 1e-12);

        pos.set_heading_relative(PI);
        assert!((pos.world().heading_rad - PI).abs() < 1e-12);

        // Heading changes never move the object
        assert!((pos.world().position_m.x - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_local() {
        let pose = WorldPose {
            position_m: Vector3::new(1.0, 1.0, 0.0),
            heading_rad: FRAC_PI_2,
            ..Default::default()
        };

        // A point ahead of a north facing object
        let local = pose.to_local(&Vector3::new(1.0, 5.0, 0.0));
        assert!((local.x - 4.0).abs() < 1e-12);
        assert!(local.y.abs() < 1e-12);

        // And one to its left
        let local = pose.to_local(&Vector3::new(-2.0, 1.0, 0.0));
        assert!((local.y - 3.0).abs() < 1e-12);
    }
}
