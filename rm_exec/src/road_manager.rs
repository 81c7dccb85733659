//! # Road manager
//!
//! Session context owning the loaded road network, the position registry, the engine parameters
//! and the random number generator used by junction selection.
//!
//! Two surfaces are provided:
//!
//! - typed methods taking [`Handle`]s and returning `Result<_, PosError>`,
//! - a soft failure surface addressed by integer handles. These methods never fail, they log a
//!   warning and return a sentinel value instead (-1 for status codes), and write their outputs
//!   into plain `#[repr(C)]` structs of 32-bit values.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    convert::TryFrom,
    f64::consts::PI,
    path::Path,
    sync::Arc,
};

use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use road_net::RoadNetwork;

use crate::{
    delta::{delta, PositionDiff},
    geometry,
    mover::{move_along_s, JunctionStrategy, MoveStatus},
    params::EngineParams,
    position::{Position, WorldPose},
    registry::{Handle, PositionRegistry},
    steering::{steering_target, SteeringTargetInfo},
    PosError,
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

pub struct RoadManager {
    network: Option<Arc<RoadNetwork>>,

    registry: PositionRegistry,

    params: EngineParams,

    rng: ChaCha8Rng,
}

/// Position data of the soft failure surface.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RmPositionData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub h: f32,
    pub p: f32,
    pub r: f32,
    pub h_relative: f32,
    pub road_id: i32,
    pub lane_id: i32,
    pub lane_offset: f32,
    pub s: f32,
}

/// Road and lane information of the soft failure surface.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RmRoadLaneInfo {
    pub pos: [f32; 3],
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
    pub width: f32,
    pub curvature: f32,
    pub speed_limit: f32,
}

/// Steering target of the soft failure surface.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RmSteeringTargetInfo {
    pub global_pos: [f32; 3],
    pub local_pos: [f32; 3],
    pub angle: f32,
    pub curvature: f32,
    pub road_heading: f32,
    pub road_pitch: f32,
    pub road_roll: f32,
    pub speed_limit: f32,
}

/// Position difference of the soft failure surface.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RmPositionDiff {
    pub ds: f32,
    pub dt: f32,
    pub d_lane_id: i32,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl RoadManager {
    /// Create a manager with no network loaded.
    pub fn new(params: EngineParams) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(params.rng_seed);

        Self {
            network: None,
            registry: PositionRegistry::new(),
            params,
            rng,
        }
    }

    // ---- TYPED SURFACE ----

    /// Load a network description, replacing any loaded network and clearing the registry.
    ///
    /// If loading fails no network is loaded afterwards.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PosError> {
        self.close();

        let net = RoadNetwork::load(path.as_ref())?;

        info!(
            "Loaded road network \"{}\" with {} roads from {:?}",
            net.name(),
            net.num_roads(),
            path.as_ref()
        );

        self.network = Some(Arc::new(net));
        Ok(())
    }

    /// Use an already built network, replacing any loaded network and clearing the registry.
    pub fn set_network(&mut self, net: Arc<RoadNetwork>) {
        self.close();
        self.network = Some(net);
    }

    /// Drop the network and every position.
    pub fn close(&mut self) {
        if self.network.take().is_some() {
            info!("Road network closed");
        }
        self.registry.clear();
    }

    pub fn network(&self) -> Result<&Arc<RoadNetwork>, PosError> {
        self.network.as_ref().ok_or(PosError::NotLoaded)
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn registry(&self) -> &PositionRegistry {
        &self.registry
    }

    /// Add an unplaced position.
    pub fn create(&mut self) -> Handle {
        self.registry.create()
    }

    pub fn position(&self, handle: Handle) -> Result<&Position, PosError> {
        self.registry.get(handle)
    }

    /// Typed handle for an integer handle, requiring a loaded network.
    pub fn handle(&self, index: i32) -> Result<Handle, PosError> {
        self.network()?;

        let index = usize::try_from(index).map_err(|_| PosError::InvalidHandle(index as i64))?;
        self.registry.handle_at(index)
    }

    pub fn set_lane_pos(
        &mut self,
        handle: Handle,
        road_id: i32,
        lane_id: i32,
        s: f64,
        offset: f64,
    ) -> Result<(), PosError> {
        let net = Arc::clone(self.network()?);
        self.registry
            .get_mut(handle)?
            .set_lane_pos(&net, road_id, lane_id, s, offset)
    }

    pub fn set_inertia_pos(&mut self, handle: Handle, world: &WorldPose) -> Result<(), PosError> {
        let net = Arc::clone(self.network()?);
        self.registry
            .get_mut(handle)?
            .set_inertia_pos(&net, world, &self.params.projection)
    }

    pub fn set_xyh_pos(
        &mut self,
        handle: Handle,
        x: f64,
        y: f64,
        z_hint: Option<f64>,
        heading: f64,
    ) -> Result<(), PosError> {
        let net = Arc::clone(self.network()?);
        self.registry
            .get_mut(handle)?
            .set_xyh_pos(&net, x, y, z_hint, heading, &self.params.projection)
    }

    /// Move a position to a new arc-length on its road and lane.
    pub fn set_track_s(&mut self, handle: Handle, s: f64) -> Result<(), PosError> {
        let net = Arc::clone(self.network()?);
        self.registry.get_mut(handle)?.set_s(&net, s)
    }

    pub fn move_position(
        &mut self,
        handle: Handle,
        ds: f64,
        strategy: JunctionStrategy,
    ) -> Result<MoveStatus, PosError> {
        let net = Arc::clone(self.network()?);
        let pos = self.registry.get_mut(handle)?;

        move_along_s(&net, pos, ds, strategy, &mut self.rng, &self.params.mover)
    }

    /// Steering target using the configured junction strategy.
    pub fn steering_target(
        &mut self,
        handle: Handle,
        lookahead_m: f64,
        along_reference_lane: bool,
    ) -> Result<SteeringTargetInfo, PosError> {
        let net = Arc::clone(self.network()?);
        let pos = self.registry.get(handle)?;

        steering_target(
            &net,
            pos,
            lookahead_m,
            along_reference_lane,
            self.params.steering.strategy,
            &mut self.rng,
            &self.params,
        )
    }

    /// Road and lane information at the position and `lookahead_m` ahead of it.
    ///
    /// Position, road heading, pitch and roll are those of the look-ahead point. Curvature, lane
    /// width and speed limit are those at the position itself.
    pub fn lane_info(
        &mut self,
        handle: Handle,
        lookahead_m: f64,
    ) -> Result<geometry::RoadLaneInfo, PosError> {
        let net = Arc::clone(self.network()?);
        let pos = self.registry.get(handle)?;

        let ahead = geometry::road_lane_info(
            &net,
            pos,
            lookahead_m,
            self.params.steering.strategy,
            &mut self.rng,
            &self.params,
        )?;

        Ok(geometry::RoadLaneInfo {
            width_m: geometry::position_lane_width(&net, pos),
            curvature_m: geometry::position_curvature(pos),
            speed_limit_ms: geometry::position_speed_limit(&net, pos),
            ..ahead
        })
    }

    /// Offset of position `a` relative to position `b`.
    pub fn delta(&self, a: Handle, b: Handle) -> Result<PositionDiff, PosError> {
        let net = self.network()?;

        delta(
            net,
            self.registry.get(a)?,
            self.registry.get(b)?,
            self.params.delta.max_hops,
        )
    }

    // ---- SOFT FAILURE SURFACE ----

    /// Load a network, returns 0 on success and -1 on failure.
    pub fn init<P: AsRef<Path>>(&mut self, path: P) -> i32 {
        status(soft("init", self.load(path)))
    }

    /// Close the network, always returns 0.
    pub fn close_network(&mut self) -> i32 {
        self.close();
        0
    }

    /// Add a position and return its integer handle.
    pub fn create_position(&mut self) -> i32 {
        self.create().index() as i32
    }

    pub fn get_number_of_roads(&self) -> i32 {
        soft("get_number_of_roads", self.network())
            .map(|net| net.num_roads() as i32)
            .unwrap_or(0)
    }

    /// Id of the road at `index`, -1 if there is none.
    pub fn get_id_of_road_from_index(&self, index: i32) -> i32 {
        let res = self.network().and_then(|net| {
            usize::try_from(index)
                .ok()
                .and_then(|i| net.road_by_idx(i))
                .map(|r| r.id)
                .ok_or(PosError::InvalidHandle(index as i64))
        });

        soft("get_id_of_road_from_index", res).unwrap_or(-1)
    }

    /// Length of a road, 0 if it does not exist.
    pub fn get_road_length(&self, road_id: i32) -> f32 {
        let res = self.network().and_then(|net| {
            net.road_by_id(road_id)
                .map(|r| r.length as f32)
                .ok_or(PosError::UnknownRoad(road_id))
        });

        soft("get_road_length", res).unwrap_or(0.0)
    }

    /// Number of drivable lanes at `s`.
    pub fn get_road_number_of_lanes(&self, road_id: i32, s: f32) -> i32 {
        soft("get_road_number_of_lanes", self.network())
            .map(|net| geometry::num_drivable_lanes(net, road_id, s as f64) as i32)
            .unwrap_or(0)
    }

    /// Id of the `index`th drivable lane at `s`, 0 if there is no such lane.
    pub fn get_lane_id_by_index(&self, road_id: i32, index: i32, s: f32) -> i32 {
        soft("get_lane_id_by_index", self.network())
            .and_then(|net| {
                let index = usize::try_from(index).ok()?;
                geometry::drivable_lane_id_by_index(net, road_id, index, s as f64)
            })
            .unwrap_or(0)
    }

    /// Place a position by lane coordinates.
    ///
    /// With `align` the relative heading is set to the lane's driving direction: along the road
    /// for right lanes, against it for left lanes.
    pub fn set_lane_position(
        &mut self,
        handle: i32,
        road_id: i32,
        lane_id: i32,
        lane_offset: f32,
        s: f32,
        align: bool,
    ) -> i32 {
        let res = self.handle(handle).and_then(|h| {
            self.set_lane_pos(h, road_id, lane_id, s as f64, lane_offset as f64)?;

            if align {
                let h_rel = if lane_id < 0 { 0.0 } else { PI };
                self.registry.get_mut(h)?.set_heading_relative(h_rel);
            }

            Ok(())
        });

        status(soft("set_lane_position", res))
    }

    pub fn set_world_position(
        &mut self,
        handle: i32,
        x: f32,
        y: f32,
        z: f32,
        h: f32,
        p: f32,
        r: f32,
    ) -> i32 {
        let world = WorldPose {
            position_m: nalgebra::Vector3::new(x as f64, y as f64, z as f64),
            heading_rad: h as f64,
            pitch_rad: p as f64,
            roll_rad: r as f64,
        };

        let res = self
            .handle(handle)
            .and_then(|hd| self.set_inertia_pos(hd, &world));

        status(soft("set_world_position", res))
    }

    /// Place a position by x, y and heading. `z` only disambiguates stacked roads.
    pub fn set_world_xyzh_position(&mut self, handle: i32, x: f32, y: f32, z: f32, h: f32) -> i32 {
        let res = self.handle(handle).and_then(|hd| {
            self.set_xyh_pos(hd, x as f64, y as f64, Some(z as f64), h as f64)
        });

        status(soft("set_world_xyzh_position", res))
    }

    pub fn set_s(&mut self, handle: i32, s: f32) -> i32 {
        let res = self
            .handle(handle)
            .and_then(|h| self.set_track_s(h, s as f64));

        status(soft("set_s", res))
    }

    /// Move a position along its road, returning the [`MoveStatus`] code or -1 on failure.
    pub fn position_move_forward(&mut self, handle: i32, dist: f32, strategy: i32) -> i32 {
        let res = JunctionStrategy::try_from(strategy).and_then(|strategy| {
            let h = self.handle(handle)?;
            self.move_position(h, dist as f64, strategy)
        });

        soft("position_move_forward", res)
            .map(|s| s.code())
            .unwrap_or(-1)
    }

    pub fn get_position_data(&self, handle: i32, data: &mut RmPositionData) -> i32 {
        let res = self.handle(handle).and_then(|h| {
            let pos = self.registry.get(h)?;
            let track = pos.track_or_err()?;
            let world = pos.world();

            *data = RmPositionData {
                x: world.position_m.x as f32,
                y: world.position_m.y as f32,
                z: world.position_m.z as f32,
                h: world.heading_rad as f32,
                p: world.pitch_rad as f32,
                r: world.roll_rad as f32,
                h_relative: track.h_rel as f32,
                road_id: track.road_id,
                lane_id: track.lane_id,
                lane_offset: track.offset as f32,
                s: track.s as f32,
            };

            Ok(())
        });

        status(soft("get_position_data", res))
    }

    pub fn get_lane_info(
        &mut self,
        handle: i32,
        lookahead_distance: f32,
        data: &mut RmRoadLaneInfo,
    ) -> i32 {
        let res = self.handle(handle).and_then(|h| {
            let pos = self.registry.get(h)?.world().position_m;
            let info = self.lane_info(h, lookahead_distance as f64)?;

            *data = RmRoadLaneInfo {
                pos: [pos.x as f32, pos.y as f32, pos.z as f32],
                heading: info.heading_rad as f32,
                pitch: info.pitch_rad as f32,
                roll: info.roll_rad as f32,
                width: info.width_m as f32,
                curvature: info.curvature_m as f32,
                speed_limit: info.speed_limit_ms as f32,
            };

            Ok(())
        });

        status(soft("get_lane_info", res))
    }

    /// Speed limit at a position in m/s, -1 on failure.
    pub fn get_speed_limit(&self, handle: i32) -> f32 {
        let res = self.handle(handle).and_then(|h| {
            let pos = self.registry.get(h)?;
            pos.track_or_err()?;

            Ok(geometry::position_speed_limit(self.network()?, pos) as f32)
        });

        soft("get_speed_limit", res).unwrap_or(-1.0)
    }

    pub fn get_steering_target(
        &mut self,
        handle: i32,
        lookahead_distance: f32,
        data: &mut RmSteeringTargetInfo,
        along_reference_lane: bool,
    ) -> i32 {
        let res = self.handle(handle).and_then(|h| {
            let t = self.steering_target(h, lookahead_distance as f64, along_reference_lane)?;

            *data = RmSteeringTargetInfo {
                global_pos: to_f32_array(&t.global_pos_m),
                local_pos: to_f32_array(&t.local_pos_m),
                angle: t.angle_rad as f32,
                curvature: t.curvature_m as f32,
                road_heading: t.road_heading_rad as f32,
                road_pitch: t.road_pitch_rad as f32,
                road_roll: t.road_roll_rad as f32,
                speed_limit: t.speed_limit_ms as f32,
            };

            Ok(())
        });

        status(soft("get_steering_target", res))
    }

    /// Offset of position `b` relative to position `a`, that is `b - a`.
    ///
    /// Returns false, leaving `diff` untouched, if the positions cannot be related.
    pub fn subtract_a_from_b(&self, a: i32, b: i32, diff: &mut RmPositionDiff) -> bool {
        let res = self
            .handle(a)
            .and_then(|ha| Ok((ha, self.handle(b)?)))
            .and_then(|(ha, hb)| self.delta(hb, ha));

        match soft("subtract_a_from_b", res) {
            Some(d) => {
                *diff = RmPositionDiff {
                    ds: d.ds as f32,
                    dt: d.dt as f32,
                    d_lane_id: d.d_lane_id,
                };
                true
            }
            None => false,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Log a failed soft surface call.
fn soft<T>(op: &str, res: Result<T, PosError>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{} failed: {}", op, e);
            None
        }
    }
}

fn status(res: Option<()>) -> i32 {
    match res {
        Some(()) => 0,
        None => -1,
    }
}

fn to_f32_array(v: &nalgebra::Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
