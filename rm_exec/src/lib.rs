//! # Road manager library.
//!
//! Road-relative positioning on top of a [`road_net::RoadNetwork`]. Tracked objects are
//! represented by [`position::Position`]s which hold both a world pose and a track pose (road,
//! lane, arc-length, lateral offset), and the modules here answer geometric queries about them.
//!
//! Every component takes the network explicitly. [`road_manager::RoadManager`] bundles a loaded
//! network with a registry of positions and exposes the handle based surface.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Delta engine - relative offset between two positions, possibly on different roads
pub mod delta;

/// Geometry queries - lane width, speed limit, curvature at an offset, drivable lanes
pub mod geometry;

/// Longitudinal mover - advances positions along the network, resolving junctions
pub mod mover;

/// Engine parameters
pub mod params;

/// Position entity - world and track poses of a tracked object
pub mod position;

/// Position registry - arena of positions addressed by handles
pub mod registry;

/// Road manager - session context owning the network and the registry
pub mod road_manager;

/// Steering target projector - read-only look-ahead along the network
pub mod steering;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use delta::PositionDiff;
pub use mover::{JunctionStrategy, MoveStatus};
pub use params::EngineParams;
pub use position::{PoseAuthority, Position, TrackPos, WorldPose};
pub use registry::{Handle, PositionRegistry};
pub use road_manager::RoadManager;
pub use steering::SteeringTargetInfo;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by position queries and conversions.
///
/// A conversion which fails leaves the position it was called on unchanged.
#[derive(Debug, thiserror::Error)]
pub enum PosError {
    #[error("No road network is loaded")]
    NotLoaded,

    #[error("Handle {0} does not refer to a position")]
    InvalidHandle(i64),

    #[error("Handle belongs to a registry which has since been cleared")]
    StaleHandle,

    #[error("Road {0} is not in the network")]
    UnknownRoad(i32),

    #[error("Lane {lane} does not exist on road {road} at the requested arc-length")]
    UnknownLane { road: i32, lane: i32 },

    #[error("No valid continuation on the network")]
    OffRoad,

    #[error("No road found near ({x:.3}, {y:.3})")]
    ProjectionFailed { x: f64, y: f64 },

    #[error("Road graph search exceeded its bound of {0}")]
    SearchExhausted(usize),

    #[error("The two positions are not connected by the road network")]
    NoRelation,

    #[error("The position has not been placed on a road")]
    NoRoadAssociation,

    #[error("{0} is not a valid junction strategy code")]
    InvalidStrategy(i32),

    #[error("Could not load the road network: {0}")]
    NetworkLoad(#[from] road_net::RoadNetError),
}
