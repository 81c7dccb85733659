//! # Road network model
//!
//! An immutable, in-memory model of a road network: roads with their reference line geometry,
//! lane sections and lanes, speed profiles, and the links and junctions that join roads together.
//!
//! Networks are either built in code with [`builder::RoadBuilder`] or deserialised from a JSON or
//! TOML description with [`RoadNetwork::load`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod builder;
pub mod geometry;
pub mod junction;
pub mod lane;
pub mod network;
pub mod road;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use geometry::{Geometry, GeometryKind};
pub use junction::{Connection, Junction, JunctionLaneLink};
pub use lane::{Lane, LaneKind, LaneLink, LaneSection};
pub use network::{NetworkDescription, Neighbour, RoadNetwork};
pub use road::{ContactPoint, LinkTarget, Poly3, RefPoint, Road, RoadLink, SpeedRecord};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while loading or building a road network.
#[derive(Debug, thiserror::Error)]
pub enum RoadNetError {
    #[error("Cannot load the network file: {0}")]
    FileLoad(std::io::Error),

    #[error("Cannot parse the JSON network description: {0}")]
    JsonParse(serde_json::Error),

    #[error("Cannot parse the TOML network description: {0}")]
    TomlParse(toml::de::Error),

    #[error("Unrecognised network file format for {0:?}, expected .json or .toml")]
    UnknownFormat(std::path::PathBuf),

    #[error("Invalid road network: {0}")]
    Invalid(String),

    #[error("Link references unknown road {0}")]
    UnknownRoad(i32),

    #[error("Link references unknown junction {0}")]
    UnknownJunction(i32),
}
