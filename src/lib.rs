//! dynpool: pooled short-lived physics objects (debris, sparks, bubbles, fire,
//! smoke, decals) with sub-stepped sphere collision against external geometry.

pub mod flags;
pub mod types;
pub mod error;
pub mod api;
pub mod narrowphase;
pub mod pool;
pub mod config;
pub mod resolver;
pub mod geometry;
pub mod object;
pub mod effects;
pub mod record;
pub mod group;
pub mod world;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::{ConfigError, PhysError};
pub use crate::flags::{BitmaskFlags, GroupFlag, GroupFlags, ObjFlag, ObjFlags, TypeFlag, TypeFlags};
pub use crate::config::{GroupConfig, ObjTypeProps, PredefConfig, SimConfig};
pub use crate::geometry::{StaticScene, SurfaceDesc};
pub use crate::group::{ObjGroup, PredefSlot};
pub use crate::narrowphase::Narrowphase;
pub use crate::pool::{ObjStore, Recyclable};
pub use crate::record::{ObjBody, SimObject};
pub use crate::world::SimWorld;
