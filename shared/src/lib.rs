//! Wire model shared by everything that speaks the TankWars protocol.
//!
//! The server streams one JSON object per line. Each object describes the
//! current state of a single entity and is recognised by the key that carries
//! its ID (`wall`, `tank`, `power`, `proj`, `beam`). The client answers every
//! batch with one [`ControlCommands`] line.

pub mod entity;
pub mod protocol;
pub mod vector;

pub use entity::{Beam, Entity, Powerup, Projectile, Tank, Wall};
pub use protocol::{
    ControlCommands, DecodeError, EntityKind, Firing, Moving, Record, UnknownToken,
};
pub use vector::Vector2D;

/// Port the game server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 11000;

pub const TANK_SIZE: f32 = 60.0;
pub const TURRET_SIZE: f32 = 50.0;
pub const WALL_SIZE: f32 = 50.0;
pub const PROJECTILE_SIZE: f32 = 30.0;
pub const MAX_HP: i32 = 3;
