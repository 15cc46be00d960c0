//! Record decoding and the outbound command line

use crate::entity::{Beam, Powerup, Projectile, Tank, Wall};
use crate::vector::Vector2D;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a single record could not be turned into an entity.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record matches no known entity shape")]
    UnknownKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Wall,
    Tank,
    Powerup,
    Projectile,
    Beam,
}

impl EntityKind {
    /// Order in which shapes are tried when a record carries more than one
    /// ID key.
    pub const PRECEDENCE: [EntityKind; 5] = [
        EntityKind::Wall,
        EntityKind::Tank,
        EntityKind::Powerup,
        EntityKind::Projectile,
        EntityKind::Beam,
    ];

    /// Key holding the entity ID on the wire.
    pub const fn tag(self) -> &'static str {
        match self {
            EntityKind::Wall => "wall",
            EntityKind::Tank => "tank",
            EntityKind::Powerup => "power",
            EntityKind::Projectile => "proj",
            EntityKind::Beam => "beam",
        }
    }

    pub fn sniff(object: &Map<String, Value>) -> Option<Self> {
        Self::PRECEDENCE
            .into_iter()
            .find(|kind| object.contains_key(kind.tag()))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Wall => "wall",
            EntityKind::Tank => "tank",
            EntityKind::Powerup => "powerup",
            EntityKind::Projectile => "projectile",
            EntityKind::Beam => "beam",
        };
        f.write_str(name)
    }
}

/// One decoded line of the server stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Wall(Wall),
    Tank(Tank),
    Powerup(Powerup),
    Projectile(Projectile),
    Beam(Beam),
}

impl Record {
    /// Decodes a single record without its line terminator.
    ///
    /// The kind is chosen by the first ID key found in
    /// [`EntityKind::PRECEDENCE`]; anything else fails closed.
    pub fn decode(line: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(line)?;
        let kind = match &value {
            Value::Object(object) => EntityKind::sniff(object).ok_or(DecodeError::UnknownKind)?,
            _ => return Err(DecodeError::NotAnObject),
        };

        let record = match kind {
            EntityKind::Wall => Record::Wall(serde_json::from_value(value)?),
            EntityKind::Tank => Record::Tank(serde_json::from_value(value)?),
            EntityKind::Powerup => Record::Powerup(serde_json::from_value(value)?),
            EntityKind::Projectile => Record::Projectile(serde_json::from_value(value)?),
            EntityKind::Beam => Record::Beam(serde_json::from_value(value)?),
        };
        Ok(record)
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Wall(_) => EntityKind::Wall,
            Record::Tank(_) => EntityKind::Tank,
            Record::Powerup(_) => EntityKind::Powerup,
            Record::Projectile(_) => EntityKind::Projectile,
            Record::Beam(_) => EntityKind::Beam,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Record::Wall(wall) => wall.id,
            Record::Tank(tank) => tank.id,
            Record::Powerup(powerup) => powerup.id,
            Record::Projectile(projectile) => projectile.id,
            Record::Beam(beam) => beam.id,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown control token `{0}`")]
pub struct UnknownToken(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Moving {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Moving {
    pub const fn as_str(self) -> &'static str {
        match self {
            Moving::None => "none",
            Moving::Up => "up",
            Moving::Down => "down",
            Moving::Left => "left",
            Moving::Right => "right",
        }
    }
}

impl FromStr for Moving {
    type Err = UnknownToken;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "none" => Ok(Moving::None),
            "up" => Ok(Moving::Up),
            "down" => Ok(Moving::Down),
            "left" => Ok(Moving::Left),
            "right" => Ok(Moving::Right),
            other => Err(UnknownToken(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Firing {
    #[default]
    None,
    /// Regular projectile.
    Main,
    /// Beam attack.
    Alt,
}

impl Firing {
    pub const fn as_str(self) -> &'static str {
        match self {
            Firing::None => "none",
            Firing::Main => "main",
            Firing::Alt => "alt",
        }
    }
}

impl FromStr for Firing {
    type Err = UnknownToken;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "none" => Ok(Firing::None),
            "main" => Ok(Firing::Main),
            "alt" => Ok(Firing::Alt),
            other => Err(UnknownToken(other.to_string())),
        }
    }
}

/// The object the client sends once per received batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommands {
    pub moving: Moving,
    #[serde(rename = "fire")]
    pub firing: Firing,
    #[serde(rename = "tdir")]
    pub turret_direction: Vector2D,
}

impl Default for ControlCommands {
    fn default() -> Self {
        Self {
            moving: Moving::None,
            firing: Firing::None,
            turret_direction: Vector2D::UP,
        }
    }
}

impl ControlCommands {
    /// Stores the turret direction as a unit vector (or zero for degenerate
    /// input).
    pub fn set_turret_direction(&mut self, x: f64, y: f64) {
        self.turret_direction = Vector2D::new(x, y).normalized();
    }

    /// Newline-terminated JSON, ready for the socket.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
