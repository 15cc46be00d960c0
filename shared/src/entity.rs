//! Entity snapshots as they arrive from the server
//!
//! Every record carries its ID under the key that names its kind. Fields other
//! than the ID default when absent, so a partial record still decodes.

use crate::protocol::EntityKind;
use crate::vector::Vector2D;
use crate::{MAX_HP, WALL_SIZE};
use serde::{Deserialize, Serialize};

/// Upper bound on tiles produced for a single wall segment.
const MAX_WALL_TILES: usize = 4096;

/// Common behaviour of every entity record.
pub trait Entity: Clone {
    const KIND: EntityKind;

    fn id(&self) -> u32;

    /// True when the record announces that the entity is gone (disconnected
    /// tank, collected powerup, dead projectile). Walls and beams never do.
    fn is_removal(&self) -> bool {
        false
    }
}

/// Static wall segment between two axis-aligned end points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Wall {
    #[serde(rename = "wall")]
    pub id: u32,
    pub p1: Vector2D,
    pub p2: Vector2D,
}

impl Wall {
    pub fn is_vertical(&self) -> bool {
        self.p1.x == self.p2.x
    }

    /// Centers of the `WALL_SIZE` blocks the segment is made of, from the
    /// lower coordinate to the higher one.
    pub fn tile_centers(&self) -> Vec<Vector2D> {
        if !self.p1.is_finite() || !self.p2.is_finite() {
            return Vec::new();
        }

        let step = WALL_SIZE as f64;
        let (start, span) = if self.is_vertical() {
            let low = self.p1.y.min(self.p2.y);
            (Vector2D::new(self.p1.x, low), (self.p1.y - self.p2.y).abs())
        } else {
            let low = self.p1.x.min(self.p2.x);
            (Vector2D::new(low, self.p1.y), (self.p1.x - self.p2.x).abs())
        };

        // clamp in floating point; a huge span would overflow the tile count
        let count = (span / step).floor().min((MAX_WALL_TILES - 1) as f64) as usize + 1;
        let direction = if self.is_vertical() {
            Vector2D::new(0.0, 1.0)
        } else {
            Vector2D::new(1.0, 0.0)
        };

        (0..count)
            .map(|i| start + direction * (i as f64 * step))
            .collect()
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl Entity for Wall {
    const KIND: EntityKind = EntityKind::Wall;

    fn id(&self) -> u32 {
        self.id
    }
}

/// A player's tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tank {
    #[serde(rename = "tank")]
    pub id: u32,
    #[serde(rename = "loc")]
    pub location: Vector2D,
    #[serde(rename = "bdir")]
    pub orientation: Vector2D,
    #[serde(rename = "tdir")]
    pub aiming: Vector2D,
    pub name: String,
    #[serde(rename = "hp")]
    pub hit_points: i32,
    pub score: u32,
    pub died: bool,
    pub disconnected: bool,
    /// Short form of `disconnected` used by some servers. Either one removes
    /// the tank.
    #[serde(skip_serializing_if = "is_false")]
    pub dc: bool,
    pub join: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<u32>,
}

impl Default for Tank {
    fn default() -> Self {
        Self {
            id: 0,
            location: Vector2D::ZERO,
            orientation: Vector2D::UP,
            aiming: Vector2D::UP,
            name: String::new(),
            hit_points: MAX_HP,
            score: 0,
            died: false,
            disconnected: false,
            dc: false,
            join: false,
            accuracy: None,
        }
    }
}

impl Tank {
    pub fn is_alive(&self) -> bool {
        self.hit_points > 0
    }

    /// Body rotation in degrees; neutral when the server sent garbage.
    pub fn body_angle(&self) -> f64 {
        self.orientation.to_angle()
    }

    pub fn turret_angle(&self) -> f64 {
        self.aiming.to_angle()
    }
}

impl Entity for Tank {
    const KIND: EntityKind = EntityKind::Tank;

    fn id(&self) -> u32 {
        self.id
    }

    fn is_removal(&self) -> bool {
        self.disconnected || self.dc
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Powerup {
    #[serde(rename = "power")]
    pub id: u32,
    #[serde(rename = "loc")]
    pub location: Vector2D,
    pub collected: bool,
    /// Older servers flag a collected powerup as `died`.
    #[serde(skip_serializing_if = "is_false")]
    pub died: bool,
}

impl Entity for Powerup {
    const KIND: EntityKind = EntityKind::Powerup;

    fn id(&self) -> u32 {
        self.id
    }

    fn is_removal(&self) -> bool {
        self.collected || self.died
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Projectile {
    #[serde(rename = "proj")]
    pub id: u32,
    #[serde(rename = "loc")]
    pub location: Vector2D,
    #[serde(rename = "dir")]
    pub direction: Vector2D,
    pub died: bool,
    pub owner: u32,
}

impl Entity for Projectile {
    const KIND: EntityKind = EntityKind::Projectile;

    fn id(&self) -> u32 {
        self.id
    }

    fn is_removal(&self) -> bool {
        self.died
    }
}

/// One-shot beam attack. The ID is informational only; two records with the
/// same ID are two separate events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Beam {
    #[serde(rename = "beam")]
    pub id: u32,
    #[serde(rename = "org")]
    pub origin: Vector2D,
    #[serde(rename = "dir")]
    pub direction: Vector2D,
    pub owner: u32,
}

impl Entity for Beam {
    const KIND: EntityKind = EntityKind::Beam;

    fn id(&self) -> u32 {
        self.id
    }
}
