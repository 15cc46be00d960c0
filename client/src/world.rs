//! Client-side view of the arena
//!
//! The network thread writes, the render thread reads. Each entity kind sits
//! behind its own lock so a paint of the tanks never waits on a batch of
//! projectile updates. Snapshots handed to readers are owned copies.

use log::debug;
use serde::Serialize;
use shared::{Beam, Entity, EntityKind, Powerup, Projectile, Record, Tank, Wall};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Beams kept for a reader that has not taken them yet; older ones are
/// dropped first.
pub const MAX_PENDING_BEAMS: usize = 256;

/// Kinds kept in an ID-keyed map inside [`World`].
pub trait Stored: Entity {
    fn collection(world: &World) -> &RwLock<HashMap<u32, Self>>;
}

impl Stored for Wall {
    fn collection(world: &World) -> &RwLock<HashMap<u32, Self>> {
        &world.walls
    }
}

impl Stored for Tank {
    fn collection(world: &World) -> &RwLock<HashMap<u32, Self>> {
        &world.tanks
    }
}

impl Stored for Powerup {
    fn collection(world: &World) -> &RwLock<HashMap<u32, Self>> {
        &world.powerups
    }
}

impl Stored for Projectile {
    fn collection(world: &World) -> &RwLock<HashMap<u32, Self>> {
        &world.projectiles
    }
}

/// What applying a record did to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Upserted(EntityKind, u32),
    /// The ID was removed, or was already absent.
    Removed(EntityKind, u32),
    BeamAdded(u32),
}

/// Final standing of one player, as handed to a stats archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub id: u32,
    pub name: String,
    pub score: u32,
    pub accuracy: Option<u32>,
}

#[derive(Debug, Default)]
pub struct World {
    walls: RwLock<HashMap<u32, Wall>>,
    tanks: RwLock<HashMap<u32, Tank>>,
    powerups: RwLock<HashMap<u32, Powerup>>,
    projectiles: RwLock<HashMap<u32, Projectile>>,
    beams: Mutex<Vec<Beam>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the snapshot, replacing any previous one with the same ID.
    pub fn upsert<T: Stored>(&self, entity: T) {
        write(T::collection(self)).insert(entity.id(), entity);
    }

    /// Removes an ID. Absent IDs are ignored.
    pub fn remove<T: Stored>(&self, id: u32) -> Option<T> {
        write(T::collection(self)).remove(&id)
    }

    pub fn get<T: Stored>(&self, id: u32) -> Option<T> {
        read(T::collection(self)).get(&id).cloned()
    }

    pub fn contains<T: Stored>(&self, id: u32) -> bool {
        read(T::collection(self)).contains_key(&id)
    }

    /// Point-in-time copy of one kind's map.
    pub fn snapshot<T: Stored>(&self) -> HashMap<u32, T> {
        read(T::collection(self)).clone()
    }

    pub fn count<T: Stored>(&self) -> usize {
        read(T::collection(self)).len()
    }

    pub fn walls(&self) -> HashMap<u32, Wall> {
        self.snapshot()
    }

    pub fn tanks(&self) -> HashMap<u32, Tank> {
        self.snapshot()
    }

    pub fn powerups(&self) -> HashMap<u32, Powerup> {
        self.snapshot()
    }

    pub fn projectiles(&self) -> HashMap<u32, Projectile> {
        self.snapshot()
    }

    /// Records a beam event. Beams are never merged, even when IDs repeat.
    ///
    /// Readers are expected to drain them with [`World::take_beams`]; past
    /// [`MAX_PENDING_BEAMS`] the oldest untaken beam is discarded.
    pub fn add_beam(&self, beam: Beam) {
        let mut beams = lock(&self.beams);
        if beams.len() >= MAX_PENDING_BEAMS {
            let excess = beams.len() + 1 - MAX_PENDING_BEAMS;
            beams.drain(..excess);
            debug!("Beam buffer full, dropped {} untaken beam(s)", excess);
        }
        beams.push(beam);
    }

    /// Beams received so far and not yet taken.
    pub fn beams(&self) -> Vec<Beam> {
        lock(&self.beams).clone()
    }

    /// Hands the received beams to the caller, who retires them after
    /// drawing them for a while.
    pub fn take_beams(&self) -> Vec<Beam> {
        std::mem::take(&mut *lock(&self.beams))
    }

    /// Applies one decoded record following its kind's removal rule.
    pub fn apply(&self, record: Record) -> Applied {
        let applied = match record {
            Record::Wall(wall) => self.reconcile(wall),
            Record::Tank(tank) => self.reconcile(tank),
            Record::Powerup(powerup) => self.reconcile(powerup),
            Record::Projectile(projectile) => self.reconcile(projectile),
            Record::Beam(beam) => {
                let id = beam.id;
                self.add_beam(beam);
                Applied::BeamAdded(id)
            }
        };
        debug!("Applied {:?}", applied);
        applied
    }

    fn reconcile<T: Stored>(&self, entity: T) -> Applied {
        let id = entity.id();
        if entity.is_removal() {
            self.remove::<T>(id);
            Applied::Removed(T::KIND, id)
        } else {
            self.upsert(entity);
            Applied::Upserted(T::KIND, id)
        }
    }

    /// Name, score and accuracy of every tank currently known, ordered by
    /// descending score.
    pub fn player_stats(&self) -> Vec<PlayerStats> {
        let mut stats: Vec<PlayerStats> = read(&self.tanks)
            .values()
            .map(|tank| PlayerStats {
                id: tank.id,
                name: tank.name.clone(),
                score: tank.score,
                accuracy: tank.accuracy,
            })
            .collect();
        stats.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        stats
    }
}

// A panic on another thread must not take the world down with it; the maps
// hold whole snapshots, so whatever is inside is still consistent.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vector2D;
    use std::sync::Arc;
    use std::thread;

    fn record(line: &str) -> Record {
        Record::decode(line.as_bytes()).unwrap()
    }

    fn tank(id: u32, hp: i32) -> Tank {
        Tank {
            id,
            hit_points: hp,
            ..Tank::default()
        }
    }

    #[test]
    fn test_upsert_replaces_whole_snapshot() {
        let world = World::new();
        world.upsert(Tank {
            name: "Alice".to_string(),
            ..tank(1, 3)
        });
        world.upsert(tank(1, 2));

        let stored = world.get::<Tank>(1).unwrap();
        assert_eq!(stored.hit_points, 2);
        // no field merging
        assert_eq!(stored.name, "");
        assert_eq!(world.count::<Tank>(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let world = World::new();
        assert_eq!(world.remove::<Projectile>(99), None);

        let applied = world.apply(record(r#"{"tank":5,"disconnected":true}"#));
        assert_eq!(applied, Applied::Removed(EntityKind::Tank, 5));
        assert!(world.tanks().is_empty());
    }

    #[test]
    fn test_replay_order_last_write_wins() {
        let world = World::new();
        let lines = [
            r#"{"proj":1,"loc":{"x":0,"y":0}}"#,
            r#"{"proj":1,"loc":{"x":5,"y":0}}"#,
            r#"{"proj":1,"died":true}"#,
            r#"{"proj":1,"died":true}"#,
            r#"{"proj":2,"loc":{"x":1,"y":1}}"#,
            r#"{"proj":2,"died":true}"#,
            r#"{"proj":2,"loc":{"x":9,"y":9}}"#,
        ];
        for line in lines {
            world.apply(record(line));
        }

        assert!(!world.contains::<Projectile>(1));
        assert_eq!(
            world.get::<Projectile>(2).unwrap().location,
            Vector2D::new(9.0, 9.0)
        );
    }

    #[test]
    fn test_powerup_collected_removes() {
        let world = World::new();
        assert_eq!(
            world.apply(record(r#"{"power":7,"collected":false}"#)),
            Applied::Upserted(EntityKind::Powerup, 7)
        );
        assert!(world.contains::<Powerup>(7));

        world.apply(record(r#"{"power":7,"collected":true}"#));
        assert!(!world.powerups().contains_key(&7));
    }

    #[test]
    fn test_walls_are_never_removed() {
        let world = World::new();
        world.apply(record(r#"{"wall":0,"p1":{"x":0,"y":0},"p2":{"x":0,"y":50}}"#));
        world.apply(record(r#"{"wall":0,"died":true,"disconnected":true}"#));
        assert_eq!(world.walls().len(), 1);
    }

    #[test]
    fn test_duplicate_beams_are_kept() {
        let world = World::new();
        let line = r#"{"beam":12,"org":{"x":0,"y":0},"dir":{"x":1,"y":0},"owner":3}"#;
        assert_eq!(world.apply(record(line)), Applied::BeamAdded(12));
        assert_eq!(world.apply(record(line)), Applied::BeamAdded(12));

        assert_eq!(world.beams().len(), 2);
        let taken = world.take_beams();
        assert_eq!(taken.len(), 2);
        assert!(world.beams().is_empty());
    }

    #[test]
    fn test_untaken_beams_are_bounded() {
        let world = World::new();
        for id in 0..(MAX_PENDING_BEAMS as u32 + 10) {
            world.add_beam(Beam {
                id,
                ..Beam::default()
            });
        }

        let beams = world.take_beams();
        assert_eq!(beams.len(), MAX_PENDING_BEAMS);
        // the newest ones survive
        assert_eq!(beams[0].id, 10);
        assert_eq!(beams.last().map(|b| b.id), Some(MAX_PENDING_BEAMS as u32 + 9));
    }

    #[test]
    fn test_removal_with_long_and_short_flags() {
        let world = World::new();
        world.apply(record(r#"{"tank":3,"name":"Alice"}"#));
        world.apply(record(r#"{"power":7}"#));

        assert_eq!(
            world.apply(record(r#"{"tank":3,"disconnected":true,"dc":true}"#)),
            Applied::Removed(EntityKind::Tank, 3)
        );
        assert_eq!(
            world.apply(record(r#"{"power":7,"collected":true,"died":false}"#)),
            Applied::Removed(EntityKind::Powerup, 7)
        );
        assert!(world.tanks().is_empty());
        assert!(world.powerups().is_empty());
    }

    #[test]
    fn test_kinds_have_separate_id_spaces() {
        let world = World::new();
        world.apply(record(r#"{"tank":1}"#));
        world.apply(record(r#"{"power":1}"#));
        world.apply(record(r#"{"proj":1}"#));
        world.apply(record(r#"{"power":1,"collected":true}"#));

        assert!(world.contains::<Tank>(1));
        assert!(world.contains::<Projectile>(1));
        assert!(!world.contains::<Powerup>(1));
    }

    #[test]
    fn test_player_stats_sorted_by_score() {
        let world = World::new();
        world.upsert(Tank {
            name: "low".to_string(),
            score: 1,
            ..tank(1, 3)
        });
        world.upsert(Tank {
            name: "high".to_string(),
            score: 9,
            accuracy: Some(75),
            ..tank(2, 3)
        });

        let stats = world.player_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "high");
        assert_eq!(stats[0].accuracy, Some(75));
        assert_eq!(stats[1].id, 1);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let world = Arc::new(World::new());
        let writer = {
            let world = Arc::clone(&world);
            thread::spawn(move || {
                for i in 0..2_000u32 {
                    world.upsert(Tank {
                        score: i,
                        name: format!("p{}", i),
                        ..tank(1, 3)
                    });
                    if i % 3 == 0 {
                        world.remove::<Tank>(1);
                    }
                }
            })
        };

        for _ in 0..2_000 {
            if let Some(t) = world.get::<Tank>(1) {
                assert_eq!(t.name, format!("p{}", t.score));
            }
        }
        writer.join().unwrap();
    }
}
