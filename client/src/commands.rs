//! Player control intent shared between the input thread and the network
//! thread

use log::debug;
use shared::{ControlCommands, Firing, Moving};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outbound command state plus the bookkeeping needed to turn raw key and
/// mouse events into it.
#[derive(Debug)]
pub struct CommandState {
    inner: Mutex<Inner>,
    max_held_keys: usize,
}

#[derive(Debug, Default)]
struct Inner {
    commands: ControlCommands,
    /// Movement keys currently held, oldest first.
    held: Vec<Moving>,
    /// `alt` has been requested and not yet sent.
    beam_pending: bool,
}

impl Default for CommandState {
    fn default() -> Self {
        Self::new(2)
    }
}

impl CommandState {
    pub fn new(max_held_keys: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_held_keys,
        }
    }

    pub fn set_moving(&self, moving: Moving) {
        self.lock().commands.moving = moving;
    }

    /// Setting `alt` arms a one-shot beam that is cleared after it is sent.
    pub fn set_firing(&self, firing: Firing) {
        let mut inner = self.lock();
        inner.commands.firing = firing;
        inner.beam_pending = firing == Firing::Alt;
    }

    pub fn set_turret_direction(&self, x: f64, y: f64) {
        self.lock().commands.set_turret_direction(x, y);
    }

    /// A movement key went down. Movement follows it while no more than
    /// `max_held_keys` keys are held.
    pub fn key_down(&self, direction: Moving) {
        if direction == Moving::None {
            return;
        }

        let mut inner = self.lock();
        if !inner.held.contains(&direction) {
            inner.held.push(direction);
        }
        if inner.held.len() <= self.max_held_keys {
            inner.commands.moving = direction;
        }
    }

    /// A movement key was released; movement falls back to the most recent
    /// key still held.
    pub fn key_up(&self, direction: Moving) {
        let mut inner = self.lock();
        inner.held.retain(|held| *held != direction);
        inner.commands.moving = inner.held.last().copied().unwrap_or(Moving::None);
    }

    pub fn mouse_down(&self, button: Firing) {
        match button {
            Firing::None => {}
            Firing::Main | Firing::Alt => self.set_firing(button),
        }
    }

    /// Releasing a button stops firing, except that a beam requested since the
    /// last send still goes out once.
    pub fn mouse_up(&self) {
        let mut inner = self.lock();
        if !inner.beam_pending {
            inner.commands.firing = Firing::None;
        }
    }

    pub fn current(&self) -> ControlCommands {
        self.lock().commands.clone()
    }

    /// Returns the commands to send this tick. A pending beam is included
    /// exactly once; firing reverts to `none` afterwards.
    pub fn take_outbound(&self) -> ControlCommands {
        let mut inner = self.lock();
        let outbound = inner.commands.clone();
        if inner.beam_pending {
            debug!("Beam request sent, clearing fire");
            inner.commands.firing = Firing::None;
            inner.beam_pending = false;
        }
        outbound
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
