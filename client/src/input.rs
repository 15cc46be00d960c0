//! Translates window input into control commands

use crate::controller::GameClient;
use macroquad::prelude::*;
use shared::{Firing, Moving};

const MOVEMENT_KEYS: [KeyCode; 8] = [
    KeyCode::W,
    KeyCode::A,
    KeyCode::S,
    KeyCode::D,
    KeyCode::Up,
    KeyCode::Left,
    KeyCode::Down,
    KeyCode::Right,
];

const FIRE_BUTTONS: [MouseButton; 2] = [MouseButton::Left, MouseButton::Right];

/// Polls macroquad once per frame and forwards edges to the client.
pub struct InputManager {
    last_mouse: Option<(f32, f32)>,
}

impl InputManager {
    pub fn new() -> Self {
        Self { last_mouse: None }
    }

    pub fn update(&mut self, client: &GameClient) {
        for key in MOVEMENT_KEYS {
            if let Some(direction) = movement_for(key) {
                if is_key_pressed(key) {
                    client.key_down(direction);
                }
                if is_key_released(key) {
                    client.key_up(direction);
                }
            }
        }

        for button in FIRE_BUTTONS {
            if let Some(firing) = firing_for(button) {
                if is_mouse_button_pressed(button) {
                    client.mouse_down(firing);
                }
                if is_mouse_button_released(button) {
                    client.mouse_up();
                }
            }
        }

        // only aim when the pointer actually moved
        let position = mouse_position();
        if self.last_mouse != Some(position) {
            self.last_mouse = Some(position);
            client.mouse_moved(f64::from(position.0), f64::from(position.1));
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// W/A/S/D and the arrow keys steer the tank.
pub fn movement_for(key: KeyCode) -> Option<Moving> {
    match key {
        KeyCode::W | KeyCode::Up => Some(Moving::Up),
        KeyCode::S | KeyCode::Down => Some(Moving::Down),
        KeyCode::A | KeyCode::Left => Some(Moving::Left),
        KeyCode::D | KeyCode::Right => Some(Moving::Right),
        _ => None,
    }
}

/// Left button fires projectiles, right button fires the beam.
pub fn firing_for(button: MouseButton) -> Option<Firing> {
    match button {
        MouseButton::Left => Some(Firing::Main),
        MouseButton::Right => Some(Firing::Alt),
        _ => None,
    }
}
