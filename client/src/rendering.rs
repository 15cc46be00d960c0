use crate::controller::GameClient;
use macroquad::prelude::*;
use shared::{
    Beam, Powerup, Projectile, Tank, Vector2D, Wall, MAX_HP, PROJECTILE_SIZE, TANK_SIZE,
    TURRET_SIZE, WALL_SIZE,
};

/// Keeps received beams on screen for a fixed number of frames.
#[derive(Debug, Default)]
pub struct BeamFader {
    frames: u32,
    active: Vec<(Beam, u32)>,
}

impl BeamFader {
    pub fn new(frames: u32) -> Self {
        Self {
            frames,
            active: Vec::new(),
        }
    }

    pub fn push(&mut self, beams: impl IntoIterator<Item = Beam>) {
        let frames = self.frames;
        self.active
            .extend(beams.into_iter().map(|beam| (beam, frames)));
    }

    /// Ages every beam by one frame and drops the expired ones.
    pub fn tick(&mut self) {
        self.active.retain_mut(|(_, left)| {
            *left = left.saturating_sub(1);
            *left > 0
        });
    }

    /// Live beams with the fraction of their lifetime still left.
    pub fn active(&self) -> impl Iterator<Item = (&Beam, f32)> + '_ {
        let total = self.frames.max(1) as f32;
        self.active
            .iter()
            .map(move |(beam, left)| (beam, *left as f32 / total))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

pub struct Renderer {
    view_size: f32,
    beams: BeamFader,
}

impl Renderer {
    pub fn new(view_size: f32, beam_frames: u32) -> Self {
        Self {
            view_size,
            beams: BeamFader::new(beam_frames),
        }
    }

    /// Draws one frame centered on the local player's tank.
    pub fn render(&mut self, client: &GameClient, status: Option<&str>) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let world = client.world();
        self.beams.push(world.take_beams());

        let tanks = world.tanks();
        let center = client
            .player_id()
            .and_then(|id| tanks.get(&id))
            .map(|tank| tank.location)
            .unwrap_or(Vector2D::ZERO);
        let view = View {
            offset_x: self.view_size / 2.0 - center.x as f32,
            offset_y: self.view_size / 2.0 - center.y as f32,
        };

        if let Some(size) = client.world_size() {
            let half = size as f32 / 2.0;
            let (x, y) = view.point(Vector2D::new(-f64::from(half), -f64::from(half)));
            draw_rectangle(x, y, size as f32, size as f32, Color::from_rgba(51, 51, 51, 255));
        }

        for wall in world.walls().values() {
            draw_wall(&view, wall);
        }
        for powerup in world.powerups().values() {
            draw_powerup(&view, powerup);
        }
        for projectile in world.projectiles().values() {
            draw_projectile(&view, projectile);
        }
        for (beam, remaining) in self.beams.active() {
            draw_beam(&view, beam, remaining, self.view_size);
        }
        for tank in tanks.values().filter(|tank| tank.is_alive()) {
            draw_tank(&view, tank, Some(tank.id) == client.player_id());
        }
        self.beams.tick();

        draw_status(client, status);
    }
}

/// World to screen translation.
struct View {
    offset_x: f32,
    offset_y: f32,
}

impl View {
    fn point(&self, p: Vector2D) -> (f32, f32) {
        (p.x as f32 + self.offset_x, p.y as f32 + self.offset_y)
    }
}

fn player_color(id: u32) -> Color {
    match id % 8 {
        0 => Color::from_rgba(255, 68, 68, 255),
        1 => GREEN,
        2 => Color::from_rgba(0, 170, 255, 255),
        3 => YELLOW,
        4 => MAGENTA,
        5 => ORANGE,
        6 => Color::from_rgba(0, 255, 255, 255),
        _ => Color::from_rgba(136, 136, 136, 255),
    }
}

fn draw_wall(view: &View, wall: &Wall) {
    for tile in wall.tile_centers() {
        let (x, y) = view.point(tile);
        let half = WALL_SIZE / 2.0;
        draw_rectangle(x - half, y - half, WALL_SIZE, WALL_SIZE, BROWN);
        draw_rectangle_lines(x - half, y - half, WALL_SIZE, WALL_SIZE, 1.0, DARKBROWN);
    }
}

fn draw_tank(view: &View, tank: &Tank, is_local: bool) {
    let (x, y) = view.point(tank.location);
    let color = player_color(tank.id);

    draw_rectangle_ex(
        x,
        y,
        TANK_SIZE,
        TANK_SIZE,
        DrawRectangleParams {
            offset: vec2(0.5, 0.5),
            rotation: tank.body_angle().to_radians() as f32,
            color,
        },
    );

    let aim = tank.aiming.normalized();
    let reach = TURRET_SIZE * 0.8;
    draw_circle(x, y, TURRET_SIZE / 4.0, DARKGRAY);
    draw_line(
        x,
        y,
        x + aim.x as f32 * reach,
        y + aim.y as f32 * reach,
        6.0,
        DARKGRAY,
    );

    if is_local {
        draw_circle_lines(x, y, TANK_SIZE * 0.75, 1.0, WHITE);
    }

    let label = format!("{}: {}", tank.name, tank.score);
    draw_text(&label, x - TANK_SIZE / 2.0, y + TANK_SIZE * 0.75 + 12.0, 16.0, WHITE);

    let width = TANK_SIZE * tank.hit_points.clamp(0, MAX_HP) as f32 / MAX_HP as f32;
    let bar_color = match tank.hit_points {
        hp if hp >= MAX_HP => GREEN,
        2 => YELLOW,
        _ => RED,
    };
    draw_rectangle(x - TANK_SIZE / 2.0, y - TANK_SIZE * 0.75, width, 5.0, bar_color);
}

fn draw_projectile(view: &View, projectile: &Projectile) {
    let (x, y) = view.point(projectile.location);
    draw_circle(x, y, PROJECTILE_SIZE / 4.0, player_color(projectile.owner));
}

fn draw_powerup(view: &View, powerup: &Powerup) {
    let (x, y) = view.point(powerup.location);
    draw_circle(x, y, 8.0, ORANGE);
    draw_circle(x, y, 4.0, YELLOW);
}

fn draw_beam(view: &View, beam: &Beam, remaining: f32, length: f32) {
    let (x, y) = view.point(beam.origin);
    let direction = beam.direction.normalized();
    let mut color = player_color(beam.owner);
    color.a = remaining;
    draw_line(
        x,
        y,
        x + direction.x as f32 * length * 2.0,
        y + direction.y as f32 * length * 2.0,
        1.0 + 6.0 * remaining,
        color,
    );
}

fn draw_status(client: &GameClient, status: Option<&str>) {
    let line = match status {
        Some(message) => message.to_string(),
        None => match client.player_id() {
            Some(id) => format!("player {}", id),
            None => client.connection_state().to_string(),
        },
    };
    draw_text(&line, 10.0, 20.0, 18.0, WHITE);
}
