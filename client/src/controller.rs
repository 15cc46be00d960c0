//! Shell-facing facade over one network session

use crate::config::ClientConfig;
use crate::connection::ConnectionState;
use crate::error::SessionError;
use crate::network::{Session, SessionContext, SessionEvent, SessionHandle};
use crate::world::{PlayerStats, World};
use log::{error, info};
use shared::{ControlCommands, Firing, Moving};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the network thread and exposes the world, the session constants and
/// the input handlers to the render loop.
pub struct GameClient {
    ctx: Arc<SessionContext>,
    config: ClientConfig,
    handle: Option<SessionHandle>,
    worker: Option<JoinHandle<()>>,
}

impl GameClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            ctx: Arc::new(SessionContext::new(&config)),
            config,
            handle: None,
            worker: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts the session on its own thread. A client runs one session;
    /// reconnecting means creating a new client.
    pub fn connect(&mut self, host: &str, name: &str) -> Result<(), SessionError> {
        if self.handle.is_some() {
            return Err(SessionError::AlreadyStarted);
        }

        let addr = self.config.server_address(host);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SessionError::RuntimeStart)?;

        let (session, handle) = Session::new(Arc::clone(&self.ctx), self.config.clone());
        let name = name.to_string();
        info!("Starting session for {} at {}", name, addr);

        let worker = thread::Builder::new()
            .name("network".to_string())
            .spawn(move || runtime.block_on(session.connect(&addr, &name)))
            .map_err(SessionError::RuntimeStart)?;

        self.handle = Some(handle);
        self.worker = Some(worker);
        Ok(())
    }

    pub fn poll_event(&mut self) -> Option<SessionEvent> {
        self.handle.as_mut()?.try_next_event()
    }

    /// Every event queued since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::iter::from_fn(|| self.poll_event()).collect()
    }

    pub fn player_id(&self) -> Option<u32> {
        self.ctx.player_id()
    }

    pub fn world_size(&self) -> Option<u32> {
        self.ctx.world_size()
    }

    pub fn world(&self) -> &World {
        self.ctx.world()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ctx.state()
    }

    pub fn commands(&self) -> ControlCommands {
        self.ctx.commands().current()
    }

    pub fn key_down(&self, direction: Moving) {
        self.ctx.commands().key_down(direction);
    }

    pub fn key_up(&self, direction: Moving) {
        self.ctx.commands().key_up(direction);
    }

    pub fn mouse_down(&self, button: Firing) {
        self.ctx.commands().mouse_down(button);
    }

    pub fn mouse_up(&self) {
        self.ctx.commands().mouse_up();
    }

    /// Aims the turret at a point given in view coordinates.
    pub fn mouse_moved(&self, x: f64, y: f64) {
        let (origin_x, origin_y) = self.config.view_origin();
        self.ctx
            .commands()
            .set_turret_direction(x - origin_x, y - origin_y);
    }

    /// Standings of every tank still known, for the stats archive.
    pub fn final_stats(&self) -> Vec<PlayerStats> {
        self.ctx.world().player_stats()
    }

    /// Shuts the session down and waits for the network thread. Events
    /// already queued, including the final one, can still be polled.
    pub fn exit(&mut self) {
        if let Some(handle) = &self.handle {
            handle.shutdown();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Network thread panicked");
            }
        }
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.exit();
    }
}
