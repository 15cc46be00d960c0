use shared::DEFAULT_PORT;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_port: u16,
    pub connect_timeout: Duration,
    /// Bytes requested from the socket per read.
    pub read_chunk_size: usize,
    /// Largest unterminated fragment tolerated before the session is dropped.
    pub max_pending_bytes: usize,
    /// Side length of the square view; the turret aims from its center.
    pub view_size: f32,
    pub beam_frames: u32,
    pub max_held_keys: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(5),
            read_chunk_size: 4096,
            max_pending_bytes: 1 << 20,
            view_size: 800.0,
            beam_frames: 30,
            max_held_keys: 2,
        }
    }
}

impl ClientConfig {
    /// Point the mouse position is measured from when aiming the turret.
    pub fn view_origin(&self) -> (f64, f64) {
        let half = f64::from(self.view_size) / 2.0;
        (half, half)
    }

    /// Turns a user supplied host into `host:port`, appending the configured
    /// port when the host does not carry one.
    pub fn server_address(&self, host: &str) -> String {
        let host = host.trim();
        if host.parse::<SocketAddr>().is_ok() {
            return host.to_string();
        }
        if let Ok(ip) = host.parse::<IpAddr>() {
            return SocketAddr::new(ip, self.server_port).to_string();
        }
        if host.contains(':') {
            return host.to_string();
        }
        format!("{}:{}", host, self.server_port)
    }
}
