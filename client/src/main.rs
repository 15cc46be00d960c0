use clap::Parser;
use client::input::InputManager;
use client::rendering::Renderer;
use client::{ClientConfig, GameClient, SessionEvent};
use log::{error, info};
use macroquad::prelude::*;
use shared::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host, optionally with a port
    #[arg(short = 's', long, default_value = "localhost")]
    server: String,

    /// Player name sent to the server
    #[arg(short = 'n', long, default_value = "player")]
    name: String,

    /// Port used when the server address does not carry one
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Window width and height
    #[arg(long, default_value_t = 800.0)]
    view_size: f32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "TankWars".to_string(),
        window_width: args.view_size as i32,
        window_height: args.view_size as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = ClientConfig {
        server_port: args.port,
        view_size: args.view_size,
        ..ClientConfig::default()
    };

    info!("Starting TankWars client as {}", args.name);
    info!("Controls: W/A/S/D or arrows to move, mouse to aim, left/right click to fire");

    let mut renderer = Renderer::new(config.view_size, config.beam_frames);
    let mut input = InputManager::new();
    let mut client = GameClient::new(config);
    let mut status = None;

    if let Err(e) = client.connect(&args.server, &args.name) {
        error!("Could not start session: {}", e);
        status = Some(e.to_string());
    }

    loop {
        for event in client.drain_events() {
            match event {
                SessionEvent::Established(info) => {
                    info!("Playing as {} (id {})", args.name, info.player_id);
                    status = None;
                }
                SessionEvent::FrameReady => {}
                SessionEvent::Failed(e) => status = Some(e.to_string()),
                SessionEvent::Closed => status = Some("disconnected".to_string()),
            }
        }

        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        input.update(&client);
        renderer.render(&client, status.as_deref());

        next_frame().await
    }

    client.exit();
    for stats in client.final_stats() {
        info!("{}: score {}", stats.name, stats.score);
    }
}
