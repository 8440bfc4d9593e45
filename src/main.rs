//! Ghost Crawler headless entry point
//!
//! Runs the server core against a logging transport with one scripted bot,
//! which is enough to watch a session go through lobby, play and game over
//! without a network front end.
//!
//! Usage: `ghost-crawler [settings.json]`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ghost_crawler::protocol::{ConnectionId, ServerMessage, Transport};
use ghost_crawler::session::SessionPhase;
use ghost_crawler::{Server, Settings};

/// How long the demo bot plays
const DEMO_DURATION: Duration = Duration::from_secs(20);
/// Bot input rate
const BOT_FRAME: Duration = Duration::from_millis(50);

/// Writes outbound traffic to the log instead of a socket
#[derive(Default)]
struct LoggingTransport {
    states: AtomicU64,
}

impl Transport for LoggingTransport {
    fn send(&self, conn: ConnectionId, msg: &ServerMessage) {
        match msg {
            // One per tick per player; only count them
            ServerMessage::State(_) => {
                self.states.fetch_add(1, Ordering::Relaxed);
            }
            _ => match msg.to_json() {
                Ok(json) => log::info!("-> {:?} {}", conn, json),
                Err(e) => log::warn!("Could not encode {}: {}", msg.kind(), e),
            },
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Ghost Crawler (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(std::path::Path::new(&path)),
        None => Settings::default(),
    };
    let transport = Arc::new(LoggingTransport::default());
    let server = Server::new(settings, transport.clone());
    log::info!(
        "Tick rate {} Hz, up to {} players per session",
        server.settings().tick_rate_hz,
        server.settings().max_players
    );
    let bot = ConnectionId(1);

    server.on_message(bot, r#"{"type":"create"}"#);
    let Some((code, _)) = server.binding_of(bot) else {
        log::error!("Bot could not create a session");
        return;
    };
    if let Some(seed) = server.with_session(&code, |s| s.seed()) {
        log::info!("Bot is in session {} (seed {})", code, seed);
    }
    server.on_message(bot, r##"{"type":"ready","bodyColor":"#3498db","capeColor":"#e74c3c"}"##);

    let start = Instant::now();
    let mut frame: u32 = 0;
    while start.elapsed() < DEMO_DURATION {
        let phase = server.with_session(&code, |s| s.phase());
        match phase {
            None => break,
            Some(SessionPhase::Active) => {}
            Some(_) => {
                log::info!("Session {} left play", code);
                break;
            }
        }

        // Circle-strafe around the room, spraying forward
        let t = frame as f32 * 0.05;
        let payload = format!(
            r#"{{"type":"input","dx":{:.3},"dy":{:.3},"facing":{:.3},"shooting":true,"pickup":{}}}"#,
            t.cos(),
            t.sin(),
            t + std::f32::consts::FRAC_PI_2,
            frame % 20 == 0
        );
        server.on_message(bot, &payload);

        frame += 1;
        std::thread::sleep(BOT_FRAME);
    }

    if let Some((floor, kills)) =
        server.with_session(&code, |s| (s.world().floor, s.world().kills))
    {
        log::info!("Reached floor {} with {} kills", floor, kills);
    }
    server.on_message(bot, r#"{"type":"exit"}"#);
    server.shutdown();
    log::info!(
        "Done; {} state snapshots sent",
        transport.states.load(Ordering::Relaxed)
    );
}
