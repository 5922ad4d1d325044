// TCP accept loop and the background game thread.
//
// `start_server` binds the listener on the calling thread, so the bound
// address (and any bind error) is known before it returns, then moves the
// listener to a background thread that:
//
// 1. accepts exactly `players` connections, in order; the accept order is
//    each player's seat;
// 2. wraps each stream in a `PlayerConnection`;
// 3. builds a `Game` and runs it to completion.
//
// The caller collects the outcome with `ServerHandle::wait`. No connection is
// accepted past the configured player count, and the listener closes as soon
// as the table is full.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use card_exchange_prng::CardRng;
use tracing::info;

use crate::config::GameConfig;
use crate::connection::PlayerConnection;
use crate::game::{Game, GameError, GameReport};
use crate::log::GameLog;
use crate::player::Player;

pub const DEFAULT_PORT: u16 = 9231;

/// Configuration for starting a game server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub game: GameConfig,
    /// Fixed RNG seed; `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            game: GameConfig {
                decks: 1,
                players: 2,
            },
            seed: None,
        }
    }
}

/// Handle returned by `start_server` to collect the game's outcome.
pub struct ServerHandle {
    thread: thread::JoinHandle<Result<GameReport, GameError>>,
}

impl ServerHandle {
    /// Block until the game finishes.
    pub fn wait(self) -> Result<GameReport, GameError> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => Err(GameError::WorkerPanicked),
        }
    }
}

/// Bind the listener and start accepting players on a background thread.
/// Returns the handle and the actual bound address (port 0 lets the OS
/// pick a free port).
pub fn start_server(
    config: ServerConfig,
    log: Arc<GameLog>,
) -> std::io::Result<(ServerHandle, SocketAddr)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port))?;
    let addr = listener.local_addr()?;
    info!(%addr, players = config.game.players, decks = config.game.decks, "listening");

    let thread = thread::spawn(move || run_server(listener, config, log));
    Ok((ServerHandle { thread }, addr))
}

fn run_server(
    listener: TcpListener,
    config: ServerConfig,
    log: Arc<GameLog>,
) -> Result<GameReport, GameError> {
    let players = accept_players(&listener, config.game.player_count())?;
    drop(listener);

    let rng = match config.seed {
        Some(seed) => CardRng::new(seed),
        None => CardRng::from_entropy(),
    };
    Game::new(config.game, players, rng, log).run()
}

fn accept_players(listener: &TcpListener, count: usize) -> Result<Vec<Player>, GameError> {
    let mut players = Vec::with_capacity(count);
    for seat in 0..count {
        let (stream, peer) = listener.accept().map_err(GameError::Accept)?;
        stream.set_nodelay(true).ok();
        let conn = PlayerConnection::new(stream).map_err(GameError::Accept)?;
        info!(%peer, seat, "player connected");
        players.push(Player::new(seat, conn));
    }
    info!(count, "all players connected");
    Ok(players)
}
