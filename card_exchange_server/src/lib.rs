// card_exchange_server: game server and player client for the card exchange
// game.
//
// The server accepts a fixed number of players over TCP and runs one game:
// a first-player search, a suit choice, a deal, then two strictly ordered
// rounds in which every player dumps cards onto a shared pile (and in round 2
// draws some back), and finally scoring. Each player is driven by its own
// worker thread; the workers take turns through a shared coordinator.
//
// Module overview:
// - `config.rs`:       `GameConfig` (decks, players) and start-file parsing.
// - `log.rs`:          `GameLog`, the human-readable game record.
// - `connection.rs`:   `PlayerConnection`, typed request/response exchanges
//                      with one client.
// - `coordinator.rs`:  `RoundCoordinator`: per-round turn counters and
//                      condvars, the round-1 barrier, and the pile, reachable
//                      only through a `TurnGuard`.
// - `player.rs`:       `Player`, the per-connection worker and forfeit policy.
// - `game.rs`:         `Game`, the orchestrator, plus scoring and the report.
// - `server.rs`:       Listener, accept loop, background game thread.
// - `client.rs`:       `ClientResponder` (player-side state machine) and
//                      `PlayerClient` (its network loop).
//
// Dependencies: `card_exchange_protocol` (cards, messages, framing) and
// `card_exchange_prng` (all randomness, seedable for tests).
//
// Two binaries ship with the crate: `card-server` (`main.rs`) and
// `card-player` (`bin/card_player.rs`).

pub mod client;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod game;
pub mod log;
pub mod player;
pub mod server;

pub use server::{ServerConfig, start_server};
