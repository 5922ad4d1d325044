// Test-only harness for full games over localhost.
//
// `play_game` starts a real server (port 0, in-memory game log) and connects
// one real `PlayerClient` per seat, each on its own thread, then waits for
// the server's report and every client's summary. Nothing here is
// test-specific apart from the seeding and the in-memory log: the server,
// the workers, and the responders are the same code the binaries run.
//
// See also: `tests/full_game.rs` for the scenarios.

use std::sync::Arc;
use std::thread;

use card_exchange_server::client::{GameSummary, PlayerClient};
use card_exchange_server::config::GameConfig;
use card_exchange_server::game::GameReport;
use card_exchange_server::log::GameLog;
use card_exchange_server::server::{ServerConfig, start_server};

/// Everything observable about one finished game.
pub struct FinishedGame {
    pub report: GameReport,
    /// `(name, summary)` per client, in connect order.
    pub summaries: Vec<(String, GameSummary)>,
    /// The full text of the game log.
    pub log: String,
}

impl FinishedGame {
    pub fn summary_for(&self, name: &str) -> &GameSummary {
        self.summaries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
            .unwrap_or_else(|| panic!("no client named {name}"))
    }
}

/// Play one complete game with `players` real clients. The server uses
/// `seed`; client `i` uses `seed + i + 1`.
pub fn play_game(decks: u32, players: u32, seed: u64) -> FinishedGame {
    let (log, buffer) = GameLog::in_memory();
    let config = ServerConfig {
        port: 0,
        game: GameConfig::new(decks, players).expect("invalid test game config"),
        seed: Some(seed),
    };
    let (handle, addr) = start_server(config, Arc::new(log)).expect("server failed to start");

    // Connect in order so seats are stable across runs; only `run` is
    // threaded.
    let clients: Vec<_> = (0..players)
        .map(|i| {
            let name = format!("Player {}", i + 1);
            let client_seed = seed + u64::from(i) + 1;
            let client =
                PlayerClient::connect(addr, &name, Some(client_seed)).expect("connect failed");
            thread::spawn(move || {
                let summary = client.run().expect("client failed");
                (name, summary)
            })
        })
        .collect();

    let report = handle.wait().expect("game failed");
    let summaries = clients
        .into_iter()
        .map(|c| c.join().expect("client thread panicked"))
        .collect();

    FinishedGame {
        report,
        summaries,
        log: buffer.contents(),
    }
}
