// CLI entry point for the card exchange game server.
//
// Reads the start file, binds the listener, waits for the configured number
// of players, plays one game, and exits. The human-readable game record goes
// to the log file; diagnostics go to stderr through `tracing` (filter with
// `RUST_LOG`, default `info`).
//
// Usage:
//   card-server [OPTIONS]
//     --config <PATH>   Start file (default: start.txt)
//     --port <PORT>     Listen port (default: 9231)
//     --seed <N>        Fixed RNG seed (default: from the clock)
//     --log <PATH>      Game log file (default: logfile.txt)

use std::sync::Arc;

use card_exchange_server::config::GameConfig;
use card_exchange_server::game::Outcome;
use card_exchange_server::log::GameLog;
use card_exchange_server::server::{ServerConfig, start_server};
use tracing_subscriber::EnvFilter;

struct Args {
    config_path: String,
    log_path: String,
    server: ServerConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = parse_args();

    args.server.game = match GameConfig::load(&args.config_path) {
        Ok(game) => game,
        Err(e) => {
            eprintln!("Invalid start file: {e}");
            std::process::exit(1);
        }
    };

    let log = match GameLog::create(&args.log_path) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            eprintln!("Cannot create log file {}: {e}", args.log_path);
            std::process::exit(1);
        }
    };

    let players = args.server.game.players;
    let (handle, addr) = match start_server(args.server, log) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };
    println!("Waiting for {players} players on {addr}");

    match handle.wait() {
        Ok(report) => match report.outcome {
            Outcome::Winner(_) => {
                if let Some(winner) = report.winner() {
                    println!("Winner of the game is {}", winner.name);
                }
            }
            Outcome::Tied => println!("Game is tied"),
        },
        Err(e) => {
            eprintln!("Game failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> Args {
    let mut parsed = Args {
        config_path: "start.txt".into(),
        log_path: "logfile.txt".into(),
        server: ServerConfig::default(),
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                parsed.config_path = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a path");
                    std::process::exit(1);
                });
            }
            "--port" => {
                i += 1;
                parsed.server.port =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--port requires a valid port number");
                        std::process::exit(1);
                    });
            }
            "--seed" => {
                i += 1;
                parsed.server.seed = args.get(i).and_then(|s| s.parse().ok()).or_else(|| {
                    eprintln!("--seed requires a number");
                    std::process::exit(1);
                });
            }
            "--log" => {
                i += 1;
                parsed.log_path = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--log requires a path");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_usage() {
    println!("Usage: card-server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <PATH>   Start file: `decks, players` after a header line,");
    println!("                    or JSON {{\"decks\": N, \"players\": N}} (default: start.txt)");
    println!("  --port <PORT>     Listen port (default: 9231)");
    println!("  --seed <N>        Fixed RNG seed (default: from the clock)");
    println!("  --log <PATH>      Game log file (default: logfile.txt)");
    println!("  --help, -h        Show this help");
}
