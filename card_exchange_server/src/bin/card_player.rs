// CLI player for the card exchange game.
//
// Connects to a running `card-server`, answers its commands with the
// built-in responder policy, and prints the result and final hand.
//
// Usage:
//   card-player [OPTIONS]
//     --addr <HOST:PORT>   Server address (default: 127.0.0.1:9231)
//     --name <NAME>        Player name (default: player)
//     --seed <N>           Fixed RNG seed (default: from the clock)

use card_exchange_server::client::PlayerClient;
use tracing_subscriber::EnvFilter;

struct Args {
    addr: String,
    name: String,
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();

    let client = match PlayerClient::connect(&args.addr, &args.name, args.seed) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to {}: {e}", args.addr);
            std::process::exit(1);
        }
    };
    println!("Connected to {} as {}", args.addr, args.name);

    match client.run() {
        Ok(summary) => {
            println!("Result: {}", summary.result);
            println!("Final hand ({} cards):", summary.hand.len());
            for card in &summary.hand {
                println!("  {card}");
            }
        }
        Err(e) => {
            eprintln!("Game aborted: {e}");
            std::process::exit(1);
        }
    }
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> Args {
    let mut parsed = Args {
        addr: "127.0.0.1:9231".into(),
        name: "player".into(),
        seed: None,
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--addr" => {
                i += 1;
                parsed.addr = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--addr requires HOST:PORT");
                    std::process::exit(1);
                });
            }
            "--name" => {
                i += 1;
                parsed.name = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--name requires a value");
                    std::process::exit(1);
                });
            }
            "--seed" => {
                i += 1;
                parsed.seed = args.get(i).and_then(|s| s.parse().ok()).or_else(|| {
                    eprintln!("--seed requires a number");
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
    println!("Usage: card-player [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --addr <HOST:PORT>   Server address (default: 127.0.0.1:9231)");
    println!("  --name <NAME>        Player name (default: player)");
    println!("  --seed <N>           Fixed RNG seed (default: from the clock)");
    println!("  --help, -h           Show this help");
}
