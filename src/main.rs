//! Runs one local Hermannia session over stdin and stdout.
//!
//! Each input line is `<player> <json message>`. Each output line is the
//! recipient (`*` for everyone) followed by the JSON message. The session
//! shuts down at end of input.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use hermannia::board::{BoardConfig, Player};
use hermannia::config::SessionConfig;
use hermannia::protocol::{encode_server, ServerMessage};
use hermannia::registry::GameRegistry;
use hermannia::session::{Fanout, FanoutError, PlayerReceiver, Session};

#[derive(Parser)]
#[command(name = "hermannia")]
#[command(about = "Hermannia round adjudicator over stdin/stdout")]
struct Cli {
    /// Board description (JSON)
    #[arg(long)]
    board: PathBuf,
    /// Session configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Dice seed, overrides the config file
    #[arg(long)]
    seed: Option<u64>,
    /// Players to seat, comma separated. Defaults to every faction.
    #[arg(long, value_delimiter = ',')]
    players: Vec<String>,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Writes every message to stdout, prefixed with its recipient.
struct StdoutFanout {
    connected: Mutex<BTreeSet<Player>>,
}

impl StdoutFanout {
    fn write(&self, prefix: &str, message: &ServerMessage) -> io::Result<()> {
        let json = encode_server(message).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let mut out = io::stdout().lock();
        writeln!(out, "{prefix} {json}")?;
        out.flush()
    }

    fn is_connected(&self, player: &Player) -> bool {
        self.connected
            .lock()
            .map(|c| c.contains(player))
            .unwrap_or(false)
    }
}

impl Fanout for StdoutFanout {
    fn send(&self, to: &Player, message: &ServerMessage) -> Result<(), FanoutError> {
        if !self.is_connected(to) {
            return Err(FanoutError::NotConnected(to.clone()));
        }
        self.write(to.as_str(), message)
            .map_err(|e| FanoutError::Delivery {
                player: to.clone(),
                reason: e.to_string(),
            })
    }

    fn send_to_all(&self, message: &ServerMessage) -> HashMap<Player, FanoutError> {
        let mut failed = HashMap::new();
        if let Err(e) = self.write("*", message) {
            if let Ok(connected) = self.connected.lock() {
                for player in connected.iter() {
                    failed.insert(
                        player.clone(),
                        FanoutError::Delivery {
                            player: player.clone(),
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
        failed
    }

    fn remove(&self, player: &Player) {
        if let Ok(mut connected) = self.connected.lock() {
            connected.remove(player);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let board_json = std::fs::read_to_string(&cli.board)
        .with_context(|| format!("reading board {}", cli.board.display()))?;
    let board = BoardConfig::from_json(&board_json).context("parsing board")?;
    let factions = board.build().context("building board")?.map().players().to_vec();

    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SessionConfig::from_json(&json).context("parsing config")?
        }
        None => SessionConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let players: Vec<Player> = if cli.players.is_empty() {
        factions
    } else {
        cli.players.iter().map(|p| Player::new(p.trim())).collect()
    };

    let mut registry = GameRegistry::new();
    let name = board.name.clone();
    registry.register_board(board)?;
    let game = registry.create(&name, &config)?;

    let fanout = Arc::new(StdoutFanout {
        connected: Mutex::new(players.iter().cloned().collect()),
    });
    let session = Session::spawn(game, fanout, &config);

    let mut receivers: HashMap<Player, PlayerReceiver> = HashMap::new();
    for player in players {
        let receiver = session
            .add_player(player.clone())
            .await
            .with_context(|| format!("seating {player}"))?;
        receivers.insert(player, receiver);
    }
    session.start().await.context("starting game")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((player, json)) = line.split_once(' ') else {
            warn!(line, "expected '<player> <message>'");
            continue;
        };
        match receivers.get(&Player::new(player)) {
            Some(receiver) => receiver.handle_message(json.as_bytes())?,
            None => warn!(player, "no such player"),
        }
    }

    session.shutdown().await;
    Ok(())
}
