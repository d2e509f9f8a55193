//! Async session runner.
//!
//! Each session is one tokio task that owns its `Game`. Everything that can
//! change the game (decoded player messages, protocol errors, disconnects,
//! joins, shutdown) arrives on a single unbounded queue and is handled in
//! arrival order, so the game itself needs no locking. While support
//! questions are open, the task also races the queue against the answer
//! deadline.
//!
//! Delivery is left to the surrounding transport through the `Fanout` trait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::board::Player;
use crate::config::SessionConfig;
use crate::game::{Game, GameError, Recipient};
use crate::protocol::{decode_client, ClientMessage, LeaveReason, ProtocolError, ServerMessage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FanoutError {
    #[error("{0} is not connected")]
    NotConnected(Player),

    #[error("delivery to {player} failed: {reason}")]
    Delivery { player: Player, reason: String },
}

/// Delivers server messages to connected players.
pub trait Fanout: Send + Sync {
    fn send(&self, to: &Player, message: &ServerMessage) -> Result<(), FanoutError>;

    /// Sends to every connected player, returning the failed deliveries.
    fn send_to_all(&self, message: &ServerMessage) -> HashMap<Player, FanoutError>;

    /// Called when a player leaves the game.
    fn remove(&self, _player: &Player) {}
}

enum Event {
    Message { player: Player, message: ClientMessage },
    Invalid { player: Player, error: ProtocolError },
    Disconnected(Player),
    Join {
        player: Player,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Start {
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Shutdown,
}

/// Handle to a running session.
pub struct Session {
    events: mpsc::UnboundedSender<Event>,
    task: JoinHandle<()>,
}

impl Session {
    /// Spawns the session task. Must be called inside a tokio runtime.
    pub fn spawn(game: Game, fanout: Arc<dyn Fanout>, config: &SessionConfig) -> Session {
        let (events, rx) = mpsc::unbounded_channel();
        let runner = Runner {
            game,
            fanout,
            timeout: config.support_timeout(),
            deadline: None,
            generation: 0,
        };
        let task = tokio::spawn(runner.run(rx));
        Session { events, task }
    }

    /// Joins a player and returns the receiver their connection feeds.
    pub async fn add_player(&self, player: Player) -> Result<PlayerReceiver, GameError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(Event::Join {
                player: player.clone(),
                reply,
            })
            .map_err(|_| GameError::SessionClosed)?;
        rx.await.map_err(|_| GameError::SessionClosed)??;
        Ok(PlayerReceiver {
            player,
            events: self.events.clone(),
        })
    }

    pub async fn start(&self) -> Result<(), GameError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(Event::Start { reply })
            .map_err(|_| GameError::SessionClosed)?;
        rx.await.map_err(|_| GameError::SessionClosed)?
    }

    /// Stops the session. A round in progress is dropped without a result.
    pub async fn shutdown(self) {
        let _ = self.events.send(Event::Shutdown);
        if let Err(err) = self.task.await {
            warn!(%err, "session task failed");
        }
    }
}

/// The inbound side of one player's connection.
#[derive(Clone)]
pub struct PlayerReceiver {
    player: Player,
    events: mpsc::UnboundedSender<Event>,
}

impl PlayerReceiver {
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Decodes one raw message and queues it for the session. A message that
    /// fails to decode is answered with an error to this player only.
    pub fn handle_message(&self, bytes: &[u8]) -> Result<(), GameError> {
        let event = match decode_client(bytes) {
            Ok(message) => Event::Message {
                player: self.player.clone(),
                message,
            },
            Err(error) => Event::Invalid {
                player: self.player.clone(),
                error,
            },
        };
        self.events.send(event).map_err(|_| GameError::SessionClosed)
    }

    /// The connection is gone; the player leaves the game.
    pub fn disconnect(&self) {
        let _ = self.events.send(Event::Disconnected(self.player.clone()));
    }
}

struct Runner {
    game: Game,
    fanout: Arc<dyn Fanout>,
    timeout: Duration,
    deadline: Option<Instant>,
    generation: u64,
}

impl Runner {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        loop {
            let event = match self.deadline {
                Some(deadline) => tokio::select! {
                    event = events.recv() => event,
                    _ = sleep_until(deadline) => {
                        debug!("support deadline passed");
                        self.deadline = None;
                        self.game.expire_support_queries();
                        self.flush();
                        continue;
                    }
                },
                None => events.recv().await,
            };
            let Some(event) = event else {
                break;
            };
            if !self.handle(event) {
                break;
            }
            self.flush();
        }
        info!("session closed");
        self.game.close();
    }

    /// Applies one event. Returns false when the session should stop.
    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Message { player, message } => {
                if let Err(err) = self.apply(&player, message) {
                    debug!(%player, %err, "request refused");
                    self.reply(&player, ServerMessage::error(err));
                }
            }
            Event::Invalid { player, error } => {
                debug!(%player, %error, "undecodable message");
                self.reply(&player, ServerMessage::error(error));
            }
            Event::Disconnected(player) => {
                if self.game.players().contains(&player) {
                    if let Err(err) = self.game.remove_player(&player, LeaveReason::Quit) {
                        warn!(%player, %err, "could not remove disconnected player");
                    }
                }
                self.fanout.remove(&player);
            }
            Event::Join { player, reply } => {
                let _ = reply.send(self.game.add_player(player));
            }
            Event::Start { reply } => {
                let _ = reply.send(self.game.start());
            }
            Event::Shutdown => return false,
        }
        true
    }

    fn apply(&mut self, player: &Player, message: ClientMessage) -> Result<(), GameError> {
        match message {
            ClientMessage::SubmitOrders { orders } => self.game.submit_orders(player, &orders),
            ClientMessage::GiveSupport {
                from,
                to,
                player: supported,
            } => self.game.give_support(player, &from, &to, supported),
            ClientMessage::Quit => {
                self.game.remove_player(player, LeaveReason::Quit)?;
                self.fanout.remove(player);
                Ok(())
            }
            ClientMessage::Kick { player: target } => self.game.vote_kick(player, &target),
        }
    }

    fn reply(&self, player: &Player, message: ServerMessage) {
        if let Err(err) = self.fanout.send(player, &message) {
            warn!(%err, "could not deliver reply");
        }
    }

    /// Delivers queued messages and re-arms the support deadline when a new
    /// batch of questions went out.
    fn flush(&mut self) {
        for out in self.game.take_outbox() {
            match out.to {
                Recipient::All => {
                    for (player, err) in self.fanout.send_to_all(&out.message) {
                        warn!(%player, %err, "broadcast not delivered");
                    }
                }
                Recipient::Player(player) => self.reply(&player, out.message),
            }
        }

        if self.game.pending_queries().is_empty() {
            self.deadline = None;
        } else if self.game.support_generation() != self.generation {
            self.generation = self.game.support_generation();
            self.deadline = Some(Instant::now() + self.timeout);
        }
    }
}
