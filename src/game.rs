//! Round coordinator.
//!
//! `Game` owns one session's board and drives the round lifecycle: it collects
//! and validates each player's orders, starts resolution once every remaining
//! player is confirmed, relays support questions, and publishes the result.
//! It performs no I/O; every message it wants delivered is queued in an
//! outbox that the session drains after each call.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::board::{BoardState, Order, OrderSpec, Player, Season};
use crate::config::SessionConfig;
use crate::protocol::{LeaveReason, ServerMessage};
use crate::resolve::{
    CombatRules, DiceRoller, Resolution, ResolveError, RoundResolver, SeededDice, Step,
    SupportQuery,
};
use crate::validate::{bind_order, validate_order, validate_order_set, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Players are joining.
    Lobby,
    CollectingOrders,
    /// Resolution is suspended until supporting players answer.
    AwaitingSupport,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(Player),
}

/// A message waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: Recipient,
    pub message: ServerMessage,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("game already started")]
    AlreadyStarted,

    #[error("game has not started")]
    NotStarted,

    #[error("game is over")]
    Finished,

    #[error("{0} is not a faction on this board")]
    UnknownFaction(Player),

    #[error("{0} already joined")]
    AlreadyJoined(Player),

    #[error("{0} is not playing")]
    UnknownPlayer(Player),

    #[error("need at least {need} players, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },

    #[error("orders of {0} are already confirmed this round")]
    AlreadyConfirmed(Player),

    #[error("not accepting orders while support is being decided")]
    NotCollecting,

    #[error("order rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("no open support question for {from} -> {to}")]
    NoSuchQuery { from: String, to: String },

    #[error("{0} is not fighting in that battle")]
    InvalidSupportChoice(Player),

    #[error("players cannot vote to kick themselves")]
    SelfKick,

    #[error("session closed")]
    SessionClosed,
}

pub struct Game {
    state: BoardState,
    rules: CombatRules,
    dice: Box<dyn DiceRoller>,
    min_players: usize,
    phase: Phase,
    /// Remaining players, sorted.
    players: Vec<Player>,
    /// Confirmed order sets of the current round.
    orders: BTreeMap<Player, Vec<Order>>,
    /// Kick target -> voters.
    kick_votes: BTreeMap<Player, BTreeSet<Player>>,
    resolver: Option<RoundResolver>,
    queries: Vec<SupportQuery>,
    /// Bumped whenever a new batch of support questions goes out.
    support_generation: u64,
    winner: Option<Player>,
    outbox: Vec<Outbound>,
}

impl Game {
    /// Creates a game with seeded dice.
    pub fn new(state: BoardState, config: &SessionConfig) -> Self {
        Game::with_dice(state, config, Box::new(SeededDice::new(config.seed)))
    }

    pub fn with_dice(mut state: BoardState, config: &SessionConfig, dice: Box<dyn DiceRoller>) -> Self {
        state.season = config.starting_season;
        Game {
            state,
            rules: config.rules.clone(),
            dice,
            min_players: config.min_players,
            phase: Phase::Lobby,
            players: Vec::new(),
            orders: BTreeMap::new(),
            kick_votes: BTreeMap::new(),
            resolver: None,
            queries: Vec::new(),
            support_generation: 0,
            winner: None,
            outbox: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn season(&self) -> Season {
        self.state.season
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn winner(&self) -> Option<&Player> {
        self.winner.as_ref()
    }

    pub fn pending_queries(&self) -> &[SupportQuery] {
        &self.queries
    }

    pub fn support_generation(&self) -> u64 {
        self.support_generation
    }

    pub fn is_confirmed(&self, player: &Player) -> bool {
        self.orders.contains_key(player)
    }

    /// Drains the messages queued since the last call.
    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        mem::take(&mut self.outbox)
    }

    pub fn add_player(&mut self, player: Player) -> Result<(), GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if !self.state.map().players().contains(&player) {
            return Err(GameError::UnknownFaction(player));
        }
        if self.players.contains(&player) {
            return Err(GameError::AlreadyJoined(player));
        }
        info!(%player, "player joined");
        self.players.push(player);
        self.players.sort();
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() < self.min_players {
            return Err(GameError::NotEnoughPlayers {
                have: self.players.len(),
                need: self.min_players,
            });
        }
        self.phase = Phase::CollectingOrders;
        info!(players = self.players.len(), season = %self.state.season, "game started");
        self.broadcast(ServerMessage::GameStarted {
            players: self.players.clone(),
            season: self.state.season,
            round: self.state.round,
        });
        Ok(())
    }

    /// Validates and stores a player's complete order set for this round.
    pub fn submit_orders(&mut self, player: &Player, specs: &[OrderSpec]) -> Result<(), GameError> {
        match self.phase {
            Phase::Lobby => return Err(GameError::NotStarted),
            Phase::Finished => return Err(GameError::Finished),
            Phase::AwaitingSupport => return Err(GameError::NotCollecting),
            Phase::CollectingOrders => {}
        }
        if !self.players.contains(player) {
            return Err(GameError::UnknownPlayer(player.clone()));
        }
        if self.orders.contains_key(player) {
            return Err(GameError::AlreadyConfirmed(player.clone()));
        }

        let orders = self.check_orders(player, specs).map_err(|rejection| {
            debug!(%player, %rejection, "orders rejected");
            rejection
        })?;

        info!(%player, count = orders.len(), "orders confirmed");
        self.orders.insert(player.clone(), orders);
        self.broadcast(ServerMessage::OrdersConfirmation {
            player: player.clone(),
        });
        self.progress();
        Ok(())
    }

    fn check_orders(&self, player: &Player, specs: &[OrderSpec]) -> Result<Vec<Order>, Rejection> {
        let season = self.state.season;
        let orders = specs
            .iter()
            .map(|spec| bind_order(spec, player, self.state.map()))
            .collect::<Result<Vec<_>, _>>()?;
        for order in &orders {
            validate_order(order, season, &self.state)?;
        }
        validate_order_set(&orders, &self.state)?;
        Ok(orders)
    }

    /// Answers one support question. `supported` of `None` withholds it.
    pub fn give_support(
        &mut self,
        player: &Player,
        from: &str,
        to: &str,
        supported: Option<Player>,
    ) -> Result<(), GameError> {
        let map = self.state.shared_map().clone();
        let idx = self
            .queries
            .iter()
            .position(|q| &q.player == player && map.name_of(q.from) == from && map.name_of(q.to) == to)
            .ok_or_else(|| GameError::NoSuchQuery {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        if let Some(choice) = &supported {
            if !self.queries[idx].battlers.contains(choice) {
                return Err(GameError::InvalidSupportChoice(choice.clone()));
            }
        }

        let query = self.queries.remove(idx);
        self.settle_query(&query, supported);
        if self.queries.is_empty() {
            self.run_resolver();
        }
        Ok(())
    }

    /// Withholds every open support. Called when the answer deadline passes.
    pub fn expire_support_queries(&mut self) {
        if self.queries.is_empty() {
            return;
        }
        for query in mem::take(&mut self.queries) {
            warn!(player = %query.player, "support question timed out");
            self.settle_query(&query, None);
        }
        self.run_resolver();
    }

    fn settle_query(&mut self, query: &SupportQuery, supported: Option<Player>) {
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.answer(query.key, supported.clone());
        }
        let map = self.state.map();
        let message = ServerMessage::SupportGiven {
            from: map.name_of(query.from).to_string(),
            to: map.name_of(query.to).to_string(),
            supporting_player: query.player.clone(),
            supported_player: supported,
        };
        self.broadcast(message);
    }

    /// Removes a player for this and every later round. Their units stay on
    /// the board without orders. If the round is already resolving, their
    /// confirmed orders stay in it; only their open support questions are
    /// withheld.
    pub fn remove_player(&mut self, player: &Player, reason: LeaveReason) -> Result<(), GameError> {
        if !self.players.contains(player) {
            return Err(GameError::UnknownPlayer(player.clone()));
        }
        info!(%player, ?reason, "player left");
        self.players.retain(|p| p != player);
        self.kick_votes.remove(player);
        for voters in self.kick_votes.values_mut() {
            voters.remove(player);
        }
        if self.resolver.is_none() {
            self.orders.remove(player);
        }
        self.broadcast(ServerMessage::PlayerLeft {
            player: player.clone(),
            reason,
        });

        let (dropped, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.queries)
            .into_iter()
            .partition(|q| &q.player == player);
        self.queries = kept;
        let had_queries = !dropped.is_empty();
        for query in dropped {
            self.settle_query(&query, None);
        }

        if self.players.is_empty() && self.phase != Phase::Lobby {
            info!("no players left");
            self.phase = Phase::Finished;
            self.resolver = None;
            self.queries.clear();
            return Ok(());
        }
        if had_queries && self.queries.is_empty() {
            self.run_resolver();
        } else {
            self.progress();
        }
        Ok(())
    }

    /// Records a kick vote. The target is removed once a strict majority of
    /// the other remaining players voted.
    pub fn vote_kick(&mut self, voter: &Player, target: &Player) -> Result<(), GameError> {
        match self.phase {
            Phase::Lobby => return Err(GameError::NotStarted),
            Phase::Finished => return Err(GameError::Finished),
            _ => {}
        }
        for p in [voter, target] {
            if !self.players.contains(p) {
                return Err(GameError::UnknownPlayer(p.clone()));
            }
        }
        if voter == target {
            return Err(GameError::SelfKick);
        }

        let voters = self.kick_votes.entry(target.clone()).or_default();
        voters.insert(voter.clone());
        let votes = voters.len();
        let electorate = self.players.len() - 1;
        debug!(%voter, %target, votes, electorate, "kick vote");
        if votes * 2 > electorate {
            self.remove_player(target, LeaveReason::Kicked)?;
        }
        Ok(())
    }

    /// Starts resolution once every remaining player is confirmed.
    fn progress(&mut self) {
        if self.phase != Phase::CollectingOrders || self.players.is_empty() {
            return;
        }
        if !self.players.iter().all(|p| self.orders.contains_key(p)) {
            return;
        }
        let map = self.state.map();
        let received: BTreeMap<Player, Vec<OrderSpec>> = self
            .orders
            .iter()
            .map(|(player, orders)| (player.clone(), orders.iter().map(|o| o.to_spec(map)).collect()))
            .collect();
        self.broadcast(ServerMessage::OrdersReceived { orders: received });

        let orders: Vec<Order> = self.orders.values().flatten().cloned().collect();
        debug!(orders = orders.len(), round = self.state.round, "resolving round");
        self.resolver = Some(RoundResolver::new(self.rules.clone(), orders));
        self.run_resolver();
    }

    fn run_resolver(&mut self) {
        loop {
            let Some(resolver) = self.resolver.as_mut() else {
                return;
            };
            match resolver.run(&self.state, self.dice.as_mut()) {
                Ok(Step::Done(resolution)) => return self.finish_round(*resolution),
                Ok(Step::NeedSupport(queries)) => {
                    let (present, absent): (Vec<_>, Vec<_>) = queries
                        .into_iter()
                        .partition(|q| self.players.contains(&q.player));
                    for query in &absent {
                        resolver.answer(query.key, None);
                    }
                    if present.is_empty() {
                        continue;
                    }
                    return self.ask_support(present);
                }
                Err(err) => return self.abort_round(err),
            }
        }
    }

    fn ask_support(&mut self, queries: Vec<SupportQuery>) {
        self.phase = Phase::AwaitingSupport;
        self.support_generation += 1;
        for query in &queries {
            let map = self.state.map();
            let message = ServerMessage::AskSupport {
                from: map.name_of(query.from).to_string(),
                to: map.name_of(query.to).to_string(),
                battlers: query.battlers.clone(),
            };
            debug!(player = %query.player, "asking for support decision");
            self.send(query.player.clone(), message);
        }
        self.queries = queries;
    }

    fn finish_round(&mut self, resolution: Resolution) {
        let Resolution { mut state, result } = resolution;
        let winner = result.winner.clone();
        info!(round = result.round, season = %result.season, battles = result.battle_count(), "round resolved");
        self.broadcast(ServerMessage::RoundResult(result));

        self.resolver = None;
        self.queries.clear();
        self.orders.clear();

        if let Some(winner) = winner {
            info!(%winner, "game won");
            self.state = state;
            self.phase = Phase::Finished;
            self.winner = Some(winner.clone());
            self.broadcast(ServerMessage::Winner { winner });
            return;
        }
        state.advance();
        self.state = state;
        self.phase = Phase::CollectingOrders;
    }

    /// Drops the round after an internal inconsistency. Players resubmit.
    fn abort_round(&mut self, err: ResolveError) {
        error!(%err, round = self.state.round, "round aborted");
        self.broadcast(ServerMessage::error(format!("round aborted: {err}")));
        self.resolver = None;
        self.queries.clear();
        self.orders.clear();
        self.phase = Phase::CollectingOrders;
    }

    /// Discards the round in progress without telling anyone.
    pub fn close(&mut self) {
        self.resolver = None;
        self.queries.clear();
        self.orders.clear();
        self.phase = Phase::Finished;
    }

    fn broadcast(&mut self, message: ServerMessage) {
        self.outbox.push(Outbound {
            to: Recipient::All,
            message,
        });
    }

    fn send(&mut self, player: Player, message: ServerMessage) {
        self.outbox.push(Outbound {
            to: Recipient::Player(player),
            message,
        });
    }
}
